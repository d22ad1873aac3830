use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use careflow::error::AppError;
use careflow::models::booking::{
    AgreementVisit, Appointment, BookingRow, LeaveEntry, TrainingSession,
};
use careflow::models::event::{EventKind, EventStatus, ParticipantRole};
use careflow::models::tenant::{Branch, BranchAdmin, TenantContext};
use careflow::service::calendar::{
    CalendarSource, DateRange, OrganizationCalendar, RefreshOutcome,
};
use chrono::{NaiveDate, TimeZone, Utc};
use tokio::sync::Notify;

#[derive(Default, Clone)]
struct FakeSource {
    bookings: Vec<BookingRow>,
    visits: Vec<AgreementVisit>,
    training: Vec<TrainingSession>,
    leave: Vec<LeaveEntry>,
    appointments: Vec<Appointment>,
    branches: Vec<Branch>,
    /// When set, only the first fetch_branches call blocks on the gate.
    branch_gate: Option<(Arc<Notify>, Arc<AtomicUsize>)>,
}

#[async_trait]
impl CalendarSource for FakeSource {
    async fn fetch_branches(&self, _ctx: &TenantContext) -> Result<Vec<Branch>, AppError> {
        if let Some((gate, calls)) = &self.branch_gate {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                gate.notified().await;
            }
        }
        Ok(self.branches.clone())
    }

    async fn fetch_bookings(
        &self,
        _ctx: &TenantContext,
        _range: &DateRange,
    ) -> Result<Vec<BookingRow>, AppError> {
        Ok(self.bookings.clone())
    }

    async fn fetch_agreement_visits(
        &self,
        _ctx: &TenantContext,
        _range: &DateRange,
    ) -> Result<Vec<AgreementVisit>, AppError> {
        Ok(self.visits.clone())
    }

    async fn fetch_training(
        &self,
        _ctx: &TenantContext,
        _range: &DateRange,
    ) -> Result<Vec<TrainingSession>, AppError> {
        Ok(self.training.clone())
    }

    async fn fetch_leave(&self, _ctx: &TenantContext) -> Result<Vec<LeaveEntry>, AppError> {
        Ok(self.leave.clone())
    }

    async fn fetch_appointments(
        &self,
        _ctx: &TenantContext,
        _range: &DateRange,
    ) -> Result<Vec<Appointment>, AppError> {
        Ok(self.appointments.clone())
    }
}

fn ctx() -> TenantContext {
    TenantContext::new("org1", vec!["b1".to_string()])
}

fn march_range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    )
    .unwrap()
}

fn booking_row(id: &str, staff: Option<&str>, start_h: u32, end_h: u32) -> BookingRow {
    BookingRow {
        id: id.to_string(),
        client_id: "c1".to_string(),
        client_name: "Rose Hart".to_string(),
        service: "personal care".to_string(),
        start_time: Utc.with_ymd_and_hms(2026, 3, 2, start_h, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2026, 3, 2, end_h, 0, 0).unwrap(),
        status: EventStatus::Scheduled,
        branch_id: "b1".to_string(),
        branch_name: "North".to_string(),
        staff_id: staff.map(|s| s.to_string()),
        staff_name: staff.map(|s| format!("Carer {}", s)),
        location: None,
    }
}

#[tokio::test]
async fn aggregation_merges_groups_and_flags_conflicts() {
    let source = FakeSource {
        bookings: vec![
            booking_row("r1", Some("s1"), 9, 10),
            booking_row("r2", Some("s2"), 9, 10),
        ],
        training: vec![TrainingSession {
            id: "t1".to_string(),
            course: "Manual handling".to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap(),
            branch_id: "b1".to_string(),
            branch_name: "North".to_string(),
            staff_ids: vec!["s1".to_string()],
            staff_names: vec!["Carer s1".to_string()],
            location: None,
        }],
        leave: vec![LeaveEntry {
            id: "h1".to_string(),
            title: "Bank Holiday".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 3, 17).unwrap(),
            recurring: true,
            branch_id: "b1".to_string(),
            branch_name: "North".to_string(),
            staff_id: None,
            staff_name: None,
        }],
        branches: vec![Branch {
            id: "b1".to_string(),
            name: "North".to_string(),
            admins: vec![BranchAdmin {
                id: "a1".to_string(),
                name: "Admin One".to_string(),
            }],
        }],
        ..Default::default()
    };

    let calendar = OrganizationCalendar::new(source);
    let outcome = calendar.refresh(&ctx(), march_range()).await.unwrap();
    let RefreshOutcome::Published(snapshot) = outcome else {
        panic!("first refresh must publish");
    };

    // One grouped booking, one training session, one projected holiday.
    assert_eq!(snapshot.events.len(), 3);

    let booking = snapshot
        .events
        .iter()
        .find(|e| e.kind == EventKind::Booking)
        .unwrap();
    assert_eq!(booking.staff_ids, vec!["s1".to_string(), "s2".to_string()]);
    assert!(
        booking
            .participants
            .iter()
            .any(|p| p.role == ParticipantRole::Admin)
    );

    // Training overlaps the booking and shares s1.
    let training = snapshot
        .events
        .iter()
        .find(|e| e.kind == EventKind::Training)
        .unwrap();
    assert!(booking.conflicts_with.contains(&training.id));
    assert!(training.conflicts_with.contains(&booking.id));

    // Recurring 2020 holiday lands on the window's start year.
    let leave = snapshot
        .events
        .iter()
        .find(|e| e.kind == EventKind::Leave)
        .unwrap();
    assert_eq!(
        leave.start_time.date_naive(),
        NaiveDate::from_ymd_opt(2026, 3, 17).unwrap()
    );

    // Chronological output.
    let starts: Vec<_> = snapshot.events.iter().map(|e| e.start_time).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
}

#[tokio::test]
async fn unassigned_booking_keeps_placeholder_through_the_pipeline() {
    let source = FakeSource {
        bookings: vec![booking_row("r1", None, 9, 10)],
        ..Default::default()
    };
    let calendar = OrganizationCalendar::new(source);
    let RefreshOutcome::Published(snapshot) =
        calendar.refresh(&ctx(), march_range()).await.unwrap()
    else {
        panic!("first refresh must publish");
    };
    assert!(
        snapshot.events[0]
            .participants
            .iter()
            .any(|p| p.name == "Needs Carer Assignment")
    );
}

#[tokio::test]
async fn slow_refresh_is_superseded_by_a_newer_one() {
    let gate = Arc::new(Notify::new());
    let slow = FakeSource {
        bookings: vec![booking_row("r1", Some("s1"), 9, 10)],
        branch_gate: Some((gate.clone(), Arc::new(AtomicUsize::new(0)))),
        ..Default::default()
    };
    let calendar = Arc::new(OrganizationCalendar::new(slow));

    let slow_refresh = {
        let calendar = calendar.clone();
        tokio::spawn(async move { calendar.refresh(&ctx(), march_range()).await })
    };
    // Let the slow refresh take its generation before the fast one starts.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let fast = calendar.refresh(&ctx(), march_range()).await.unwrap();

    gate.notify_one();
    let slow_outcome = slow_refresh.await.unwrap().unwrap();

    match (fast, slow_outcome) {
        (
            RefreshOutcome::Published(snapshot),
            RefreshOutcome::Superseded { generation, latest },
        ) => {
            assert_eq!(snapshot.generation, 2);
            assert_eq!(generation, 1);
            assert_eq!(latest, 2);
        }
        other => panic!("unexpected outcomes: {:?}", other),
    }

    let latest = calendar.latest_snapshot().await.unwrap();
    assert_eq!(latest.generation, 2);
}
