use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use tokio::sync::Mutex;

use crate::clients::backend::{BackendClient, Filter};
use crate::error::AppError;
use crate::models::booking::{AgreementVisit, Appointment, BookingRow, LeaveEntry, TrainingSession};
use crate::models::event::{
    CalendarEvent, EventKind, EventStatus, Participant, ParticipantRole, Priority,
};
use crate::models::tenant::{Branch, TenantContext};
use crate::service::conflicts::annotate_conflicts;
use crate::service::grouping::group_bookings;
use crate::service::holidays::resolve_leave;

/// Inclusive date window for a calendar query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if end < start {
            return Err(AppError::validation("date range end precedes start"));
        }
        Ok(Self { start, end })
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc()
    }
}

/// The five event sources behind the organization calendar. Each fetch is
/// independent of the others; the aggregator joins them.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn fetch_branches(&self, ctx: &TenantContext) -> Result<Vec<Branch>, AppError>;
    async fn fetch_bookings(
        &self,
        ctx: &TenantContext,
        range: &DateRange,
    ) -> Result<Vec<BookingRow>, AppError>;
    async fn fetch_agreement_visits(
        &self,
        ctx: &TenantContext,
        range: &DateRange,
    ) -> Result<Vec<AgreementVisit>, AppError>;
    async fn fetch_training(
        &self,
        ctx: &TenantContext,
        range: &DateRange,
    ) -> Result<Vec<TrainingSession>, AppError>;
    async fn fetch_leave(&self, ctx: &TenantContext) -> Result<Vec<LeaveEntry>, AppError>;
    async fn fetch_appointments(
        &self,
        ctx: &TenantContext,
        range: &DateRange,
    ) -> Result<Vec<Appointment>, AppError>;
}

#[async_trait]
impl CalendarSource for BackendClient {
    async fn fetch_branches(&self, ctx: &TenantContext) -> Result<Vec<Branch>, AppError> {
        self.select("branches", &[Filter::any_of("id", &ctx.branch_ids)])
            .await
    }

    async fn fetch_bookings(
        &self,
        ctx: &TenantContext,
        range: &DateRange,
    ) -> Result<Vec<BookingRow>, AppError> {
        self.select("bookings", &range_filters(ctx, range)).await
    }

    async fn fetch_agreement_visits(
        &self,
        ctx: &TenantContext,
        range: &DateRange,
    ) -> Result<Vec<AgreementVisit>, AppError> {
        self.select("agreement_visits", &range_filters(ctx, range))
            .await
    }

    async fn fetch_training(
        &self,
        ctx: &TenantContext,
        range: &DateRange,
    ) -> Result<Vec<TrainingSession>, AppError> {
        self.select("staff_training", &range_filters(ctx, range)).await
    }

    async fn fetch_leave(&self, ctx: &TenantContext) -> Result<Vec<LeaveEntry>, AppError> {
        // Leave rows carry recurrence, so the date cut happens after
        // projection, not in the query.
        self.select("leave_entries", &[Filter::any_of("branch_id", &ctx.branch_ids)])
            .await
    }

    async fn fetch_appointments(
        &self,
        ctx: &TenantContext,
        range: &DateRange,
    ) -> Result<Vec<Appointment>, AppError> {
        self.select("client_appointments", &range_filters(ctx, range))
            .await
    }
}

fn range_filters(ctx: &TenantContext, range: &DateRange) -> Vec<Filter> {
    vec![
        Filter::any_of("branch_id", &ctx.branch_ids),
        Filter::gte("start_time", &range.start_utc().to_rfc3339()),
        Filter::lte("start_time", &range.end_utc().to_rfc3339()),
    ]
}

/// One published aggregation result.
#[derive(Debug, Clone)]
pub struct CalendarSnapshot {
    pub generation: u64,
    pub range: DateRange,
    pub events: Vec<CalendarEvent>,
}

/// What became of a refresh: either its snapshot was published, or a newer
/// refresh finished first and this one was discarded.
#[derive(Debug)]
pub enum RefreshOutcome {
    Published(CalendarSnapshot),
    Superseded { generation: u64, latest: u64 },
}

/// Aggregates the five sources into one chronological, conflict-annotated
/// event list. Stale responses are handled by an explicit generation
/// counter: every refresh takes a generation up front and a finished fetch
/// only publishes if nothing newer has published ahead of it.
pub struct OrganizationCalendar<S: CalendarSource> {
    source: S,
    generation: AtomicU64,
    latest: Mutex<Option<CalendarSnapshot>>,
}

impl<S: CalendarSource> OrganizationCalendar<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            generation: AtomicU64::new(0),
            latest: Mutex::new(None),
        }
    }

    /// Runs all five fetchers and publishes the merged snapshot unless a
    /// newer refresh already did.
    pub async fn refresh(
        &self,
        ctx: &TenantContext,
        range: DateRange,
    ) -> Result<RefreshOutcome, AppError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let events = self.aggregate(ctx, &range).await?;

        let mut latest = self.latest.lock().await;
        if let Some(snapshot) = latest.as_ref() {
            if snapshot.generation > generation {
                info!(
                    "calendar refresh generation {} superseded by {}",
                    generation, snapshot.generation
                );
                return Ok(RefreshOutcome::Superseded {
                    generation,
                    latest: snapshot.generation,
                });
            }
        }
        let snapshot = CalendarSnapshot {
            generation,
            range,
            events,
        };
        *latest = Some(snapshot.clone());
        Ok(RefreshOutcome::Published(snapshot))
    }

    pub async fn latest_snapshot(&self) -> Option<CalendarSnapshot> {
        self.latest.lock().await.clone()
    }

    async fn aggregate(
        &self,
        ctx: &TenantContext,
        range: &DateRange,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        let branches = self.source.fetch_branches(ctx).await?;
        let admins: HashMap<String, Vec<crate::models::tenant::BranchAdmin>> = branches
            .into_iter()
            .map(|b| (b.id, b.admins))
            .collect();

        let (bookings, visits, training, leave, appointments) = tokio::join!(
            self.source.fetch_bookings(ctx, range),
            self.source.fetch_agreement_visits(ctx, range),
            self.source.fetch_training(ctx, range),
            self.source.fetch_leave(ctx),
            self.source.fetch_appointments(ctx, range),
        );

        let mut events = group_bookings(bookings?, &admins);
        events.extend(visits?.into_iter().map(agreement_event));
        events.extend(training?.into_iter().map(training_event));
        events.extend(resolve_leave(leave?, range.start, range.end));
        events.extend(appointments?.into_iter().map(appointment_event));

        events.sort_by_key(|e| e.start_time);
        annotate_conflicts(&mut events);
        Ok(events)
    }
}

fn staff_participants(ids: &[String], names: &[String]) -> Vec<Participant> {
    ids.iter()
        .zip(names.iter())
        .map(|(id, name)| Participant {
            id: id.clone(),
            name: name.clone(),
            role: ParticipantRole::Staff,
        })
        .collect()
}

fn agreement_event(visit: AgreementVisit) -> CalendarEvent {
    let mut participants = vec![Participant {
        id: visit.client_id.clone(),
        name: visit.client_name.clone(),
        role: ParticipantRole::Client,
    }];
    participants.extend(staff_participants(&visit.staff_ids, &visit.staff_names));
    CalendarEvent {
        id: format!("agreement-{}", visit.id),
        kind: EventKind::Agreement,
        title: format!("{} - {}", visit.client_name, visit.service),
        start_time: visit.start_time,
        end_time: visit.end_time,
        status: EventStatus::Scheduled,
        branch_id: visit.branch_id,
        branch_name: visit.branch_name,
        participants,
        location: None,
        priority: Priority::Medium,
        client_id: Some(visit.client_id),
        staff_ids: visit.staff_ids,
        conflicts_with: Vec::new(),
    }
}

fn training_event(session: TrainingSession) -> CalendarEvent {
    CalendarEvent {
        id: format!("training-{}", session.id),
        kind: EventKind::Training,
        title: session.course.clone(),
        start_time: session.start_time,
        end_time: session.end_time,
        status: EventStatus::Confirmed,
        branch_id: session.branch_id,
        branch_name: session.branch_name,
        participants: staff_participants(&session.staff_ids, &session.staff_names),
        location: session.location,
        priority: Priority::Low,
        client_id: None,
        staff_ids: session.staff_ids,
        conflicts_with: Vec::new(),
    }
}

fn appointment_event(appointment: Appointment) -> CalendarEvent {
    let mut participants = vec![Participant {
        id: appointment.client_id.clone(),
        name: appointment.client_name.clone(),
        role: ParticipantRole::Client,
    }];
    participants.extend(staff_participants(
        &appointment.staff_ids,
        &appointment.staff_names,
    ));
    CalendarEvent {
        id: format!("meeting-{}", appointment.id),
        kind: EventKind::Meeting,
        title: appointment.title,
        start_time: appointment.start_time,
        end_time: appointment.end_time,
        status: EventStatus::Scheduled,
        branch_id: appointment.branch_id,
        branch_name: appointment.branch_name,
        participants,
        location: appointment.location,
        priority: Priority::Medium,
        client_id: Some(appointment.client_id),
        staff_ids: appointment.staff_ids,
        conflicts_with: Vec::new(),
    }
}
