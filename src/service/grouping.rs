use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::booking::BookingRow;
use crate::models::event::{
    CalendarEvent, EventKind, Participant, ParticipantRole, Priority,
};
use crate::models::tenant::BranchAdmin;

pub const UNASSIGNED_PLACEHOLDER: &str = "Needs Carer Assignment";

/// Composite key identifying one visit across its staff-assignment rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VisitKey {
    client_id: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    service: String,
}

/// Collapses raw booking rows (one per staff assignment) into one event per
/// visit. Participants are the client, each assigned carer exactly once, and
/// the branch admins. A visit with no assigned carer gets the placeholder
/// participant instead. Output is chronological; ordering within a start
/// time is not specified.
pub fn group_bookings(
    rows: Vec<BookingRow>,
    branch_admins: &HashMap<String, Vec<BranchAdmin>>,
) -> Vec<CalendarEvent> {
    let mut groups: HashMap<VisitKey, Vec<BookingRow>> = HashMap::new();
    let mut order: Vec<VisitKey> = Vec::new();
    for row in rows {
        let key = VisitKey {
            client_id: row.client_id.clone(),
            start_time: row.start_time,
            end_time: row.end_time,
            service: row.service.clone(),
        };
        match groups.get_mut(&key) {
            Some(group) => group.push(row),
            None => {
                order.push(key.clone());
                groups.insert(key, vec![row]);
            }
        }
    }

    let mut events: Vec<CalendarEvent> = order
        .into_iter()
        .map(|key| {
            let group = groups.remove(&key).unwrap_or_default();
            build_event(group, branch_admins)
        })
        .collect();
    events.sort_by_key(|e| e.start_time);
    events
}

fn build_event(
    group: Vec<BookingRow>,
    branch_admins: &HashMap<String, Vec<BranchAdmin>>,
) -> CalendarEvent {
    let first = &group[0];
    let mut participants = vec![Participant {
        id: first.client_id.clone(),
        name: first.client_name.clone(),
        role: ParticipantRole::Client,
    }];

    let mut staff_ids: Vec<String> = Vec::new();
    for row in &group {
        let (Some(staff_id), Some(staff_name)) = (&row.staff_id, &row.staff_name) else {
            continue;
        };
        if staff_ids.contains(staff_id) {
            continue;
        }
        staff_ids.push(staff_id.clone());
        participants.push(Participant {
            id: staff_id.clone(),
            name: staff_name.clone(),
            role: ParticipantRole::Staff,
        });
    }

    if staff_ids.is_empty() {
        participants.push(Participant {
            id: format!("unassigned-{}", first.id),
            name: UNASSIGNED_PLACEHOLDER.to_string(),
            role: ParticipantRole::Placeholder,
        });
    }

    if let Some(admins) = branch_admins.get(&first.branch_id) {
        for admin in admins {
            participants.push(Participant {
                id: admin.id.clone(),
                name: admin.name.clone(),
                role: ParticipantRole::Admin,
            });
        }
    }

    CalendarEvent {
        id: format!(
            "booking-{}-{}-{}",
            first.client_id,
            first.start_time.timestamp(),
            first.service.replace(' ', "-").to_lowercase()
        ),
        kind: EventKind::Booking,
        title: format!("{} - {}", first.client_name, first.service),
        start_time: first.start_time,
        end_time: first.end_time,
        status: first.status,
        branch_id: first.branch_id.clone(),
        branch_name: first.branch_name.clone(),
        participants,
        location: first.location.clone(),
        priority: if staff_ids.is_empty() {
            Priority::High
        } else {
            Priority::Medium
        },
        client_id: Some(first.client_id.clone()),
        staff_ids,
        conflicts_with: Vec::new(),
    }
}
