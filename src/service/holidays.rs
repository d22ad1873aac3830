use chrono::{Datelike, NaiveDate};

use crate::models::booking::LeaveEntry;
use crate::models::event::{
    CalendarEvent, EventKind, EventStatus, Participant, ParticipantRole, Priority,
};

/// Decides which leave/holiday entries fall inside `[start_date, end_date]`
/// and maps them to all-day events.
///
/// Recurring entries are projected onto the start year of the window only.
/// A window spanning a year boundary therefore only sees occurrences dated
/// in its first year; callers that need Dec→Jan coverage must query per
/// year. Non-recurring entries are matched on their exact date.
pub fn resolve_leave(
    entries: Vec<LeaveEntry>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<CalendarEvent> {
    let mut events = Vec::new();
    for entry in entries {
        let occurrence = if entry.recurring {
            project_onto_year(&entry, start_date.year())
        } else {
            Some(entry.date)
        };
        let Some(date) = occurrence else {
            continue;
        };
        if date < start_date || date > end_date {
            continue;
        }
        events.push(leave_event(&entry, date));
    }
    events.sort_by_key(|e| e.start_time);
    events
}

/// Feb 29 entries have no occurrence in a non-leap year.
fn project_onto_year(entry: &LeaveEntry, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, entry.date.month(), entry.date.day())
}

fn leave_event(entry: &LeaveEntry, date: NaiveDate) -> CalendarEvent {
    let start_time = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let end_time = date.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc();
    let mut participants = Vec::new();
    let mut staff_ids = Vec::new();
    if let (Some(staff_id), Some(staff_name)) = (&entry.staff_id, &entry.staff_name) {
        staff_ids.push(staff_id.clone());
        participants.push(Participant {
            id: staff_id.clone(),
            name: staff_name.clone(),
            role: ParticipantRole::Staff,
        });
    }
    CalendarEvent {
        id: format!("leave-{}-{}", entry.id, date),
        kind: EventKind::Leave,
        title: entry.title.clone(),
        start_time,
        end_time,
        status: EventStatus::Confirmed,
        branch_id: entry.branch_id.clone(),
        branch_name: entry.branch_name.clone(),
        participants,
        location: None,
        priority: Priority::Low,
        client_id: None,
        staff_ids,
        conflicts_with: Vec::new(),
    }
}
