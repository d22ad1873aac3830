use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Booking,
    Agreement,
    Training,
    Leave,
    Meeting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Client,
    Staff,
    Admin,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub role: ParticipantRole,
}

/// One entry in the merged organization calendar. Recomputed on every query;
/// no identity survives across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub kind: EventKind,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: EventStatus,
    pub branch_id: String,
    pub branch_name: String,
    pub participants: Vec<Participant>,
    pub location: Option<String>,
    pub priority: Priority,
    pub client_id: Option<String>,
    pub staff_ids: Vec<String>,
    /// Ids of other events in the same result set that share a staff member
    /// and overlap in time. Advisory only.
    pub conflicts_with: Vec<String>,
}

impl CalendarEvent {
    /// Half-open interval overlap: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &CalendarEvent) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn shares_staff(&self, other: &CalendarEvent) -> bool {
        self.staff_ids.iter().any(|s| other.staff_ids.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(id: &str, start_h: u32, end_h: u32, staff: &[&str]) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            kind: EventKind::Booking,
            title: "visit".to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 3, 2, start_h, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 3, 2, end_h, 0, 0).unwrap(),
            status: EventStatus::Scheduled,
            branch_id: "b1".to_string(),
            branch_name: "North".to_string(),
            participants: Vec::new(),
            location: None,
            priority: Priority::Medium,
            client_id: None,
            staff_ids: staff.iter().map(|s| s.to_string()).collect(),
            conflicts_with: Vec::new(),
        }
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a = event("a", 9, 10, &["s1"]);
        let c = event("c", 10, 11, &["s1"]);
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn nested_intervals_overlap() {
        let a = event("a", 9, 12, &["s1"]);
        let b = event("b", 10, 11, &["s2"]);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn shares_staff_on_any_common_id() {
        let a = event("a", 9, 10, &["s1", "s2"]);
        let b = event("b", 9, 10, &["s2", "s3"]);
        let c = event("c", 9, 10, &["s4"]);
        assert!(a.shares_staff(&b));
        assert!(!a.shares_staff(&c));
    }
}
