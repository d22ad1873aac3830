use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::event::EventStatus;

/// Raw booking row as stored by the backend: one row per staff assignment.
/// Several rows describe the same visit when multiple carers attend; the
/// grouper collapses them on (client, start, end, service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRow {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub service: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: EventStatus,
    pub branch_id: String,
    pub branch_name: String,
    pub staff_id: Option<String>,
    pub staff_name: Option<String>,
    pub location: Option<String>,
}

/// A visit generated from a scheduled care agreement rather than an ad-hoc
/// booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementVisit {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub service: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub branch_id: String,
    pub branch_name: String,
    pub staff_ids: Vec<String>,
    pub staff_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: String,
    pub course: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub branch_id: String,
    pub branch_name: String,
    pub staff_ids: Vec<String>,
    pub staff_names: Vec<String>,
    pub location: Option<String>,
}

/// Annual leave or public holiday. Public holidays may recur yearly, in
/// which case `date` carries the original month/day and `recurring` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveEntry {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub recurring: bool,
    pub branch_id: String,
    pub branch_name: String,
    pub staff_id: Option<String>,
    pub staff_name: Option<String>,
}

/// Client appointment outside the care rota (reviews, meetings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub branch_id: String,
    pub branch_name: String,
    pub staff_ids: Vec<String>,
    pub staff_names: Vec<String>,
    pub location: Option<String>,
}
