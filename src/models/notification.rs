use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::Priority;

/// Feed item owned by the backend. This service only reads them and updates
/// `read_at` / `archived_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub read_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MedicationDue,
    MedicationMissed,
    BookingAssigned,
    BookingCancelled,
    ScheduleConflict,
    DocumentUploaded,
    DocumentExpiring,
    InvoiceGenerated,
    PaymentOverdue,
    SystemAnnouncement,
}

/// Fixed buckets the feed is routed into. Every kind maps to exactly one
/// category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Medication,
    Schedule,
    Documents,
    Billing,
    System,
}

/// Secondary client-side filter applied after the category cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFilter {
    All,
    Unread,
    HighPriority,
    Today,
}
