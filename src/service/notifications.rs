use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::clients::backend::{BackendClient, Filter};
use crate::error::AppError;
use crate::models::event::Priority;
use crate::models::notification::{
    FeedFilter, Notification, NotificationCategory, NotificationKind,
};
use crate::models::tenant::TenantContext;

/// Static category table. Routing is a total function over the kind set;
/// adding a kind without a row here is a compile error via `category_for`.
pub const CATEGORY_TABLE: &[(NotificationCategory, &[NotificationKind])] = &[
    (
        NotificationCategory::Medication,
        &[
            NotificationKind::MedicationDue,
            NotificationKind::MedicationMissed,
        ],
    ),
    (
        NotificationCategory::Schedule,
        &[
            NotificationKind::BookingAssigned,
            NotificationKind::BookingCancelled,
            NotificationKind::ScheduleConflict,
        ],
    ),
    (
        NotificationCategory::Documents,
        &[
            NotificationKind::DocumentUploaded,
            NotificationKind::DocumentExpiring,
        ],
    ),
    (
        NotificationCategory::Billing,
        &[
            NotificationKind::InvoiceGenerated,
            NotificationKind::PaymentOverdue,
        ],
    ),
    (
        NotificationCategory::System,
        &[NotificationKind::SystemAnnouncement],
    ),
];

pub fn category_for(kind: NotificationKind) -> NotificationCategory {
    match kind {
        NotificationKind::MedicationDue | NotificationKind::MedicationMissed => {
            NotificationCategory::Medication
        }
        NotificationKind::BookingAssigned
        | NotificationKind::BookingCancelled
        | NotificationKind::ScheduleConflict => NotificationCategory::Schedule,
        NotificationKind::DocumentUploaded | NotificationKind::DocumentExpiring => {
            NotificationCategory::Documents
        }
        NotificationKind::InvoiceGenerated | NotificationKind::PaymentOverdue => {
            NotificationCategory::Billing
        }
        NotificationKind::SystemAnnouncement => NotificationCategory::System,
    }
}

/// Category cut plus one of the four secondary filters. Pure: the feed is
/// never mutated, archived items never show, and `Today` is evaluated in the
/// organization's timezone.
pub fn filter_feed(
    items: &[Notification],
    category: NotificationCategory,
    filter: FeedFilter,
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<Notification> {
    let today = now.with_timezone(&tz).date_naive();
    items
        .iter()
        .filter(|n| n.archived_at.is_none())
        .filter(|n| category_for(n.kind) == category)
        .filter(|n| match filter {
            FeedFilter::All => true,
            FeedFilter::Unread => n.is_unread(),
            FeedFilter::HighPriority => n.priority == Priority::High,
            FeedFilter::Today => n.created_at.with_timezone(&tz).date_naive() == today,
        })
        .cloned()
        .collect()
}

/// Navigation target for a category's view-details action. Medication has
/// none: it fetches extra detail instead of navigating.
pub fn route_for(category: NotificationCategory, notification: &Notification) -> Option<String> {
    let reference = notification.data.get("reference_id").and_then(|v| v.as_str());
    match category {
        NotificationCategory::Medication => None,
        NotificationCategory::Schedule => Some(format!(
            "/calendar?focus={}",
            reference.unwrap_or(&notification.id)
        )),
        NotificationCategory::Documents => Some(format!(
            "/documents/{}",
            reference.unwrap_or(&notification.id)
        )),
        NotificationCategory::Billing => Some(format!(
            "/invoices/{}",
            reference.unwrap_or(&notification.id)
        )),
        NotificationCategory::System => Some(format!("/notifications/{}", notification.id)),
    }
}

/// Read/update access to the backend-owned feed. The fetch is the one query
/// in the service that retries with backoff.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn fetch_notifications(&self, ctx: &TenantContext) -> Result<Vec<Notification>, AppError>;
    async fn set_read_at(
        &self,
        ctx: &TenantContext,
        id: &str,
        read_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
    async fn set_archived_at(
        &self,
        ctx: &TenantContext,
        id: &str,
        archived_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

#[async_trait]
impl FeedStore for BackendClient {
    async fn fetch_notifications(&self, ctx: &TenantContext) -> Result<Vec<Notification>, AppError> {
        self.select_with_retry(
            "notifications",
            &[Filter::eq("organization_id", &ctx.organization_id)],
        )
        .await
    }

    async fn set_read_at(
        &self,
        ctx: &TenantContext,
        id: &str,
        read_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.update(
            "notifications",
            &[
                Filter::eq("organization_id", &ctx.organization_id),
                Filter::eq("id", id),
            ],
            &serde_json::json!({ "read_at": read_at.to_rfc3339() }),
        )
        .await
    }

    async fn set_archived_at(
        &self,
        ctx: &TenantContext,
        id: &str,
        archived_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.update(
            "notifications",
            &[
                Filter::eq("organization_id", &ctx.organization_id),
                Filter::eq("id", id),
            ],
            &serde_json::json!({ "archived_at": archived_at.to_rfc3339() }),
        )
        .await
    }
}

pub struct NotificationService;

impl NotificationService {
    /// Marks one item read and refetches the feed; local state is never
    /// patched optimistically.
    pub async fn mark_read<S: FeedStore + ?Sized>(
        store: &S,
        ctx: &TenantContext,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, AppError> {
        store.set_read_at(ctx, id, now).await?;
        store.fetch_notifications(ctx).await
    }

    pub async fn archive<S: FeedStore + ?Sized>(
        store: &S,
        ctx: &TenantContext,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, AppError> {
        store.set_archived_at(ctx, id, now).await?;
        store.fetch_notifications(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::London;

    fn item(
        id: &str,
        kind: NotificationKind,
        priority: Priority,
        read: bool,
        created_at: DateTime<Utc>,
    ) -> Notification {
        Notification {
            id: id.to_string(),
            kind,
            title: "t".to_string(),
            message: "m".to_string(),
            priority,
            read_at: read.then(|| created_at),
            archived_at: None,
            created_at,
            data: serde_json::Value::Null,
        }
    }

    #[test]
    fn every_kind_in_the_table_routes_to_its_category() {
        for (category, kinds) in CATEGORY_TABLE {
            for kind in *kinds {
                assert_eq!(category_for(*kind), *category);
            }
        }
    }

    #[test]
    fn category_cut_then_unread_equals_composed_filters() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let feed = vec![
            item("n1", NotificationKind::MedicationDue, Priority::High, false, now),
            item("n2", NotificationKind::MedicationDue, Priority::Low, true, now),
            item("n3", NotificationKind::BookingAssigned, Priority::Low, false, now),
        ];
        let category_then_unread = filter_feed(
            &filter_feed(&feed, NotificationCategory::Medication, FeedFilter::All, now, London),
            NotificationCategory::Medication,
            FeedFilter::Unread,
            now,
            London,
        );
        let mut composed = filter_feed(&feed, NotificationCategory::Medication, FeedFilter::All, now, London);
        composed.retain(Notification::is_unread);
        assert_eq!(
            category_then_unread.iter().map(|n| &n.id).collect::<Vec<_>>(),
            composed.iter().map(|n| &n.id).collect::<Vec<_>>()
        );
        assert_eq!(category_then_unread.len(), 1);
        assert_eq!(category_then_unread[0].id, "n1");
    }

    #[test]
    fn today_filter_uses_org_timezone() {
        // 23:30 UTC on March 1st is already March 2nd in Auckland.
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 1, 0, 0).unwrap();
        let feed = vec![item(
            "n1",
            NotificationKind::SystemAnnouncement,
            Priority::Low,
            false,
            created,
        )];
        let auckland = filter_feed(
            &feed,
            NotificationCategory::System,
            FeedFilter::Today,
            now,
            chrono_tz::Pacific::Auckland,
        );
        let london = filter_feed(
            &feed,
            NotificationCategory::System,
            FeedFilter::Today,
            now,
            London,
        );
        assert_eq!(auckland.len(), 1);
        assert!(london.is_empty());
    }

    #[test]
    fn archived_items_never_appear() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let mut archived = item("n1", NotificationKind::PaymentOverdue, Priority::High, false, now);
        archived.archived_at = Some(now);
        let feed = vec![archived];
        assert!(filter_feed(&feed, NotificationCategory::Billing, FeedFilter::All, now, London).is_empty());
    }

    #[test]
    fn routes_are_category_specific() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let mut n = item("n1", NotificationKind::InvoiceGenerated, Priority::Low, false, now);
        n.data = serde_json::json!({ "reference_id": "inv-9" });
        assert_eq!(
            route_for(NotificationCategory::Billing, &n).as_deref(),
            Some("/invoices/inv-9")
        );
        assert_eq!(route_for(NotificationCategory::Medication, &n), None);
    }
}
