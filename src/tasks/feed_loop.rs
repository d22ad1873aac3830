use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::time::sleep;

use crate::error::AppError;
use crate::events::worker::ToastSink;
use crate::models::event::Priority;
use crate::models::notification::NotificationCategory;
use crate::models::tenant::TenantContext;
use crate::service::notifications::{category_for, FeedStore};

const POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub unread_by_category: HashMap<NotificationCategory, usize>,
    pub surfaced: usize,
}

/// Polls the backend feed and surfaces unseen high-priority items as toasts.
pub async fn run_feed_loop(
    store: Arc<dyn FeedStore>,
    toasts: Arc<dyn ToastSink>,
    ctx: TenantContext,
) {
    let mut seen: HashSet<String> = HashSet::new();
    loop {
        sleep(POLL_INTERVAL).await;
        match feed_tick(store.as_ref(), toasts.as_ref(), &ctx, &mut seen).await {
            Ok(summary) => {
                let unread: usize = summary.unread_by_category.values().sum();
                info!(
                    "feed poll: {} unread, {} surfaced",
                    unread, summary.surfaced
                );
            }
            Err(err) => {
                error!("feed poll failed: {}", err);
            }
        }
    }
}

/// One poll cycle, split out so tests can drive it with fakes. The first
/// tick primes `seen` without toasting the backlog.
pub async fn feed_tick<S: FeedStore + ?Sized, T: ToastSink + ?Sized>(
    store: &S,
    toasts: &T,
    ctx: &TenantContext,
    seen: &mut HashSet<String>,
) -> Result<FeedSummary, AppError> {
    let feed = store.fetch_notifications(ctx).await?;
    let priming = seen.is_empty();

    let mut summary = FeedSummary::default();
    for item in &feed {
        if item.archived_at.is_some() {
            continue;
        }
        if item.is_unread() {
            *summary
                .unread_by_category
                .entry(category_for(item.kind))
                .or_insert(0) += 1;
        }
        let is_new = seen.insert(item.id.clone());
        if is_new && !priming && item.priority == Priority::High && item.is_unread() {
            toasts.toast(&format!("{}: {}", item.title, item.message)).await;
            summary.surfaced += 1;
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::{Notification, NotificationKind};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use tokio::sync::Mutex as TokioMutex;

    struct FakeStore {
        feed: Vec<Notification>,
    }

    #[async_trait]
    impl FeedStore for FakeStore {
        async fn fetch_notifications(
            &self,
            _ctx: &TenantContext,
        ) -> Result<Vec<Notification>, AppError> {
            Ok(self.feed.clone())
        }

        async fn set_read_at(
            &self,
            _ctx: &TenantContext,
            _id: &str,
            _read_at: DateTime<Utc>,
        ) -> Result<(), AppError> {
            Ok(())
        }

        async fn set_archived_at(
            &self,
            _ctx: &TenantContext,
            _id: &str,
            _archived_at: DateTime<Utc>,
        ) -> Result<(), AppError> {
            Ok(())
        }
    }

    struct RecordingToasts {
        messages: TokioMutex<Vec<String>>,
    }

    #[async_trait]
    impl ToastSink for RecordingToasts {
        async fn toast(&self, message: &str) {
            self.messages.lock().await.push(message.to_string());
        }
    }

    fn item(id: &str, priority: Priority) -> Notification {
        Notification {
            id: id.to_string(),
            kind: NotificationKind::MedicationMissed,
            title: "Missed medication".to_string(),
            message: "Client c1 missed 08:00 dose".to_string(),
            priority,
            read_at: None,
            archived_at: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 5, 0).unwrap(),
            data: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn first_tick_primes_without_toasting() {
        let store = FakeStore {
            feed: vec![item("n1", Priority::High)],
        };
        let toasts = RecordingToasts {
            messages: TokioMutex::new(Vec::new()),
        };
        let ctx = TenantContext::new("org1", vec!["b1".to_string()]);
        let mut seen = HashSet::new();

        let summary = feed_tick(&store, &toasts, &ctx, &mut seen).await.unwrap();
        assert_eq!(summary.surfaced, 0);
        assert_eq!(
            summary.unread_by_category[&NotificationCategory::Medication],
            1
        );
        assert!(toasts.messages.lock().await.is_empty());
    }

    #[tokio::test]
    async fn later_ticks_toast_new_high_priority_only() {
        let toasts = RecordingToasts {
            messages: TokioMutex::new(Vec::new()),
        };
        let ctx = TenantContext::new("org1", vec!["b1".to_string()]);
        let mut seen = HashSet::new();

        let store = FakeStore {
            feed: vec![item("n1", Priority::Low)],
        };
        feed_tick(&store, &toasts, &ctx, &mut seen).await.unwrap();

        let store = FakeStore {
            feed: vec![
                item("n1", Priority::Low),
                item("n2", Priority::High),
                item("n3", Priority::Low),
            ],
        };
        let summary = feed_tick(&store, &toasts, &ctx, &mut seen).await.unwrap();
        assert_eq!(summary.surfaced, 1);
        let messages = toasts.messages.lock().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Missed medication"));
    }
}
