use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::warn;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::clients::backend::{BackendClient, Filter};
use crate::error::AppError;
use crate::events::queue::UiEvent;
use crate::models::notification::{Notification, NotificationCategory};
use crate::models::tenant::TenantContext;
use crate::service::notifications::{category_for, route_for, FeedStore, NotificationService};

/// Extra detail fetched when the medication category's view action fires.
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn medication_detail(
        &self,
        ctx: &TenantContext,
        notification: &Notification,
    ) -> Result<Value, AppError>;
}

#[async_trait]
impl DetailSource for BackendClient {
    async fn medication_detail(
        &self,
        ctx: &TenantContext,
        notification: &Notification,
    ) -> Result<Value, AppError> {
        let record_id = notification
            .data
            .get("reference_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::validation("notification has no medication reference"))?;
        let rows: Vec<Value> = self
            .select(
                "medication_records",
                &[
                    Filter::eq("organization_id", &ctx.organization_id),
                    Filter::eq("id", record_id),
                ],
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| AppError::Backend {
            status: 404,
            message: format!("medication record {} not found", record_id),
        })
    }
}

/// User-facing message sink: the toast bar in the web surface, stderr in the
/// CLI.
#[async_trait]
pub trait ToastSink: Send + Sync {
    async fn toast(&self, message: &str);
}

#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, route: &str);
}

/// Drains UI events and performs the category-specific side effect for each.
/// Failures surface as a toast only; there is no retry and the feed state is
/// left as it was.
pub async fn run_event_worker(
    mut rx: mpsc::Receiver<UiEvent>,
    ctx: TenantContext,
    feed: Arc<dyn FeedStore>,
    details: Arc<dyn DetailSource>,
    toasts: Arc<dyn ToastSink>,
    navigator: Arc<dyn Navigator>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            UiEvent::ViewDetailsRequested { notification } => {
                handle_view_details(&ctx, &notification, details.as_ref(), toasts.as_ref(), navigator.as_ref())
                    .await;
            }
            UiEvent::MarkReadRequested { notification_id } => {
                if let Err(err) =
                    NotificationService::mark_read(feed.as_ref(), &ctx, &notification_id, Utc::now())
                        .await
                {
                    warn!("mark read {} failed: {}", notification_id, err);
                    toasts
                        .toast(&format!("Could not mark notification as read: {}", err))
                        .await;
                }
            }
        }
    }
}

pub async fn handle_view_details(
    ctx: &TenantContext,
    notification: &Notification,
    details: &dyn DetailSource,
    toasts: &dyn ToastSink,
    navigator: &dyn Navigator,
) {
    let category = category_for(notification.kind);
    match category {
        NotificationCategory::Medication => match details.medication_detail(ctx, notification).await {
            Ok(detail) => {
                let name = detail
                    .get("medication_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("medication");
                toasts
                    .toast(&format!("{}: {}", name, notification.message))
                    .await;
            }
            Err(err) => {
                warn!("medication detail for {} failed: {}", notification.id, err);
                toasts
                    .toast(&format!("Could not load medication details: {}", err))
                    .await;
            }
        },
        _ => {
            if let Some(route) = route_for(category, notification) {
                navigator.navigate(&route).await;
            }
        }
    }
}
