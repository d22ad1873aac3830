use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use log::warn;
use serde_json::json;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use serde::Deserialize;

use crate::clients::backend::{BackendClient, Filter as RowFilter};
use crate::clients::functions::FunctionsClient;
use crate::clients::storage::StorageClient;
use crate::error::AppError;
use crate::events::queue::{EventBus, UiEvent};
use crate::models::authority::AuthorityData;
use crate::models::notification::{FeedFilter, NotificationCategory};
use crate::models::tenant::TenantContext;
use crate::service::calendar::{DateRange, OrganizationCalendar, RefreshOutcome};
use crate::service::export::calendar_to_csv;
use crate::service::notifications::{filter_feed, FeedStore, NotificationService};

/// Everything the route handlers need, shared behind an Arc. The calendar
/// is shared with the refresh loop so both see the same generation counter.
pub struct AppState {
    pub backend: BackendClient,
    pub functions: FunctionsClient,
    pub storage: StorageClient,
    pub calendar: Arc<OrganizationCalendar<BackendClient>>,
    pub ctx: TenantContext,
    pub tz: Tz,
    pub bus: EventBus,
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let calendar = warp::path!("calendar")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(get_calendar);

    let notifications = warp::path!("notifications")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(get_notifications);

    let mark_read = warp::path!("notifications" / String / "read")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(post_mark_read);

    let archive = warp::path!("notifications" / String / "archive")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(post_archive);

    let view_details = warp::path!("notifications" / String / "view")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(post_view_details);

    let export_csv = warp::path!("export" / "calendar.csv")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(get_calendar_csv);

    let authorities = warp::path!("authorities")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_authorities);

    let save_authority = warp::path!("authorities")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(post_authority);

    let invite_admin = warp::path!("admins" / "invite")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(post_invite_admin);

    let documents = warp::path!("documents")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(get_documents);

    let document_url = warp::path!("documents" / "url")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state))
        .and_then(get_document_url);

    calendar
        .or(notifications)
        .or(mark_read)
        .or(archive)
        .or(view_details)
        .or(export_csv)
        .or(authorities)
        .or(save_authority)
        .or(invite_admin)
        .or(document_url)
        .or(documents)
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Resolves the query window, defaulting to the rolling week the dashboard
/// shows.
pub fn parse_range(params: &HashMap<String, String>) -> Result<DateRange, AppError> {
    let today = Utc::now().date_naive();
    let start = parse_date(params.get("from"), today)?;
    let end = parse_date(params.get("to"), today + Duration::days(6))?;
    DateRange::new(start, end)
}

fn parse_date(value: Option<&String>, default: NaiveDate) -> Result<NaiveDate, AppError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::validation(format!("invalid date: {}", raw))),
    }
}

/// Narrows the tenant scope to one branch when requested; the branch must
/// already belong to the tenant.
pub fn scoped_ctx(
    ctx: &TenantContext,
    params: &HashMap<String, String>,
) -> Result<TenantContext, AppError> {
    match params.get("branch") {
        None => Ok(ctx.clone()),
        Some(branch) if ctx.includes_branch(branch) => Ok(TenantContext::new(
            ctx.organization_id.clone(),
            vec![branch.clone()],
        )),
        Some(branch) => Err(AppError::validation(format!(
            "branch {} is not part of this organization",
            branch
        ))),
    }
}

pub fn parse_category(raw: &str) -> Result<NotificationCategory, AppError> {
    match raw {
        "medication" => Ok(NotificationCategory::Medication),
        "schedule" => Ok(NotificationCategory::Schedule),
        "documents" => Ok(NotificationCategory::Documents),
        "billing" => Ok(NotificationCategory::Billing),
        "system" => Ok(NotificationCategory::System),
        other => Err(AppError::validation(format!("unknown category: {}", other))),
    }
}

pub fn parse_filter(raw: Option<&String>) -> Result<FeedFilter, AppError> {
    match raw.map(String::as_str) {
        None | Some("all") => Ok(FeedFilter::All),
        Some("unread") => Ok(FeedFilter::Unread),
        Some("high") => Ok(FeedFilter::HighPriority),
        Some("today") => Ok(FeedFilter::Today),
        Some(other) => Err(AppError::validation(format!("unknown filter: {}", other))),
    }
}

async fn get_calendar(
    params: HashMap<String, String>,
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let result = async {
        let range = parse_range(&params)?;
        let ctx = scoped_ctx(&state.ctx, &params)?;
        match state.calendar.refresh(&ctx, range).await? {
            RefreshOutcome::Published(snapshot) => Ok(snapshot),
            // A newer window was published while this one was in flight;
            // serve that instead of the discarded result.
            RefreshOutcome::Superseded { .. } => state
                .calendar
                .latest_snapshot()
                .await
                .ok_or_else(|| AppError::validation("no calendar snapshot available")),
        }
    }
    .await;

    Ok(match result {
        Ok(snapshot) => json_reply(
            StatusCode::OK,
            &json!({
                "generation": snapshot.generation,
                "events": snapshot.events,
            }),
        ),
        Err(err) => error_reply(err),
    })
}

async fn get_notifications(
    params: HashMap<String, String>,
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let result = async {
        let category = parse_category(
            params
                .get("category")
                .ok_or_else(|| AppError::validation("category is required"))?,
        )?;
        let filter = parse_filter(params.get("filter"))?;
        let feed = state.backend.fetch_notifications(&state.ctx).await?;
        Ok::<_, AppError>(filter_feed(&feed, category, filter, Utc::now(), state.tz))
    }
    .await;

    Ok(match result {
        Ok(items) => json_reply(StatusCode::OK, &json!({ "notifications": items })),
        Err(err) => error_reply(err),
    })
}

async fn post_mark_read(
    id: String,
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let result =
        NotificationService::mark_read(&state.backend, &state.ctx, &id, Utc::now()).await;
    Ok(match result {
        Ok(feed) => json_reply(StatusCode::OK, &json!({ "notifications": feed })),
        Err(err) => error_reply(err),
    })
}

async fn post_archive(
    id: String,
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let result = NotificationService::archive(&state.backend, &state.ctx, &id, Utc::now()).await;
    Ok(match result {
        Ok(feed) => json_reply(StatusCode::OK, &json!({ "notifications": feed })),
        Err(err) => error_reply(err),
    })
}

/// Hands the notification to the event worker; the category-specific side
/// effect happens off the request path.
async fn post_view_details(
    id: String,
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let result = async {
        let feed = state.backend.fetch_notifications(&state.ctx).await?;
        let notification = feed
            .into_iter()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::Backend {
                status: 404,
                message: format!("notification {} not found", id),
            })?;
        state
            .bus
            .emit(UiEvent::ViewDetailsRequested { notification })
            .await;
        Ok::<_, AppError>(())
    }
    .await;

    Ok(match result {
        Ok(()) => json_reply(StatusCode::ACCEPTED, &json!({ "status": "accepted" })),
        Err(err) => error_reply(err),
    })
}

async fn get_calendar_csv(
    params: HashMap<String, String>,
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let result = async {
        let range = parse_range(&params)?;
        let ctx = scoped_ctx(&state.ctx, &params)?;
        let snapshot = match state.calendar.refresh(&ctx, range).await? {
            RefreshOutcome::Published(snapshot) => snapshot,
            RefreshOutcome::Superseded { .. } => state
                .calendar
                .latest_snapshot()
                .await
                .ok_or_else(|| AppError::validation("no calendar snapshot available"))?,
        };
        Ok::<_, AppError>(calendar_to_csv(&snapshot.events))
    }
    .await;

    Ok(match result {
        Ok(csv) => warp::reply::with_status(
            warp::reply::with_header(csv, "Content-Type", "text/csv"),
            StatusCode::OK,
        )
        .into_response(),
        Err(err) => error_reply(err),
    })
}

const DOCUMENT_BUCKET: &str = "client-documents";
const SIGNED_URL_TTL_SECS: u64 = 3600;

async fn get_authorities(
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let result: Result<Vec<AuthorityData>, AppError> = state
        .backend
        .select(
            "authorities",
            &[RowFilter::eq("organization_id", &state.ctx.organization_id)],
        )
        .await;
    Ok(match result {
        Ok(records) => json_reply(StatusCode::OK, &json!({ "authorities": records })),
        Err(err) => error_reply(err),
    })
}

/// Creates or updates an authority record: required fields are checked
/// before the write, and the list is refetched after it.
async fn post_authority(
    record: AuthorityData,
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let result = async {
        record.validate()?;
        match &record.id {
            Some(id) => {
                state
                    .backend
                    .update(
                        "authorities",
                        &[
                            RowFilter::eq("organization_id", &state.ctx.organization_id),
                            RowFilter::eq("id", id),
                        ],
                        &serde_json::to_value(&record)?,
                    )
                    .await?
            }
            None => state.backend.insert("authorities", &record).await?,
        }
        state
            .backend
            .select::<AuthorityData>(
                "authorities",
                &[RowFilter::eq("organization_id", &state.ctx.organization_id)],
            )
            .await
    }
    .await;

    Ok(match result {
        Ok(records) => json_reply(StatusCode::OK, &json!({ "authorities": records })),
        Err(err) => error_reply(err),
    })
}

#[derive(Debug, Deserialize)]
struct InviteBody {
    email: String,
    branch_id: String,
}

async fn post_invite_admin(
    body: InviteBody,
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let result = async {
        if !body.email.contains('@') {
            return Err(AppError::validation("a valid email address is required"));
        }
        if !state.ctx.includes_branch(&body.branch_id) {
            return Err(AppError::validation(format!(
                "branch {} is not part of this organization",
                body.branch_id
            )));
        }
        state
            .functions
            .invite_admin(&state.ctx.organization_id, &body.email, &body.branch_id)
            .await
    }
    .await;

    Ok(match result {
        Ok(data) => json_reply(StatusCode::OK, &json!({ "data": data })),
        Err(err) => error_reply(err),
    })
}

async fn get_documents(
    params: HashMap<String, String>,
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let prefix = params.get("prefix").cloned().unwrap_or_default();
    let result = state.storage.list(DOCUMENT_BUCKET, &prefix).await;
    Ok(match result {
        Ok(objects) => json_reply(
            StatusCode::OK,
            &json!({
                "documents": objects
                    .iter()
                    .map(|o| json!({ "name": o.name, "size": o.size, "updated_at": o.updated_at }))
                    .collect::<Vec<_>>(),
            }),
        ),
        Err(err) => error_reply(err),
    })
}

/// Time-limited signed URL for a private document read.
async fn get_document_url(
    params: HashMap<String, String>,
    state: Arc<AppState>,
) -> Result<impl Reply, std::convert::Infallible> {
    let result = async {
        let path = params
            .get("path")
            .ok_or_else(|| AppError::validation("path is required"))?;
        state
            .storage
            .signed_url(DOCUMENT_BUCKET, path, SIGNED_URL_TTL_SECS)
            .await
    }
    .await;

    Ok(match result {
        Ok(url) => json_reply(StatusCode::OK, &json!({ "url": url })),
        Err(err) => error_reply(err),
    })
}

fn json_reply(status: StatusCode, body: &serde_json::Value) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn error_reply(err: AppError) -> warp::reply::Response {
    let status = match &err {
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::Backend { status, .. } if *status == 404 => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    warn!("request failed: {}", err);
    json_reply(status, &json!({ "error": err.to_string() }))
}
