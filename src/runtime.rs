use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};

use crate::api::{routes, AppState};
use crate::clients::backend::BackendClient;
use crate::clients::functions::FunctionsClient;
use crate::clients::storage::StorageClient;
use crate::config::Settings;
use crate::events::queue::EventBus;
use crate::events::worker::{run_event_worker, Navigator, ToastSink};
use crate::models::tenant::TenantContext;
use crate::service::calendar::OrganizationCalendar;
use crate::tasks::calendar_loop::run_calendar_loop;
use crate::tasks::feed_loop::run_feed_loop;
use crate::tasks::task_runner::TaskRunner;

/// Server-side stand-in for the web client's toast bar: the message lands in
/// the log until a connected surface picks it up.
struct LogToasts;

#[async_trait]
impl ToastSink for LogToasts {
    async fn toast(&self, message: &str) {
        info!("toast: {}", message);
    }
}

struct LogNavigator;

#[async_trait]
impl Navigator for LogNavigator {
    async fn navigate(&self, route: &str) {
        info!("navigate: {}", route);
    }
}

/// Wires the clients, background loops and HTTP surface, then serves until
/// shutdown.
pub async fn run_api(settings: Settings) {
    let ctx = TenantContext::new(settings.organization_id.clone(), settings.branch_ids.clone());
    let backend = BackendClient::new(settings.backend_url.clone(), settings.api_key.clone());
    let functions = FunctionsClient::new(settings.backend_url.clone(), settings.api_key.clone());
    let storage = StorageClient::new(settings.backend_url.clone(), settings.api_key.clone());
    let calendar = Arc::new(OrganizationCalendar::new(backend.clone()));

    let toasts: Arc<dyn ToastSink> = Arc::new(LogToasts);
    let navigator: Arc<dyn Navigator> = Arc::new(LogNavigator);
    let (bus, rx) = EventBus::new(64);

    let state = Arc::new(AppState {
        backend: backend.clone(),
        functions,
        storage,
        calendar: calendar.clone(),
        ctx: ctx.clone(),
        tz: settings.timezone,
        bus,
    });

    let mut task_runner = TaskRunner::new();
    task_runner.add_task("feed-loop", {
        let backend = backend.clone();
        let toasts = toasts.clone();
        let ctx = ctx.clone();
        move || {
            tokio::spawn(async move {
                run_feed_loop(Arc::new(backend), toasts, ctx).await;
            });
        }
    });
    task_runner.add_task("calendar-loop", {
        let calendar = calendar.clone();
        let ctx = ctx.clone();
        move || {
            tokio::spawn(async move {
                run_calendar_loop(calendar, ctx).await;
            });
        }
    });
    task_runner.add_task("event-worker", {
        let backend = backend.clone();
        let ctx = ctx.clone();
        move || {
            tokio::spawn(async move {
                run_event_worker(
                    rx,
                    ctx,
                    Arc::new(backend.clone()),
                    Arc::new(backend),
                    toasts,
                    navigator,
                )
                .await;
            });
        }
    });
    task_runner.start_all();

    let addr: SocketAddr = match settings.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid BIND_ADDR {}: {}", settings.bind_addr, err);
            return;
        }
    };
    info!("serving on {}", addr);
    warp::serve(routes(state)).run(addr).await;
}
