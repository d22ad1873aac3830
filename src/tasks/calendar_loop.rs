use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use log::{error, info};
use tokio::time::sleep;

use crate::models::tenant::TenantContext;
use crate::service::calendar::{CalendarSource, DateRange, OrganizationCalendar, RefreshOutcome};

const REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Keeps the published snapshot warm for the rolling seven-day window the
/// dashboard shows by default.
pub async fn run_calendar_loop<S: CalendarSource>(
    calendar: Arc<OrganizationCalendar<S>>,
    ctx: TenantContext,
) {
    loop {
        let today = Utc::now().date_naive();
        let range = match DateRange::new(today, today + ChronoDuration::days(6)) {
            Ok(range) => range,
            Err(err) => {
                error!("calendar loop range: {}", err);
                sleep(REFRESH_INTERVAL).await;
                continue;
            }
        };
        match calendar.refresh(&ctx, range).await {
            Ok(RefreshOutcome::Published(snapshot)) => {
                info!(
                    "calendar refresh generation {} published {} events",
                    snapshot.generation,
                    snapshot.events.len()
                );
            }
            Ok(RefreshOutcome::Superseded { generation, latest }) => {
                info!(
                    "calendar refresh generation {} discarded, latest is {}",
                    generation, latest
                );
            }
            Err(err) => {
                error!("calendar refresh failed: {}", err);
            }
        }
        sleep(REFRESH_INTERVAL).await;
    }
}
