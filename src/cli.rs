use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use inquire::Text;

use crate::clients::backend::BackendClient;
use crate::clients::functions::FunctionsClient;
use crate::clients::storage::StorageClient;
use crate::config::Settings;
use crate::error::AppError;
use crate::models::tenant::TenantContext;
use crate::service::calendar::{DateRange, OrganizationCalendar, RefreshOutcome};
use crate::service::export::{calendar_to_csv, schedule_report};
use crate::service::notifications::NotificationService;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the aggregated calendar for a date range.
    Calendar {
        from: NaiveDate,
        to: NaiveDate,
    },
    /// Write the calendar for a date range as CSV to stdout.
    ExportCsv {
        from: NaiveDate,
        to: NaiveDate,
    },
    /// Mark one notification as read.
    MarkRead {
        notification_id: String,
    },
    /// Build the schedule report, prompting for a title.
    Report {
        from: NaiveDate,
        to: NaiveDate,
    },
    /// Upload a document to a branch folder and notify its staff.
    UploadDocument {
        branch_id: String,
        file: PathBuf,
    },
}

pub async fn cli(settings: Settings) {
    // Fine to panic here
    let cli = Cli::parse();
    let ctx = TenantContext::new(settings.organization_id.clone(), settings.branch_ids.clone());
    let backend = BackendClient::new(settings.backend_url.clone(), settings.api_key.clone());
    let calendar = OrganizationCalendar::new(backend.clone());

    let outcome = match &cli.command {
        Commands::Calendar { from, to } => print_calendar(&calendar, &ctx, *from, *to).await,
        Commands::ExportCsv { from, to } => export_csv(&calendar, &ctx, *from, *to).await,
        Commands::MarkRead { notification_id } => {
            mark_read(&backend, &ctx, notification_id).await
        }
        Commands::Report { from, to } => print_report(&calendar, &ctx, &settings, *from, *to).await,
        Commands::UploadDocument { branch_id, file } => {
            upload_document(&settings, &ctx, branch_id, file).await
        }
    };
    if let Err(e) = outcome {
        eprintln!("Command failed: {}", e);
    }
}

async fn fetch_events(
    calendar: &OrganizationCalendar<BackendClient>,
    ctx: &TenantContext,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<crate::models::event::CalendarEvent>, AppError> {
    let range = DateRange::new(from, to)?;
    match calendar.refresh(ctx, range).await? {
        RefreshOutcome::Published(snapshot) => Ok(snapshot.events),
        // Single-shot CLI refresh has no competing fetches.
        RefreshOutcome::Superseded { .. } => Ok(Vec::new()),
    }
}

async fn print_calendar(
    calendar: &OrganizationCalendar<BackendClient>,
    ctx: &TenantContext,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), AppError> {
    let events = fetch_events(calendar, ctx, from, to).await?;
    for event in &events {
        let conflict_note = if event.conflicts_with.is_empty() {
            String::new()
        } else {
            format!("  !! conflicts with {}", event.conflicts_with.join(", "))
        };
        println!(
            "{}  {}  [{}]{}",
            event.start_time.format("%Y-%m-%d %H:%M"),
            event.title,
            event.branch_name,
            conflict_note
        );
    }
    println!("{} events", events.len());
    Ok(())
}

async fn export_csv(
    calendar: &OrganizationCalendar<BackendClient>,
    ctx: &TenantContext,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), AppError> {
    let events = fetch_events(calendar, ctx, from, to).await?;
    print!("{}", calendar_to_csv(&events));
    Ok(())
}

async fn mark_read(
    backend: &BackendClient,
    ctx: &TenantContext,
    notification_id: &str,
) -> Result<(), AppError> {
    let feed = NotificationService::mark_read(backend, ctx, notification_id, Utc::now()).await?;
    let unread = feed.iter().filter(|n| n.is_unread()).count();
    println!("Marked {} read; {} unread remaining", notification_id, unread);
    Ok(())
}

async fn upload_document(
    settings: &Settings,
    ctx: &TenantContext,
    branch_id: &str,
    file: &PathBuf,
) -> Result<(), AppError> {
    if !ctx.includes_branch(branch_id) {
        return Err(AppError::validation(format!(
            "branch {} is not part of this organization",
            branch_id
        )));
    }
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::validation("file has no usable name"))?;
    let bytes = fs::read(file)
        .map_err(|e| AppError::validation(format!("cannot read {}: {}", file.display(), e)))?;

    let storage = StorageClient::new(settings.backend_url.clone(), settings.api_key.clone());
    let functions = FunctionsClient::new(settings.backend_url.clone(), settings.api_key.clone());

    let path = format!("{}/{}", branch_id, file_name);
    storage
        .upload("client-documents", &path, bytes, "application/octet-stream")
        .await?;
    functions
        .notify_document_upload(&ctx.organization_id, branch_id, &path)
        .await?;
    println!("Uploaded {} and notified branch {}", path, branch_id);
    Ok(())
}

async fn print_report(
    calendar: &OrganizationCalendar<BackendClient>,
    ctx: &TenantContext,
    settings: &Settings,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(), AppError> {
    let title = Text::new("Report title:")
        .prompt()
        .map_err(|e| AppError::validation(format!("no report title supplied: {}", e)))?;
    let events = fetch_events(calendar, ctx, from, to).await?;
    let report = schedule_report(&title, &settings.organization_id, Utc::now(), &events);
    print!("{}", report.render_text());
    Ok(())
}
