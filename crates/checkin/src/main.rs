mod config;
mod services;
mod state;
mod storage;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkin_core::event::{event_code_from_object_key, CreateEventRequest, EventOrganization};

use crate::config::Config;
use crate::services::{checkin, event, organization, registration};
use crate::state::AppState;

/// Checkin - QR code check-in for events
#[derive(Parser, Debug)]
#[command(name = "checkin")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage events
    #[command(subcommand)]
    Event(EventCommand),

    /// Manage event registrations
    #[command(subcommand)]
    Registrations(RegistrationsCommand),

    /// Check an attendee into an event
    CheckIn {
        /// Event code from the scanned QR code
        #[arg(long)]
        event_code: String,

        /// Attendee phone number; dashes are ignored
        #[arg(long)]
        phone: String,
    },

    /// Inspect an attendee's check-ins
    #[command(subcommand)]
    CheckIns(CheckInsCommand),

    /// Manage organizations
    #[command(subcommand)]
    Organization(OrganizationCommand),
}

#[derive(Subcommand, Debug)]
enum EventCommand {
    /// Create an event under a fresh code
    Create(CreateEventArgs),

    /// Show an event
    Get { event_code: String },
}

#[derive(Args, Debug)]
struct CreateEventArgs {
    #[arg(long)]
    name: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Start time, RFC 3339
    #[arg(long)]
    starts_at: DateTime<Utc>,

    /// Instant check-in closes, RFC 3339
    #[arg(long)]
    closes_at: DateTime<Utc>,

    /// Event version attendance is counted under
    #[arg(long)]
    version: String,

    #[arg(long)]
    organization: String,
}

#[derive(Subcommand, Debug)]
enum RegistrationsCommand {
    /// Import a CSV registration export
    Import {
        /// Export file; a name like `registrations_{code}.csv` carries the event code
        file: PathBuf,

        /// Event code, when the file name does not carry it
        #[arg(long)]
        event_code: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum CheckInsCommand {
    /// List check-ins by phone number
    List {
        #[arg(long)]
        phone: String,

        /// Only this event version
        #[arg(long)]
        version: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum OrganizationCommand {
    /// Create or replace an organization
    Create {
        #[arg(long)]
        code: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        logo_url: String,

        /// Event versions run by the organization
        #[arg(long = "version")]
        versions: Vec<String>,
    },

    /// Show an organization
    Get { code: String },

    /// Add an event version to an organization
    AddVersion {
        #[arg(long)]
        code: String,

        #[arg(long)]
        version: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Config::from_env();
    let state = AppState::new(&config).await?;

    match cli.command {
        Command::Event(EventCommand::Create(args)) => {
            let request = CreateEventRequest {
                event_name: args.name,
                description: args.description,
                event_date_time: args.starts_at,
                code_expired_at: args.closes_at,
                event_version: args.version,
                organization_code: args.organization,
            };
            print_json(&event::create_event(&state, request).await?)
        }
        Command::Event(EventCommand::Get { event_code }) => {
            let found = event::get_event(&state, &event_code)
                .await?
                .with_context(|| format!("Event not found: {event_code}"))?;
            print_json(&found)
        }
        Command::Registrations(RegistrationsCommand::Import { file, event_code }) => {
            let event_code = match event_code {
                Some(code) => code,
                None => file
                    .to_str()
                    .and_then(event_code_from_object_key)
                    .map(str::to_string)
                    .with_context(|| {
                        format!("No event code in {}; pass --event-code", file.display())
                    })?,
            };
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

            let summary =
                registration::import_registrations(&state, &event_code, &content, &cancel).await?;
            print_json(&summary)?;
            if !summary.is_complete() {
                anyhow::bail!(
                    "{} registrations were not written",
                    summary.unwritten.len()
                );
            }
            Ok(())
        }
        Command::CheckIn { event_code, phone } => {
            let response =
                checkin::check_attendance(&state, &event_code, &phone, Utc::now()).await?;
            print_json(&response)
        }
        Command::CheckIns(CheckInsCommand::List { phone, version }) => {
            print_json(&checkin::list_check_ins(&state, &phone, version.as_deref()).await?)
        }
        Command::Organization(OrganizationCommand::Create {
            code,
            name,
            logo_url,
            versions,
        }) => {
            let record = EventOrganization {
                organization_code: code,
                organization_name: name,
                logo_url,
                event_version: versions,
            };
            print_json(&organization::save_organization(&state, record).await?)
        }
        Command::Organization(OrganizationCommand::Get { code }) => {
            let found = organization::get_organization(&state, &code)
                .await?
                .with_context(|| format!("Organization not found: {code}"))?;
            print_json(&found)
        }
        Command::Organization(OrganizationCommand::AddVersion { code, version }) => {
            print_json(&organization::add_event_version(&state, &code, &version).await?)
        }
    }
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "checkin=info,checkin_core=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, stopping import...");
        cancel.cancel();
    }
}
