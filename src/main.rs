//! FC Tracker command-line driver
//!
//! Loads configuration, refreshes the content catalog, adds members, runs a
//! guild sync and prints the resulting member records as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::json;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fc_tracker_lib::application::{ContentFilter, OwnershipFilter, content_progress, guild_progress};
use fc_tracker_lib::build_services;
use fc_tracker_lib::domain::{ContentType, MemberEntry};
use fc_tracker_lib::infrastructure::{ConfigManager, init_logging_with_config};

/// Command-line arguments for fc-tracker
#[derive(Parser, Debug)]
#[command(name = "fc-tracker")]
#[command(about = "Sync Free Company mount, minion and achievement collections")]
#[command(version)]
struct Args {
    /// Configuration file (JSON or TOML); defaults to the platform config dir
    #[arg(short, long, env = "FC_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Member to track, as `Name@Server`; repeatable
    #[arg(short, long = "member", value_name = "NAME@SERVER")]
    members: Vec<MemberEntry>,

    /// Import every member of this Free Company
    #[arg(short, long, value_name = "FC_ID")]
    roster: Option<String>,

    /// Also print per-item guild progress for this content type
    #[arg(long, value_name = "TYPE")]
    report: Option<String>,

    /// Item ownership shown in the report
    #[arg(long, value_enum, default_value = "missing")]
    show: ShowArg,

    /// Case-insensitive item name filter for the report
    #[arg(long)]
    search: Option<String>,

    /// Acquisition source filter for the report
    #[arg(long)]
    source: Option<String>,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ShowArg {
    Missing,
    Owned,
    All,
}

impl From<ShowArg> for OwnershipFilter {
    fn from(arg: ShowArg) -> Self {
        match arg {
            ShowArg::Missing => Self::Missing,
            ShowArg::Owned => Self::Owned,
            ShowArg::All => Self::All,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new()?,
    };
    let config = manager.load()?;
    init_logging_with_config(&config.logging).context("Failed to initialize logging")?;
    info!("Starting FC Tracker v{}", env!("CARGO_PKG_VERSION"));

    if args.save_config {
        manager.save(&config).await?;
    }

    let report_type = args
        .report
        .as_deref()
        .map(|value| ContentType::parse(value).with_context(|| format!("Unknown content type '{value}'")))
        .transpose()?;

    let services = build_services(&config)?;

    let refresh = services.catalog.refresh(services.catalog_provider.as_ref()).await;
    if !refresh.is_complete() {
        warn!("Catalog partially loaded: {:?}", refresh.failed);
    }

    for entry in &args.members {
        services.store.add_entry(entry).await;
    }

    if let Some(fc_id) = args.roster.as_deref().or(config.free_company_id.as_deref()) {
        let roster = services
            .roster
            .fetch_roster(fc_id)
            .await
            .with_context(|| format!("Failed to load roster for {fc_id}"))?;
        services.store.add_from_roster(&roster).await;
    }

    if services.store.is_empty().await {
        bail!("No members to sync; pass --member NAME@SERVER or --roster FC_ID");
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received; stopping after the current member");
            ctrl_c.cancel();
        }
    });

    let report = services.orchestrator.sync_all(&cancel).await;

    let members = services.store.list().await;
    let catalog = services.catalog.snapshot().await;
    let mut output = json!({
        "report": report,
        "members": members,
        "progress": guild_progress(&members, &catalog),
    });

    if let Some(content_type) = report_type {
        let filter = ContentFilter {
            ownership: args.show.into(),
            search: args.search.clone(),
            source: args.source.clone(),
        };
        output["items"] = serde_json::to_value(content_progress(&members, &catalog, content_type, &filter))?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
