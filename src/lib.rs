pub mod audit;
pub mod db;
pub mod device;
pub mod host;
pub mod identity;
pub mod journey;
pub mod models;
pub mod monitor;
pub mod observer;
pub mod reporter;
pub mod settings;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use audit::{default_audit_config, select_scenario, AuditRunner, LoggingDriver};
use db::Database;
use device::SystemProbe;
use host::{channel_page, EntryType, HostHandle, HostMessage};
use monitor::RumMonitor;
use reporter::{HttpTransport, MemoryTransport, Transport};
use settings::{RumSettings, SettingsStore};

const HOME_ENV: &str = "VITALWATCH_HOME";
const DEFAULT_DATA_DIR: &str = ".vitalwatch";
const DATABASE_FILE: &str = "vitalwatch.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Parser)]
#[command(name = "vitalwatch")]
#[command(about = "Real user monitoring and synthetic mobile audits for Core Web Vitals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replays the audit scenarios across every network and device profile
    Audit {
        /// Data directory holding settings.json
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Run only the scenario with this name
        #[arg(long)]
        scenario: Option<String>,
    },
    /// Runs a RUM session fed by host messages (JSON lines) on stdin
    Monitor {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Page path at load time
        #[arg(long, default_value = "/")]
        location: String,
        /// Keep sends in memory instead of posting them
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = match &cli.command {
        Commands::Audit { data_dir, .. } | Commands::Monitor { data_dir, .. } => {
            resolve_data_dir(data_dir.clone(), std::env::var(HOME_ENV).ok())
        }
    };
    let settings_store = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
    let settings = settings_store.rum().with_env_overrides();

    utils::init_logging(&settings.log_level);
    info!("vitalwatch starting, data in {}", data_dir.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Audit { scenario, .. } => run_audit(&settings, scenario).await,
            Commands::Monitor {
                location, dry_run, ..
            } => run_monitor(&settings, &data_dir, location, dry_run).await,
        }
    })
}

fn resolve_data_dir(flag: Option<PathBuf>, env_home: Option<String>) -> PathBuf {
    flag.or_else(|| {
        env_home
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

async fn run_audit(settings: &RumSettings, scenario: Option<String>) -> Result<()> {
    let config = match scenario {
        Some(name) => select_scenario(default_audit_config(), &name)?,
        None => default_audit_config(),
    };

    let runner = AuditRunner::new(Arc::new(LoggingDriver), config, settings.default_step_wait());
    let report = runner.run_mobile_audit().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_monitor(
    settings: &RumSettings,
    data_dir: &std::path::Path,
    location: String,
    dry_run: bool,
) -> Result<()> {
    let database = Database::new(data_dir.join(DATABASE_FILE))?;
    let transport: Arc<dyn Transport> = if dry_run {
        Arc::new(MemoryTransport::new())
    } else {
        Arc::new(HttpTransport::new(settings.endpoint_base.clone()))
    };

    let probe = Arc::new(SystemProbe::new());
    let (page, handle) = channel_page(probe.clone(), location, &EntryType::ALL);
    let monitor = RumMonitor::start(page, settings, database, transport).await?;
    let reporter = monitor.reporter().clone();

    let interrupted = tokio::select! {
        fed = feed_host_messages(BufReader::new(tokio::io::stdin()), &handle, &probe) => {
            fed?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        warn!("Interrupted, stopping without a final flush");
        drop(handle);
        monitor.stop().await?;
    } else {
        close_page(monitor, handle).await?;
    }

    let backlog = reporter.rum_data().await;
    println!("{}", serde_json::to_string_pretty(&backlog)?);
    Ok(())
}

/// Forwards every host message line to the page until end of input.
async fn feed_host_messages<R>(input: R, handle: &HostHandle, probe: &SystemProbe) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read host messages")?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<HostMessage>(line) {
            Ok(message) => dispatch(handle, probe, message),
            Err(err) => warn!("Ignoring malformed host message: {err}"),
        }
    }
    Ok(())
}

/// End of input is the page going away. Closing the handle lets every stream
/// drain into the session before `finish` sends the final snapshot.
async fn close_page(monitor: RumMonitor, handle: HostHandle) -> Result<bool> {
    drop(handle);
    monitor.finish().await
}

fn dispatch(handle: &HostHandle, probe: &SystemProbe, message: HostMessage) {
    match message {
        HostMessage::Entry { entry } => {
            handle.emit_entries(vec![entry]);
        }
        HostMessage::Entries { entries } => {
            handle.emit_entries(entries);
        }
        HostMessage::Ui { event } => {
            handle.emit_ui(event);
        }
        HostMessage::Lifecycle { event } => {
            handle.emit_lifecycle(event);
        }
        HostMessage::NetworkChange { connection } => {
            probe.set_connection(Some(connection));
            handle.notify_network_change();
        }
    }
}
