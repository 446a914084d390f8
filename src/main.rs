//! # tiervault CLI
//!
//! Opens the SQLite hot store and filesystem cold store named by the
//! configuration and exposes the tiering operations.
//!
//! Usage:
//!   tiervault put <partition_key> <id> <payload-json> [--timestamp-ms N]
//!   tiervault get <partition_key> <id>
//!   tiervault archive [--batch-size N] [--age-threshold-days N]
//!   tiervault schedule
//!   tiervault stats
//!
//! Configuration comes from `--config <file.json>` and `TIERVAULT_*` variables.
//! Logging honours `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use tiervault::telemetry::{EventSink, JsonlEventSink, LogEventSink};
use tiervault::{
    ArchivalJob, ArchivalScheduler, ColdStore, EventRecorder, FsColdStore, HotStore, Record,
    SchedulerConfig, SqliteHotStore, TieredStore, TieringConfig,
};

#[derive(Parser)]
#[command(name = "tiervault")]
#[command(about = "Hot/cold tiered record storage", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Append tier events as JSON lines to this file instead of the log
    #[arg(long)]
    events_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a record to the hot tier
    Put {
        partition_key: String,
        id: String,
        /// Record payload as JSON
        payload: String,
        /// Creation time (Unix ms); defaults to now
        #[arg(long)]
        timestamp_ms: Option<u64>,
    },

    /// Read a record from whichever tier holds it
    Get { partition_key: String, id: String },

    /// Run one archival pass and exit
    Archive {
        /// Override the configured batch size
        #[arg(long)]
        batch_size: Option<usize>,

        /// Override the configured age threshold
        #[arg(long)]
        age_threshold_days: Option<u64>,
    },

    /// Run archival on the configured interval until Ctrl-C
    Schedule,

    /// Show hot-tier record count
    Stats,
}

struct Stores {
    hot: Arc<SqliteHotStore>,
    cold: Arc<FsColdStore>,
}

impl Stores {
    fn open(config: &TieringConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let hot = Arc::new(SqliteHotStore::open(&config.hot_store_path)?);
        let cold = Arc::new(FsColdStore::open(&config.cold_store_root)?);
        info!(
            "Opened stores: hot={} cold={}",
            config.hot_store_path.display(),
            config.cold_store_root.display()
        );
        Ok(Self { hot, cold })
    }

    async fn close(&self) {
        if let Err(e) = self.hot.close().await {
            error!("Failed to close hot store: {}", e);
        }
        if let Err(e) = self.cold.close().await {
            error!("Failed to close cold store: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = TieringConfig::load(cli.config.as_deref())?;

    let sink: Arc<dyn EventSink> = match &cli.events_file {
        Some(path) => Arc::new(JsonlEventSink::open(path, true)?),
        None => Arc::new(LogEventSink),
    };
    let events = Arc::new(EventRecorder::new(sink));

    let stores = Stores::open(&config)?;
    let code = dispatch(cli.command, &config, &stores, &events).await;
    stores.close().await;
    events.flush();
    code
}

async fn dispatch(
    command: Commands,
    config: &TieringConfig,
    stores: &Stores,
    events: &Arc<EventRecorder>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let facade = TieredStore::from_config(stores.hot.clone(), stores.cold.clone(), config)
        .with_events(events.clone());
    let job = ArchivalJob::from_config(stores.hot.clone(), stores.cold.clone(), config)
        .with_events(events.clone());

    match command {
        Commands::Put {
            partition_key,
            id,
            payload,
            timestamp_ms,
        } => {
            let payload: serde_json::Value = serde_json::from_str(&payload)?;
            let record = match timestamp_ms {
                Some(ts) => Record::with_timestamp(id, partition_key, ts, payload),
                None => Record::new(id, partition_key, payload),
            };
            facade.put(record).await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Get { partition_key, id } => match facade.get(&id, &partition_key).await? {
            Some(record) => {
                println!("{}", serde_json::to_string_pretty(&record)?);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("not found: {}/{}", partition_key, id);
                Ok(ExitCode::from(2))
            }
        },

        Commands::Archive {
            batch_size,
            age_threshold_days,
        } => {
            let batch_size = batch_size.unwrap_or(config.batch_size);
            let age_threshold = age_threshold_days
                .map(|days| Duration::from_secs(days.saturating_mul(86_400)))
                .unwrap_or_else(|| config.age_threshold());

            let report = job.run(age_threshold, batch_size).await;
            println!("{}", serde_json::to_string_pretty(&report.summary)?);
            for fault in report.faults() {
                eprintln!("{}", fault);
            }
            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }

        Commands::Schedule => {
            let scheduler = Arc::new(ArchivalScheduler::new(
                Arc::new(job),
                SchedulerConfig::from(config),
            ));
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl-C, stopping scheduled archival");
                }
                shutdown_tx.send(true).ok();
            });

            scheduler.clone().start(shutdown_rx).await;
            if let Some(summary) = scheduler.last_run() {
                info!("Last archival run: {}", summary);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Stats => {
            println!("hot_records: {}", stores.hot.len().await?);
            println!("cold_root: {}", config.cold_store_root.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
