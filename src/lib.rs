pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod focus;
pub mod landmarks;
pub mod metrics;
pub mod persistence;
pub mod sensing;
pub mod settings;
pub mod timer;
mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use log::info;

use clock::{Clock, SystemClock};
use config::TrackerConfig;
use db::Database;
use persistence::ConfiguredBackend;
use sensing::ReplaySource;
use settings::ConfigStore;
use timer::TrackingController;

const USAGE: &str = "usage: studyfocus <moduleId> <recording.jsonl> [sectionId]";

#[derive(Debug)]
struct ReplayArgs {
    module_id: String,
    recording: PathBuf,
    section_id: Option<String>,
}

fn parse_args(args: &[String]) -> Result<ReplayArgs> {
    match args {
        [module_id, recording] | [module_id, recording, _] => Ok(ReplayArgs {
            module_id: module_id.clone(),
            recording: PathBuf::from(recording),
            section_id: args.get(2).cloned(),
        }),
        _ => bail!(USAGE),
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Replays a landmark recording through a full tracking session and prints
/// the final snapshot and metrics as JSON.
pub fn run() -> Result<()> {
    let level = if env_flag("STUDYFOCUS_DEBUG") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    // RUST_LOG, when set, takes precedence over the default level
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&args)?;

    let data_dir = std::env::var("STUDYFOCUS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".studyfocus"));
    let config_path = std::env::var("STUDYFOCUS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir.join("config.json"));

    let settings = ConfigStore::new(config_path)?;
    let config = settings.config().with_env_overrides();
    config.validate()?;

    info!("studyfocus starting up (config {})", settings.path().display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(replay(config, &data_dir, args))
}

async fn replay(config: TrackerConfig, data_dir: &Path, args: ReplayArgs) -> Result<()> {
    let clock = Arc::new(SystemClock);
    let database = Database::new(data_dir.join("studyfocus.sqlite3"))?;

    let purged = database
        .purge_stale_snapshots(clock.now_ms(), config.snapshot_staleness_ms)
        .await?;
    info!(
        "Purged {purged} stale snapshot(s); {} kept",
        database.count_snapshots().await?
    );

    let backend = ConfiguredBackend::from_config(&config.backend)?;
    let source = ReplaySource::from_path(&args.recording)?;
    info!(
        "Replaying {} detection(s) from {}",
        source.len(),
        args.recording.display()
    );

    let controller = TrackingController::new(config, database, backend, clock)?;
    controller
        .start(&args.module_id, args.section_id, true, source)
        .await?;
    controller.wait_for_source().await;

    let snapshot = controller.stop().await?;
    let metrics = controller.metrics().await;
    let report = serde_json::json!({ "snapshot": snapshot, "metrics": metrics });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
