use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bilitrack::{
    config::read_config_file,
    fetcher::{BilibiliClient, MetricsFetcher},
    scheduler::{RunMode, Scheduler},
    source::{ConfigSource, FileConfigSource},
    storage::open_backend,
    util::{get_config_path, get_list_path},
};
use clap::Parser;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Poll Bilibili video statistics and store them as a time series
#[derive(Debug, Clone, Parser)]
struct Args {
    /// Minutes between cycles (overrides the config file)
    #[arg(short = 't', long)]
    interval: Option<u64>,

    /// Number of cycles to run before exiting
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Config file (default: $BILITRACK_CONFIG or config.json)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Monitor list file (default: $BILITRACK_LIST or monitor.list)
    #[arg(short = 'l', long)]
    list: Option<PathBuf>,

    /// Fetch one video, print the snapshot as JSON and exit without storing it
    #[arg(long, value_name = "BV_ID")]
    fetch: Option<String>,

    /// More verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init(verbose: u8) {
    dotenv::dotenv().ok();

    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![("bilitrack", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let fetcher = Arc::new(BilibiliClient::new().context("failed to build HTTP client")?);

    if let Some(bv_id) = &args.fetch {
        let snapshot = fetcher.fetch(bv_id).await?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let config_path = args.config.clone().unwrap_or_else(get_config_path);
    let list_path = args.list.clone().unwrap_or_else(get_list_path);

    let config = read_config_file(&config_path)
        .await
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let source = Arc::new(FileConfigSource::new(&config_path, &list_path));
    let settings = source
        .reload()
        .await
        .context("failed to load monitor configuration")?;
    info!(
        "monitoring {} videos from {}",
        settings.targets.len(),
        list_path.display()
    );

    let store = open_backend(&config.storage)
        .await
        .context("failed to open storage")?;

    let mode = RunMode::from_args(args.interval, args.count, args.once);
    let scheduler = Scheduler::new(source, fetcher, store.clone());

    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, stopping after the current fetch");
                stop.stop();
            }
            Err(e) => error!("failed to listen for ctrl-c: {e}"),
        }
    });

    let summary = scheduler.run(mode).await;
    info!(
        "{} cycles, {} snapshots stored, {} failures",
        summary.cycles,
        summary.stored,
        summary.fetch_failures + summary.storage_failures
    );

    store.close().await?;
    Ok(())
}
