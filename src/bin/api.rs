use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bilitrack::{
    api::{ApiConfig, ApiState, spawn_api_server},
    config::read_config_file,
    source::FileConfigSource,
    storage::{open_backend, spawn_retention_task},
    util::{get_api_addr, get_config_path, get_list_path},
};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Serve the stored video statistics over HTTP
#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (default: $BILITRACK_CONFIG or config.json)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Monitor list file (default: $BILITRACK_LIST or monitor.list)
    #[arg(short = 'l', long)]
    list: Option<PathBuf>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

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
    let filter = filter::Targets::new().with_targets(vec![
        ("bilitrack", level),
        ("bilitrack_api", level),
        ("tower_http", level),
    ]);
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

    let config_path = args.config.clone().unwrap_or_else(get_config_path);
    let list_path = args.list.clone().unwrap_or_else(get_list_path);

    let config = read_config_file(&config_path)
        .await
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let store = open_backend(&config.storage)
        .await
        .context("failed to open storage")?;

    let housekeeping = config
        .storage
        .retention_days()
        .map(|days| spawn_retention_task(store.clone(), days));

    let state = ApiState::new(
        store.clone(),
        Arc::new(FileConfigSource::new(&config_path, &list_path)),
    );
    let api_config = ApiConfig {
        bind_addr: get_api_addr(config.api_port),
        enable_cors: !args.no_cors,
    };
    let addr = spawn_api_server(api_config, state).await?;
    info!("serving on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");

    if let Some(task) = housekeeping {
        task.abort();
    }
    store.close().await?;
    Ok(())
}
