use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use audiomart_server::audio::StreamInfoExtractor;
use audiomart_server::ingestion::{IngestionManager, MediaStore, SqliteMarketStore};
use audiomart_server::server::run_server;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite marketplace database file.
    #[clap(value_parser = parse_path)]
    pub market_db: PathBuf,

    /// Path to the media directory for stored audio assets.
    #[clap(value_parser = parse_path)]
    pub media_path: PathBuf,

    /// Directory for staging uploads during metadata extraction.
    /// Defaults to <media_path>/staging.
    #[clap(long, value_parser = parse_path)]
    pub staging_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let staging_path = cli_args
        .staging_path
        .unwrap_or_else(|| cli_args.media_path.join("staging"));

    let store = SqliteMarketStore::open(&cli_args.market_db)
        .with_context(|| format!("Failed to open market db at {:?}", cli_args.market_db))?;

    let media = MediaStore::new(&cli_args.media_path);
    media
        .init()
        .await
        .with_context(|| format!("Failed to init media dir at {:?}", cli_args.media_path))?;

    let extractor = StreamInfoExtractor::new(&staging_path);
    extractor
        .init()
        .with_context(|| format!("Failed to init staging dir at {:?}", staging_path))?;

    let manager = Arc::new(IngestionManager::new(
        Arc::new(store),
        Arc::new(media),
        Arc::new(extractor),
    ));

    info!(
        "Starting audiomart server on port {} (media at {:?})",
        cli_args.port, cli_args.media_path
    );

    run_server(cli_args.port, manager).await
}
