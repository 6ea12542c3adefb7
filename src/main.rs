use anyhow::{Context, Result};
use api_client::{ConsoleApiClient, TradingApi, failure_line};
use clap::{Parser, Subcommand};
use configuration::{LoggingSettings, ReconnectMode, Settings, load_config};
use database::{DurableMirror, SqliteStore};
use engine::FeedProvider;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// The main entry point for the tradefeed console.
#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; it only carries optional overrides.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut settings = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.identity.is_some() {
        settings.mirror.identity = cli.identity.clone();
    }
    let _log_guard = init_tracing(&settings.logging)?;

    match cli.command {
        Commands::Tail(args) => handle_tail(settings, args).await,
        Commands::History => handle_history(&settings).await,
        Commands::Clear => handle_clear(&settings).await,
        Commands::ClosePosition(args) => {
            let api = ConsoleApiClient::new(&settings.api)?;
            let line = match api.close_position(&args.symbol).await {
                Ok(response) => response.closed_line(),
                Err(e) => {
                    tracing::error!(error = ?e, symbol = %args.symbol, "Close position failed.");
                    failure_line("closing position")
                }
            };
            record_line(&settings, line).await
        }
        Commands::CloseAll => {
            let api = ConsoleApiClient::new(&settings.api)?;
            let line = match api.close_all_positions().await {
                Ok(response) => response.closed_line(),
                Err(e) => {
                    tracing::error!(error = ?e, "Close all positions failed.");
                    failure_line("closing all positions")
                }
            };
            record_line(&settings, line).await
        }
        Commands::Disconnect(args) => {
            let api = ConsoleApiClient::new(&settings.api)?;
            let line = match api.disconnect_stock(&args.symbol).await {
                Ok(response) => response.disconnected_line(),
                Err(e) => {
                    tracing::error!(error = ?e, symbol = %args.symbol, "Disconnect failed.");
                    failure_line("disconnecting stock")
                }
            };
            record_line(&settings, line).await
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Follows the trading backend's realtime log feed and keeps a durable copy.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file. Defaults to ./tradefeed.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Whose log to read and write. Overrides `mirror.identity`.
    #[arg(long, global = true)]
    identity: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the feed and print every log line until Ctrl-C.
    Tail(TailArgs),
    /// Print the mirrored log.
    History,
    /// Empty the mirrored log.
    Clear,
    /// Close one open position and log the outcome.
    ClosePosition(SymbolArgs),
    /// Close every open position and log the outcome.
    CloseAll,
    /// Stop trading one stock and log the outcome.
    Disconnect(SymbolArgs),
}

#[derive(Parser)]
struct TailArgs {
    /// Stream address (`ws://`, `wss://`, `http://` or `https://`).
    #[arg(long)]
    address: Option<String>,

    /// What to do when the connection drops.
    #[arg(long, value_enum)]
    reconnect: Option<ReconnectMode>,

    /// Seconds between reconnect attempts.
    #[arg(long)]
    backoff_secs: Option<u64>,
}

#[derive(Parser)]
struct SymbolArgs {
    /// The symbol value, e.g. "NIFTY".
    #[arg(long)]
    symbol: String,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_tail(mut settings: Settings, args: TailArgs) -> Result<()> {
    if let Some(address) = args.address {
        settings.stream.address = address;
    }
    if let Some(reconnect) = args.reconnect {
        settings.stream.reconnect = reconnect;
    }
    if let Some(backoff_secs) = args.backoff_secs {
        settings.stream.backoff_secs = backoff_secs;
    }
    settings.validate()?;

    let provider = FeedProvider::from_settings(&settings)
        .await
        .context("Failed to start the feed provider")?;
    for line in provider.messages() {
        println!("{}", line);
    }

    let mut records = provider.records();
    let mut states = provider.watch_state();
    provider.start_logs(None).await?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            record = records.recv() => match record {
                Ok(record) => println!("{}", record.display),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Output fell behind the feed; lines were skipped.");
                }
                Err(RecvError::Closed) => break,
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                tracing::debug!(%state, "Connection state changed.");
            }
            _ = &mut shutdown => {
                tracing::info!("Ctrl-C received; closing the feed.");
                break;
            }
        }
    }

    provider.shutdown().await?;
    Ok(())
}

async fn open_mirror(settings: &Settings) -> Result<DurableMirror> {
    let store = SqliteStore::open(&settings.mirror.database_url)
        .await
        .with_context(|| format!("Failed to open {}", settings.mirror.database_url))?;
    Ok(DurableMirror::new(Arc::new(store), settings.mirror.identity.as_deref()))
}

async fn handle_history(settings: &Settings) -> Result<()> {
    let mirror = open_mirror(settings).await?;
    for line in mirror.restore().await {
        println!("{}", line);
    }
    Ok(())
}

async fn handle_clear(settings: &Settings) -> Result<()> {
    let mirror = open_mirror(settings).await?;
    if !mirror.persist(&[]).await {
        anyhow::bail!("Could not clear the log for '{}'", mirror.identity());
    }
    println!("Cleared the log for '{}'.", mirror.identity());
    Ok(())
}

/// Appends a REST outcome to the identity's log, the way the console shows it.
async fn record_line(settings: &Settings, line: String) -> Result<()> {
    println!("{}", line);
    let provider = FeedProvider::from_settings(settings)
        .await
        .context("Failed to open the log")?;
    provider.record(line).await?;
    provider.shutdown().await?;
    Ok(())
}

// ==============================================================================
// Logging
// ==============================================================================

/// Installs the global subscriber: stderr always, plus a daily rolling file
/// when a log directory is configured. `RUST_LOG` wins over the configured
/// filter. The returned guard must live until exit to flush the file writer.
fn init_tracing(logging: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .context("Invalid log filter")?;

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "tradefeed.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(guard)
}
