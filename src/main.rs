use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use urllog::channels::{ConsoleTransport, Notifier};
use urllog::config::Config;
use urllog::gateway::{self, AppState};
use urllog::ledger::{LedgerStore, SqliteLedgerStore};
use urllog::links::HttpTitleFetcher;
use urllog::session::Coordinator;

#[derive(Parser)]
#[command(
    name = "urllog",
    version,
    about = "Channel-scoped URL deduplication and logging bot"
)]
struct Cli {
    /// Path to the configuration file (defaults to ~/.urllog/config.toml,
    /// created on first run).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the SQLite database path.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log verbosely.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> urllog::Result<()> {
    let cli = Cli::parse();

    // Install default crypto provider for Rustls TLS.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let mut config = Config::load_or_init(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }

    let store: Arc<dyn LedgerStore> =
        Arc::new(SqliteLedgerStore::open(&config.storage.db_path).await?);
    let fetcher = Arc::new(HttpTitleFetcher::new(&config.fetch)?);
    let transport = Arc::new(ConsoleTransport::new());
    let notifier: Arc<dyn Notifier> = transport.clone();

    let coordinator = Arc::new(Coordinator::new(
        Arc::clone(&store),
        fetcher,
        Arc::clone(&notifier),
        config.log.clone(),
    ));

    if config.gateway.enabled {
        let gateway_config = config.gateway.clone();
        let state = AppState {
            store: Arc::clone(&store),
        };
        tokio::spawn(async move {
            if let Err(e) = gateway::serve(&gateway_config, state).await {
                tracing::error!(error = %e, "gateway terminated");
            }
        });
    }

    let (tx, rx) = mpsc::channel(64);
    let listener = Arc::clone(&transport);
    tokio::spawn(async move {
        if let Err(e) = listener.listen(tx).await {
            tracing::error!(error = %e, "console transport terminated");
        }
    });

    tracing::info!("urllog ready, reading <channel> <nick> <message> lines from stdin");

    tokio::select! {
        () = coordinator.run(rx) => {
            tracing::info!("input closed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received");
        }
    }

    // Let in-flight fetches finish before exiting.
    coordinator.shutdown().await;
    Ok(())
}
