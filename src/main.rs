use clap::Parser;
use instaconsult::application::deadline::spawn_deadline_sweeper;
use instaconsult::application::engine::ConsultationEngine;
use instaconsult::config::{
    DEFAULT_ACCEPTANCE_TIMEOUT_SECS, DEFAULT_MAX_COMPLAINT_LEN, DEFAULT_MAX_REASON_LEN,
    DEFAULT_SWEEP_INTERVAL_SECS, EngineConfig,
};
use instaconsult::domain::ports::{DirectoryBox, RequestStoreBox};
use instaconsult::infrastructure::in_memory::{
    DirectorySnapshot, InMemoryDirectory, InMemoryRequestStore,
};
use instaconsult::infrastructure::simulated::{SimulatedPaymentProcessor, SimulatedRoomProvisioner};
use instaconsult::interfaces::http::{routes, state::AppState};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address the HTTP API listens on
    #[arg(long, env = "INSTACONSULT_ADDR", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Seconds a practitioner has to answer a request
    #[arg(long, default_value_t = DEFAULT_ACCEPTANCE_TIMEOUT_SECS)]
    acceptance_timeout_secs: i64,

    /// Seconds between background deadline sweeps
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL_SECS)]
    sweep_interval_secs: u64,

    /// JSON file seeding the practitioner/patient directory
    #[arg(long, env = "INSTACONSULT_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "INSTACONSULT_DB_PATH")]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let acceptance_timeout = chrono::TimeDelta::try_seconds(cli.acceptance_timeout_secs)
        .ok_or_else(|| miette::miette!("acceptance timeout is out of range"))
        .wrap_err("invalid engine configuration")?;
    let config = EngineConfig {
        acceptance_timeout,
        sweep_interval: std::time::Duration::from_secs(cli.sweep_interval_secs),
        max_complaint_len: DEFAULT_MAX_COMPLAINT_LEN,
        max_reason_len: DEFAULT_MAX_REASON_LEN,
    };
    config
        .validate()
        .into_diagnostic()
        .wrap_err("invalid engine configuration")?;

    let directory: DirectoryBox = match &cli.directory {
        Some(path) => {
            let snapshot = DirectorySnapshot::from_json_file(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to load directory {}", path.display()))?;
            info!(
                practitioners = snapshot.practitioners.len(),
                patients = snapshot.patients.len(),
                "directory loaded"
            );
            Box::new(InMemoryDirectory::from_snapshot(snapshot))
        }
        None => {
            warn!("no --directory given, every request will be refused");
            Box::new(InMemoryDirectory::new())
        }
    };

    let engine = ConsultationEngine::new(
        open_store(cli.db_path.as_ref())?,
        directory,
        Box::new(SimulatedPaymentProcessor::new()),
        Box::new(SimulatedRoomProvisioner::new()),
    )
    .with_config(config);
    let engine = Arc::new(engine);

    let sweeper = spawn_deadline_sweeper(Arc::clone(&engine));

    let app = routes::build_router(Arc::new(AppState::new(engine))).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to bind {}", cli.bind))?;
    info!("instaconsult listening on http://{}", cli.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
        .into_diagnostic()
        .wrap_err("server crashed")?;

    sweeper.abort();
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<&PathBuf>) -> Result<RequestStoreBox> {
    use instaconsult::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        // Use persistent storage (RocksDB)
        Some(path) => {
            let store = RocksDBStore::open(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to open database {}", path.display()))?;
            info!(path = %path.display(), "using RocksDB request store");
            Ok(Box::new(store))
        }
        None => Ok(Box::new(InMemoryRequestStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<&PathBuf>) -> Result<RequestStoreBox> {
    if db_path.is_some() {
        warn!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryRequestStore::new()))
}
