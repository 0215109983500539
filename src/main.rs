//! Callflow server binary.
//!
//! Loads configuration and trees, wires the adapters and serves the
//! provider webhooks under `/phone`.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use callflow::adapters::memory::{InMemoryCallStore, InMemoryRecordingStorage};
use callflow::adapters::phone_number::NorthAmericaPolicy;
use callflow::adapters::postgres::{
    PostgresCallSessionRepository, PostgresCallerRepository, PostgresRecordingRepository,
    PostgresTurnRepository,
};
use callflow::adapters::storage::FileRecordingStorage;
use callflow::adapters::twilio::{TwilioConfig, TwilioTelephonyProvider};
use callflow::adapters::{phone_router, PhoneAppState, TokioTaskScheduler};
use callflow::application::phone::{PhoneJobExecutor, TelephonySettings};
use callflow::config::{AppConfig, DatabaseConfig};
use callflow::domain::tree::{load_tree_dir, TreeRegistry};
use callflow::ports::{
    CallSessionRepository, CallerRepository, RecordingRepository, RecordingStorage,
    TurnRepository,
};

struct Stores {
    sessions: Arc<dyn CallSessionRepository>,
    turns: Arc<dyn TurnRepository>,
    recordings: Arc<dyn RecordingRepository>,
    callers: Arc<dyn CallerRepository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config);

    let trees = load_tree_dir(&config.trees.dir)
        .with_context(|| format!("Failed to load trees from {}", config.trees.dir.display()))?;
    let mut builder = TreeRegistry::builder();
    builder.register_all(trees)?;
    let registry = builder.build();
    info!(trees = ?registry.names(), "Trees registered");

    let stores = match &config.database {
        Some(database) => connect(database).await?,
        None => {
            warn!("No database configured; calls are kept in memory");
            let store = Arc::new(InMemoryCallStore::new());
            Stores {
                sessions: store.clone(),
                turns: store.clone(),
                recordings: store.clone(),
                callers: store,
            }
        }
    };

    let telephony = &config.telephony;
    let provider = Arc::new(TwilioTelephonyProvider::new(
        TwilioConfig::new(telephony.account_sid.clone(), telephony.auth_token.clone())
            .with_base_url(telephony.api_base_url.clone()),
    ));
    let storage: Arc<dyn RecordingStorage> = if telephony.attach_recordings {
        Arc::new(FileRecordingStorage::new(&telephony.recordings_dir))
    } else {
        Arc::new(InMemoryRecordingStorage::new())
    };

    let scheduler = Arc::new(TokioTaskScheduler::default());
    scheduler.bind(Arc::new(PhoneJobExecutor::new(
        registry.clone(),
        stores.sessions.clone(),
        stores.recordings.clone(),
        provider,
        storage,
    )));

    let state = PhoneAppState {
        registry,
        sessions: stores.sessions,
        turns: stores.turns,
        recordings: stores.recordings,
        callers: stores.callers,
        scheduler,
        policy: Arc::new(NorthAmericaPolicy::new()),
        settings: TelephonySettings {
            public_host: telephony.public_host.clone(),
            default_outgoing_number: telephony.default_outgoing_number.clone(),
            attach_recordings: telephony.attach_recordings,
        },
        account_sid: Arc::from(telephony.account_sid.as_str()),
    };

    let app = phone_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, environment = ?config.server.environment, "Callflow listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated with error")
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn connect(database: &DatabaseConfig) -> anyhow::Result<Stores> {
    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .connect(&database.url)
        .await
        .context("Failed to connect to database")?;

    if database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    Ok(Stores {
        sessions: Arc::new(PostgresCallSessionRepository::new(pool.clone())),
        turns: Arc::new(PostgresTurnRepository::new(pool.clone())),
        recordings: Arc::new(PostgresRecordingRepository::new(pool.clone())),
        callers: Arc::new(PostgresCallerRepository::new(pool)),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
