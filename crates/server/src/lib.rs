//! Wires configuration, stores, the dispatcher, the scheduler, and both
//! request surfaces into a running service (C10). Grounded on the teacher's
//! `main.rs` + `state_factory` split: the library crate owns everything
//! that can be exercised from a test without a real process, and the binary
//! (`src/main.rs`) owns only CLI parsing, tracing init, and the exit code.

pub mod api;
pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod rpc;
pub mod service;
pub mod state;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use pinguin_core::PinguinError;
use pinguin_crypto::parse_master_key;
use pinguin_dispatcher::Dispatcher;
use pinguin_scheduler::Scheduler;
use pinguin_store::{NotificationStore, TenantStore, run_migrations};
use secrecy::ExposeSecret;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::watch;

pub use config::{PinguinConfig, load_config};
pub use error::ServerError;
pub use state::{AppState, Limits};

/// Everything [`bootstrap`] built: the two router state handles, the
/// scheduler, and the values `main` needs to bind sockets and drive
/// shutdown. Kept separate from [`AppState`] because the scheduler isn't
/// `Clone`-shared into request handlers — only its `Arc` is.
pub struct Application {
    pub state: AppState,
    pub scheduler: Arc<Scheduler>,
    pub grpc_port: u16,
    pub http_port: u16,
    pub allowed_origins: Vec<String>,
}

/// Opens the SQLite pool, runs migrations, reconciles the declarative
/// tenant list into the store, resets any `INFLIGHT` row left over from a
/// prior crash (spec.md §5/§9), and constructs every long-lived component.
/// Does not bind any socket or start the scheduler loop — that's `main`'s
/// job, so tests can call this and drive the in-process `Router`s directly.
pub async fn bootstrap(config: PinguinConfig) -> Result<Application, ServerError> {
    let master_key = parse_master_key(config.server.master_encryption_key.expose_secret())
        .map_err(|e| ServerError::Config(format!("invalid masterEncryptionKey: {e}")))?;

    let connect_options = SqliteConnectOptions::from_str(&config.server.database_path)
        .map_err(|e| ServerError::Config(format!("invalid databasePath: {e}")))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_options).await?;
    run_migrations(&pool).await?;

    let tenants = config
        .tenants
        .into_iter()
        .map(|t| t.into_tenant(&master_key))
        .collect::<Result<Vec<_>, PinguinError>>()
        .map_err(|e| ServerError::Config(e.message))?;

    let tenant_store = Arc::new(TenantStore::new(pool.clone(), master_key));
    tenant_store.reconcile(&tenants).await?;

    let notification_store = Arc::new(NotificationStore::new(pool));
    let reset = notification_store.reset_inflight(chrono::Utc::now()).await?;
    if reset > 0 {
        tracing::warn!(count = reset, "reset INFLIGHT notifications to QUEUED on boot (crash recovery)");
    }

    let operation_timeout = Duration::from_secs(config.limits.operation_timeout_sec);
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&tenant_store), Arc::clone(&notification_store), operation_timeout));

    let scheduler = Arc::new(Scheduler::new(Arc::clone(&notification_store), Arc::clone(&dispatcher), config.scheduler.into_scheduler_config()));

    let limits = Arc::new(Limits {
        operation_timeout,
        max_payload_bytes: config.limits.max_payload_bytes,
        max_page_size: config.limits.max_page_size,
        max_message_size_bytes: config.limits.max_message_size_bytes,
    });

    let state = AppState {
        tenant_store,
        notification_store,
        dispatcher,
        grpc_auth_token: config.server.grpc_auth_token,
        tauth_signing_key: config.web.tauth_signing_key,
        limits,
    };

    Ok(Application {
        state,
        scheduler,
        grpc_port: config.server.grpc_port,
        http_port: config.web.http_port,
        allowed_origins: config.web.allowed_origins,
    })
}

/// Runs the scheduler tick loop and both HTTP routers concurrently until
/// `shutdown` fires, then drains in-flight dispatches for up to
/// `drainTimeoutSec` before returning. Mirrors the teacher's
/// `axum::serve(...).with_graceful_shutdown(...)` composition, generalized
/// to two listeners plus a non-HTTP background task.
pub async fn run(app: Application, shutdown: watch::Receiver<bool>) -> Result<(), ServerError> {
    let rpc_router = rpc::router(app.state.clone());
    let http_router = api::router(app.state.clone(), &app.allowed_origins);

    let rpc_listener = tokio::net::TcpListener::bind(("0.0.0.0", app.grpc_port)).await?;
    let http_listener = tokio::net::TcpListener::bind(("0.0.0.0", app.http_port)).await?;
    tracing::info!(port = app.grpc_port, "rpc/v1 surface listening");
    tracing::info!(port = app.http_port, "api surface listening");

    let scheduler = app.scheduler;
    let scheduler_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { scheduler.run(shutdown).await }
    });

    let rpc_task = axum::serve(rpc_listener, rpc_router).with_graceful_shutdown(wait_for_shutdown(shutdown.clone()));
    let http_task = axum::serve(http_listener, http_router).with_graceful_shutdown(wait_for_shutdown(shutdown));

    let (rpc_result, http_result) = tokio::join!(rpc_task, http_task);
    rpc_result?;
    http_result?;

    scheduler_task.await.map_err(|e| ServerError::Config(format!("scheduler task panicked: {e}")))?;
    Ok(())
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
