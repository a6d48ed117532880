//! MentorLink HTTP server.
//!
//! Serves the booking and payment webhook API and runs the workshop link job
//! and the booking link recovery sweep in the background until shutdown.

mod config;

use anyhow::Context;
use config::Config;
use mentorlink_core::SystemClock;
use mentorlink_meet::MeetClient;
use mentorlink_postgres::PgMarketplaceStore;
use mentorlink_runtime::{
    BookingLinkRecovery, BookingMeetings, BookingOrderCoordinator, MarketplaceEnvironment, PaymentWebhookProcessor,
    TracingNotifier, WebhookSecret, WorkshopLinkJob,
};
use mentorlink_web::{router, AppState};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mentorlink=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MentorLink server");
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded .env file");
    }

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        bind = %config.bind_address(),
        utc_offset = %config.utc_offset,
        meet_api = %config.meet.base_url,
        "Configuration loaded"
    );

    let metrics = mentorlink_runtime::metrics::install_recorder().context("failed to install metrics recorder")?;

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(config.database.connect_timeout)
        .idle_timeout(config.database.idle_timeout)
        .connect(&config.database.url)
        .await
        .context("failed to connect to database")?;
    let store = Arc::new(PgMarketplaceStore::new(pool));
    store.migrate().await.context("failed to run migrations")?;
    info!("Database ready");

    let meet = MeetClient::new(config.meet_client()).context("failed to build meeting client")?;
    let env = MarketplaceEnvironment::from_store(
        store.clone(),
        Arc::new(meet),
        Arc::new(TracingNotifier),
        Arc::new(SystemClock),
    );
    let meetings = BookingMeetings::new(env.clone(), config.meeting_settings());

    let state = AppState::new(
        BookingOrderCoordinator::new(env.clone(), meetings.clone()),
        PaymentWebhookProcessor::new(
            env.clone(),
            WebhookSecret::new(config.payments.webhook_secret.as_bytes()),
            meetings.clone(),
        ),
        store.clone(),
        metrics,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workshop_job = WorkshopLinkJob::new(env.clone(), config.workshop_link_job())
        .spawn(config.workshop_job.interval, shutdown_rx.clone());
    let recovery = BookingLinkRecovery::new(env, meetings, config.recovery.batch_size)
        .spawn(config.recovery.interval, shutdown_rx);
    info!("Background jobs started");

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(address = %config.bind_address(), "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("HTTP server stopped, waiting for background jobs");
    if shutdown_tx.send(true).is_err() {
        warn!("Background jobs already stopped");
    }
    let jobs = futures::future::join(workshop_job, recovery);
    match tokio::time::timeout(config.server.shutdown_timeout, jobs).await {
        Ok((workshop, recovery)) => {
            for (job, result) in [("workshop_links", workshop), ("booking_link_recovery", recovery)] {
                if let Err(e) = result {
                    error!(job, error = %e, "Background job ended abnormally");
                }
            }
        }
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout.as_secs(),
            "Background jobs did not stop in time"
        ),
    }

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
