/// flight_watch service entry point
mod analysis;
mod cache;
mod clients;
mod config;
mod domain;
mod errors;
mod handlers;
mod notifier;
mod repo;
mod routes;
mod scheduler;
mod services;
mod utils;
mod views;

use crate::cache::FileCache;
use crate::clients::{AuthClient, FlightApiClient, HttpClient};
use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::notifier::{Notifier, SmtpMailer};
use crate::repo::HistoryRepo;
use crate::routes::build_router;
use crate::scheduler::spawn_refresh_task;
use crate::services::FlightService;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    let timeout = Duration::from_secs(config.http_timeout_seconds);
    let http_client = HttpClient::new(timeout)?;

    // Initialize clients
    let auth_client = AuthClient::new(
        http_client.clone(),
        config.tdx.auth_url.clone(),
        config.tdx.app_id.clone(),
        config.tdx.app_key.clone(),
    );
    let api_client = FlightApiClient::new(http_client, config.tdx.api_url.clone());

    // Initialize storage
    let cache = FileCache::new(config.cache.path.clone(), config.cache.ttl);
    let history = HistoryRepo::new(config.history_capacity);

    let notifier = if config.notifications.enabled {
        let mailer = SmtpMailer::new(&config.notifications.smtp, timeout)?;
        info!(
            "Email notifications enabled via {}:{}",
            config.notifications.smtp.host, config.notifications.smtp.port
        );
        Some(Notifier::new(
            Box::new(mailer),
            config.notifications.dedup_window,
        ))
    } else {
        None
    };

    // Initialize services
    let flight_service = Arc::new(
        FlightService::new(auth_client, api_client, cache, history, notifier)
            .with_rate_limit_backoff(Duration::from_secs(config.rate_limit_backoff_seconds)),
    );

    // Start background refresh
    spawn_refresh_task(
        flight_service.clone(),
        Duration::from_secs(config.refresh_interval_seconds),
    );

    let state = AppState { flight_service };
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("flight_watch service listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
