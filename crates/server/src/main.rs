use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketlens_core::{
    create_oracle, load_config, validate_config, DiagnosisOracle, EventLog, SessionCache,
    TicketRelay, WebhookResolver, ZnunyClient,
};
use ticketlens_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TICKETLENS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Ticketing backend: {}", config.znuny.base_url);
    info!("Webhook event log: {:?}", config.webhook.log_path);

    // Ticketing backend client (also performs logins for the session cache)
    let znuny = Arc::new(
        ZnunyClient::new(config.znuny.clone()).context("Failed to create Znuny client")?,
    );

    let sessions = SessionCache::new(
        znuny.clone(),
        Duration::from_secs(config.znuny.session_ttl_secs),
    )
    .with_override(config.znuny.session_id.clone());
    if config.znuny.session_id.is_some() {
        info!("Using configured session token; logins disabled");
    }

    // Diagnosis oracle if configured
    let oracle: Option<Arc<dyn DiagnosisOracle>> = match &config.oracle {
        Some(oracle_config) => {
            info!(
                "Initializing {} diagnosis oracle (model: {})",
                oracle_config.provider.as_str(),
                oracle_config.model
            );
            Some(create_oracle(oracle_config).context("Failed to create diagnosis oracle")?)
        }
        None => {
            warn!("No diagnosis oracle configured; only explicit-body updates will succeed");
            None
        }
    };

    let relay = Arc::new(TicketRelay::new(
        Arc::new(sessions),
        znuny,
        oracle,
        config.defaults.clone(),
    ));

    let resolver = Arc::new(WebhookResolver::new(
        EventLog::new(config.webhook.log_path.clone(), config.webhook.max_log_bytes),
        config.webhook.max_scan_entries,
    ));

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), relay, resolver));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
