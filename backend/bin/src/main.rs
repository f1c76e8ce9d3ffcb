//! SIWE Auth Backend Binary
//!
//! Main entry point for the Sign-In with Ethereum authentication service.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use siwe_auth_backend_lib::{
    api::create_app,
    config::{Config, LogFormat},
    constants::auth::DEFAULT_JWT_SECRET,
    data::storage::{BoxedStorage, BoxedStorageWrapper, InMemoryStorage},
    log::initialize_logging,
    services::Services,
};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "siwe-auth-backend")]
#[command(about = "Sign-In with Ethereum Authentication Service", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Override server host
    #[arg(long)]
    host: Option<String>,

    /// Override server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override log format (auto, json or text)
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Override the JWT signing secret
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;

    initialize_logging(config.log_format);

    info!("Starting SIWE Auth Backend");
    info!("Server will run on {}:{}", config.host, config.port);

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("Using the default JWT secret, set `auth.jwt_secret` or JWT_SECRET before deploying");
    }

    let memory_storage = InMemoryStorage::new();
    let storage: Arc<dyn BoxedStorage> = Arc::new(BoxedStorageWrapper::new(memory_storage));

    spawn_nonce_purge(
        storage.clone(),
        Duration::from_secs(config.auth.nonce_purge_interval_secs),
    );

    let services =
        Services::new(&config, storage).context("Failed to initialize services")?;

    // Start server
    let app = create_app(services);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .context("Failed to bind TCP listener")?;

    info!("Server listening on http://{}:{}", config.host, config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

fn load_config() -> Result<Config> {
    let args = Args::parse();

    let mut config = match args.config {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to read config file: {}", path))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(log_format) = args.log_format {
        config.log_format = log_format;
    }
    if let Some(jwt_secret) = args.jwt_secret {
        config.auth.jwt_secret = jwt_secret;
    }

    config.validate().context("Invalid configuration")?;

    Ok(config)
}

/// Periodically sweeps expired nonces out of the store
fn spawn_nonce_purge(storage: Arc<dyn BoxedStorage>, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // the first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            match storage.purge_expired().await {
                Ok(purged) => debug!(target: "backend::nonce_purge", purged, "Purged expired nonces"),
                Err(e) => warn!(target: "backend::nonce_purge", error = %e, "Failed to purge expired nonces"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
