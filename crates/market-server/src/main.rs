mod config;
mod sweeper;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use market_api::auth::{AppState, AppStateInner};
use market_api::notify::{MailTransport, Notifier};

use crate::config::Config;

const SWEEP_INTERVAL_SECS: u64 = 3600;

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "market=debug,market_api=debug,market_db=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    // Init database
    let db = market_db::Database::open(&config.db_path)?;

    let transport = match &config.mail_webhook_url {
        Some(url) => {
            info!("Mail relay: {}", url);
            MailTransport::Webhook {
                client: reqwest::Client::new(),
                url: url.clone(),
            }
        }
        None => {
            warn!("MARKET_MAIL_WEBHOOK_URL not set; notification emails go to the log");
            MailTransport::Log
        }
    };
    let notifier = Notifier::spawn(transport, config.mail_from.clone());

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        notifier,
        listing_ttl: chrono::Duration::days(config.listing_ttl_days),
        admin_usernames: config.admin_usernames.clone(),
    });

    tokio::spawn(sweeper::run_sweep_loop(state.clone(), SWEEP_INTERVAL_SECS));

    let app = market_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Marketplace listening on {}", config.addr);
    info!("Listings stay live for {} days after approval", config.listing_ttl_days);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!("Could not install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
