use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use market_api::auth::AppState;

/// Background task that closes offers on listings past their `expires_at`.
///
/// Expired listings are already hidden from browsing and refuse new offers,
/// so this only answers the offers that were still pending when they expired.
pub async fn run_sweep_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let sweep_state = state.clone();
        let result = tokio::task::spawn_blocking(move || {
            sweep_state.db.reject_offers_on_expired_listings(Utc::now())
        })
        .await;

        match result {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Sweep: rejected {} offers on expired listings", count);
                }
            }
            Ok(Err(e)) => warn!("Sweep error: {}", e),
            Err(e) => warn!("Sweep task failed: {}", e),
        }
    }
}
