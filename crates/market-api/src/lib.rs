pub mod admin;
pub mod auth;
pub mod catalog;
pub mod error;
pub mod listings;
pub mod middleware;
pub mod notify;
pub mod offers;
pub mod wishlist;

#[cfg(test)]
mod tests;

use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use serde_json::json;
use tracing::error;

use market_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;

/// Runs a blocking DB call off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::Internal)
}

/// All marketplace routes. CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/catalog", get(catalog::get_catalog))
        .route("/settings/min-offer-percentage", get(catalog::get_min_offer_percentage))
        .route("/listings", get(listings::browse_listings))
        .route("/listings/{listing_id}", get(listings::get_listing));

    let protected_routes = Router::new()
        .route("/listings", post(listings::create_listing))
        .route("/listings/{listing_id}", put(listings::update_listing))
        .route("/listings/{listing_id}/proofs", post(listings::add_proof))
        .route("/listings/{listing_id}/offers", post(offers::submit_offer))
        .route("/listings/{listing_id}/wishlist", post(wishlist::toggle_wishlist))
        .route("/me/listings", get(listings::my_listings))
        .route("/me/offers", get(offers::my_offers))
        .route("/me/offers/received", get(offers::received_offers))
        .route("/me/wishlist", get(wishlist::my_wishlist))
        .route("/offers/{offer_id}/accept", post(offers::accept_offer))
        .route("/offers/{offer_id}/reject", post(offers::reject_offer))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    let admin_routes = Router::new()
        .route("/admin/listings", get(admin::moderation_queue))
        .route("/admin/listings/{listing_id}/approve", post(admin::approve_listing))
        .route("/admin/listings/{listing_id}/reject", post(admin::reject_listing))
        .route("/admin/settings/min-offer-percentage", put(admin::set_min_offer_percentage))
        .route("/admin/categories", post(admin::create_category))
        .route("/admin/labels", post(admin::create_label))
        .layer(from_fn(middleware::require_admin))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "status": "ok" }))
}
