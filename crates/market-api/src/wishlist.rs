use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use uuid::Uuid;

use market_types::api::{Claims, ListResponse, ListingSummary, WishlistToggleResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;

/// POST /listings/{id}/wishlist: add or remove the listing from the caller's wishlist.
pub async fn toggle_wishlist(
    State(state): State<AppState>,
    WithRejection(Path(listing_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (uid, lid) = (claims.sub.to_string(), listing_id.to_string());
    let wishlisted = run_db(&state, move |db| {
        if db.get_listing(&lid)?.is_none() {
            return Ok(None);
        }
        db.toggle_wishlist(&uid, &lid, Utc::now()).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("Listing not found"))?;

    Ok(Json(WishlistToggleResponse {
        success: true,
        wishlisted,
    }))
}

/// GET /me/wishlist
pub async fn my_wishlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let listings = run_db(&state, move |db| {
        db.wishlist_for_user(&uid)?
            .iter()
            .map(|row| {
                Ok(ListingSummary {
                    listing: row.to_listing()?,
                    owner_username: row.owner_username.clone(),
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    Ok(Json(ListResponse::new(listings)))
}
