use axum::{Json, extract::State, response::IntoResponse};

use market_types::api::{CatalogResponse, MinOfferPercentage};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;

/// GET /catalog: categories and labels for the listing forms.
pub async fn get_catalog(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (categories, labels) =
        run_db(&state, |db| Ok((db.list_categories()?, db.list_labels()?))).await?;

    Ok(Json(CatalogResponse {
        success: true,
        categories,
        labels,
    }))
}

/// GET /settings/min-offer-percentage: used by the offer popup to show the floor.
pub async fn get_min_offer_percentage(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let min_offer_percentage = run_db(&state, |db| db.get_min_offer_percentage()).await?;

    Ok(Json(MinOfferPercentage {
        success: true,
        min_offer_percentage,
    }))
}
