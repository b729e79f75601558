use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use market_rules::listing::validate_name;
use market_types::api::{
    Claims, ListResponse, ListingSaved, ListingSummary, MinOfferPercentage, ModerationQuery,
    NameRequest, RejectListingRequest,
};
use market_types::events::MarketEvent;
use market_types::models::{Listing, ListingStatus};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::notify::Notification;
use crate::run_db;

/// GET /admin/listings?status=: defaults to the pending review queue.
pub async fn moderation_queue(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ModerationQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query.status.unwrap_or(ListingStatus::Pending);
    let listings = run_db(&state, move |db| {
        db.listings_by_status(status)?
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

pub async fn approve_listing(
    State(state): State<AppState>,
    WithRejection(Path(listing_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let expires_at = now + state.listing_ttl;
    let id = listing_id.to_string();
    let approved = run_db(&state, move |db| db.approve_listing(&id, now, expires_at)).await?;
    if !approved {
        return Err(moderation_conflict(&state, listing_id).await);
    }

    info!("Admin {} approved listing {}", claims.username, listing_id);
    notify_owner(&state, listing_id, true, None).await;

    Ok(Json(ListingSaved {
        success: true,
        listing_id,
        status: ListingStatus::Approved,
    }))
}

pub async fn reject_listing(
    State(state): State<AppState>,
    WithRejection(Path(listing_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<RejectListingRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let reason = req.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::Validation(vec!["A rejection reason is required".to_string()]));
    }

    let (id, stored) = (listing_id.to_string(), reason.clone());
    let rejected = run_db(&state, move |db| db.reject_listing(&id, &stored, Utc::now())).await?;
    if !rejected {
        return Err(moderation_conflict(&state, listing_id).await);
    }

    info!("Admin {} rejected listing {}: {}", claims.username, listing_id, reason);
    notify_owner(&state, listing_id, false, Some(reason)).await;

    Ok(Json(ListingSaved {
        success: true,
        listing_id,
        status: ListingStatus::Rejected,
    }))
}

/// Distinguishes a missing listing from one that is past review.
async fn moderation_conflict(state: &AppState, listing_id: Uuid) -> ApiError {
    let id = listing_id.to_string();
    match run_db(state, move |db| db.get_listing(&id)).await {
        Ok(Some(_)) => ApiError::Conflict("Only pending listings can be moderated".to_string()),
        Ok(None) => ApiError::NotFound("Listing not found"),
        Err(e) => e,
    }
}

async fn notify_owner(state: &AppState, listing_id: Uuid, approved: bool, reason: Option<String>) {
    let id = listing_id.to_string();
    let loaded = run_db(state, move |db| {
        let Some(row) = db.get_listing(&id)? else {
            return Ok(None);
        };
        let listing: Listing = row.to_listing()?;
        let owner = db
            .get_user_by_id(&row.owner_id)?
            .map(|u| u.to_user())
            .transpose()?;
        Ok(owner.map(|owner| (listing, owner)))
    })
    .await;

    match loaded {
        Ok(Some((listing, owner))) => state.notifier.notify(Notification {
            to_email: owner.email,
            to_username: owner.username,
            event: MarketEvent::ListingModerated {
                listing_id,
                listing_title: listing.title,
                approved,
                reason,
            },
        }),
        Ok(None) => {}
        Err(e) => warn!("Could not notify owner of listing {}: {}", listing_id, e),
    }
}

/// PUT /admin/settings/min-offer-percentage
pub async fn set_min_offer_percentage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<MinOfferPercentage>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let value = req.min_offer_percentage;
    if !(1..=100).contains(&value) {
        return Err(ApiError::Validation(vec![
            "Minimum offer percentage must be between 1 and 100".to_string(),
        ]));
    }

    run_db(&state, move |db| db.set_min_offer_percentage(value)).await?;
    info!("Admin {} set min_offer_percentage to {}", claims.username, value);

    Ok(Json(MinOfferPercentage {
        success: true,
        min_offer_percentage: value,
    }))
}

pub async fn create_category(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<NameRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let name = checked_name(&req.name)?;
    let stored = name.clone();
    let id = run_db(&state, move |db| db.create_category(&stored))
        .await?
        .ok_or_else(|| ApiError::Conflict(format!("Category '{}' already exists", name)))?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "id": id, "name": name }))))
}

pub async fn create_label(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<NameRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let name = checked_name(&req.name)?;
    let stored = name.clone();
    let id = run_db(&state, move |db| db.create_label(&stored))
        .await?
        .ok_or_else(|| ApiError::Conflict(format!("Label '{}' already exists", name)))?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "id": id, "name": name }))))
}

fn checked_name(raw: &str) -> Result<String, ApiError> {
    validate_name(raw).map_err(|e| ApiError::Validation(vec![e]))?;
    Ok(raw.trim().to_string())
}
