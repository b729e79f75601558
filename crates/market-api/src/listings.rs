use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use market_db::Database;
use market_db::listings::{NewListing, NewProof};
use market_rules::listing::{validate_form, validate_proof};
use market_rules::offer::minimum_offer;
use market_types::api::{
    AddProofRequest, Claims, ListResponse, ListingDetail, ListingForm, ListingQuery,
    ListingSaved, ListingSummary, ProofAdded,
};
use market_types::models::{Listing, ListingProof, ListingStatus};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_db;

/// GET /listings: approved, unexpired listings matching the filters.
pub async fn browse_listings(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListingQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let listings = run_db(&state, move |db| {
        db.search_listings(&query, Utc::now())?
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

/// GET /listings/{id}: public detail page data.
pub async fn get_listing(
    State(state): State<AppState>,
    WithRejection(Path(listing_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = listing_id.to_string();
    let detail = run_db(&state, move |db| load_detail(db, &id))
        .await?
        .filter(|d| d.listing.status == ListingStatus::Approved && !d.listing.is_expired(Utc::now()))
        .ok_or(ApiError::NotFound("Listing not found"))?;

    Ok(Json(detail))
}

fn load_detail(db: &Database, id: &str) -> anyhow::Result<Option<ListingDetail>> {
    let Some(row) = db.get_listing(id)? else {
        return Ok(None);
    };
    let listing = row.to_listing()?;
    let percentage = db.get_min_offer_percentage()?;
    let proofs = db
        .listing_proofs(id)?
        .iter()
        .map(|p| p.to_proof())
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Some(ListingDetail {
        success: true,
        minimum_offer: minimum_offer(listing.asking_price, percentage, listing.bidding.reserved_amount),
        owner_username: row.owner_username,
        categories: db.listing_categories(id)?,
        labels: db.listing_labels(id)?,
        proofs,
        answers: db.listing_answers(id)?,
        listing,
    }))
}

/// POST /listings: submit a new listing for review.
pub async fn create_listing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(form), _): WithRejection<Json<ListingForm>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let form = validate(&state, form, now).await?;

    let listing_id = Uuid::new_v4();
    let (id, owner) = (listing_id.to_string(), claims.sub.to_string());
    run_db(&state, move |db| {
        db.insert_listing(&NewListing { id: &id, owner_id: &owner, form: &form, now })
    })
    .await?;

    info!("User {} submitted listing {}", claims.username, listing_id);

    Ok((
        StatusCode::CREATED,
        Json(ListingSaved {
            success: true,
            listing_id,
            status: ListingStatus::Pending,
        }),
    ))
}

/// PUT /listings/{id}: owner edit; sends the listing back to review.
pub async fn update_listing(
    State(state): State<AppState>,
    WithRejection(Path(listing_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(form), _): WithRejection<Json<ListingForm>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = owned_listing(&state, listing_id, &claims).await?;
    if listing.status == ListingStatus::Sold {
        return Err(ApiError::Conflict("Sold listings cannot be edited".to_string()));
    }

    let now = Utc::now();
    let form = validate(&state, form, now).await?;

    let id = listing_id.to_string();
    let updated = run_db(&state, move |db| db.update_listing(&id, &form, now)).await?;
    if !updated {
        return Err(ApiError::Conflict("Sold listings cannot be edited".to_string()));
    }

    info!("User {} updated listing {}", claims.username, listing_id);

    Ok(Json(ListingSaved {
        success: true,
        listing_id,
        status: ListingStatus::Pending,
    }))
}

/// GET /me/listings: every listing the caller owns, any status.
pub async fn my_listings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = claims.sub.to_string();
    let listings = run_db(&state, move |db| {
        db.listings_by_owner(&owner)?
            .iter()
            .map(|row| row.to_listing())
            .collect::<anyhow::Result<Vec<Listing>>>()
    })
    .await?;

    Ok(Json(ListResponse::new(listings)))
}

/// POST /listings/{id}/proofs: record a proof image for the owner's listing.
pub async fn add_proof(
    State(state): State<AppState>,
    WithRejection(Path(listing_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<AddProofRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    owned_listing(&state, listing_id, &claims).await?;

    let file_name = req.file_name.trim().to_string();
    let mut errors = Vec::new();
    if file_name.is_empty() || file_name.contains(['/', '\\']) {
        errors.push("Please provide a plain file name".to_string());
    }
    if let Err(e) = validate_proof(&req.mime_type, req.size_bytes) {
        errors.push(e);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let proof = ListingProof {
        id: Uuid::new_v4(),
        listing_id,
        file_name,
        mime_type: req.mime_type,
        size_bytes: req.size_bytes,
        created_at: Utc::now(),
    };

    let record = proof.clone();
    run_db(&state, move |db| {
        db.insert_proof(&NewProof {
            id: &record.id.to_string(),
            listing_id: &record.listing_id.to_string(),
            file_name: &record.file_name,
            mime_type: &record.mime_type,
            size_bytes: record.size_bytes,
            now: record.created_at,
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(ProofAdded { success: true, proof })))
}

/// Loads a listing and checks the caller owns it.
pub(crate) async fn owned_listing(
    state: &AppState,
    listing_id: Uuid,
    claims: &Claims,
) -> Result<Listing, ApiError> {
    let id = listing_id.to_string();
    let listing = run_db(state, move |db| db.get_listing(&id)?.map(|r| r.to_listing()).transpose())
        .await?
        .ok_or(ApiError::NotFound("Listing not found"))?;

    if listing.owner_id != claims.sub {
        return Err(ApiError::Forbidden("You can only manage your own listings"));
    }
    Ok(listing)
}

/// Form rules plus the category and label lookups they reference.
async fn validate(
    state: &AppState,
    form: ListingForm,
    now: DateTime<Utc>,
) -> Result<ListingForm, ApiError> {
    let mut errors = validate_form(&form, now).err().unwrap_or_default();

    let (categories, labels) = (form.category_ids.clone(), form.label_ids.clone());
    let (missing_categories, missing_labels) = run_db(state, move |db| {
        Ok((db.missing_category_ids(&categories)?, db.missing_label_ids(&labels)?))
    })
    .await?;

    if !missing_categories.is_empty() {
        errors.push(format!("Unknown category ids: {}", join_ids(&missing_categories)));
    }
    if !missing_labels.is_empty() {
        errors.push(format!("Unknown label ids: {}", join_ids(&missing_labels)));
    }

    if errors.is_empty() {
        Ok(form)
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
}
