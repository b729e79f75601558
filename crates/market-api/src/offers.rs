use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use market_db::offers::NewOffer;
use market_rules::OfferContext;
use market_rules::auction;
use market_types::api::{
    Claims, ListResponse, OfferDecisionResponse, OfferView, SubmitOfferRequest,
    SubmitOfferResponse,
};
use market_types::events::MarketEvent;
use market_types::models::{Listing, ListingStatus, Offer, OfferStatus};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::notify::Notification;
use crate::run_db;

const MAX_MESSAGE_CHARS: usize = 1000;

/// POST /listings/{id}/offers: the AJAX offer popup.
pub async fn submit_offer(
    State(state): State<AppState>,
    WithRejection(Path(listing_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<SubmitOfferRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = listing_id.to_string();
    let (listing, seller, percentage) = run_db(&state, move |db| {
        let Some(row) = db.get_listing(&id)? else {
            return Ok(None);
        };
        let seller = db.get_user_by_id(&row.owner_id)?;
        Ok(Some((row.to_listing()?, seller, db.get_min_offer_percentage()?)))
    })
    .await?
    .ok_or(ApiError::NotFound("Listing not found"))?;

    let now = Utc::now();
    if listing.status != ListingStatus::Approved || listing.is_expired(now) {
        return Err(ApiError::Conflict("This listing is not accepting offers".to_string()));
    }
    if auction::has_ended(&listing.bidding, now) {
        return Err(ApiError::Conflict("The auction for this listing has ended".to_string()));
    }

    let context = OfferContext {
        owner_id: listing.owner_id,
        asking_price: listing.asking_price,
        reserved_amount: listing.bidding.reserved_amount,
        min_offer_percentage: percentage,
    };
    let amount = context.evaluate(claims.sub, &req.amount)?;

    let message = req
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    if message.as_ref().is_some_and(|m| m.chars().count() > MAX_MESSAGE_CHARS) {
        return Err(ApiError::BadRequest(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let offer_id = Uuid::new_v4();
    let extended = auction::extended_end_time(&listing.bidding, now);
    let (oid, lid, bid, sid, stored_message) = (
        offer_id.to_string(),
        listing_id.to_string(),
        claims.sub.to_string(),
        listing.owner_id.to_string(),
        message.clone(),
    );
    run_db(&state, move |db| {
        db.insert_offer(&NewOffer {
            id: &oid,
            listing_id: &lid,
            buyer_id: &bid,
            seller_id: &sid,
            amount: amount.to_string(),
            message: stored_message.as_deref(),
            now,
        })?;
        if let Some(end) = extended {
            db.set_auction_end_time(&lid, end)?;
        }
        Ok(())
    })
    .await?;

    info!(
        "Offer {} of {} on listing {} by {}",
        offer_id, amount, listing_id, claims.username
    );
    if let Some(end) = extended {
        info!("Auction for listing {} extended to {}", listing_id, end);
    }

    match seller.map(|s| s.to_user()).transpose()? {
        Some(seller) => state.notifier.notify(Notification {
            to_email: seller.email,
            to_username: seller.username,
            event: MarketEvent::OfferReceived {
                offer_id,
                listing_id,
                listing_title: listing.title.clone(),
                buyer_username: claims.username.clone(),
                amount,
                message,
            },
        }),
        None => warn!("Seller of listing {} not found; offer email skipped", listing_id),
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmitOfferResponse {
            success: true,
            message: "Your offer has been submitted to the seller".to_string(),
            offer_id,
            auction_end_time: extended.or(listing.bidding.auction_end_time),
        }),
    ))
}

/// GET /me/offers: offers the caller has made.
pub async fn my_offers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let offers = run_db(&state, move |db| to_views(db.offers_by_buyer(&uid)?)).await?;
    Ok(Json(ListResponse::new(offers)))
}

/// GET /me/offers/received: offers on the caller's listings.
pub async fn received_offers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let offers = run_db(&state, move |db| to_views(db.offers_for_seller(&uid)?)).await?;
    Ok(Json(ListResponse::new(offers)))
}

fn to_views(rows: Vec<market_db::models::OfferRow>) -> anyhow::Result<Vec<OfferView>> {
    rows.into_iter()
        .map(|row| {
            Ok(OfferView {
                offer: row.to_offer()?,
                listing_title: row.listing_title.unwrap_or_default(),
                counterparty_username: row
                    .counterparty_username
                    .unwrap_or_else(|| "unknown".to_string()),
            })
        })
        .collect()
}

/// POST /offers/{id}/accept: seller closes the sale with this offer.
pub async fn accept_offer(
    State(state): State<AppState>,
    WithRejection(Path(offer_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (offer, listing) = seller_offer(&state, offer_id, &claims).await?;

    let oid = offer_id.to_string();
    let rejected = run_db(&state, move |db| db.accept_offer(&oid, Utc::now()))
        .await?
        .ok_or_else(|| ApiError::Conflict("This offer can no longer be accepted".to_string()))?;

    let rejected_ids = rejected
        .iter()
        .filter_map(|id| id.parse::<Uuid>().ok())
        .collect::<Vec<_>>();

    info!(
        "Listing {} sold to offer {} ({} other offers closed)",
        listing.id,
        offer_id,
        rejected_ids.len()
    );

    notify_buyer(&state, &offer, &listing, true).await;
    for id in &rejected {
        let lookup = id.clone();
        match run_db(&state, move |db| db.get_offer(&lookup)?.map(|r| r.to_offer()).transpose()).await {
            Ok(Some(closed)) => notify_buyer(&state, &closed, &listing, false).await,
            Ok(None) => {}
            Err(e) => warn!("Could not load closed offer {}: {}", id, e),
        }
    }

    Ok(Json(OfferDecisionResponse {
        success: true,
        offer_id,
        status: OfferStatus::Accepted,
        rejected_offer_ids: rejected_ids,
    }))
}

/// POST /offers/{id}/reject: seller declines this offer.
pub async fn reject_offer(
    State(state): State<AppState>,
    WithRejection(Path(offer_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (offer, listing) = seller_offer(&state, offer_id, &claims).await?;

    let oid = offer_id.to_string();
    let rejected = run_db(&state, move |db| db.reject_offer(&oid, Utc::now())).await?;
    if !rejected {
        return Err(ApiError::Conflict("This offer has already been answered".to_string()));
    }

    notify_buyer(&state, &offer, &listing, false).await;

    Ok(Json(OfferDecisionResponse {
        success: true,
        offer_id,
        status: OfferStatus::Rejected,
        rejected_offer_ids: vec![],
    }))
}

/// Loads a pending offer addressed to the caller, with its listing.
async fn seller_offer(
    state: &AppState,
    offer_id: Uuid,
    claims: &Claims,
) -> Result<(Offer, Listing), ApiError> {
    let oid = offer_id.to_string();
    let found = run_db(state, move |db| {
        let Some(offer) = db.get_offer(&oid)? else {
            return Ok(None);
        };
        let offer = offer.to_offer()?;
        let listing = db
            .get_listing(&offer.listing_id.to_string())?
            .map(|r| r.to_listing())
            .transpose()?;
        Ok(listing.map(|listing| (offer, listing)))
    })
    .await?
    .ok_or(ApiError::NotFound("Offer not found"))?;

    let (offer, _) = &found;
    if offer.seller_id != claims.sub {
        return Err(ApiError::Forbidden("Only the seller can respond to this offer"));
    }
    if offer.status != OfferStatus::Pending {
        return Err(ApiError::Conflict("This offer has already been answered".to_string()));
    }
    Ok(found)
}

async fn notify_buyer(state: &AppState, offer: &Offer, listing: &Listing, accepted: bool) {
    let buyer_id = offer.buyer_id.to_string();
    let buyer = match run_db(state, move |db| db.get_user_by_id(&buyer_id)?.map(|u| u.to_user()).transpose()).await {
        Ok(Some(buyer)) => buyer,
        Ok(None) => return,
        Err(e) => {
            warn!("Could not load buyer {} for notification: {}", offer.buyer_id, e);
            return;
        }
    };

    state.notifier.notify(Notification {
        to_email: buyer.email,
        to_username: buyer.username,
        event: MarketEvent::OfferDecided {
            offer_id: offer.id,
            listing_id: listing.id,
            listing_title: listing.title.clone(),
            amount: offer.amount,
            accepted,
        },
    });
}
