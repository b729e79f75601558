use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    BiddingTerms, Category, Label, Listing, ListingAnswer, ListingProof, ListingStatus,
    ListingType, Offer, Role,
};

// -- JWT Claims --

/// JWT claims issued at login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub token: String,
}

// -- Listings --

/// Body of both the create and the update listing forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListingForm {
    pub listing_type: ListingType,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub monthly_revenue: Decimal,
    pub asking_price: Decimal,
    #[serde(default)]
    pub reserved_amount: Option<Decimal>,
    #[serde(default)]
    pub min_down_payment_percentage: Option<u8>,
    #[serde(default)]
    pub buy_now_price: Option<Decimal>,
    #[serde(default)]
    pub auto_extend_enabled: bool,
    #[serde(default)]
    pub auction_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    #[serde(default)]
    pub label_ids: Vec<i64>,
    #[serde(default)]
    pub answers: Vec<ListingAnswer>,
}

impl ListingForm {
    pub fn bidding_terms(&self) -> BiddingTerms {
        BiddingTerms {
            reserved_amount: self.reserved_amount.unwrap_or(Decimal::ZERO),
            min_down_payment_percentage: self.min_down_payment_percentage.unwrap_or(0),
            buy_now_price: self.buy_now_price,
            auto_extend_enabled: self.auto_extend_enabled,
            auction_end_time: self.auction_end_time,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(rename = "type")]
    pub listing_type: Option<ListingType>,
    pub category: Option<i64>,
    pub label: Option<i64>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationQuery {
    pub status: Option<ListingStatus>,
}

#[derive(Debug, Serialize)]
pub struct ListingSummary {
    #[serde(flatten)]
    pub listing: Listing,
    pub owner_username: String,
}

#[derive(Debug, Serialize)]
pub struct ListingDetail {
    pub success: bool,
    #[serde(flatten)]
    pub listing: Listing,
    pub owner_username: String,
    pub categories: Vec<Category>,
    pub labels: Vec<Label>,
    pub proofs: Vec<ListingProof>,
    pub answers: Vec<ListingAnswer>,
    pub minimum_offer: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ListingSaved {
    pub success: bool,
    pub listing_id: Uuid,
    pub status: ListingStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectListingRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddProofRequest {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct ProofAdded {
    pub success: bool,
    pub proof: ListingProof,
}

// -- Offers --

/// `amount` is kept as raw JSON so that a non-numeric value reaches the
/// acceptability check instead of failing deserialization.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitOfferRequest {
    #[serde(default)]
    pub amount: serde_json::Value,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitOfferResponse {
    pub success: bool,
    pub message: String,
    pub offer_id: Uuid,
    pub auction_end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct OfferView {
    #[serde(flatten)]
    pub offer: Offer,
    pub listing_title: String,
    pub counterparty_username: String,
}

#[derive(Debug, Serialize)]
pub struct OfferDecisionResponse {
    pub success: bool,
    pub offer_id: Uuid,
    pub status: crate::models::OfferStatus,
    /// Other pending offers closed as a side effect of accepting this one.
    pub rejected_offer_ids: Vec<Uuid>,
}

// -- Wishlist --

#[derive(Debug, Serialize)]
pub struct WishlistToggleResponse {
    pub success: bool,
    pub wishlisted: bool,
}

// -- Catalog & settings --

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub success: bool,
    pub categories: Vec<Category>,
    pub labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MinOfferPercentage {
    #[serde(default = "success_true", skip_deserializing)]
    pub success: bool,
    pub min_offer_percentage: u8,
}

fn success_true() -> bool {
    true
}

/// Generic list envelope so every JSON response carries `success`.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub items: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { success: true, items }
    }
}
