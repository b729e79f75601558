//! Database row types. These map directly to SQLite rows.
//! Conversion into `market-types` models happens here so handlers never see
//! raw column text.

use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

use market_types::models::{
    BiddingTerms, Listing, ListingProof, Offer, Role, User,
};

use crate::parse_ts;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

impl UserRow {
    pub fn to_user(&self) -> Result<User> {
        Ok(User {
            id: parse_uuid(&self.id)?,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.parse::<Role>()?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct ListingRow {
    pub id: String,
    pub owner_id: String,
    pub owner_username: String,
    pub listing_type: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub monthly_revenue: String,
    pub asking_price: String,
    pub reserved_amount: String,
    pub min_down_payment_percentage: i64,
    pub buy_now_price: Option<String>,
    pub auto_extend_enabled: bool,
    pub auction_end_time: Option<String>,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub approved_at: Option<String>,
    pub expires_at: Option<String>,
}

/// Column list matching `ListingRow::from_row`; expects `listings l JOIN users u`.
pub(crate) const LISTING_COLUMNS: &str = "l.id, l.owner_id, u.username, l.listing_type, l.title, l.url,
    l.description, l.monthly_revenue, l.asking_price, l.reserved_amount,
    l.min_down_payment_percentage, l.buy_now_price, l.auto_extend_enabled,
    l.auction_end_time, l.status, l.rejection_reason, l.created_at, l.updated_at,
    l.approved_at, l.expires_at";

impl ListingRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            owner_username: row.get(2)?,
            listing_type: row.get(3)?,
            title: row.get(4)?,
            url: row.get(5)?,
            description: row.get(6)?,
            monthly_revenue: row.get(7)?,
            asking_price: row.get(8)?,
            reserved_amount: row.get(9)?,
            min_down_payment_percentage: row.get(10)?,
            buy_now_price: row.get(11)?,
            auto_extend_enabled: row.get(12)?,
            auction_end_time: row.get(13)?,
            status: row.get(14)?,
            rejection_reason: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
            approved_at: row.get(18)?,
            expires_at: row.get(19)?,
        })
    }

    pub fn to_listing(&self) -> Result<Listing> {
        Ok(Listing {
            id: parse_uuid(&self.id)?,
            owner_id: parse_uuid(&self.owner_id)?,
            listing_type: self.listing_type.parse()?,
            title: self.title.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
            monthly_revenue: parse_money(&self.monthly_revenue)?,
            asking_price: parse_money(&self.asking_price)?,
            bidding: BiddingTerms {
                reserved_amount: parse_money(&self.reserved_amount)?,
                min_down_payment_percentage: u8::try_from(self.min_down_payment_percentage)
                    .context("min_down_payment_percentage out of range")?,
                buy_now_price: self.buy_now_price.as_deref().map(parse_money).transpose()?,
                auto_extend_enabled: self.auto_extend_enabled,
                auction_end_time: self.auction_end_time.as_deref().map(parse_ts).transpose()?,
            },
            status: self.status.parse()?,
            rejection_reason: self.rejection_reason.clone(),
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            approved_at: self.approved_at.as_deref().map(parse_ts).transpose()?,
            expires_at: self.expires_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

pub struct OfferRow {
    pub id: String,
    pub listing_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount: String,
    pub message: Option<String>,
    pub status: String,
    pub created_at: String,
    pub responded_at: Option<String>,
    /// Filled by the joined "my offers" queries only.
    pub listing_title: Option<String>,
    pub counterparty_username: Option<String>,
}

impl OfferRow {
    pub fn to_offer(&self) -> Result<Offer> {
        Ok(Offer {
            id: parse_uuid(&self.id)?,
            listing_id: parse_uuid(&self.listing_id)?,
            buyer_id: parse_uuid(&self.buyer_id)?,
            seller_id: parse_uuid(&self.seller_id)?,
            amount: parse_money(&self.amount)?,
            message: self.message.clone(),
            status: self.status.parse()?,
            created_at: parse_ts(&self.created_at)?,
            responded_at: self.responded_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

pub struct ProofRow {
    pub id: String,
    pub listing_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: String,
}

impl ProofRow {
    pub fn to_proof(&self) -> Result<ListingProof> {
        Ok(ListingProof {
            id: parse_uuid(&self.id)?,
            listing_id: parse_uuid(&self.listing_id)?,
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: u64::try_from(self.size_bytes).context("negative proof size")?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("Corrupt id '{}'", raw))
}

fn parse_money(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("Corrupt amount '{}'", raw))
}
