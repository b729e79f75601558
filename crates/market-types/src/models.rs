use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Used when `system_settings` has no `min_offer_percentage` row.
pub const DEFAULT_MIN_OFFER_PERCENTAGE: u8 = 70;

/// Error returned when a stored or submitted enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

string_enum!(ListingType, "listing type", {
    Website => "website",
    Youtube => "youtube",
});

string_enum!(ListingStatus, "listing status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Sold => "sold",
});

string_enum!(OfferStatus, "offer status", {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

string_enum!(Role, "role", {
    User => "user",
    Admin => "admin",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Seller-controlled bidding terms attached to a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiddingTerms {
    pub reserved_amount: Decimal,
    pub min_down_payment_percentage: u8,
    pub buy_now_price: Option<Decimal>,
    pub auto_extend_enabled: bool,
    pub auction_end_time: Option<DateTime<Utc>>,
}

impl Default for BiddingTerms {
    fn default() -> Self {
        Self {
            reserved_amount: Decimal::ZERO,
            min_down_payment_percentage: 0,
            buy_now_price: None,
            auto_extend_enabled: false,
            auction_end_time: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub listing_type: ListingType,
    pub title: String,
    pub url: String,
    pub description: String,
    pub monthly_revenue: Decimal,
    pub asking_price: Decimal,
    #[serde(flatten)]
    pub bidding: BiddingTerms,
    pub status: ListingStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub amount: Decimal,
    pub message: Option<String>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingProof {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingAnswer {
    pub question: String,
    pub answer: String,
}
