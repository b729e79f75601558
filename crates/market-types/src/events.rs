use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events that produce an email notification to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MarketEvent {
    /// A buyer placed an offer on the seller's listing
    OfferReceived {
        offer_id: Uuid,
        listing_id: Uuid,
        listing_title: String,
        buyer_username: String,
        amount: Decimal,
        message: Option<String>,
    },

    /// The seller accepted or rejected the buyer's offer
    OfferDecided {
        offer_id: Uuid,
        listing_id: Uuid,
        listing_title: String,
        amount: Decimal,
        accepted: bool,
    },

    /// An admin approved or rejected the owner's listing
    ListingModerated {
        listing_id: Uuid,
        listing_title: String,
        approved: bool,
        reason: Option<String>,
    },
}

impl MarketEvent {
    pub fn subject(&self) -> String {
        match self {
            Self::OfferReceived { listing_title, .. } => {
                format!("New offer on \"{}\"", listing_title)
            }
            Self::OfferDecided { listing_title, accepted: true, .. } => {
                format!("Your offer on \"{}\" was accepted", listing_title)
            }
            Self::OfferDecided { listing_title, accepted: false, .. } => {
                format!("Your offer on \"{}\" was declined", listing_title)
            }
            Self::ListingModerated { listing_title, approved: true, .. } => {
                format!("\"{}\" is now live", listing_title)
            }
            Self::ListingModerated { listing_title, approved: false, .. } => {
                format!("\"{}\" was not approved", listing_title)
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::OfferReceived { buyer_username, amount, message, .. } => {
                let mut body = format!("{} offered ${} for your listing.", buyer_username, amount);
                if let Some(message) = message.as_deref().filter(|m| !m.is_empty()) {
                    body.push_str("\n\nMessage from the buyer:\n");
                    body.push_str(message);
                }
                body
            }
            Self::OfferDecided { amount, accepted: true, .. } => {
                format!("The seller accepted your offer of ${}. They will contact you to arrange escrow.", amount)
            }
            Self::OfferDecided { amount, accepted: false, .. } => {
                format!("The seller declined your offer of ${}.", amount)
            }
            Self::ListingModerated { approved: true, .. } => {
                "Your listing passed review and is visible to buyers.".to_string()
            }
            Self::ListingModerated { approved: false, reason, .. } => match reason {
                Some(reason) => format!("Your listing was rejected: {}", reason),
                None => "Your listing was rejected.".to_string(),
            },
        }
    }
}
