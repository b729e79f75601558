use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub use market_types::models::DEFAULT_MIN_OFFER_PERCENTAGE;

/// Offers above this multiple of the asking price are treated as typos.
const ASKING_PRICE_CEILING_MULTIPLE: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OfferRejection {
    #[error("Please enter a valid offer amount")]
    InvalidAmount,

    #[error("Offer amount is unrealistically high")]
    AboveCeiling { ceiling: Decimal },

    #[error("Offer must be at least {percentage}% of the asking price (${minimum})")]
    BelowMinimumPercentage { percentage: u8, minimum: Decimal },

    #[error("Offer must be at least the reserved amount of ${reserved}")]
    BelowReserved { reserved: Decimal },

    #[error("You cannot make an offer on your own listing")]
    OwnListing,
}

/// Everything about a listing that the acceptability check looks at.
#[derive(Debug, Clone)]
pub struct OfferContext {
    pub owner_id: Uuid,
    pub asking_price: Decimal,
    pub reserved_amount: Decimal,
    pub min_offer_percentage: u8,
}

impl OfferContext {
    /// Exact `asking * pct / 100`. Offers are compared against this value.
    pub fn percentage_floor(&self) -> Decimal {
        percent_of(self.asking_price, self.min_offer_percentage)
    }

    /// `None` when ten times the asking price is beyond `Decimal` range.
    pub fn ceiling(&self) -> Option<Decimal> {
        self.asking_price
            .checked_mul(Decimal::from(ASKING_PRICE_CEILING_MULTIPLE))
    }

    /// Lowest amount that passes every amount rule.
    pub fn minimum_offer(&self) -> Decimal {
        minimum_offer(self.asking_price, self.min_offer_percentage, self.reserved_amount)
    }

    /// Runs the rules in order and reports the first one that fails.
    pub fn check(&self, buyer_id: Uuid, amount: Decimal) -> Result<(), OfferRejection> {
        if amount <= Decimal::ZERO {
            return Err(OfferRejection::InvalidAmount);
        }

        if let Some(ceiling) = self.ceiling() {
            if amount > ceiling {
                return Err(OfferRejection::AboveCeiling { ceiling });
            }
        }

        if amount < self.percentage_floor() {
            return Err(OfferRejection::BelowMinimumPercentage {
                percentage: self.min_offer_percentage,
                minimum: money(self.percentage_floor()),
            });
        }

        if self.reserved_amount > Decimal::ZERO && amount < self.reserved_amount {
            return Err(OfferRejection::BelowReserved {
                reserved: money(self.reserved_amount),
            });
        }

        if buyer_id == self.owner_id {
            return Err(OfferRejection::OwnListing);
        }

        Ok(())
    }

    /// Parses the raw client amount and checks it. Returns the parsed amount.
    pub fn evaluate(&self, buyer_id: Uuid, raw: &Value) -> Result<Decimal, OfferRejection> {
        let amount = parse_amount(raw).ok_or(OfferRejection::InvalidAmount)?;
        self.check(buyer_id, amount)?;
        Ok(amount)
    }
}

/// `max(asking * pct / 100, reserved)`, rounded up to whole cents.
pub fn minimum_offer(asking_price: Decimal, percentage: u8, reserved_amount: Decimal) -> Decimal {
    money(percent_of(asking_price, percentage).max(reserved_amount))
}

/// `value * pct / 100` without overflowing. Saturates at `Decimal::MAX`.
fn percent_of(value: Decimal, percentage: u8) -> Decimal {
    let pct = Decimal::from(percentage);
    value
        .checked_mul(pct)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .or_else(|| {
            value
                .checked_div(Decimal::ONE_HUNDRED)
                .and_then(|v| v.checked_mul(pct))
        })
        .unwrap_or(Decimal::MAX)
}

/// Accepts a JSON number or a numeric string. Anything else is not an amount.
pub fn parse_amount(raw: &Value) -> Option<Decimal> {
    match raw {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            Decimal::from_str(s).ok()
        }
        _ => None,
    }
}

/// Rounds up to whole cents with trailing zeros dropped, so a displayed
/// minimum always passes the check it describes.
fn money(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(2, RoundingStrategy::AwayFromZero)
        .normalize()
}
