//! Business rules for the marketplace, free of I/O so they can be checked
//! directly and reused by every handler that touches offers or listings.

pub mod auction;
pub mod listing;
pub mod offer;

pub use offer::{OfferContext, OfferRejection, DEFAULT_MIN_OFFER_PERCENTAGE};
