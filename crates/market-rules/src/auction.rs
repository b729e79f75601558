use chrono::{DateTime, Duration, Utc};

use market_types::models::BiddingTerms;

/// Offers landing this close to the end push the end time back.
const AUTO_EXTEND_MINUTES: i64 = 10;

pub fn auto_extend_window() -> Duration {
    Duration::minutes(AUTO_EXTEND_MINUTES)
}

pub fn has_ended(terms: &BiddingTerms, now: DateTime<Utc>) -> bool {
    terms.auction_end_time.is_some_and(|end| end <= now)
}

/// New end time for an auction after an offer at `now`, or `None` when the
/// timer stays as it is.
pub fn extended_end_time(terms: &BiddingTerms, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if !terms.auto_extend_enabled {
        return None;
    }
    let end = terms.auction_end_time?;
    if end <= now {
        return None;
    }

    let window = auto_extend_window();
    if end - now <= window {
        Some(now + window)
    } else {
        None
    }
}
