use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use market_types::api::ListingForm;
use market_types::models::ListingType;

pub const TITLE_MIN_CHARS: usize = 5;
pub const TITLE_MAX_CHARS: usize = 150;
pub const MAX_ANSWERS: usize = 10;

/// 10 MiB cap on listing proof files.
pub const MAX_PROOF_BYTES: u64 = 10 * 1024 * 1024;

pub const PROOF_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Collects every problem with a submitted listing form.
pub fn validate_form(form: &ListingForm, now: DateTime<Utc>) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let title_len = form.title.trim().chars().count();
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&title_len) {
        errors.push(format!(
            "Title must be between {} and {} characters",
            TITLE_MIN_CHARS, TITLE_MAX_CHARS
        ));
    }

    if let Err(e) = validate_url(form.listing_type, form.url.trim()) {
        errors.push(e);
    }

    if form.asking_price <= Decimal::ZERO {
        errors.push("Asking price must be greater than zero".to_string());
    }
    if form.monthly_revenue < Decimal::ZERO {
        errors.push("Monthly revenue cannot be negative".to_string());
    }

    let terms = form.bidding_terms();
    if terms.reserved_amount < Decimal::ZERO {
        errors.push("Reserved amount cannot be negative".to_string());
    } else if terms.reserved_amount > form.asking_price {
        errors.push("Reserved amount cannot exceed the asking price".to_string());
    }

    if let Some(buy_now) = terms.buy_now_price {
        if buy_now < form.asking_price {
            errors.push("Buy now price must be at least the asking price".to_string());
        }
    }

    if terms.min_down_payment_percentage > 100 {
        errors.push("Minimum down payment must be between 0 and 100 percent".to_string());
    }

    if let Some(end) = terms.auction_end_time {
        if end <= now {
            errors.push("Auction end time must be in the future".to_string());
        }
    }

    if form.answers.len() > MAX_ANSWERS {
        errors.push(format!("At most {} questionnaire answers are allowed", MAX_ANSWERS));
    }
    if form
        .answers
        .iter()
        .any(|a| a.question.trim().is_empty() || a.answer.trim().is_empty())
    {
        errors.push("Questionnaire answers cannot be empty".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_url(listing_type: ListingType, url: &str) -> Result<(), String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    match listing_type {
        ListingType::Website => match rest {
            Some(rest) if !rest.is_empty() => Ok(()),
            _ => Err("Website URL must start with http:// or https://".to_string()),
        },
        ListingType::Youtube => {
            let host = rest
                .unwrap_or(url)
                .split(['/', '?', '#'])
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            if host.contains("youtube.com") || host.contains("youtu.be") {
                Ok(())
            } else {
                Err("Channel URL must point to youtube.com or youtu.be".to_string())
            }
        }
    }
}

pub fn validate_proof(mime_type: &str, size_bytes: u64) -> Result<(), String> {
    if !PROOF_MIME_TYPES.contains(&mime_type) {
        return Err("Only JPEG, PNG, GIF and WEBP images are allowed".to_string());
    }
    if size_bytes == 0 || size_bytes > MAX_PROOF_BYTES {
        return Err("Proof files must be between 1 byte and 10MB".to_string());
    }
    Ok(())
}

/// Category and label names.
pub fn validate_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if (2..=64).contains(&len) {
        Ok(())
    } else {
        Err("Name must be between 2 and 64 characters".to_string())
    }
}
