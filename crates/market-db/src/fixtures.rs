use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use market_types::api::ListingForm;
use market_types::models::ListingType;

use crate::Database;
use crate::listings::NewListing;

pub fn db() -> Database {
    Database::open_in_memory().unwrap()
}

pub fn user(db: &Database, username: &str) -> String {
    let id = Uuid::new_v4().to_string();
    db.create_user(&id, username, &format!("{username}@example.com"), "hash", "user")
        .unwrap();
    id
}

pub fn form(asking_price: Decimal) -> ListingForm {
    ListingForm {
        listing_type: ListingType::Website,
        title: "Recipe blog with newsletter".to_string(),
        url: "https://recipes.example.com".to_string(),
        description: "Evergreen cooking content".to_string(),
        monthly_revenue: Decimal::from(900),
        asking_price,
        reserved_amount: None,
        min_down_payment_percentage: None,
        buy_now_price: None,
        auto_extend_enabled: false,
        auction_end_time: None,
        category_ids: vec![1],
        label_ids: vec![],
        answers: vec![],
    }
}

pub fn pending_listing(db: &Database, owner_id: &str, form: &ListingForm) -> String {
    let id = Uuid::new_v4().to_string();
    db.insert_listing(&NewListing { id: &id, owner_id, form, now: Utc::now() })
        .unwrap();
    id
}

pub fn approved_listing(db: &Database, owner_id: &str, asking_price: Decimal) -> String {
    let id = pending_listing(db, owner_id, &form(asking_price));
    let now = Utc::now();
    assert!(db.approve_listing(&id, now, now + Duration::days(90)).unwrap());
    id
}
