use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use market_db::Database;
use market_types::events::MarketEvent;

use crate::auth::{AppState, AppStateInner};
use crate::notify::{Notification, Notifier};
use crate::router;

struct TestApp {
    router: Router,
    state: AppState,
    mail: UnboundedReceiver<Notification>,
}

impl TestApp {
    fn new() -> Self {
        let (notifier, mail) = Notifier::channel();
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".to_string(),
            notifier,
            listing_ttl: Duration::days(90),
            admin_usernames: vec!["admin".to_string()],
        });
        Self { router: router(state.clone()), state, mail }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send_raw(method, uri, token, body.map(|b| b.to_string())).await
    }

    async fn send_raw(&self, method: Method, uri: &str, token: Option<&str>, body: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "correct horse battery",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a listing as `seller` and approves it as `admin`.
    async fn live_listing(&self, seller: &str, admin: &str, asking: &str, reserved: &str) -> String {
        self.live_listing_from(seller, admin, listing_body(asking, reserved)).await
    }

    async fn live_listing_from(&self, seller: &str, admin: &str, form: Value) -> String {
        let (status, body) = self
            .send(Method::POST, "/listings", Some(seller), Some(form))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["listing_id"].as_str().unwrap().to_string();

        let (status, body) = self
            .send(Method::POST, &format!("/admin/listings/{id}/approve"), Some(admin), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        id
    }

    fn drain_mail(&mut self) -> Vec<Notification> {
        let mut mail = Vec::new();
        while let Ok(n) = self.mail.try_recv() {
            mail.push(n);
        }
        mail
    }
}

fn listing_body(asking: &str, reserved: &str) -> Value {
    json!({
        "listing_type": "website",
        "title": "Established SaaS review site",
        "url": "https://reviews.example.com",
        "description": "Affiliate revenue from software reviews",
        "monthly_revenue": "3200",
        "asking_price": asking,
        "reserved_amount": reserved,
        "category_ids": [3],
        "label_ids": [2],
        "answers": [{ "question": "Why are you selling?", "answer": "Focusing on a new project" }],
    })
}

#[tokio::test]
async fn offer_below_reserved_amount_is_rejected() {
    let mut app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;
    let listing = app.live_listing(&seller, &admin, "100000", "80000").await;

    let (status, body) = app.send(Method::GET, &format!("/listings/{listing}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["minimum_offer"], "80000");
    assert_eq!(body["categories"][0]["name"], "SaaS");

    let uri = format!("/listings/{listing}/offers");
    let (status, body) = app
        .send(Method::POST, &uri, Some(buyer.as_str()), Some(json!({ "amount": 75000 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Offer must be at least the reserved amount of $80000");

    app.drain_mail();
    let (status, body) = app
        .send(Method::POST, &uri, Some(buyer.as_str()), Some(json!({ "amount": "85000", "message": "Can close this week" })))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);

    let mail = app.drain_mail();
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].to_email, "seller@example.com");
    assert!(matches!(mail[0].event, MarketEvent::OfferReceived { .. }));
}

#[tokio::test]
async fn offer_rules_report_the_first_failure() {
    let app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;
    let listing = app.live_listing(&seller, &admin, "10000", "0").await;
    let uri = format!("/listings/{listing}/offers");

    let cases = [
        (json!({ "amount": "abc" }), "Please enter a valid offer amount"),
        (json!({}), "Please enter a valid offer amount"),
        (json!({ "amount": 0 }), "Please enter a valid offer amount"),
        (json!({ "amount": 100001 }), "Offer amount is unrealistically high"),
        (json!({ "amount": 6999 }), "Offer must be at least 70% of the asking price ($7000)"),
    ];
    for (body, message) in cases {
        let (status, reply) = app.send(Method::POST, &uri, Some(buyer.as_str()), Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(reply["message"], message);
    }

    let (status, reply) = app
        .send(Method::POST, &uri, Some(seller.as_str()), Some(json!({ "amount": 9000 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply["message"], "You cannot make an offer on your own listing");
}

#[tokio::test]
async fn min_offer_percentage_setting_drives_the_floor() {
    let app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;
    let listing = app.live_listing(&seller, &admin, "10000", "0").await;

    let (_, body) = app.send(Method::GET, "/settings/min-offer-percentage", None, None).await;
    assert_eq!(body["min_offer_percentage"], 70);

    let (status, _) = app
        .send(Method::PUT, "/admin/settings/min-offer-percentage", Some(seller.as_str()), Some(json!({ "min_offer_percentage": 50 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::PUT, "/admin/settings/min-offer-percentage", Some(admin.as_str()), Some(json!({ "min_offer_percentage": 0 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .send(Method::PUT, "/admin/settings/min-offer-percentage", Some(admin.as_str()), Some(json!({ "min_offer_percentage": 50 })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app
        .send(Method::POST, &format!("/listings/{listing}/offers"), Some(buyer.as_str()), Some(json!({ "amount": 5000 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn pending_listings_are_hidden_and_closed_to_offers() {
    let app = TestApp::new();
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;

    let (status, body) = app
        .send(Method::POST, "/listings", Some(seller.as_str()), Some(listing_body("5000", "0")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let listing = body["listing_id"].as_str().unwrap();

    let (status, _) = app.send(Method::GET, &format!("/listings/{listing}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.send(Method::GET, "/listings", None, None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);

    let (status, body) = app
        .send(Method::POST, &format!("/listings/{listing}/offers"), Some(buyer.as_str()), Some(json!({ "amount": 4000 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "This listing is not accepting offers");

    let (_, body) = app.send(Method::GET, "/me/listings", Some(seller.as_str()), None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn accepting_an_offer_sells_the_listing() {
    let mut app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let listing = app.live_listing(&seller, &admin, "20000", "0").await;
    let uri = format!("/listings/{listing}/offers");

    let (_, winning) = app.send(Method::POST, &uri, Some(alice.as_str()), Some(json!({ "amount": 19000 }))).await;
    let (_, losing) = app.send(Method::POST, &uri, Some(bob.as_str()), Some(json!({ "amount": 15000 }))).await;
    let winning = winning["offer_id"].as_str().unwrap().to_string();
    let losing = losing["offer_id"].as_str().unwrap().to_string();

    let (_, received) = app.send(Method::GET, "/me/offers/received", Some(seller.as_str()), None).await;
    assert_eq!(received["items"].as_array().unwrap().len(), 2);

    let (status, _) = app.send(Method::POST, &format!("/offers/{winning}/accept"), Some(alice.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.drain_mail();
    let (status, body) = app.send(Method::POST, &format!("/offers/{winning}/accept"), Some(seller.as_str()), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["rejected_offer_ids"], json!([losing]));

    let mail = app.drain_mail();
    let recipients: Vec<_> = mail.iter().map(|n| n.to_email.as_str()).collect();
    assert_eq!(recipients, vec!["alice@example.com", "bob@example.com"]);

    let (_, mine) = app.send(Method::GET, "/me/offers", Some(bob.as_str()), None).await;
    assert_eq!(mine["items"][0]["status"], "rejected");
    assert_eq!(mine["items"][0]["counterparty_username"], "seller");

    let (status, _) = app.send(Method::POST, &format!("/offers/{losing}/accept"), Some(seller.as_str()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.send(Method::GET, &format!("/listings/{listing}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Method::PUT, &format!("/listings/{listing}"), Some(seller.as_str()), Some(listing_body("21000", "0")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn wishlist_toggle_is_reversible() {
    let app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;
    let listing = app.live_listing(&seller, &admin, "5000", "0").await;
    let uri = format!("/listings/{listing}/wishlist");

    let (_, body) = app.send(Method::POST, &uri, Some(buyer.as_str()), None).await;
    assert_eq!(body["wishlisted"], true);
    let (_, body) = app.send(Method::GET, "/me/wishlist", Some(buyer.as_str()), None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (_, body) = app.send(Method::POST, &uri, Some(buyer.as_str()), None).await;
    assert_eq!(body["wishlisted"], false);
    let (_, body) = app.send(Method::GET, "/me/wishlist", Some(buyer.as_str()), None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = app
        .send(Method::POST, &format!("/listings/{missing}/wishlist"), Some(buyer.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_form_errors_are_returned_together() {
    let app = TestApp::new();
    let seller = app.register("seller").await;

    let mut body = listing_body("1000", "5000");
    body["title"] = json!("abc");
    body["category_ids"] = json!([999]);

    let (status, reply) = app.send(Method::POST, "/listings", Some(seller.as_str()), Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let errors: Vec<_> = reply["errors"].as_array().unwrap().iter().filter_map(Value::as_str).collect();
    assert_eq!(
        errors,
        vec![
            "Title must be between 5 and 150 characters",
            "Reserved amount cannot exceed the asking price",
            "Unknown category ids: 999",
        ]
    );
}

#[tokio::test]
async fn auth_is_required_for_protected_routes() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/me/offers", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.send(Method::GET, "/me/offers", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = app.register("someone").await;
    let (status, _) = app.send(Method::GET, "/admin/listings", Some(user.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::POST, "/auth/login", None, Some(json!({ "username": "someone", "password": "wrong password" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Method::POST, "/auth/login", None, Some(json!({ "username": "someone", "password": "correct horse battery" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn admin_moderation_flow() {
    let mut app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;

    let (_, body) = app
        .send(Method::POST, "/listings", Some(seller.as_str()), Some(listing_body("5000", "0")))
        .await;
    let listing = body["listing_id"].as_str().unwrap().to_string();

    let (_, queue) = app.send(Method::GET, "/admin/listings", Some(admin.as_str()), None).await;
    assert_eq!(queue["items"][0]["owner_username"], "seller");

    let (status, _) = app
        .send(Method::POST, &format!("/admin/listings/{listing}/reject"), Some(admin.as_str()), Some(json!({ "reason": " " })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    app.drain_mail();
    let (status, _) = app
        .send(Method::POST, &format!("/admin/listings/{listing}/reject"), Some(admin.as_str()), Some(json!({ "reason": "Add traffic proof" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let mail = app.drain_mail();
    assert!(matches!(&mail[0].event, MarketEvent::ListingModerated { approved: false, .. }));

    let (status, _) = app
        .send(Method::POST, &format!("/admin/listings/{listing}/approve"), Some(admin.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(Method::POST, "/admin/categories", Some(admin.as_str()), Some(json!({ "name": "Newsletters" })))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let (status, _) = app
        .send(Method::POST, "/admin/categories", Some(admin.as_str()), Some(json!({ "name": "Newsletters" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, catalog) = app.send(Method::GET, "/catalog", None, None).await;
    assert!(catalog["categories"].as_array().unwrap().iter().any(|c| c["name"] == "Newsletters"));
}

#[tokio::test]
async fn proofs_are_owner_only_and_image_only() {
    let app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;
    let other = app.register("other").await;
    let listing = app.live_listing(&seller, &admin, "5000", "0").await;
    let uri = format!("/listings/{listing}/proofs");
    let proof = json!({ "file_name": "analytics.png", "mime_type": "image/png", "size_bytes": 20480 });

    let (status, _) = app.send(Method::POST, &uri, Some(other.as_str()), Some(proof.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::POST, &uri, Some(seller.as_str()), Some(json!({ "file_name": "report.pdf", "mime_type": "application/pdf", "size_bytes": 100 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.send(Method::POST, &uri, Some(seller.as_str()), Some(proof)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, detail) = app.send(Method::GET, &format!("/listings/{listing}"), None, None).await;
    assert_eq!(detail["proofs"][0]["file_name"], "analytics.png");
}

fn auction_body(ends_in: Duration, auto_extend: bool) -> Value {
    let mut body = listing_body("10000", "0");
    body["auto_extend_enabled"] = json!(auto_extend);
    body["auction_end_time"] = json!((Utc::now() + ends_in).to_rfc3339());
    body
}

fn timestamp(value: &Value) -> DateTime<Utc> {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn offers_are_refused_once_the_auction_has_ended() {
    let app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;
    let listing = app
        .live_listing_from(&seller, &admin, auction_body(Duration::hours(2), true))
        .await;

    app.state
        .db
        .set_auction_end_time(&listing, Utc::now() - Duration::minutes(1))
        .unwrap();

    let (status, body) = app
        .send(Method::POST, &format!("/listings/{listing}/offers"), Some(buyer.as_str()), Some(json!({ "amount": 9000 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "The auction for this listing has ended");
}

#[tokio::test]
async fn expired_listings_are_hidden_and_refuse_offers() {
    let app = TestApp::new();
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;

    let (_, body) = app
        .send(Method::POST, "/listings", Some(seller.as_str()), Some(listing_body("5000", "0")))
        .await;
    let listing = body["listing_id"].as_str().unwrap().to_string();
    let approved_at = Utc::now() - Duration::days(91);
    assert!(app
        .state
        .db
        .approve_listing(&listing, approved_at, approved_at + Duration::days(90))
        .unwrap());

    let (status, _) = app.send(Method::GET, &format!("/listings/{listing}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, browse) = app.send(Method::GET, "/listings", None, None).await;
    assert!(browse["items"].as_array().unwrap().is_empty());

    let (status, body) = app
        .send(Method::POST, &format!("/listings/{listing}/offers"), Some(buyer.as_str()), Some(json!({ "amount": 4000 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "This listing is not accepting offers");
}

#[tokio::test]
async fn late_offer_extends_the_auction() {
    let app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;
    let listing = app
        .live_listing_from(&seller, &admin, auction_body(Duration::hours(2), true))
        .await;
    app.state
        .db
        .set_auction_end_time(&listing, Utc::now() + Duration::minutes(3))
        .unwrap();

    let before = Utc::now();
    let (status, body) = app
        .send(Method::POST, &format!("/listings/{listing}/offers"), Some(buyer.as_str()), Some(json!({ "amount": 9000 })))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let extended = timestamp(&body["auction_end_time"]);
    assert!(extended >= before + Duration::minutes(10));
    assert!(extended <= Utc::now() + Duration::minutes(10));

    let (_, detail) = app.send(Method::GET, &format!("/listings/{listing}"), None, None).await;
    let stored = timestamp(&detail["auction_end_time"]);
    assert!((stored - extended).num_milliseconds().abs() < 1);
}

#[tokio::test]
async fn early_offer_leaves_the_auction_end_alone() {
    let app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;
    let listing = app
        .live_listing_from(&seller, &admin, auction_body(Duration::hours(2), true))
        .await;

    let (_, detail) = app.send(Method::GET, &format!("/listings/{listing}"), None, None).await;
    let scheduled = timestamp(&detail["auction_end_time"]);

    let (status, body) = app
        .send(Method::POST, &format!("/listings/{listing}/offers"), Some(buyer.as_str()), Some(json!({ "amount": 9000 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(timestamp(&body["auction_end_time"]), scheduled);
}

#[tokio::test]
async fn very_large_asking_price_is_served_without_overflow() {
    let app = TestApp::new();
    let admin = app.register("admin").await;
    let seller = app.register("seller").await;
    let buyer = app.register("buyer").await;
    let listing = app
        .live_listing(&seller, &admin, "70000000000000000000000000000", "0")
        .await;

    let (status, detail) = app.send(Method::GET, &format!("/listings/{listing}"), None, None).await;
    assert_eq!(status, StatusCode::OK, "{detail}");
    assert!(detail["minimum_offer"].is_string());

    let (status, body) = app
        .send(Method::POST, &format!("/listings/{listing}/offers"), Some(buyer.as_str()), Some(json!({ "amount": 1000 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().starts_with("Offer must be at least 70% of the asking price"));
}

#[tokio::test]
async fn malformed_input_gets_the_standard_error_body() {
    let app = TestApp::new();
    let seller = app.register("seller").await;

    let mut form = listing_body("1000", "0");
    form["asking_price"] = json!("abc");
    let (status, body) = app.send(Method::POST, "/listings", Some(seller.as_str()), Some(form)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert!(body["errors"][0].as_str().unwrap().contains("asking_price"));

    let (status, body) = app
        .send_raw(Method::POST, "/auth/login", None, Some("{\"username\": ".to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.send(Method::GET, "/listings/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.send(Method::GET, "/listings?min_price=cheap", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let app = TestApp::new();
    app.register("dana").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "dana", "email": "other@example.com", "password": "another password" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Username is already taken");
}
