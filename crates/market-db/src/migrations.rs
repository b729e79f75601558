use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'user',
                created_at  TEXT NOT NULL
            );

            CREATE TABLE listings (
                id                          TEXT PRIMARY KEY,
                owner_id                    TEXT NOT NULL REFERENCES users(id),
                listing_type                TEXT NOT NULL,
                title                       TEXT NOT NULL,
                url                         TEXT NOT NULL,
                description                 TEXT NOT NULL DEFAULT '',
                monthly_revenue             TEXT NOT NULL,
                asking_price                TEXT NOT NULL,
                reserved_amount             TEXT NOT NULL DEFAULT '0',
                min_down_payment_percentage INTEGER NOT NULL DEFAULT 0,
                buy_now_price               TEXT,
                auto_extend_enabled         INTEGER NOT NULL DEFAULT 0,
                auction_end_time            TEXT,
                status                      TEXT NOT NULL DEFAULT 'pending',
                rejection_reason            TEXT,
                created_at                  TEXT NOT NULL,
                updated_at                  TEXT NOT NULL,
                approved_at                 TEXT,
                expires_at                  TEXT
            );

            CREATE INDEX idx_listings_status ON listings(status, created_at);
            CREATE INDEX idx_listings_owner ON listings(owner_id);

            CREATE TABLE categories (
                id    INTEGER PRIMARY KEY AUTOINCREMENT,
                name  TEXT NOT NULL UNIQUE
            );

            CREATE TABLE labels (
                id    INTEGER PRIMARY KEY AUTOINCREMENT,
                name  TEXT NOT NULL UNIQUE
            );

            CREATE TABLE listing_categories (
                listing_id   TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                category_id  INTEGER NOT NULL REFERENCES categories(id),
                PRIMARY KEY (listing_id, category_id)
            );

            CREATE TABLE listing_labels (
                listing_id  TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                label_id    INTEGER NOT NULL REFERENCES labels(id),
                PRIMARY KEY (listing_id, label_id)
            );

            CREATE TABLE listing_proofs (
                id          TEXT PRIMARY KEY,
                listing_id  TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                file_name   TEXT NOT NULL,
                mime_type   TEXT NOT NULL,
                size_bytes  INTEGER NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE listing_answers (
                listing_id  TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                question    TEXT NOT NULL,
                answer      TEXT NOT NULL,
                PRIMARY KEY (listing_id, position)
            );

            CREATE TABLE offers (
                id            TEXT PRIMARY KEY,
                listing_id    TEXT NOT NULL REFERENCES listings(id),
                buyer_id      TEXT NOT NULL REFERENCES users(id),
                seller_id     TEXT NOT NULL REFERENCES users(id),
                amount        TEXT NOT NULL,
                message       TEXT,
                status        TEXT NOT NULL DEFAULT 'pending',
                created_at    TEXT NOT NULL,
                responded_at  TEXT
            );

            CREATE INDEX idx_offers_listing ON offers(listing_id, status);
            CREATE INDEX idx_offers_buyer ON offers(buyer_id);
            CREATE INDEX idx_offers_seller ON offers(seller_id);

            CREATE TABLE wishlist (
                user_id     TEXT NOT NULL REFERENCES users(id),
                listing_id  TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (user_id, listing_id)
            );

            CREATE TABLE system_settings (
                key    TEXT PRIMARY KEY,
                value  TEXT NOT NULL
            );

            INSERT INTO system_settings (key, value) VALUES ('min_offer_percentage', '70');

            -- Seed lookups shown on the submission forms
            INSERT INTO categories (name) VALUES
                ('Blog'), ('E-commerce'), ('SaaS'), ('Gaming'), ('Education'), ('Entertainment');
            INSERT INTO labels (name) VALUES
                ('Monetized'), ('Verified Revenue'), ('Featured'), ('Urgent Sale');

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
