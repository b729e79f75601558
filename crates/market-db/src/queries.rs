use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::warn;

use market_types::models::{Category, DEFAULT_MIN_OFFER_PERCENTAGE, Label};

use crate::models::{LISTING_COLUMNS, ListingRow, UserRow};
use crate::{Database, OptionalExt, format_ts};

const MIN_OFFER_PERCENTAGE_KEY: &str = "min_offer_percentage";

impl Database {
    // -- Users --

    /// Returns `false` if the username is already taken.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, email, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(username) DO NOTHING",
                (id, username, email, password_hash, role, format_ts(Utc::now())),
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Categories & labels --

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| Ok(Category { id: row.get(0)?, name: row.get(1)? }))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_labels(&self) -> Result<Vec<Label>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM labels ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| Ok(Label { id: row.get(0)?, name: row.get(1)? }))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns the new id, or `None` if the name is already taken.
    pub fn create_category(&self, name: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| insert_lookup(conn, "categories", name))
    }

    pub fn create_label(&self, name: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| insert_lookup(conn, "labels", name))
    }

    /// Ids from `ids` that have no row in `categories`.
    pub fn missing_category_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        self.with_conn(|conn| missing_ids(conn, "categories", ids))
    }

    pub fn missing_label_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        self.with_conn(|conn| missing_ids(conn, "labels", ids))
    }

    // -- Settings --

    /// Falls back to the default if the row is missing or unreadable.
    pub fn get_min_offer_percentage(&self) -> Result<u8> {
        self.with_conn(|conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT value FROM system_settings WHERE key = ?1",
                    [MIN_OFFER_PERCENTAGE_KEY],
                    |row| row.get(0),
                )
                .optional()?;

            let value = match raw {
                Some(raw) => match raw.trim().parse::<u8>() {
                    Ok(v) if (1..=100).contains(&v) => v,
                    _ => {
                        warn!("Invalid min_offer_percentage setting '{}', using default", raw);
                        DEFAULT_MIN_OFFER_PERCENTAGE
                    }
                },
                None => DEFAULT_MIN_OFFER_PERCENTAGE,
            };
            Ok(value)
        })
    }

    pub fn set_min_offer_percentage(&self, value: u8) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO system_settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (MIN_OFFER_PERCENTAGE_KEY, value.to_string()),
            )?;
            Ok(())
        })
    }

    // -- Wishlist --

    /// Toggle wishlist membership: removes if present, inserts if not.
    /// Returns true when the listing is now on the wishlist.
    pub fn toggle_wishlist(&self, user_id: &str, listing_id: &str, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM wishlist WHERE user_id = ?1 AND listing_id = ?2",
                (user_id, listing_id),
            )?;

            if removed > 0 {
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO wishlist (user_id, listing_id, created_at) VALUES (?1, ?2, ?3)",
                    (user_id, listing_id, format_ts(now)),
                )?;
                Ok(true)
            }
        })
    }

    pub fn is_wishlisted(&self, user_id: &str, listing_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM wishlist WHERE user_id = ?1 AND listing_id = ?2",
                    (user_id, listing_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Wishlisted listings, most recently added first, whatever their status.
    pub fn wishlist_for_user(&self, user_id: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {LISTING_COLUMNS}
                 FROM wishlist w
                 JOIN listings l ON l.id = w.listing_id
                 JOIN users u ON u.id = l.owner_id
                 WHERE w.user_id = ?1
                 ORDER BY w.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], ListingRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, password, role, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn insert_lookup(conn: &Connection, table: &str, name: &str) -> Result<Option<i64>> {
    let inserted = conn.execute(
        &format!("INSERT OR IGNORE INTO {} (name) VALUES (?1)", table),
        [name],
    )?;
    Ok((inserted > 0).then(|| conn.last_insert_rowid()))
}

fn missing_ids(conn: &Connection, table: &str, ids: &[i64]) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!("SELECT 1 FROM {} WHERE id = ?1", table))?;
    let mut missing = Vec::new();
    for id in ids {
        if !stmt.exists([id])? {
            missing.push(*id);
        }
    }
    Ok(missing)
}
