use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, Transaction, params, params_from_iter};

use market_types::api::{ListingForm, ListingQuery};
use market_types::models::{Category, Label, ListingAnswer, ListingStatus};

use crate::models::{LISTING_COLUMNS, ListingRow, ProofRow};
use crate::{Database, OptionalExt, format_ts};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

pub struct NewListing<'a> {
    pub id: &'a str,
    pub owner_id: &'a str,
    pub form: &'a ListingForm,
    pub now: DateTime<Utc>,
}

pub struct NewProof<'a> {
    pub id: &'a str,
    pub listing_id: &'a str,
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub size_bytes: u64,
    pub now: DateTime<Utc>,
}

impl Database {
    /// Inserts the listing with its categories, labels and answers in one transaction.
    pub fn insert_listing(&self, new: &NewListing<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let form = new.form;
            let terms = form.bidding_terms();
            let now = format_ts(new.now);

            tx.execute(
                "INSERT INTO listings (
                    id, owner_id, listing_type, title, url, description, monthly_revenue,
                    asking_price, reserved_amount, min_down_payment_percentage, buy_now_price,
                    auto_extend_enabled, auction_end_time, status, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
                params![
                    new.id,
                    new.owner_id,
                    form.listing_type.as_str(),
                    form.title.trim(),
                    form.url.trim(),
                    form.description.trim(),
                    form.monthly_revenue.to_string(),
                    form.asking_price.to_string(),
                    terms.reserved_amount.to_string(),
                    terms.min_down_payment_percentage,
                    terms.buy_now_price.map(|p| p.to_string()),
                    terms.auto_extend_enabled,
                    terms.auction_end_time.map(format_ts),
                    ListingStatus::Pending.as_str(),
                    now,
                ],
            )?;

            write_associations(&tx, new.id, form)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Applies an owner edit. The listing goes back to review; sold listings
    /// are left untouched and `false` is returned.
    pub fn update_listing(&self, id: &str, form: &ListingForm, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let terms = form.bidding_terms();

            let updated = tx.execute(
                "UPDATE listings SET
                    listing_type = ?2, title = ?3, url = ?4, description = ?5,
                    monthly_revenue = ?6, asking_price = ?7, reserved_amount = ?8,
                    min_down_payment_percentage = ?9, buy_now_price = ?10,
                    auto_extend_enabled = ?11, auction_end_time = ?12,
                    status = 'pending', rejection_reason = NULL, approved_at = NULL,
                    expires_at = NULL, updated_at = ?13
                 WHERE id = ?1 AND status != 'sold'",
                params![
                    id,
                    form.listing_type.as_str(),
                    form.title.trim(),
                    form.url.trim(),
                    form.description.trim(),
                    form.monthly_revenue.to_string(),
                    form.asking_price.to_string(),
                    terms.reserved_amount.to_string(),
                    terms.min_down_payment_percentage,
                    terms.buy_now_price.map(|p| p.to_string()),
                    terms.auto_extend_enabled,
                    terms.auction_end_time.map(format_ts),
                    format_ts(now),
                ],
            )?;

            if updated == 0 {
                return Ok(false);
            }

            tx.execute("DELETE FROM listing_categories WHERE listing_id = ?1", [id])?;
            tx.execute("DELETE FROM listing_labels WHERE listing_id = ?1", [id])?;
            tx.execute("DELETE FROM listing_answers WHERE listing_id = ?1", [id])?;
            write_associations(&tx, id, form)?;

            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_listing(&self, id: &str) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {LISTING_COLUMNS} FROM listings l JOIN users u ON u.id = l.owner_id WHERE l.id = ?1"
            );
            let row = conn.query_row(&sql, [id], ListingRow::from_row).optional()?;
            Ok(row)
        })
    }

    /// Approved, unexpired listings matching the browse filters, newest first.
    pub fn search_listings(&self, query: &ListingQuery, now: DateTime<Utc>) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {LISTING_COLUMNS} FROM listings l JOIN users u ON u.id = l.owner_id
                 WHERE l.status = 'approved' AND (l.expires_at IS NULL OR l.expires_at > ?1)"
            );
            let mut args: Vec<Value> = vec![Value::Text(format_ts(now))];

            if let Some(listing_type) = query.listing_type {
                args.push(Value::Text(listing_type.as_str().to_string()));
                sql.push_str(&format!(" AND l.listing_type = ?{}", args.len()));
            }
            if let Some(category) = query.category {
                args.push(Value::Integer(category));
                sql.push_str(&format!(
                    " AND EXISTS (SELECT 1 FROM listing_categories lc WHERE lc.listing_id = l.id AND lc.category_id = ?{})",
                    args.len()
                ));
            }
            if let Some(label) = query.label {
                args.push(Value::Integer(label));
                sql.push_str(&format!(
                    " AND EXISTS (SELECT 1 FROM listing_labels ll WHERE ll.listing_id = l.id AND ll.label_id = ?{})",
                    args.len()
                ));
            }
            if let Some(min) = query.min_price {
                args.push(Value::Text(min.to_string()));
                sql.push_str(&format!(" AND CAST(l.asking_price AS REAL) >= CAST(?{} AS REAL)", args.len()));
            }
            if let Some(max) = query.max_price {
                args.push(Value::Text(max.to_string()));
                sql.push_str(&format!(" AND CAST(l.asking_price AS REAL) <= CAST(?{} AS REAL)", args.len()));
            }
            if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                args.push(Value::Text(format!("%{}%", escape_like(search))));
                let n = args.len();
                sql.push_str(&format!(
                    " AND (l.title LIKE ?{n} ESCAPE '\\' OR l.description LIKE ?{n} ESCAPE '\\')"
                ));
            }

            let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
            args.push(Value::Integer(i64::from(limit)));
            args.push(Value::Integer(i64::from(query.offset.unwrap_or(0))));
            sql.push_str(&format!(
                " ORDER BY l.created_at DESC LIMIT ?{} OFFSET ?{}",
                args.len() - 1,
                args.len()
            ));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(args), ListingRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn listings_by_owner(&self, owner_id: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {LISTING_COLUMNS} FROM listings l JOIN users u ON u.id = l.owner_id
                 WHERE l.owner_id = ?1 ORDER BY l.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], ListingRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Moderation queue; oldest first so reviews happen in submission order.
    pub fn listings_by_status(&self, status: ListingStatus) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {LISTING_COLUMNS} FROM listings l JOIN users u ON u.id = l.owner_id
                 WHERE l.status = ?1 ORDER BY l.created_at ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([status.as_str()], ListingRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn listing_categories(&self, listing_id: &str) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name FROM listing_categories lc
                 JOIN categories c ON c.id = lc.category_id
                 WHERE lc.listing_id = ?1 ORDER BY c.name",
            )?;
            let rows = stmt
                .query_map([listing_id], |row| Ok(Category { id: row.get(0)?, name: row.get(1)? }))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn listing_labels(&self, listing_id: &str) -> Result<Vec<Label>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT lb.id, lb.name FROM listing_labels ll
                 JOIN labels lb ON lb.id = ll.label_id
                 WHERE ll.listing_id = ?1 ORDER BY lb.name",
            )?;
            let rows = stmt
                .query_map([listing_id], |row| Ok(Label { id: row.get(0)?, name: row.get(1)? }))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn listing_answers(&self, listing_id: &str) -> Result<Vec<ListingAnswer>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT question, answer FROM listing_answers WHERE listing_id = ?1 ORDER BY position",
            )?;
            let rows = stmt
                .query_map([listing_id], |row| {
                    Ok(ListingAnswer { question: row.get(0)?, answer: row.get(1)? })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_proof(&self, proof: &NewProof<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO listing_proofs (id, listing_id, file_name, mime_type, size_bytes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    proof.id,
                    proof.listing_id,
                    proof.file_name,
                    proof.mime_type,
                    proof.size_bytes as i64,
                    format_ts(proof.now),
                ],
            )?;
            Ok(())
        })
    }

    pub fn listing_proofs(&self, listing_id: &str) -> Result<Vec<ProofRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, listing_id, file_name, mime_type, size_bytes, created_at
                 FROM listing_proofs WHERE listing_id = ?1 ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([listing_id], |row| {
                    Ok(ProofRow {
                        id: row.get(0)?,
                        listing_id: row.get(1)?,
                        file_name: row.get(2)?,
                        mime_type: row.get(3)?,
                        size_bytes: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Moderation --

    /// Pending -> approved. Returns false if the listing was not pending.
    pub fn approve_listing(&self, id: &str, now: DateTime<Utc>, expires_at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let now = format_ts(now);
            let updated = conn.execute(
                "UPDATE listings SET status = 'approved', rejection_reason = NULL,
                    approved_at = ?2, expires_at = ?3, updated_at = ?2
                 WHERE id = ?1 AND status = 'pending'",
                params![id, now, format_ts(expires_at)],
            )?;
            Ok(updated > 0)
        })
    }

    /// Pending -> rejected. Returns false if the listing was not pending.
    pub fn reject_listing(&self, id: &str, reason: &str, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE listings SET status = 'rejected', rejection_reason = ?2, updated_at = ?3
                 WHERE id = ?1 AND status = 'pending'",
                params![id, reason, format_ts(now)],
            )?;
            Ok(updated > 0)
        })
    }

    pub fn set_auction_end_time(&self, id: &str, end: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE listings SET auction_end_time = ?2 WHERE id = ?1",
                params![id, format_ts(end)],
            )?;
            Ok(())
        })
    }
}

fn write_associations(tx: &Transaction<'_>, listing_id: &str, form: &ListingForm) -> Result<()> {
    insert_pairs(tx, "INSERT OR IGNORE INTO listing_categories (listing_id, category_id) VALUES (?1, ?2)", listing_id, &form.category_ids)?;
    insert_pairs(tx, "INSERT OR IGNORE INTO listing_labels (listing_id, label_id) VALUES (?1, ?2)", listing_id, &form.label_ids)?;

    let mut stmt = tx.prepare(
        "INSERT INTO listing_answers (listing_id, position, question, answer) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, answer) in form.answers.iter().enumerate() {
        stmt.execute(params![
            listing_id,
            position as i64,
            answer.question.trim(),
            answer.answer.trim()
        ])?;
    }
    Ok(())
}

fn insert_pairs(conn: &Connection, sql: &str, listing_id: &str, ids: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    for id in ids {
        stmt.execute(params![listing_id, id])?;
    }
    Ok(())
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
