use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::models::OfferRow;
use crate::{Database, OptionalExt, format_ts};

pub struct NewOffer<'a> {
    pub id: &'a str,
    pub listing_id: &'a str,
    pub buyer_id: &'a str,
    pub seller_id: &'a str,
    pub amount: String,
    pub message: Option<&'a str>,
    pub now: DateTime<Utc>,
}

impl Database {
    pub fn insert_offer(&self, offer: &NewOffer<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO offers (id, listing_id, buyer_id, seller_id, amount, message, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
                params![
                    offer.id,
                    offer.listing_id,
                    offer.buyer_id,
                    offer.seller_id,
                    offer.amount,
                    offer.message,
                    format_ts(offer.now),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_offer(&self, id: &str) -> Result<Option<OfferRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, listing_id, buyer_id, seller_id, amount, message, status, created_at, responded_at
                 FROM offers WHERE id = ?1",
                [id],
                |row| plain_offer(row),
            )
            .optional()
        })
    }

    /// Offers the user made, with the listing title and the seller's username.
    pub fn offers_by_buyer(&self, buyer_id: &str) -> Result<Vec<OfferRow>> {
        self.with_conn(|conn| query_joined(conn, "o.buyer_id", "o.seller_id", buyer_id))
    }

    /// Offers on the user's listings, with the listing title and the buyer's username.
    pub fn offers_for_seller(&self, seller_id: &str) -> Result<Vec<OfferRow>> {
        self.with_conn(|conn| query_joined(conn, "o.seller_id", "o.buyer_id", seller_id))
    }

    /// Accepts a pending offer, marks its listing sold and rejects every other
    /// pending offer on that listing. Returns the ids of the offers rejected
    /// along the way, or `None` if the offer was not pending or the listing
    /// was no longer approved.
    pub fn accept_offer(&self, offer_id: &str, now: DateTime<Utc>) -> Result<Option<Vec<String>>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = format_ts(now);

            let listing_id: Option<String> = tx
                .query_row(
                    "SELECT listing_id FROM offers WHERE id = ?1 AND status = 'pending'",
                    [offer_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(listing_id) = listing_id else {
                return Ok(None);
            };

            let sold = tx.execute(
                "UPDATE listings SET status = 'sold', updated_at = ?2
                 WHERE id = ?1 AND status = 'approved'",
                params![listing_id, now],
            )?;
            if sold == 0 {
                return Ok(None);
            }

            tx.execute(
                "UPDATE offers SET status = 'accepted', responded_at = ?2 WHERE id = ?1",
                params![offer_id, now],
            )?;

            let others = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM offers WHERE listing_id = ?1 AND status = 'pending' AND id != ?2",
                )?;
                stmt.query_map(params![listing_id, offer_id], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };
            tx.execute(
                "UPDATE offers SET status = 'rejected', responded_at = ?3
                 WHERE listing_id = ?1 AND status = 'pending' AND id != ?2",
                params![listing_id, offer_id, now],
            )?;

            tx.commit()?;
            Ok(Some(others))
        })
    }

    /// Pending -> rejected. Returns false if the offer was not pending.
    pub fn reject_offer(&self, offer_id: &str, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE offers SET status = 'rejected', responded_at = ?2
                 WHERE id = ?1 AND status = 'pending'",
                params![offer_id, format_ts(now)],
            )?;
            Ok(updated > 0)
        })
    }

    /// Closes pending offers on listings whose `expires_at` has passed.
    pub fn reject_offers_on_expired_listings(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let now = format_ts(now);
            let updated = conn.execute(
                "UPDATE offers SET status = 'rejected', responded_at = ?1
                 WHERE status = 'pending'
                   AND listing_id IN (
                       SELECT id FROM listings
                       WHERE expires_at IS NOT NULL AND expires_at <= ?1
                   )",
                [now],
            )?;
            Ok(updated)
        })
    }
}

fn plain_offer(row: &rusqlite::Row<'_>) -> rusqlite::Result<OfferRow> {
    Ok(OfferRow {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        buyer_id: row.get(2)?,
        seller_id: row.get(3)?,
        amount: row.get(4)?,
        message: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        responded_at: row.get(8)?,
        listing_title: None,
        counterparty_username: None,
    })
}

fn query_joined(
    conn: &Connection,
    owner_column: &str,
    counterparty_column: &str,
    user_id: &str,
) -> Result<Vec<OfferRow>> {
    let sql = format!(
        "SELECT o.id, o.listing_id, o.buyer_id, o.seller_id, o.amount, o.message, o.status,
                o.created_at, o.responded_at, l.title, u.username
         FROM offers o
         JOIN listings l ON l.id = o.listing_id
         LEFT JOIN users u ON u.id = {counterparty_column}
         WHERE {owner_column} = ?1
         ORDER BY o.created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(OfferRow {
                listing_title: row.get(9)?,
                counterparty_username: row.get(10)?,
                ..plain_offer(row)?
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
