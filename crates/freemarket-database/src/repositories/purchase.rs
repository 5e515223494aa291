//! Purchase repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use freemarket_core::result::AppResult;
use freemarket_core::types::{ItemId, PurchaseId, UserId};
use freemarket_entity::purchase::{
    NewPurchase, Purchase, PurchaseRecord, PurchasedItem, Purchaser,
};

use super::db_err;

const RECORD_SELECT: &str = "SELECT p.id, p.user_id, p.item_id, p.price, p.quantity, \
     p.total_price, p.created_at, p.updated_at, \
     i.name AS item_name, i.price AS item_price, \
     i.description AS item_description, i.quantity AS item_quantity \
     FROM purchases p JOIN items i ON i.id = p.item_id";

/// Flat row of a purchase joined with its item.
#[derive(Debug, FromRow)]
struct PurchaseRecordRow {
    id: PurchaseId,
    user_id: UserId,
    item_id: ItemId,
    price: i64,
    quantity: i64,
    total_price: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    item_name: String,
    item_price: i64,
    item_description: String,
    item_quantity: i64,
}

impl From<PurchaseRecordRow> for PurchaseRecord {
    fn from(row: PurchaseRecordRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            item_id: row.item_id,
            price: row.price,
            quantity: row.quantity,
            total_price: row.total_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: Purchaser { id: row.user_id },
            item: PurchasedItem {
                id: row.item_id,
                name: row.item_name,
                price: row.item_price,
                description: row.item_description,
                quantity: row.item_quantity,
            },
        }
    }
}

/// Repository for purchase records.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    /// Create a new purchase repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a purchase row.
    pub async fn insert(conn: &mut PgConnection, data: &NewPurchase) -> AppResult<Purchase> {
        sqlx::query_as::<_, Purchase>(
            "INSERT INTO purchases (user_id, item_id, price, quantity, total_price) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.item_id)
        .bind(data.price)
        .bind(data.quantity)
        .bind(data.total_price)
        .fetch_one(conn)
        .await
        .map_err(|e| db_err("Failed to create purchase", e))
    }

    /// Read one of `user_id`'s purchases with its item, on the given connection.
    pub async fn find_record_in(
        conn: &mut PgConnection,
        user_id: UserId,
        id: PurchaseId,
    ) -> AppResult<Option<PurchaseRecord>> {
        let sql = format!("{RECORD_SELECT} WHERE p.id = $1 AND p.user_id = $2");
        let row = sqlx::query_as::<_, PurchaseRecordRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(conn)
            .await
            .map_err(|e| db_err("Failed to read purchase", e))?;
        Ok(row.map(PurchaseRecord::from))
    }

    /// Read one of `user_id`'s purchases with its item.
    pub async fn find_record(
        &self,
        user_id: UserId,
        id: PurchaseId,
    ) -> AppResult<Option<PurchaseRecord>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| db_err("Failed to acquire connection", e))?;
        Self::find_record_in(&mut conn, user_id, id).await
    }

    /// List `user_id`'s purchases, newest first.
    pub async fn list_records(&self, user_id: UserId) -> AppResult<Vec<PurchaseRecord>> {
        let sql = format!("{RECORD_SELECT} WHERE p.user_id = $1 ORDER BY p.created_at DESC, p.id DESC");
        let rows = sqlx::query_as::<_, PurchaseRecordRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("Failed to list purchases", e))?;
        Ok(rows.into_iter().map(PurchaseRecord::from).collect())
    }

    /// Count every purchase of an item.
    pub async fn count_for_item(&self, item_id: ItemId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM purchases WHERE item_id = $1")
            .bind(item_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_err("Failed to count purchases", e))
    }
}
