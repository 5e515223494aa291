//! Item repository implementation.
//!
//! The exclusive row lock taken by [`ItemRepository::lock_for_update`] is
//! what serializes concurrent purchases of the same item.

use sqlx::{PgConnection, PgPool};

use freemarket_core::result::AppResult;
use freemarket_core::types::{ItemId, UserId};
use freemarket_entity::item::{CreateItem, Item};

use super::db_err;

/// Repository for item records.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: PgPool,
}

impl ItemRepository {
    /// Create a new item repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a live (not soft-deleted) item by ID without locking.
    pub async fn find_by_id(&self, id: ItemId) -> AppResult<Option<Item>> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("Failed to find item", e))
    }

    /// Read a live item and hold an exclusive lock on its row until the
    /// surrounding transaction ends.
    pub async fn lock_for_update(conn: &mut PgConnection, id: ItemId) -> AppResult<Option<Item>> {
        sqlx::query_as::<_, Item>(
            "SELECT * FROM items WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| db_err("Failed to lock item", e))
    }

    /// Insert a new item owned by `owner_id`.
    pub async fn insert(
        conn: &mut PgConnection,
        owner_id: UserId,
        data: &CreateItem,
    ) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(
            "INSERT INTO items (name, price, description, quantity, user_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&data.name)
        .bind(data.price)
        .bind(&data.description)
        .bind(data.quantity)
        .bind(owner_id)
        .fetch_one(conn)
        .await
        .map_err(|e| db_err("Failed to create item", e))
    }

    /// Write back every mutable column of an item.
    pub async fn write_back(conn: &mut PgConnection, item: &Item) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE items SET name = $2, price = $3, description = $4, sold_out = $5, \
             quantity = $6, deleted_at = $7, updated_at = NOW() WHERE id = $1",
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.price)
        .bind(&item.description)
        .bind(item.sold_out)
        .bind(item.quantity)
        .bind(item.deleted_at)
        .execute(conn)
        .await
        .map_err(|e| db_err("Failed to update item", e))?;
        Ok(result.rows_affected())
    }
}
