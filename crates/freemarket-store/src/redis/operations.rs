//! Redis capacity store implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use freemarket_core::error::{AppError, ErrorKind};
use freemarket_core::result::AppResult;
use freemarket_core::traits::capacity_store::{AdmitOutcome, AdmitRequest, CapacityStore};

use super::client::RedisClient;
use super::scripts::{ADMIT_SCRIPT, REAP_SCRIPT};

/// Redis-backed capacity store for multi-node deployments.
#[derive(Debug, Clone)]
pub struct RedisCapacityStore {
    /// Redis client.
    client: RedisClient,
    /// Pre-hashed admission script (EVALSHA with EVAL fallback).
    admit_script: redis::Script,
    /// Pre-hashed conditional reap script.
    reap_script: redis::Script,
}

impl RedisCapacityStore {
    /// Create a new Redis capacity store.
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            admit_script: redis::Script::new(ADMIT_SCRIPT),
            reap_script: redis::Script::new(REAP_SCRIPT),
        }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::StoreUnavailable, format!("Redis error: {e}"), e)
    }
}

/// Clamp a TTL to at least one millisecond; `PX 0` is rejected by Redis.
fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl CapacityStore for RedisCapacityStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.conn_mut();
        redis::cmd("GET")
            .arg(self.client.prefixed_key(key))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.client.prefixed_key(key)).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.client.prefixed_key(key)).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        cmd.arg("NX");

        let result: Option<String> = cmd.query_async(&mut conn).await.map_err(Self::map_err)?;
        Ok(result.is_some())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let count: i64 = redis::cmd("EXISTS")
            .arg(self.client.prefixed_key(key))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(count > 0)
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let removed: i64 = redis::cmd("DEL")
            .arg(self.client.prefixed_key(key))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(removed > 0)
    }

    async fn hash_set(&self, hash_key: &str, field: &str, value: &str) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        let _: i64 = redis::cmd("HSET")
            .arg(self.client.prefixed_key(hash_key))
            .arg(field)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn hash_exists(&self, hash_key: &str, field: &str) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let found: i64 = redis::cmd("HEXISTS")
            .arg(self.client.prefixed_key(hash_key))
            .arg(field)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(found == 1)
    }

    async fn hash_delete(&self, hash_key: &str, field: &str) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let removed: i64 = redis::cmd("HDEL")
            .arg(self.client.prefixed_key(hash_key))
            .arg(field)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(removed > 0)
    }

    async fn hash_len(&self, hash_key: &str) -> AppResult<u64> {
        let mut conn = self.client.conn_mut();
        redis::cmd("HLEN")
            .arg(self.client.prefixed_key(hash_key))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)
    }

    async fn hash_keys(&self, hash_key: &str) -> AppResult<Vec<String>> {
        let mut conn = self.client.conn_mut();
        redis::cmd("HKEYS")
            .arg(self.client.prefixed_key(hash_key))
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)
    }

    async fn admit(&self, request: &AdmitRequest<'_>) -> AppResult<AdmitOutcome> {
        let mut conn = self.client.conn_mut();

        let reply: Vec<i64> = self
            .admit_script
            .key(self.client.prefixed_key(request.registry_key))
            .key(self.client.prefixed_key(request.limit_key))
            .key(self.client.prefixed_key(request.marker_key))
            .arg(request.token)
            .arg(request.default_limit)
            .arg(ttl_millis(request.ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                if e.to_string().contains("invalid session limit") {
                    AppError::with_source(
                        ErrorKind::Configuration,
                        format!("Stored session limit is invalid: {e}"),
                        e,
                    )
                } else {
                    Self::map_err(e)
                }
            })?;

        let &[code, size, limit] = reply.as_slice() else {
            error!(?reply, "Unexpected admission script reply shape");
            return Err(AppError::internal(format!(
                "Unexpected admission reply: {reply:?}"
            )));
        };

        debug!(code, size, limit, "Admission script evaluated");

        match code {
            1 => Ok(AdmitOutcome::Admitted { size: size as u64 }),
            -1 => Ok(AdmitOutcome::Refreshed),
            0 => Ok(AdmitOutcome::Denied {
                size: size as u64,
                limit: limit as u64,
            }),
            other => {
                error!(result = other, "Unexpected Lua script result");
                Err(AppError::internal(format!(
                    "Unexpected admission result: {other}"
                )))
            }
        }
    }

    async fn reap(&self, hash_key: &str, field: &str, marker_key: &str) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let removed: i64 = self
            .reap_script
            .key(self.client.prefixed_key(hash_key))
            .key(self.client.prefixed_key(marker_key))
            .arg(field)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(removed > 0)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
