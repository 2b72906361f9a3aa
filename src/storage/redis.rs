use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::{ConversationId, SessionStore, StoreError, StoreResult};

/// Redis-backed session store
///
/// The multiplexed connection is cheap to clone, so every call works on
/// its own handle and no lock is held across an `.await`.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    ttl_secs: Option<u64>,
}

impl RedisStore {
    /// Connects and pings the server. Failure here is fatal for the process.
    pub async fn connect(url: &str, ttl_secs: Option<u64>) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(StoreError::Unavailable(format!("unexpected PING reply: {}", pong)));
        }
        log::info!("Connected to session store");
        Ok(Self { conn, ttl_secs })
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, id: &ConversationId, state_key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let payload: Option<Vec<u8>> = conn.get(id.storage_key(state_key)).await?;
        Ok(payload)
    }

    async fn put(&self, id: &ConversationId, state_key: &str, payload: Vec<u8>) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let key = id.storage_key(state_key);
        match self.ttl_secs {
            Some(ttl) => {
                let _: () = conn.set_ex(key, payload, ttl).await?;
            }
            None => {
                let _: () = conn.set(key, payload).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &ConversationId, state_key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(id.storage_key(state_key)).await?;
        Ok(())
    }
}
