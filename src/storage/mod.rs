//! Session store: raw snapshot bytes keyed by conversation identity
//!
//! The conversation layer never talks to redis directly. It goes through
//! [`SessionStore`], which has two implementations:
//! - [`RedisStore`]: production store on a multiplexed async connection
//! - [`MemoryStore`]: process-local map used by tests and dry runs

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Key prefix shared by every stored snapshot
pub const KEY_PREFIX: &str = "otpbot";

/// The (bot, chat, user) tuple that namespaces every stored snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId {
    pub bot_id: u64,
    pub chat_id: i64,
    pub user_id: u64,
}

impl ConversationId {
    pub const fn new(bot_id: u64, chat_id: i64, user_id: u64) -> Self {
        Self {
            bot_id,
            chat_id,
            user_id,
        }
    }

    /// Storage key of one entity under this identity
    pub fn storage_key(&self, state_key: &str) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            KEY_PREFIX, self.bot_id, self.chat_id, self.user_id, state_key
        )
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.bot_id, self.chat_id, self.user_id)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Transactional read/write/clear API over serialized snapshots
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &ConversationId, state_key: &str) -> StoreResult<Option<Vec<u8>>>;

    async fn put(&self, id: &ConversationId, state_key: &str, payload: Vec<u8>) -> StoreResult<()>;

    /// Removing an absent key is not an error
    async fn delete(&self, id: &ConversationId, state_key: &str) -> StoreResult<()>;
}
