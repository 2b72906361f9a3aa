use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{ConversationId, SessionStore, StoreResult};

/// In-process session store
///
/// Keeps snapshots in a map and counts writes so tests can assert how
/// many round trips a burst of mutations produced.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls served so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw payload stored for one entity, bypassing deserialization
    pub async fn raw(&self, id: &ConversationId, state_key: &str) -> Option<Vec<u8>> {
        self.entries.lock().await.get(&id.storage_key(state_key)).cloned()
    }

    pub async fn contains(&self, id: &ConversationId, state_key: &str) -> bool {
        self.entries.lock().await.contains_key(&id.storage_key(state_key))
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, id: &ConversationId, state_key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(&id.storage_key(state_key)).cloned())
    }

    async fn put(&self, id: &ConversationId, state_key: &str, payload: Vec<u8>) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().await.insert(id.storage_key(state_key), payload);
        Ok(())
    }

    async fn delete(&self, id: &ConversationId, state_key: &str) -> StoreResult<()> {
        self.entries.lock().await.remove(&id.storage_key(state_key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        let id = ConversationId::new(1, 2, 3);

        assert_eq!(store.get(&id, "login").await.unwrap(), None);
        store.put(&id, "login", b"{}".to_vec()).await.unwrap();
        assert_eq!(store.get(&id, "login").await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(store.write_count(), 1);

        store.delete(&id, "login").await.unwrap();
        store.delete(&id, "login").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_identities_do_not_leak() {
        let store = MemoryStore::new();
        let alice = ConversationId::new(1, 10, 10);
        let bob = ConversationId::new(1, 20, 20);

        store.put(&alice, "register", b"a".to_vec()).await.unwrap();
        assert_eq!(store.get(&bob, "register").await.unwrap(), None);
    }
}
