//! Message ledger: ids of every message that belongs to one flow

use serde::{Deserialize, Serialize};

use crate::telegram::transport::Transport;

/// Ordered, duplicate-free list of message ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageLedger {
    ids: Vec<i32>,
}

/// A flow model that owns the messages of its flow
pub trait Ledgered {
    fn ledger(&self) -> &MessageLedger;
    fn ledger_mut(&mut self) -> &mut MessageLedger;
}

/// Outcome of a best-effort [`MessageLedger::flush`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub deleted: usize,
    /// Already gone from the chat
    pub missing: usize,
    /// Deletion failed for another reason
    pub failed: usize,
}

impl MessageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, id: i32) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Appends and evicts the oldest ids beyond `cap`; returns the evicted ids.
    pub fn append_bounded(&mut self, id: i32, cap: usize) -> Vec<i32> {
        self.append(id);
        let overflow = self.ids.len().saturating_sub(cap.max(1));
        self.ids.drain(..overflow).collect()
    }

    /// Drops one id so a later flush does not touch it
    pub fn remove(&mut self, id: i32) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&x| x != id);
        self.ids.len() != before
    }

    pub fn contains(&self, id: i32) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[i32] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Moves every id from `other` into this ledger
    pub fn absorb(&mut self, other: &mut MessageLedger) {
        for id in other.ids.drain(..) {
            self.append(id);
        }
    }

    /// Deletes every recorded message from `chat_id`, then empties the ledger.
    ///
    /// A failed deletion never stops the remaining ones. The ledger is only
    /// cleared after the last attempt, so an interrupted flush leaves the ids
    /// in place for the next cleanup.
    pub async fn flush(&mut self, transport: &dyn Transport, chat_id: i64) -> FlushReport {
        let mut report = FlushReport::default();
        for &id in &self.ids {
            match transport.delete(chat_id, id).await {
                Ok(()) => report.deleted += 1,
                Err(e) if e.is_message_gone() => {
                    log::debug!("Message {} in chat {} already gone", id, chat_id);
                    report.missing += 1;
                }
                Err(e) => {
                    log::warn!("Failed to delete message {} in chat {}: {}", id, chat_id, e);
                    report.failed += 1;
                }
            }
        }
        self.ids.clear();
        report
    }
}
