//! Recording transport for flow tests
//!
//! Plays the Telegram side of a chat in memory: every send gets a fresh
//! message id, every edit and delete is checked against the messages that
//! are still visible, and every call is recorded for assertions.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use otpbot::state::{StatefulEntity, UserModel};
use otpbot::storage::{ConversationId, MemoryStore};
use otpbot::telegram::transport::{Keyboard, Transport, TransportError, TransportResult};

/// A message the bot put on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: i32,
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub callback_id: String,
    pub text: Option<String>,
}

/// Session snapshot checked on every delete
#[derive(Clone)]
struct SessionWatch {
    store: MemoryStore,
    id: ConversationId,
}

#[derive(Default)]
struct Chat {
    sent: Vec<SentMessage>,
    edits: Vec<(i32, String)>,
    deleted: Vec<i32>,
    answers: Vec<Answer>,
    visible: BTreeSet<i32>,
    delete_delay: Duration,
    watch: Option<SessionWatch>,
    /// (message id, whether the stored session still held an action)
    deletes_seen: Vec<(i32, bool)>,
}

pub struct RecordingTransport {
    next_id: AtomicI32,
    chat: Mutex<Chat>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(1000),
            chat: Mutex::new(Chat::default()),
        }
    }

    /// Reserves an id for a message the user typed, so it can be deleted later
    pub fn user_message(&self) -> i32 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.chat.lock().unwrap().visible.insert(id);
        id
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.chat.lock().unwrap().sent.clone()
    }

    pub fn last_sent(&self) -> Option<SentMessage> {
        self.chat.lock().unwrap().sent.last().cloned()
    }

    pub fn texts(&self) -> Vec<String> {
        self.chat.lock().unwrap().sent.iter().map(|m| m.text.clone()).collect()
    }

    pub fn edits(&self) -> Vec<(i32, String)> {
        self.chat.lock().unwrap().edits.clone()
    }

    pub fn deleted(&self) -> Vec<i32> {
        self.chat.lock().unwrap().deleted.clone()
    }

    pub fn answers(&self) -> Vec<Answer> {
        self.chat.lock().unwrap().answers.clone()
    }

    pub fn is_visible(&self, id: i32) -> bool {
        self.chat.lock().unwrap().visible.contains(&id)
    }

    /// Ids still on screen
    pub fn visible(&self) -> Vec<i32> {
        self.chat.lock().unwrap().visible.iter().copied().collect()
    }

    /// Removes a message as if the user deleted it by hand
    pub fn vanish(&self, id: i32) {
        self.chat.lock().unwrap().visible.remove(&id);
    }

    /// Makes every delete take `delay`, like a slow Telegram API
    pub fn slow_deletes(&self, delay: Duration) {
        self.chat.lock().unwrap().delete_delay = delay;
    }

    /// Records, for each delete, whether the stored session still had an action
    pub fn watch_session(&self, store: MemoryStore, id: ConversationId) {
        self.chat.lock().unwrap().watch = Some(SessionWatch { store, id });
    }

    pub fn deletes_seen(&self) -> Vec<(i32, bool)> {
        self.chat.lock().unwrap().deletes_seen.clone()
    }

    pub fn any_text_contains(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }

    fn record(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>, photo: Option<String>) -> i32 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut chat = self.chat.lock().unwrap();
        chat.visible.insert(id);
        chat.sent.push(SentMessage {
            id,
            chat_id,
            text: text.to_string(),
            keyboard,
            photo,
        });
        id
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> TransportResult<i32> {
        Ok(self.record(chat_id, text, keyboard, None))
    }

    async fn edit(&self, _chat_id: i64, message_id: i32, text: &str, keyboard: Option<Keyboard>) -> TransportResult<()> {
        let mut chat = self.chat.lock().unwrap();
        if !chat.visible.contains(&message_id) {
            return Err(TransportError::MessageGone(message_id));
        }
        chat.edits.push((message_id, text.to_string()));
        if let Some(message) = chat.sent.iter_mut().find(|m| m.id == message_id) {
            message.text = text.to_string();
            message.keyboard = keyboard;
        }
        Ok(())
    }

    async fn delete(&self, _chat_id: i64, message_id: i32) -> TransportResult<()> {
        let (delay, watch) = {
            let chat = self.chat.lock().unwrap();
            (chat.delete_delay, chat.watch.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(watch) = watch {
            let stored = watch
                .store
                .raw(&watch.id, UserModel::STATE_KEY)
                .await
                .and_then(|raw| serde_json::from_slice::<UserModel>(&raw).ok());
            let has_action = stored.is_some_and(|u| u.action.is_some());
            self.chat.lock().unwrap().deletes_seen.push((message_id, has_action));
        }

        let mut chat = self.chat.lock().unwrap();
        if !chat.visible.remove(&message_id) {
            return Err(TransportError::MessageGone(message_id));
        }
        chat.deleted.push(message_id);
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, url: &str, caption: &str) -> TransportResult<i32> {
        Ok(self.record(chat_id, caption, None, Some(url.to_string())))
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()> {
        self.chat.lock().unwrap().answers.push(Answer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}
