//! Message transport: the only way the conversation layer talks to Telegram
//!
//! Handlers get an `Arc<dyn Transport>` injected through `HandlerDeps`, so
//! the flows can run against a recording transport in tests and against
//! [`TeloxideTransport`] in production.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ButtonRequest, CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton,
    KeyboardMarkup, KeyboardRemove, MessageId, ParseMode, ReplyMarkup,
};
use thiserror::Error;

/// One inline button: label plus callback payload, or a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
    pub url: Option<String>,
}

impl Button {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
            url: None,
        }
    }

    /// Opens `url` instead of sending a callback
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: String::new(),
            url: Some(url.into()),
        }
    }
}

/// Markup attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Inline buttons, row by row
    Inline(Vec<Vec<Button>>),
    /// One-time reply keyboard asking the user to share their contact
    RequestContact(String),
    /// Hide a previously shown reply keyboard
    Remove,
}

impl Keyboard {
    /// Every callback payload on this keyboard, in render order
    pub fn callback_data(&self) -> Vec<&str> {
        match self {
            Keyboard::Inline(rows) => rows
                .iter()
                .flatten()
                .filter(|b| b.url.is_none())
                .map(|b| b.data.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn to_reply_markup(&self) -> ReplyMarkup {
        match self {
            Keyboard::Inline(rows) => ReplyMarkup::InlineKeyboard(inline_markup(rows)),
            Keyboard::RequestContact(label) => ReplyMarkup::Keyboard(
                KeyboardMarkup::new(vec![vec![KeyboardButton::new(label.clone()).request(ButtonRequest::Contact)]])
                    .resize_keyboard()
                    .one_time_keyboard(),
            ),
            Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
        }
    }
}

fn inline_markup(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .filter_map(|b| match b.url.as_deref().map(url::Url::parse) {
                None => Some(InlineKeyboardButton::callback(b.text.clone(), b.data.clone())),
                Some(Ok(url)) => Some(InlineKeyboardButton::url(b.text.clone(), url)),
                Some(Err(e)) => {
                    log::warn!("Dropping link button '{}': {}", b.text, e);
                    None
                }
            })
            .collect::<Vec<_>>()
    }))
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    /// The message was already deleted or never existed
    #[error("Message {0} not found")]
    MessageGone(i32),

    #[error("Invalid media url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TransportError {
    pub fn is_message_gone(&self) -> bool {
        matches!(self, TransportError::MessageGone(_))
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Send/edit/delete primitives keyed by (chat id, message id)
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends an HTML message and returns its id
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> TransportResult<i32>;

    /// Replaces the text and inline keyboard of an existing message
    async fn edit(&self, chat_id: i64, message_id: i32, text: &str, keyboard: Option<Keyboard>) -> TransportResult<()>;

    async fn delete(&self, chat_id: i64, message_id: i32) -> TransportResult<()>;

    async fn send_photo(&self, chat_id: i64, url: &str, caption: &str) -> TransportResult<i32>;

    /// Stops the loading spinner on a pressed button, optionally with a toast
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()>;
}

/// [`Transport`] over a real teloxide bot
#[derive(Clone)]
pub struct TeloxideTransport {
    bot: Bot,
}

impl TeloxideTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn is_gone(err: &teloxide::RequestError) -> bool {
    let text = err.to_string();
    text.contains("message to delete not found")
        || text.contains("MESSAGE_ID_INVALID")
        || text.contains("message to edit not found")
}

#[async_trait]
impl Transport for TeloxideTransport {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> TransportResult<i32> {
        let mut request = self.bot.send_message(ChatId(chat_id), text).parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard.to_reply_markup());
        }
        let message = request.await?;
        Ok(message.id.0)
    }

    async fn edit(&self, chat_id: i64, message_id: i32, text: &str, keyboard: Option<Keyboard>) -> TransportResult<()> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text)
            .parse_mode(ParseMode::Html);
        // Only inline markup can be attached to an edited message
        if let Some(Keyboard::Inline(rows)) = keyboard {
            request = request.reply_markup(inline_markup(&rows));
        }
        match request.await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) if is_gone(&e) => Err(TransportError::MessageGone(message_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> TransportResult<()> {
        match self.bot.delete_message(ChatId(chat_id), MessageId(message_id)).await {
            Ok(_) => Ok(()),
            Err(e) if is_gone(&e) => Err(TransportError::MessageGone(message_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn send_photo(&self, chat_id: i64, url: &str, caption: &str) -> TransportResult<i32> {
        let photo = InputFile::url(url::Url::parse(url)?);
        let message = self
            .bot
            .send_photo(ChatId(chat_id), photo)
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(message.id.0)
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()> {
        let mut request = self.bot.answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await?;
        Ok(())
    }
}
