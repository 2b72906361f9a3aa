//! Handler types, dependencies, and update conversion

use teloxide::prelude::*;
use teloxide::types::Message;

use crate::flow::callback::Callback;
use crate::flow::{FlowDeps, Inbound, Input, Intent};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type HandlerResult = Result<(), HandlerError>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub flow: FlowDeps,
    /// Namespaces every stored conversation
    pub bot_id: u64,
}

impl HandlerDeps {
    pub fn new(flow: FlowDeps, bot_id: u64) -> Self {
        Self { flow, bot_id }
    }

    fn inbound(&self, chat: &teloxide::types::Chat, user_id: u64, message_id: Option<i32>, input: Input) -> Inbound {
        Inbound {
            bot_id: self.bot_id,
            chat_id: chat.id.0,
            user_id,
            private_chat: chat.is_private(),
            message_id,
            input,
        }
    }

    /// A command already parsed by the dispatcher
    pub fn command_inbound(&self, msg: &Message, intent: Intent) -> Option<Inbound> {
        let user = msg.from.as_ref()?;
        Some(self.inbound(&msg.chat, user.id.0, Some(msg.id.0), Input::Intent(intent)))
    }

    /// Text, contacts and anything else a user sends
    pub fn message_inbound(&self, msg: &Message) -> Option<Inbound> {
        let user = msg.from.as_ref()?;
        if user.is_bot {
            return None;
        }
        let input = if let Some(contact) = msg.contact() {
            Input::Contact {
                phone_number: contact.phone_number.clone(),
                owner: contact.user_id.map(|id| id.0),
            }
        } else if let Some(text) = msg.text() {
            Input::Text(text.to_string())
        } else {
            Input::Other
        };
        Some(self.inbound(&msg.chat, user.id.0, Some(msg.id.0), input))
    }

    /// A pressed inline button
    pub fn callback_inbound(&self, q: &CallbackQuery) -> Option<Inbound> {
        let message = q.message.as_ref()?;
        let id = q.id.0.clone();
        let input = match q.data.as_deref().map(str::parse::<Callback>) {
            Some(Ok(data)) => Input::Callback { id, data },
            Some(Err(e)) => {
                log::debug!("{}", e);
                Input::UnknownCallback { id }
            }
            None => Input::UnknownCallback { id },
        };
        Some(self.inbound(message.chat(), q.from.id.0, Some(message.id().0), input))
    }
}
