use strum::{Display, EnumString};

use super::callback::Callback;
use crate::storage::ConversationId;

/// Something the user asked for directly, by command or menu button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Start,
    Cancel,
    Login,
    Register,
    Deposit,
    Withdraw,
    AddBank,
    Accounts,
    History,
    Games,
    Support,
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Intent(Intent),
    Text(String),
    /// A shared contact; `owner` is the Telegram user the contact belongs to
    Contact {
        phone_number: String,
        owner: Option<u64>,
    },
    Callback {
        id: String,
        data: Callback,
    },
    /// A button whose payload no longer parses
    UnknownCallback {
        id: String,
    },
    /// Stickers, photos and anything else the flows ignore
    Other,
}

/// One inbound update, reduced to what the flows need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub bot_id: u64,
    pub chat_id: i64,
    pub user_id: u64,
    pub private_chat: bool,
    /// The user's message, or the bot message carrying the pressed button
    pub message_id: Option<i32>,
    pub input: Input,
}

impl Inbound {
    pub fn conversation_id(&self) -> ConversationId {
        ConversationId::new(self.bot_id, self.chat_id, self.user_id)
    }

    pub fn callback_id(&self) -> Option<&str> {
        match &self.input {
            Input::Callback { id, .. } | Input::UnknownCallback { id } => Some(id),
            _ => None,
        }
    }

    pub fn callback(&self) -> Option<&Callback> {
        match &self.input {
            Input::Callback { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Id of a message the user sent, which belongs in the active ledger
    pub fn user_message_id(&self) -> Option<i32> {
        match self.input {
            Input::Callback { .. } | Input::UnknownCallback { .. } => None,
            _ => self.message_id,
        }
    }

    /// Commands and menu buttons that start or end a flow
    pub fn intent(&self) -> Option<Intent> {
        match &self.input {
            Input::Intent(intent) => Some(*intent),
            Input::Callback {
                data: Callback::Go(intent),
                ..
            } => Some(*intent),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.input {
            Input::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(input: Input) -> Inbound {
        Inbound {
            bot_id: 1,
            chat_id: 2,
            user_id: 3,
            private_chat: true,
            message_id: Some(10),
            input,
        }
    }

    #[test]
    fn test_button_presses_are_not_user_messages() {
        assert_eq!(inbound(Input::Text("hi".into())).user_message_id(), Some(10));
        let pressed = inbound(Input::Callback {
            id: "q".into(),
            data: Callback::RegisterSubmit,
        });
        assert_eq!(pressed.user_message_id(), None);
        assert_eq!(pressed.callback_id(), Some("q"));
    }

    #[test]
    fn test_menu_button_is_an_intent() {
        let pressed = inbound(Input::Callback {
            id: "q".into(),
            data: Callback::Go(Intent::Deposit),
        });
        assert_eq!(pressed.intent(), Some(Intent::Deposit));
        assert_eq!(inbound(Input::Intent(Intent::Cancel)).intent(), Some(Intent::Cancel));
        assert_eq!(inbound(Input::Text("/x".into())).intent(), None);
    }
}
