use serde::{Deserialize, Serialize};
use strum::Display;

use super::entity::StatefulEntity;
use super::ledger::MessageLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Presentation {
    Guest,
    User,
}

/// Menu messages currently visible in the chat
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuModel {
    #[serde(default)]
    pub presentation: Option<Presentation>,
    #[serde(default)]
    pub ledger: MessageLedger,
}

impl StatefulEntity for MenuModel {
    const STATE_KEY: &'static str = "menu";
}

impl MenuModel {
    /// Records a freshly rendered menu and returns the ids to delete.
    ///
    /// Switching presentation retires every earlier menu. Otherwise only
    /// the oldest ones beyond `cap` are evicted.
    pub fn record(&mut self, presentation: Presentation, message_id: i32, cap: usize) -> Vec<i32> {
        let mut stale = Vec::new();
        if self.presentation != Some(presentation) {
            stale.extend_from_slice(self.ledger.ids());
            self.ledger = MessageLedger::new();
            self.presentation = Some(presentation);
        }
        stale.extend(self.ledger.append_bounded(message_id, cap));
        stale
    }

    /// Latest rendered menu, if any
    pub fn latest(&self) -> Option<i32> {
        self.ledger.ids().last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_menu_ledger() {
        let mut menu = MenuModel::default();
        assert!(menu.record(Presentation::User, 1, 2).is_empty());
        assert!(menu.record(Presentation::User, 2, 2).is_empty());
        assert_eq!(menu.record(Presentation::User, 3, 2), vec![1]);
        assert_eq!(menu.latest(), Some(3));
    }

    #[test]
    fn test_switching_presentation_retires_all() {
        let mut menu = MenuModel::default();
        menu.record(Presentation::Guest, 1, 5);
        menu.record(Presentation::Guest, 2, 5);
        assert_eq!(menu.record(Presentation::User, 3, 2), vec![1, 2]);
        assert_eq!(menu.ledger.ids(), &[3]);
        assert_eq!(menu.presentation, Some(Presentation::User));
    }
}
