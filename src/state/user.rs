use serde::{Deserialize, Serialize};

use super::action::ActionModel;
use super::add_bank::AddBankModel;
use super::entity::StatefulEntity;
use super::ledger::{Ledgered, MessageLedger};
use crate::backend::types::{AccountStatus, Profile};

/// The authenticated session of one user
///
/// Profile fields are overwritten from the backend on every gated
/// interaction. At most one action and one add-bank flow are embedded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserModel {
    pub chat_id: i64,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credit: f64,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub pending_deposit: bool,
    #[serde(default)]
    pub pending_withdraw: bool,
    #[serde(default)]
    pub action: Option<ActionModel>,
    #[serde(default)]
    pub add_bank: Option<AddBankModel>,
    /// Text of the last game search, for paging its results
    #[serde(default)]
    pub game_search: Option<String>,
    #[serde(default)]
    pub ledger: MessageLedger,
}

impl StatefulEntity for UserModel {
    const STATE_KEY: &'static str = "user";
}

/// Inbound messages and prompts land in the active sub-flow's ledger
impl Ledgered for UserModel {
    fn ledger(&self) -> &MessageLedger {
        if let Some(action) = self.action.as_ref() {
            return &action.ledger;
        }
        if let Some(add_bank) = self.add_bank.as_ref() {
            return &add_bank.ledger;
        }
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut MessageLedger {
        if let Some(action) = self.action.as_mut() {
            return &mut action.ledger;
        }
        if let Some(add_bank) = self.add_bank.as_mut() {
            return &mut add_bank.ledger;
        }
        &mut self.ledger
    }
}

impl UserModel {
    pub fn from_profile(chat_id: i64, profile: &Profile) -> Self {
        let mut user = Self {
            chat_id,
            authenticated: true,
            ..Self::default()
        };
        user.apply_profile(profile);
        user
    }

    pub fn apply_profile(&mut self, profile: &Profile) {
        if !profile.username.is_empty() {
            self.username = profile.username.clone();
        }
        self.credit = profile.credit;
        self.rank = profile.rank.clone();
        self.status = profile.account_status();
        self.pending_deposit = profile.pending_deposit;
        self.pending_withdraw = profile.pending_wd;
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Installs a new action and hands back the one it displaced.
    ///
    /// Flows end the previous action first (deleting its messages while it
    /// is still stored), so in practice nothing is displaced.
    pub fn start_action(&mut self, action: ActionModel) -> Option<ActionModel> {
        self.action.replace(action)
    }

    pub fn take_action(&mut self) -> Option<ActionModel> {
        self.action.take()
    }

    pub fn take_add_bank(&mut self) -> Option<AddBankModel> {
        self.add_bank.take()
    }

    /// Ledger of whichever sub-flow is active, else the session ledger
    pub fn active_ledger(&mut self) -> &mut MessageLedger {
        self.ledger_mut()
    }

    /// Every ledger this session owns, drained into one
    pub fn drain_ledgers(&mut self) -> MessageLedger {
        let mut all = MessageLedger::new();
        if let Some(mut action) = self.action.take() {
            all.absorb(&mut action.ledger);
        }
        if let Some(mut add_bank) = self.add_bank.take() {
            all.absorb(&mut add_bank.ledger);
        }
        all.absorb(&mut self.ledger);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::action::{ActionData, WithdrawData};

    fn withdraw_action(chat_id: i64) -> ActionModel {
        ActionModel::new(chat_id, ActionData::Withdraw(WithdrawData::default()))
    }

    #[test]
    fn test_start_action_returns_previous() {
        let mut user = UserModel::from_profile(1, &Profile::default());
        assert!(user.start_action(withdraw_action(1)).is_none());

        let mut first = withdraw_action(1);
        first.ledger.append(40);
        user.action = Some(first);

        let displaced = user.start_action(withdraw_action(1)).unwrap();
        assert_eq!(displaced.ledger.ids(), &[40]);
        assert!(user.action.as_ref().unwrap().ledger.is_empty());
    }

    #[test]
    fn test_inbound_ids_go_to_active_flow() {
        let mut user = UserModel::from_profile(1, &Profile::default());
        user.active_ledger().append(1);
        user.action = Some(withdraw_action(1));
        user.active_ledger().append(2);

        assert_eq!(user.ledger.ids(), &[1]);
        assert_eq!(user.action.as_ref().unwrap().ledger.ids(), &[2]);

        let all = user.drain_ledgers();
        assert_eq!(all.ids(), &[2, 1]);
        assert!(user.action.is_none());
    }

    #[test]
    fn test_profile_refresh_overwrites_status() {
        let mut user = UserModel::from_profile(
            1,
            &Profile {
                username: "budi".into(),
                ..Profile::default()
            },
        );
        assert!(user.is_active());

        user.apply_profile(&Profile {
            status: Some(AccountStatus::Suspended),
            pending_wd: true,
            ..Profile::default()
        });
        assert_eq!(user.username, "budi");
        assert!(!user.is_active());
        assert!(user.pending_withdraw);
    }
}
