//! Conversation positions and the transition rules between them
//!
//! Every flow family is a linear ask-sequence. Register, login and
//! add-bank share [`WizardStep`]: after a valid answer an `Ask(f)` step
//! moves to the next field, and an `Edit(f)` step always goes straight
//! back to `Confirm`. Deposit and withdraw have their own step enums
//! because their path depends on what the user picked earlier.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::state::action::{DepositData, DepositMethod};
use crate::state::entity::StatefulEntity;

/// A field of a linear flow, in prompt order
pub trait WizardField: Copy + Eq + 'static {
    const ORDER: &'static [Self];

    fn following(self) -> impl Iterator<Item = Self> {
        Self::ORDER.iter().copied().skip_while(move |f| *f != self).skip(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "field")]
pub enum WizardStep<F> {
    Ask(F),
    Edit(F),
    Confirm,
}

impl<F: WizardField> WizardStep<F> {
    /// First prompt of a fresh flow, skipping fields `skip` rejects
    pub fn start(skip: impl Fn(F) -> bool) -> Self {
        F::ORDER
            .iter()
            .copied()
            .find(|f| !skip(*f))
            .map(WizardStep::Ask)
            .unwrap_or(WizardStep::Confirm)
    }

    /// Step after the current field accepted a valid value
    pub fn advance(self, skip: impl Fn(F) -> bool) -> Self {
        match self {
            WizardStep::Ask(field) => field
                .following()
                .find(|f| !skip(*f))
                .map(WizardStep::Ask)
                .unwrap_or(WizardStep::Confirm),
            WizardStep::Edit(_) | WizardStep::Confirm => WizardStep::Confirm,
        }
    }

    /// Corrections are only offered from the confirm screen
    pub fn edit(self, field: F) -> Option<Self> {
        match self {
            WizardStep::Confirm => Some(WizardStep::Edit(field)),
            _ => None,
        }
    }

    /// Field currently being collected, if any
    pub fn field(self) -> Option<F> {
        match self {
            WizardStep::Ask(f) | WizardStep::Edit(f) => Some(f),
            WizardStep::Confirm => None,
        }
    }

    pub fn is_editing(self) -> bool {
        matches!(self, WizardStep::Edit(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoginField {
    Username,
    Password,
    Captcha,
}

impl WizardField for LoginField {
    const ORDER: &'static [Self] = &[LoginField::Username, LoginField::Password, LoginField::Captcha];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RegisterField {
    Username,
    Password,
    BankName,
    AccountName,
    AccountNumber,
    Referral,
    Captcha,
}

impl RegisterField {
    /// Fields offered on the confirm screen's edit menu
    pub const EDITABLE: &'static [RegisterField] = &[
        RegisterField::Username,
        RegisterField::Password,
        RegisterField::BankName,
        RegisterField::AccountName,
        RegisterField::AccountNumber,
        RegisterField::Referral,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RegisterField::Username => "Username",
            RegisterField::Password => "Password",
            RegisterField::BankName => "Bank",
            RegisterField::AccountName => "Account name",
            RegisterField::AccountNumber => "Account number",
            RegisterField::Referral => "Referral code",
            RegisterField::Captcha => "Captcha",
        }
    }
}

impl WizardField for RegisterField {
    const ORDER: &'static [Self] = &[
        RegisterField::Username,
        RegisterField::Password,
        RegisterField::BankName,
        RegisterField::AccountName,
        RegisterField::AccountNumber,
        RegisterField::Referral,
        RegisterField::Captcha,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AddBankField {
    Bank,
    AccountName,
    AccountNumber,
}

impl AddBankField {
    pub fn label(self) -> &'static str {
        match self {
            AddBankField::Bank => "Bank",
            AddBankField::AccountName => "Account name",
            AddBankField::AccountNumber => "Account number",
        }
    }
}

impl WizardField for AddBankField {
    const ORDER: &'static [Self] = &[AddBankField::Bank, AddBankField::AccountName, AddBankField::AccountNumber];
}

pub type LoginStep = WizardStep<LoginField>;
pub type RegisterStep = WizardStep<RegisterField>;
pub type AddBankStep = WizardStep<AddBankField>;

/// Deposit prompts, in the order a BANK deposit visits them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DepositStep {
    ChooseMethod,
    ChooseChannel,
    ChooseUserBank,
    ChoosePromo,
    AskAmount,
    AskNote,
    Confirm,
}

impl DepositStep {
    pub const ALL: [DepositStep; 7] = [
        DepositStep::ChooseMethod,
        DepositStep::ChooseChannel,
        DepositStep::ChooseUserBank,
        DepositStep::ChoosePromo,
        DepositStep::AskAmount,
        DepositStep::AskNote,
        DepositStep::Confirm,
    ];

    /// Step after the current one was answered, given the choices so far
    pub fn next(self, data: &DepositData) -> DepositStep {
        let bank = data.method == Some(DepositMethod::Bank);
        match self {
            DepositStep::ChooseMethod => DepositStep::ChooseChannel,
            DepositStep::ChooseChannel if bank => DepositStep::ChooseUserBank,
            DepositStep::ChooseChannel => DepositStep::AskAmount,
            DepositStep::ChooseUserBank if !data.promos.is_empty() => DepositStep::ChoosePromo,
            DepositStep::ChooseUserBank | DepositStep::ChoosePromo => DepositStep::AskAmount,
            DepositStep::AskAmount if bank => DepositStep::AskNote,
            DepositStep::AskAmount | DepositStep::AskNote | DepositStep::Confirm => DepositStep::Confirm,
        }
    }

    /// Steps a user may navigate back to from here
    pub fn can_go_back_to(self, target: DepositStep) -> bool {
        matches!(
            target,
            DepositStep::ChooseMethod
                | DepositStep::ChooseChannel
                | DepositStep::ChooseUserBank
                | DepositStep::ChoosePromo
        ) && target < self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WithdrawStep {
    AskAmount,
    Confirm,
}

/// Where one user currently is; persisted under its own state key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "flow", content = "step")]
pub enum ConversationState {
    /// No flow record: guest with nothing in progress
    #[default]
    Idle,
    /// Logged in with nothing in progress
    MainMenu,
    Login(LoginStep),
    Register(RegisterStep),
    Deposit(DepositStep),
    Withdraw(WithdrawStep),
    AddBank(AddBankStep),
    /// Waiting for the text of a game search
    GameSearch,
}

impl StatefulEntity for ConversationState {
    const STATE_KEY: &'static str = "fsm";
}

impl ConversationState {
    /// Guest flows run before a user session exists
    pub fn is_guest_flow(self) -> bool {
        matches!(self, ConversationState::Login(_) | ConversationState::Register(_))
    }

    /// Account flows run inside an authenticated session
    pub fn is_account_flow(self) -> bool {
        matches!(
            self,
            ConversationState::Deposit(_) | ConversationState::Withdraw(_) | ConversationState::AddBank(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_skip<F>(_: F) -> bool {
        false
    }

    #[test]
    fn test_register_forward_path() {
        let skip_captcha = |f: RegisterField| f == RegisterField::Captcha;
        let mut step = RegisterStep::start(skip_captcha);
        let mut visited = vec![];
        while let Some(field) = step.field() {
            visited.push(field);
            step = step.advance(skip_captcha);
        }
        assert_eq!(
            visited,
            vec![
                RegisterField::Username,
                RegisterField::Password,
                RegisterField::BankName,
                RegisterField::AccountName,
                RegisterField::AccountNumber,
                RegisterField::Referral,
            ]
        );
        assert_eq!(step, WizardStep::Confirm);
    }

    #[test]
    fn test_captcha_asked_when_required() {
        let step = WizardStep::Ask(RegisterField::Referral).advance(no_skip);
        assert_eq!(step, WizardStep::Ask(RegisterField::Captcha));
    }

    #[test]
    fn test_start_skips_leading_fields_and_ends_at_confirm() {
        let skip_username = |f: LoginField| f == LoginField::Username;
        assert_eq!(LoginStep::start(skip_username), WizardStep::Ask(LoginField::Password));
        assert_eq!(LoginStep::start(|_: LoginField| true), WizardStep::Confirm);
        assert_eq!(LoginField::Captcha.following().count(), 0);
    }

    #[test]
    fn test_edit_returns_to_confirm() {
        let edit = RegisterStep::Confirm.edit(RegisterField::BankName).unwrap();
        assert_eq!(edit, WizardStep::Edit(RegisterField::BankName));
        assert_eq!(edit.advance(no_skip), WizardStep::Confirm);
    }

    #[test]
    fn test_edit_only_from_confirm() {
        assert!(WizardStep::Ask(RegisterField::Password)
            .edit(RegisterField::Username)
            .is_none());
    }

    #[test]
    fn test_login_skips_captcha() {
        let skip = |f: LoginField| f == LoginField::Captcha;
        let step = LoginStep::start(skip).advance(skip).advance(skip);
        assert_eq!(step, WizardStep::Confirm);
    }

    #[test]
    fn test_deposit_paths() {
        let mut data = DepositData::default();
        data.method = Some(DepositMethod::Qris);
        assert_eq!(DepositStep::ChooseChannel.next(&data), DepositStep::AskAmount);
        assert_eq!(DepositStep::AskAmount.next(&data), DepositStep::Confirm);

        data.method = Some(DepositMethod::Bank);
        assert_eq!(DepositStep::ChooseChannel.next(&data), DepositStep::ChooseUserBank);
        assert_eq!(DepositStep::ChooseUserBank.next(&data), DepositStep::AskAmount);
        assert_eq!(DepositStep::AskAmount.next(&data), DepositStep::AskNote);
    }

    #[test]
    fn test_back_navigation_only_goes_backwards() {
        assert!(DepositStep::AskAmount.can_go_back_to(DepositStep::ChooseMethod));
        assert!(!DepositStep::ChooseChannel.can_go_back_to(DepositStep::ChoosePromo));
        assert!(!DepositStep::Confirm.can_go_back_to(DepositStep::AskAmount));
    }

    #[test]
    fn test_game_search_state_round_trips() {
        let json = serde_json::to_string(&ConversationState::GameSearch).unwrap();
        assert_eq!(json, r#"{"flow":"game_search"}"#);
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ConversationState::GameSearch);
    }

    #[test]
    fn test_state_snapshot_shape() {
        let state = ConversationState::Register(WizardStep::Edit(RegisterField::BankName));
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(
            json,
            r#"{"flow":"register","step":{"kind":"edit","field":"bank_name"}}"#
        );
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
