//! Deposit and withdraw actions
//!
//! The action data is a tagged union with one typed struct per action.
//! Provider-defined promo terms are the only untyped payload left.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ledger::MessageLedger;
use crate::backend::types::{
    BankDepositRequest, ChannelStatus, DepositInit, GatewayDepositRequest, PaymentGateway, PayoutAccount, Promo,
    UserBank, WithdrawInit, WithdrawRequest,
};
use crate::core::settings::{ChannelLimits, DepositLimits, WithdrawDefaults};
use crate::core::validation::{FieldError, FieldResult};
use crate::flow::fsm::DepositStep;

pub use crate::backend::types::{DepositBank, DepositMethod};

/// Inclusive amount range, optionally restricted to a step size
///
/// `max` is `None` when neither the backend nor config caps the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountBounds {
    pub min: i64,
    pub max: Option<i64>,
    pub multiple: Option<i64>,
}

impl AmountBounds {
    pub fn check(&self, amount: i64) -> FieldResult<i64> {
        match self.max {
            Some(max) if amount < self.min || amount > max => {
                return Err(FieldError::OutOfRange { min: self.min, max });
            }
            None if amount < self.min => return Err(FieldError::BelowMinimum(self.min)),
            _ => {}
        }
        if let Some(step) = self.multiple.filter(|m| *m > 1) {
            if amount % step != 0 {
                return Err(FieldError::NotMultiple(step));
            }
        }
        Ok(amount)
    }

    pub fn contains(&self, amount: i64) -> bool {
        self.check(amount).is_ok()
    }
}

/// One entry of the channel picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOption {
    pub id: i64,
    pub label: String,
    pub status: ChannelStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepositData {
    // Reported by the backend when the deposit started
    pub min_deposit: i64,
    pub max_deposit: i64,
    #[serde(default)]
    pub user_banks: Vec<UserBank>,
    #[serde(default)]
    pub deposit_banks: Vec<DepositBank>,
    #[serde(default)]
    pub qris: Vec<PaymentGateway>,
    #[serde(default)]
    pub va: Vec<PaymentGateway>,
    #[serde(default)]
    pub promos: Vec<Promo>,

    // Choices
    #[serde(default)]
    pub method: Option<DepositMethod>,
    #[serde(default)]
    pub channel_id: Option<i64>,
    #[serde(default)]
    pub user_bank_id: Option<i64>,
    /// Promo whose terms are on screen but not yet confirmed
    #[serde(default)]
    pub promo_preview: Option<i64>,
    #[serde(default)]
    pub promo_id: Option<i64>,
    #[serde(default)]
    pub amount: Option<i64>,
    /// `Some("")` once the note was skipped
    #[serde(default)]
    pub note: Option<String>,

    /// Message each step's prompt was rendered into
    #[serde(default)]
    pub prompts: BTreeMap<DepositStep, i32>,
}

impl DepositData {
    pub fn from_init(init: DepositInit) -> Self {
        Self {
            min_deposit: init.min_deposit,
            max_deposit: init.max_deposit,
            user_banks: init.bank.user_rekening,
            deposit_banks: init.bank.rekening_tujuan,
            qris: init.payment_gateway.qris,
            va: init.payment_gateway.va,
            promos: init.list_promo_event,
            ..Self::default()
        }
    }

    /// Channels offered for the chosen method
    pub fn channels(&self) -> Vec<ChannelOption> {
        match self.method {
            Some(DepositMethod::Bank) => self
                .deposit_banks
                .iter()
                .map(|b| ChannelOption {
                    id: b.id,
                    label: if b.bank_account_display.is_empty() {
                        b.bank_name.clone()
                    } else {
                        b.bank_account_display.clone()
                    },
                    status: b.status,
                })
                .collect(),
            Some(DepositMethod::Qris) => gateway_options(&self.qris),
            Some(DepositMethod::Va) => gateway_options(&self.va),
            None => Vec::new(),
        }
    }

    /// Whether `id` is an online channel of the chosen method
    pub fn is_selectable_channel(&self, id: i64) -> bool {
        self.channels()
            .iter()
            .any(|c| c.id == id && c.status == ChannelStatus::Online)
    }

    pub fn selected_channel(&self) -> Option<ChannelOption> {
        let id = self.channel_id?;
        self.channels().into_iter().find(|c| c.id == id)
    }

    pub fn destination_bank(&self) -> Option<&DepositBank> {
        let id = self.channel_id?;
        self.deposit_banks.iter().find(|b| b.id == id)
    }

    /// The user's own banks, the one matching the destination bank first
    pub fn source_banks(&self) -> Vec<&UserBank> {
        let destination = self.destination_bank().map(|b| b.bank_name.as_str());
        let mut banks: Vec<&UserBank> = self.user_banks.iter().collect();
        banks.sort_by_key(|b| Some(b.bank_name.as_str()) != destination);
        banks
    }

    pub fn user_bank(&self) -> Option<&UserBank> {
        let id = self.user_bank_id?;
        self.user_banks.iter().find(|b| b.id == id)
    }

    pub fn promo(&self, id: i64) -> Option<&Promo> {
        self.promos.iter().find(|p| p.id == id)
    }

    pub fn selected_promo(&self) -> Option<&Promo> {
        self.promo(self.promo_id?)
    }

    /// Commits a promo choice and drops any pending preview
    pub fn choose_promo(&mut self, id: i64) {
        self.promo_preview = None;
        self.promo_id = Some(id);
    }

    fn channel_limits(&self, limits: &DepositLimits) -> ChannelLimits {
        match self.method {
            Some(DepositMethod::Bank) => limits.bank,
            Some(DepositMethod::Qris) => limits.qris,
            Some(DepositMethod::Va) => limits.va,
            None => ChannelLimits::default(),
        }
    }

    /// Amount range for the current choices.
    ///
    /// Channel limits replace the backend's range, then a selected promo's
    /// minimum replaces the minimum.
    pub fn resolved_bounds(&self, limits: &DepositLimits) -> AmountBounds {
        let channel = self.channel_limits(limits);
        let mut min = channel.min.unwrap_or(self.min_deposit);
        let max = Some(channel.max.unwrap_or(self.max_deposit)).filter(|m| *m > 0);
        if let Some(promo) = self
            .selected_promo()
            .filter(|p| !p.is_none_choice() && p.minimum_deposit > 0)
        {
            min = promo.minimum_deposit;
        }
        AmountBounds {
            min: min.max(0),
            max,
            multiple: None,
        }
    }

    pub fn prompt(&self, step: DepositStep) -> Option<i32> {
        self.prompts.get(&step).copied()
    }

    pub fn record_prompt(&mut self, step: DepositStep, message_id: i32) {
        self.prompts.insert(step, message_id);
    }

    /// Forgets the answer to `step` and to every later step.
    ///
    /// Prompts of later steps are dropped and their message ids returned
    /// so the caller can delete them; the prompt of `step` itself is kept
    /// so it can be edited in place.
    pub fn clear_from(&mut self, step: DepositStep) -> Vec<i32> {
        for s in DepositStep::ALL.into_iter().filter(|s| *s >= step) {
            match s {
                DepositStep::ChooseMethod => self.method = None,
                DepositStep::ChooseChannel => self.channel_id = None,
                DepositStep::ChooseUserBank => self.user_bank_id = None,
                DepositStep::ChoosePromo => {
                    self.promo_id = None;
                    self.promo_preview = None;
                }
                DepositStep::AskAmount => self.amount = None,
                DepositStep::AskNote => self.note = None,
                DepositStep::Confirm => {}
            }
        }
        let later: Vec<DepositStep> = self.prompts.keys().copied().filter(|s| *s > step).collect();
        later.into_iter().filter_map(|s| self.prompts.remove(&s)).collect()
    }

    pub fn bank_request(&self) -> Option<BankDepositRequest> {
        Some(BankDepositRequest {
            user_bank_id: self.user_bank_id?,
            deposit_bank_id: self.channel_id?,
            promo_id: self.promo_id.unwrap_or(Promo::NONE_ID),
            amount: self.amount?,
            notes: self.note.clone().unwrap_or_default(),
        })
    }

    pub fn gateway_request(&self) -> Option<GatewayDepositRequest> {
        let method = self.method.filter(|m| *m != DepositMethod::Bank)?;
        Some(GatewayDepositRequest {
            payment_gateway_id: self.channel_id?.to_string(),
            amount: self.amount?,
            method,
        })
    }
}

fn gateway_options(gateways: &[PaymentGateway]) -> Vec<ChannelOption> {
    gateways
        .iter()
        .map(|g| ChannelOption {
            id: g.id,
            label: g.name.clone(),
            status: g.status,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawData {
    pub min: i64,
    pub max: i64,
    pub multiple: i64,
    pub account: PayoutAccount,
    #[serde(default)]
    pub amount: Option<i64>,
    /// The amount prompt, edited in place when the confirm screen replaces it
    #[serde(default)]
    pub prompt: Option<i32>,
}

impl WithdrawData {
    /// `None` when the backend has no payout account on file
    pub fn from_init(init: WithdrawInit, defaults: &WithdrawDefaults) -> Option<Self> {
        let account = init.rekening_wd.filter(|a| !a.rekening.is_empty())?;
        Some(Self {
            min: init.min_amount.unwrap_or(defaults.min),
            max: init.max_amount.unwrap_or(defaults.max),
            multiple: init.withdraw_multiple.unwrap_or(defaults.multiple),
            account,
            amount: None,
            prompt: None,
        })
    }

    pub fn bounds(&self) -> AmountBounds {
        AmountBounds {
            min: self.min,
            max: Some(self.max),
            multiple: Some(self.multiple),
        }
    }

    pub fn request(&self) -> Option<WithdrawRequest> {
        Some(WithdrawRequest {
            amount: self.amount?,
            notes: String::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionData {
    Deposit(DepositData),
    Withdraw(WithdrawData),
}

/// The one deposit or withdraw a user may have in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionModel {
    pub chat_id: i64,
    pub data: ActionData,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ledger: MessageLedger,
}

impl ActionModel {
    pub fn new(chat_id: i64, data: ActionData) -> Self {
        Self {
            chat_id,
            data,
            started_at: Utc::now(),
            ledger: MessageLedger::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.data {
            ActionData::Deposit(_) => "deposit",
            ActionData::Withdraw(_) => "withdraw",
        }
    }

    pub fn deposit(&self) -> Option<&DepositData> {
        match &self.data {
            ActionData::Deposit(d) => Some(d),
            _ => None,
        }
    }

    pub fn deposit_mut(&mut self) -> Option<&mut DepositData> {
        match &mut self.data {
            ActionData::Deposit(d) => Some(d),
            _ => None,
        }
    }

    pub fn withdraw(&self) -> Option<&WithdrawData> {
        match &self.data {
            ActionData::Withdraw(w) => Some(w),
            _ => None,
        }
    }

    pub fn withdraw_mut(&mut self) -> Option<&mut WithdrawData> {
        match &mut self.data {
            ActionData::Withdraw(w) => Some(w),
            _ => None,
        }
    }
}
