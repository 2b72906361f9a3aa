use serde::{Deserialize, Serialize};

use super::entity::StatefulEntity;
use super::ledger::{Ledgered, MessageLedger};
use crate::backend::types::{AuthHandshake, RegisterRequest};
use crate::core::validation::{self, FieldResult, REGISTER_ACCOUNT_NAME_MIN};
use crate::flow::fsm::RegisterField;

/// An in-progress registration
///
/// `bank_list` is the snapshot offered when the flow started. It is the
/// only list a bank choice is checked against for the life of the flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterModel {
    pub chat_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub referral: Option<String>,
    #[serde(default)]
    pub captcha: Option<String>,
    #[serde(default)]
    pub bank_list: Vec<String>,
    #[serde(default)]
    pub captcha_required: bool,
    #[serde(default)]
    pub captcha_image: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub ledger: MessageLedger,
}

impl Ledgered for RegisterModel {
    fn ledger(&self) -> &MessageLedger {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut MessageLedger {
        &mut self.ledger
    }
}

impl StatefulEntity for RegisterModel {
    const STATE_KEY: &'static str = "register";
}

impl RegisterModel {
    pub fn new(chat_id: i64, handshake: &AuthHandshake, phone_number: Option<String>) -> Self {
        Self {
            chat_id,
            bank_list: handshake.bank_list.clone(),
            captcha_required: handshake.captcha,
            captcha_image: handshake.captcha_image.clone(),
            phone_number,
            ..Self::default()
        }
    }

    pub fn skips(&self, field: RegisterField) -> bool {
        field == RegisterField::Captcha && !self.captcha_required
    }

    /// Checks raw input for one field without touching the model
    pub fn validate(&self, field: RegisterField, input: &str) -> FieldResult<String> {
        match field {
            RegisterField::Username => validation::username(input),
            RegisterField::Password => validation::password(input),
            RegisterField::BankName => validation::bank_choice(input, &self.bank_list),
            RegisterField::AccountName => validation::account_name(input, REGISTER_ACCOUNT_NAME_MIN),
            RegisterField::AccountNumber => validation::account_number(input),
            RegisterField::Referral => validation::referral_code(input),
            RegisterField::Captcha => validation::captcha(input),
        }
    }

    pub fn set_field(&mut self, field: RegisterField, value: Option<String>) {
        let slot = match field {
            RegisterField::Username => &mut self.username,
            RegisterField::Password => &mut self.password,
            RegisterField::BankName => &mut self.bank_name,
            RegisterField::AccountName => &mut self.account_name,
            RegisterField::AccountNumber => &mut self.account_number,
            RegisterField::Referral => &mut self.referral,
            RegisterField::Captcha => &mut self.captcha,
        };
        *slot = value;
    }

    pub fn field(&self, field: RegisterField) -> Option<&str> {
        match field {
            RegisterField::Username => self.username.as_deref(),
            RegisterField::Password => self.password.as_deref(),
            RegisterField::BankName => self.bank_name.as_deref(),
            RegisterField::AccountName => self.account_name.as_deref(),
            RegisterField::AccountNumber => self.account_number.as_deref(),
            RegisterField::Referral => self.referral.as_deref(),
            RegisterField::Captcha => self.captcha.as_deref(),
        }
    }

    /// Backend payload; `None` while a required field is missing
    pub fn payload(&self) -> Option<RegisterRequest> {
        if self.captcha_required && self.captcha.is_none() {
            return None;
        }
        Some(RegisterRequest {
            username: self.username.clone()?,
            password: self.password.clone()?,
            telpon: self.phone_number.clone(),
            nama: self.account_name.clone()?,
            bank: self.bank_name.clone()?,
            rekening: self.account_number.clone()?,
            referral: self.referral.clone(),
            captcha: self.captcha.clone(),
        })
    }
}
