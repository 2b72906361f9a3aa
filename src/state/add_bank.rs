use serde::{Deserialize, Serialize};

use super::ledger::MessageLedger;
use crate::backend::types::{AddBankInit, AddBankRequest};
use crate::core::validation::{self, FieldResult, ADD_BANK_ACCOUNT_NAME_MIN};
use crate::flow::fsm::AddBankField;

/// Adding a bank account to a logged-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBankModel {
    /// Banks offered: active ones the user does not own yet
    pub bank_list: Vec<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    /// Menu message that started the flow
    #[serde(default)]
    pub origin_message: Option<i32>,
    #[serde(default)]
    pub ledger: MessageLedger,
}

impl AddBankModel {
    pub fn new(init: &AddBankInit, origin_message: Option<i32>) -> Self {
        let bank_list = init
            .bank_list
            .iter()
            .filter(|bank| !init.user_bank_list.iter().any(|own| own.eq_ignore_ascii_case(bank)))
            .cloned()
            .collect();
        Self {
            bank_list,
            origin_message,
            ..Self::default()
        }
    }

    pub fn validate(&self, field: AddBankField, input: &str) -> FieldResult<String> {
        match field {
            AddBankField::Bank => validation::bank_choice(input, &self.bank_list),
            AddBankField::AccountName => validation::account_name(input, ADD_BANK_ACCOUNT_NAME_MIN),
            AddBankField::AccountNumber => validation::account_number(input),
        }
    }

    pub fn set_field(&mut self, field: AddBankField, value: String) {
        match field {
            AddBankField::Bank => self.bank = Some(value),
            AddBankField::AccountName => self.account_name = Some(value),
            AddBankField::AccountNumber => self.account_number = Some(value),
        }
    }

    pub fn field(&self, field: AddBankField) -> Option<&str> {
        match field {
            AddBankField::Bank => self.bank.as_deref(),
            AddBankField::AccountName => self.account_name.as_deref(),
            AddBankField::AccountNumber => self.account_number.as_deref(),
        }
    }

    pub fn request(&self) -> Option<AddBankRequest> {
        Some(AddBankRequest {
            bank_name: self.bank.clone()?,
            bank_account_name: self.account_name.clone()?,
            bank_account_number: self.account_number.clone()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_banks_are_not_offered() {
        let init = AddBankInit {
            bank_list: vec!["BCA".into(), "BNI".into(), "BRI".into()],
            user_bank_list: vec!["bca".into()],
        };
        let model = AddBankModel::new(&init, Some(7));
        assert_eq!(model.bank_list, vec!["BNI".to_string(), "BRI".to_string()]);
        assert!(model.validate(AddBankField::Bank, "BCA").is_err());
    }

    #[test]
    fn test_account_name_minimum_is_stricter_than_registration() {
        let model = AddBankModel::default();
        assert!(model.validate(AddBankField::AccountName, "Budi").is_err());
        assert!(model.validate(AddBankField::AccountName, "Budi Santoso").is_ok());
    }
}
