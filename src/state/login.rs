use serde::{Deserialize, Serialize};

use super::entity::StatefulEntity;
use super::ledger::{Ledgered, MessageLedger};
use crate::backend::types::{AuthHandshake, LoginRequest};
use crate::core::validation::{self, FieldResult};
use crate::flow::fsm::LoginField;

/// An in-progress login attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginModel {
    pub chat_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub captcha: Option<String>,
    #[serde(default)]
    pub captcha_required: bool,
    #[serde(default)]
    pub captcha_image: Option<String>,
    #[serde(default)]
    pub ledger: MessageLedger,
}

impl Ledgered for LoginModel {
    fn ledger(&self) -> &MessageLedger {
        &self.ledger
    }

    fn ledger_mut(&mut self) -> &mut MessageLedger {
        &mut self.ledger
    }
}

impl StatefulEntity for LoginModel {
    const STATE_KEY: &'static str = "login";
}

impl LoginModel {
    pub fn new(chat_id: i64, handshake: &AuthHandshake) -> Self {
        Self {
            chat_id,
            captcha_required: handshake.captcha,
            captcha_image: handshake.captcha_image.clone(),
            ..Self::default()
        }
    }

    /// Fields this attempt never asks for
    pub fn skips(&self, field: LoginField) -> bool {
        field == LoginField::Captcha && !self.captcha_required
    }

    pub fn validate(&self, field: LoginField, input: &str) -> FieldResult<String> {
        match field {
            LoginField::Username => validation::username(input),
            LoginField::Password => validation::password(input),
            LoginField::Captcha => validation::captcha(input),
        }
    }

    pub fn set_field(&mut self, field: LoginField, value: String) {
        match field {
            LoginField::Username => self.username = Some(value),
            LoginField::Password => self.password = Some(value),
            LoginField::Captcha => self.captcha = Some(value),
        }
    }

    /// The login payload, once every required field is present
    pub fn request(&self) -> Option<LoginRequest> {
        let captcha = match (self.captcha_required, &self.captcha) {
            (true, None) => return None,
            (true, Some(c)) => Some(c.clone()),
            (false, _) => None,
        };
        Some(LoginRequest {
            username: self.username.clone()?,
            password: self.password.clone()?,
            captcha,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_requires_captcha_when_flagged() {
        let handshake = AuthHandshake {
            captcha: true,
            ..AuthHandshake::default()
        };
        let mut model = LoginModel::new(5, &handshake);
        model.set_field(LoginField::Username, "validuser1".into());
        model.set_field(LoginField::Password, "secret1".into());
        assert!(model.request().is_none());

        model.set_field(LoginField::Captcha, "x7k2".into());
        let request = model.request().unwrap();
        assert_eq!(request.captcha.as_deref(), Some("x7k2"));
    }

    #[test]
    fn test_captcha_skipped_when_not_required() {
        let model = LoginModel::new(5, &AuthHandshake::default());
        assert!(model.skips(LoginField::Captcha));
        assert!(!model.skips(LoginField::Password));
    }
}
