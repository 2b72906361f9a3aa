use serde::{Deserialize, Serialize};

use super::entity::StatefulEntity;

/// Per-user data that outlives login sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramData {
    #[serde(default)]
    pub contact_verified: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Most recent first
    #[serde(default)]
    pub recent_deposits: Vec<i64>,
    #[serde(default)]
    pub recent_withdraws: Vec<i64>,
}

impl StatefulEntity for TelegramData {
    const STATE_KEY: &'static str = "telegram_data";
}

impl TelegramData {
    pub fn verify_contact(&mut self, phone_number: &str) {
        self.contact_verified = true;
        self.phone_number = Some(phone_number.trim_start_matches('+').to_string());
    }

    pub fn remember_deposit(&mut self, amount: i64, cap: usize) {
        remember(&mut self.recent_deposits, amount, cap);
    }

    pub fn remember_withdraw(&mut self, amount: i64, cap: usize) {
        remember(&mut self.recent_withdraws, amount, cap);
    }
}

fn remember(list: &mut Vec<i64>, amount: i64, cap: usize) {
    list.retain(|&a| a != amount);
    list.insert(0, amount);
    list.truncate(cap);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_amounts_move_to_front() {
        let mut data = TelegramData::default();
        for amount in [50_000, 100_000, 250_000, 100_000, 75_000] {
            data.remember_deposit(amount, 3);
        }
        assert_eq!(data.recent_deposits, vec![75_000, 100_000, 250_000]);
    }

    #[test]
    fn test_verify_contact_strips_plus() {
        let mut data = TelegramData::default();
        data.verify_contact("+628123");
        assert!(data.contact_verified);
        assert_eq!(data.phone_number.as_deref(), Some("628123"));
    }
}
