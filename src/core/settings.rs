//! Runtime settings injected into the conversation layer
//!
//! Built once from the environment-backed statics in [`crate::core::config`]
//! and shared read-only through `HandlerDeps`. Tests build their own with
//! [`FlowSettings::builder`].

use bon::Builder;
use std::time::Duration;

use crate::core::config;

/// Optional amount bounds imposed by a deposit channel
///
/// `None` on either side means "use whatever the backend reported".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelLimits {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl ChannelLimits {
    pub const fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }
}

/// Channel-specific deposit limits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepositLimits {
    pub bank: ChannelLimits,
    pub qris: ChannelLimits,
    pub va: ChannelLimits,
}

/// Withdraw bounds used when the backend omits them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawDefaults {
    pub min: i64,
    pub max: i64,
    pub multiple: i64,
}

impl Default for WithdrawDefaults {
    fn default() -> Self {
        Self {
            min: 10_000,
            max: 1_000_000,
            multiple: 1_000,
        }
    }
}

#[derive(Debug, Clone, Builder)]
pub struct FlowSettings {
    #[builder(into, default = "OTP".to_string())]
    pub site_name: String,

    /// Debounce window for automatic snapshot saves
    #[builder(default = Duration::from_millis(500))]
    pub save_debounce: Duration,

    #[builder(default = 2)]
    pub user_menu_cap: usize,

    #[builder(default = 5)]
    pub guest_menu_cap: usize,

    /// Empty means everyone is allowed
    #[builder(default)]
    pub whitelist: Vec<u64>,

    #[builder(default)]
    pub require_private_chat: bool,

    #[builder(default)]
    pub require_contact: bool,

    #[builder(default)]
    pub deposit_limits: DepositLimits,

    #[builder(default)]
    pub withdraw_defaults: WithdrawDefaults,

    /// How many recently used amounts are remembered per user
    #[builder(default = 3)]
    pub recent_amounts: usize,
}

impl FlowSettings {
    /// Reads every setting from the process environment
    pub fn from_env() -> Self {
        Self {
            site_name: config::SITE_NAME.clone(),
            save_debounce: config::session::debounce(),
            user_menu_cap: *config::session::USER_MENU_CAP,
            guest_menu_cap: *config::session::GUEST_MENU_CAP,
            whitelist: config::access::WHITELIST_IDS.clone(),
            require_private_chat: *config::access::REQUIRE_PRIVATE_CHAT,
            require_contact: *config::access::REQUIRE_CONTACT,
            deposit_limits: DepositLimits {
                bank: ChannelLimits::default(),
                qris: ChannelLimits::new(*config::deposit::QRIS_MIN, *config::deposit::QRIS_MAX),
                va: ChannelLimits::new(*config::deposit::VA_MIN, *config::deposit::VA_MAX),
            },
            withdraw_defaults: WithdrawDefaults {
                min: *config::withdraw::DEFAULT_MIN,
                max: *config::withdraw::DEFAULT_MAX,
                multiple: *config::withdraw::DEFAULT_MULTIPLE,
            },
            recent_amounts: *config::deposit::RECENT_AMOUNTS,
        }
    }

    pub fn is_whitelisted(&self, user_id: u64) -> bool {
        self.whitelist.is_empty() || self.whitelist.contains(&user_id)
    }
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let settings = FlowSettings::builder().build();
        assert_eq!(settings.save_debounce, Duration::from_millis(500));
        assert_eq!(settings.user_menu_cap, 2);
        assert_eq!(settings.guest_menu_cap, 5);
        assert!(!settings.require_contact);
        assert_eq!(settings.withdraw_defaults.multiple, 1_000);
    }

    #[test]
    fn test_whitelist_empty_allows_everyone() {
        let open = FlowSettings::default();
        assert!(open.is_whitelisted(42));

        let closed = FlowSettings::builder().whitelist(vec![7]).build();
        assert!(closed.is_whitelisted(7));
        assert!(!closed.is_whitelisted(42));
    }
}
