use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot
/// Telegram bot token
/// Read from BOT_TOKEN (falls back to TELOXIDE_TOKEN)
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Base URL of the OTP backend
/// Read from OTP_HOST environment variable
/// Default: http://localhost:9000
pub static OTP_HOST: Lazy<String> =
    Lazy::new(|| env::var("OTP_HOST").unwrap_or_else(|_| "http://localhost:9000".to_string()));

/// Redis connection string for the session store
/// Read from REDIS_URL environment variable
/// Default: redis://127.0.0.1:6379/0
pub static REDIS_URL: Lazy<String> =
    Lazy::new(|| env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string()));

/// Display name used in menus and greetings
/// Read from SITE_NAME environment variable
pub static SITE_NAME: Lazy<String> = Lazy::new(|| env::var("SITE_NAME").unwrap_or_else(|_| "OTP".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: otpbot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "otpbot.log".to_string()));

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Backend HTTP client configuration
pub mod backend {
    use super::*;

    /// Request timeout in seconds
    /// Read from OTP_TIMEOUT_SECS environment variable
    pub static REQUEST_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| env_u64("OTP_TIMEOUT_SECS", 30));

    /// User agent sent with every backend request
    pub const USER_AGENT: &str = "OTP-Telegram-Bot/1.0";

    /// Returns the request timeout as Duration
    pub fn timeout() -> Duration {
        Duration::from_secs(*REQUEST_TIMEOUT_SECS)
    }
}

/// Telegram Bot API client configuration
pub mod telegram {
    use super::*;

    /// Read from TELEGRAM_TIMEOUT_SECS environment variable
    pub static REQUEST_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| env_u64("TELEGRAM_TIMEOUT_SECS", 60));

    /// Optional self-hosted Bot API server
    pub static API_URL: Lazy<Option<String>> = Lazy::new(|| env::var("BOT_API_URL").ok().filter(|v| !v.is_empty()));

    pub fn timeout() -> Duration {
        Duration::from_secs(*REQUEST_TIMEOUT_SECS)
    }
}

/// Session persistence configuration
pub mod session {
    use super::*;

    /// Debounce window for automatic snapshot saves, in milliseconds
    /// Read from SAVE_DEBOUNCE_MS environment variable
    pub static SAVE_DEBOUNCE_MS: Lazy<u64> = Lazy::new(|| env_u64("SAVE_DEBOUNCE_MS", 500));

    /// Optional expiry applied by the store to every snapshot
    /// Read from SESSION_TTL_SECS environment variable (unset = no expiry)
    pub static TTL_SECS: Lazy<Option<u64>> =
        Lazy::new(|| env::var("SESSION_TTL_SECS").ok().and_then(|v| v.trim().parse().ok()));

    /// How many logged-in menu messages stay visible in a chat
    pub static USER_MENU_CAP: Lazy<usize> = Lazy::new(|| env_u64("USER_MENU_CAP", 2) as usize);

    /// How many guest menu messages stay visible in a chat
    pub static GUEST_MENU_CAP: Lazy<usize> = Lazy::new(|| env_u64("GUEST_MENU_CAP", 5) as usize);

    pub fn debounce() -> Duration {
        Duration::from_millis(*SAVE_DEBOUNCE_MS)
    }
}

/// Access control configuration
pub mod access {
    use super::*;

    fn parse_ids(raw: &str) -> Vec<u64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<u64>().ok())
            .collect()
    }

    /// Telegram user IDs allowed to talk to the bot (empty = everyone)
    /// Read from WHITELIST_IDS environment variable
    pub static WHITELIST_IDS: Lazy<Vec<u64>> = Lazy::new(|| {
        env::var("WHITELIST_IDS")
            .ok()
            .map(|raw| parse_ids(&raw))
            .unwrap_or_default()
    });

    /// Ignore updates that do not come from a private chat
    pub static REQUIRE_PRIVATE_CHAT: Lazy<bool> = Lazy::new(|| env_bool("REQUIRE_PRIVATE_CHAT", true));

    /// Ask users to share their contact before using the bot
    pub static REQUIRE_CONTACT: Lazy<bool> = Lazy::new(|| env_bool("REQUIRE_CONTACT", true));

}

/// Deposit bounds and presentation
pub mod deposit {
    use super::*;

    /// Minimum amount for virtual-account deposits
    pub static VA_MIN: Lazy<Option<i64>> = Lazy::new(|| Some(env_u64("DEPOSIT_VA_MIN", 500_000) as i64));

    /// Maximum amount for virtual-account deposits
    pub static VA_MAX: Lazy<Option<i64>> = Lazy::new(|| Some(env_u64("DEPOSIT_VA_MAX", 30_000_000) as i64));

    /// Minimum amount for QRIS deposits (unset = backend minimum)
    pub static QRIS_MIN: Lazy<Option<i64>> =
        Lazy::new(|| env::var("DEPOSIT_QRIS_MIN").ok().and_then(|v| v.trim().parse().ok()));

    /// Maximum amount for QRIS deposits
    pub static QRIS_MAX: Lazy<Option<i64>> = Lazy::new(|| Some(env_u64("DEPOSIT_QRIS_MAX", 10_000_000) as i64));

    /// Number of recently used amounts offered as quick buttons
    pub static RECENT_AMOUNTS: Lazy<usize> = Lazy::new(|| env_u64("RECENT_AMOUNTS", 3) as usize);
}

/// Withdraw defaults used when the backend omits a bound
pub mod withdraw {
    use super::*;

    pub static DEFAULT_MIN: Lazy<i64> = Lazy::new(|| env_u64("WITHDRAW_MIN", 10_000) as i64);
    pub static DEFAULT_MAX: Lazy<i64> = Lazy::new(|| env_u64("WITHDRAW_MAX", 1_000_000) as i64);
    pub static DEFAULT_MULTIPLE: Lazy<i64> = Lazy::new(|| env_u64("WITHDRAW_MULTIPLE", 1_000) as i64);
}
