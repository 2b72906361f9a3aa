//! Logging initialization and startup diagnostics

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    // teloxide and reqwest are chatty at debug level
    let config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Info, config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at startup (no secrets)
pub fn log_configuration() {
    log::info!("OTP backend: {}", *config::OTP_HOST);
    log::info!("Session store: {}", redact_url(&config::REDIS_URL));
    log::info!(
        "Save debounce: {}ms, session TTL: {}",
        *config::session::SAVE_DEBOUNCE_MS,
        config::session::TTL_SECS
            .map(|s| format!("{}s", s))
            .unwrap_or_else(|| "none".to_string())
    );
    if config::access::WHITELIST_IDS.is_empty() {
        log::info!("Whitelist: disabled");
    } else {
        log::info!("Whitelist: {} user(s)", config::access::WHITELIST_IDS.len());
    }
    if config::BOT_TOKEN.is_empty() {
        log::warn!("BOT_TOKEN is not set");
    }
}

/// Strips credentials from a connection URL before it is logged
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}
