//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command list registration in the Telegram UI

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::flow::Intent;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the main menu")]
    Start,
    #[command(description = "cancel the current step")]
    Cancel,
    #[command(description = "log in to your account")]
    Login,
    #[command(description = "create a new account")]
    Register,
    #[command(description = "make a deposit")]
    Deposit,
    #[command(description = "request a withdrawal")]
    Withdraw,
    #[command(description = "list your bank accounts")]
    Accounts,
    #[command(description = "add a bank account")]
    Addbank,
    #[command(description = "show recent deposits and withdrawals")]
    History,
    #[command(description = "browse and play games")]
    Games,
    #[command(description = "contact support")]
    Support,
    #[command(description = "log out")]
    Logout,
}

impl From<Command> for Intent {
    fn from(command: Command) -> Self {
        match command {
            Command::Start => Intent::Start,
            Command::Cancel => Intent::Cancel,
            Command::Login => Intent::Login,
            Command::Register => Intent::Register,
            Command::Deposit => Intent::Deposit,
            Command::Withdraw => Intent::Withdraw,
            Command::Accounts => Intent::Accounts,
            Command::Addbank => Intent::AddBank,
            Command::History => Intent::History,
            Command::Games => Intent::Games,
            Command::Support => Intent::Support,
            Command::Logout => Intent::Logout,
        }
    }
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token or invalid API URL
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN is not set");
    }
    let client = ClientBuilder::new().timeout(config::telegram::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    match config::telegram::API_URL.as_deref() {
        Some(api_url) => {
            log::info!("Using custom Bot API URL: {}", api_url);
            let url = url::Url::parse(api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            Ok(bot.set_api_url(url))
        }
        None => Ok(bot),
    }
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands = Command::bot_commands();
    log::debug!("Registering {} bot commands", commands.len());
    bot.set_my_commands(commands).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_descriptions() {
        let descriptions = Command::descriptions().to_string();
        assert!(descriptions.contains("Available commands"));
        assert!(descriptions.contains("/deposit"));
        assert!(descriptions.contains("/addbank"));
        assert!(descriptions.contains("/history"));
        assert!(descriptions.contains("/games"));
    }

    #[test]
    fn test_commands_parse_to_intents() {
        let command = Command::parse("/withdraw", "otp_bot").unwrap();
        assert_eq!(Intent::from(command), Intent::Withdraw);
        assert_eq!(Intent::from(Command::Addbank), Intent::AddBank);
        assert_eq!(Intent::from(Command::Support), Intent::Support);
    }
}
