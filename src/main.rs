use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use otpbot::backend::OtpClient;
use otpbot::cli::{Cli, Commands};
use otpbot::core::{config, init_logger, log_configuration, FlowSettings};
use otpbot::flow::FlowDeps;
use otpbot::storage::{RedisStore, SessionStore};
use otpbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TeloxideTransport};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, session store, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics inside handler tasks instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // .env must be loaded before any config value is read
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { drop_pending }) => run_bot(drop_pending).await,
        Some(Commands::Check) => run_check().await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(false).await
        }
    }
}

/// Connects to the session store with the configured expiry
async fn connect_store() -> Result<Arc<dyn SessionStore>> {
    let store = RedisStore::connect(&config::REDIS_URL, *config::session::TTL_SECS)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to session store: {}", e))?;
    Ok(Arc::new(store))
}

/// Verifies that redis and the OTP backend answer
async fn run_check() -> Result<()> {
    log_configuration();

    let store = connect_store().await?;
    drop(store);
    log::info!("Session store: OK");

    let client = OtpClient::new(config::OTP_HOST.as_str())?;
    let status = client
        .ping()
        .await
        .map_err(|e| anyhow::anyhow!("OTP backend unreachable: {}", e))?;
    log::info!("OTP backend: HTTP {}", status);

    Ok(())
}

/// Runs the bot with long polling until Ctrl+C
async fn run_bot(drop_pending: bool) -> Result<()> {
    log::info!("Starting bot...");
    log_configuration();

    let store = connect_store().await?;
    let client = OtpClient::new(config::OTP_HOST.as_str())?;
    let bot = create_bot()?;

    let me = bot.get_me().await?;
    log::info!("Authorized as @{}", me.username());

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let flow = FlowDeps {
        store,
        transport: Arc::new(TeloxideTransport::new(bot.clone())),
        client,
        settings: Arc::new(FlowSettings::from_env()),
    };
    let handler = schema(HandlerDeps::new(flow, me.id.0));

    let listener = if drop_pending {
        Polling::builder(bot.clone()).drop_pending_updates().build()
    } else {
        Polling::builder(bot.clone()).build()
    };

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
