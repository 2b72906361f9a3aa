//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{HandlerDeps, HandlerError, HandlerResult};
use crate::flow::{self, Inbound};
use crate::telegram::bot::Command;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same schema is used in production and can be used in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

/// Runs one update through the flows; store failures surface to the dispatcher
async fn run(deps: &HandlerDeps, inbound: Option<Inbound>) -> HandlerResult {
    let Some(inbound) = inbound else {
        return Ok(());
    };
    flow::dispatch(&deps.flow, inbound).await?;
    Ok(())
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(move |msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::debug!("Command {:?} in chat {}", cmd, msg.chat.id);
                run(&deps, deps.command_inbound(&msg, cmd.into())).await
            }
        })
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |msg: Message| {
        let deps = deps.clone();
        async move { run(&deps, deps.message_inbound(&msg)).await }
    })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            log::debug!("Callback {:?} from user {}", q.data, q.from.id);
            run(&deps, deps.callback_inbound(&q)).await
        }
    })
}
