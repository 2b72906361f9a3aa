//! Conversation flows
//!
//! [`dispatch`] is the single entry point for an inbound update: guards
//! first, then intents (commands and menu buttons), then the handler for
//! the current conversation state.

pub mod add_bank;
pub mod callback;
pub mod context;
pub mod deposit;
pub mod fsm;
pub mod games;
pub mod guards;
pub mod input;
pub mod login;
pub mod register;
pub mod session;
pub mod withdraw;

pub use callback::Callback;
pub use context::{FlowContext, FlowDeps};
pub use fsm::ConversationState;
pub use input::{Inbound, Input, Intent};

use crate::core::AppResult;
use crate::telegram::messages;

/// Runs one update to completion.
///
/// Flow errors are logged and answered with a generic message; only a
/// failure to load the conversation itself is returned.
pub async fn dispatch(deps: &FlowDeps, inbound: Inbound) -> AppResult<()> {
    if !guards::admits(&deps.settings, &inbound) {
        return Ok(());
    }
    let mut ctx = FlowContext::open(deps, inbound).await?;

    if let Err(e) = route(&mut ctx).await {
        log::error!(
            "Flow error for {} in {:?}: {}",
            ctx.scope.id(),
            ctx.current_state(),
            e
        );
        if let Err(e) = ctx.notify(messages::GENERIC_ERROR).await {
            log::warn!("Could not report the error to {}: {}", ctx.scope.id(), e);
        }
    }
    ctx.close().await
}

async fn route(ctx: &mut FlowContext) -> AppResult<()> {
    if !guards::verify_contact(ctx).await? {
        return Ok(());
    }

    if let Some(intent) = ctx.inbound.intent() {
        log::debug!("{} -> {}", ctx.scope.id(), intent);
        return match intent {
            Intent::Start => session::start(ctx).await,
            Intent::Cancel => session::cancel(ctx).await,
            Intent::Login => login::begin(ctx).await,
            Intent::Register => register::begin(ctx).await,
            Intent::Deposit => deposit::begin(ctx).await,
            Intent::Withdraw => withdraw::begin(ctx).await,
            Intent::AddBank => add_bank::begin(ctx).await,
            Intent::Accounts => session::accounts(ctx).await,
            Intent::History => session::history(ctx).await,
            Intent::Games => games::menu(ctx).await,
            Intent::Support => session::support(ctx).await,
            Intent::Logout => session::logout(ctx).await,
        };
    }
    if matches!(ctx.inbound.input, Input::UnknownCallback { .. }) {
        return session::stale_button(ctx).await;
    }
    match ctx.inbound.callback().cloned() {
        Some(Callback::Close) => return session::close_message(ctx).await,
        Some(callback) if callback.is_catalogue() => return games::on_callback(ctx, callback).await,
        _ => {}
    }

    match ctx.current_state() {
        ConversationState::Idle | ConversationState::MainMenu => session::idle_input(ctx).await,
        ConversationState::Login(step) => login::on_input(ctx, step).await,
        ConversationState::Register(step) => register::on_input(ctx, step).await,
        ConversationState::Deposit(step) => deposit::on_input(ctx, step).await,
        ConversationState::Withdraw(step) => withdraw::on_input(ctx, step).await,
        ConversationState::AddBank(step) => add_bank::on_input(ctx, step).await,
        ConversationState::GameSearch => games::on_search_input(ctx).await,
    }
}
