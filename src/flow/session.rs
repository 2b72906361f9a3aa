//! Menus and session lifecycle: start, cancel, logout, teardown

use super::context::FlowContext;
use super::fsm::ConversationState;
use super::guards;
use crate::backend::types::{SupportChannel, TransactionHistory, UserBank};
use crate::core::AppResult;
use crate::state::{Entity, Ledgered, LoginModel, MenuModel, Presentation, RegisterModel, UserModel};
use crate::telegram::{keyboards, messages};

/// Renders the guest or logged-in menu and retires menus it replaces
pub async fn show_menu(ctx: &mut FlowContext, user: Option<&UserModel>, notice: Option<&str>) -> AppResult<()> {
    ctx.answer(None).await;
    let settings = ctx.settings();
    let (presentation, text, keyboard, cap) = match user.filter(|u| u.authenticated) {
        Some(user) => (
            Presentation::User,
            messages::user_menu(&settings.site_name, user, notice),
            keyboards::user_menu(),
            settings.user_menu_cap,
        ),
        None => (
            Presentation::Guest,
            messages::guest_menu(&settings.site_name, notice),
            keyboards::guest_menu(),
            settings.guest_menu_cap,
        ),
    };

    let message_id = ctx.send(&text, Some(keyboard)).await?;
    let mut menu = ctx.scope.load_or_default::<MenuModel>().await?;
    let stale = menu.update(|m| m.record(presentation, message_id, cap));
    menu.flush().await?;
    ctx.delete_quietly(&stale).await;
    Ok(())
}

/// Loads the session only if it is still marked authenticated
pub async fn load_user(ctx: &FlowContext) -> AppResult<Option<Entity<UserModel>>> {
    Ok(ctx.scope.load::<UserModel>().await?.filter(|u| u.authenticated))
}

/// Shows the menu matching whatever session is stored
pub async fn show_current_menu(ctx: &mut FlowContext, notice: Option<&str>) -> AppResult<()> {
    let user = load_user(ctx).await?;
    show_menu(ctx, user.as_ref().map(|u| u.get()), notice).await
}

/// Wipes the session, its messages and cookies; the position becomes idle
pub async fn teardown(ctx: &mut FlowContext, user: Entity<UserModel>) -> AppResult<()> {
    let mut ledger = user.get().clone().drain_ledgers();
    let report = ledger.flush(ctx.transport(), ctx.chat_id()).await;
    log::info!("Session of {} torn down ({:?})", ctx.scope.id(), report);
    user.clear().await?;
    ctx.backend.forget_cookies();
    ctx.set_state(ConversationState::Idle);
    Ok(())
}

/// Deletes any unfinished login or registration
pub async fn discard_guest_flows(ctx: &FlowContext) -> AppResult<()> {
    if let Some(login) = ctx.scope.load::<LoginModel>().await? {
        ctx.retire(login).await?;
    }
    if let Some(register) = ctx.scope.load::<RegisterModel>().await? {
        ctx.retire(register).await?;
    }
    Ok(())
}

/// Ends the action or add-bank flow embedded in the session, if any
///
/// The stored session keeps both flows until their messages are deleted,
/// so an interrupted cleanup leaves the ids for the next one.
pub async fn end_account_flows(ctx: &FlowContext, user: &mut Entity<UserModel>) -> AppResult<()> {
    user.flush().await?;
    if user.action.is_none() && user.add_bank.is_none() {
        return Ok(());
    }

    if let Some(action) = user.action.as_ref() {
        let report = action.ledger.clone().flush(ctx.transport(), ctx.chat_id()).await;
        log::info!("Ended {} for {} ({:?})", action.kind(), ctx.scope.id(), report);
    }
    if let Some(add_bank) = user.add_bank.as_ref() {
        add_bank.ledger.clone().flush(ctx.transport(), ctx.chat_id()).await;
    }

    user.update(|u| {
        u.take_action();
        u.take_add_bank();
    });
    user.flush().await?;
    Ok(())
}

/// `/start`: drop whatever was in progress and show the menu
pub async fn start(ctx: &mut FlowContext) -> AppResult<()> {
    discard_guest_flows(ctx).await?;
    match load_user(ctx).await? {
        Some(mut user) => {
            end_account_flows(ctx, &mut user).await?;
            user.flush().await?;
            ctx.set_state(ConversationState::MainMenu);
            show_menu(ctx, Some(user.get()), None).await
        }
        None => {
            ctx.set_state(ConversationState::Idle);
            show_menu(ctx, None, None).await
        }
    }
}

/// Cancel is accepted from any state and never calls the backend
pub async fn cancel(ctx: &mut FlowContext) -> AppResult<()> {
    let state = ctx.current_state();
    let notice = match state {
        ConversationState::Idle | ConversationState::MainMenu => messages::NOTHING_TO_CANCEL,
        _ => messages::CANCELLED,
    };
    log::info!("{} cancelled {:?}", ctx.scope.id(), state);

    if state.is_guest_flow() {
        discard_guest_flows(ctx).await?;
    }
    match load_user(ctx).await? {
        Some(mut user) => {
            end_account_flows(ctx, &mut user).await?;
            if let Some(id) = ctx.inbound.user_message_id() {
                user.update(|u| u.ledger_mut().append(id));
            }
            user.flush().await?;
            ctx.set_state(ConversationState::MainMenu);
            show_menu(ctx, Some(user.get()), Some(notice)).await
        }
        None => {
            ctx.set_state(ConversationState::Idle);
            show_menu(ctx, None, Some(notice)).await
        }
    }
}

pub async fn logout(ctx: &mut FlowContext) -> AppResult<()> {
    let Some(user) = load_user(ctx).await? else {
        ctx.set_state(ConversationState::Idle);
        return show_menu(ctx, None, None).await;
    };
    let response = ctx.backend.logout().await;
    if response.is_error() && !response.is_authentication_error() {
        log::warn!(
            "Backend logout for {} failed: {}",
            ctx.scope.id(),
            response.error_message()
        );
    }
    teardown(ctx, user).await?;
    show_menu(ctx, None, Some(messages::LOGGED_OUT)).await
}

/// Lists the user's registered bank accounts
pub async fn accounts(ctx: &mut FlowContext) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    ctx.answer(None).await;
    let response = ctx.backend.list_bank_accounts().await;
    let text = if response.is_success() {
        let banks = response.data_as::<Vec<UserBank>>().unwrap_or_else(|e| {
            log::warn!("Undecodable account list for {}: {}", ctx.scope.id(), e);
            Vec::new()
        });
        messages::account_list(&banks)
    } else {
        messages::backend_error(&response)
    };
    let message_id = ctx.send(&text, None).await?;
    user.update(|u| u.ledger.append(message_id));
    user.flush().await?;
    Ok(())
}

/// Lists recent deposits and withdrawals
pub async fn history(ctx: &mut FlowContext) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    ctx.answer(None).await;
    let response = ctx.backend.transaction_history().await;
    let (text, keyboard) = if response.is_success() {
        let history = response.data_as::<TransactionHistory>().unwrap_or_else(|e| {
            log::warn!("Undecodable transaction history for {}: {}", ctx.scope.id(), e);
            TransactionHistory::default()
        });
        (messages::transaction_history(&history.transactions), Some(keyboards::close_only()))
    } else {
        (messages::backend_error(&response), None)
    };
    let message_id = ctx.send(&text, keyboard).await?;
    user.update(|u| u.ledger.append(message_id));
    user.flush().await?;
    Ok(())
}

/// Support channels; open to guests too
pub async fn support(ctx: &mut FlowContext) -> AppResult<()> {
    ctx.answer(None).await;
    let response = ctx.backend.support_channels().await;
    let (text, keyboard) = if response.is_success() {
        let channels = response.data_as::<Vec<SupportChannel>>().unwrap_or_else(|e| {
            log::warn!("Undecodable support channels for {}: {}", ctx.scope.id(), e);
            Vec::new()
        });
        (messages::support(&channels), keyboards::support(&channels))
    } else {
        (messages::backend_error(&response), keyboards::close_only())
    };
    let message_id = ctx.send(&text, Some(keyboard)).await?;
    if let Some(mut user) = load_user(ctx).await? {
        user.update(|u| {
            if let Some(id) = ctx.inbound.user_message_id() {
                u.ledger_mut().append(id);
            }
            u.ledger.append(message_id);
        });
        user.flush().await?;
    }
    Ok(())
}

/// Deletes the message carrying a close button
pub async fn close_message(ctx: &mut FlowContext) -> AppResult<()> {
    ctx.answer(None).await;
    let Some(message_id) = ctx.inbound.message_id else {
        return Ok(());
    };
    ctx.delete_quietly(&[message_id]).await;
    if let Some(mut user) = load_user(ctx).await? {
        if user.ledger.contains(message_id) {
            user.update(|u| u.ledger.remove(message_id));
            user.flush().await?;
        }
    }
    Ok(())
}

/// Free text or stale buttons while nothing is in progress
pub async fn idle_input(ctx: &mut FlowContext) -> AppResult<()> {
    if ctx.inbound.callback_id().is_some() {
        ctx.answer(Some(messages::STALE_BUTTON)).await;
        return Ok(());
    }
    show_current_menu(ctx, Some(messages::USE_MENU)).await
}

/// Answers a button that does not belong to the current step
pub async fn stale_button(ctx: &mut FlowContext) -> AppResult<()> {
    ctx.answer(Some(messages::STALE_BUTTON)).await;
    Ok(())
}
