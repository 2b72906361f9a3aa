//! Checks that run before a flow handler sees an update
//!
//! Order: whitelist, private chat, contact verification, then either the
//! flow loader or the authentication guard.

use super::context::FlowContext;
use super::fsm::ConversationState;
use super::input::{Inbound, Input};
use super::session;
use crate::backend::types::Profile;
use crate::core::{AppResult, FlowSettings};
use crate::state::{Entity, Ledgered, StatefulEntity, TelegramData, UserModel};
use crate::telegram::transport::Keyboard;
use crate::telegram::{keyboards, messages};

/// Whitelist and private-chat checks; rejected updates are dropped silently
pub fn admits(settings: &FlowSettings, inbound: &Inbound) -> bool {
    if !settings.is_whitelisted(inbound.user_id) {
        log::debug!("Ignoring user {} outside the whitelist", inbound.user_id);
        return false;
    }
    if settings.require_private_chat && !inbound.private_chat {
        log::debug!("Ignoring update from non-private chat {}", inbound.chat_id);
        return false;
    }
    true
}

/// Returns `true` when the update may continue to a flow handler.
///
/// A shared contact is consumed here: the user's own contact is stored,
/// anyone else's is refused.
pub async fn verify_contact(ctx: &mut FlowContext) -> AppResult<bool> {
    if !ctx.settings().require_contact {
        return Ok(true);
    }
    let mut data = ctx.scope.load_or_default::<TelegramData>().await?;

    if let Input::Contact { phone_number, owner } = &ctx.inbound.input {
        if *owner != Some(ctx.inbound.user_id) {
            ctx.send(messages::CONTACT_NOT_OWN, Some(keyboards::request_contact()))
                .await?;
            return Ok(false);
        }
        let phone_number = phone_number.clone();
        data.update(|d| d.verify_contact(&phone_number));
        data.flush().await?;
        log::info!("Contact verified for {}", ctx.scope.id());
        ctx.send(messages::CONTACT_SAVED, Some(Keyboard::Remove)).await?;
        session::show_current_menu(ctx, None).await?;
        return Ok(false);
    }

    if data.contact_verified {
        return Ok(true);
    }
    ctx.answer(None).await;
    ctx.send(messages::ASK_CONTACT, Some(keyboards::request_contact()))
        .await?;
    Ok(false)
}

/// Loads the model a step handler needs and records the inbound message
/// in its ledger.
///
/// When the model is gone the position is reset and the user is asked to
/// start over; the handler must not run.
pub async fn load_flow<T: StatefulEntity + Ledgered>(ctx: &mut FlowContext) -> AppResult<Option<Entity<T>>> {
    match ctx.scope.load::<T>().await? {
        Some(mut entity) => {
            if let Some(id) = ctx.inbound.user_message_id() {
                entity.update(|m| m.ledger_mut().append(id));
            }
            Ok(Some(entity))
        }
        None => {
            log::info!(
                "No '{}' flow for {} in {:?}, asking to restart",
                T::STATE_KEY,
                ctx.scope.id(),
                ctx.current_state()
            );
            restart(ctx).await?;
            Ok(None)
        }
    }
}

/// Resets the position and shows the menu with a restart notice
pub async fn restart(ctx: &mut FlowContext) -> AppResult<()> {
    let user = session::load_user(ctx).await?;
    ctx.set_state(if user.is_some() {
        ConversationState::MainMenu
    } else {
        ConversationState::Idle
    });
    if let Some(id) = ctx.inbound.user_message_id() {
        ctx.delete_quietly(&[id]).await;
    }
    session::show_menu(ctx, user.as_ref().map(|u| u.get()), Some(messages::RESTART_FLOW)).await
}

/// Revalidates the session against the backend and refreshes the profile.
///
/// Returns `None` when the handler must not run: no session, an expired
/// one (already torn down and redirected), or a backend failure the user
/// has been told about.
pub async fn authenticate(ctx: &mut FlowContext) -> AppResult<Option<Entity<UserModel>>> {
    let Some(mut user) = session::load_user(ctx).await? else {
        ctx.set_state(ConversationState::Idle);
        session::show_menu(ctx, None, Some(messages::LOGIN_REQUIRED)).await?;
        return Ok(None);
    };

    let response = ctx.backend.me().await;
    if response.is_authentication_error() {
        log::info!("Backend session of {} expired", ctx.scope.id());
        if let Some(id) = ctx.inbound.user_message_id() {
            user.update(|u| u.ledger_mut().append(id));
        }
        session::teardown(ctx, user).await?;
        session::show_menu(ctx, None, Some(messages::SESSION_EXPIRED)).await?;
        return Ok(None);
    }
    if response.is_error() {
        let text = messages::backend_error(&response);
        ctx.answer(None).await;
        let message_id = ctx.send(&text, None).await?;
        user.update(|u| u.ledger_mut().append(message_id));
        user.flush().await?;
        return Ok(None);
    }

    match response.data_as::<Profile>() {
        Ok(profile) => user.update(|u| u.apply_profile(&profile)),
        Err(e) => log::warn!("Undecodable profile for {}: {}", ctx.scope.id(), e),
    }
    if let Some(id) = ctx.inbound.user_message_id() {
        user.update(|u| u.ledger_mut().append(id));
    }
    Ok(Some(user))
}
