//! Game catalogue: categories, provider filter, paged lists, search and launch links
//!
//! Browsing edits the pressed message in place. The menu, search results and
//! launch links are new messages and land in the session ledger.

use super::callback::Callback;
use super::context::FlowContext;
use super::fsm::ConversationState;
use super::{guards, session};
use crate::backend::types::{GameLaunch, GameLaunchRequest, GamePage, GameProviders, GameType};
use crate::backend::ApiResponse;
use crate::core::validation::{self, FieldError};
use crate::core::AppResult;
use crate::state::{Entity, UserModel};
use crate::telegram::transport::Keyboard;
use crate::telegram::{keyboards, messages};

/// `/games`: the category picker
pub async fn menu(ctx: &mut FlowContext) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    ctx.answer(None).await;
    let message_id = ctx.send(messages::GAME_MENU, Some(keyboards::game_menu())).await?;
    user.update(|u| u.ledger.append(message_id));
    user.flush().await?;
    Ok(())
}

/// Catalogue buttons, accepted whatever flow is in progress
pub async fn on_callback(ctx: &mut FlowContext, callback: Callback) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    match callback {
        Callback::GameMenu => {
            ctx.answer(None).await;
            replace(ctx, &mut user, messages::GAME_MENU, keyboards::game_menu()).await?;
        }
        Callback::GameProviders(kind) => providers(ctx, &mut user, kind).await?,
        Callback::GameList { kind, provider, page } => list(ctx, &mut user, kind, provider, page).await?,
        Callback::GameSearch => return ask_search(ctx, user).await,
        Callback::GameSearchPage(page) => match user.game_search.clone() {
            Some(text) => search(ctx, &mut user, &text, page).await?,
            None => session::stale_button(ctx).await?,
        },
        Callback::GameLaunch { provider, code } => launch(ctx, &mut user, provider, code).await?,
        _ => session::stale_button(ctx).await?,
    }
    user.flush().await?;
    Ok(())
}

/// Text sent while a search is awaited
pub async fn on_search_input(ctx: &mut FlowContext) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    if ctx.inbound.callback().is_some() {
        user.flush().await?;
        return session::stale_button(ctx).await;
    }
    let result = ctx
        .inbound
        .text()
        .ok_or(FieldError::Empty { field: "Search" })
        .and_then(validation::game_search);
    match result {
        Ok(text) => {
            ctx.set_state(ConversationState::MainMenu);
            user.update(|u| u.game_search = Some(text.clone()));
            search(ctx, &mut user, &text, 1).await?;
        }
        Err(e) => {
            let message_id = ctx.send(&messages::game_search_prompt(Some(&e)), Some(keyboards::cancel_only())).await?;
            user.update(|u| u.ledger.append(message_id));
        }
    }
    user.flush().await?;
    Ok(())
}

async fn ask_search(ctx: &mut FlowContext, mut user: Entity<UserModel>) -> AppResult<()> {
    ctx.answer(None).await;
    session::end_account_flows(ctx, &mut user).await?;
    let message_id = ctx
        .send(&messages::game_search_prompt(None), Some(keyboards::cancel_only()))
        .await?;
    user.update(|u| u.ledger.append(message_id));
    user.flush().await?;
    ctx.set_state(ConversationState::GameSearch);
    Ok(())
}

async fn providers(ctx: &mut FlowContext, user: &mut Entity<UserModel>, kind: GameType) -> AppResult<()> {
    let response = ctx.backend.list_game_providers(kind).await;
    let Some(reply) = decode::<GameProviders>(ctx, &response).await else {
        return Ok(());
    };
    ctx.answer(None).await;
    let keyboard = keyboards::game_providers(kind, &reply.providers);
    replace(ctx, user, &messages::game_providers(kind), keyboard).await
}

async fn list(
    ctx: &mut FlowContext,
    user: &mut Entity<UserModel>,
    kind: GameType,
    provider: Option<String>,
    page: u32,
) -> AppResult<()> {
    let response = ctx.backend.list_games(kind, provider.as_deref(), page).await;
    let Some(reply) = decode::<GamePage>(ctx, &response).await else {
        return Ok(());
    };
    ctx.answer(None).await;
    let last_page = reply.pagination.last_page;
    let provider_name = reply.provider_name.as_deref().or(provider.as_deref());
    let text = messages::game_list(kind, provider_name, page, last_page);
    let games: Vec<_> = reply.games().collect();
    let keyboard = keyboards::game_list(kind, provider.as_deref(), &games, page, reply.pagination);
    replace(ctx, user, &text, keyboard).await
}

/// Shows one page of search results: page 1 as a new message, later pages in place
async fn search(ctx: &mut FlowContext, user: &mut Entity<UserModel>, text: &str, page: u32) -> AppResult<()> {
    let response = ctx.backend.search_games(text, page).await;
    if response.is_error() {
        let message_id = ctx.send(&messages::backend_error(&response), None).await?;
        user.update(|u| u.ledger.append(message_id));
        return Ok(());
    }
    let reply = decode_or_default::<GamePage>(ctx, &response);
    ctx.answer(None).await;

    if reply.pagination.total == 0 && reply.games().next().is_none() {
        let message_id = ctx.send(&messages::game_search_empty(text), None).await?;
        user.update(|u| u.ledger.append(message_id));
        return Ok(());
    }
    let games: Vec<_> = reply.games().collect();
    let body = messages::game_search_results(text, page, reply.pagination.last_page);
    let keyboard = keyboards::game_search_results(&games, page, reply.pagination);
    if page > 1 {
        return replace(ctx, user, &body, keyboard).await;
    }
    let message_id = ctx.send(&body, Some(keyboard)).await?;
    user.update(|u| u.ledger.append(message_id));
    Ok(())
}

async fn launch(ctx: &mut FlowContext, user: &mut Entity<UserModel>, provider: String, code: String) -> AppResult<()> {
    let request = GameLaunchRequest {
        game_code: code,
        provider_id: provider,
    };
    let response = ctx.backend.launch_game(&request).await;
    let target = response
        .is_success()
        .then(|| response.data_as::<GameLaunch>())
        .and_then(Result::ok)
        .filter(|g| url::Url::parse(&g.game_url).is_ok());
    let Some(game) = target else {
        log::info!(
            "Launch of {}/{} for {} refused: {}",
            request.provider_id,
            request.game_code,
            ctx.scope.id(),
            response.error_message()
        );
        ctx.notify(messages::GAME_UNAVAILABLE).await?;
        return Ok(());
    };
    ctx.answer(None).await;
    let name = if game.game_name.is_empty() {
        request.game_code.as_str()
    } else {
        game.game_name.as_str()
    };
    let message_id = ctx
        .send(&messages::game_launch(name), Some(keyboards::game_launch(&game.game_url)))
        .await?;
    user.update(|u| u.ledger.append(message_id));
    Ok(())
}

/// Edits the pressed message, tracking its replacement if it had vanished
async fn replace(ctx: &FlowContext, user: &mut Entity<UserModel>, text: &str, keyboard: Keyboard) -> AppResult<()> {
    let pressed = ctx.inbound.message_id;
    let shown = ctx.show(pressed, text, Some(keyboard)).await?;
    if Some(shown) != pressed {
        user.update(|u| u.ledger.append(shown));
    }
    Ok(())
}

/// Decodes a catalogue reply; a rejection becomes a toast and `None`
async fn decode<T: serde::de::DeserializeOwned + Default>(ctx: &mut FlowContext, response: &ApiResponse) -> Option<T> {
    if response.is_error() {
        let notice = response.error_message().to_string();
        if let Err(e) = ctx.notify(&notice).await {
            log::warn!("Could not report a catalogue error to {}: {}", ctx.scope.id(), e);
        }
        return None;
    }
    Some(decode_or_default(ctx, response))
}

fn decode_or_default<T: serde::de::DeserializeOwned + Default>(ctx: &FlowContext, response: &ApiResponse) -> T {
    response.data_as::<T>().unwrap_or_else(|e| {
        log::warn!("Undecodable catalogue reply for {}: {}", ctx.scope.id(), e);
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_buttons_are_recognised() {
        assert!(Callback::GameSearchPage(2).is_catalogue());
        assert!(Callback::GameProviders(GameType::Arcade).is_catalogue());
        assert!(!Callback::Close.is_catalogue());
        assert!(!Callback::DepositSubmit.is_catalogue());
    }
}
