//! Login: username, password, optional captcha, then submit

use super::context::FlowContext;
use super::fsm::{ConversationState, LoginField, LoginStep, WizardStep};
use super::guards;
use super::session;
use crate::backend::types::{AuthHandshake, Profile};
use crate::core::validation::FieldError;
use crate::core::AppResult;
use crate::state::{Entity, LoginModel, UserModel};
use crate::telegram::transport::Keyboard;
use crate::telegram::{keyboards, messages};

/// Sends a prompt, as a photo caption when a captcha image goes with it
pub(super) async fn send_prompt(
    ctx: &FlowContext,
    text: &str,
    captcha_image: Option<&str>,
    keyboard: Keyboard,
) -> AppResult<i32> {
    if let Some(url) = captcha_image {
        match ctx.transport().send_photo(ctx.chat_id(), url, text).await {
            Ok(id) => return Ok(id),
            Err(e) => log::warn!("Captcha image {} could not be sent: {}", url, e),
        }
    }
    ctx.send(text, Some(keyboard)).await
}

async fn prompt(
    ctx: &FlowContext,
    login: &mut Entity<LoginModel>,
    field: LoginField,
    error: Option<&FieldError>,
) -> AppResult<()> {
    let text = messages::login_prompt(field, error);
    let image = match field {
        LoginField::Captcha => login.captcha_image.clone(),
        _ => None,
    };
    let message_id = send_prompt(ctx, &text, image.as_deref(), keyboards::cancel_only()).await?;
    login.update(|m| m.ledger.append(message_id));
    Ok(())
}

/// Fetches the backend handshake that opens login and registration
pub(super) async fn handshake(ctx: &mut FlowContext) -> AppResult<Option<AuthHandshake>> {
    let response = ctx.backend.ask_auth().await;
    if response.is_error() {
        log::warn!("ask-auth failed for {}: {}", ctx.scope.id(), response.error_message());
        ctx.answer(None).await;
        ctx.send(&messages::backend_error(&response), None).await?;
        return Ok(None);
    }
    Ok(Some(response.data_as::<AuthHandshake>().unwrap_or_else(|e| {
        log::warn!("Undecodable ask-auth payload: {}", e);
        AuthHandshake::default()
    })))
}

pub async fn begin(ctx: &mut FlowContext) -> AppResult<()> {
    if session::load_user(ctx).await?.is_some() {
        ctx.notify(messages::LOGOUT_FIRST).await?;
        return Ok(());
    }
    session::discard_guest_flows(ctx).await?;
    let Some(handshake) = handshake(ctx).await? else {
        ctx.set_state(ConversationState::Idle);
        return Ok(());
    };
    ctx.answer(None).await;

    let model = LoginModel::new(ctx.chat_id(), &handshake);
    let step = LoginStep::start(|f| model.skips(f));
    let mut login = ctx.scope.create(model);
    if let Some(id) = ctx.inbound.user_message_id() {
        login.update(|m| m.ledger.append(id));
    }
    if let Some(field) = step.field() {
        prompt(ctx, &mut login, field, None).await?;
    }
    login.flush().await?;
    ctx.set_state(ConversationState::Login(step));
    log::info!("Login started for {}", ctx.scope.id());
    Ok(())
}

pub async fn on_input(ctx: &mut FlowContext, step: LoginStep) -> AppResult<()> {
    let Some(mut login) = guards::load_flow::<LoginModel>(ctx).await? else {
        return Ok(());
    };
    let Some(field) = step.field() else {
        return submit(ctx, login, LoginField::Username).await;
    };
    let Some(text) = ctx.inbound.text().map(str::to_string) else {
        session::stale_button(ctx).await?;
        login.flush().await?;
        return Ok(());
    };

    match login.validate(field, &text) {
        Err(e) => {
            prompt(ctx, &mut login, field, Some(&e)).await?;
            login.flush().await?;
        }
        Ok(value) => {
            login.update(|m| m.set_field(field, value));
            match step.advance(|f| login.skips(f)) {
                WizardStep::Confirm => submit(ctx, login, field).await?,
                next => {
                    if let Some(next_field) = next.field() {
                        prompt(ctx, &mut login, next_field, None).await?;
                    }
                    login.flush().await?;
                    ctx.set_state(ConversationState::Login(next));
                }
            }
        }
    }
    Ok(())
}

/// Sends the credentials; a rejection re-asks `last` with the backend's reason
async fn submit(ctx: &mut FlowContext, mut login: Entity<LoginModel>, last: LoginField) -> AppResult<()> {
    let Some(request) = login.request() else {
        let restart = LoginStep::start(|f| login.skips(f));
        if let Some(field) = restart.field() {
            prompt(ctx, &mut login, field, None).await?;
        }
        login.flush().await?;
        ctx.set_state(ConversationState::Login(restart));
        return Ok(());
    };

    let response = ctx.backend.login(&request).await;
    if response.is_error() {
        log::info!("Login rejected for {}: {}", ctx.scope.id(), response.error_message());
        let message_id = ctx.send(&messages::backend_error(&response), None).await?;
        login.update(|m| m.ledger.append(message_id));
        prompt(ctx, &mut login, last, None).await?;
        login.flush().await?;
        ctx.set_state(ConversationState::Login(WizardStep::Ask(last)));
        return Ok(());
    }

    let profile = response.data_as::<Profile>().unwrap_or_else(|e| {
        log::warn!("Undecodable login profile for {}: {}", ctx.scope.id(), e);
        Profile {
            username: request.username.clone(),
            ..Profile::default()
        }
    });
    let mut user = ctx.scope.create(UserModel::from_profile(ctx.chat_id(), &profile));
    ctx.retire(login).await?;
    session::discard_guest_flows(ctx).await?;

    let message_id = ctx
        .send(&messages::login_success(&user.username), Some(Keyboard::Remove))
        .await?;
    user.update(|u| u.ledger.append(message_id));
    user.flush().await?;
    ctx.set_state(ConversationState::MainMenu);
    log::info!("{} logged in as {}", ctx.scope.id(), user.username);
    session::show_menu(ctx, Some(user.get()), None).await
}
