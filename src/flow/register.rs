//! Registration wizard
//!
//! Ask every field in order, then show a summary with an edit button per
//! field. An edited field returns straight to the summary.

use super::callback::Callback;
use super::context::FlowContext;
use super::fsm::{ConversationState, RegisterField, RegisterStep, WizardField, WizardStep};
use super::guards;
use super::login::{handshake, send_prompt};
use super::session;
use crate::core::validation::FieldError;
use crate::core::AppResult;
use crate::state::{Entity, RegisterModel, TelegramData};
use crate::telegram::transport::Keyboard;
use crate::telegram::{keyboards, messages};

fn prompt_keyboard(model: &RegisterModel, field: RegisterField) -> Keyboard {
    match field {
        RegisterField::BankName => keyboards::register_banks(&model.bank_list),
        RegisterField::Referral => keyboards::register_skip_referral(),
        _ => keyboards::cancel_only(),
    }
}

async fn prompt(
    ctx: &FlowContext,
    register: &mut Entity<RegisterModel>,
    field: RegisterField,
    error: Option<&FieldError>,
) -> AppResult<()> {
    let text = messages::register_prompt(field, error);
    let image = match field {
        RegisterField::Captcha => register.captcha_image.clone(),
        _ => None,
    };
    let keyboard = prompt_keyboard(register, field);
    let message_id = send_prompt(ctx, &text, image.as_deref(), keyboard).await?;
    register.update(|m| m.ledger.append(message_id));
    Ok(())
}

async fn show_summary(ctx: &FlowContext, register: &mut Entity<RegisterModel>) -> AppResult<()> {
    let text = messages::register_summary(register);
    let message_id = ctx.send(&text, Some(keyboards::register_confirm())).await?;
    register.update(|m| m.ledger.append(message_id));
    Ok(())
}

/// Renders whatever `step` asks for
async fn enter(ctx: &mut FlowContext, register: &mut Entity<RegisterModel>, step: RegisterStep) -> AppResult<()> {
    match step.field() {
        Some(field) => prompt(ctx, register, field, None).await?,
        None => show_summary(ctx, register).await?,
    }
    ctx.set_state(ConversationState::Register(step));
    Ok(())
}

pub async fn begin(ctx: &mut FlowContext) -> AppResult<()> {
    if session::load_user(ctx).await?.is_some() {
        ctx.notify(messages::LOGOUT_FIRST).await?;
        return Ok(());
    }
    session::discard_guest_flows(ctx).await?;
    let Some(mut handshake) = handshake(ctx).await? else {
        ctx.set_state(ConversationState::Idle);
        return Ok(());
    };
    if handshake.bank_list.is_empty() {
        let banks = ctx.backend.list_active_banks().await;
        if banks.is_success() {
            handshake.bank_list = banks.data_as::<Vec<String>>().unwrap_or_default();
        }
    }
    ctx.answer(None).await;

    let phone_number = ctx
        .scope
        .load::<TelegramData>()
        .await?
        .and_then(|d| d.get().phone_number.clone());
    let model = RegisterModel::new(ctx.chat_id(), &handshake, phone_number);
    let step = RegisterStep::start(|f| model.skips(f));
    let mut register = ctx.scope.create(model);
    if let Some(id) = ctx.inbound.user_message_id() {
        register.update(|m| m.ledger.append(id));
    }
    enter(ctx, &mut register, step).await?;
    register.flush().await?;
    log::info!(
        "Registration started for {} with {} banks",
        ctx.scope.id(),
        register.bank_list.len()
    );
    Ok(())
}

pub async fn on_input(ctx: &mut FlowContext, step: RegisterStep) -> AppResult<()> {
    let Some(mut register) = guards::load_flow::<RegisterModel>(ctx).await? else {
        return Ok(());
    };
    let callback = ctx.inbound.callback().cloned();
    match (step, callback) {
        (WizardStep::Confirm, Some(Callback::RegisterEdit(field))) => match step.edit(field) {
            Some(edit) => {
                ctx.answer(None).await;
                enter(ctx, &mut register, edit).await?;
            }
            None => session::stale_button(ctx).await?,
        },
        (WizardStep::Confirm, Some(Callback::RegisterSubmit)) => {
            ctx.answer(None).await;
            return submit(ctx, register).await;
        }
        (WizardStep::Confirm, _) => {
            if ctx.inbound.callback_id().is_some() {
                session::stale_button(ctx).await?;
            } else {
                show_summary(ctx, &mut register).await?;
            }
        }
        (WizardStep::Ask(RegisterField::Referral) | WizardStep::Edit(RegisterField::Referral), Some(Callback::RegisterSkip)) => {
            ctx.answer(None).await;
            register.update(|m| m.set_field(RegisterField::Referral, None));
            let next = step.advance(|f| register.skips(f));
            enter(ctx, &mut register, next).await?;
        }
        (WizardStep::Ask(RegisterField::BankName) | WizardStep::Edit(RegisterField::BankName), Some(Callback::RegisterBank(bank))) => {
            ctx.answer(None).await;
            accept(ctx, &mut register, step, RegisterField::BankName, &bank).await?;
        }
        (_, Some(_)) => session::stale_button(ctx).await?,
        (WizardStep::Ask(field) | WizardStep::Edit(field), None) => match ctx.inbound.text().map(str::to_string) {
            Some(text) => accept(ctx, &mut register, step, field, &text).await?,
            None => prompt(ctx, &mut register, field, None).await?,
        },
    }
    register.flush().await?;
    Ok(())
}

/// Validates one answer; a bad value re-asks the same field and changes nothing else
async fn accept(
    ctx: &mut FlowContext,
    register: &mut Entity<RegisterModel>,
    step: RegisterStep,
    field: RegisterField,
    input: &str,
) -> AppResult<()> {
    match register.validate(field, input) {
        Err(e) => prompt(ctx, register, field, Some(&e)).await,
        Ok(value) => {
            let value = Some(value).filter(|v| !v.is_empty());
            register.update(|m| m.set_field(field, value));
            let next = step.advance(|f| register.skips(f));
            enter(ctx, register, next).await
        }
    }
}

/// First required field still missing, if any
fn first_missing(model: &RegisterModel) -> Option<RegisterField> {
    RegisterField::ORDER
        .iter()
        .copied()
        .filter(|f| !model.skips(*f) && *f != RegisterField::Referral)
        .find(|f| model.field(*f).is_none())
}

async fn submit(ctx: &mut FlowContext, mut register: Entity<RegisterModel>) -> AppResult<()> {
    let Some(payload) = register.payload() else {
        let step = first_missing(&register).map_or(WizardStep::Confirm, WizardStep::Ask);
        enter(ctx, &mut register, step).await?;
        register.flush().await?;
        return Ok(());
    };

    let response = ctx.backend.register(&payload).await;
    if response.is_error() {
        log::info!(
            "Registration rejected for {}: {}",
            ctx.scope.id(),
            response.error_message()
        );
        let message_id = ctx.send(&messages::backend_error(&response), None).await?;
        register.update(|m| m.ledger.append(message_id));
        show_summary(ctx, &mut register).await?;
        register.flush().await?;
        return Ok(());
    }

    log::info!("{} registered as {}", ctx.scope.id(), payload.username);
    ctx.retire(register).await?;
    ctx.set_state(ConversationState::Idle);
    ctx.send(&messages::register_success(&payload.username), None).await?;
    session::show_menu(ctx, None, None).await
}
