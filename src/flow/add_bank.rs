//! Adding a bank account to a logged-in user

use super::callback::Callback;
use super::context::FlowContext;
use super::fsm::{AddBankField, AddBankStep, ConversationState, WizardField, WizardStep};
use super::guards;
use super::session;
use crate::backend::types::AddBankInit;
use crate::core::validation::FieldError;
use crate::core::AppResult;
use crate::state::{AddBankModel, Entity, UserModel};
use crate::telegram::{keyboards, messages};

async fn prompt(
    ctx: &FlowContext,
    user: &mut Entity<UserModel>,
    field: AddBankField,
    error: Option<&FieldError>,
) -> AppResult<()> {
    let keyboard = match (field, user.add_bank.as_ref()) {
        (AddBankField::Bank, Some(model)) => keyboards::add_bank_banks(&model.bank_list),
        _ => keyboards::cancel_only(),
    };
    let message_id = ctx
        .send(&messages::add_bank_prompt(field, error), Some(keyboard))
        .await?;
    user.update(|u| u.active_ledger().append(message_id));
    Ok(())
}

async fn enter(ctx: &mut FlowContext, user: &mut Entity<UserModel>, step: AddBankStep) -> AppResult<()> {
    match step.field() {
        Some(field) => prompt(ctx, user, field, None).await?,
        None => {
            let text = match user.add_bank.as_ref() {
                Some(model) => messages::add_bank_summary(model),
                None => return Ok(()),
            };
            let message_id = ctx.send(&text, Some(keyboards::add_bank_confirm())).await?;
            user.update(|u| u.active_ledger().append(message_id));
        }
    }
    ctx.set_state(ConversationState::AddBank(step));
    Ok(())
}

pub async fn begin(ctx: &mut FlowContext) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    session::end_account_flows(ctx, &mut user).await?;

    let response = ctx.backend.initiate_add_bank().await;
    if response.is_error() {
        ctx.answer(None).await;
        let message_id = ctx.send(&messages::backend_error(&response), None).await?;
        user.update(|u| u.ledger.append(message_id));
        user.flush().await?;
        ctx.set_state(ConversationState::MainMenu);
        return Ok(());
    }
    let init = response.data_as::<AddBankInit>().unwrap_or_else(|e| {
        log::warn!("Undecodable add-bank payload for {}: {}", ctx.scope.id(), e);
        AddBankInit::default()
    });

    let origin = ctx.inbound.callback().and(ctx.inbound.message_id);
    let model = AddBankModel::new(&init, origin);
    if model.bank_list.is_empty() {
        ctx.notify(messages::NO_BANKS_TO_ADD).await?;
        user.flush().await?;
        ctx.set_state(ConversationState::MainMenu);
        return Ok(());
    }
    ctx.answer(None).await;
    user.update(|u| u.add_bank = Some(model));
    enter(ctx, &mut user, WizardStep::start(|_| false)).await?;
    user.flush().await?;
    Ok(())
}

pub async fn on_input(ctx: &mut FlowContext, step: AddBankStep) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    if user.add_bank.is_none() {
        user.flush().await?;
        return guards::restart(ctx).await;
    }

    match (step, ctx.inbound.callback().cloned()) {
        (WizardStep::Confirm, Some(Callback::AddBankEdit(field))) => match step.edit(field) {
            Some(edit) => {
                ctx.answer(None).await;
                enter(ctx, &mut user, edit).await?;
            }
            None => session::stale_button(ctx).await?,
        },
        (WizardStep::Confirm, Some(Callback::AddBankSubmit)) => {
            ctx.answer(None).await;
            return submit(ctx, user).await;
        }
        (WizardStep::Ask(AddBankField::Bank) | WizardStep::Edit(AddBankField::Bank), Some(Callback::AddBankPick(bank))) => {
            ctx.answer(None).await;
            accept(ctx, &mut user, step, AddBankField::Bank, &bank).await?;
        }
        (_, Some(_)) => session::stale_button(ctx).await?,
        (WizardStep::Confirm, None) => enter(ctx, &mut user, step).await?,
        (WizardStep::Ask(field) | WizardStep::Edit(field), None) => match ctx.inbound.text().map(str::to_string) {
            Some(text) => accept(ctx, &mut user, step, field, &text).await?,
            None => prompt(ctx, &mut user, field, None).await?,
        },
    }
    user.flush().await?;
    Ok(())
}

async fn accept(
    ctx: &mut FlowContext,
    user: &mut Entity<UserModel>,
    step: AddBankStep,
    field: AddBankField,
    input: &str,
) -> AppResult<()> {
    let checked = match user.add_bank.as_ref() {
        Some(model) => model.validate(field, input),
        None => return Ok(()),
    };
    match checked {
        Err(e) => prompt(ctx, user, field, Some(&e)).await,
        Ok(value) => {
            user.update(|u| {
                if let Some(model) = u.add_bank.as_mut() {
                    model.set_field(field, value);
                }
            });
            enter(ctx, user, step.advance(|_| false)).await
        }
    }
}

async fn submit(ctx: &mut FlowContext, mut user: Entity<UserModel>) -> AppResult<()> {
    let request = user.add_bank.as_ref().and_then(AddBankModel::request);
    let Some(request) = request else {
        let missing = AddBankField::ORDER
            .iter()
            .copied()
            .find(|f| user.add_bank.as_ref().is_some_and(|m| m.field(*f).is_none()));
        enter(ctx, &mut user, missing.map_or(WizardStep::Confirm, WizardStep::Ask)).await?;
        user.flush().await?;
        return Ok(());
    };

    let response = ctx.backend.insert_bank_account(&request).await;
    if response.is_error() {
        let message_id = ctx.send(&messages::backend_error(&response), None).await?;
        user.update(|u| u.active_ledger().append(message_id));
        enter(ctx, &mut user, WizardStep::Confirm).await?;
        user.flush().await?;
        return Ok(());
    }

    log::info!("{} added a {} account", ctx.scope.id(), request.bank_name);
    session::end_account_flows(ctx, &mut user).await?;
    user.flush().await?;
    ctx.set_state(ConversationState::MainMenu);
    session::show_menu(ctx, Some(user.get()), Some(messages::ADD_BANK_SUCCESS)).await
}
