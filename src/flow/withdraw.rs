//! Withdraw action: amount, then confirm, both shown in one prompt message

use super::callback::Callback;
use super::context::FlowContext;
use super::fsm::{ConversationState, WithdrawStep};
use super::guards;
use super::session;
use crate::backend::types::WithdrawInit;
use crate::core::validation::{self, FieldError};
use crate::core::AppResult;
use crate::state::action::{ActionData, ActionModel, WithdrawData};
use crate::state::{Entity, TelegramData, UserModel};
use crate::telegram::{keyboards, messages};

fn withdraw(user: &UserModel) -> Option<&WithdrawData> {
    user.action.as_ref().and_then(ActionModel::withdraw)
}

async fn render(
    ctx: &mut FlowContext,
    user: &mut Entity<UserModel>,
    step: WithdrawStep,
    error: Option<&FieldError>,
    retry: bool,
) -> AppResult<()> {
    let recent = match step {
        WithdrawStep::AskAmount => ctx
            .scope
            .load::<TelegramData>()
            .await?
            .map(|d| d.get().recent_withdraws.clone())
            .unwrap_or_default(),
        WithdrawStep::Confirm => Vec::new(),
    };
    let Some(data) = withdraw(user) else {
        return Ok(());
    };
    let (text, keyboard) = match step {
        WithdrawStep::AskAmount => (
            messages::withdraw_amount_prompt(data, error),
            keyboards::withdraw_amount(&recent, &data.bounds()),
        ),
        WithdrawStep::Confirm => (messages::withdraw_summary(data), keyboards::withdraw_confirm(retry)),
    };

    let existing = data.prompt;
    let message_id = ctx.show(existing, &text, Some(keyboard)).await?;
    if existing != Some(message_id) {
        user.update(|u| {
            if let Some(action) = u.action.as_mut() {
                action.ledger.append(message_id);
                if let Some(data) = action.withdraw_mut() {
                    data.prompt = Some(message_id);
                }
            }
        });
    }
    ctx.set_state(ConversationState::Withdraw(step));
    Ok(())
}

pub async fn begin(ctx: &mut FlowContext) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    let refusal = if !user.is_active() {
        Some(messages::ACCOUNT_RESTRICTED)
    } else if user.pending_withdraw {
        Some(messages::WITHDRAW_PENDING)
    } else {
        None
    };
    if let Some(refusal) = refusal {
        ctx.notify(refusal).await?;
        user.flush().await?;
        return Ok(());
    }

    let response = ctx.backend.initiate_withdraw().await;
    if response.is_error() {
        ctx.answer(None).await;
        let message_id = ctx.send(&messages::backend_error(&response), None).await?;
        user.update(|u| u.ledger.append(message_id));
        user.flush().await?;
        return Ok(());
    }
    let init = response.data_as::<WithdrawInit>().unwrap_or_else(|e| {
        log::warn!("Undecodable withdraw init for {}: {}", ctx.scope.id(), e);
        WithdrawInit::default()
    });
    if init.pending_wd {
        user.update(|u| u.pending_withdraw = true);
        ctx.notify(messages::WITHDRAW_PENDING).await?;
        user.flush().await?;
        return Ok(());
    }
    let Some(data) = WithdrawData::from_init(init, &ctx.settings().withdraw_defaults) else {
        ctx.notify(messages::NO_PAYOUT_ACCOUNT).await?;
        user.flush().await?;
        return Ok(());
    };
    ctx.answer(None).await;

    let action = ActionModel::new(ctx.chat_id(), ActionData::Withdraw(data));
    session::end_account_flows(ctx, &mut user).await?;
    user.update(|u| u.start_action(action));
    log::info!("Withdraw started for {}", ctx.scope.id());

    render(ctx, &mut user, WithdrawStep::AskAmount, None, false).await?;
    user.flush().await?;
    Ok(())
}

pub async fn on_input(ctx: &mut FlowContext, step: WithdrawStep) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    if withdraw(&user).is_none() {
        user.flush().await?;
        return guards::restart(ctx).await;
    }

    let callback = ctx.inbound.callback().cloned();
    let text = ctx.inbound.text().map(str::to_string);
    match (step, callback, text) {
        (WithdrawStep::AskAmount, Some(Callback::WithdrawAmount(amount)), _) => {
            ctx.answer(None).await;
            accept_amount(ctx, &mut user, amount).await?;
        }
        (WithdrawStep::AskAmount, None, Some(text)) => match validation::amount(&text) {
            Ok(amount) => accept_amount(ctx, &mut user, amount).await?,
            Err(e) => render(ctx, &mut user, step, Some(&e), false).await?,
        },
        (WithdrawStep::Confirm, Some(Callback::WithdrawSubmit), _) => {
            ctx.answer(None).await;
            return submit(ctx, user).await;
        }
        (_, Some(_), _) => session::stale_button(ctx).await?,
        (_, None, _) => render(ctx, &mut user, step, None, false).await?,
    }
    user.flush().await?;
    Ok(())
}

async fn accept_amount(ctx: &mut FlowContext, user: &mut Entity<UserModel>, amount: i64) -> AppResult<()> {
    let Some(bounds) = withdraw(user).map(WithdrawData::bounds) else {
        return Ok(());
    };
    match bounds.check(amount) {
        Ok(amount) => {
            user.update(|u| {
                if let Some(data) = u.action.as_mut().and_then(ActionModel::withdraw_mut) {
                    data.amount = Some(amount);
                }
            });
            render(ctx, user, WithdrawStep::Confirm, None, false).await
        }
        Err(e) => render(ctx, user, WithdrawStep::AskAmount, Some(&e), false).await,
    }
}

async fn submit(ctx: &mut FlowContext, mut user: Entity<UserModel>) -> AppResult<()> {
    let Some(request) = withdraw(&user).and_then(WithdrawData::request) else {
        render(ctx, &mut user, WithdrawStep::AskAmount, None, false).await?;
        user.flush().await?;
        return Ok(());
    };

    let response = ctx.backend.confirm_withdraw(&request).await;
    if response.is_error() {
        log::info!("Withdraw rejected for {}: {}", ctx.scope.id(), response.error_message());
        let message_id = ctx.send(&messages::backend_error(&response), None).await?;
        user.update(|u| u.active_ledger().append(message_id));
        render(ctx, &mut user, WithdrawStep::Confirm, None, true).await?;
        user.flush().await?;
        return Ok(());
    }

    log::info!("{} submitted a withdrawal of {}", ctx.scope.id(), request.amount);
    let mut telegram = ctx.scope.load_or_default::<TelegramData>().await?;
    let cap = ctx.settings().recent_amounts;
    telegram.update(|t| t.remember_withdraw(request.amount, cap));
    telegram.flush().await?;

    user.update(|u| u.pending_withdraw = true);
    session::end_account_flows(ctx, &mut user).await?;
    ctx.set_state(ConversationState::MainMenu);
    session::show_menu(ctx, Some(user.get()), Some(&messages::withdraw_submitted(request.amount))).await
}
