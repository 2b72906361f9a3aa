//! Deposit action
//!
//! Each step renders into its own prompt message, remembered per step.
//! Going back to an earlier step (by its back button or by tapping a
//! choice on its prompt again) forgets every later answer, deletes the
//! later prompts and edits the earlier prompt in place.

use super::callback::Callback;
use super::context::FlowContext;
use super::fsm::{ConversationState, DepositStep};
use super::guards;
use super::session;
use crate::backend::types::{DepositInit, GatewayReceipt};
use crate::core::validation::{self, FieldError};
use crate::core::AppResult;
use crate::state::action::{ActionData, ActionModel, DepositData, DepositMethod};
use crate::state::{Entity, TelegramData, UserModel};
use crate::telegram::{keyboards, messages};

fn deposit(user: &UserModel) -> Option<&DepositData> {
    user.action.as_ref().and_then(ActionModel::deposit)
}

fn with_deposit<R>(user: &mut Entity<UserModel>, f: impl FnOnce(&mut DepositData) -> R) -> Option<R> {
    user.update(|u| u.action.as_mut().and_then(ActionModel::deposit_mut).map(f))
}

fn offers(data: &DepositData, method: DepositMethod) -> bool {
    match method {
        DepositMethod::Bank => !data.deposit_banks.is_empty(),
        DepositMethod::Qris => !data.qris.is_empty(),
        DepositMethod::Va => !data.va.is_empty(),
    }
}

/// Step whose prompt carries this choice button
fn choice_step(callback: &Callback) -> Option<DepositStep> {
    match callback {
        Callback::DepositMethod(_) => Some(DepositStep::ChooseMethod),
        Callback::DepositChannel(_) => Some(DepositStep::ChooseChannel),
        Callback::DepositUserBank(_) => Some(DepositStep::ChooseUserBank),
        Callback::DepositPromo(_) | Callback::DepositPromoConfirm(_) | Callback::DepositPromoList => {
            Some(DepositStep::ChoosePromo)
        }
        Callback::DepositAmount(_) => Some(DepositStep::AskAmount),
        Callback::DepositSkipNote => Some(DepositStep::AskNote),
        Callback::DepositSubmit => Some(DepositStep::Confirm),
        _ => None,
    }
}

async fn recent_amounts(ctx: &FlowContext) -> AppResult<Vec<i64>> {
    Ok(ctx
        .scope
        .load::<TelegramData>()
        .await?
        .map(|d| d.get().recent_deposits.clone())
        .unwrap_or_default())
}

/// Shows `step` in its prompt message and makes it the current position
async fn render(
    ctx: &mut FlowContext,
    user: &mut Entity<UserModel>,
    step: DepositStep,
    error: Option<&FieldError>,
    retry: bool,
) -> AppResult<()> {
    let recent = match step {
        DepositStep::AskAmount => recent_amounts(ctx).await?,
        _ => Vec::new(),
    };
    let Some(data) = deposit(user) else {
        return Ok(());
    };
    let (text, keyboard) = match step {
        DepositStep::ChooseMethod => (messages::deposit_method_prompt(), keyboards::deposit_methods(data)),
        DepositStep::ChooseChannel => match data.method {
            Some(method) => (messages::deposit_channel_prompt(method), keyboards::deposit_channels(data)),
            None => (messages::deposit_method_prompt(), keyboards::deposit_methods(data)),
        },
        DepositStep::ChooseUserBank => (messages::deposit_user_bank_prompt(), keyboards::deposit_user_banks(data)),
        DepositStep::ChoosePromo => match data.promo_preview.and_then(|id| data.promo(id)) {
            Some(promo) => (messages::promo_terms(promo), keyboards::promo_preview(promo.id)),
            None => (messages::deposit_promo_prompt(), keyboards::deposit_promos(data)),
        },
        DepositStep::AskAmount => {
            let bounds = data.resolved_bounds(&ctx.settings().deposit_limits);
            (
                messages::amount_prompt(&bounds, error),
                keyboards::deposit_amount(data, &recent, &bounds),
            )
        }
        DepositStep::AskNote => (messages::deposit_note_prompt(), keyboards::deposit_note()),
        DepositStep::Confirm => (messages::deposit_summary(data), keyboards::deposit_confirm(retry)),
    };

    let existing = data.prompt(step);
    let message_id = ctx.show(existing, &text, Some(keyboard)).await?;
    if existing != Some(message_id) {
        user.update(|u| {
            if let Some(action) = u.action.as_mut() {
                action.ledger.append(message_id);
                if let Some(data) = action.deposit_mut() {
                    data.record_prompt(step, message_id);
                }
            }
        });
    }
    ctx.set_state(ConversationState::Deposit(step));
    Ok(())
}

/// Forgets `step` and everything after it, deleting the later prompts
async fn rewind(ctx: &FlowContext, user: &mut Entity<UserModel>, step: DepositStep) {
    let stale = user.update(|u| {
        let action = u.action.as_mut()?;
        let stale = action.deposit_mut()?.clear_from(step);
        for id in &stale {
            action.ledger.remove(*id);
        }
        Some(stale)
    });
    if let Some(stale) = stale {
        ctx.delete_quietly(&stale).await;
    }
}

pub async fn begin(ctx: &mut FlowContext) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    if !user.is_active() {
        ctx.notify(messages::ACCOUNT_RESTRICTED).await?;
        user.flush().await?;
        return Ok(());
    }
    if user.pending_deposit {
        ctx.notify(messages::DEPOSIT_PENDING).await?;
        user.flush().await?;
        return Ok(());
    }

    let response = ctx.backend.initiate_deposit().await;
    if response.is_error() {
        ctx.answer(None).await;
        let message_id = ctx.send(&messages::backend_error(&response), None).await?;
        user.update(|u| u.ledger.append(message_id));
        user.flush().await?;
        return Ok(());
    }
    let init = match response.data_as::<DepositInit>() {
        Ok(init) => init,
        Err(e) => {
            log::warn!("Undecodable deposit init for {}: {}", ctx.scope.id(), e);
            ctx.notify(messages::GENERIC_ERROR).await?;
            user.flush().await?;
            return Ok(());
        }
    };
    if init.pending_deposit {
        user.update(|u| u.pending_deposit = true);
        ctx.notify(messages::DEPOSIT_PENDING).await?;
        user.flush().await?;
        return Ok(());
    }
    ctx.answer(None).await;

    let action = ActionModel::new(ctx.chat_id(), ActionData::Deposit(DepositData::from_init(init)));
    session::end_account_flows(ctx, &mut user).await?;
    user.update(|u| u.start_action(action));
    log::info!("Deposit started for {}", ctx.scope.id());

    render(ctx, &mut user, DepositStep::ChooseMethod, None, false).await?;
    user.flush().await?;
    Ok(())
}

pub async fn on_input(ctx: &mut FlowContext, step: DepositStep) -> AppResult<()> {
    let Some(mut user) = guards::authenticate(ctx).await? else {
        return Ok(());
    };
    if deposit(&user).is_none() {
        user.flush().await?;
        return guards::restart(ctx).await;
    }

    match ctx.inbound.callback().cloned() {
        Some(callback) => on_callback(ctx, &mut user, step, callback).await?,
        None => on_text(ctx, &mut user, step).await?,
    }
    user.flush().await?;
    Ok(())
}

async fn on_callback(
    ctx: &mut FlowContext,
    user: &mut Entity<UserModel>,
    step: DepositStep,
    callback: Callback,
) -> AppResult<()> {
    if let Callback::DepositBack(target) = callback {
        if !step.can_go_back_to(target) {
            return session::stale_button(ctx).await;
        }
        ctx.answer(None).await;
        rewind(ctx, user, target).await;
        return render(ctx, user, target, None, false).await;
    }

    // Choices on an earlier prompt rewind to that step first
    let Some(target) = choice_step(&callback).filter(|s| *s <= step) else {
        return session::stale_button(ctx).await;
    };
    let Some(data) = deposit(user) else {
        return Ok(());
    };

    match callback {
        Callback::DepositMethod(method) if offers(data, method) => {
            rewind(ctx, user, target).await;
            with_deposit(user, |d| d.method = Some(method));
            advance(ctx, user, target).await
        }
        Callback::DepositChannel(id) => {
            if !data.is_selectable_channel(id) {
                ctx.answer(Some(messages::CHANNEL_UNAVAILABLE)).await;
                return Ok(());
            }
            rewind(ctx, user, target).await;
            with_deposit(user, |d| d.channel_id = Some(id));
            advance(ctx, user, target).await
        }
        Callback::DepositUserBank(id) if data.user_banks.iter().any(|b| b.id == id) => {
            rewind(ctx, user, target).await;
            with_deposit(user, |d| d.user_bank_id = Some(id));
            advance(ctx, user, target).await
        }
        Callback::DepositPromo(id) => match data.promo(id) {
            Some(promo) if promo.is_none_choice() => {
                rewind(ctx, user, target).await;
                with_deposit(user, |d| d.choose_promo(id));
                advance(ctx, user, target).await
            }
            Some(_) => {
                ctx.answer(None).await;
                rewind(ctx, user, target).await;
                with_deposit(user, |d| d.promo_preview = Some(id));
                render(ctx, user, target, None, false).await
            }
            None => session::stale_button(ctx).await,
        },
        Callback::DepositPromoConfirm(id) if data.promo_preview == Some(id) => {
            rewind(ctx, user, target).await;
            with_deposit(user, |d| d.choose_promo(id));
            advance(ctx, user, target).await
        }
        Callback::DepositPromoList => {
            ctx.answer(None).await;
            rewind(ctx, user, target).await;
            render(ctx, user, target, None, false).await
        }
        Callback::DepositAmount(amount) if target == step => accept_amount(ctx, user, amount).await,
        Callback::DepositSkipNote if target == step => {
            with_deposit(user, |d| d.note = Some(String::new()));
            advance(ctx, user, target).await
        }
        Callback::DepositSubmit if target == step => submit(ctx, user).await,
        _ => session::stale_button(ctx).await,
    }
}

async fn on_text(ctx: &mut FlowContext, user: &mut Entity<UserModel>, step: DepositStep) -> AppResult<()> {
    let text = ctx.inbound.text().map(str::to_string);
    match (step, text) {
        (DepositStep::AskAmount, Some(text)) => match validation::amount(&text) {
            Ok(amount) => accept_amount(ctx, user, amount).await,
            Err(e) => render(ctx, user, step, Some(&e), false).await,
        },
        (DepositStep::AskNote, Some(text)) => {
            let note = validation::sanitize_note(&text);
            with_deposit(user, |d| d.note = Some(note));
            advance(ctx, user, step).await
        }
        // Choice steps only take buttons; the prompt stays as it is
        _ => render(ctx, user, step, None, false).await,
    }
}

async fn accept_amount(ctx: &mut FlowContext, user: &mut Entity<UserModel>, amount: i64) -> AppResult<()> {
    ctx.answer(None).await;
    let Some(data) = deposit(user) else {
        return Ok(());
    };
    let bounds = data.resolved_bounds(&ctx.settings().deposit_limits);
    match bounds.check(amount) {
        Ok(amount) => {
            with_deposit(user, |d| d.amount = Some(amount));
            advance(ctx, user, DepositStep::AskAmount).await
        }
        Err(e) => render(ctx, user, DepositStep::AskAmount, Some(&e), false).await,
    }
}

/// Moves past `answered` to whichever step the choices so far lead to
async fn advance(ctx: &mut FlowContext, user: &mut Entity<UserModel>, answered: DepositStep) -> AppResult<()> {
    ctx.answer(None).await;
    let Some(next) = deposit(user).map(|d| answered.next(d)) else {
        return Ok(());
    };
    render(ctx, user, next, None, false).await
}

async fn submit(ctx: &mut FlowContext, user: &mut Entity<UserModel>) -> AppResult<()> {
    ctx.answer(None).await;
    let Some(data) = deposit(user).cloned() else {
        return Ok(());
    };
    let Some(method) = data.method else {
        return render(ctx, user, DepositStep::ChooseMethod, None, false).await;
    };

    let response = match method {
        DepositMethod::Bank => match data.bank_request() {
            Some(request) => ctx.backend.confirm_bank_deposit(&request).await,
            None => return render(ctx, user, DepositStep::ChooseMethod, None, false).await,
        },
        _ => match data.gateway_request() {
            Some(request) => ctx.backend.confirm_gateway_deposit(&request).await,
            None => return render(ctx, user, DepositStep::ChooseMethod, None, false).await,
        },
    };
    if response.is_error() {
        log::info!("Deposit rejected for {}: {}", ctx.scope.id(), response.error_message());
        let message_id = ctx.send(&messages::backend_error(&response), None).await?;
        user.update(|u| u.active_ledger().append(message_id));
        return render(ctx, user, DepositStep::Confirm, None, true).await;
    }

    let amount = data.amount.unwrap_or_default();
    log::info!("{} submitted a {} deposit of {}", ctx.scope.id(), method, amount);
    let mut telegram = ctx.scope.load_or_default::<TelegramData>().await?;
    let cap = ctx.settings().recent_amounts;
    telegram.update(|t| t.remember_deposit(amount, cap));
    telegram.flush().await?;

    user.update(|u| u.pending_deposit = true);
    session::end_account_flows(ctx, user).await?;

    if method != DepositMethod::Bank {
        let receipt = response.data_as::<GatewayReceipt>().unwrap_or_else(|e| {
            log::warn!("Undecodable gateway receipt for {}: {}", ctx.scope.id(), e);
            GatewayReceipt::default()
        });
        let message_id = send_receipt(ctx, method, amount, &receipt).await?;
        user.update(|u| u.ledger.append(message_id));
    }

    ctx.set_state(ConversationState::MainMenu);
    session::show_menu(ctx, Some(user.get()), Some(&messages::deposit_submitted(amount))).await
}

/// QRIS receipts carry the code as an image url; VA receipts are text
async fn send_receipt(
    ctx: &FlowContext,
    method: DepositMethod,
    amount: i64,
    receipt: &GatewayReceipt,
) -> AppResult<i32> {
    let caption = messages::gateway_receipt(method, amount, receipt);
    if method == DepositMethod::Qris && receipt.payment.starts_with("http") {
        match ctx.transport().send_photo(ctx.chat_id(), &receipt.payment, &caption).await {
            Ok(id) => return Ok(id),
            Err(e) => log::warn!("QRIS image could not be sent: {}", e),
        }
    }
    ctx.send(&caption, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_buttons_map_to_their_step() {
        assert_eq!(
            choice_step(&Callback::DepositMethod(DepositMethod::Qris)),
            Some(DepositStep::ChooseMethod)
        );
        assert_eq!(choice_step(&Callback::DepositPromoList), Some(DepositStep::ChoosePromo));
        assert_eq!(choice_step(&Callback::WithdrawSubmit), None);
    }

    #[test]
    fn test_offers_only_configured_methods() {
        let data = DepositData {
            qris: vec![Default::default()],
            ..DepositData::default()
        };
        assert!(offers(&data, DepositMethod::Qris));
        assert!(!offers(&data, DepositMethod::Bank));
    }
}
