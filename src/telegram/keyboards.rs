//! Inline keyboards for every flow step

use crate::core::utils::format_rupiah;
use crate::flow::callback::Callback;
use crate::flow::fsm::{AddBankField, DepositStep, RegisterField};
use crate::flow::input::Intent;
use crate::state::action::{AmountBounds, DepositData, DepositMethod};
use crate::telegram::messages::SHARE_CONTACT_BUTTON;
use crate::telegram::transport::{Button, Keyboard};

use crate::backend::types::{ChannelStatus, Game, GameProvider, GameType, Pagination, SupportChannel};

fn button(text: impl Into<String>, callback: Callback) -> Button {
    Button::new(text, callback.to_string())
}

fn cancel_row() -> Vec<Button> {
    vec![button("✖️ Cancel", Callback::Go(Intent::Cancel))]
}

/// Lays buttons out `per_row` to a row
fn grid(buttons: Vec<Button>, per_row: usize) -> Vec<Vec<Button>> {
    buttons.chunks(per_row.max(1)).map(<[Button]>::to_vec).collect()
}

pub fn guest_menu() -> Keyboard {
    Keyboard::Inline(vec![vec![
        button("🔐 Login", Callback::Go(Intent::Login)),
        button("📝 Register", Callback::Go(Intent::Register)),
        button("💬 Support", Callback::Go(Intent::Support)),
    ]])
}

pub fn user_menu() -> Keyboard {
    Keyboard::Inline(vec![
        vec![
            button("💰 Deposit", Callback::Go(Intent::Deposit)),
            button("💸 Withdraw", Callback::Go(Intent::Withdraw)),
        ],
        vec![
            button("🏦 My accounts", Callback::Go(Intent::Accounts)),
            button("➕ Add account", Callback::Go(Intent::AddBank)),
        ],
        vec![
            button("🧾 History", Callback::Go(Intent::History)),
            button("🎮 Games", Callback::Go(Intent::Games)),
        ],
        vec![
            button("💬 Support", Callback::Go(Intent::Support)),
            button("🚪 Logout", Callback::Go(Intent::Logout)),
        ],
    ])
}

/// Telegram rejects callback payloads longer than this
const MAX_CALLBACK_BYTES: usize = 64;

fn close_row() -> Vec<Button> {
    vec![button("↩️ Close", Callback::Close)]
}

pub fn close_only() -> Keyboard {
    Keyboard::Inline(vec![close_row()])
}

fn first_page(kind: GameType) -> Callback {
    Callback::GameList {
        kind,
        provider: None,
        page: 1,
    }
}

/// Link buttons for every linked support channel
pub fn support(channels: &[SupportChannel]) -> Keyboard {
    let links = channels
        .iter()
        .filter(|c| !c.is_plain())
        .filter_map(|c| {
            let url = c.url.as_deref().filter(|u| url::Url::parse(u).is_ok())?;
            Some(Button::link(c.name.clone(), url))
        })
        .collect();
    let mut rows = grid(links, 2);
    rows.push(close_row());
    Keyboard::Inline(rows)
}

pub fn game_menu() -> Keyboard {
    let types = GameType::ALL
        .iter()
        .map(|kind| button(kind.label(), first_page(*kind)))
        .collect();
    let mut rows = grid(types, 2);
    rows.push(vec![button("🔎 Search", Callback::GameSearch)]);
    rows.push(close_row());
    Keyboard::Inline(rows)
}

/// One launch button per game, then paging, then `extra` rows
fn game_page(games: &[&Game], page: u32, pagination: Pagination, to_page: impl Fn(u32) -> Callback, extra: Vec<Vec<Button>>) -> Keyboard {
    let mut rows: Vec<Vec<Button>> = games
        .iter()
        .map(|game| {
            Callback::GameLaunch {
                provider: game.provider_id.clone(),
                code: game.game_code.clone(),
            }
            .to_string()
        })
        .zip(games.iter())
        .filter(|(data, game)| {
            let fits = data.len() <= MAX_CALLBACK_BYTES;
            if !fits {
                log::warn!("Game {} skipped: launch payload too long", game.game_code);
            }
            fits
        })
        .map(|(data, game)| vec![Button::new(game.game_name.clone(), data)])
        .collect();

    let mut paging = Vec::new();
    if page > 1 {
        paging.push(button("⬅️ Previous", to_page(page - 1)));
    }
    if pagination.has_more {
        paging.push(button("Next ➡️", to_page(page + 1)));
    }
    if !paging.is_empty() {
        rows.push(paging);
    }
    rows.extend(extra);
    rows.push(close_row());
    Keyboard::Inline(rows)
}

pub fn game_list(kind: GameType, provider: Option<&str>, games: &[&Game], page: u32, pagination: Pagination) -> Keyboard {
    let to_page = |page| Callback::GameList {
        kind,
        provider: provider.map(str::to_string),
        page,
    };
    let extra = vec![vec![
        button("🔍 Filter by provider", Callback::GameProviders(kind)),
        button("⬅️ Categories", Callback::GameMenu),
    ]];
    game_page(games, page, pagination, to_page, extra)
}

pub fn game_search_results(games: &[&Game], page: u32, pagination: Pagination) -> Keyboard {
    game_page(games, page, pagination, Callback::GameSearchPage, Vec::new())
}

pub fn game_providers(kind: GameType, providers: &[GameProvider]) -> Keyboard {
    let buttons = providers
        .iter()
        .map(|p| {
            button(
                p.display_name(),
                Callback::GameList {
                    kind,
                    provider: Some(p.provider_id.clone()),
                    page: 1,
                },
            )
        })
        .filter(|b| b.data.len() <= MAX_CALLBACK_BYTES)
        .collect();
    let mut rows = grid(buttons, 2);
    rows.push(vec![button("⬅️ All providers", first_page(kind))]);
    rows.push(close_row());
    Keyboard::Inline(rows)
}

pub fn game_launch(url: &str) -> Keyboard {
    Keyboard::Inline(vec![vec![Button::link("🎮 Open game", url)], close_row()])
}

pub fn cancel_only() -> Keyboard {
    Keyboard::Inline(vec![cancel_row()])
}

pub fn request_contact() -> Keyboard {
    Keyboard::RequestContact(SHARE_CONTACT_BUTTON.to_string())
}

pub fn register_banks(banks: &[String]) -> Keyboard {
    let buttons = banks
        .iter()
        .map(|bank| button(bank.clone(), Callback::RegisterBank(bank.clone())))
        .collect();
    let mut rows = grid(buttons, 3);
    rows.push(cancel_row());
    Keyboard::Inline(rows)
}

pub fn register_skip_referral() -> Keyboard {
    Keyboard::Inline(vec![vec![button("Skip ⏭", Callback::RegisterSkip)], cancel_row()])
}

pub fn register_confirm() -> Keyboard {
    let edits = RegisterField::EDITABLE
        .iter()
        .map(|field| button(format!("✏️ {}", field.label()), Callback::RegisterEdit(*field)))
        .collect();
    let mut rows = grid(edits, 2);
    rows.push(vec![button("✅ Submit", Callback::RegisterSubmit)]);
    rows.push(cancel_row());
    Keyboard::Inline(rows)
}

pub fn add_bank_banks(banks: &[String]) -> Keyboard {
    let buttons = banks
        .iter()
        .map(|bank| button(bank.clone(), Callback::AddBankPick(bank.clone())))
        .collect();
    let mut rows = grid(buttons, 3);
    rows.push(cancel_row());
    Keyboard::Inline(rows)
}

pub fn add_bank_confirm() -> Keyboard {
    let edits = [AddBankField::Bank, AddBankField::AccountName, AddBankField::AccountNumber]
        .into_iter()
        .map(|field| button(format!("✏️ {}", field.label()), Callback::AddBankEdit(field)))
        .collect();
    let mut rows = grid(edits, 3);
    rows.push(vec![button("✅ Add account", Callback::AddBankSubmit)]);
    rows.push(cancel_row());
    Keyboard::Inline(rows)
}

fn back_to(step: DepositStep, label: &str) -> Button {
    button(format!("⬅️ {}", label), Callback::DepositBack(step))
}

pub fn deposit_methods(data: &DepositData) -> Keyboard {
    let mut methods = Vec::new();
    if !data.deposit_banks.is_empty() {
        methods.push(button("🏦 Bank transfer", Callback::DepositMethod(DepositMethod::Bank)));
    }
    if !data.qris.is_empty() {
        methods.push(button("📱 QRIS", Callback::DepositMethod(DepositMethod::Qris)));
    }
    if !data.va.is_empty() {
        methods.push(button("🔢 Virtual account", Callback::DepositMethod(DepositMethod::Va)));
    }
    let mut rows = grid(methods, 3);
    rows.push(cancel_row());
    Keyboard::Inline(rows)
}

pub fn deposit_channels(data: &DepositData) -> Keyboard {
    let channels = data
        .channels()
        .into_iter()
        .map(|c| {
            let label = match c.status {
                ChannelStatus::Online => c.label,
                ChannelStatus::Offline => format!("{} (offline)", c.label),
                ChannelStatus::Maintenance => format!("{} (maintenance)", c.label),
            };
            button(label, Callback::DepositChannel(c.id))
        })
        .collect();
    let mut rows = grid(channels, 1);
    rows.push(vec![back_to(DepositStep::ChooseMethod, "Method")]);
    rows.push(cancel_row());
    Keyboard::Inline(rows)
}

pub fn deposit_user_banks(data: &DepositData) -> Keyboard {
    let banks = data
        .source_banks()
        .into_iter()
        .map(|b| {
            button(
                format!("{} {}", b.bank_name, b.bank_account_number),
                Callback::DepositUserBank(b.id),
            )
        })
        .collect();
    let mut rows = grid(banks, 1);
    rows.push(vec![back_to(DepositStep::ChooseChannel, "Channel")]);
    rows.push(cancel_row());
    Keyboard::Inline(rows)
}

pub fn deposit_promos(data: &DepositData) -> Keyboard {
    let promos = data
        .promos
        .iter()
        .map(|p| button(p.name.clone(), Callback::DepositPromo(p.id)))
        .collect();
    let mut rows = grid(promos, 1);
    rows.push(vec![back_to(DepositStep::ChooseUserBank, "Source account")]);
    rows.push(cancel_row());
    Keyboard::Inline(rows)
}

pub fn promo_preview(promo_id: i64) -> Keyboard {
    Keyboard::Inline(vec![
        vec![button("✅ Use this promo", Callback::DepositPromoConfirm(promo_id))],
        vec![button("⬅️ Other promos", Callback::DepositPromoList)],
        cancel_row(),
    ])
}

/// Previously used amounts that still fit the current bounds
pub fn quick_amounts(recent: &[i64], bounds: &AmountBounds, to_callback: fn(i64) -> Callback) -> Vec<Vec<Button>> {
    let buttons: Vec<Button> = recent
        .iter()
        .copied()
        .filter(|a| bounds.contains(*a))
        .map(|a| button(format_rupiah(a), to_callback(a)))
        .collect();
    grid(buttons, 3)
}

/// Back button for the step before amount entry, if there is one
fn amount_back(data: &DepositData) -> Option<Button> {
    match data.method {
        Some(DepositMethod::Bank) if !data.promos.is_empty() => Some(back_to(DepositStep::ChoosePromo, "Promo")),
        Some(DepositMethod::Bank) => Some(back_to(DepositStep::ChooseUserBank, "Source account")),
        Some(_) => Some(back_to(DepositStep::ChooseChannel, "Channel")),
        None => None,
    }
}

pub fn deposit_amount(data: &DepositData, recent: &[i64], bounds: &AmountBounds) -> Keyboard {
    let mut rows = quick_amounts(recent, bounds, Callback::DepositAmount);
    rows.extend(amount_back(data).map(|b| vec![b]));
    rows.push(cancel_row());
    Keyboard::Inline(rows)
}

pub fn deposit_note() -> Keyboard {
    Keyboard::Inline(vec![vec![button("Skip ⏭", Callback::DepositSkipNote)], cancel_row()])
}

pub fn deposit_confirm(retry: bool) -> Keyboard {
    let label = if retry { "🔁 Try again" } else { "✅ Confirm" };
    Keyboard::Inline(vec![
        vec![button(label, Callback::DepositSubmit)],
        vec![back_to(DepositStep::ChooseMethod, "Start over")],
        cancel_row(),
    ])
}

pub fn withdraw_amount(recent: &[i64], bounds: &AmountBounds) -> Keyboard {
    let mut rows = quick_amounts(recent, bounds, Callback::WithdrawAmount);
    rows.push(cancel_row());
    Keyboard::Inline(rows)
}

pub fn withdraw_confirm(retry: bool) -> Keyboard {
    let label = if retry { "🔁 Try again" } else { "✅ Confirm" };
    Keyboard::Inline(vec![vec![button(label, Callback::WithdrawSubmit)], cancel_row()])
}
