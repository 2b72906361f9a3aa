//! User-facing texts (HTML parse mode)

use indoc::formatdoc;
use teloxide::utils::html::{bold, code_inline, escape};

use crate::backend::types::{GameType, GatewayReceipt, Promo, SupportChannel, Transaction, UserBank};
use crate::backend::ApiResponse;
use crate::core::utils::{format_rupiah, mask_tail};
use crate::core::validation::FieldError;
use crate::flow::fsm::{AddBankField, LoginField, RegisterField};
use crate::state::action::{AmountBounds, DepositData, DepositMethod, WithdrawData};
use crate::state::{AddBankModel, RegisterModel, UserModel};

pub const GENERIC_ERROR: &str = "Something went wrong. Please try again in a moment.";
pub const RESTART_FLOW: &str = "This session has expired. Please start again from the menu.";
pub const SESSION_EXPIRED: &str = "Your session has ended. Please log in again.";
pub const LOGIN_REQUIRED: &str = "Please log in first.";
pub const LOGOUT_FIRST: &str = "You are already logged in. Please log out first.";
pub const USE_MENU: &str = "Please use the menu below.";
pub const STALE_BUTTON: &str = "This button is no longer active";
pub const CHANNEL_UNAVAILABLE: &str = "This channel is currently unavailable";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const CANCELLED: &str = "Cancelled.";
pub const ASK_CONTACT: &str = "Please share your contact using the button below to continue.";
pub const CONTACT_NOT_OWN: &str = "Please share your own contact, not someone else's.";
pub const CONTACT_SAVED: &str = "Thank you, your contact has been verified.";
pub const SHARE_CONTACT_BUTTON: &str = "Share my contact";
pub const LOGGED_OUT: &str = "You have been logged out.";
pub const ACCOUNT_RESTRICTED: &str = "Your account is not active. Please contact support.";
pub const DEPOSIT_PENDING: &str = "You already have a pending deposit. Please wait until it is processed.";
pub const WITHDRAW_PENDING: &str = "You already have a pending withdrawal. Please wait until it is processed.";
pub const NO_PAYOUT_ACCOUNT: &str = "No payout account is registered. Please add a bank account first.";
pub const NO_BANKS_TO_ADD: &str = "There are no more banks you can add.";
pub const NO_TRANSACTIONS: &str = "No deposits or withdrawals yet.";
pub const GAME_MENU: &str = "🎮 Pick a game category, or search by name.";
pub const GAME_SEARCH_PROMPT: &str = "Send the name of a game or provider to search for.";
pub const GAME_UNAVAILABLE: &str = "This game cannot be opened right now";
pub const NO_GAMES: &str = "No games found.";
pub const NO_ACCOUNTS: &str = "You have no bank accounts yet. Use <b>Add account</b> to register one.";

fn with_error(prompt: String, error: Option<&FieldError>) -> String {
    match error {
        Some(e) => format!("⚠️ {}\n\n{}", escape(&e.to_string()), prompt),
        None => prompt,
    }
}

pub fn guest_menu(site_name: &str, notice: Option<&str>) -> String {
    let body = format!("Welcome to {}!\nLog in or create an account to continue.", bold(&escape(site_name)));
    prefixed(notice, body)
}

pub fn user_menu(site_name: &str, user: &UserModel, notice: Option<&str>) -> String {
    let rank = user
        .rank
        .as_deref()
        .map(|r| format!("\nRank: {}", escape(r)))
        .unwrap_or_default();
    let body = formatdoc! {"
        {site} | {name}
        Balance: {balance}{rank}
        Status: {status}",
        site = bold(&escape(site_name)),
        name = escape(&user.username),
        balance = bold(&format_rupiah(user.credit.round() as i64)),
        rank = rank,
        status = user.status,
    };
    prefixed(notice, body)
}

fn prefixed(notice: Option<&str>, body: String) -> String {
    match notice {
        Some(notice) => format!("{}\n\n{}", escape(notice), body),
        None => body,
    }
}

/// Backend rejection with any field-level detail, one per line
pub fn backend_error(response: &ApiResponse) -> String {
    let mut text = format!("❌ {}", escape(response.error_message()));
    for line in response.validation_messages() {
        text.push_str("\n• ");
        text.push_str(&escape(&line));
    }
    text
}

pub fn login_prompt(field: LoginField, error: Option<&FieldError>) -> String {
    let prompt = match field {
        LoginField::Username => "🔐 Login\n\nPlease send your username.",
        LoginField::Password => "Please send your password.",
        LoginField::Captcha => "Please type the characters shown in the captcha.",
    };
    with_error(prompt.to_string(), error)
}

pub fn login_success(username: &str) -> String {
    format!("✅ Welcome back, {}!", escape(username))
}

pub fn register_prompt(field: RegisterField, error: Option<&FieldError>) -> String {
    let prompt = match field {
        RegisterField::Username => "📝 Registration\n\nChoose a username (6-16 letters or digits).",
        RegisterField::Password => "Choose a password (at least 6 characters).",
        RegisterField::BankName => "Pick your bank.",
        RegisterField::AccountName => "Send the account holder name, exactly as it appears at the bank.",
        RegisterField::AccountNumber => "Send your bank account number (digits only).",
        RegisterField::Referral => "Send a referral code, or skip this step.",
        RegisterField::Captcha => "Please type the characters shown in the captcha.",
    };
    with_error(prompt.to_string(), error)
}

pub fn register_summary(model: &RegisterModel) -> String {
    let value = |field: RegisterField| match (field, model.field(field)) {
        (RegisterField::Password, Some(p)) => "•".repeat(p.chars().count()),
        (_, Some(v)) => v.to_string(),
        (_, None) => "-".to_string(),
    };
    let mut text = String::from("Please check your details:\n");
    for field in RegisterField::EDITABLE {
        text.push_str(&format!("\n{}: {}", field.label(), code_inline(&value(*field))));
    }
    text
}

pub fn register_success(username: &str) -> String {
    format!("✅ Account {} created. You can log in now.", bold(&escape(username)))
}

pub fn add_bank_prompt(field: AddBankField, error: Option<&FieldError>) -> String {
    let prompt = match field {
        AddBankField::Bank => "🏦 Add bank account\n\nPick the bank.",
        AddBankField::AccountName => "Send the account holder name (letters only, at least 5).",
        AddBankField::AccountNumber => "Send the account number (digits only, at least 8).",
    };
    with_error(prompt.to_string(), error)
}

pub fn add_bank_summary(model: &AddBankModel) -> String {
    let mut text = String::from("Add this account?\n");
    for field in [AddBankField::Bank, AddBankField::AccountName, AddBankField::AccountNumber] {
        text.push_str(&format!(
            "\n{}: {}",
            field.label(),
            code_inline(model.field(field).unwrap_or("-"))
        ));
    }
    text
}

pub const ADD_BANK_SUCCESS: &str = "✅ Bank account added.";

pub fn account_list(banks: &[UserBank]) -> String {
    if banks.is_empty() {
        return NO_ACCOUNTS.to_string();
    }
    let mut text = String::from("🏦 Your bank accounts\n");
    for bank in banks {
        text.push_str(&format!(
            "\n{} {} a/n {}{}",
            bold(&escape(&bank.bank_name)),
            code_inline(&mask_tail(&bank.bank_account_number)),
            escape(&bank.bank_account_name),
            if bank.default { " (default)" } else { "" }
        ));
    }
    text
}

pub fn transaction_history(transactions: &[Transaction]) -> String {
    let mut text = String::from(
        "🧾 <b>Transaction history</b>\n📥 Deposit | 📤 Withdraw\n🕒 In progress | ❌ Rejected | ✅ Success\n",
    );
    if transactions.is_empty() {
        text.push('\n');
        text.push_str(NO_TRANSACTIONS);
        return text;
    }
    for tx in transactions {
        text.push_str(&format!(
            "\n{} | {} | {} | {}",
            tx.kind_icon(),
            format_rupiah(tx.amount.unwrap_or_default()),
            escape(tx.last_update.as_deref().unwrap_or("-")),
            tx.report.map_or("❓", |r| r.icon())
        ));
    }
    text
}

pub fn support(channels: &[SupportChannel]) -> String {
    let mut text = String::from("💬 Reach us through any of these channels.");
    for channel in channels.iter().filter(|c| c.is_plain()) {
        let value = channel.value.as_deref().unwrap_or_default();
        if !value.is_empty() {
            text.push_str(&format!("\n{}: {}", escape(&channel.name), code_inline(value)));
        }
    }
    text
}

fn page_of(page: u32, last_page: u32) -> String {
    format!("page {}/{}", page, last_page.max(page))
}

pub fn game_list(kind: GameType, provider_name: Option<&str>, page: u32, last_page: u32) -> String {
    let category = bold(&escape(kind.label()));
    match provider_name.filter(|p| !p.is_empty() && *p != "all") {
        Some(provider) => format!(
            "{} games by {}, {}:",
            category,
            bold(&escape(provider)),
            page_of(page, last_page)
        ),
        None => format!("{} games from every provider, {}:", category, page_of(page, last_page)),
    }
}

pub fn game_providers(kind: GameType) -> String {
    format!("Providers for {} games:", bold(&escape(kind.label())))
}

pub fn game_search_results(text: &str, page: u32, last_page: u32) -> String {
    format!("Games matching {}, {}:", bold(&escape(text)), page_of(page, last_page))
}

pub fn game_search_empty(text: &str) -> String {
    format!("❌ No games match {}.", bold(&escape(text)))
}

pub fn game_search_prompt(error: Option<&FieldError>) -> String {
    with_error(GAME_SEARCH_PROMPT.to_string(), error)
}

pub fn game_launch(name: &str) -> String {
    format!("🎮 {}\n\nTap the button below to open the game.", bold(&escape(name)))
}

pub fn deposit_method_prompt() -> String {
    "💰 Deposit\n\nChoose a payment method.".to_string()
}

pub fn deposit_channel_prompt(method: DepositMethod) -> String {
    match method {
        DepositMethod::Bank => "Choose the destination bank.".to_string(),
        DepositMethod::Qris => "Choose a QRIS provider.".to_string(),
        DepositMethod::Va => "Choose a virtual account provider.".to_string(),
    }
}

pub fn deposit_user_bank_prompt() -> String {
    "Which of your accounts will you transfer from?".to_string()
}

pub fn deposit_promo_prompt() -> String {
    "🎁 Pick a promo for this deposit.".to_string()
}

/// Promo detail shown before the second, committing tap
pub fn promo_terms(promo: &Promo) -> String {
    let mut text = format!("🎁 {}", bold(&escape(&promo.name)));
    if promo.minimum_deposit > 0 {
        text.push_str(&format!("\nMinimum deposit: {}", format_rupiah(promo.minimum_deposit)));
    }
    for (key, value) in &promo.terms {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        text.push_str(&format!("\n{}: {}", escape(&key.replace('_', " ")), escape(&value)));
    }
    text.push_str("\n\nUse this promo?");
    text
}

pub fn amount_prompt(bounds: &AmountBounds, error: Option<&FieldError>) -> String {
    let mut prompt = match bounds.max {
        Some(max) => format!(
            "Send the amount.\nMinimum {}, maximum {}.",
            format_rupiah(bounds.min),
            format_rupiah(max)
        ),
        None => format!("Send the amount.\nMinimum {}.", format_rupiah(bounds.min)),
    };
    if let Some(step) = bounds.multiple.filter(|m| *m > 1) {
        prompt.push_str(&format!("\nMust be a multiple of {}.", format_rupiah(step)));
    }
    with_error(prompt, error)
}

pub fn deposit_note_prompt() -> String {
    "Add a note for the transfer, or skip.".to_string()
}

pub fn deposit_summary(data: &DepositData) -> String {
    let mut lines = vec!["Please confirm your deposit:".to_string(), String::new()];
    if let Some(method) = data.method {
        lines.push(format!("Method: {}", method));
    }
    if let Some(channel) = data.selected_channel() {
        lines.push(format!("Channel: {}", escape(&channel.label)));
    }
    if let Some(bank) = data.user_bank() {
        lines.push(format!(
            "From: {} {}",
            escape(&bank.bank_name),
            code_inline(&mask_tail(&bank.bank_account_number))
        ));
    }
    if let Some(promo) = data.selected_promo().filter(|p| !p.is_none_choice()) {
        lines.push(format!("Promo: {}", escape(&promo.name)));
    }
    if let Some(amount) = data.amount {
        lines.push(format!("Amount: {}", bold(&format_rupiah(amount))));
    }
    if let Some(note) = data.note.as_deref().filter(|n| !n.is_empty()) {
        lines.push(format!("Note: {}", escape(note)));
    }
    lines.join("\n")
}

pub fn deposit_submitted(amount: i64) -> String {
    format!("✅ Deposit request of {} submitted.", format_rupiah(amount))
}

pub fn gateway_receipt(method: DepositMethod, amount: i64, receipt: &GatewayReceipt) -> String {
    let mut text = match method {
        DepositMethod::Va => format!(
            "Transfer {} to virtual account\n{}",
            bold(&format_rupiah(amount)),
            code_inline(&receipt.payment)
        ),
        _ => format!("Scan the QR code to pay {}", bold(&format_rupiah(amount))),
    };
    if let Some(expiry) = receipt.expired_date.as_deref() {
        text.push_str(&format!("\nPay before {}", escape(expiry)));
    }
    if let Some(reference) = receipt.merchant_ref.as_deref() {
        text.push_str(&format!("\nReference: {}", code_inline(reference)));
    }
    text
}

pub fn withdraw_amount_prompt(data: &WithdrawData, error: Option<&FieldError>) -> String {
    let header = format!(
        "💸 Withdraw\n\nPayout to {} {} a/n {}\n\n",
        escape(&data.account.bank),
        code_inline(&mask_tail(&data.account.rekening)),
        escape(&data.account.name)
    );
    header + &amount_prompt(&data.bounds(), error)
}

pub fn withdraw_summary(data: &WithdrawData) -> String {
    format!(
        "Please confirm your withdrawal:\n\nAmount: {}\nTo: {} {} a/n {}",
        bold(&format_rupiah(data.amount.unwrap_or_default())),
        escape(&data.account.bank),
        code_inline(&mask_tail(&data.account.rekening)),
        escape(&data.account.name)
    )
}

pub fn withdraw_submitted(amount: i64) -> String {
    format!("✅ Withdrawal of {} submitted.", format_rupiah(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_amount_error_names_both_bounds() {
        let bounds = AmountBounds {
            min: 50_000,
            max: Some(10_000_000),
            multiple: None,
        };
        let error = bounds.check(20_000).unwrap_err();
        let text = amount_prompt(&bounds, Some(&error));
        assert!(text.contains("Rp.50,000"));
        assert!(text.contains("Rp.10,000,000"));
        assert!(text.starts_with("⚠️"));
    }

    #[test]
    fn test_amount_prompt_without_maximum() {
        let bounds = AmountBounds {
            min: 10_000,
            max: None,
            multiple: None,
        };
        let text = amount_prompt(&bounds, None);
        assert!(text.contains("Minimum Rp.10,000."));
        assert!(!text.contains("maximum"));
        assert!(!text.contains("9,223,372"));
    }

    #[test]
    fn test_history_lines_and_empty_hint() {
        let tx: Transaction = serde_json::from_value(json!({
            "type": "withdraw", "report": "REJECTED", "lastUpdate": "2024-05-02 09:30", "amount": 150000
        }))
        .unwrap();
        let text = transaction_history(&[tx]);
        assert!(text.contains("📤 | Rp.150,000 | 2024-05-02 09:30 | ❌"));
        assert!(!text.contains(NO_TRANSACTIONS));
        assert!(transaction_history(&[]).ends_with(NO_TRANSACTIONS));
    }

    #[test]
    fn test_backend_error_lists_fields() {
        let resp: ApiResponse = serde_json::from_value(json!({
            "error": {"code": 422, "message": "Invalid data"},
            "metadata": {"validation": {"username": ["already taken"]}}
        }))
        .unwrap();
        assert_eq!(backend_error(&resp), "❌ Invalid data\n• username: already taken");
    }

    #[test]
    fn test_register_summary_hides_password() {
        let mut model = RegisterModel::default();
        model.set_field(RegisterField::Password, Some("secret1".into()));
        let text = register_summary(&model);
        assert!(!text.contains("secret1"));
        assert!(text.contains("•••••••"));
    }
}
