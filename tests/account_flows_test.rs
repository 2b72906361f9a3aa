//! Deposit, withdraw and add-bank flows for a logged-in user
//!
//! Run with: cargo test --test account_flows_test

mod common;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;

use common::{envelope, rejection, TestChat};
use otpbot::flow::callback::Callback;
use otpbot::flow::fsm::{AddBankField, DepositStep, WithdrawStep, WizardStep};
use otpbot::flow::{ConversationState, Intent};
use otpbot::state::action::DepositMethod;
use otpbot::state::TelegramData;
use otpbot::telegram::messages;

fn withdraw_init() -> Value {
    json!({
        "pending_wd": false,
        "rekening_wd": {"name": "Budi Santoso", "rekening": "1234567890", "bank": "BCA"},
        "min_amount": 50000,
        "max_amount": 5000000,
        "withdraw_multiple": 1000
    })
}

fn deposit_init() -> Value {
    json!({
        "pending_deposit": false,
        "min_deposit": 10000,
        "max_deposit": 10000000,
        "bank": {
            "user_rekening": [
                {"id": 1, "bank_name": "BCA", "bank_account_name": "Budi Santoso", "bank_account_number": "1234567890", "default": true}
            ],
            "rekening_tujuan": [
                {"id": 9, "bank_name": "BCA", "bank_account_display": "BCA 999", "status": 1},
                {"id": 10, "bank_name": "BRI", "bank_account_display": "BRI 555", "status": 2}
            ]
        },
        "payment_gateway": {"QRIS": [{"id": 3, "name": "qris-a", "status": 1}], "VA": []},
        "list_promo_event": [
            {"id": 0, "name": "No promo", "minimum_deposit": 0},
            {"id": 4, "name": "Weekend", "minimum_deposit": 50000, "turnover": 3}
        ]
    })
}

async fn logged_in_chat() -> TestChat {
    let chat = TestChat::start().await;
    chat.logged_in("budi123").await;
    chat.backend("GET", "/withdraw/initiate", envelope(withdraw_init()))
        .await;
    chat.backend("GET", "/deposit/initiate", envelope(deposit_init()))
        .await;
    chat
}

#[tokio::test]
async fn test_withdraw_amount_bounds_then_submit() {
    let chat = logged_in_chat().await;
    chat.backend_expect("POST", "/withdraw", envelope(json!({})), 1).await;

    chat.command(Intent::Withdraw).await;
    assert_eq!(chat.state().await, ConversationState::Withdraw(WithdrawStep::AskAmount));

    chat.say("10000").await;
    assert_eq!(chat.state().await, ConversationState::Withdraw(WithdrawStep::AskAmount));
    let data = chat.user().await.unwrap().action.unwrap();
    assert_eq!(data.withdraw().unwrap().amount, None);

    chat.say("150.500").await;
    assert_eq!(
        chat.state().await,
        ConversationState::Withdraw(WithdrawStep::AskAmount),
        "not a multiple of 1000"
    );

    chat.say("150.000").await;
    assert_eq!(chat.state().await, ConversationState::Withdraw(WithdrawStep::Confirm));

    // Every screen is rendered into the single prompt message
    let prompt = chat.user().await.unwrap().action.unwrap().withdraw().unwrap().prompt;
    assert!(prompt.is_some());
    assert!(chat.transport.edits().iter().all(|(id, _)| Some(*id) == prompt));

    chat.press_on(prompt, Callback::WithdrawSubmit).await;

    assert_eq!(chat.state().await, ConversationState::MainMenu);
    let user = chat.user().await.unwrap();
    assert!(user.action.is_none());
    assert!(user.pending_withdraw);
    assert_eq!(chat.requests_to("/withdraw").await[0]["amount"], 150000);
    let recent = chat.load::<TelegramData>().await.unwrap().recent_withdraws;
    assert_eq!(recent, vec![150000]);
}

#[tokio::test]
async fn test_cancel_withdraw_never_calls_backend() {
    let chat = logged_in_chat().await;
    chat.command(Intent::Withdraw).await;
    let prompt = chat.user().await.unwrap().action.unwrap().withdraw().unwrap().prompt;
    let calls_before = chat.server.received_requests().await.unwrap().len();

    chat.command(Intent::Cancel).await;

    assert_eq!(chat.server.received_requests().await.unwrap().len(), calls_before);
    assert_eq!(chat.state().await, ConversationState::MainMenu);
    assert!(chat.user().await.unwrap().action.is_none());
    assert!(!chat.transport.is_visible(prompt.unwrap()));
    assert!(chat.transport.any_text_contains(messages::CANCELLED));
}

#[tokio::test]
async fn test_cancelled_action_stays_stored_until_its_messages_are_gone() {
    let chat = logged_in_chat().await;
    chat.command(Intent::Withdraw).await;
    chat.say("10000").await;
    chat.say("abc").await;
    let ledger = chat.user().await.unwrap().action.unwrap().ledger.ids().to_vec();
    assert_eq!(ledger.len(), 3);

    // Deletes take longer than the save debounce
    chat.transport.slow_deletes(Duration::from_millis(30));
    chat.transport.watch_session(chat.store.clone(), chat.id());
    chat.command(Intent::Cancel).await;

    let seen = chat.transport.deletes_seen();
    for id in &ledger {
        assert!(seen.contains(&(*id, true)), "message {} deleted after the action left the store: {:?}", id, seen);
        assert!(!chat.transport.is_visible(*id));
    }
    assert!(chat.user().await.unwrap().action.is_none());
}

#[tokio::test]
async fn test_cancel_with_nothing_in_progress() {
    let chat = logged_in_chat().await;

    chat.command(Intent::Cancel).await;

    assert_eq!(chat.state().await, ConversationState::MainMenu);
    assert!(chat.transport.any_text_contains(messages::NOTHING_TO_CANCEL));
}

#[tokio::test]
async fn test_starting_an_action_ends_the_previous_one() {
    let chat = logged_in_chat().await;
    chat.command(Intent::Withdraw).await;
    let withdraw_prompt = chat
        .user()
        .await
        .unwrap()
        .action
        .unwrap()
        .withdraw()
        .unwrap()
        .prompt
        .unwrap();

    chat.command(Intent::Deposit).await;

    let action = chat.user().await.unwrap().action.unwrap();
    assert_eq!(action.kind(), "deposit");
    assert!(!chat.transport.is_visible(withdraw_prompt));
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::ChooseMethod));
}

#[tokio::test]
async fn test_pending_withdraw_is_refused() {
    let chat = TestChat::start().await;
    chat.logged_in("budi123").await;
    let mut init = withdraw_init();
    init["pending_wd"] = json!(true);
    chat.backend("GET", "/withdraw/initiate", envelope(init)).await;

    chat.command(Intent::Withdraw).await;

    assert_eq!(chat.state().await, ConversationState::MainMenu);
    assert!(chat.user().await.unwrap().pending_withdraw);
    assert!(chat.transport.any_text_contains(messages::WITHDRAW_PENDING));
}

#[tokio::test]
async fn test_bank_deposit_with_promo() {
    let chat = logged_in_chat().await;
    chat.backend_expect("POST", "/deposit/bank", envelope(json!({})), 1)
        .await;

    chat.command(Intent::Deposit).await;
    chat.press(Callback::DepositMethod(DepositMethod::Bank)).await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::ChooseChannel));

    // Channel under maintenance: toast only, nothing moves
    chat.press(Callback::DepositChannel(10)).await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::ChooseChannel));
    assert_eq!(
        chat.transport.answers().last().and_then(|a| a.text.clone()).as_deref(),
        Some(messages::CHANNEL_UNAVAILABLE)
    );

    chat.press(Callback::DepositChannel(9)).await;
    chat.press(Callback::DepositUserBank(1)).await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::ChoosePromo));

    // A real promo is previewed before it is taken
    chat.press(Callback::DepositPromo(4)).await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::ChoosePromo));
    chat.press(Callback::DepositPromoConfirm(4)).await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::AskAmount));

    // The promo minimum replaces the backend minimum
    chat.say("20000").await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::AskAmount));
    chat.say("60000").await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::AskNote));

    chat.press(Callback::DepositSkipNote).await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::Confirm));
    chat.press(Callback::DepositSubmit).await;

    assert_eq!(chat.state().await, ConversationState::MainMenu);
    let user = chat.user().await.unwrap();
    assert!(user.pending_deposit);
    assert!(user.action.is_none());
    let body = &chat.requests_to("/deposit/bank").await[0];
    assert_eq!(body["promo_id"], 4);
    assert_eq!(body["amount"], 60000);
    assert_eq!(body["deposit_bank_id"], 9);
    assert_eq!(body["notes"], "");
}

#[tokio::test]
async fn test_deposit_choice_on_earlier_prompt_rewinds() {
    let chat = logged_in_chat().await;
    chat.command(Intent::Deposit).await;
    chat.press(Callback::DepositMethod(DepositMethod::Bank)).await;
    let method_prompt = chat.transport.sent()[0].id;
    chat.press(Callback::DepositChannel(9)).await;
    let user_bank_prompt = chat.transport.last_sent().unwrap().id;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::ChooseUserBank));

    chat.press_on(Some(method_prompt), Callback::DepositMethod(DepositMethod::Qris))
        .await;

    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::ChooseChannel));
    let action = chat.user().await.unwrap().action.unwrap();
    let data = action.deposit().unwrap();
    assert_eq!(data.method, Some(DepositMethod::Qris));
    assert_eq!(data.channel_id, None);
    assert!(!chat.transport.is_visible(user_bank_prompt));
}

#[tokio::test]
async fn test_deposit_back_button_forgets_later_choices() {
    let chat = logged_in_chat().await;
    chat.command(Intent::Deposit).await;
    chat.press(Callback::DepositMethod(DepositMethod::Bank)).await;
    chat.press(Callback::DepositChannel(9)).await;
    chat.press(Callback::DepositUserBank(1)).await;
    chat.press(Callback::DepositPromo(4)).await;
    chat.press(Callback::DepositPromoConfirm(4)).await;
    chat.say("60000").await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::AskNote));

    let action = chat.user().await.unwrap().action.unwrap();
    let data = action.deposit().unwrap();
    assert_eq!(data.promo_id, Some(4));
    assert_eq!(data.amount, Some(60000));
    let channel_prompt = data.prompt(DepositStep::ChooseChannel).unwrap();
    let later_prompts: Vec<i32> = [
        DepositStep::ChooseUserBank,
        DepositStep::ChoosePromo,
        DepositStep::AskAmount,
        DepositStep::AskNote,
    ]
    .into_iter()
    .filter_map(|step| data.prompt(step))
    .collect();
    assert_eq!(later_prompts.len(), 4);
    let note_prompt = data.prompt(DepositStep::AskNote);
    let sent_before = chat.transport.sent().len();

    chat.press_on(note_prompt, Callback::DepositBack(DepositStep::ChooseChannel))
        .await;

    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::ChooseChannel));
    let action = chat.user().await.unwrap().action.unwrap();
    let data = action.deposit().unwrap();
    assert_eq!(data.method, Some(DepositMethod::Bank));
    assert_eq!(data.channel_id, None);
    assert_eq!(data.user_bank_id, None);
    assert_eq!(data.promo_id, None);
    assert_eq!(data.amount, None);
    for id in later_prompts {
        assert!(!chat.transport.is_visible(id), "prompt {} should be deleted", id);
        assert!(!action.ledger.contains(id));
    }
    // The channel prompt is reused, not sent again
    assert!(chat.transport.edits().iter().any(|(id, _)| *id == channel_prompt));
    assert_eq!(chat.transport.sent().len(), sent_before);
    assert_eq!(data.prompt(DepositStep::ChooseChannel), Some(channel_prompt));
}

#[tokio::test]
async fn test_cancel_deposit_midway_clears_the_action() {
    let chat = logged_in_chat().await;
    chat.command(Intent::Deposit).await;
    chat.press(Callback::DepositMethod(DepositMethod::Qris)).await;
    chat.press(Callback::DepositChannel(3)).await;
    let prompts = chat.user().await.unwrap().action.unwrap().ledger.ids().to_vec();
    let calls_before = chat.server.received_requests().await.unwrap().len();

    chat.command(Intent::Cancel).await;

    assert_eq!(chat.server.received_requests().await.unwrap().len(), calls_before);
    assert_eq!(chat.state().await, ConversationState::MainMenu);
    assert!(chat.user().await.unwrap().action.is_none());
    assert!(prompts.iter().all(|id| !chat.transport.is_visible(*id)));
    assert!(chat.transport.any_text_contains(messages::CANCELLED));
}

#[tokio::test]
async fn test_qris_deposit_sends_receipt_image() {
    let chat = logged_in_chat().await;
    chat.backend(
        "POST",
        "/deposit/gateway",
        envelope(json!({"payment": "https://pay.example/qr.png", "expiredDate": "2026-10-20 10:00"})),
    )
    .await;

    chat.command(Intent::Deposit).await;
    chat.press(Callback::DepositMethod(DepositMethod::Qris)).await;
    chat.press(Callback::DepositChannel(3)).await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::AskAmount));
    chat.say("25000").await;
    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::Confirm));
    chat.press(Callback::DepositSubmit).await;

    assert_eq!(chat.state().await, ConversationState::MainMenu);
    let photo = chat.transport.sent().into_iter().find(|m| m.photo.is_some());
    assert_eq!(photo.unwrap().photo.as_deref(), Some("https://pay.example/qr.png"));
    let body = &chat.requests_to("/deposit/gateway").await[0];
    assert_eq!(body["type"], "QRIS");
    assert_eq!(body["payment_gateway_id"], "3");
}

#[tokio::test]
async fn test_deposit_rejection_offers_retry() {
    let chat = logged_in_chat().await;
    chat.backend("POST", "/deposit/gateway", rejection(400, "Gateway offline"))
        .await;

    chat.command(Intent::Deposit).await;
    chat.press(Callback::DepositMethod(DepositMethod::Qris)).await;
    chat.press(Callback::DepositChannel(3)).await;
    chat.say("25000").await;
    chat.press(Callback::DepositSubmit).await;

    assert_eq!(chat.state().await, ConversationState::Deposit(DepositStep::Confirm));
    assert!(chat.user().await.unwrap().action.is_some());
    assert!(chat.transport.any_text_contains("Gateway offline"));
}

#[tokio::test]
async fn test_add_bank_offers_only_banks_not_owned() {
    let chat = logged_in_chat().await;
    chat.backend(
        "GET",
        "/rekening/initiate",
        envelope(json!({"bankList": ["BCA", "BNI", "MANDIRI"], "userBankList": ["bca"]})),
    )
    .await;
    chat.backend_expect("POST", "/rekening", envelope(json!({})), 1).await;

    chat.command(Intent::AddBank).await;
    assert_eq!(
        chat.state().await,
        ConversationState::AddBank(WizardStep::Ask(AddBankField::Bank))
    );
    let add_bank = chat.user().await.unwrap().add_bank.unwrap();
    assert_eq!(add_bank.bank_list, vec!["BNI", "MANDIRI"]);

    chat.press(Callback::AddBankPick("BCA".into())).await;
    assert_eq!(
        chat.state().await,
        ConversationState::AddBank(WizardStep::Ask(AddBankField::Bank))
    );

    chat.press(Callback::AddBankPick("BNI".into())).await;
    chat.say("Budi Santoso").await;
    chat.say("9876543210").await;
    assert_eq!(chat.state().await, ConversationState::AddBank(WizardStep::Confirm));

    chat.press(Callback::AddBankEdit(AddBankField::AccountName)).await;
    chat.say("Budi Santosa").await;
    assert_eq!(chat.state().await, ConversationState::AddBank(WizardStep::Confirm));

    chat.press(Callback::AddBankSubmit).await;

    assert_eq!(chat.state().await, ConversationState::MainMenu);
    assert!(chat.user().await.unwrap().add_bank.is_none());
    let body = &chat.requests_to("/rekening").await[0];
    assert_eq!(body["bank_name"], "BNI");
    assert_eq!(body["bank_account_name"], "Budi Santosa");
    assert!(chat.transport.any_text_contains(messages::ADD_BANK_SUCCESS));
}

#[tokio::test]
async fn test_accounts_lists_registered_banks() {
    let chat = logged_in_chat().await;
    chat.backend(
        "GET",
        "/rekening",
        envelope(json!([
            {"id": 1, "bank_name": "BCA", "bank_account_name": "Budi Santoso", "bank_account_number": "1234567890", "default": true}
        ])),
    )
    .await;

    chat.command(Intent::Accounts).await;

    assert_eq!(chat.state().await, ConversationState::MainMenu);
    assert!(chat.transport.any_text_contains("Budi Santoso"));
}
