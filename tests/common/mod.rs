//! Common test utilities
//!
//! This module is shared across all integration tests. A [`TestChat`] is one
//! private chat with the bot: an in-memory session store, a recording
//! transport and a wiremock server standing in for the OTP backend.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use otpbot::backend::types::Profile;
use otpbot::backend::OtpClient;
use otpbot::flow::callback::Callback;
use otpbot::flow::{dispatch, ConversationState, FlowDeps, Inbound, Input, Intent};
use otpbot::state::{SessionScope, StatefulEntity, UserModel};
use otpbot::storage::{ConversationId, MemoryStore, SessionStore};
use otpbot::FlowSettings;

#[path = "../mocks/mod.rs"]
pub mod mocks;

pub use mocks::RecordingTransport;

pub const BOT_ID: u64 = 42;
pub const CHAT_ID: i64 = 5001;
pub const USER_ID: u64 = 5001;

const API_PREFIX: &str = "/api/v1/telegram";

/// Settings for tests: short debounce, no contact gate
pub fn test_settings() -> FlowSettings {
    FlowSettings::builder()
        .site_name("TestSite")
        .save_debounce(Duration::from_millis(10))
        .build()
}

/// Backend success envelope around `data`
pub fn envelope(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "error": {"code": 200, "message": ""},
        "data": data,
    }))
}

/// Backend rejection with the status mirrored in the envelope
pub fn rejection(code: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(code).set_body_json(json!({
        "error": {"code": code, "message": message},
        "data": null,
    }))
}

pub fn profile(username: &str) -> Value {
    json!({
        "username": username,
        "credit": 250000.0,
        "rank": "Silver",
        "status": "active",
        "pending_deposit": false,
        "pending_wd": false,
    })
}

pub struct TestChat {
    pub store: MemoryStore,
    pub transport: Arc<RecordingTransport>,
    pub server: MockServer,
    pub deps: FlowDeps,
}

impl TestChat {
    pub async fn start() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_settings(settings: FlowSettings) -> Self {
        let server = MockServer::start().await;
        let store = MemoryStore::new();
        let transport = Arc::new(RecordingTransport::new());
        let deps = FlowDeps {
            store: Arc::new(store.clone()),
            transport: transport.clone(),
            client: OtpClient::with_http(reqwest::Client::new(), server.uri()),
            settings: Arc::new(settings),
        };
        Self {
            store,
            transport,
            server,
            deps,
        }
    }

    pub fn id(&self) -> ConversationId {
        ConversationId::new(BOT_ID, CHAT_ID, USER_ID)
    }

    pub fn scope(&self) -> SessionScope {
        let store: Arc<dyn SessionStore> = Arc::new(self.store.clone());
        SessionScope::new(store, self.id(), self.deps.settings.save_debounce)
    }

    /// Registers a backend endpoint answer
    pub async fn backend(&self, verb: &str, endpoint: &str, response: ResponseTemplate) {
        Mock::given(method(verb))
            .and(path(format!("{}{}", API_PREFIX, endpoint)))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Like [`TestChat::backend`], failing the test unless hit exactly `times`
    pub async fn backend_expect(&self, verb: &str, endpoint: &str, response: ResponseTemplate, times: u64) {
        Mock::given(method(verb))
            .and(path(format!("{}{}", API_PREFIX, endpoint)))
            .respond_with(response)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Requests the backend received for one endpoint, as JSON bodies
    pub async fn requests_to(&self, endpoint: &str) -> Vec<Value> {
        let full = format!("{}{}", API_PREFIX, endpoint);
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == full)
            .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
            .collect()
    }

    fn inbound(&self, message_id: Option<i32>, input: Input) -> Inbound {
        Inbound {
            bot_id: BOT_ID,
            chat_id: CHAT_ID,
            user_id: USER_ID,
            private_chat: true,
            message_id,
            input,
        }
    }

    /// Runs one update and lets debounced writes land
    pub async fn deliver(&self, inbound: Inbound) {
        dispatch(&self.deps, inbound).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
    }

    /// The user types `text`; returns the id of their message
    pub async fn say(&self, text: &str) -> i32 {
        let id = self.transport.user_message();
        self.deliver(self.inbound(Some(id), Input::Text(text.to_string())))
            .await;
        id
    }

    pub async fn command(&self, intent: Intent) -> i32 {
        let id = self.transport.user_message();
        self.deliver(self.inbound(Some(id), Input::Intent(intent))).await;
        id
    }

    /// Presses `data` on the most recent bot message
    pub async fn press(&self, data: Callback) {
        let message_id = self.transport.last_sent().map(|m| m.id);
        self.press_on(message_id, data).await;
    }

    pub async fn press_on(&self, message_id: Option<i32>, data: Callback) {
        let id = format!("cb-{}", self.transport.answers().len());
        self.deliver(self.inbound(message_id, Input::Callback { id, data }))
            .await;
    }

    pub async fn press_unknown(&self) {
        let message_id = self.transport.last_sent().map(|m| m.id);
        self.deliver(self.inbound(
            message_id,
            Input::UnknownCallback {
                id: "cb-unknown".to_string(),
            },
        ))
        .await;
    }

    pub async fn share_contact(&self, phone_number: &str, owner: Option<u64>) {
        let id = self.transport.user_message();
        self.deliver(self.inbound(
            Some(id),
            Input::Contact {
                phone_number: phone_number.to_string(),
                owner,
            },
        ))
        .await;
    }

    pub async fn state(&self) -> ConversationState {
        self.load::<ConversationState>().await.unwrap_or_default()
    }

    pub async fn load<T: StatefulEntity + Clone>(&self) -> Option<T> {
        self.scope().load::<T>().await.unwrap().map(|e| e.get().clone())
    }

    pub async fn user(&self) -> Option<UserModel> {
        self.load::<UserModel>().await
    }

    /// Stores a logged-in session without touching the backend mock
    pub async fn seed_session(&self, username: &str) {
        let parsed: Profile = serde_json::from_value(profile(username)).unwrap();
        let scope = self.scope();
        scope
            .create(UserModel::from_profile(CHAT_ID, &parsed))
            .save()
            .await
            .unwrap();
        self.seed_state(ConversationState::MainMenu).await;
    }

    pub async fn seed_state(&self, state: ConversationState) {
        self.scope().create(state).save().await.unwrap();
    }

    /// Seeds a logged-in session and stubs `me` with the same profile
    pub async fn logged_in(&self, username: &str) {
        self.seed_session(username).await;
        self.backend("GET", "/me", envelope(profile(username))).await;
    }
}
