use reqwest::{Method, StatusCode};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::cookies::SessionCookies;
use super::response::ApiResponse;
use super::types::*;
use crate::core::config;
use crate::state::entity::Entity;

const API_PREFIX: &str = "/api/v1/telegram";

/// Shared HTTP client for the OTP backend
///
/// Cheap to clone. Per-user state (the Telegram id header and session
/// cookies) lives in [`BackendSession`].
#[derive(Clone, Debug)]
pub struct OtpClient {
    http: reqwest::Client,
    base_url: String,
}

impl OtpClient {
    /// Creates a client with the configured timeout and user agent
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config::backend::timeout())
            .user_agent(config::backend::USER_AGENT)
            .build()?;
        Ok(Self::with_http(http, base_url))
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Binds the client to one user's cookie jar
    pub fn session(&self, user_id: u64, cookies: Entity<SessionCookies>) -> BackendSession {
        BackendSession {
            client: self.clone(),
            user_id,
            cookies,
        }
    }

    /// Checks that the backend host answers at all
    pub async fn ping(&self) -> Result<StatusCode, reqwest::Error> {
        let resp = self.http.get(&self.base_url).send().await?;
        Ok(resp.status())
    }

    /// Sends one request and always returns an envelope.
    ///
    /// A 412 is retried once immediately. Transport and decoding faults are
    /// logged with a correlation reference and become an opaque 500 reply.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        user_id: u64,
        cookies: &mut SessionCookies,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> (ApiResponse, bool) {
        let url = format!("{}{}{}", self.base_url, API_PREFIX, endpoint);
        let mut cookies_changed = false;
        let mut retried = false;

        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .header("X-Telegram-User-Id", user_id.to_string());
            if let Some(cookie) = cookies.header_value() {
                request = request.header(reqwest::header::COOKIE, cookie);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => return (fault(user_id, &method, endpoint, &e.to_string()), cookies_changed),
            };

            cookies_changed |= cookies.absorb(response.headers());
            let status = response.status();

            if status == StatusCode::PRECONDITION_FAILED && !retried {
                log::info!("{} {} returned 412, retrying once", method, endpoint);
                retried = true;
                continue;
            }

            let mut envelope = match response.json::<ApiResponse>().await {
                Ok(envelope) => envelope,
                Err(e) => {
                    let detail = format!("HTTP {}: undecodable body: {}", status, e);
                    return (fault(user_id, &method, endpoint, &detail), cookies_changed);
                }
            };
            if envelope.error.code == 0 {
                envelope.error.code = status.as_u16();
            }
            if envelope.is_error() {
                log::info!(
                    "{} {} for user {} rejected: {} {}",
                    method,
                    endpoint,
                    user_id,
                    envelope.code(),
                    envelope.error_message()
                );
            }
            return (envelope, cookies_changed);
        }
    }
}

/// Short reference shown to the user and logged next to the real error
pub fn correlation_ref(user_id: u64, endpoint: &str, detail: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.to_le_bytes());
    hasher.update(endpoint.as_bytes());
    hasher.update(chrono::Utc::now().timestamp_micros().to_le_bytes());
    hasher.update(detail.as_bytes());
    hex::encode_upper(&hasher.finalize()[..4])
}

fn with_query(pairs: &[(&str, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())))
        .finish()
}

fn fault(user_id: u64, method: &Method, endpoint: &str, detail: &str) -> ApiResponse {
    let reference = correlation_ref(user_id, endpoint, detail);
    log::error!(
        "[ref {}] {} {} for user {} failed: {}",
        reference,
        method,
        endpoint,
        user_id,
        detail
    );
    ApiResponse::fault(&reference)
}

/// Backend calls on behalf of one Telegram user
pub struct BackendSession {
    client: OtpClient,
    user_id: u64,
    cookies: Entity<SessionCookies>,
}

impl BackendSession {
    async fn call<B: Serialize + ?Sized>(&mut self, method: Method, endpoint: &str, body: Option<&B>) -> ApiResponse {
        let mut jar = self.cookies.get().clone();
        let (response, changed) = self
            .client
            .request(self.user_id, &mut jar, method, endpoint, body)
            .await;
        if changed {
            self.cookies.update(|c| *c = jar);
        }
        response
    }

    async fn get(&mut self, endpoint: &str) -> ApiResponse {
        self.call::<()>(Method::GET, endpoint, None).await
    }

    async fn post<B: Serialize + ?Sized>(&mut self, endpoint: &str, body: Option<&B>) -> ApiResponse {
        self.call(Method::POST, endpoint, body).await
    }

    pub fn cookies(&self) -> &SessionCookies {
        self.cookies.get()
    }

    pub async fn ask_auth(&mut self) -> ApiResponse {
        self.post::<()>("/ask-auth", None).await
    }

    pub async fn list_active_banks(&mut self) -> ApiResponse {
        self.get("/bank").await
    }

    pub async fn login(&mut self, request: &LoginRequest) -> ApiResponse {
        self.post("/login", Some(request)).await
    }

    pub async fn register(&mut self, request: &RegisterRequest) -> ApiResponse {
        self.post("/register", Some(request)).await
    }

    pub async fn me(&mut self) -> ApiResponse {
        self.get("/me").await
    }

    pub async fn logout(&mut self) -> ApiResponse {
        self.post::<()>("/logout", None).await
    }

    pub async fn initiate_deposit(&mut self) -> ApiResponse {
        self.get("/deposit/initiate").await
    }

    pub async fn confirm_bank_deposit(&mut self, request: &BankDepositRequest) -> ApiResponse {
        self.post("/deposit/bank", Some(request)).await
    }

    pub async fn confirm_gateway_deposit(&mut self, request: &GatewayDepositRequest) -> ApiResponse {
        self.post("/deposit/gateway", Some(request)).await
    }

    pub async fn initiate_withdraw(&mut self) -> ApiResponse {
        self.get("/withdraw/initiate").await
    }

    pub async fn confirm_withdraw(&mut self, request: &WithdrawRequest) -> ApiResponse {
        self.post("/withdraw", Some(request)).await
    }

    pub async fn initiate_add_bank(&mut self) -> ApiResponse {
        self.get("/rekening/initiate").await
    }

    pub async fn insert_bank_account(&mut self, request: &AddBankRequest) -> ApiResponse {
        self.post("/rekening", Some(request)).await
    }

    pub async fn list_bank_accounts(&mut self) -> ApiResponse {
        self.get("/rekening").await
    }

    pub async fn support_channels(&mut self) -> ApiResponse {
        self.get("/social-media").await
    }

    pub async fn transaction_history(&mut self) -> ApiResponse {
        self.get("/transaction/history").await
    }

    pub async fn list_game_providers(&mut self, kind: GameType) -> ApiResponse {
        let query = with_query(&[("type", kind.to_string())]);
        self.get(&format!("/games/providers?{}", query)).await
    }

    /// `provider` of `None` lists every provider of the category
    pub async fn list_games(&mut self, kind: GameType, provider: Option<&str>, page: u32) -> ApiResponse {
        let query = with_query(&[
            ("type", kind.to_string()),
            ("provider", provider.unwrap_or("all").to_string()),
            ("page", page.to_string()),
        ]);
        self.get(&format!("/games?{}", query)).await
    }

    pub async fn search_games(&mut self, text: &str, page: u32) -> ApiResponse {
        let query = with_query(&[("q", text.to_string()), ("page", page.to_string())]);
        self.get(&format!("/games/search?{}", query)).await
    }

    pub async fn launch_game(&mut self, request: &GameLaunchRequest) -> ApiResponse {
        self.post("/games/launch", Some(request)).await
    }

    /// Drops every cookie; used on logout and session expiry
    pub fn forget_cookies(&mut self) {
        if !self.cookies.get().is_empty() {
            self.cookies.update(SessionCookies::clear);
        }
    }

    /// Persists cookie changes made during this update
    pub async fn finish(mut self) -> crate::storage::StoreResult<()> {
        self.cookies.flush().await
    }
}
