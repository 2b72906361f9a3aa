//! Typed payloads exchanged with the OTP backend
//!
//! Field names follow the backend's JSON. Everything optional on the wire
//! carries `#[serde(default)]` so a sparse response still decodes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Reply to the ask-auth handshake that opens login and registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthHandshake {
    #[serde(default)]
    pub bank_list: Vec<String>,
    #[serde(default)]
    pub captcha: bool,
    #[serde(default)]
    pub captcha_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha: Option<String>,
}

/// Registration payload, keyed the way the backend expects
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub telpon: Option<String>,
    pub nama: String,
    pub bank: String,
    pub rekening: String,
    pub referral: Option<String>,
    pub captcha: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    Inactive,
}

/// Logged-in user as reported by login and `me`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credit: f64,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub status: Option<AccountStatus>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub pending_deposit: bool,
    #[serde(default, alias = "pending_withdraw")]
    pub pending_wd: bool,
}

impl Profile {
    pub fn account_status(&self) -> AccountStatus {
        match (self.status, self.is_active) {
            (Some(status), _) => status,
            (None, Some(false)) => AccountStatus::Inactive,
            _ => AccountStatus::Active,
        }
    }
}

/// A bank account registered to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBank {
    pub id: i64,
    pub bank_name: String,
    #[serde(default)]
    pub bank_account_name: String,
    #[serde(default)]
    pub bank_account_number: String,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ChannelStatus {
    Offline,
    #[default]
    Online,
    Maintenance,
}

impl From<i64> for ChannelStatus {
    fn from(raw: i64) -> Self {
        match raw {
            1 => ChannelStatus::Online,
            2 => ChannelStatus::Maintenance,
            _ => ChannelStatus::Offline,
        }
    }
}

impl From<ChannelStatus> for i64 {
    fn from(status: ChannelStatus) -> Self {
        match status {
            ChannelStatus::Offline => 0,
            ChannelStatus::Online => 1,
            ChannelStatus::Maintenance => 2,
        }
    }
}

/// A destination account for bank-transfer deposits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositBank {
    pub id: i64,
    pub bank_name: String,
    #[serde(default)]
    pub bank_account_display: String,
    #[serde(default)]
    pub status: ChannelStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentGateway {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub status: ChannelStatus,
}

/// A promotional offer; only `id`, `name` and `minimum_deposit` are
/// structural, the rest is provider-defined terms shown to the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Promo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub minimum_deposit: i64,
    #[serde(flatten)]
    pub terms: Map<String, Value>,
}

impl Promo {
    /// Promo id the backend uses for "deposit without a promo"
    pub const NONE_ID: i64 = 0;

    pub fn is_none_choice(&self) -> bool {
        self.id == Self::NONE_ID
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepositBanks {
    #[serde(default)]
    pub user_rekening: Vec<UserBank>,
    #[serde(default)]
    pub rekening_tujuan: Vec<DepositBank>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepositGateways {
    #[serde(default, rename = "QRIS")]
    pub qris: Vec<PaymentGateway>,
    #[serde(default, rename = "VA")]
    pub va: Vec<PaymentGateway>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepositInit {
    #[serde(default)]
    pub pending_deposit: bool,
    #[serde(default)]
    pub min_deposit: i64,
    #[serde(default)]
    pub max_deposit: i64,
    #[serde(default)]
    pub bank: DepositBanks,
    #[serde(default)]
    pub payment_gateway: DepositGateways,
    #[serde(default)]
    pub list_promo_event: Vec<Promo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum DepositMethod {
    Bank,
    Qris,
    Va,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankDepositRequest {
    pub user_bank_id: i64,
    pub deposit_bank_id: i64,
    pub promo_id: i64,
    pub amount: i64,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayDepositRequest {
    pub payment_gateway_id: String,
    pub amount: i64,
    #[serde(rename = "type")]
    pub method: DepositMethod,
}

/// Payment instructions for a gateway deposit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayReceipt {
    /// QRIS image url or virtual account number
    #[serde(default)]
    pub payment: String,
    #[serde(default, rename = "expiredDate")]
    pub expired_date: Option<String>,
    #[serde(default)]
    pub merchant_ref: Option<String>,
}

/// The account payouts are sent to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutAccount {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rekening: String,
    #[serde(default)]
    pub bank: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WithdrawInit {
    #[serde(default)]
    pub pending_wd: bool,
    #[serde(default)]
    pub rekening_wd: Option<PayoutAccount>,
    #[serde(default)]
    pub min_amount: Option<i64>,
    #[serde(default)]
    pub max_amount: Option<i64>,
    #[serde(default)]
    pub withdraw_multiple: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawRequest {
    pub amount: i64,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddBankInit {
    #[serde(default, rename = "bankList")]
    pub bank_list: Vec<String>,
    #[serde(default, rename = "userBankList")]
    pub user_bank_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddBankRequest {
    pub bank_name: String,
    pub bank_account_name: String,
    pub bank_account_number: String,
}

/// One deposit or withdrawal as listed by the history endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub report: Option<TransactionReport>,
    #[serde(default, rename = "lastUpdate")]
    pub last_update: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl Transaction {
    pub fn kind_icon(&self) -> &'static str {
        match self.kind.as_deref() {
            Some("deposit") => "📥",
            Some("deposit_crypto") => "C📥",
            Some("withdraw") => "📤",
            Some("withdraw_crypto") => "C📤",
            _ => "❓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionReport {
    Progress,
    Rejected,
    Success,
    #[serde(other)]
    Unknown,
}

impl TransactionReport {
    pub fn icon(self) -> &'static str {
        match self {
            TransactionReport::Progress => "🕒",
            TransactionReport::Rejected => "❌",
            TransactionReport::Success => "✅",
            TransactionReport::Unknown => "❓",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionHistory {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// A support channel: a link, or a phone number or email to copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SupportChannel {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl SupportChannel {
    /// Phone numbers and emails are shown as text rather than linked
    pub fn is_plain(&self) -> bool {
        matches!(self.kind.as_str(), "phone" | "email")
    }
}

/// Game categories offered in the play menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameType {
    Slot,
    Casino,
    Sports,
    Sabung,
    Arcade,
    Interactive,
}

impl GameType {
    pub const ALL: [GameType; 6] = [
        GameType::Slot,
        GameType::Casino,
        GameType::Sports,
        GameType::Sabung,
        GameType::Arcade,
        GameType::Interactive,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GameType::Slot => "🎰 Slot",
            GameType::Casino => "♠️ Casino",
            GameType::Sports => "🏈 Sports",
            GameType::Sabung => "🐔 Sabung",
            GameType::Arcade => "🕹️ Arcade",
            GameType::Interactive => "🎬 Interactive",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GameProvider {
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub provider_name_mobile: Option<String>,
}

impl GameProvider {
    pub fn display_name(&self) -> &str {
        self.provider_name_mobile
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.provider_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameProviders {
    #[serde(default)]
    pub providers: Vec<GameProvider>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Game {
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub game_code: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total: u32,
    #[serde(default, rename = "lastPage")]
    pub last_page: u32,
    #[serde(default, rename = "hasMore")]
    pub has_more: bool,
}

/// One page of games, from a category listing or a search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GamePage {
    /// Games the backend could not describe come back as `null`
    #[serde(default)]
    pub games: Vec<Option<Game>>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl GamePage {
    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.iter().flatten()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GameLaunchRequest {
    pub game_code: String,
    pub provider_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameLaunch {
    #[serde(default)]
    pub game_name: String,
    pub game_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_history_icons() {
        let history: TransactionHistory = serde_json::from_value(json!({
            "transactions": [
                {"id": 7, "type": "deposit", "report": "SUCCESS", "lastUpdate": "2024-05-01 10:00", "amount": 50000},
                {"id": 8, "type": "withdraw_crypto", "report": "ON_HOLD", "amount": 20000}
            ]
        }))
        .unwrap();

        let first = &history.transactions[0];
        assert_eq!((first.kind_icon(), first.report.map(TransactionReport::icon)), ("📥", Some("✅")));
        assert_eq!(first.last_update.as_deref(), Some("2024-05-01 10:00"));
        let second = &history.transactions[1];
        assert_eq!(second.kind_icon(), "C📤");
        assert_eq!(second.report, Some(TransactionReport::Unknown));
    }

    #[test]
    fn test_game_page_skips_null_games() {
        let page: GamePage = serde_json::from_value(json!({
            "games": [{"provider_id": "PP", "game_name": "Gates", "game_code": "vs20"}, null],
            "pagination": {"total": 21, "lastPage": 2, "hasMore": true}
        }))
        .unwrap();
        assert_eq!(page.games().count(), 1);
        assert_eq!(page.pagination.last_page, 2);
        assert!(page.pagination.has_more);
        assert_eq!("sabung".parse::<GameType>().unwrap(), GameType::Sabung);
    }

    #[test]
    fn test_deposit_init_decodes_nested_lists() {
        let init: DepositInit = serde_json::from_value(json!({
            "min_deposit": 10000,
            "max_deposit": 10000000,
            "bank": {
                "user_rekening": [{"id": 1, "bank_name": "BCA", "bank_account_name": "Budi", "bank_account_number": "123"}],
                "rekening_tujuan": [{"id": 9, "bank_name": "BCA", "bank_account_display": "BCA 999", "status": 2}]
            },
            "payment_gateway": {"QRIS": [{"id": 3, "name": "qris-a", "status": 1}]},
            "list_promo_event": [{"id": 0, "name": "No promo", "minimum_deposit": 0}]
        }))
        .unwrap();

        assert_eq!(init.bank.user_rekening.len(), 1);
        assert_eq!(init.bank.rekening_tujuan[0].status, ChannelStatus::Maintenance);
        assert_eq!(init.payment_gateway.qris[0].status, ChannelStatus::Online);
        assert!(init.payment_gateway.va.is_empty());
        assert!(init.list_promo_event[0].is_none_choice());
    }

    #[test]
    fn test_promo_keeps_provider_terms() {
        let promo: Promo = serde_json::from_value(json!({
            "id": 4, "name": "Weekend", "minimum_deposit": 50000, "turnover": 3, "frequency": "daily"
        }))
        .unwrap();
        assert_eq!(promo.minimum_deposit, 50_000);
        assert_eq!(promo.terms.get("turnover"), Some(&json!(3)));
        assert!(!promo.terms.contains_key("name"));
    }

    #[test]
    fn test_profile_status_fallbacks() {
        let inactive: Profile = serde_json::from_value(json!({"username": "x", "is_active": false})).unwrap();
        assert_eq!(inactive.account_status(), AccountStatus::Inactive);

        let suspended: Profile = serde_json::from_value(json!({"status": "suspended"})).unwrap();
        assert_eq!(suspended.account_status(), AccountStatus::Suspended);

        assert_eq!(Profile::default().account_status(), AccountStatus::Active);
    }

    #[test]
    fn test_register_request_field_names() {
        let body = serde_json::to_value(RegisterRequest {
            username: "validuser1".into(),
            password: "secret1".into(),
            telpon: Some("62812".into()),
            nama: "Budi Santoso".into(),
            bank: "BCA".into(),
            rekening: "12345678".into(),
            referral: None,
            captcha: None,
        })
        .unwrap();
        for key in ["username", "password", "telpon", "nama", "bank", "rekening"] {
            assert!(body.get(key).is_some(), "missing {}", key);
        }
    }
}
