//! Persisted conversation state
//!
//! - `entity`: debounced snapshot persistence shared by every model
//! - `ledger`: message ids owned by a flow
//! - `login`, `register`: guest flow models
//! - `user`, `action`, `add_bank`: the authenticated session and its sub-flows
//! - `menu`, `telegram_data`: chat presentation and data that outlives sessions

pub mod action;
pub mod add_bank;
pub mod entity;
pub mod ledger;
pub mod login;
pub mod menu;
pub mod register;
pub mod telegram_data;
pub mod user;

pub use action::{ActionData, ActionModel, AmountBounds, DepositData, WithdrawData};
pub use add_bank::AddBankModel;
pub use entity::{Entity, SessionScope, StatefulEntity};
pub use ledger::{FlushReport, Ledgered, MessageLedger};
pub use login::LoginModel;
pub use menu::{MenuModel, Presentation};
pub use register::RegisterModel;
pub use telegram_data::TelegramData;
pub use user::UserModel;
