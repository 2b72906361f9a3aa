//! Inline button payloads
//!
//! Every payload is a short `prefix:verb[:arg]` string so it stays well
//! under Telegram's 64-byte callback limit.

use std::fmt;
use std::str::FromStr;

use super::fsm::{AddBankField, DepositStep, RegisterField};
use super::input::Intent;
use crate::backend::types::GameType;
use crate::state::action::DepositMethod;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Go(Intent),

    RegisterBank(String),
    RegisterEdit(RegisterField),
    RegisterSkip,
    RegisterSubmit,

    AddBankPick(String),
    AddBankEdit(AddBankField),
    AddBankSubmit,

    DepositMethod(DepositMethod),
    DepositChannel(i64),
    DepositUserBank(i64),
    /// Tapping a promo previews it; the "no promo" entry commits at once
    DepositPromo(i64),
    DepositPromoConfirm(i64),
    DepositPromoList,
    DepositAmount(i64),
    DepositSkipNote,
    DepositSubmit,
    DepositBack(DepositStep),

    WithdrawAmount(i64),
    WithdrawSubmit,

    /// Deletes the message the button sits on
    Close,

    GameMenu,
    GameProviders(GameType),
    /// `provider` of `None` lists the whole category
    GameList {
        kind: GameType,
        provider: Option<String>,
        page: u32,
    },
    GameSearch,
    GameSearchPage(u32),
    GameLaunch {
        provider: String,
        code: String,
    },
}

const ALL_PROVIDERS: &str = "all";

impl Callback {
    /// Game catalogue buttons work from any state
    pub fn is_catalogue(&self) -> bool {
        matches!(
            self,
            Callback::GameMenu
                | Callback::GameProviders(_)
                | Callback::GameList { .. }
                | Callback::GameSearch
                | Callback::GameSearchPage(_)
                | Callback::GameLaunch { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognised callback payload: {0}")]
pub struct UnknownCallback(pub String);

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Go(intent) => write!(f, "go:{}", intent),
            Callback::RegisterBank(bank) => write!(f, "reg:bank:{}", bank),
            Callback::RegisterEdit(field) => write!(f, "reg:edit:{}", field),
            Callback::RegisterSkip => f.write_str("reg:skip"),
            Callback::RegisterSubmit => f.write_str("reg:submit"),
            Callback::AddBankPick(bank) => write!(f, "ab:bank:{}", bank),
            Callback::AddBankEdit(field) => write!(f, "ab:edit:{}", field),
            Callback::AddBankSubmit => f.write_str("ab:submit"),
            Callback::DepositMethod(method) => write!(f, "dep:method:{}", method),
            Callback::DepositChannel(id) => write!(f, "dep:chan:{}", id),
            Callback::DepositUserBank(id) => write!(f, "dep:ubank:{}", id),
            Callback::DepositPromo(id) => write!(f, "dep:promo:{}", id),
            Callback::DepositPromoConfirm(id) => write!(f, "dep:promo_ok:{}", id),
            Callback::DepositPromoList => f.write_str("dep:promos"),
            Callback::DepositAmount(amount) => write!(f, "dep:amt:{}", amount),
            Callback::DepositSkipNote => f.write_str("dep:note_skip"),
            Callback::DepositSubmit => f.write_str("dep:submit"),
            Callback::DepositBack(step) => write!(f, "dep:back:{}", step),
            Callback::WithdrawAmount(amount) => write!(f, "wd:amt:{}", amount),
            Callback::WithdrawSubmit => f.write_str("wd:submit"),
            Callback::Close => f.write_str("msg:close"),
            Callback::GameMenu => f.write_str("game:menu"),
            Callback::GameProviders(kind) => write!(f, "game:prov:{}", kind),
            Callback::GameList { kind, provider, page } => {
                write!(f, "game:list:{}|{}|{}", kind, provider.as_deref().unwrap_or(ALL_PROVIDERS), page)
            }
            Callback::GameSearch => f.write_str("game:search"),
            Callback::GameSearchPage(page) => write!(f, "game:spage:{}", page),
            Callback::GameLaunch { provider, code } => write!(f, "game:play:{}|{}", provider, code),
        }
    }
}

impl FromStr for Callback {
    type Err = UnknownCallback;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownCallback(raw.to_string());
        let mut parts = raw.splitn(3, ':');
        let prefix = parts.next().ok_or_else(unknown)?;
        let verb = parts.next().unwrap_or_default();
        let arg = parts.next();

        let id = || -> Result<i64, UnknownCallback> { arg.and_then(|a| a.parse().ok()).ok_or_else(unknown) };
        let text = || -> Result<String, UnknownCallback> {
            arg.filter(|a| !a.is_empty()).map(str::to_string).ok_or_else(unknown)
        };

        let callback = match (prefix, verb) {
            ("go", intent) => Callback::Go(intent.parse().map_err(|_| unknown())?),
            ("reg", "bank") => Callback::RegisterBank(text()?),
            ("reg", "edit") => Callback::RegisterEdit(text()?.parse().map_err(|_| unknown())?),
            ("reg", "skip") => Callback::RegisterSkip,
            ("reg", "submit") => Callback::RegisterSubmit,
            ("ab", "bank") => Callback::AddBankPick(text()?),
            ("ab", "edit") => Callback::AddBankEdit(text()?.parse().map_err(|_| unknown())?),
            ("ab", "submit") => Callback::AddBankSubmit,
            ("dep", "method") => Callback::DepositMethod(text()?.parse().map_err(|_| unknown())?),
            ("dep", "chan") => Callback::DepositChannel(id()?),
            ("dep", "ubank") => Callback::DepositUserBank(id()?),
            ("dep", "promo") => Callback::DepositPromo(id()?),
            ("dep", "promo_ok") => Callback::DepositPromoConfirm(id()?),
            ("dep", "promos") => Callback::DepositPromoList,
            ("dep", "amt") => Callback::DepositAmount(id()?),
            ("dep", "note_skip") => Callback::DepositSkipNote,
            ("dep", "submit") => Callback::DepositSubmit,
            ("dep", "back") => Callback::DepositBack(text()?.parse().map_err(|_| unknown())?),
            ("wd", "amt") => Callback::WithdrawAmount(id()?),
            ("wd", "submit") => Callback::WithdrawSubmit,
            ("msg", "close") => Callback::Close,
            ("game", "menu") => Callback::GameMenu,
            ("game", "prov") => Callback::GameProviders(text()?.parse().map_err(|_| unknown())?),
            ("game", "list") => {
                let arg = text()?;
                let mut fields = arg.splitn(3, '|');
                let kind = fields.next().and_then(|k| k.parse().ok()).ok_or_else(unknown)?;
                let provider = fields.next().filter(|p| !p.is_empty()).ok_or_else(unknown)?;
                let page = fields.next().and_then(|p| p.parse().ok()).ok_or_else(unknown)?;
                Callback::GameList {
                    kind,
                    provider: (provider != ALL_PROVIDERS).then(|| provider.to_string()),
                    page,
                }
            }
            ("game", "search") => Callback::GameSearch,
            ("game", "spage") => Callback::GameSearchPage(arg.and_then(|a| a.parse().ok()).ok_or_else(unknown)?),
            ("game", "play") => {
                let arg = text()?;
                let (provider, code) = arg
                    .split_once('|')
                    .filter(|(p, c)| !p.is_empty() && !c.is_empty())
                    .ok_or_else(unknown)?;
                Callback::GameLaunch {
                    provider: provider.to_string(),
                    code: code.to_string(),
                }
            }
            _ => return Err(unknown()),
        };
        Ok(callback)
    }
}
