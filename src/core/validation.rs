//! Field validation for conversation input
//!
//! Every `ask_*` step runs its raw text through one of these functions
//! before touching the flow model. A failed check never mutates anything;
//! the caller re-prompts with the error's `Display` text.

use lazy_regex::regex_is_match;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::core::utils::format_rupiah;

pub const USERNAME_MIN: usize = 6;
pub const USERNAME_MAX: usize = 16;
pub const PASSWORD_MIN: usize = 6;
pub const ACCOUNT_NUMBER_MIN: usize = 8;
/// Registration accepts shorter holder names than the add-account flow
pub const REGISTER_ACCOUNT_NAME_MIN: usize = 3;
pub const ADD_BANK_ACCOUNT_NAME_MIN: usize = 5;
pub const NOTE_MAX: usize = 100;
pub const GAME_SEARCH_MIN: usize = 3;
pub const GAME_SEARCH_MAX: usize = 50;

/// A user-facing validation failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("{field} may only contain letters and digits")]
    NotAlphanumeric { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} may only contain digits")]
    NotNumeric { field: &'static str },

    #[error("{field} may only contain letters separated by single spaces")]
    NotAlphaSpace { field: &'static str },

    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("Bank {0} is not available, pick one from the list")]
    UnknownBank(String),

    #[error("Please send the amount as a whole number")]
    NotAnAmount,

    #[error("Amount must be between {} and {}", rupiah(.min), rupiah(.max))]
    OutOfRange { min: i64, max: i64 },

    #[error("Amount must be at least {}", rupiah(.0))]
    BelowMinimum(i64),

    #[error("Amount must be a multiple of {}", rupiah(.0))]
    NotMultiple(i64),
}

pub type FieldResult<T> = Result<T, FieldError>;

fn rupiah(amount: &i64) -> String {
    format_rupiah(*amount)
}

fn check_length(field: &'static str, value: &str, min: usize, max: Option<usize>) -> FieldResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(FieldError::TooShort { field, min });
    }
    if let Some(max) = max {
        if len > max {
            return Err(FieldError::TooLong { field, max });
        }
    }
    Ok(())
}

fn is_alphanumeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(char::is_alphanumeric)
}

/// Usernames: letters and digits, 6..=16 characters
pub fn username(input: &str) -> FieldResult<String> {
    let value = input.trim();
    if !is_alphanumeric(value) {
        return Err(FieldError::NotAlphanumeric { field: "Username" });
    }
    check_length("Username", value, USERNAME_MIN, Some(USERNAME_MAX))?;
    Ok(value.to_string())
}

/// Passwords are only length-checked; the backend owns the real policy.
pub fn password(input: &str) -> FieldResult<String> {
    let value = input.trim();
    check_length("Password", value, PASSWORD_MIN, None)?;
    Ok(value.to_string())
}

/// Accepts a bank only if it belongs to the snapshot offered when the flow started.
pub fn bank_choice(input: &str, offered: &[String]) -> FieldResult<String> {
    let value = input.trim();
    offered
        .iter()
        .find(|bank| bank.as_str() == value)
        .cloned()
        .ok_or_else(|| FieldError::UnknownBank(value.to_string()))
}

/// Account holder names: letters separated by single spaces
pub fn account_name(input: &str, min: usize) -> FieldResult<String> {
    let value = input.trim();
    if !regex_is_match!(r"^[^\W\d_]+(?: [^\W\d_]+)*$", value) {
        return Err(FieldError::NotAlphaSpace { field: "Account name" });
    }
    check_length("Account name", value, min, None)?;
    Ok(value.to_string())
}

pub fn account_number(input: &str) -> FieldResult<String> {
    let value = input.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::NotNumeric { field: "Account number" });
    }
    check_length("Account number", value, ACCOUNT_NUMBER_MIN, None)?;
    Ok(value.to_string())
}

pub fn referral_code(input: &str) -> FieldResult<String> {
    let value = input.trim();
    if !is_alphanumeric(value) {
        return Err(FieldError::NotAlphanumeric { field: "Referral code" });
    }
    Ok(value.to_string())
}

pub fn captcha(input: &str) -> FieldResult<String> {
    let value = input.trim();
    if value.is_empty() {
        return Err(FieldError::Empty { field: "Captcha" });
    }
    Ok(value.to_string())
}

/// Parses an amount, tolerating thousands separators ("1.000.000", "50,000").
pub fn amount(input: &str) -> FieldResult<i64> {
    let digits: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | '_' | ' '))
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::NotAnAmount);
    }
    digits.parse::<i64>().map_err(|_| FieldError::NotAnAmount)
}

/// Normalizes a free-text transfer note: NFKC, single spaces, printable only.
pub fn sanitize_note(input: &str) -> String {
    let normalized: String = input.nfkc().collect();
    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .filter(|c| !c.is_control())
        .take(NOTE_MAX)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Game search text, normalised like a note
pub fn game_search(input: &str) -> FieldResult<String> {
    let value: String = sanitize_note(input);
    check_length("Search", &value, GAME_SEARCH_MIN, Some(GAME_SEARCH_MAX))?;
    Ok(value)
}
