use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::state::entity::StatefulEntity;

/// Backend session cookies for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookies {
    #[serde(default)]
    cookies: BTreeMap<String, String>,
}

impl StatefulEntity for SessionCookies {
    const STATE_KEY: &'static str = "cookie_jar";
}

/// Cookies the backend needs to recognise a logged-in session
pub const SESSION_COOKIES: [&str; 2] = ["JSESSIONID", "PLAY_SESSION"];

impl SessionCookies {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn has_session(&self) -> bool {
        SESSION_COOKIES.iter().all(|name| self.cookies.contains_key(*name))
    }

    /// Value for the `Cookie` request header
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Applies every `Set-Cookie` header; returns true if anything changed.
    pub fn absorb(&mut self, headers: &HeaderMap) -> bool {
        let mut changed = false;
        for raw in headers.get_all(SET_COOKIE) {
            let Ok(raw) = raw.to_str() else { continue };
            changed |= self.apply_set_cookie(raw);
        }
        changed
    }

    fn apply_set_cookie(&mut self, raw: &str) -> bool {
        let mut parts = raw.split(';').map(str::trim);
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return false;
        };
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let expired = parts.any(|attr| attr.eq_ignore_ascii_case("max-age=0"));
        if expired || value.is_empty() {
            return self.cookies.remove(name).is_some();
        }
        let previous = self.cookies.insert(name.to_string(), value.to_string());
        previous.as_deref() != Some(value)
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }
}
