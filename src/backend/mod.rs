//! OTP backend client
//!
//! - `client`: reqwest client, per-user [`BackendSession`], fault handling
//! - `cookies`: persisted backend session cookies
//! - `response`: the uniform [`ApiResponse`] envelope
//! - `types`: typed request and response payloads

pub mod client;
pub mod cookies;
pub mod response;
pub mod types;

pub use client::{BackendSession, OtpClient};
pub use cookies::SessionCookies;
pub use response::ApiResponse;
