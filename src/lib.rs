//! otpbot - Telegram front end for the OTP backend
//!
//! Guests can log in or register; logged-in users can deposit, withdraw
//! and manage payout bank accounts. Every conversation is a small state
//! machine whose models survive restarts in a session store.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, input validation
//! - `storage`: session store (redis in production, in-memory for tests)
//! - `state`: persisted conversation models and message ledgers
//! - `backend`: HTTP client for the OTP backend
//! - `flow`: the conversation state machine and its controllers
//! - `telegram`: bot setup, handler tree and message transport

pub mod backend;
pub mod cli;
pub mod core;
pub mod flow;
pub mod state;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult, FlowSettings};
pub use flow::{dispatch, FlowDeps};
pub use storage::{MemoryStore, RedisStore, SessionStore};
