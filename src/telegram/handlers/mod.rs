//! Telegram bot handler tree configuration
//!
//! This module provides the main dispatcher schema for the Telegram bot.
//! Handlers only turn updates into [`crate::flow::Inbound`] values; every
//! decision is made by the flows.

mod schema;
mod types;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError, HandlerResult};
