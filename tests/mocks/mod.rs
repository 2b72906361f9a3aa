//! Mock implementations for flow tests
//!
//! This module provides an in-memory Telegram chat so conversation flows
//! can run without network access.

pub mod recording_transport;

pub use recording_transport::{Answer, RecordingTransport, SentMessage};
