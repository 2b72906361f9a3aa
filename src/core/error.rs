use thiserror::Error;

use crate::storage::StoreError;
use crate::telegram::transport::TransportError;

/// Errors a flow handler can return
///
/// Backend rejections are not errors here: they come back as an
/// `ApiResponse` and are shown to the user.
#[derive(Error, Debug)]
pub enum AppError {
    /// Session store errors (redis or in-memory)
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    /// Message transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Snapshot or payload (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_wraps() {
        let err: AppError = StoreError::Unavailable("down".to_string()).into();
        assert!(err.to_string().starts_with("Session store error"));
    }

    #[test]
    fn test_only_layer_errors_convert() {
        let err: AppError = TransportError::MessageGone(7).into();
        assert!(matches!(err, AppError::Transport(_)));

        let err: AppError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
