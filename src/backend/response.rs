use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiMetadata {
    /// Field name to backend validation messages
    #[serde(default)]
    pub validation: BTreeMap<String, Vec<String>>,
}

/// Uniform envelope around every backend reply
///
/// `error.code` doubles as the status: 2xx is success, 401 means the
/// session cookie is no longer valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub error: ApiError,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub metadata: ApiMetadata,
}

impl ApiResponse {
    /// Opaque reply for transport and decoding faults
    pub fn fault(reference: &str) -> Self {
        Self {
            error: ApiError {
                code: 500,
                message: format!("Service temporarily unavailable (ref {})", reference),
            },
            data: Value::Null,
            metadata: ApiMetadata::default(),
        }
    }

    pub fn code(&self) -> u16 {
        self.error.code
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.error.code)
    }

    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    pub fn is_authentication_error(&self) -> bool {
        self.error.code == 401
    }

    pub fn has_validation_errors(&self) -> bool {
        !self.metadata.validation.is_empty()
    }

    pub fn error_message(&self) -> &str {
        if self.error.message.is_empty() {
            "Unknown error"
        } else {
            &self.error.message
        }
    }

    /// Every validation message, in field order
    pub fn validation_messages(&self) -> Vec<String> {
        self.metadata
            .validation
            .iter()
            .flat_map(|(field, errors)| errors.iter().map(move |e| format!("{}: {}", field, e)))
            .collect()
    }

    /// Decodes the data payload into a typed struct
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}
