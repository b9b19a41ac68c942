use serde::{Deserialize, Serialize};

/// Error payload the generation service may return instead of a sticker.
///
/// The service is not consistent about the shape: handled failures carry
/// `error` + `message`, framework-level rejections carry `detail` (a string or
/// a list of validation entries).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ServiceErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            message: Some(message.into()),
            detail: None,
        }
    }

    /// Human readable summary, or `None` when the body carried nothing useful.
    pub fn describe(&self) -> Option<String> {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => return Some(format!("{error}: {message}")),
            (Some(only), None) | (None, Some(only)) => return Some(only.clone()),
            (None, None) => {}
        }

        match self.detail.as_ref()? {
            serde_json::Value::String(detail) => Some(detail.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// `error` present alongside a 2xx status: the service reports some
    /// failures with a success code.
    pub fn is_error_payload(&self) -> bool {
        self.error.is_some()
    }
}
