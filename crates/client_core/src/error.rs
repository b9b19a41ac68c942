//! Error types for the sticker client core.

use shared::domain::StickerId;
use thiserror::Error;

/// Failure of a single generation round trip. Every variant leaves the
/// lifecycle back in `Idle`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("sticker service unreachable: {0}")]
    Transport(String),
    #[error("sticker service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed sticker service response: {0}")]
    MalformedResponse(String),
    #[error("sticker service is not configured")]
    Unconfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Unreachable,
    Service,
    Malformed,
}

impl GenerationError {
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Transport(_) | Self::Unconfigured => FailureCategory::Unreachable,
            Self::Status { .. } => FailureCategory::Service,
            Self::MalformedResponse(_) => FailureCategory::Malformed,
        }
    }

    /// Text shown to the user in the blocking failure notice.
    pub fn notice(&self) -> String {
        match self.category() {
            FailureCategory::Unreachable => {
                "Failed to connect to the sticker service; check the service URL and retry."
                    .to_string()
            }
            FailureCategory::Service => match self {
                Self::Status { status, message } if !message.is_empty() => {
                    format!("Sticker service error ({status}): {message}")
                }
                Self::Status { status, .. } => format!("Sticker service error ({status})."),
                _ => "Sticker service error.".to_string(),
            },
            FailureCategory::Malformed => {
                "The sticker service sent back something that is not a sticker; please retry."
                    .to_string()
            }
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::MalformedResponse(value.to_string());
        }
        if let Some(status) = value.status() {
            return Self::Status {
                status: status.as_u16(),
                message: value.to_string(),
            };
        }
        Self::Transport(value.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollectionError {
    #[error("no sticker at index {index} (collection has {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("sticker {0} is not in the collection")]
    UnknownSticker(StickerId),
    #[error("sticker id {0} appears more than once")]
    DuplicateId(StickerId),
    #[error("sticker id {0} is out of range")]
    IdOutOfRange(StickerId),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported image reference: {0}")]
    UnsupportedImageRef(String),
    #[error("failed to decode inline image: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("failed to fetch remote image: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("canvas renderer failed: {0}")]
    Render(anyhow::Error),
    #[error("no sticker is selected")]
    NothingSelected,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid sticker service url {url:?}: {reason}")]
    InvalidServiceUrl { url: String, reason: String },
}
