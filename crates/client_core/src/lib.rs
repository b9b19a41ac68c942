use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{GenerationToken, ImageRef, Sticker},
    error::ServiceErrorBody,
    protocol::{GenerateRequest, GenerateResponse, HealthResponse},
};
use tracing::{debug, warn};

pub mod collection;
pub mod config;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod selection;
mod studio;

pub use collection::{Collection, CollectionStore};
pub use config::{load_settings, Placement, StudioSettings};
pub use error::{CollectionError, ExportError, GenerationError};
pub use lifecycle::{CommitTrigger, LifecycleController, LifecyclePhase};
pub use selection::{ResizeOutcome, SelectionController};
pub use studio::{StickerStudio, StudioSnapshot};

/// Longest slice of an error body carried into a failure message.
const ERROR_BODY_PREVIEW: usize = 200;

/// Successful result of one generation round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSticker {
    pub image: ImageRef,
    /// Scene description the service invented for this sticker.
    pub concept: Option<String>,
    pub prompt: Option<String>,
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: &GenerateRequest)
        -> Result<GeneratedSticker, GenerationError>;
}

pub struct MissingGenerationClient;

#[async_trait]
impl GenerationClient for MissingGenerationClient {
    async fn generate(
        &self,
        _request: &GenerateRequest,
    ) -> Result<GeneratedSticker, GenerationError> {
        Err(GenerationError::Unconfigured)
    }
}

pub struct HttpGenerationClient {
    http: Client,
    service_url: String,
}

impl HttpGenerationClient {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            service_url: service_url.into(),
        }
    }

    pub fn from_settings(settings: &StudioSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("failed to build sticker service http client")?;
        Ok(Self {
            http,
            service_url: settings.service_url.clone(),
        })
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Shared connection pool, reused for fetching remote images on export.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub async fn health(&self) -> Result<HealthResponse, GenerationError> {
        let res = self
            .http
            .get(format!("{}/health", self.service_url))
            .send()
            .await?;
        let status = res.status();
        let body = res.bytes().await?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        serde_json::from_slice(&body)
            .map_err(|err| GenerationError::MalformedResponse(err.to_string()))
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedSticker, GenerationError> {
        let res = self
            .http
            .post(format!("{}/generate", self.service_url))
            .json(request)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, service_url = %self.service_url, "sticker service request failed");
                GenerationError::from(err)
            })?;

        let status = res.status();
        let body = res.bytes().await?;
        if !status.is_success() {
            let error = status_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), %error, "sticker service rejected request");
            return Err(error);
        }

        let parsed: GenerateResponse = serde_json::from_slice(&body)
            .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
        let Some(image) = parsed.image.filter(|image| !image.trim().is_empty()) else {
            // Some failures come back as 200 with an error body.
            let reason = serde_json::from_slice::<ServiceErrorBody>(&body)
                .ok()
                .filter(ServiceErrorBody::is_error_payload)
                .and_then(|err| err.describe())
                .unwrap_or_else(|| "response has no image".to_string());
            return Err(GenerationError::MalformedResponse(reason));
        };

        debug!(bytes = body.len(), concept = ?parsed.concept, "sticker service responded");
        Ok(GeneratedSticker {
            image: ImageRef::new(image),
            concept: parsed.concept,
            prompt: parsed.prompt,
        })
    }
}

fn status_error(status: u16, body: &[u8]) -> GenerationError {
    let message = serde_json::from_slice::<ServiceErrorBody>(body)
        .ok()
        .and_then(|err| err.describe())
        .unwrap_or_else(|| {
            String::from_utf8_lossy(body)
                .trim()
                .chars()
                .take(ERROR_BODY_PREVIEW)
                .collect()
        });
    GenerationError::Status { status, message }
}

/// Everything a presentation adapter needs to follow the studio.
#[derive(Debug, Clone)]
pub enum StudioEvent {
    GenerationStarted {
        token: GenerationToken,
        label: String,
    },
    StickerDisplayed {
        token: GenerationToken,
        image: ImageRef,
    },
    GenerationFailed {
        token: GenerationToken,
        error: GenerationError,
        notice: String,
    },
    /// A newer request superseded this one before its result arrived.
    GenerationDiscarded {
        token: GenerationToken,
    },
    StickerCommitted {
        token: GenerationToken,
        sticker: Sticker,
        trigger: CommitTrigger,
    },
    TransferFinished {
        token: GenerationToken,
    },
    CollectionChanged(Collection),
    SelectionChanged(Option<usize>),
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
