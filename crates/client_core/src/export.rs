//! Turning stickers into files: one PNG per sticker, or one PNG for the
//! whole canvas via an external renderer.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use shared::domain::{ImageRef, Sticker};
use tracing::info;
use url::Url;

use crate::{collection::Collection, error::ExportError};

pub const COLLECTION_FILE_NAME: &str = "sticker-collection.png";

/// 1-based file name for the sticker at `index`.
pub fn sticker_file_name(index: usize) -> String {
    format!("sticker-{}.png", index + 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Inline { mime_type: String, bytes: Vec<u8> },
    Remote(Url),
}

impl ImageSource {
    pub fn parse(image_ref: &ImageRef) -> Result<Self, ExportError> {
        let raw = image_ref.as_str();
        if let Some(rest) = raw.strip_prefix("data:") {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| ExportError::UnsupportedImageRef(image_ref.summary()))?;
            let Some(mime_type) = meta.strip_suffix(";base64") else {
                return Err(ExportError::UnsupportedImageRef(image_ref.summary()));
            };
            let bytes = STANDARD.decode(payload.trim())?;
            return Ok(Self::Inline {
                mime_type: mime_type.to_string(),
                bytes,
            });
        }

        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Remote(url)),
            _ => Err(ExportError::UnsupportedImageRef(image_ref.summary())),
        }
    }
}

/// Rasterizes the whole canvas. Implemented by the presentation layer; the
/// core only decides when and where the result goes.
pub trait CanvasRenderer: Send + Sync {
    fn render_png(&self, stickers: &[Sticker]) -> anyhow::Result<Vec<u8>>;
}

pub struct StickerExporter {
    http: Client,
}

impl StickerExporter {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    pub async fn load_bytes(&self, image_ref: &ImageRef) -> Result<Vec<u8>, ExportError> {
        match ImageSource::parse(image_ref)? {
            ImageSource::Inline { bytes, .. } => Ok(bytes),
            ImageSource::Remote(url) => {
                let bytes = self
                    .http
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                Ok(bytes.to_vec())
            }
        }
    }

    /// Writes the sticker at `index` into `dir` as `sticker-<index+1>.png`.
    pub async fn export_sticker(
        &self,
        index: usize,
        sticker: &Sticker,
        dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let bytes = self.load_bytes(&sticker.image_ref).await?;
        let path = dir.join(sticker_file_name(index));
        write_file(&path, &bytes).await?;
        info!(sticker_id = %sticker.id, path = %path.display(), "exported sticker");
        Ok(path)
    }

    /// Exports the current selection, as returned by
    /// `StickerStudio::selected_sticker`.
    pub async fn export_selected(
        &self,
        selected: Option<(usize, Sticker)>,
        dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let (index, sticker) = selected.ok_or(ExportError::NothingSelected)?;
        self.export_sticker(index, &sticker, dir).await
    }

    pub async fn export_collection(
        &self,
        renderer: &dyn CanvasRenderer,
        collection: &Collection,
        dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let bytes = renderer
            .render_png(collection)
            .map_err(ExportError::Render)?;
        let path = dir.join(COLLECTION_FILE_NAME);
        write_file(&path, &bytes).await?;
        info!(stickers = collection.len(), path = %path.display(), "exported collection");
        Ok(path)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/export_tests.rs"]
mod tests;
