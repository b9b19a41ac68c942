use std::{collections::HashMap, fs, path::Path, time::Duration};

use tracing::warn;
use url::Url;

use crate::error::SettingsError;

pub const SETTINGS_FILE: &str = "stickers.toml";
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000";

/// Where freshly committed stickers land: each new sticker is pushed one
/// `offset` further along the diagonal so it does not hide the previous one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub base_x: f64,
    pub base_y: f64,
    pub offset: f64,
}

impl Placement {
    pub fn position(&self, existing: usize) -> (f64, f64) {
        let step = existing as f64 * self.offset;
        (self.base_x + step, self.base_y + step)
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            base_x: 100.0,
            base_y: 100.0,
            offset: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudioSettings {
    pub service_url: String,
    pub request_timeout: Duration,
    pub fallback_timeout: Duration,
    pub transfer_delay: Duration,
    pub placement: Placement,
    pub min_box_side: f64,
    pub history_limit: usize,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            // Image generation plus background removal routinely takes tens of seconds.
            request_timeout: Duration::from_secs(120),
            fallback_timeout: Duration::from_millis(5000),
            transfer_delay: Duration::from_millis(800),
            placement: Placement::default(),
            min_box_side: 50.0,
            history_limit: 12,
        }
    }
}

pub fn load_settings() -> StudioSettings {
    load_settings_with(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `key = "value"` TOML file, then environment.
/// Unparseable values are logged and skipped.
pub fn load_settings_with(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> StudioSettings {
    let mut settings = StudioSettings::default();
    let mut service_url = None;

    if let Ok(raw) = fs::read_to_string(file) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("service_url") {
                    service_url = Some(v.clone());
                }
                apply_millis(file_cfg.get("fallback_timeout_ms"), &mut settings.fallback_timeout);
                apply_millis(file_cfg.get("transfer_delay_ms"), &mut settings.transfer_delay);
                apply_secs(file_cfg.get("request_timeout_secs"), &mut settings.request_timeout);
                apply_parsed(file_cfg.get("history_limit"), &mut settings.history_limit);
            }
            Err(error) => warn!(path = %file.display(), %error, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("STICKER_SERVICE_URL") {
        service_url = Some(v);
    }
    if let Some(v) = env("APP__SERVICE_URL") {
        service_url = Some(v);
    }
    apply_millis(env("APP__FALLBACK_TIMEOUT_MS").as_ref(), &mut settings.fallback_timeout);
    apply_millis(env("APP__TRANSFER_DELAY_MS").as_ref(), &mut settings.transfer_delay);
    apply_secs(env("APP__REQUEST_TIMEOUT_SECS").as_ref(), &mut settings.request_timeout);
    apply_parsed(env("APP__HISTORY_LIMIT").as_ref(), &mut settings.history_limit);

    if let Some(raw) = service_url {
        match normalize_service_url(&raw) {
            Ok(url) => settings.service_url = url,
            Err(error) => warn!(%error, "keeping default sticker service url"),
        }
    }

    settings
}

pub fn normalize_service_url(raw: &str) -> Result<String, SettingsError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(DEFAULT_SERVICE_URL.to_string());
    }

    let parsed = Url::parse(trimmed).map_err(|err| SettingsError::InvalidServiceUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SettingsError::InvalidServiceUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {}", parsed.scheme()),
        });
    }

    Ok(trimmed.to_string())
}

fn apply_parsed<T: std::str::FromStr>(raw: Option<&String>, target: &mut T) {
    if let Some(raw) = raw {
        match raw.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(value = %raw, "ignoring unparseable setting"),
        }
    }
}

fn apply_millis(raw: Option<&String>, target: &mut Duration) {
    let mut millis = target.as_millis() as u64;
    apply_parsed(raw, &mut millis);
    *target = Duration::from_millis(millis);
}

fn apply_secs(raw: Option<&String>, target: &mut Duration) {
    let mut secs = target.as_secs();
    apply_parsed(raw, &mut secs);
    *target = Duration::from_secs(secs);
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
