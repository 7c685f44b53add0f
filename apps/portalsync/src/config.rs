use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::{
    ai::{DEFAULT_AI_BASE_URL, DEFAULT_AI_MODEL},
    gateway::{DEFAULT_API_BASE_URL, DEFAULT_HOSPITALS_PATH},
    GatewayConfig, GeminiConfig,
};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "portalsync.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub hospitals_path: String,
    pub request_timeout_secs: u64,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            hospitals_path: DEFAULT_HOSPITALS_PATH.into(),
            request_timeout_secs: 30,
            ai_api_key: None,
            ai_model: DEFAULT_AI_MODEL.into(),
            ai_base_url: DEFAULT_AI_BASE_URL.into(),
        }
    }
}

/// Keys accepted in `portalsync.toml`. Anything missing keeps its default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_base_url: Option<String>,
    hospitals_path: Option<String>,
    request_timeout_secs: Option<u64>,
    ai_api_key: Option<String>,
    ai_model: Option<String>,
    ai_base_url: Option<String>,
}

impl Settings {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.api_base_url.clone(),
            hospitals_path: self.hospitals_path.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// `None` when no key is configured; callers fall back to offline reference data.
    pub fn gemini_config(&self) -> Option<GeminiConfig> {
        let api_key = self.ai_api_key.clone()?;
        let mut config = GeminiConfig::new(api_key);
        config.model = self.ai_model.clone();
        config.base_url = self.ai_base_url.clone();
        Some(config)
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.hospitals_path {
            self.hospitals_path = v;
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file.ai_api_key {
            self.ai_api_key = Some(v);
        }
        if let Some(v) = file.ai_model {
            self.ai_model = v;
        }
        if let Some(v) = file.ai_base_url {
            self.ai_base_url = v;
        }
    }

    /// Environment overrides; later variables in each group win.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("PORTALSYNC_API_URL") {
            self.api_base_url = format!("{}/api", normalize_base_url(&v));
        }
        if let Some(v) = var("APP__API_BASE_URL") {
            self.api_base_url = v;
        }

        if let Some(v) = var("APP__HOSPITALS_PATH") {
            self.hospitals_path = v;
        }

        if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                self.request_timeout_secs = parsed;
            }
        }

        if let Some(v) = var("API_KEY") {
            self.ai_api_key = Some(v);
        }
        if let Some(v) = var("GEMINI_API_KEY") {
            self.ai_api_key = Some(v);
        }
        if let Some(v) = var("APP__AI_MODEL") {
            self.ai_model = v;
        }
        if let Some(v) = var("APP__AI_BASE_URL") {
            self.ai_base_url = v;
        }
    }

    fn finish(mut self) -> Self {
        self.api_base_url = normalize_base_url(&self.api_base_url);
        if self.api_base_url.is_empty() {
            self.api_base_url = DEFAULT_API_BASE_URL.into();
        }
        self.ai_api_key = self
            .ai_api_key
            .take()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }
}

pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Defaults, then the config file, then environment variables.
///
/// An explicit `path` must exist; the default `portalsync.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with(
    path: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (file, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    if let Some(file_settings) = read_file(&file, required)? {
        settings.apply_file(file_settings);
    }

    settings.apply_env(var);
    Ok(settings.finish())
}

fn read_file(path: &Path, required: bool) -> anyhow::Result<Option<FileSettings>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    };
    let parsed = toml::from_str::<FileSettings>(&raw)
        .with_context(|| format!("invalid config file '{}'", path.display()))?;
    Ok(Some(parsed))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
