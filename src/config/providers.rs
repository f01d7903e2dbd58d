// src/config/providers.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, io, path::Path, sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::providers::openai::{OpenAiSettings, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::providers::{
    DemoImageProvider, DisabledProvider, ImageSignalProvider, KeywordRuleSet,
    KeywordTextProvider, OpenAiImageProvider, OpenAiTextProvider, TextSignalProvider,
};

pub const DEFAULT_PROVIDERS_CONFIG_PATH: &str = "config/providers.json";
pub const ENV_PROVIDERS_CONFIG_PATH: &str = "PROVIDERS_CONFIG_PATH";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

fn default_timeout_ms() -> u64 {
    12_000
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextProviderKind {
    #[default]
    Keyword,
    OpenAi,
    Disabled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProviderKind {
    #[default]
    Demo,
    OpenAi,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: default_api_key(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub text: TextProviderKind,
    #[serde(default)]
    pub image: ImageProviderKind,
    /// Per-provider deadline; the analysis substitutes a neutral signal after it.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub keyword_rules_path: Option<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            text: TextProviderKind::default(),
            image: ImageProviderKind::default(),
            timeout_ms: default_timeout_ms(),
            openai: OpenAiConfig::default(),
            keyword_rules_path: None,
        }
    }
}

impl ProvidersConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let mut cfg: ProvidersConfig =
            serde_json::from_str(s).context("parsing providers config JSON")?;

        // Resolve api key if "ENV"; a missing key is not fatal (demo fallback)
        if cfg.openai.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.openai.api_key = env::var(ENV_OPENAI_API_KEY).unwrap_or_default();
        }

        if cfg.timeout_ms == 0 {
            cfg.timeout_ms = default_timeout_ms();
        }

        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading providers config from {}", path.display()))?;
        Self::from_json_str(&data)
            .with_context(|| format!("loading providers config from {}", path.display()))
    }

    /// `$PROVIDERS_CONFIG_PATH` → `config/providers.json` → defaults
    /// (keyword text provider, demo image provider).
    pub fn load_default() -> Result<Self> {
        let path = env::var(ENV_PROVIDERS_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_PROVIDERS_CONFIG_PATH.to_string());
        match fs::metadata(&path) {
            Ok(_) => Self::load_from_file(&path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path, "no providers config; using keyword/demo providers");
                Self::from_json_str("{}")
            }
            Err(e) => Err(e).with_context(|| format!("reading providers config from {path}")),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn openai_settings(&self) -> OpenAiSettings {
        OpenAiSettings {
            api_key: self.openai.api_key.clone(),
            model: self.openai.model.clone(),
            base_url: self.openai.base_url.clone(),
            timeout: self.timeout(),
        }
    }

    fn keyword_provider(&self) -> Arc<dyn TextSignalProvider> {
        let rules = KeywordRuleSet::load_default(self.keyword_rules_path.as_deref());
        match KeywordTextProvider::new(rules) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                warn!(error = %e, "keyword rules failed to compile; using built-in seed");
                match KeywordTextProvider::new(KeywordRuleSet::default_seed()) {
                    Ok(p) => Arc::new(p),
                    Err(_) => Arc::new(DisabledProvider),
                }
            }
        }
    }

    /// Build the configured text provider. An OpenAI provider without a key
    /// degrades to the keyword provider.
    pub fn build_text_provider(&self) -> Arc<dyn TextSignalProvider> {
        let provider: Arc<dyn TextSignalProvider> = match self.text {
            TextProviderKind::Keyword => self.keyword_provider(),
            TextProviderKind::Disabled => Arc::new(DisabledProvider),
            TextProviderKind::OpenAi => match OpenAiTextProvider::new(self.openai_settings()) {
                Ok(p) => Arc::new(p),
                Err(e) => {
                    warn!(error = %e, "OpenAI text provider unavailable; falling back to keyword rules");
                    self.keyword_provider()
                }
            },
        };
        info!(provider = provider.name(), "text provider ready");
        provider
    }

    /// Build the configured image provider. An OpenAI provider without a key
    /// degrades to the demo provider.
    pub fn build_image_provider(&self) -> Arc<dyn ImageSignalProvider> {
        let provider: Arc<dyn ImageSignalProvider> = match self.image {
            ImageProviderKind::Demo => Arc::new(DemoImageProvider),
            ImageProviderKind::Disabled => Arc::new(DisabledProvider),
            ImageProviderKind::OpenAi => match OpenAiImageProvider::new(self.openai_settings()) {
                Ok(p) => Arc::new(p),
                Err(e) => {
                    warn!(error = %e, "OpenAI image provider unavailable; falling back to demo mode");
                    Arc::new(DemoImageProvider)
                }
            },
        };
        info!(provider = provider.name(), "image provider ready");
        provider
    }
}
