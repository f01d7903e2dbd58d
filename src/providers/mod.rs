//! External signal providers (text + image).
//!
//! The scoring core only consumes their `SignalResult`s. Every provider call
//! returns `Result<SignalResult, ProviderError>`; the caller maps any error to
//! the neutral signal via [`or_neutral`] before aggregation.

pub mod image;
pub mod keyword;
pub mod openai;

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::signal::{SignalKind, SignalResult};

pub use image::DemoImageProvider;
pub use keyword::{KeywordRuleSet, KeywordTextProvider};
pub use openai::{OpenAiImageProvider, OpenAiTextProvider};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider disabled")]
    Disabled,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ProviderError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Disabled => "disabled",
            ProviderError::Config(_) => "config",
            ProviderError::Network(_) => "network",
            ProviderError::Api { .. } => "api",
            ProviderError::Parse(_) => "parse",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Parse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// What a text provider gets to look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub title: String,
    pub description: String,
    pub contact_number: Option<String>,
    /// One-line price observation for cross-signal reasoning.
    pub price_context: Option<String>,
}

impl TextInput {
    /// Prompt-ready rendering of the listing text.
    pub fn render(&self) -> String {
        let mut out = format!("Title: {}\n\nDescription: {}", self.title, self.description);
        if let Some(c) = self.contact_number.as_deref().filter(|c| !c.trim().is_empty()) {
            out.push_str(&format!("\n\nContact: {c}"));
        }
        if let Some(p) = &self.price_context {
            out.push_str(&format!("\n\nPrice analysis observation: {p}"));
        }
        out
    }
}

/// A single listing photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait TextSignalProvider: Send + Sync {
    async fn evaluate(&self, input: &TextInput) -> Result<SignalResult, ProviderError>;
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait ImageSignalProvider: Send + Sync {
    /// `images` is never empty; the caller handles image-less listings.
    async fn evaluate(&self, images: &[ImageInput]) -> Result<SignalResult, ProviderError>;
    fn name(&self) -> &'static str;
}

/// Always fails with `ProviderError::Disabled`.
pub struct DisabledProvider;

#[async_trait]
impl TextSignalProvider for DisabledProvider {
    async fn evaluate(&self, _input: &TextInput) -> Result<SignalResult, ProviderError> {
        Err(ProviderError::Disabled)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

#[async_trait]
impl ImageSignalProvider for DisabledProvider {
    async fn evaluate(&self, _images: &[ImageInput]) -> Result<SignalResult, ProviderError> {
        Err(ProviderError::Disabled)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Caller-side mapping of a provider outcome onto a well-formed signal.
pub fn or_neutral(result: Result<SignalResult, ProviderError>, kind: SignalKind) -> SignalResult {
    match result {
        Ok(signal) => signal,
        Err(e) => {
            warn!(signal = %kind, error = %e, "signal provider failed; substituting neutral signal");
            metrics::counter!(
                "signal_fallbacks_total",
                "signal" => kind.as_str(),
                "error" => e.kind()
            )
            .increment(1);
            SignalResult::unavailable(kind)
        }
    }
}
