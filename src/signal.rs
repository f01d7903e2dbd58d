//! # Signals
//! One scorer's independent assessment of a single risk dimension.
//!
//! Scores are integers in `[0, 100]`; constructors clamp, so a `SignalResult`
//! can never carry an out-of-range score regardless of where it came from.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 100;

/// Neutral score substituted when an external provider fails.
pub const UNAVAILABLE_SCORE: u8 = 50;
/// Score used when the listing came without images.
pub const NO_IMAGE_SCORE: u8 = 20;

pub const UNAVAILABLE_VERDICT: &str = "Unable to analyze";
pub const UNAVAILABLE_FLAG: &str = "Analysis service temporarily unavailable";
pub const NO_IMAGE_VERDICT: &str = "No image provided";

/// Which risk dimension a signal describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Price,
    Text,
    Image,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Price => "price",
            SignalKind::Text => "text",
            SignalKind::Image => "image",
        }
    }

    fn title(self) -> &'static str {
        match self {
            SignalKind::Price => "Price",
            SignalKind::Text => "Text",
            SignalKind::Image => "Image",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalResult {
    #[serde(deserialize_with = "deserialize_score")]
    score: u8,
    pub verdict: String,
    #[serde(default)]
    pub flags: Vec<String>,
    pub reasoning: String,
}

impl SignalResult {
    /// Build a signal; `score` is clamped into `[0, 100]`.
    pub fn new(
        score: i64,
        verdict: impl Into<String>,
        flags: Vec<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            score: clamp_score(score),
            verdict: verdict.into(),
            flags,
            reasoning: reasoning.into(),
        }
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    /// Neutral stand-in for a provider that failed or timed out.
    pub fn unavailable(kind: SignalKind) -> Self {
        Self::new(
            UNAVAILABLE_SCORE.into(),
            UNAVAILABLE_VERDICT,
            vec![UNAVAILABLE_FLAG.to_string()],
            format!(
                "{} analysis unavailable; a neutral score was substituted.",
                kind.title()
            ),
        )
    }

    /// Signal for a listing submitted without images.
    pub fn no_image() -> Self {
        Self::new(
            NO_IMAGE_SCORE.into(),
            NO_IMAGE_VERDICT,
            Vec::new(),
            "No images were provided for analysis.",
        )
    }
}

pub fn clamp_score(score: i64) -> u8 {
    score.clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE)) as u8
}

fn deserialize_score<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    i64::deserialize(d).map(clamp_score)
}

/// Round-half-up (all inputs here are non-negative) and clamp into `[0, 100]`.
pub fn round_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return MIN_SCORE;
    }
    raw.round().clamp(f64::from(MIN_SCORE), f64::from(MAX_SCORE)) as u8
}
