//! Offline image provider used when no vision backend is configured.

use async_trait::async_trait;

use super::{ImageInput, ImageSignalProvider, ProviderError};
use crate::signal::SignalResult;

pub const DEMO_IMAGE_SCORE: i64 = 30;

/// Acknowledges submitted photos without inspecting them.
pub struct DemoImageProvider;

#[async_trait]
impl ImageSignalProvider for DemoImageProvider {
    async fn evaluate(&self, images: &[ImageInput]) -> Result<SignalResult, ProviderError> {
        Ok(SignalResult::new(
            DEMO_IMAGE_SCORE,
            "Unable to analyze (Demo Mode)",
            vec!["Image analysis requires a vision provider".to_string()],
            format!(
                "{} image(s) received, but no vision provider is configured; a low-confidence score was used.",
                images.len()
            ),
        ))
    }
    fn name(&self) -> &'static str {
        "demo"
    }
}
