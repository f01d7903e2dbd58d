//! # Listing analysis
//! Runs the three signals for one submission and folds them into a report.
//!
//! Price is scored first (pure, in-process) so its observation can be handed
//! to the text provider. Text and image then run concurrently, each under the
//! provider deadline. Whatever the providers do, `analyze` returns a report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{future::Future, sync::Arc, time::Duration, time::Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate::{Aggregator, RiskVerdict};
use crate::listing::ListingAttributes;
use crate::price::{PriceAnalysis, PriceScorer};
use crate::providers::{
    or_neutral, ImageInput, ImageSignalProvider, ProviderError, TextInput, TextSignalProvider,
};
use crate::signal::{SignalKind, SignalResult};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(12);

/// One listing as submitted for analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingSubmission {
    pub listing: ListingAttributes,
    pub title: String,
    pub description: String,
    pub contact_number: Option<String>,
    pub images: Vec<ImageInput>,
}

/// Final result returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingReport {
    pub listing_id: Uuid,
    pub risk_score: u8,
    pub verdict: RiskVerdict,
    pub price_analysis: PriceAnalysis,
    pub text_analysis: SignalResult,
    pub image_analysis: SignalResult,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

pub struct Analyzer {
    prices: PriceScorer,
    aggregator: Aggregator,
    text: Arc<dyn TextSignalProvider>,
    image: Arc<dyn ImageSignalProvider>,
    timeout: Duration,
}

impl Analyzer {
    pub fn new(
        prices: PriceScorer,
        aggregator: Aggregator,
        text: Arc<dyn TextSignalProvider>,
        image: Arc<dyn ImageSignalProvider>,
    ) -> Self {
        Self {
            prices,
            aggregator,
            text,
            image,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn prices(&self) -> &PriceScorer {
        &self.prices
    }

    pub async fn analyze(&self, submission: &ListingSubmission) -> ListingReport {
        let started = Instant::now();
        let listing = &submission.listing;

        let price_analysis = self.prices.analyze_listing(listing);

        let text_input = TextInput {
            title: submission.title.clone(),
            description: submission.description.clone(),
            contact_number: submission.contact_number.clone(),
            price_context: Some(price_analysis.context_line(listing.price)),
        };

        let text_fut = with_deadline(self.timeout, self.text.evaluate(&text_input));
        let image_fut = async {
            if submission.images.is_empty() {
                return SignalResult::no_image();
            }
            or_neutral(
                with_deadline(self.timeout, self.image.evaluate(&submission.images)).await,
                SignalKind::Image,
            )
        };
        let (text_result, image_analysis) = tokio::join!(text_fut, image_fut);
        let text_analysis = or_neutral(text_result, SignalKind::Text);

        let outcome =
            self.aggregator
                .aggregate(&price_analysis.signal, &text_analysis, &image_analysis);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::counter!("listing_analyses_total", "verdict" => outcome.verdict.label())
            .increment(1);
        metrics::histogram!("listing_risk_score").record(f64::from(outcome.final_score));
        metrics::histogram!("listing_analysis_ms").record(elapsed_ms);

        debug!(
            price = price_analysis.signal.score(),
            text = text_analysis.score(),
            image = image_analysis.score(),
            text_provider = self.text.name(),
            image_provider = self.image.name(),
            "signals collected"
        );
        info!(
            city = %listing.city,
            locality = %listing.locality,
            property_type = %listing.property_type,
            risk_score = outcome.final_score,
            verdict = %outcome.verdict,
            elapsed_ms,
            "listing analyzed"
        );

        ListingReport {
            listing_id: Uuid::new_v4(),
            risk_score: outcome.final_score,
            verdict: outcome.verdict,
            price_analysis,
            text_analysis,
            image_analysis,
            recommendations: outcome.recommendations,
            analyzed_at: Utc::now(),
        }
    }
}

async fn with_deadline<F>(limit: Duration, fut: F) -> Result<SignalResult, ProviderError>
where
    F: Future<Output = Result<SignalResult, ProviderError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::BenchmarkStore;
    use crate::listing::PropertyType;
    use crate::providers::{DemoImageProvider, DisabledProvider, KeywordRuleSet, KeywordTextProvider};

    fn analyzer(text: Arc<dyn TextSignalProvider>, image: Arc<dyn ImageSignalProvider>) -> Analyzer {
        let store = BenchmarkStore::from_json_str(
            r#"{"Bangalore": {"Koramangala": {"2bhk": 35000, "std_dev_percent": 0.2}}}"#,
        )
        .unwrap();
        Analyzer::new(
            PriceScorer::new(Arc::new(store)),
            Aggregator::default(),
            text,
            image,
        )
    }

    fn submission(price: u32, images: Vec<ImageInput>) -> ListingSubmission {
        ListingSubmission {
            listing: ListingAttributes::new(price, "Bangalore", "Koramangala", PropertyType::TwoRoom),
            title: "2BHK near Forum mall".into(),
            description: "Semi-furnished, 2 bathrooms, covered parking.".into(),
            contact_number: None,
            images,
        }
    }

    #[tokio::test]
    async fn no_images_skips_the_image_provider() {
        // Disabled would yield a neutral 50; skipping it yields the fixed 20.
        let a = analyzer(
            Arc::new(KeywordTextProvider::new(KeywordRuleSet::default_seed()).unwrap()),
            Arc::new(DisabledProvider),
        );
        let r = a.analyze(&submission(35000, Vec::new())).await;
        assert_eq!(r.image_analysis, SignalResult::no_image());
        assert_eq!(r.price_analysis.signal.score(), 20);
        // 0.4*20 + 0.4*50 + 0.2*20 = 32
        assert_eq!(r.risk_score, 32);
        assert_eq!(r.verdict, RiskVerdict::Suspicious);
    }

    #[tokio::test]
    async fn disabled_providers_degrade_to_neutral() {
        let a = analyzer(Arc::new(DisabledProvider), Arc::new(DisabledProvider));
        let img = ImageInput {
            media_type: "image/png".into(),
            bytes: vec![1, 2, 3],
        };
        let r = a.analyze(&submission(35000, vec![img])).await;
        assert_eq!(r.text_analysis, SignalResult::unavailable(SignalKind::Text));
        assert_eq!(r.image_analysis, SignalResult::unavailable(SignalKind::Image));
        // 0.4*20 + 0.4*50 + 0.2*50 = 38
        assert_eq!(r.risk_score, 38);
    }

    #[tokio::test]
    async fn demo_image_is_used_when_photos_exist() {
        let a = analyzer(Arc::new(DisabledProvider), Arc::new(DemoImageProvider));
        let img = ImageInput {
            media_type: "image/jpeg".into(),
            bytes: vec![0xff],
        };
        let r = a.analyze(&submission(35000, vec![img])).await;
        assert_eq!(r.image_analysis.score(), 30);
    }
}
