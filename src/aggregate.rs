//! # Signal Aggregator
//! Pure, testable logic that maps `(price, text, image)` signals → final score,
//! verdict and recommendations. No I/O and no failure mode.
//!
//! Policy: `final = round(w_p*price + w_t*text + w_i*image)` with weights that
//! sum to 1.0, then banded by the verdict thresholds (inclusive upper bounds).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::policy::{RiskPolicy, VerdictThresholds};
use crate::recommend;
use crate::signal::{round_score, SignalResult};

static DEFAULT_AGGREGATOR: Lazy<Aggregator> = Lazy::new(Aggregator::default);

/// Final risk tier of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskVerdict {
    #[serde(rename = "Likely Genuine")]
    LikelyGenuine,
    #[serde(rename = "Suspicious")]
    Suspicious,
    #[serde(rename = "High Scam Risk")]
    HighScamRisk,
}

impl RiskVerdict {
    pub fn for_score(score: u8, t: &VerdictThresholds) -> Self {
        if score <= t.genuine_max {
            RiskVerdict::LikelyGenuine
        } else if score <= t.suspicious_max {
            RiskVerdict::Suspicious
        } else {
            RiskVerdict::HighScamRisk
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskVerdict::LikelyGenuine => "Likely Genuine",
            RiskVerdict::Suspicious => "Suspicious",
            RiskVerdict::HighScamRisk => "High Scam Risk",
        }
    }
}

impl fmt::Display for RiskVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub final_score: u8,
    pub verdict: RiskVerdict,
    pub recommendations: Vec<String>,
}

/// Aggregator bound to one policy.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    policy: RiskPolicy,
}

impl Aggregator {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub fn final_score(&self, price: &SignalResult, text: &SignalResult, image: &SignalResult) -> u8 {
        let w = &self.policy.weights;
        let raw = f64::from(price.score()) * w.price
            + f64::from(text.score()) * w.text
            + f64::from(image.score()) * w.image;
        round_score(raw)
    }

    pub fn aggregate(
        &self,
        price: &SignalResult,
        text: &SignalResult,
        image: &SignalResult,
    ) -> AggregateResult {
        let final_score = self.final_score(price, text, image);
        AggregateResult {
            final_score,
            verdict: RiskVerdict::for_score(final_score, &self.policy.thresholds),
            recommendations: recommend::recommend_with(&self.policy, final_score),
        }
    }
}

/// `aggregate` under the built-in policy.
pub fn aggregate(price: &SignalResult, text: &SignalResult, image: &SignalResult) -> AggregateResult {
    DEFAULT_AGGREGATOR.aggregate(price, text, image)
}

pub(crate) fn default_policy() -> &'static RiskPolicy {
    DEFAULT_AGGREGATOR.policy()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(score: i64) -> SignalResult {
        SignalResult::new(score, "x", vec![], "")
    }

    #[test]
    fn verdict_band_edges() {
        let t = VerdictThresholds::default();
        assert_eq!(RiskVerdict::for_score(0, &t), RiskVerdict::LikelyGenuine);
        assert_eq!(RiskVerdict::for_score(30, &t), RiskVerdict::LikelyGenuine);
        assert_eq!(RiskVerdict::for_score(31, &t), RiskVerdict::Suspicious);
        assert_eq!(RiskVerdict::for_score(65, &t), RiskVerdict::Suspicious);
        assert_eq!(RiskVerdict::for_score(66, &t), RiskVerdict::HighScamRisk);
        assert_eq!(RiskVerdict::for_score(100, &t), RiskVerdict::HighScamRisk);
    }

    #[test]
    fn all_neutral_fallbacks_land_in_suspicious() {
        let r = aggregate(&sig(50), &sig(50), &sig(50));
        assert_eq!(r.final_score, 50);
        assert_eq!(r.verdict, RiskVerdict::Suspicious);
    }

    #[test]
    fn custom_weights_are_honoured() {
        let mut p = RiskPolicy::default();
        p.weights.price = 1.0;
        p.weights.text = 0.0;
        p.weights.image = 0.0;
        let a = Aggregator::new(p);
        assert_eq!(a.final_score(&sig(77), &sig(0), &sig(100)), 77);
    }

    #[test]
    fn verdict_serializes_as_label() {
        let v = serde_json::to_value(RiskVerdict::HighScamRisk).unwrap();
        assert_eq!(v, serde_json::json!("High Scam Risk"));
    }
}
