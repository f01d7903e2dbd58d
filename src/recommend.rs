//! # Recommendation Generator
//! Static advice per verdict tier. Content is fixed per tier, never computed
//! from the listing itself.

use crate::aggregate::{default_policy, RiskVerdict};
use crate::policy::RiskPolicy;

/// Advice list for `final_score` under the built-in policy.
pub fn recommend(final_score: u8) -> Vec<String> {
    recommend_with(default_policy(), final_score)
}

pub fn recommend_with(policy: &RiskPolicy, final_score: u8) -> Vec<String> {
    let table = &policy.recommendations;
    match RiskVerdict::for_score(final_score, &policy.thresholds) {
        RiskVerdict::HighScamRisk => table.high_risk.clone(),
        RiskVerdict::Suspicious => table.suspicious.clone(),
        RiskVerdict::LikelyGenuine => table.genuine.clone(),
    }
}
