// tests/aggregate_properties.rs
//
// Properties of the final-score aggregation under the built-in policy.

use listing_risk_analyzer::aggregate::{aggregate, Aggregator, RiskVerdict};
use listing_risk_analyzer::policy::VerdictThresholds;
use listing_risk_analyzer::recommend::recommend;
use listing_risk_analyzer::signal::SignalResult;

fn sig(score: i64) -> SignalResult {
    SignalResult::new(score, "v", Vec::new(), "r")
}

/// `round((2p + 2t + i) / 5)` in integers, half-up.
fn expected(p: u32, t: u32, i: u32) -> u8 {
    let x = 2 * p + 2 * t + i;
    ((2 * x + 5) / 10) as u8
}

#[test]
fn weighted_sum_identity_holds_everywhere() {
    let agg = Aggregator::default();
    let signals: Vec<SignalResult> = (0..=100).map(sig).collect();
    for p in 0..=100u32 {
        for t in 0..=100u32 {
            for i in 0..=100u32 {
                let got = agg.final_score(
                    &signals[p as usize],
                    &signals[t as usize],
                    &signals[i as usize],
                );
                assert_eq!(got, expected(p, t, i), "p={p} t={t} i={i}");
            }
        }
    }
}

#[test]
fn verdict_boundaries_are_inclusive_upper() {
    let t = VerdictThresholds::default();
    assert_eq!(RiskVerdict::for_score(0, &t), RiskVerdict::LikelyGenuine);
    assert_eq!(RiskVerdict::for_score(30, &t), RiskVerdict::LikelyGenuine);
    assert_eq!(RiskVerdict::for_score(31, &t), RiskVerdict::Suspicious);
    assert_eq!(RiskVerdict::for_score(65, &t), RiskVerdict::Suspicious);
    assert_eq!(RiskVerdict::for_score(66, &t), RiskVerdict::HighScamRisk);
    assert_eq!(RiskVerdict::for_score(100, &t), RiskVerdict::HighScamRisk);
}

#[test]
fn recommendations_follow_the_verdict_tier() {
    for score in 0..=100u8 {
        let list = recommend(score);
        assert!(!list.is_empty());
        let tier_peer = match score {
            0..=30 => 0,
            31..=65 => 31,
            _ => 66,
        };
        assert_eq!(list, recommend(tier_peer), "score {score}");
    }
}

#[test]
fn aggregation_is_deterministic() {
    let (p, t, i) = (sig(63), sig(41), sig(88));
    let first = aggregate(&p, &t, &i);
    for _ in 0..50 {
        assert_eq!(aggregate(&p, &t, &i), first);
    }
}

#[test]
fn scam_listing_end_to_end() {
    // 0.4*95 + 0.4*80 + 0.2*20 = 74
    let out = aggregate(&sig(95), &sig(80), &SignalResult::no_image());
    assert_eq!(out.final_score, 74);
    assert_eq!(out.verdict, RiskVerdict::HighScamRisk);
    assert_eq!(out.recommendations[0], "Do not pay any advance");
    assert_eq!(out.recommendations, recommend(100));
}

#[test]
fn genuine_listing_end_to_end() {
    // 0.4*20 + 0.4*20 + 0.2*20 = 20
    let out = aggregate(&sig(20), &sig(20), &sig(20));
    assert_eq!(out.final_score, 20);
    assert_eq!(out.verdict, RiskVerdict::LikelyGenuine);
    assert_eq!(out.recommendations, recommend(0));
}
