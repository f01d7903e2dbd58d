//! Rule-based text provider (no network, deterministic).
//!
//! Each rule is a list of phrases matched case-insensitively on word
//! boundaries. A rule fires when its phrases occur at least `min_hits` times in
//! its scope; firing adds `weight` to the score and appends `flag`.
//!
//! JSON shape (`config/keyword_rules.json`):
//! ```json
//! {
//!   "base_score": 50,
//!   "high_risk_min": 70,
//!   "suspicious_min": 50,
//!   "rules": [
//!     { "flag": "Urgency tactics detected", "weight": 20,
//!       "scope": "title_and_description", "phrases": ["urgent", "jaldi"] }
//!   ]
//! }
//! ```

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::{info, warn};

use super::{ProviderError, TextInput, TextSignalProvider};
use crate::signal::SignalResult;

pub const DEFAULT_KEYWORD_RULES_PATH: &str = "config/keyword_rules.json";
pub const ENV_KEYWORD_RULES_PATH: &str = "KEYWORD_RULES_PATH";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    TitleAndDescription,
    Description,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeywordRule {
    pub flag: String,
    pub weight: i64,
    pub phrases: Vec<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default = "default_min_hits")]
    pub min_hits: usize,
}

fn default_min_hits() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeywordRuleSet {
    #[serde(default = "default_base_score")]
    pub base_score: i64,
    #[serde(default = "default_high_risk_min")]
    pub high_risk_min: i64,
    #[serde(default = "default_suspicious_min")]
    pub suspicious_min: i64,
    #[serde(default)]
    pub rules: Vec<KeywordRule>,
}

fn default_base_score() -> i64 {
    50
}
fn default_high_risk_min() -> i64 {
    70
}
fn default_suspicious_min() -> i64 {
    50
}

impl Default for KeywordRuleSet {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl KeywordRuleSet {
    /// Load from a JSON file. Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(s) => match serde_json::from_str::<KeywordRuleSet>(&s) {
                Ok(rs) => {
                    info!(path = %path.display(), rules = rs.rules.len(), "keyword rules loaded");
                    rs
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid keyword rules; using built-in seed");
                    Self::default_seed()
                }
            },
            Err(_) => Self::default_seed(),
        }
    }

    /// `$KEYWORD_RULES_PATH` → `path_hint` → `config/keyword_rules.json`.
    pub fn load_default(path_hint: Option<&str>) -> Self {
        let path = std::env::var(ENV_KEYWORD_RULES_PATH)
            .ok()
            .or_else(|| path_hint.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_KEYWORD_RULES_PATH.to_string());
        Self::load_from_file(path)
    }

    /// Built-in rules for common rental-scam language.
    pub fn default_seed() -> Self {
        fn rule(flag: &str, weight: i64, scope: Scope, min_hits: usize, phrases: &[&str]) -> KeywordRule {
            KeywordRule {
                flag: flag.to_string(),
                weight,
                phrases: phrases.iter().map(|p| p.to_string()).collect(),
                scope,
                min_hits,
            }
        }

        Self {
            base_score: 50,
            high_risk_min: 70,
            suspicious_min: 50,
            rules: vec![
                rule(
                    "Urgency tactics detected",
                    20,
                    Scope::TitleAndDescription,
                    1,
                    &[
                        "urgent",
                        "hurry",
                        "today only",
                        "only today",
                        "offer only for today",
                        "limited time",
                        "jaldi",
                        "jaldi karo",
                        "sirf aaj",
                        "abhi contact",
                    ],
                ),
                rule(
                    "Advance payment pressure detected",
                    15,
                    Scope::Description,
                    1,
                    &["token", "token amount", "advance", "pay now", "booking amount"],
                ),
                rule(
                    "WhatsApp-only contact (suspicious)",
                    10,
                    Scope::Description,
                    1,
                    &["whatsapp only", "only on whatsapp", "only whatsapp", "no calls"],
                ),
                rule(
                    "Owner-abroad narrative",
                    10,
                    Scope::Description,
                    1,
                    &["going abroad", "owner abroad", "out of country", "relocating abroad"],
                ),
                rule(
                    "Pressure from other interested parties",
                    10,
                    Scope::Description,
                    1,
                    &[
                        "people already interested",
                        "many people interested",
                        "others are interested",
                        "first come first serve",
                    ],
                ),
                rule(
                    "Vague description with minimal details",
                    10,
                    Scope::Description,
                    4,
                    &["nice", "good", "best"],
                ),
            ],
        }
    }
}

struct CompiledRule {
    rule: KeywordRule,
    re: Regex,
}

/// Keyword/rule text provider.
pub struct KeywordTextProvider {
    rules: Vec<CompiledRule>,
    base_score: i64,
    high_risk_min: i64,
    suspicious_min: i64,
}

impl KeywordTextProvider {
    pub fn new(set: KeywordRuleSet) -> Result<Self, ProviderError> {
        let mut rules = Vec::with_capacity(set.rules.len());
        for rule in set.rules {
            let phrases: Vec<String> = rule
                .phrases
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(regex::escape)
                .collect();
            if phrases.is_empty() {
                warn!(flag = %rule.flag, "keyword rule has no phrases; skipping");
                continue;
            }
            let re = RegexBuilder::new(&format!(r"\b(?:{})\b", phrases.join("|")))
                .case_insensitive(true)
                .build()
                .map_err(|e| ProviderError::Config(format!("rule '{}': {e}", rule.flag)))?;
            rules.push(CompiledRule { rule, re });
        }
        Ok(Self {
            rules,
            base_score: set.base_score,
            high_risk_min: set.high_risk_min,
            suspicious_min: set.suspicious_min,
        })
    }

    /// Synchronous core of `evaluate`.
    pub fn score_text(&self, input: &TextInput) -> SignalResult {
        let title_and_desc = format!("{}\n{}", input.title, input.description);
        let mut score = self.base_score;
        let mut flags = Vec::new();

        for c in &self.rules {
            let haystack = match c.rule.scope {
                Scope::TitleAndDescription => title_and_desc.as_str(),
                Scope::Description => input.description.as_str(),
            };
            let hits = c.re.find_iter(haystack).count();
            if hits >= c.rule.min_hits.max(1) {
                score += c.rule.weight;
                flags.push(c.rule.flag.clone());
            }
        }

        let verdict = if score >= self.high_risk_min {
            "High Scam Risk"
        } else if score >= self.suspicious_min {
            "Suspicious"
        } else {
            "Likely Genuine"
        };
        let reasoning = format!(
            "Text analysis detected {} red flag{} in the listing description.",
            flags.len(),
            if flags.len() == 1 { "" } else { "s" }
        );

        SignalResult::new(score, verdict, flags, reasoning)
    }
}

#[async_trait]
impl TextSignalProvider for KeywordTextProvider {
    async fn evaluate(&self, input: &TextInput) -> Result<SignalResult, ProviderError> {
        Ok(self.score_text(input))
    }
    fn name(&self) -> &'static str {
        "keyword"
    }
}
