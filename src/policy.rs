//! Risk policy: aggregation weights, verdict thresholds and recommendation
//! tiers, loaded from `config/risk_policy.toml`.
//!
//! TOML shape:
//! ```toml
//! [weights]
//! price = 0.4
//! text = 0.4
//! image = 0.2
//!
//! [thresholds]
//! genuine_max = 30
//! suspicious_max = 65
//!
//! [recommendations]
//! high_risk = ["Do not pay any advance", "..."]
//! suspicious = ["..."]
//! genuine = ["..."]
//! ```
//!
//! A missing file means the built-in defaults. A present file must validate.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use tracing::info;

pub const DEFAULT_POLICY_PATH: &str = "config/risk_policy.toml";
pub const ENV_POLICY_PATH: &str = "RISK_POLICY_PATH";

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub price: f64,
    pub text: f64,
    pub image: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            price: 0.4,
            text: 0.4,
            image: 0.2,
        }
    }
}

impl SignalWeights {
    pub fn sum(&self) -> f64 {
        self.price + self.text + self.image
    }

    pub fn validate(&self) -> Result<()> {
        for (name, w) in [("price", self.price), ("text", self.text), ("image", self.image)] {
            if !w.is_finite() || w < 0.0 {
                bail!("weight '{name}' must be a non-negative number, got {w}");
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            bail!("weights must sum to 1.0, got {sum}");
        }
        Ok(())
    }
}

/// Inclusive upper bounds of the two lower verdict bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictThresholds {
    pub genuine_max: u8,
    pub suspicious_max: u8,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            genuine_max: 30,
            suspicious_max: 65,
        }
    }
}

impl VerdictThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.genuine_max >= self.suspicious_max {
            bail!(
                "genuine_max ({}) must be below suspicious_max ({})",
                self.genuine_max,
                self.suspicious_max
            );
        }
        if self.suspicious_max > 100 {
            bail!("suspicious_max must be at most 100, got {}", self.suspicious_max);
        }
        Ok(())
    }
}

/// Fixed advice per verdict tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationTable {
    pub high_risk: Vec<String>,
    pub suspicious: Vec<String>,
    pub genuine: Vec<String>,
}

impl Default for RecommendationTable {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            high_risk: owned(&[
                "Do not pay any advance",
                "Verify property exists in person before any payment",
                "Video call the landlord and ask them to show the property live",
                "Report this listing if confirmed scam",
            ]),
            suspicious: owned(&[
                "Visit property before paying token amount",
                "Verify broker identity with a government ID",
                "Check if price matches nearby listings",
            ]),
            genuine: owned(&[
                "Listing appears genuine - proceed with normal caution",
                "Always visit before paying",
            ]),
        }
    }
}

impl RecommendationTable {
    pub fn validate(&self) -> Result<()> {
        for (tier, list) in [
            ("high_risk", &self.high_risk),
            ("suspicious", &self.suspicious),
            ("genuine", &self.genuine),
        ] {
            if list.is_empty() {
                bail!("recommendations for '{tier}' must not be empty");
            }
            if let Some(i) = list.iter().position(|s| s.trim().is_empty()) {
                bail!("recommendations for '{tier}' has a blank entry at index {i}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    #[serde(default)]
    pub weights: SignalWeights,
    #[serde(default)]
    pub thresholds: VerdictThresholds,
    #[serde(default)]
    pub recommendations: RecommendationTable,
}

impl RiskPolicy {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate().context("invalid [weights]")?;
        self.thresholds.validate().context("invalid [thresholds]")?;
        self.recommendations
            .validate()
            .context("invalid [recommendations]")?;
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let policy: RiskPolicy = toml::from_str(s).context("parsing risk policy TOML")?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading risk policy from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("loading risk policy from {}", path.display()))
    }

    /// `$RISK_POLICY_PATH` → `config/risk_policy.toml` → built-in defaults.
    pub fn load_default() -> Result<Self> {
        let path =
            std::env::var(ENV_POLICY_PATH).unwrap_or_else(|_| DEFAULT_POLICY_PATH.to_string());
        match Self::load_from_file(&path) {
            Ok(p) => {
                info!(path = %path, "risk policy loaded");
                Ok(p)
            }
            Err(e) if is_not_found(&e) => {
                info!(path = %path, "no risk policy file; using built-in defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.chain()
        .filter_map(|c| c.downcast_ref::<io::Error>())
        .any(|err| err.kind() == io::ErrorKind::NotFound)
}
