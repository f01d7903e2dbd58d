//! Start-up configuration: file paths come from env vars with repo-relative
//! defaults (`config/*.json|toml`), loaded once and shared read-only.

pub mod providers;

use anyhow::{Context, Result};

use crate::benchmark::BenchmarkStore;
use crate::policy::RiskPolicy;
pub use providers::ProvidersConfig;

/// Everything the analyzer needs, loaded from disk.
#[derive(Debug, Clone)]
pub struct Settings {
    pub benchmarks: BenchmarkStore,
    pub policy: RiskPolicy,
    pub providers: ProvidersConfig,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Ok(Self {
            benchmarks: BenchmarkStore::load_default().context("benchmarks")?,
            policy: RiskPolicy::load_default().context("risk policy")?,
            providers: ProvidersConfig::load_default().context("providers")?,
        })
    }
}
