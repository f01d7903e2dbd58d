// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod analysis;
pub mod api;
pub mod benchmark;
pub mod config;
pub mod listing;
pub mod metrics;
pub mod policy;
pub mod price;
pub mod providers;
pub mod recommend;
pub mod signal;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{aggregate, AggregateResult, Aggregator, RiskVerdict};
pub use crate::analysis::{Analyzer, ListingReport, ListingSubmission};
pub use crate::api::{create_router, AppState};
pub use crate::benchmark::{BenchmarkDataSource, BenchmarkEntry, BenchmarkMiss, BenchmarkStore};
pub use crate::listing::{ListingAttributes, PropertyType};
pub use crate::policy::RiskPolicy;
pub use crate::price::{PriceAnalysis, PriceScorer};
pub use crate::recommend::recommend;
pub use crate::signal::{SignalKind, SignalResult};
