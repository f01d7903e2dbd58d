//! # Price Anomaly Scorer
//!
//! Compares a listed price against the market benchmark via a z-score and maps
//! the z-score to a risk score through an ordered band table:
//!
//! | z range            | score                         | verdict                         |
//! |--------------------|-------------------------------|---------------------------------|
//! | `z < -1.5`         | `min(100, round(85 + |z|*5))` | High Risk - Price Too Low       |
//! | `-1.5 <= z < -0.5` | `round(50 + |z|*20)`          | Suspicious - Below Market Rate  |
//! | `-0.5 <= z <= 0.5` | `round(20 + |z|*10)`          | Likely Genuine                  |
//! | `z > 0.5`          | `10`                          | Likely Genuine                  |
//!
//! The mapping jumps at the band edges (z = -1.5 scores 80, z just below it
//! scores 93). That is the policy; it is reproduced exactly, not smoothed.
//! Rounding is half-up (`f64::round` on non-negative values).

use serde::Serialize;
use std::{ops::Bound, sync::Arc};
use tracing::debug;

use crate::benchmark::{BenchmarkDataSource, BenchmarkEntry, BenchmarkMiss};
use crate::listing::{ListingAttributes, PropertyType};
use crate::signal::{round_score, SignalResult};

pub const UNVERIFIED_SCORE: u8 = 30;
pub const UNVERIFIED_VERDICT: &str = "Unable to verify";

/// How a band turns `|z|` into a raw score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandFormula {
    /// `min(cap, round(base + |z| * slope))`
    Linear { base: f64, slope: f64, cap: f64 },
    Fixed(u8),
}

impl BandFormula {
    pub fn apply(&self, z: f64) -> u8 {
        match *self {
            BandFormula::Linear { base, slope, cap } => {
                round_score((base + z.abs() * slope).round().min(cap))
            }
            BandFormula::Fixed(score) => score,
        }
    }
}

/// Which sentence template the reasoning uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    ScamLikely,
    Caution,
    NormalRange,
    AboveMarket,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBand {
    pub lower: Bound<f64>,
    pub upper: Bound<f64>,
    pub formula: BandFormula,
    pub verdict: &'static str,
    pub flag: Option<&'static str>,
    pub tone: Tone,
}

impl PriceBand {
    pub fn contains(&self, z: f64) -> bool {
        let above_lower = match self.lower {
            Bound::Included(l) => z >= l,
            Bound::Excluded(l) => z > l,
            Bound::Unbounded => true,
        };
        let below_upper = match self.upper {
            Bound::Included(u) => z <= u,
            Bound::Excluded(u) => z < u,
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }
}

/// Ordered band table; the first band containing `z` wins.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBands {
    bands: Vec<PriceBand>,
}

impl Default for PriceBands {
    fn default() -> Self {
        Self {
            bands: vec![
                PriceBand {
                    lower: Bound::Unbounded,
                    upper: Bound::Excluded(-1.5),
                    formula: BandFormula::Linear {
                        base: 85.0,
                        slope: 5.0,
                        cap: 100.0,
                    },
                    verdict: "High Risk - Price Too Low",
                    flag: Some("Price far below market median"),
                    tone: Tone::ScamLikely,
                },
                PriceBand {
                    lower: Bound::Included(-1.5),
                    upper: Bound::Excluded(-0.5),
                    formula: BandFormula::Linear {
                        base: 50.0,
                        slope: 20.0,
                        cap: 100.0,
                    },
                    verdict: "Suspicious - Below Market Rate",
                    flag: Some("Price below typical market rate"),
                    tone: Tone::Caution,
                },
                PriceBand {
                    lower: Bound::Included(-0.5),
                    upper: Bound::Included(0.5),
                    formula: BandFormula::Linear {
                        base: 20.0,
                        slope: 10.0,
                        cap: 100.0,
                    },
                    verdict: "Likely Genuine",
                    flag: None,
                    tone: Tone::NormalRange,
                },
                PriceBand {
                    lower: Bound::Excluded(0.5),
                    upper: Bound::Unbounded,
                    formula: BandFormula::Fixed(10),
                    verdict: "Likely Genuine",
                    flag: None,
                    tone: Tone::AboveMarket,
                },
            ],
        }
    }
}

impl PriceBands {
    pub fn new(bands: Vec<PriceBand>) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &[PriceBand] {
        &self.bands
    }

    pub fn select(&self, z: f64) -> Option<&PriceBand> {
        self.bands.iter().find(|b| b.contains(z))
    }
}

/// Full price-check output; `signal` is what the aggregator consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceAnalysis {
    #[serde(flatten)]
    pub signal: SignalResult,
    pub market_median: Option<f64>,
    /// Positive below market, negative above; two decimals.
    pub percent_below_market: Option<f64>,
    pub z_score: Option<f64>,
}

impl PriceAnalysis {
    fn unverified(miss: &BenchmarkMiss) -> Self {
        Self {
            signal: SignalResult::new(
                UNVERIFIED_SCORE.into(),
                UNVERIFIED_VERDICT,
                Vec::new(),
                miss_reasoning(miss),
            ),
            market_median: None,
            percent_below_market: None,
            z_score: None,
        }
    }

    /// One-line observation handed to text providers for cross-signal reasoning.
    pub fn context_line(&self, price: u32) -> String {
        match (self.market_median, self.percent_below_market) {
            (Some(median), Some(pct)) => format!(
                "Listed price {} vs market median {} ({:.1}% {} market); price risk score {}/100 ({}).",
                group_thousands(f64::from(price)),
                group_thousands(median),
                pct.abs(),
                if pct >= 0.0 { "below" } else { "above" },
                self.signal.score(),
                self.signal.verdict
            ),
            _ => format!(
                "Listed price {}; no market benchmark available ({}).",
                group_thousands(f64::from(price)),
                self.signal.reasoning
            ),
        }
    }
}

/// Scores listing prices against a benchmark source.
#[derive(Clone)]
pub struct PriceScorer {
    source: Arc<dyn BenchmarkDataSource>,
    bands: PriceBands,
}

impl PriceScorer {
    pub fn new(source: Arc<dyn BenchmarkDataSource>) -> Self {
        Self::with_bands(source, PriceBands::default())
    }

    pub fn with_bands(source: Arc<dyn BenchmarkDataSource>, bands: PriceBands) -> Self {
        Self { source, bands }
    }

    /// `scorePrice`: the signal alone.
    pub fn score(
        &self,
        price: u32,
        city: &str,
        locality: &str,
        property_type: PropertyType,
    ) -> SignalResult {
        self.analyze(price, city, locality, property_type).signal
    }

    pub fn analyze_listing(&self, listing: &ListingAttributes) -> PriceAnalysis {
        self.analyze(
            listing.price,
            &listing.city,
            &listing.locality,
            listing.property_type,
        )
    }

    pub fn analyze(
        &self,
        price: u32,
        city: &str,
        locality: &str,
        property_type: PropertyType,
    ) -> PriceAnalysis {
        match self.source.lookup(city, locality, property_type) {
            Ok(entry) => self.analyze_against(price, &entry),
            Err(miss) => {
                debug!(reason = miss.reason(), %miss, "benchmark miss");
                metrics::counter!("benchmark_misses_total", "reason" => miss.reason())
                    .increment(1);
                PriceAnalysis::unverified(&miss)
            }
        }
    }

    /// Score against a known entry; no lookup involved.
    pub fn analyze_against(&self, price: u32, entry: &BenchmarkEntry) -> PriceAnalysis {
        let price_f = f64::from(price);
        let median = entry.median_price;
        let z = (price_f - median) / entry.std_dev();
        let pct_below = (median - price_f) / median * 100.0;

        let Some(band) = self.bands.select(z) else {
            // Only reachable with a custom table that leaves gaps, or a NaN z.
            return PriceAnalysis::unverified_for_z(price, median, pct_below, z);
        };

        let score = band.formula.apply(z);
        debug!(z, score, verdict = band.verdict, "price band selected");

        PriceAnalysis {
            signal: SignalResult::new(
                score.into(),
                band.verdict,
                band.flag.map(|f| vec![f.to_string()]).unwrap_or_default(),
                reasoning(band.tone, price_f, median, pct_below),
            ),
            market_median: Some(median),
            percent_below_market: Some(round2(pct_below)),
            z_score: Some(z),
        }
    }
}

impl PriceAnalysis {
    fn unverified_for_z(price: u32, median: f64, pct_below: f64, z: f64) -> Self {
        Self {
            signal: SignalResult::new(
                UNVERIFIED_SCORE.into(),
                UNVERIFIED_VERDICT,
                Vec::new(),
                format!(
                    "Listed price of {} could not be placed in any price band (z = {z:.2}).",
                    group_thousands(f64::from(price))
                ),
            ),
            market_median: Some(median),
            percent_below_market: Some(round2(pct_below)),
            z_score: if z.is_finite() { Some(z) } else { None },
        }
    }
}

fn reasoning(tone: Tone, price: f64, median: f64, pct_below: f64) -> String {
    let p = group_thousands(price);
    let m = group_thousands(median);
    let pct = pct_below.abs();
    let direction = if price < median { "below" } else { "above" };
    match tone {
        Tone::ScamLikely => format!(
            "Listed price of {p} is {pct:.1}% below market median of {m}. This is suspiciously low and may indicate a scam."
        ),
        Tone::Caution => format!(
            "Listed price of {p} is {pct:.1}% below market median of {m}. This is lower than typical rates and warrants caution."
        ),
        Tone::NormalRange => format!(
            "Listed price of {p} is {pct:.1}% {direction} market median of {m}. This is within normal range."
        ),
        Tone::AboveMarket => format!(
            "Listed price of {p} is {pct:.1}% above market median of {m}. Higher prices are generally less risky."
        ),
    }
}

fn miss_reasoning(miss: &BenchmarkMiss) -> String {
    match miss {
        BenchmarkMiss::City { city } => {
            format!("City '{city}' not found in benchmark data. Unable to verify pricing.")
        }
        BenchmarkMiss::Locality { city, locality } => format!(
            "Locality '{locality}' not found in benchmark data for {city}. Unable to verify pricing."
        ),
        BenchmarkMiss::PropertyType {
            city,
            locality,
            property_type,
        } => format!(
            "Property type '{property_type}' not found in benchmark data for {locality}, {city}. Unable to verify pricing."
        ),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `28000.0` → `"28,000"`.
pub fn group_thousands(v: f64) -> String {
    let n = v.round() as i64;
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
