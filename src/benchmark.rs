//! # Benchmark Store
//!
//! Read-only market price statistics keyed by normalized
//! `(city, locality, property type)`.
//!
//! - Loads from a nested JSON file once at start-up; never mutated afterwards.
//! - Keys are trimmed and lower-cased both at load time and at lookup time.
//! - A miss is a value (`BenchmarkMiss`), never a panic; the price scorer turns
//!   it into a neutral signal.
//!
//! JSON shape:
//! ```json
//! {
//!   "bangalore": {
//!     "koramangala": { "1bhk": 18000, "2bhk": 28000, "std_dev_percent": 0.2 }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    collections::{hash_map::Entry, BTreeMap, HashMap},
    fs, io,
    path::Path,
};
use tracing::{info, warn};

use crate::listing::{normalize_key, PropertyType};

pub const DEFAULT_BENCHMARKS_PATH: &str = "config/benchmarks.json";
pub const ENV_BENCHMARKS_PATH: &str = "BENCHMARKS_PATH";
pub const DEFAULT_STD_DEV_PERCENT: f64 = 0.20;

const STD_DEV_KEY: &str = "std_dev_percent";

/// Market statistics for one (city, locality, property type).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BenchmarkEntry {
    pub median_price: f64,
    /// Spread as a fraction of the median (0.20 = 20%).
    pub std_dev_percent: f64,
}

impl BenchmarkEntry {
    pub fn std_dev(&self) -> f64 {
        self.median_price * self.std_dev_percent
    }
}

/// Why a lookup found nothing. Carries the caller's original spelling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BenchmarkMiss {
    #[error("city '{city}' not found")]
    City { city: String },
    #[error("locality '{locality}' not found for {city}")]
    Locality { city: String, locality: String },
    #[error("property type '{property_type}' not found for {locality}, {city}")]
    PropertyType {
        city: String,
        locality: String,
        property_type: PropertyType,
    },
}

impl BenchmarkMiss {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            BenchmarkMiss::City { .. } => "city",
            BenchmarkMiss::Locality { .. } => "locality",
            BenchmarkMiss::PropertyType { .. } => "property_type",
        }
    }
}

/// Anything that can answer benchmark lookups (file, database, fixture).
pub trait BenchmarkDataSource: Send + Sync {
    fn lookup(
        &self,
        city: &str,
        locality: &str,
        property_type: PropertyType,
    ) -> Result<BenchmarkEntry, BenchmarkMiss>;
}

#[derive(Debug, Clone, Default)]
struct LocalityBenchmarks {
    medians: HashMap<PropertyType, f64>,
    std_dev_percent: f64,
}

/// In-memory benchmark table.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkStore {
    cities: HashMap<String, HashMap<String, LocalityBenchmarks>>,
}

// Sorted so that keys colliding after normalization resolve the same way on every load.
type RawTable = BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>;

impl BenchmarkStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the nested JSON table. Bad rows are skipped with a warning;
    /// only structurally invalid JSON is an error. Keys that collide after
    /// normalization are merged; the first raw key in sorted order wins.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: RawTable = serde_json::from_str(s).context("parsing benchmark JSON")?;
        let mut store = Self::default();

        for (city, localities) in raw {
            let city_key = normalize_key(&city);
            for (locality, fields) in localities {
                let locality_key = normalize_key(&locality);
                let mut lb = LocalityBenchmarks {
                    medians: HashMap::new(),
                    std_dev_percent: DEFAULT_STD_DEV_PERCENT,
                };

                for (field, value) in fields {
                    if normalize_key(&field) == STD_DEV_KEY {
                        lb.std_dev_percent = sanitize_std_dev(value);
                        continue;
                    }
                    let Ok(pt) = field.parse::<PropertyType>() else {
                        warn!(city = %city_key, locality = %locality_key, key = %field, "skipping unknown benchmark key");
                        continue;
                    };
                    if !(value.is_finite() && value > 0.0) {
                        warn!(city = %city_key, locality = %locality_key, property_type = %pt, value, "skipping non-positive median");
                        continue;
                    }
                    if lb.medians.contains_key(&pt) {
                        warn!(city = %city_key, locality = %locality_key, key = %field, "duplicate property type; keeping first");
                        continue;
                    }
                    lb.medians.insert(pt, value);
                }

                match store
                    .cities
                    .entry(city_key.clone())
                    .or_default()
                    .entry(locality_key)
                {
                    Entry::Vacant(slot) => {
                        slot.insert(lb);
                    }
                    Entry::Occupied(mut slot) => {
                        warn!(city = %city_key, locality = %slot.key(), raw = %locality, "duplicate locality after normalization; merging");
                        let existing = slot.get_mut();
                        for (pt, median) in lb.medians {
                            existing.medians.entry(pt).or_insert(median);
                        }
                    }
                }
            }
        }

        Ok(store)
    }

    /// Load from an explicit path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading benchmarks from {}", path.display()))?;
        let store = Self::from_json_str(&content)
            .with_context(|| format!("loading benchmarks from {}", path.display()))?;
        info!(
            path = %path.display(),
            cities = store.cities.len(),
            entries = store.len(),
            "benchmarks loaded"
        );
        Ok(store)
    }

    /// Load using `$BENCHMARKS_PATH`, falling back to `config/benchmarks.json`.
    /// A missing file yields an empty store so that every lookup degrades to
    /// the neutral price signal instead of failing start-up.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(ENV_BENCHMARKS_PATH)
            .unwrap_or_else(|_| DEFAULT_BENCHMARKS_PATH.to_string());
        match fs::metadata(&path) {
            Ok(_) => Self::load_from_file(&path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path, "benchmark file not found; price checks will be unverifiable");
                Ok(Self::empty())
            }
            Err(e) => Err(e).with_context(|| format!("reading benchmarks from {path}")),
        }
    }

    /// Number of (city, locality, property type) medians.
    pub fn len(&self) -> usize {
        self.cities
            .values()
            .flat_map(|l| l.values())
            .map(|lb| lb.medians.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BenchmarkDataSource for BenchmarkStore {
    fn lookup(
        &self,
        city: &str,
        locality: &str,
        property_type: PropertyType,
    ) -> Result<BenchmarkEntry, BenchmarkMiss> {
        let localities = self
            .cities
            .get(&normalize_key(city))
            .ok_or_else(|| BenchmarkMiss::City {
                city: city.to_string(),
            })?;

        let lb = localities
            .get(&normalize_key(locality))
            .ok_or_else(|| BenchmarkMiss::Locality {
                city: city.to_string(),
                locality: locality.to_string(),
            })?;

        let median = lb
            .medians
            .get(&property_type)
            .ok_or_else(|| BenchmarkMiss::PropertyType {
                city: city.to_string(),
                locality: locality.to_string(),
                property_type,
            })?;

        Ok(BenchmarkEntry {
            median_price: *median,
            std_dev_percent: lb.std_dev_percent,
        })
    }
}

fn sanitize_std_dev(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        DEFAULT_STD_DEV_PERCENT
    }
}
