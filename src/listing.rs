//! # Listing
//! Input attributes of a rental listing as consumed by the scoring engine.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Fixed set of property types the benchmarks are keyed by.
///
/// Serializes as its label; deserializes through `FromStr`, so `" Pg "` and
/// `"2bhk"` are accepted wherever `"PG"` and `"2BHK"` are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum PropertyType {
    #[serde(rename = "1BHK")]
    OneRoom,
    #[serde(rename = "2BHK")]
    TwoRoom,
    #[serde(rename = "3BHK")]
    ThreeRoom,
    #[serde(rename = "PG")]
    SharedPg,
}

impl PropertyType {
    pub const ALL: [PropertyType; 4] = [
        PropertyType::OneRoom,
        PropertyType::TwoRoom,
        PropertyType::ThreeRoom,
        PropertyType::SharedPg,
    ];

    /// Display label, e.g. "2BHK".
    pub fn label(self) -> &'static str {
        match self {
            PropertyType::OneRoom => "1BHK",
            PropertyType::TwoRoom => "2BHK",
            PropertyType::ThreeRoom => "3BHK",
            PropertyType::SharedPg => "PG",
        }
    }

    /// Normalized benchmark key, e.g. "2bhk".
    pub fn key(self) -> &'static str {
        match self {
            PropertyType::OneRoom => "1bhk",
            PropertyType::TwoRoom => "2bhk",
            PropertyType::ThreeRoom => "3bhk",
            PropertyType::SharedPg => "pg",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown property type '{0}' (expected 1BHK, 2BHK, 3BHK or PG)")]
pub struct UnknownPropertyType(pub String);

impl FromStr for PropertyType {
    type Err = UnknownPropertyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let k = normalize_key(s);
        PropertyType::ALL
            .into_iter()
            .find(|p| p.key() == k)
            .ok_or_else(|| UnknownPropertyType(s.to_string()))
    }
}

impl TryFrom<String> for PropertyType {
    type Error = UnknownPropertyType;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Immutable listing attributes used for price benchmarking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingAttributes {
    pub price: u32,
    pub city: String,
    pub locality: String,
    pub property_type: PropertyType,
}

impl ListingAttributes {
    pub fn new(
        price: u32,
        city: impl Into<String>,
        locality: impl Into<String>,
        property_type: PropertyType,
    ) -> Self {
        Self {
            price,
            city: city.into(),
            locality: locality.into(),
            property_type,
        }
    }
}

/// Lookup-key normalization: trim + lower-case.
pub fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_and_whitespace_insensitively() {
        assert_eq!(" 2bhk ".parse::<PropertyType>().unwrap(), PropertyType::TwoRoom);
        assert_eq!("Pg".parse::<PropertyType>().unwrap(), PropertyType::SharedPg);
        assert!("4BHK".parse::<PropertyType>().is_err());
    }

    #[test]
    fn serde_uses_display_labels() {
        let v = serde_json::to_value(PropertyType::ThreeRoom).unwrap();
        assert_eq!(v, serde_json::json!("3BHK"));
        let p: PropertyType = serde_json::from_str("\"1bhk\"").unwrap();
        assert_eq!(p, PropertyType::OneRoom);
    }

    #[test]
    fn deserialize_matches_from_str() {
        for raw in ["\" 2BHK \"", "\"2Bhk\"", "\"2bhk\""] {
            let p: PropertyType = serde_json::from_str(raw).unwrap();
            assert_eq!(p, PropertyType::TwoRoom, "{raw}");
        }
        let pg: PropertyType = serde_json::from_str("\"Pg\"").unwrap();
        assert_eq!(pg, PropertyType::SharedPg);
        let err = serde_json::from_str::<PropertyType>("\"4BHK\"").unwrap_err();
        assert!(err.to_string().contains("unknown property type '4BHK'"));
    }
}
