//! Domain types shared across the resolution pipeline.

use serde::{Deserialize, Serialize};

/// A geographic point. Radius arguments throughout the crate are miles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Price classification of a scanned item against the cheapest known offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Scanned price is at or below every competing offer.
    #[serde(rename = "DEAL")]
    Deal,
    /// Scanned price is within the margin of the cheapest offer.
    #[serde(rename = "SO-SO")]
    SoSo,
    /// Scanned price exceeds the cheapest offer beyond the margin.
    #[serde(rename = "NO DEAL")]
    NoDeal,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Deal => "DEAL",
            Self::SoSo => "SO-SO",
            Self::NoDeal => "NO DEAL",
        };
        f.write_str(label)
    }
}

/// The normalized product record chosen to represent what the user scanned.
///
/// `price` is always a finite non-negative number: a provider record with no
/// usable price field resolves to `0.0`, never an absent value, so downstream
/// comparisons cannot fail on missing data. Callers comparing against `0.0`
/// prices need to be aware of that coercion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalItem {
    /// Provider-specific product code, not necessarily the scanned UPC.
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Display name of the store the record was resolved at.
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    /// Heuristic flag derived from descriptive text; false negatives and
    /// positives are expected.
    #[serde(default)]
    pub organic: Option<bool>,
    #[serde(default)]
    pub verdict: Option<Verdict>,
    /// Bounded subset of competing offers, attached by the evaluator.
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

/// A store returned by a provider's locator endpoint.
///
/// Provider-defined ordering doubles as the implicit "nearest/default"
/// choice: the first located store is the one a lookup is anchored to.
/// Never persisted; lives for a single resolution call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreLocation {
    /// Provider-assigned location id.
    pub location_id: String,
    pub name: String,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// A competitor's priced instance of the scanned product at another store.
///
/// A projection of a competitor [`CanonicalItem`], not an independent
/// entity. `distance_miles` is an optional display field and is never
/// computed by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub identifier: String,
    pub name: String,
    pub price: f64,
    pub store: String,
    #[serde(default)]
    pub distance_miles: Option<f64>,
}
