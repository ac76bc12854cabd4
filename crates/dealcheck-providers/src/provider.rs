//! The uniform capability set every retail data source implements.

use async_trait::async_trait;

use dealcheck_core::{CanonicalItem, Coordinate, StoreLocation};

/// Per-call credential material produced by [`RetailProvider::authenticate`].
///
/// Acquired fresh for every resolution or search; never cached or reused
/// across calls.
#[derive(Debug, Clone)]
pub enum Credential {
    /// OAuth bearer token, attached as `Authorization: Bearer <token>`.
    Bearer(String),
    /// Affiliate publisher identity, attached as a query parameter plus an
    /// optional secondary key header.
    Publisher { id: String, key: Option<String> },
}

impl Credential {
    /// The bearer token, when this is a [`Credential::Bearer`].
    pub fn bearer(&self) -> Option<&str> {
        match self {
            Self::Bearer(token) => Some(token),
            Self::Publisher { .. } => None,
        }
    }

    /// The publisher id and optional key, when this is a
    /// [`Credential::Publisher`].
    pub fn publisher(&self) -> Option<(&str, Option<&str>)> {
        match self {
            Self::Bearer(_) => None,
            Self::Publisher { id, key } => Some((id, key.as_deref())),
        }
    }
}

/// An independent external retail data source.
///
/// The aggregator depends only on this four-operation capability set, never
/// on a concrete provider type. All four operations convert their own
/// failures (network, non-2xx status, malformed payload) into the
/// empty/absent result after logging. Nothing propagates out of an
/// adapter, so callers must not assume a non-empty result.
#[async_trait]
pub trait RetailProvider: Send + Sync {
    /// Stable name used for logging and display.
    fn name(&self) -> &'static str;

    /// Exchange configured secret material for a per-call credential.
    ///
    /// `None` means "provider unavailable": the exchange failed or was
    /// rejected. The failure is logged, never raised.
    async fn authenticate(&self) -> Option<Credential>;

    /// Stores near `origin` within `radius_miles`, in provider-defined
    /// order. The first element is the implicit nearest/default store.
    /// Empty on any failure.
    async fn locate_stores(
        &self,
        origin: Coordinate,
        radius_miles: f64,
        credential: &Credential,
    ) -> Vec<StoreLocation>;

    /// Resolve a single product at a specific store. `None` when the
    /// provider does not carry the product or the call fails.
    async fn lookup_by_identifier(
        &self,
        identifier: &str,
        store: &StoreLocation,
        credential: &Credential,
    ) -> Option<CanonicalItem>;

    /// Free-text catalog search, bounded to at most 20 results and enriched
    /// with store context from the first located store, if any. Empty on
    /// failure.
    async fn search_by_term(
        &self,
        term: &str,
        origin: Coordinate,
        radius_miles: f64,
        credential: &Credential,
    ) -> Vec<CanonicalItem>;
}

/// Case-insensitive scan of descriptive text for the organic marker.
///
/// A heuristic, not an authoritative flag: false negatives and positives
/// are expected and acceptable.
pub(crate) fn looks_organic<'a>(texts: impl IntoIterator<Item = &'a str>) -> bool {
    texts
        .into_iter()
        .any(|text| text.to_ascii_lowercase().contains("organic"))
}

/// Maximum results a single adapter returns from a free-text search.
pub(crate) const SEARCH_RESULT_LIMIT: usize = 20;
