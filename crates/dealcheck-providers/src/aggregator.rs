//! Scan resolution and search across all configured providers.

use futures::future::join_all;
use futures::stream::{self, StreamExt};

use dealcheck_core::{
    evaluate, AppConfig, CanonicalItem, Coordinate, Recommendation, StoreLocation,
};

use crate::error::ProviderError;
use crate::groceryserver::GroceryServerProvider;
use crate::kroger::KrogerProvider;
use crate::provider::{Credential, RetailProvider};

/// Outcome of resolving one scan event.
#[derive(Debug)]
pub struct ScanResolution {
    /// The canonical item with verdict and recommendations attached, or
    /// `None` when no configured provider resolved the identifier.
    /// That is "product not found", not a fault.
    pub item: Option<CanonicalItem>,
    /// All competing offers, self-excluded and sorted ascending by price.
    pub deals: Vec<Recommendation>,
}

/// What one provider contributed to a resolution pass.
struct ProviderScan {
    credential: Option<Credential>,
    stores: Vec<StoreLocation>,
    candidate: Option<CanonicalItem>,
}

/// Turns a single scan event into one canonical item plus a ranked,
/// deduplicated competitor list, using whichever providers are configured.
///
/// Holds no state across calls; every resolution performs a full round of
/// network calls including credential acquisition.
pub struct Aggregator {
    providers: Vec<Box<dyn RetailProvider>>,
    deal_lookup_concurrency: usize,
}

impl Aggregator {
    /// Assemble an aggregator over an explicit provider list.
    ///
    /// Provider order is significant: it is the canonical-item precedence
    /// (first non-absent lookup wins) and the offer append order.
    pub fn new(providers: Vec<Box<dyn RetailProvider>>, deal_lookup_concurrency: usize) -> Self {
        Self {
            providers,
            deal_lookup_concurrency: deal_lookup_concurrency.max(1),
        }
    }

    /// Build providers from configuration, in fixed configuration order:
    /// Kroger first, GroceryServer second. A provider whose required
    /// secrets are absent is skipped silently; that is configuration, not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if a provider's HTTP client cannot be
    /// constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let mut providers: Vec<Box<dyn RetailProvider>> = Vec::new();

        if let (Some(id), Some(secret)) =
            (&config.kroger_client_id, &config.kroger_client_secret)
        {
            providers.push(Box::new(KrogerProvider::new(
                id,
                secret,
                config.request_timeout_secs,
                &config.user_agent,
            )?));
        }

        if let Some(publisher_id) = &config.groceryserver_publisher_id {
            providers.push(Box::new(GroceryServerProvider::new(
                publisher_id,
                config.groceryserver_api_key.as_deref(),
                config.request_timeout_secs,
                &config.user_agent,
            )?));
        }

        Ok(Self::new(providers, config.deal_lookup_concurrency))
    }

    /// Names of the configured providers, in precedence order.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Resolve a scanned identifier to a canonical item and its competing
    /// offers.
    ///
    /// Every provider is scanned concurrently (authenticate, locate stores,
    /// look the identifier up at the first store). The first provider in
    /// configuration order with a hit supplies the canonical item; every
    /// other provider's located stores are then queried store-by-store for
    /// competing offers. Offers matching the canonical store label are
    /// dropped and the rest sorted ascending by price, ties keeping append
    /// order.
    pub async fn resolve(
        &self,
        identifier: &str,
        origin: Coordinate,
        radius_miles: f64,
    ) -> ScanResolution {
        let mut scans = join_all(self.providers.iter().map(|provider| {
            Self::scan_provider(provider.as_ref(), identifier, origin, radius_miles)
        }))
        .await;

        // Positional precedence: configuration order, not a quality
        // judgement.
        let Some(winner) = scans.iter().position(|scan| scan.candidate.is_some()) else {
            tracing::info!(identifier, "no provider resolved the scanned identifier");
            return ScanResolution {
                item: None,
                deals: Vec::new(),
            };
        };
        let item = scans[winner]
            .candidate
            .take()
            .expect("winning scan holds a candidate");

        let mut deals = Vec::new();
        for (index, scan) in scans.iter().enumerate() {
            if index == winner {
                continue;
            }
            let Some(credential) = &scan.credential else {
                continue;
            };
            let provider = self.providers[index].as_ref();
            let offers = self
                .provider_deals(provider, identifier, &scan.stores, credential)
                .await;
            tracing::debug!(
                provider = provider.name(),
                stores = scan.stores.len(),
                offers = offers.len(),
                "collected competitor offers"
            );
            deals.extend(offers);
        }

        if let Some(home) = item.store.as_deref() {
            deals.retain(|offer| !offer.store.eq_ignore_ascii_case(home));
        }
        // Stable sort: price ties keep append order (provider order, then
        // store order).
        deals.sort_by(|a, b| a.price.total_cmp(&b.price));

        let item = evaluate(item, &deals);
        ScanResolution {
            item: Some(item),
            deals,
        }
    }

    /// Free-text search across every configured provider, concatenated in
    /// provider-configuration order. No dedup, no cap beyond each adapter's
    /// own bound.
    pub async fn search(
        &self,
        term: &str,
        origin: Coordinate,
        radius_miles: f64,
    ) -> Vec<CanonicalItem> {
        let results = join_all(self.providers.iter().map(|provider| async move {
            match provider.authenticate().await {
                Some(credential) => {
                    provider
                        .search_by_term(term, origin, radius_miles, &credential)
                        .await
                }
                None => Vec::new(),
            }
        }))
        .await;

        results.into_iter().flatten().collect()
    }

    /// One provider's contribution: authenticate, locate, and look up the
    /// identifier at the provider's first (nearest/default) store. A
    /// provider with no credential or no located store contributes no
    /// candidate and no offers.
    async fn scan_provider(
        provider: &dyn RetailProvider,
        identifier: &str,
        origin: Coordinate,
        radius_miles: f64,
    ) -> ProviderScan {
        let Some(credential) = provider.authenticate().await else {
            return ProviderScan {
                credential: None,
                stores: Vec::new(),
                candidate: None,
            };
        };

        let stores = provider.locate_stores(origin, radius_miles, &credential).await;
        if stores.is_empty() {
            tracing::debug!(
                provider = provider.name(),
                "no stores located; provider contributes nothing"
            );
            return ProviderScan {
                credential: Some(credential),
                stores,
                candidate: None,
            };
        }

        // The first located store doubles as the provider's nearest/default
        // choice.
        let candidate = provider
            .lookup_by_identifier(identifier, &stores[0], &credential)
            .await;

        ProviderScan {
            credential: Some(credential),
            stores,
            candidate,
        }
    }

    /// Per-store competitor lookups for one provider.
    ///
    /// `buffered` (not `buffer_unordered`) so results come back in store
    /// order regardless of the concurrency bound; the default bound of 1
    /// keeps the lookups strictly sequential.
    async fn provider_deals(
        &self,
        provider: &dyn RetailProvider,
        identifier: &str,
        stores: &[StoreLocation],
        credential: &Credential,
    ) -> Vec<Recommendation> {
        let lookups: Vec<Option<CanonicalItem>> = stream::iter(stores)
            .map(|store| provider.lookup_by_identifier(identifier, store, credential))
            .buffered(self.deal_lookup_concurrency)
            .collect()
            .await;

        stores
            .iter()
            .zip(lookups)
            .filter_map(|(store, item)| item.map(|item| to_recommendation(item, store)))
            .collect()
    }
}

/// Project a competitor item into an offer, falling back to the queried
/// store's name when the adapter left the label unset.
fn to_recommendation(item: CanonicalItem, store: &StoreLocation) -> Recommendation {
    Recommendation {
        identifier: item.identifier,
        name: item.name,
        price: item.price,
        store: item.store.unwrap_or_else(|| store.name.clone()),
        distance_miles: None,
    }
}
