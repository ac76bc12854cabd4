//! GroceryServer deals adapter (affiliate publisher key).
//!
//! No token exchange: the publisher id rides as a `publisherId` query
//! parameter on every call, and an optional secondary key is attached as an
//! `X-Api-Key` header when configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use dealcheck_core::{CanonicalItem, Coordinate, StoreLocation};

use crate::error::ProviderError;
use crate::provider::{looks_organic, Credential, RetailProvider, SEARCH_RESULT_LIMIT};

const DEFAULT_BASE_URL: &str = "https://api.groceryserver.com/";
const API_KEY_HEADER: &str = "X-Api-Key";

/// Envelope for the `/v1/stores` endpoint.
#[derive(Debug, Deserialize)]
struct StoresEnvelope {
    #[serde(default)]
    stores: Vec<GroceryStore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroceryStore {
    store_id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    postal_code: Option<String>,
}

/// Envelope shared by the product lookup and search endpoints.
#[derive(Debug, Deserialize)]
struct ProductsEnvelope {
    #[serde(default)]
    products: Vec<GroceryProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroceryProduct {
    product_id: String,
    name: String,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    sale_price: Option<f64>,
    #[serde(default)]
    list_price: Option<f64>,
    #[serde(default)]
    msrp: Option<f64>,
    #[serde(default)]
    image_url: Option<String>,
}

/// Adapter for the GroceryServer affiliate API.
///
/// Use [`GroceryServerProvider::new`] for production or
/// [`GroceryServerProvider::with_base_url`] to point at a mock server in
/// tests.
pub struct GroceryServerProvider {
    client: Client,
    base_url: Url,
    publisher_id: String,
    api_key: Option<String>,
}

impl GroceryServerProvider {
    /// Creates an adapter pointed at the production GroceryServer API.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        publisher_id: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(publisher_id, api_key, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates an adapter with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be
    /// constructed, or [`ProviderError::InvalidBaseUrl`] if `base_url` does
    /// not parse.
    pub fn with_base_url(
        publisher_id: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ProviderError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            publisher_id: publisher_id.to_owned(),
            api_key: api_key.map(str::to_owned),
        })
    }

    async fn try_locate_stores(
        &self,
        origin: Coordinate,
        radius_miles: f64,
    ) -> Result<Vec<StoreLocation>, ProviderError> {
        let url = self.build_url(
            "v1/stores",
            &[
                ("latitude", &origin.latitude.to_string()),
                ("longitude", &origin.longitude.to_string()),
                ("radius", &radius_miles.to_string()),
            ],
        );
        let body = self.request_json(url).await?;

        let envelope: StoresEnvelope =
            serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
                context: "stores".to_string(),
                source: e,
            })?;

        Ok(envelope.stores.into_iter().map(store_from_record).collect())
    }

    async fn try_lookup(
        &self,
        identifier: &str,
        store: &StoreLocation,
    ) -> Result<Option<CanonicalItem>, ProviderError> {
        let url = self.build_url(
            &format!("v1/products/{identifier}"),
            &[("storeId", store.location_id.as_str())],
        );
        let body = self.request_json(url).await?;

        let envelope: ProductsEnvelope =
            serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
                context: format!("products({identifier})"),
                source: e,
            })?;

        Ok(envelope
            .products
            .into_iter()
            .next()
            .map(|product| item_from_product(product, Some(store))))
    }

    async fn try_search(
        &self,
        term: &str,
        origin: Coordinate,
        radius_miles: f64,
    ) -> Result<Vec<CanonicalItem>, ProviderError> {
        // Store context is best-effort enrichment; a locator failure only
        // drops the enrichment, not the search itself.
        let stores = match self.try_locate_stores(origin, radius_miles).await {
            Ok(stores) => stores,
            Err(error) => {
                tracing::warn!(provider = self.name(), error = %error, "store lookup failed");
                Vec::new()
            }
        };
        let context = stores.first();

        let url = self.build_url(
            "v1/products/search",
            &[
                ("q", term),
                ("latitude", &origin.latitude.to_string()),
                ("longitude", &origin.longitude.to_string()),
                ("radius", &radius_miles.to_string()),
                ("limit", &SEARCH_RESULT_LIMIT.to_string()),
            ],
        );
        let body = self.request_json(url).await?;

        let envelope: ProductsEnvelope =
            serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
                context: format!("search({term})"),
                source: e,
            })?;

        Ok(envelope
            .products
            .into_iter()
            .take(SEARCH_RESULT_LIMIT)
            .map(|product| item_from_product(product, context))
            .collect())
    }

    /// Builds the full request URL with the publisher id and properly
    /// percent-encoded query parameters.
    fn build_url(&self, path: &str, extra: &[(&str, &str)]) -> Url {
        let mut url = self
            .base_url
            .join(path)
            .expect("static path joins onto a valid base URL");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("publisherId", &self.publisher_id);
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    /// Sends a GET with the optional key header, asserts a 2xx status, and
    /// parses the body as JSON.
    async fn request_json(&self, url: Url) -> Result<serde_json::Value, ProviderError> {
        let mut request = self.client.get(url.clone());
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let response = request.send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl RetailProvider for GroceryServerProvider {
    fn name(&self) -> &'static str {
        "groceryserver"
    }

    async fn authenticate(&self) -> Option<Credential> {
        // No exchange step: the publisher identity is the credential.
        Some(Credential::Publisher {
            id: self.publisher_id.clone(),
            key: self.api_key.clone(),
        })
    }

    async fn locate_stores(
        &self,
        origin: Coordinate,
        radius_miles: f64,
        _credential: &Credential,
    ) -> Vec<StoreLocation> {
        match self.try_locate_stores(origin, radius_miles).await {
            Ok(stores) => stores,
            Err(error) => {
                tracing::warn!(provider = self.name(), error = %error, "store lookup failed");
                Vec::new()
            }
        }
    }

    async fn lookup_by_identifier(
        &self,
        identifier: &str,
        store: &StoreLocation,
        _credential: &Credential,
    ) -> Option<CanonicalItem> {
        match self.try_lookup(identifier, store).await {
            Ok(item) => item,
            Err(error) => {
                tracing::warn!(
                    provider = self.name(),
                    identifier,
                    error = %error,
                    "product lookup failed"
                );
                None
            }
        }
    }

    async fn search_by_term(
        &self,
        term: &str,
        origin: Coordinate,
        radius_miles: f64,
        _credential: &Credential,
    ) -> Vec<CanonicalItem> {
        match self.try_search(term, origin, radius_miles).await {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!(provider = self.name(), term, error = %error, "search failed");
                Vec::new()
            }
        }
    }
}

fn store_from_record(store: GroceryStore) -> StoreLocation {
    StoreLocation {
        location_id: store.store_id,
        name: store.name,
        coordinate: Coordinate {
            latitude: store.latitude,
            longitude: store.longitude,
        },
        postal_code: store.postal_code,
    }
}

fn item_from_product(product: GroceryProduct, store: Option<&StoreLocation>) -> CanonicalItem {
    let organic = looks_organic(
        std::iter::once(product.name.as_str()).chain(product.description.as_deref()),
    );
    let price = resolve_price(&product);

    CanonicalItem {
        identifier: product.product_id,
        name: product.name,
        brand: product.brand,
        price,
        image_url: product.image_url,
        store: store.map(|s| s.name.clone()),
        coordinate: store.map(|s| s.coordinate),
        organic: Some(organic),
        verdict: None,
        recommendations: Vec::new(),
    }
}

/// Price priority: `salePrice`, then `listPrice`, then `msrp`. The first
/// present numeric value wins, else `0.0`.
fn resolve_price(product: &GroceryProduct) -> f64 {
    product
        .sale_price
        .or(product.list_price)
        .or(product.msrp)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(
        sale_price: Option<f64>,
        list_price: Option<f64>,
        msrp: Option<f64>,
    ) -> GroceryProduct {
        GroceryProduct {
            product_id: "gs-100".to_string(),
            name: "Large Eggs".to_string(),
            brand: None,
            description: None,
            sale_price,
            list_price,
            msrp,
            image_url: None,
        }
    }

    #[test]
    fn resolve_price_prefers_sale_price() {
        assert_eq!(resolve_price(&product(Some(2.49), Some(2.99), Some(3.49))), 2.49);
    }

    #[test]
    fn resolve_price_falls_through_to_list_then_msrp() {
        assert_eq!(resolve_price(&product(None, Some(2.99), Some(3.49))), 2.99);
        assert_eq!(resolve_price(&product(None, None, Some(3.49))), 3.49);
    }

    #[test]
    fn resolve_price_defaults_to_zero() {
        assert_eq!(resolve_price(&product(None, None, None)), 0.0);
    }

    #[test]
    fn item_carries_store_context_when_present() {
        let store = StoreLocation {
            location_id: "s-9".to_string(),
            name: "Harris Teeter".to_string(),
            coordinate: Coordinate {
                latitude: 35.2,
                longitude: -80.8,
            },
            postal_code: None,
        };
        let item = item_from_product(product(Some(2.49), None, None), Some(&store));
        assert_eq!(item.store.as_deref(), Some("Harris Teeter"));
        assert!(item.coordinate.is_some());

        let bare = item_from_product(product(Some(2.49), None, None), None);
        assert!(bare.store.is_none());
    }

    #[test]
    fn organic_detected_from_description() {
        let mut p = product(Some(2.49), None, None);
        p.description = Some("Cage-free organic eggs".to_string());
        let item = item_from_product(p, None);
        assert_eq!(item.organic, Some(true));
    }
}
