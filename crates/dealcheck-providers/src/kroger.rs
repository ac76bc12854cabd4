//! Kroger catalog adapter (client-credentials OAuth).
//!
//! Wraps the Kroger public API: a token exchange scoped to product reads,
//! the store locator filtered by proximity, and the product catalog filtered
//! by term and store. All response shapes are normalized into the crate's
//! canonical model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use dealcheck_core::{CanonicalItem, Coordinate, StoreLocation};

use crate::error::ProviderError;
use crate::provider::{looks_organic, Credential, RetailProvider, SEARCH_RESULT_LIMIT};

const DEFAULT_BASE_URL: &str = "https://api.kroger.com/";
const TOKEN_SCOPE: &str = "product.compact";
/// How many stores a single locator call asks for.
const STORE_LIMIT: usize = 10;

/// Kroger OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Envelope for the `/v1/locations` endpoint.
#[derive(Debug, Deserialize)]
struct LocationsEnvelope {
    #[serde(default)]
    data: Vec<KrogerLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KrogerLocation {
    location_id: String,
    name: String,
    #[serde(default)]
    geolocation: Option<Geolocation>,
    #[serde(default)]
    address: Option<KrogerAddress>,
}

#[derive(Debug, Deserialize)]
struct Geolocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KrogerAddress {
    #[serde(default)]
    zip_code: Option<String>,
}

/// Envelope for the `/v1/products` endpoint.
#[derive(Debug, Deserialize)]
struct ProductsEnvelope {
    #[serde(default)]
    data: Vec<KrogerProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KrogerProduct {
    product_id: String,
    description: String,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    items: Vec<KrogerSku>,
    #[serde(default)]
    images: Vec<KrogerImage>,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct KrogerSku {
    #[serde(default)]
    price: Option<KrogerPrice>,
}

#[derive(Debug, Deserialize)]
struct KrogerPrice {
    #[serde(default)]
    promo: Option<f64>,
    #[serde(default)]
    regular: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct KrogerImage {
    #[serde(default)]
    perspective: Option<String>,
    #[serde(default)]
    sizes: Vec<KrogerImageSize>,
}

#[derive(Debug, Deserialize)]
struct KrogerImageSize {
    #[serde(default)]
    size: Option<String>,
    url: String,
}

/// Adapter for the Kroger catalog API.
///
/// Use [`KrogerProvider::new`] for production or
/// [`KrogerProvider::with_base_url`] to point at a mock server in tests.
pub struct KrogerProvider {
    client: Client,
    base_url: Url,
    client_id: String,
    client_secret: String,
}

impl KrogerProvider {
    /// Creates an adapter pointed at the production Kroger API.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        client_id: &str,
        client_secret: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(client_id, client_secret, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates an adapter with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be
    /// constructed, or [`ProviderError::InvalidBaseUrl`] if `base_url` does
    /// not parse.
    pub fn with_base_url(
        client_id: &str,
        client_secret: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Normalise: exactly one trailing slash so Url::join keeps the full
        // path instead of replacing the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ProviderError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
        })
    }

    /// Exchanges client credentials for a product-read bearer token.
    async fn fetch_token(&self) -> Result<String, ProviderError> {
        let url = self.endpoint("v1/connect/oauth2/token");
        let response = self
            .client
            .post(url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", TOKEN_SCOPE)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Auth(format!(
                "token exchange failed with status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Auth(format!("token parse error: {e}")))?;

        Ok(token.access_token)
    }

    async fn try_locate_stores(
        &self,
        origin: Coordinate,
        radius_miles: f64,
        token: &str,
    ) -> Result<Vec<StoreLocation>, ProviderError> {
        let url = self.endpoint("v1/locations");
        let body = self
            .request_json(
                url,
                token,
                &[
                    ("filter.lat.near", origin.latitude.to_string()),
                    ("filter.lon.near", origin.longitude.to_string()),
                    ("filter.radiusInMiles", radius_miles.to_string()),
                    ("filter.limit", STORE_LIMIT.to_string()),
                ],
            )
            .await?;

        let envelope: LocationsEnvelope =
            serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
                context: "locations".to_string(),
                source: e,
            })?;

        Ok(envelope
            .data
            .into_iter()
            .filter_map(store_from_location)
            .collect())
    }

    async fn try_products(
        &self,
        term: &str,
        location_id: Option<&str>,
        limit: usize,
        token: &str,
    ) -> Result<Vec<KrogerProduct>, ProviderError> {
        let url = self.endpoint("v1/products");
        let mut params = vec![
            ("filter.term", term.to_string()),
            ("filter.limit", limit.to_string()),
        ];
        if let Some(id) = location_id {
            params.push(("filter.locationId", id.to_string()));
        }

        let body = self.request_json(url, token, &params).await?;
        let envelope: ProductsEnvelope =
            serde_json::from_value(body).map_err(|e| ProviderError::Deserialize {
                context: format!("products(term={term})"),
                source: e,
            })?;

        Ok(envelope.data)
    }

    /// Sends a bearer-authorized GET, asserts a 2xx status, and parses the
    /// body as JSON.
    async fn request_json(
        &self,
        url: Url,
        token: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .expect("static path joins onto a valid base URL")
    }
}

#[async_trait]
impl RetailProvider for KrogerProvider {
    fn name(&self) -> &'static str {
        "kroger"
    }

    async fn authenticate(&self) -> Option<Credential> {
        match self.fetch_token().await {
            Ok(token) => Some(Credential::Bearer(token)),
            Err(error) => {
                tracing::warn!(provider = self.name(), error = %error, "token exchange failed");
                None
            }
        }
    }

    async fn locate_stores(
        &self,
        origin: Coordinate,
        radius_miles: f64,
        credential: &Credential,
    ) -> Vec<StoreLocation> {
        let Some(token) = credential.bearer() else {
            tracing::warn!(provider = self.name(), "expected a bearer credential");
            return Vec::new();
        };
        match self.try_locate_stores(origin, radius_miles, token).await {
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
        credential: &Credential,
    ) -> Option<CanonicalItem> {
        let Some(token) = credential.bearer() else {
            tracing::warn!(provider = self.name(), "expected a bearer credential");
            return None;
        };
        match self
            .try_products(identifier, Some(&store.location_id), 1, token)
            .await
        {
            Ok(products) => products
                .into_iter()
                .next()
                .map(|product| item_from_product(product, Some(store))),
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
        credential: &Credential,
    ) -> Vec<CanonicalItem> {
        let Some(token) = credential.bearer() else {
            tracing::warn!(provider = self.name(), "expected a bearer credential");
            return Vec::new();
        };

        // Store context is best-effort enrichment; a locator failure only
        // drops the store filter, not the search itself.
        let stores = match self.try_locate_stores(origin, radius_miles, token).await {
            Ok(stores) => stores,
            Err(error) => {
                tracing::warn!(provider = self.name(), error = %error, "store lookup failed");
                Vec::new()
            }
        };
        let context = stores.first();

        match self
            .try_products(
                term,
                context.map(|store| store.location_id.as_str()),
                SEARCH_RESULT_LIMIT,
                token,
            )
            .await
        {
            Ok(products) => products
                .into_iter()
                .take(SEARCH_RESULT_LIMIT)
                .map(|product| item_from_product(product, context))
                .collect(),
            Err(error) => {
                tracing::warn!(provider = self.name(), term, error = %error, "search failed");
                Vec::new()
            }
        }
    }
}

fn store_from_location(location: KrogerLocation) -> Option<StoreLocation> {
    let geo = location.geolocation?;
    Some(StoreLocation {
        location_id: location.location_id,
        name: location.name,
        coordinate: Coordinate {
            latitude: geo.latitude,
            longitude: geo.longitude,
        },
        postal_code: location.address.and_then(|address| address.zip_code),
    })
}

fn item_from_product(product: KrogerProduct, store: Option<&StoreLocation>) -> CanonicalItem {
    let organic = looks_organic(
        std::iter::once(product.description.as_str())
            .chain(product.categories.iter().map(String::as_str)),
    );

    CanonicalItem {
        identifier: product.product_id,
        name: product.description,
        brand: product.brand,
        price: resolve_price(&product.items),
        image_url: front_image_url(&product.images),
        store: store.map(|s| s.name.clone()),
        coordinate: store.map(|s| s.coordinate),
        organic: Some(organic),
        verdict: None,
        recommendations: Vec::new(),
    }
}

/// Price priority: `promo` when present and positive (the API reports `0`
/// for "no active promotion"), then `regular`, else `0.0`.
fn resolve_price(skus: &[KrogerSku]) -> f64 {
    skus.iter()
        .filter_map(|sku| sku.price.as_ref())
        .find_map(|price| price.promo.filter(|promo| *promo > 0.0).or(price.regular))
        .unwrap_or(0.0)
}

/// Front-perspective medium image preferred; falls back to whatever the
/// record carries first.
fn front_image_url(images: &[KrogerImage]) -> Option<String> {
    let image = images
        .iter()
        .find(|image| image.perspective.as_deref() == Some("front"))
        .or_else(|| images.first())?;
    image
        .sizes
        .iter()
        .find(|size| size.size.as_deref() == Some("medium"))
        .or_else(|| image.sizes.first())
        .map(|size| size.url.clone())
}
