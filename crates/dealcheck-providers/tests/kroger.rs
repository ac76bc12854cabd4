//! Integration tests for `KrogerProvider` using wiremock HTTP mocks.

use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dealcheck_core::{Coordinate, StoreLocation};
use dealcheck_providers::{Credential, KrogerProvider, RetailProvider};

fn test_provider(base_url: &str) -> KrogerProvider {
    KrogerProvider::with_base_url("client-id", "client-secret", 30, "dealcheck-test/0.1", base_url)
        .expect("provider construction should not fail")
}

fn origin() -> Coordinate {
    Coordinate {
        latitude: 35.2271,
        longitude: -80.8431,
    }
}

fn reference_store() -> StoreLocation {
    StoreLocation {
        location_id: "01400943".to_string(),
        name: "Kroger - Main St".to_string(),
        coordinate: origin(),
        postal_code: Some("28202".to_string()),
    }
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/connect/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("scope=product.compact"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": token, "expires_in": 1800 })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn authenticate_exchanges_client_credentials_for_bearer() {
    let server = MockServer::start().await;
    mount_token(&server, "tok-1").await;

    let provider = test_provider(&server.uri());
    let credential = provider.authenticate().await.expect("token expected");

    assert_eq!(credential.bearer(), Some("tok-1"));
}

#[tokio::test]
async fn authenticate_returns_none_when_exchange_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/connect/oauth2/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    assert!(provider.authenticate().await.is_none());
}

#[tokio::test]
async fn locate_stores_parses_payload_and_preserves_order() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "data": [
            {
                "locationId": "01400943",
                "name": "Kroger - Main St",
                "geolocation": { "latitude": 35.2271, "longitude": -80.8431 },
                "address": { "zipCode": "28202" }
            },
            {
                "locationId": "01400501",
                "name": "Kroger - South Blvd",
                "geolocation": { "latitude": 35.1821, "longitude": -80.8790 }
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v1/locations"))
        .and(header("authorization", "Bearer tok-1"))
        .and(query_param("filter.lat.near", "35.2271"))
        .and(query_param("filter.lon.near", "-80.8431"))
        .and(query_param("filter.radiusInMiles", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let credential = Credential::Bearer("tok-1".to_string());
    let stores = provider.locate_stores(origin(), 10.0, &credential).await;

    assert_eq!(stores.len(), 2);
    assert_eq!(stores[0].location_id, "01400943");
    assert_eq!(stores[0].name, "Kroger - Main St");
    assert_eq!(stores[0].postal_code.as_deref(), Some("28202"));
    assert_eq!(stores[1].location_id, "01400501");
    assert!(stores[1].postal_code.is_none());
}

#[tokio::test]
async fn locate_stores_is_empty_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/locations"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let credential = Credential::Bearer("tok-1".to_string());
    let stores = provider.locate_stores(origin(), 10.0, &credential).await;

    assert!(stores.is_empty());
}

#[tokio::test]
async fn lookup_resolves_price_from_regular_when_promo_is_null() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "data": [
            {
                "productId": "0001111041700",
                "description": "Kroger 2% Reduced Fat Milk",
                "brand": "Kroger",
                "items": [ { "price": { "promo": null, "regular": 3.29 } } ],
                "images": [
                    {
                        "perspective": "front",
                        "sizes": [ { "size": "medium", "url": "https://img/milk-front-medium" } ]
                    }
                ],
                "categories": [ "Dairy" ]
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(header("authorization", "Bearer tok-1"))
        .and(query_param("filter.term", "0001111041700"))
        .and(query_param("filter.locationId", "01400943"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let credential = Credential::Bearer("tok-1".to_string());
    let item = provider
        .lookup_by_identifier("0001111041700", &reference_store(), &credential)
        .await
        .expect("product should resolve");

    assert_eq!(item.identifier, "0001111041700");
    assert_eq!(item.name, "Kroger 2% Reduced Fat Milk");
    assert_eq!(item.brand.as_deref(), Some("Kroger"));
    assert_eq!(item.price, 3.29);
    assert_eq!(item.image_url.as_deref(), Some("https://img/milk-front-medium"));
    assert_eq!(item.store.as_deref(), Some("Kroger - Main St"));
    assert_eq!(item.organic, Some(false));
    assert!(item.verdict.is_none());
}

#[tokio::test]
async fn lookup_flags_organic_from_category_tags() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "data": [
            {
                "productId": "0007833541119",
                "description": "Simple Truth Gala Apples",
                "items": [ { "price": { "promo": 0, "regular": 4.99 } } ],
                "categories": [ "Natural & Organic" ]
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let credential = Credential::Bearer("tok-1".to_string());
    let item = provider
        .lookup_by_identifier("0007833541119", &reference_store(), &credential)
        .await
        .expect("product should resolve");

    assert_eq!(item.organic, Some(true));
    // promo 0 means no active promotion; regular wins.
    assert_eq!(item.price, 4.99);
}

#[tokio::test]
async fn lookup_is_none_when_product_is_not_carried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let credential = Credential::Bearer("tok-1".to_string());
    let item = provider
        .lookup_by_identifier("0000000000000", &reference_store(), &credential)
        .await;

    assert!(item.is_none());
}

#[tokio::test]
async fn lookup_is_none_on_malformed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let credential = Credential::Bearer("tok-1".to_string());
    let item = provider
        .lookup_by_identifier("0001111041700", &reference_store(), &credential)
        .await;

    assert!(item.is_none());
}

#[tokio::test]
async fn search_enriches_results_with_the_first_located_store() {
    let server = MockServer::start().await;

    let locations = serde_json::json!({
        "data": [
            {
                "locationId": "01400943",
                "name": "Kroger - Main St",
                "geolocation": { "latitude": 35.2271, "longitude": -80.8431 }
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/v1/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&locations))
        .mount(&server)
        .await;

    let products = serde_json::json!({
        "data": [
            {
                "productId": "0001111041700",
                "description": "Kroger 2% Reduced Fat Milk",
                "items": [ { "price": { "regular": 3.29 } } ]
            },
            {
                "productId": "0001111041701",
                "description": "Kroger Whole Milk",
                "items": [ { "price": { "regular": 3.49 } } ]
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(query_param("filter.term", "milk"))
        .and(query_param("filter.limit", "20"))
        .and(query_param("filter.locationId", "01400943"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&products))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let credential = Credential::Bearer("tok-1".to_string());
    let items = provider.search_by_term("milk", origin(), 10.0, &credential).await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].store.as_deref(), Some("Kroger - Main St"));
    assert_eq!(items[1].store.as_deref(), Some("Kroger - Main St"));
}

#[tokio::test]
async fn search_proceeds_without_store_context_when_locator_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/locations"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let products = serde_json::json!({
        "data": [
            {
                "productId": "0001111041700",
                "description": "Kroger 2% Reduced Fat Milk",
                "items": [ { "price": { "regular": 3.29 } } ]
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(query_param("filter.term", "milk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&products))
        .mount(&server)
        .await;

    let provider = test_provider(&server.uri());
    let credential = Credential::Bearer("tok-1".to_string());
    let items = provider.search_by_term("milk", origin(), 10.0, &credential).await;

    assert_eq!(items.len(), 1);
    assert!(items[0].store.is_none());
}
