//! WooCommerce REST API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::types::{Page, WooOrder, WooProduct};
use crate::config::WooCommerceSettings;
use crate::domain::WooCommerceStore;

const BODY_SNIPPET_LEN: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum WooClientError {
    #[error("Store rejected the API credentials")]
    Unauthorized,

    #[error("Resource not found on store")]
    NotFound,

    #[error("Store rate limit hit")]
    RateLimited,

    #[error("Store returned HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for WooClientError {
    fn from(err: reqwest::Error) -> Self {
        WooClientError::Transport(err.to_string())
    }
}

/// Operations used against a single store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WooCommerceApi: Send + Sync {
    /// Orders sorted by modification time, oldest first.
    async fn fetch_orders(
        &self,
        page: u32,
        per_page: u32,
        modified_after: Option<DateTime<Utc>>,
    ) -> Result<Page<WooOrder>, WooClientError>;

    async fn fetch_order(&self, id: i64) -> Result<WooOrder, WooClientError>;

    async fn fetch_products(&self, page: u32, per_page: u32)
        -> Result<Page<WooProduct>, WooClientError>;

    async fn update_order_status(&self, id: i64, status: &str) -> Result<(), WooClientError>;
}

/// Builds an API client for a store's URL and credentials.
#[cfg_attr(test, mockall::automock)]
pub trait WooClientFactory: Send + Sync {
    fn for_store(&self, store: &WooCommerceStore) -> Arc<dyn WooCommerceApi>;
}

/// reqwest-backed [`WooCommerceApi`].
#[derive(Clone)]
pub struct WooCommerceClient {
    http: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
}

impl WooCommerceClient {
    pub fn new(http: Client, store: &WooCommerceStore) -> Self {
        Self {
            http,
            base_url: store.api_base(),
            consumer_key: store.consumer_key.clone(),
            consumer_secret: store.consumer_secret.clone(),
        }
    }

    /// Shared HTTP client with the configured timeout and user agent.
    pub fn build_http(settings: &WooCommerceSettings) -> Result<Client, WooClientError> {
        Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .gzip(true)
            .build()
            .map_err(WooClientError::from)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.consumer_key, Some(&self.consumer_secret))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, WooClientError> {
        let response = self.request(builder).send().await?;
        check_status(response).await
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Page<T>, WooClientError> {
        let response = self.send(self.http.get(self.url(path)).query(query)).await?;

        let total = header_number(&response, "x-wp-total");
        let total_pages = header_number(&response, "x-wp-totalpages");
        let items: Vec<T> = decode(response).await?;

        Ok(Page {
            total: total.unwrap_or(items.len() as u64),
            total_pages: total_pages.unwrap_or(1).min(u32::MAX as u64) as u32,
            items,
        })
    }
}

#[async_trait]
impl WooCommerceApi for WooCommerceClient {
    #[tracing::instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_orders(
        &self,
        page: u32,
        per_page: u32,
        modified_after: Option<DateTime<Utc>>,
    ) -> Result<Page<WooOrder>, WooClientError> {
        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
            ("orderby", "modified".to_string()),
            ("order", "asc".to_string()),
        ];
        if let Some(after) = modified_after {
            query.push((
                "modified_after",
                after.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        self.fetch_page("orders", &query).await
    }

    async fn fetch_order(&self, id: i64) -> Result<WooOrder, WooClientError> {
        let response = self.send(self.http.get(self.url(&format!("orders/{}", id)))).await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_products(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Page<WooProduct>, WooClientError> {
        let query = [
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        self.fetch_page("products", &query).await
    }

    async fn update_order_status(&self, id: i64, status: &str) -> Result<(), WooClientError> {
        self.send(
            self.http
                .put(self.url(&format!("orders/{}", id)))
                .json(&json!({ "status": status })),
        )
        .await?;
        Ok(())
    }
}

/// [`WooClientFactory`] sharing one connection pool across stores.
#[derive(Clone)]
pub struct HttpWooClientFactory {
    http: Client,
}

impl HttpWooClientFactory {
    pub fn new(settings: &WooCommerceSettings) -> Result<Self, WooClientError> {
        Ok(Self {
            http: WooCommerceClient::build_http(settings)?,
        })
    }
}

impl WooClientFactory for HttpWooClientFactory {
    fn for_store(&self, store: &WooCommerceStore) -> Arc<dyn WooCommerceApi> {
        Arc::new(WooCommerceClient::new(self.http.clone(), store))
    }
}

async fn check_status(response: Response) -> Result<Response, WooClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(WooClientError::Unauthorized),
        StatusCode::NOT_FOUND => Err(WooClientError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => Err(WooClientError::RateLimited),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
            Err(WooClientError::Status(status.as_u16(), snippet))
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, WooClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| WooClientError::Decode(e.to_string()))
}

fn header_number(response: &Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::{
        extract::{Path, Query},
        http::{header::AUTHORIZATION, HeaderMap, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use base64::Engine;
    use serde_json::Value;
    use uuid::Uuid;

    const KEY: &str = "ck_test";
    const SECRET: &str = "cs_test";

    fn authorized(headers: &HeaderMap) -> bool {
        let expected = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", KEY, SECRET))
        );
        headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(expected.as_str())
    }

    async fn orders(
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        assert_eq!(query.get("orderby").map(String::as_str), Some("modified"));
        assert_eq!(query.get("order").map(String::as_str), Some("asc"));
        assert_eq!(query.get("per_page").map(String::as_str), Some("2"));

        let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
        let body = json!([
            { "id": page * 10 + 1, "status": "processing", "total": "10.00" },
            { "id": page * 10 + 2, "status": "completed", "total": "20.00" }
        ]);
        (
            [("x-wp-total", "3"), ("x-wp-totalpages", "2")],
            Json(body),
        )
            .into_response()
    }

    async fn order(Path(id): Path<i64>) -> axum::response::Response {
        match id {
            404 => AxumStatus::NOT_FOUND.into_response(),
            429 => AxumStatus::TOO_MANY_REQUESTS.into_response(),
            500 => (AxumStatus::INTERNAL_SERVER_ERROR, "database exploded").into_response(),
            777 => "not json".into_response(),
            _ => Json(json!({ "id": id, "number": "A-1" })).into_response(),
        }
    }

    async fn update(Path(id): Path<i64>, Json(body): Json<Value>) -> axum::response::Response {
        assert_eq!(body["status"], "completed");
        Json(json!({ "id": id, "status": "completed" })).into_response()
    }

    async fn spawn_store() -> String {
        let app = Router::new()
            .route("/wp-json/wc/v3/orders", get(orders))
            .route("/wp-json/wc/v3/orders/{id}", get(order).put(update));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(store_url: &str, key: &str) -> WooCommerceClient {
        let now = Utc::now();
        let store = WooCommerceStore {
            id: Uuid::now_v7(),
            company_id: Uuid::now_v7(),
            name: "Test".into(),
            store_url: store_url.into(),
            consumer_key: key.into(),
            consumer_secret: SECRET.into(),
            webhook_secret: "w".into(),
            is_active: true,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        let settings = WooCommerceSettings {
            request_timeout_secs: 5,
            per_page: 2,
            max_pages: 5,
            user_agent: "parcel-hub/test".into(),
        };
        WooCommerceClient::new(WooCommerceClient::build_http(&settings).unwrap(), &store)
    }

    #[tokio::test]
    async fn reads_pages_and_headers() {
        let url = spawn_store().await;
        let page = client(&url, KEY).fetch_orders(2, 2, None).await.unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.iter().map(|o| o.id).collect::<Vec<_>>(), vec![21, 22]);
    }

    #[tokio::test]
    async fn wrong_credentials_are_unauthorized() {
        let url = spawn_store().await;
        let err = client(&url, "ck_wrong").fetch_orders(1, 2, None).await.unwrap_err();
        assert!(matches!(err, WooClientError::Unauthorized));
    }

    #[tokio::test]
    async fn maps_error_statuses() {
        let url = spawn_store().await;
        let c = client(&url, KEY);

        assert!(matches!(c.fetch_order(404).await, Err(WooClientError::NotFound)));
        assert!(matches!(c.fetch_order(429).await, Err(WooClientError::RateLimited)));
        match c.fetch_order(500).await {
            Err(WooClientError::Status(500, body)) => assert_eq!(body, "database exploded"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(c.fetch_order(777).await, Err(WooClientError::Decode(_))));
        assert_eq!(c.fetch_order(5).await.unwrap().number, "A-1");
    }

    #[tokio::test]
    async fn pushes_status() {
        let url = spawn_store().await;
        client(&url, KEY).update_order_status(9, "completed").await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_store_is_transport_error() {
        let err = client("http://127.0.0.1:1", KEY).fetch_order(1).await.unwrap_err();
        assert!(matches!(err, WooClientError::Transport(_)));
    }
}
