//! REST client for the storefront API.
//!
//! Uses `reqwest` with an explicit per-request timeout. Catalog reads are
//! cached with `moka` (5-minute TTL); user-scoped calls are never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use dowslakers_core::{Category, Email, OrderId, Product, ProductId, SewingStyle, SewingStyleId};

use super::cache::{CacheKey, CacheValue};
use super::types::{NewSubscriber, NewWishlistEntry};
use super::{
    AccessToken, AuthProvider, AuthSession, BackendError, Credentials, NewOrder, NewOrderItem,
    NewSewingDetail, NewsletterStore, Order, OrderStore, ProductCatalog, ProductFilter,
    Registration, SewingOrderDetail, User, WishlistEntry, WishlistStore,
};
use crate::config::ApiConfig;

const CATALOG_TTL: Duration = Duration::from_secs(300);
const CATALOG_CAPACITY: u64 = 1_000;

/// Postgres `unique_violation`, surfaced verbatim by the API.
const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Errors building an [`ApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API key is not a valid header value")]
    InvalidApiKey,

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),

    #[error("API URL cannot carry a path: {0}")]
    InvalidBaseUrl(Url),
}

/// Client for the storefront REST API.
///
/// Cheap to clone; clones share the connection pool and catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Error body shape used by the API: `{ "code": "...", "message": "..." }`
/// or `{ "error": "..." }`.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key cannot be sent as a header, the base
    /// URL cannot be extended with path segments, or the HTTP client fails to
    /// build.
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        if config.base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(config.base_url.clone()));
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key.expose_secret())
                .map_err(|_| ClientError::InvalidApiKey)?;
            value.set_sensitive(true);
            headers.insert("apikey", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CATALOG_CAPACITY)
            .time_to_live(CATALOG_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// Base URL all endpoints are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        // Checked in `new`: the base URL always has a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and decode a JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.execute_raw(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body, 500),
                "Failed to parse storefront API response"
            );
            BackendError::Transient(format!("invalid response body: {e}"))
        })
    }

    /// Send a request and return the raw body of a successful response.
    async fn execute_raw(&self, request: reqwest::RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            tracing::warn!(retry_after, "Storefront API rate limited");
            return Err(BackendError::Transient(format!(
                "rate limited, retry after {retry_after} seconds"
            )));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let error = classify(status, &body);
            if matches!(error, BackendError::Transient(_)) {
                tracing::error!(
                    status = %status,
                    body = %truncate(&body, 500),
                    "Storefront API returned server error"
                );
            } else {
                debug!(status = %status, error = %error, "Storefront API rejected request");
            }
            return Err(error);
        }

        Ok(body)
    }

    async fn cached<T, F>(
        &self,
        key: CacheKey,
        unpack: impl Fn(CacheValue) -> Option<T>,
        pack: impl FnOnce(T) -> CacheValue,
        fetch: F,
    ) -> Result<T, BackendError>
    where
        T: Clone,
        F: Future<Output = Result<T, BackendError>>,
    {
        if let Some(value) = self.inner.cache.get(&key).await.and_then(&unpack) {
            debug!(?key, "Catalog cache hit");
            return Ok(value);
        }
        let value = fetch.await?;
        self.inner.cache.insert(key, pack(value.clone())).await;
        Ok(value)
    }
}

/// Map a non-success response onto the error taxonomy.
///
/// Duplicates are recognised by the Postgres unique-violation code, a
/// message mentioning "duplicate", or `409 Conflict`.
fn classify(status: StatusCode, body: &str) -> BackendError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code.as_ref().map(|code| match code {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    let message = parsed
        .message
        .or(parsed.error)
        .unwrap_or_else(|| truncate(body, 200));

    let is_duplicate = code.as_deref() == Some(UNIQUE_VIOLATION_CODE)
        || message.to_lowercase().contains("duplicate")
        || status == StatusCode::CONFLICT;
    if is_duplicate {
        return BackendError::Duplicate(message);
    }

    match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
        s if s.is_server_error() || s == StatusCode::REQUEST_TIMEOUT => {
            BackendError::Transient(format!("HTTP {s}: {message}"))
        }
        s => BackendError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

// =============================================================================
// Catalog
// =============================================================================

impl ProductCatalog for ApiClient {
    #[instrument(skip(self), fields(category = ?filter.category, search = ?filter.search))]
    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError> {
        let products = self
            .cached(
                CacheKey::Products(filter.clone()),
                |value| match value {
                    CacheValue::Products(list) => Some(list),
                    _ => None,
                },
                CacheValue::Products,
                async {
                    let mut url = self.endpoint(&["products"]);
                    {
                        let mut query = url.query_pairs_mut();
                        if let Some(category) = &filter.category {
                            query.append_pair("category", category);
                        }
                        if let Some(search) = &filter.search {
                            query.append_pair("search", search);
                        }
                    }
                    if url.query() == Some("") {
                        url.set_query(None);
                    }
                    let list: Vec<Product> = self.execute(self.inner.client.get(url)).await?;
                    Ok(Arc::new(list))
                },
            )
            .await?;
        Ok(products.as_ref().clone())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: ProductId) -> Result<Product, BackendError> {
        let product = self
            .cached(
                CacheKey::Product(id),
                |value| match value {
                    CacheValue::Product(product) => Some(product),
                    _ => None,
                },
                CacheValue::Product,
                async {
                    let url = self.endpoint(&["products", &id.to_string()]);
                    let product: Product = self.execute(self.inner.client.get(url)).await?;
                    Ok(Box::new(product))
                },
            )
            .await?;
        Ok(*product)
    }

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<Category>, BackendError> {
        let categories = self
            .cached(
                CacheKey::Categories,
                |value| match value {
                    CacheValue::Categories(list) => Some(list),
                    _ => None,
                },
                CacheValue::Categories,
                async {
                    let url = self.endpoint(&["categories"]);
                    let list: Vec<Category> = self.execute(self.inner.client.get(url)).await?;
                    Ok(Arc::new(list))
                },
            )
            .await?;
        Ok(categories.as_ref().clone())
    }

    #[instrument(skip(self))]
    async fn sewing_styles(&self) -> Result<Vec<SewingStyle>, BackendError> {
        let styles = self
            .cached(
                CacheKey::SewingStyles,
                |value| match value {
                    CacheValue::SewingStyles(list) => Some(list),
                    _ => None,
                },
                CacheValue::SewingStyles,
                async {
                    let url = self.endpoint(&["sewing-styles"]);
                    let list: Vec<SewingStyle> = self.execute(self.inner.client.get(url)).await?;
                    Ok(Arc::new(list))
                },
            )
            .await?;
        Ok(styles.as_ref().clone())
    }

    #[instrument(skip(self), fields(sewing_style_id = %id))]
    async fn sewing_style(&self, id: SewingStyleId) -> Result<SewingStyle, BackendError> {
        let style = self
            .cached(
                CacheKey::SewingStyle(id),
                |value| match value {
                    CacheValue::SewingStyle(style) => Some(style),
                    _ => None,
                },
                CacheValue::SewingStyle,
                async {
                    let url = self.endpoint(&["sewing-styles", &id.to_string()]);
                    let style: SewingStyle = self.execute(self.inner.client.get(url)).await?;
                    Ok(Box::new(style))
                },
            )
            .await?;
        Ok(*style)
    }
}

// =============================================================================
// Orders
// =============================================================================

impl OrderStore for ApiClient {
    #[instrument(skip(self, token, order), fields(order_type = ?order.order_type))]
    async fn create_order(
        &self,
        token: &AccessToken,
        order: &NewOrder,
    ) -> Result<Order, BackendError> {
        let url = self.endpoint(&["orders"]);
        let request = self
            .inner
            .client
            .post(url)
            .bearer_auth(token.expose())
            .json(order);
        self.execute(request).await
    }

    #[instrument(skip(self, token, items), fields(count = items.len()))]
    async fn create_order_items(
        &self,
        token: &AccessToken,
        items: &[NewOrderItem],
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["order-items"]);
        let request = self
            .inner
            .client
            .post(url)
            .bearer_auth(token.expose())
            .json(items);
        self.execute_raw(request).await.map(|_| ())
    }

    #[instrument(skip(self, token, detail), fields(order_id = %detail.order_id))]
    async fn create_sewing_detail(
        &self,
        token: &AccessToken,
        detail: &NewSewingDetail,
    ) -> Result<SewingOrderDetail, BackendError> {
        let url = self.endpoint(&["sewing-order-details"]);
        let request = self
            .inner
            .client
            .post(url)
            .bearer_auth(token.expose())
            .json(detail);
        self.execute(request).await
    }

    #[instrument(skip(self, token))]
    async fn user_orders(&self, token: &AccessToken) -> Result<Vec<Order>, BackendError> {
        let url = self.endpoint(&["orders"]);
        let request = self.inner.client.get(url).bearer_auth(token.expose());
        self.execute(request).await
    }

    #[instrument(skip(self, token), fields(order_id = %id))]
    async fn order(&self, token: &AccessToken, id: OrderId) -> Result<Order, BackendError> {
        let url = self.endpoint(&["orders", &id.to_string()]);
        let request = self.inner.client.get(url).bearer_auth(token.expose());
        self.execute(request).await
    }
}

// =============================================================================
// Wishlist
// =============================================================================

impl WishlistStore for ApiClient {
    #[instrument(skip(self, token))]
    async fn list(&self, token: &AccessToken) -> Result<Vec<WishlistEntry>, BackendError> {
        let url = self.endpoint(&["wishlist"]);
        let request = self.inner.client.get(url).bearer_auth(token.expose());
        self.execute(request).await
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn insert(
        &self,
        token: &AccessToken,
        product_id: ProductId,
    ) -> Result<WishlistEntry, BackendError> {
        let url = self.endpoint(&["wishlist"]);
        let request = self
            .inner
            .client
            .post(url)
            .bearer_auth(token.expose())
            .json(&NewWishlistEntry { product_id });
        self.execute(request).await
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn delete(&self, token: &AccessToken, product_id: ProductId) -> Result<(), BackendError> {
        let url = self.endpoint(&["wishlist", &product_id.to_string()]);
        let request = self.inner.client.delete(url).bearer_auth(token.expose());
        self.execute_raw(request).await.map(|_| ())
    }
}

// =============================================================================
// Auth & newsletter
// =============================================================================

impl AuthProvider for ApiClient {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, BackendError> {
        let url = self.endpoint(&["auth", "login"]);
        self.execute(self.inner.client.post(url).json(credentials))
            .await
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn sign_up(&self, registration: &Registration) -> Result<AuthSession, BackendError> {
        let url = self.endpoint(&["auth", "register"]);
        self.execute(self.inner.client.post(url).json(registration))
            .await
    }

    #[instrument(skip(self, token))]
    async fn current_user(&self, token: &AccessToken) -> Result<User, BackendError> {
        let url = self.endpoint(&["auth", "me"]);
        let request = self.inner.client.get(url).bearer_auth(token.expose());
        self.execute(request).await
    }
}

impl NewsletterStore for ApiClient {
    #[instrument(skip(self), fields(email = %email))]
    async fn subscribe(&self, email: &Email) -> Result<(), BackendError> {
        let url = self.endpoint(&["subscribers"]);
        let request = self.inner.client.post(url).json(&NewSubscriber {
            email: email.as_str(),
        });
        self.execute_raw(request).await.map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config(base: &str) -> ApiConfig {
        ApiConfig {
            base_url: Url::parse(base).unwrap(),
            api_key: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_classify_unique_violation_code() {
        let err = classify(
            StatusCode::BAD_REQUEST,
            r#"{"code":"23505","message":"violates unique constraint"}"#,
        );
        assert!(matches!(err, BackendError::Duplicate(_)));
    }

    #[test]
    fn test_classify_duplicate_message_and_conflict() {
        let err = classify(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"Duplicate key value"}"#,
        );
        assert!(matches!(err, BackendError::Duplicate(_)));

        let err = classify(StatusCode::CONFLICT, "");
        assert!(matches!(err, BackendError::Duplicate(_)));
    }

    #[test]
    fn test_classify_other_statuses() {
        assert_eq!(
            classify(StatusCode::NOT_FOUND, r#"{"error":"Product not found"}"#),
            BackendError::NotFound("Product not found".to_string())
        );
        assert_eq!(classify(StatusCode::UNAUTHORIZED, ""), BackendError::Unauthorized);
        assert_eq!(classify(StatusCode::FORBIDDEN, ""), BackendError::Unauthorized);
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, "upstream down"),
            BackendError::Transient(_)
        ));
        assert_eq!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message":"bad size"}"#),
            BackendError::Rejected {
                status: 422,
                message: "bad size".to_string()
            }
        );
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let client = ApiClient::new(&config("http://localhost:5000/api")).unwrap();
        let url = client.endpoint(&["products", "abc"]);
        assert_eq!(url.as_str(), "http://localhost:5000/api/products/abc");

        let client = ApiClient::new(&config("http://localhost:5000/api/")).unwrap();
        let url = client.endpoint(&["auth", "me"]);
        assert_eq!(url.as_str(), "http://localhost:5000/api/auth/me");
    }

    #[test]
    fn test_rejects_header_unsafe_api_key() {
        let mut cfg = config("http://localhost:5000/api");
        cfg.api_key = Some(SecretString::from("line\nbreak"));
        assert!(matches!(
            ApiClient::new(&cfg),
            Err(ClientError::InvalidApiKey)
        ));
    }

    #[test]
    fn test_rejects_non_base_url() {
        let cfg = ApiConfig {
            base_url: Url::parse("mailto:shop@dowslakers.com").unwrap(),
            api_key: None,
            timeout: Duration::from_secs(5),
        };
        assert!(matches!(
            ApiClient::new(&cfg),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }
}
