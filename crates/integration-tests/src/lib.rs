//! Integration tests for the Dowslakers storefront.
//!
//! Tests run against an in-process fake of the hosted REST API, so no
//! external services are needed:
//!
//! ```bash
//! cargo test -p dowslakers-integration-tests
//! ```
//!
//! # Harness
//!
//! - [`FakeApi`] - axum server speaking the hosted API's wire format, with
//!   seeded catalog data, failure switches and a request log
//! - [`TestStorefront`] - the real storefront app bound to an ephemeral
//!   port, pointed at a [`FakeApi`], plus a cookie-keeping client

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;
use uuid::Uuid;

use dowslakers_storefront::config::StorefrontConfig;
use dowslakers_storefront::state::AppState;

/// Seeded catalog identifiers.
pub mod seed {
    pub const CATEGORY_WOMEN: &str = "7a0d6c52-3a7e-4f0e-9a53-2f3b8f1c0a01";
    pub const CATEGORY_MEN: &str = "7a0d6c52-3a7e-4f0e-9a53-2f3b8f1c0a02";
    /// Ankara wrap dress, 15 000 naira, sizes S/M/L.
    pub const DRESS: &str = "2c1f4b8e-0d55-4d1a-b6c4-0f4a3e7d1b01";
    /// Senator kaftan, 20 000 naira, no size chart.
    pub const KAFTAN: &str = "2c1f4b8e-0d55-4d1a-b6c4-0f4a3e7d1b02";
    /// Agbada style, base price 45 000 naira.
    pub const AGBADA: &str = "9e3b7a14-6c2d-4f8b-8a1e-5d6c7b8a9f01";

    pub const CUSTOMER_EMAIL: &str = "ada@dowslakers.test";
    pub const CUSTOMER_PASSWORD: &str = "correct-horse-battery";
}

/// Postgres unique-violation body, as the hosted API forwards it.
fn unique_violation(constraint: &str) -> Response {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "code": "23505",
            "message": format!("duplicate key value violates unique constraint \"{constraint}\""),
        })),
    )
        .into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[derive(Debug, Clone)]
struct Account {
    user: Value,
    password: String,
}

/// In-memory state behind [`FakeApi`].
#[derive(Debug, Default)]
pub struct FakeState {
    accounts: Mutex<Vec<Account>>,
    tokens: Mutex<HashMap<String, Uuid>>,
    categories: Vec<Value>,
    products: Vec<Value>,
    styles: Vec<Value>,
    orders: Mutex<Vec<Value>>,
    order_items: Mutex<Vec<Value>>,
    sewing_details: Mutex<Vec<Value>>,
    wishlist: Mutex<Vec<Value>>,
    subscribers: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
    /// Request-line prefixes answered only after a delay.
    stalls: Mutex<Vec<(String, Duration)>>,
    /// Reject `POST /order-items` with a server error.
    pub fail_order_items: AtomicBool,
    /// Reject `POST /sewing-order-details` with a server error.
    pub fail_sewing_details: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl FakeState {
    fn seeded() -> Self {
        let women = json!({
            "id": seed::CATEGORY_WOMEN, "name": "Women", "slug": "women",
            "description": "Dresses and wrappers", "display_order": 1,
        });
        let men = json!({
            "id": seed::CATEGORY_MEN, "name": "Men", "slug": "men", "display_order": 2,
        });
        let products = vec![
            json!({
                "id": seed::DRESS,
                "name": "Ankara Wrap Dress",
                "description": "Hand-finished wax print wrap dress",
                "price": 15000,
                "images": ["https://cdn.dowslakers.test/dress-1.jpg"],
                "sizes": ["S", "M", "L"],
                "stock_quantity": 12,
                "category_id": seed::CATEGORY_WOMEN,
                "category": women.clone(),
                "is_active": true,
                "created_at": "2025-01-10T09:00:00Z",
            }),
            json!({
                "id": seed::KAFTAN,
                "name": "Senator Kaftan",
                "price": 20000,
                "images": [],
                "sizes": [],
                "category_id": seed::CATEGORY_MEN,
                "category": men.clone(),
                "is_active": true,
                "created_at": "2025-01-12T09:00:00Z",
            }),
        ];
        let styles = vec![json!({
            "id": seed::AGBADA,
            "name": "Agbada",
            "description": "Three-piece flowing robe",
            "images": ["https://cdn.dowslakers.test/agbada.jpg"],
            "base_price": 45000,
            "category_id": seed::CATEGORY_MEN,
            "category": men.clone(),
            "is_active": true,
        })];

        let customer_id = Uuid::new_v4();
        let customer = Account {
            user: json!({
                "id": customer_id,
                "email": seed::CUSTOMER_EMAIL,
                "first_name": "Ada",
                "last_name": "Obi",
                "role": "customer",
            }),
            password: seed::CUSTOMER_PASSWORD.to_string(),
        };

        Self {
            accounts: Mutex::new(vec![customer]),
            categories: vec![women, men],
            products,
            styles,
            ..Self::default()
        }
    }

    /// Every request seen, as `"METHOD /path"` without the `/api` prefix.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    /// Number of requests whose line starts with `prefix`.
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        lock(&self.orders).clone()
    }

    #[must_use]
    pub fn order_items(&self) -> Vec<Value> {
        lock(&self.order_items).clone()
    }

    #[must_use]
    pub fn sewing_details(&self) -> Vec<Value> {
        lock(&self.sewing_details).clone()
    }

    #[must_use]
    pub fn subscribers(&self) -> HashSet<String> {
        lock(&self.subscribers).clone()
    }

    fn user_for(&self, headers: &HeaderMap) -> Result<Value, Response> {
        let token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Missing token"))?;
        let user_id = lock(&self.tokens)
            .get(token)
            .copied()
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid token"))?;
        lock(&self.accounts)
            .iter()
            .find(|a| a.user["id"] == json!(user_id))
            .map(|a| a.user.clone())
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Invalid token"))
    }

    fn issue_token(&self, user: &Value) -> String {
        let token = format!("tok-{}", Uuid::new_v4());
        let id = user["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_default();
        lock(&self.tokens).insert(token.clone(), id);
        token
    }
}

// =============================================================================
// Fake API handlers
// =============================================================================

type Fake = State<Arc<FakeState>>;

async fn record(State(state): Fake, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    let line = format!(
        "{} {}",
        request.method(),
        path.strip_prefix("/api").unwrap_or(path)
    );
    let stall = lock(&state.stalls)
        .iter()
        .find(|(prefix, _)| line.starts_with(prefix.as_str()))
        .map(|(_, delay)| *delay);
    lock(&state.requests).push(line);
    if let Some(delay) = stall {
        tokio::time::sleep(delay).await;
    }
    next.run(request).await
}

async fn login(State(state): Fake, Json(body): Json<Value>) -> Response {
    let account = lock(&state.accounts)
        .iter()
        .find(|a| a.user["email"] == body["email"] && json!(a.password) == body["password"])
        .cloned();
    match account {
        Some(account) => {
            let token = state.issue_token(&account.user);
            Json(json!({ "user": account.user, "token": token })).into_response()
        }
        None => error(StatusCode::UNAUTHORIZED, "Invalid login credentials"),
    }
}

async fn register(State(state): Fake, Json(body): Json<Value>) -> Response {
    let user = {
        let mut accounts = lock(&state.accounts);
        if accounts.iter().any(|a| a.user["email"] == body["email"]) {
            return unique_violation("users_email_key");
        }
        let user = json!({
            "id": Uuid::new_v4(),
            "email": body["email"],
            "first_name": body["first_name"],
            "last_name": body["last_name"],
            "role": "customer",
        });
        accounts.push(Account {
            user: user.clone(),
            password: body["password"].as_str().unwrap_or_default().to_string(),
        });
        user
    };
    let token = state.issue_token(&user);
    (StatusCode::CREATED, Json(json!({ "user": user, "token": token }))).into_response()
}

async fn me(State(state): Fake, headers: HeaderMap) -> Response {
    match state.user_for(&headers) {
        Ok(user) => Json(user).into_response(),
        Err(rejection) => rejection,
    }
}

async fn products(State(state): Fake, Query(query): Query<HashMap<String, String>>) -> Response {
    let category = query.get("category");
    let search = query.get("search").map(|s| s.to_lowercase());
    let list: Vec<&Value> = state
        .products
        .iter()
        .filter(|p| category.is_none_or(|c| p["category"]["slug"] == json!(c)))
        .filter(|p| {
            search.as_ref().is_none_or(|needle| {
                p["name"]
                    .as_str()
                    .is_some_and(|name| name.to_lowercase().contains(needle))
            })
        })
        .collect();
    Json(list).into_response()
}

async fn product(State(state): Fake, Path(id): Path<String>) -> Response {
    match state.products.iter().find(|p| p["id"] == json!(id)) {
        Some(product) => Json(product).into_response(),
        None => error(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn categories(State(state): Fake) -> Response {
    Json(&state.categories).into_response()
}

async fn sewing_styles(State(state): Fake) -> Response {
    Json(&state.styles).into_response()
}

async fn sewing_style(State(state): Fake, Path(id): Path<String>) -> Response {
    match state.styles.iter().find(|s| s["id"] == json!(id)) {
        Some(style) => Json(style).into_response(),
        None => error(StatusCode::NOT_FOUND, "Sewing style not found"),
    }
}

async fn create_order(State(state): Fake, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let user = match state.user_for(&headers) {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };
    if body["user_id"] != user["id"] {
        return error(StatusCode::FORBIDDEN, "Order belongs to another user");
    }
    let mut order = body;
    order["id"] = json!(Uuid::new_v4());
    order["status"] = json!("pending");
    order["created_at"] = json!(chrono::Utc::now());
    lock(&state.orders).push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

/// Orders with their items and sewing details embedded, as the API's
/// `select=*,order_items(*),sewing_order_details(*)` returns them.
fn hydrate(state: &FakeState, order: &Value) -> Value {
    let items: Vec<Value> = lock(&state.order_items)
        .iter()
        .filter(|i| i["order_id"] == order["id"])
        .cloned()
        .collect();
    let details: Vec<Value> = lock(&state.sewing_details)
        .iter()
        .filter(|d| d["order_id"] == order["id"])
        .cloned()
        .collect();
    let mut order = order.clone();
    order["order_items"] = json!(items);
    order["sewing_order_details"] = json!(details);
    order
}

async fn list_orders(State(state): Fake, headers: HeaderMap) -> Response {
    let user = match state.user_for(&headers) {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };
    let orders: Vec<Value> = state
        .orders()
        .iter()
        .rev()
        .filter(|o| o["user_id"] == user["id"])
        .map(|o| hydrate(&state, o))
        .collect();
    Json(orders).into_response()
}

async fn show_order(State(state): Fake, headers: HeaderMap, Path(id): Path<String>) -> Response {
    let user = match state.user_for(&headers) {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };
    let order = state
        .orders()
        .into_iter()
        .find(|o| o["id"] == json!(id) && o["user_id"] == user["id"]);
    match order {
        Some(order) => Json(hydrate(&state, &order)).into_response(),
        None => error(StatusCode::NOT_FOUND, "Order not found"),
    }
}

async fn create_order_items(
    State(state): Fake,
    headers: HeaderMap,
    Json(items): Json<Vec<Value>>,
) -> Response {
    if let Err(rejection) = state.user_for(&headers) {
        return rejection;
    }
    if state.fail_order_items.load(Ordering::SeqCst) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "could not insert order items");
    }
    let created: Vec<Value> = items
        .into_iter()
        .map(|mut item| {
            item["id"] = json!(Uuid::new_v4());
            item
        })
        .collect();
    lock(&state.order_items).extend(created.iter().cloned());
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn create_sewing_detail(
    State(state): Fake,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = state.user_for(&headers) {
        return rejection;
    }
    if state.fail_sewing_details.load(Ordering::SeqCst) {
        return error(StatusCode::SERVICE_UNAVAILABLE, "could not insert sewing details");
    }
    let mut detail = body;
    detail["id"] = json!(Uuid::new_v4());
    detail["created_at"] = json!(chrono::Utc::now());
    lock(&state.sewing_details).push(detail.clone());
    (StatusCode::CREATED, Json(detail)).into_response()
}

async fn list_wishlist(State(state): Fake, headers: HeaderMap) -> Response {
    let user = match state.user_for(&headers) {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };
    let entries: Vec<Value> = lock(&state.wishlist)
        .iter()
        .filter(|e| e["user_id"] == user["id"])
        .map(|e| {
            let mut entry = e.clone();
            entry["product"] = state
                .products
                .iter()
                .find(|p| p["id"] == e["product_id"])
                .cloned()
                .unwrap_or(Value::Null);
            entry
        })
        .collect();
    Json(entries).into_response()
}

async fn add_wishlist(State(state): Fake, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let user = match state.user_for(&headers) {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };
    let mut wishlist = lock(&state.wishlist);
    let exists = wishlist
        .iter()
        .any(|e| e["user_id"] == user["id"] && e["product_id"] == body["product_id"]);
    if exists {
        return unique_violation("wishlist_user_id_product_id_key");
    }
    let entry = json!({
        "id": Uuid::new_v4(),
        "user_id": user["id"],
        "product_id": body["product_id"],
        "created_at": chrono::Utc::now(),
    });
    wishlist.push(entry.clone());
    (StatusCode::CREATED, Json(entry)).into_response()
}

async fn remove_wishlist(
    State(state): Fake,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Response {
    let user = match state.user_for(&headers) {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };
    lock(&state.wishlist)
        .retain(|e| !(e["user_id"] == user["id"] && e["product_id"] == json!(product_id)));
    StatusCode::NO_CONTENT.into_response()
}

async fn subscribe(State(state): Fake, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_lowercase();
    if !lock(&state.subscribers).insert(email.clone()) {
        // The API reports this one as a bad request carrying the pg code.
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "code": "23505",
                "message": "subscriber already exists",
            })),
        )
            .into_response();
    }
    (StatusCode::CREATED, Json(json!({ "email": email }))).into_response()
}

fn fake_router(state: Arc<FakeState>) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/products", get(products))
        .route("/products/{id}", get(product))
        .route("/categories", get(categories))
        .route("/sewing-styles", get(sewing_styles))
        .route("/sewing-styles/{id}", get(sewing_style))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(show_order))
        .route("/order-items", post(create_order_items))
        .route("/sewing-order-details", post(create_sewing_detail))
        .route("/wishlist", get(list_wishlist).post(add_wishlist))
        .route("/wishlist/{product_id}", delete(remove_wishlist))
        .route("/subscribers", post(subscribe));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|e| panic!("failed to bind test listener: {e}"));
    let addr = listener
        .local_addr()
        .unwrap_or_else(|e| panic!("listener has no address: {e}"));
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .unwrap_or_else(|e| panic!("test server stopped: {e}"));
    });
    addr
}

/// A running fake of the hosted REST API.
pub struct FakeApi {
    pub state: Arc<FakeState>,
    addr: SocketAddr,
}

impl FakeApi {
    /// Seed the fake and serve it on an ephemeral port.
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::seeded());
        let addr = serve(fake_router(state.clone())).await;
        Self { state, addr }
    }

    /// Base URL the storefront's API client should use.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr))
            .unwrap_or_else(|e| panic!("invalid fake API URL: {e}"))
    }

    /// Make `POST /order-items` answer with a server error.
    pub fn fail_order_items(&self, fail: bool) {
        self.state.fail_order_items.store(fail, Ordering::SeqCst);
    }

    /// Make `POST /sewing-order-details` answer with a server error.
    pub fn fail_sewing_details(&self, fail: bool) {
        self.state.fail_sewing_details.store(fail, Ordering::SeqCst);
    }

    /// Hold requests whose line starts with `prefix` (e.g. `"POST /wishlist"`)
    /// for `delay` before answering.
    pub fn stall(&self, prefix: &str, delay: Duration) {
        lock(&self.state.stalls).push((prefix.to_string(), delay));
    }
}

/// Build a storefront configuration from explicit variables.
///
/// # Panics
///
/// Panics if the variables do not form a valid configuration.
#[must_use]
pub fn config(api_url: &Url, data_dir: &std::path::Path) -> StorefrontConfig {
    config_with_timeout(api_url, data_dir, 5)
}

/// [`config`] with an explicit request timeout in seconds.
///
/// # Panics
///
/// Panics if the variables do not form a valid configuration.
#[must_use]
pub fn config_with_timeout(
    api_url: &Url,
    data_dir: &std::path::Path,
    timeout_secs: u64,
) -> StorefrontConfig {
    let vars = HashMap::from([
        ("STOREFRONT_BASE_URL", "http://127.0.0.1:3000".to_string()),
        ("STOREFRONT_API_URL", api_url.to_string()),
        ("STOREFRONT_DATA_DIR", data_dir.display().to_string()),
        ("STOREFRONT_REQUEST_TIMEOUT_SECS", timeout_secs.to_string()),
        ("STOREFRONT_DELIVERY_FEE", "3500".to_string()),
    ]);
    StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
        .unwrap_or_else(|e| panic!("invalid test configuration: {e}"))
}

/// The storefront app served on an ephemeral port against a [`FakeApi`].
pub struct TestStorefront {
    pub api: FakeApi,
    pub client: reqwest::Client,
    base: String,
    _data_dir: tempfile::TempDir,
}

impl TestStorefront {
    /// Start a fake API and a storefront in front of it.
    pub async fn start() -> Self {
        Self::start_with_timeout(5).await
    }

    /// [`Self::start`] with the storefront's API timeout set to
    /// `timeout_secs`.
    pub async fn start_with_timeout(timeout_secs: u64) -> Self {
        let api = FakeApi::start().await;
        let data_dir = tempfile::tempdir().unwrap_or_else(|e| panic!("no temp dir: {e}"));
        let config = config_with_timeout(&api.base_url(), data_dir.path(), timeout_secs);
        let state = AppState::new(config)
            .unwrap_or_else(|e| panic!("failed to build app state: {e}"));
        let addr = serve(dowslakers_storefront::app(state)).await;

        Self {
            api,
            client: visitor(),
            base: format!("http://{addr}"),
            _data_dir: data_dir,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Sign the default client in as the seeded customer.
    pub async fn sign_in(&self) -> Value {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({
                "email": seed::CUSTOMER_EMAIL,
                "password": seed::CUSTOMER_PASSWORD,
            }))
            .send()
            .await
            .unwrap_or_else(|e| panic!("login request failed: {e}"));
        assert_eq!(resp.status(), StatusCode::OK, "sign in failed");
        resp.json()
            .await
            .unwrap_or_else(|e| panic!("login body was not JSON: {e}"))
    }
}

/// A fresh browser-like client with its own cookie jar.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn visitor() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap_or_else(|e| panic!("failed to build client: {e}"))
}
