//! HTTP route handlers for storefront.
//!
//! All responses are JSON. Errors use the `AppError` body.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                            - Liveness
//!
//! # Catalog
//! GET  /api/products?category=&search=    - Product listing
//! GET  /api/products/{id}                 - Product detail
//! GET  /api/categories                    - Categories
//! GET  /api/sewing-styles?category_id=    - Sewing styles
//! GET  /api/sewing-styles/{id}            - Sewing style detail
//!
//! # Auth
//! POST /api/auth/login                    - Sign in
//! POST /api/auth/register                 - Create account
//! POST /api/auth/logout                   - Sign out (cart kept)
//! GET  /api/auth/me                       - Re-validate the session
//!
//! # Cart (per visitor, no sign in)
//! GET    /api/cart                        - Cart with totals
//! DELETE /api/cart                        - Empty the cart
//! POST   /api/cart/items                  - Add (merges same product + size)
//! PATCH  /api/cart/items                  - Set quantity (<= 0 removes)
//! DELETE /api/cart/items/{product_id}/{size} - Remove a line
//!
//! # Checkout
//! POST /api/checkout/quote                - Totals for a delivery method
//! POST /api/checkout                      - Place order (requires auth)
//!
//! # Wishlist (requires auth)
//! GET    /api/wishlist                    - Saved products
//! POST   /api/wishlist                    - Save a product
//! DELETE /api/wishlist/{product_id}       - Unsave
//!
//! # Custom sewing
//! GET   /api/sewing/draft                 - Current wizard state
//! PATCH /api/sewing/draft                 - Edit style, size, measurements, notes
//! POST  /api/sewing/draft/next            - Next step
//! POST  /api/sewing/draft/back            - Previous step
//! POST  /api/sewing/draft/reset           - Start over
//! POST  /api/sewing/submit                - Submit (requires auth)
//!
//! # Orders (requires auth)
//! GET  /api/orders                        - Order history
//! GET  /api/orders/{id}                   - Order detail
//!
//! # Newsletter
//! POST /api/newsletter                    - Subscribe
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod newsletter;
pub mod orders;
pub mod sewing;
pub mod wishlist;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        .route("/categories", get(catalog::categories))
        .route("/sewing-styles", get(catalog::sewing_styles))
        .route("/sewing-styles/{id}", get(catalog::sewing_style))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add).patch(cart::update))
        .route("/items/{product_id}/{size}", delete(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::place_order))
        .route("/quote", post(checkout::quote))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show).post(wishlist::add))
        .route("/{product_id}", delete(wishlist::remove))
}

/// Create the sewing wizard routes router.
pub fn sewing_routes() -> Router<AppState> {
    Router::new()
        .route("/draft", get(sewing::show).patch(sewing::update))
        .route("/draft/next", post(sewing::next))
        .route("/draft/back", post(sewing::back))
        .route("/draft/reset", post(sewing::reset))
        .route("/submit", post(sewing::submit))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .nest("/auth", auth_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/sewing", sewing_routes())
        .nest("/orders", order_routes())
        .route("/newsletter", post(newsletter::subscribe));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
