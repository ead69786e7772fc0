//! Dowslakers storefront library.
//!
//! This crate provides the storefront as a library, allowing the full
//! router to be driven from tests.
//!
//! # Modules
//!
//! - [`backend`] - Hosted REST API collaborators and their `reqwest` client
//! - [`storage`] - Durable per-visitor key/value storage
//! - [`services`] - Cart, wishlist, sewing, checkout and session logic
//! - [`routes`] / [`middleware`] - The axum HTTP surface

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

use std::time::Duration;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// The complete storefront application: routes, sessions, request ids,
/// tracing and Sentry.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    routes::routes()
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
