//! Dowslakers Core - domain types and order composition logic.
//!
//! This crate is shared by every Dowslakers component:
//! - `storefront` - Customer-facing shop (catalog, cart, checkout, custom sewing)
//! - `integration-tests` - End-to-end tests against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O, no
//! HTTP clients, no storage. Persistence and remote calls live in the
//! storefront crate, which drives these types.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, and status enums
//! - [`catalog`] - Product, category, and sewing style snapshots
//! - [`cart`] - Cart lines keyed by `(product, size)` with derived totals
//! - [`checkout`] - Checkout totals and delivery form validation
//! - [`sewing`] - Custom sewing wizard draft and its gated steps

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod sewing;
pub mod types;

pub use cart::{Cart, CartKey, CartLine};
pub use catalog::{Category, Product, SewingStyle};
pub use checkout::{CheckoutForm, CheckoutTotal, ValidationError, compute_total};
pub use sewing::{MeasurementField, SewingDraft, SizeOption, WizardError, WizardStep};
pub use types::*;
