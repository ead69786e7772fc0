//! Storefront business logic.
//!
//! # Services
//!
//! - `cart` - Visitor cart mirrored to durable storage
//! - `checkout` - Ready-made order placement
//! - `session` - Signed-in identity held in the visitor session
//! - `sewing` - Custom sewing request submission
//! - `wishlist` - Saved products for the signed-in user
//!
//! User-scoped operations take an `Option<&Identity>` and return an
//! auth-required error without calling the backend when it is `None`.

pub mod cart;
pub mod checkout;
pub mod session;
pub mod sewing;
pub mod wishlist;

pub use cart::{CartError, CartStore};
pub use checkout::{CheckoutError, CheckoutService, PlacedOrder};
pub use session::{AuthError, Identity, SessionGate};
pub use sewing::{SewingWorkflow, SubmitError};
pub use wishlist::{WishlistError, WishlistService};
