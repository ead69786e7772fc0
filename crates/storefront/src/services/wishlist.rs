//! Wishlist reconciliation.
//!
//! The backend owns the wishlist; this service keeps a per-visitor copy for
//! membership checks. The copy only changes after the backend confirms a
//! write, and is reloaded or cleared whenever the signed-in user changes.
//!
//! At most one add/remove is in flight per visitor. A second request while
//! one is pending gets [`WishlistError::Busy`] instead of queueing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::instrument;

use dowslakers_core::{ProductId, UserId};

use crate::backend::{BackendError, WishlistEntry, WishlistStore};
use crate::services::session::Identity;

/// Failed wishlist operation.
#[derive(Debug, Error)]
pub enum WishlistError {
    #[error("sign in to use your wishlist")]
    AuthRequired,

    #[error("this item is already in your wishlist")]
    AlreadySaved,

    #[error("another wishlist update is in progress")]
    Busy,

    #[error("failed to add to wishlist: {0}")]
    AddFailed(BackendError),

    #[error("failed to remove from wishlist: {0}")]
    RemoveFailed(BackendError),

    #[error("failed to load wishlist: {0}")]
    LoadFailed(BackendError),
}

#[derive(Debug, Default)]
struct Snapshot {
    owner: Option<UserId>,
    entries: Vec<WishlistEntry>,
}

/// Clears the in-flight flag when the call settles, including on
/// cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-visitor wishlist backed by a [`WishlistStore`].
#[derive(Debug)]
pub struct WishlistService<W> {
    store: W,
    snapshot: Mutex<Snapshot>,
    in_flight: AtomicBool,
}

impl<W: WishlistStore> WishlistService<W> {
    #[must_use]
    pub fn new(store: W) -> Self {
        Self {
            store,
            snapshot: Mutex::new(Snapshot::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    fn snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saved entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<WishlistEntry> {
        self.snapshot().entries.clone()
    }

    #[must_use]
    pub fn is_saved(&self, product_id: ProductId) -> bool {
        self.snapshot()
            .entries
            .iter()
            .any(|entry| entry.product_id == product_id)
    }

    /// Drop the local copy. The backend is untouched.
    pub fn clear(&self) {
        *self.snapshot() = Snapshot::default();
    }

    /// Replace the local copy with the backend's list for `identity`, or
    /// clear it when signed out.
    ///
    /// # Errors
    ///
    /// Returns [`WishlistError::LoadFailed`]; the previous copy is kept.
    #[instrument(skip(self, identity), fields(user_id = ?identity.map(Identity::user_id)))]
    pub async fn load(&self, identity: Option<&Identity>) -> Result<(), WishlistError> {
        let Some(identity) = identity else {
            self.clear();
            return Ok(());
        };
        let entries = self
            .store
            .list(&identity.token)
            .await
            .map_err(WishlistError::LoadFailed)?;
        *self.snapshot() = Snapshot {
            owner: Some(identity.user_id()),
            entries,
        };
        Ok(())
    }

    /// Reload if the local copy belongs to someone other than `identity`.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::load`] failures.
    pub async fn sync(&self, identity: Option<&Identity>) -> Result<(), WishlistError> {
        let current = self.snapshot().owner;
        if current == identity.map(Identity::user_id) {
            return Ok(());
        }
        self.load(identity).await
    }

    /// Save `product_id`.
    ///
    /// # Errors
    ///
    /// - [`WishlistError::AuthRequired`] when signed out; no backend call
    /// - [`WishlistError::Busy`] while another add/remove is pending
    /// - [`WishlistError::AlreadySaved`] when the backend reports a duplicate
    /// - [`WishlistError::AddFailed`] for any other failure
    #[instrument(skip(self, identity), fields(product_id = %product_id))]
    pub async fn add(
        &self,
        identity: Option<&Identity>,
        product_id: ProductId,
    ) -> Result<WishlistEntry, WishlistError> {
        let identity = identity.ok_or(WishlistError::AuthRequired)?;
        let _guard = InFlight::acquire(&self.in_flight).ok_or(WishlistError::Busy)?;

        match self.store.insert(&identity.token, product_id).await {
            Ok(entry) => {
                let mut snapshot = self.snapshot();
                if snapshot.owner == Some(identity.user_id()) {
                    if !snapshot.entries.iter().any(|e| e.product_id == product_id) {
                        snapshot.entries.push(entry.clone());
                    }
                } else {
                    // Never loaded for this user; the next sync fetches the full list.
                    *snapshot = Snapshot::default();
                }
                Ok(entry)
            }
            Err(BackendError::Duplicate(_)) => Err(WishlistError::AlreadySaved),
            Err(e) => Err(WishlistError::AddFailed(e)),
        }
    }

    /// Remove `product_id`.
    ///
    /// # Errors
    ///
    /// [`WishlistError::AuthRequired`], [`WishlistError::Busy`], or
    /// [`WishlistError::RemoveFailed`]; the local copy is unchanged on error.
    #[instrument(skip(self, identity), fields(product_id = %product_id))]
    pub async fn remove(
        &self,
        identity: Option<&Identity>,
        product_id: ProductId,
    ) -> Result<(), WishlistError> {
        let identity = identity.ok_or(WishlistError::AuthRequired)?;
        let _guard = InFlight::acquire(&self.in_flight).ok_or(WishlistError::Busy)?;

        self.store
            .delete(&identity.token, product_id)
            .await
            .map_err(WishlistError::RemoveFailed)?;
        let mut snapshot = self.snapshot();
        if snapshot.owner == Some(identity.user_id()) {
            snapshot.entries.retain(|entry| entry.product_id != product_id);
        } else {
            *snapshot = Snapshot::default();
        }
        Ok(())
    }
}
