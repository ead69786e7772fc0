//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;
use tower_sessions::Session;
use uuid::Uuid;

use dowslakers_core::SewingDraft;

use crate::backend::{ApiClient, ClientError};
use crate::config::StorefrontConfig;
use crate::services::session::keys;
use crate::services::{CartStore, CheckoutService, SewingWorkflow, WishlistService};
use crate::storage::FileStorage;

/// Idle time after which a visitor's in-memory state is dropped. The cart
/// survives on disk; the wishlist is reloaded on next use.
const SHOPPER_IDLE: Duration = Duration::from_secs(2 * 60 * 60);
const MAX_SHOPPERS: u64 = 10_000;

/// Per-visitor state.
///
/// The cart lock is held for a whole checkout, so a second concurrent
/// checkout sees the already cleared cart.
#[derive(Debug)]
pub struct Shopper {
    visitor_id: Uuid,
    pub cart: Mutex<CartStore<FileStorage>>,
    pub wishlist: WishlistService<ApiClient>,
    pub sewing: Mutex<SewingDraft>,
}

impl Shopper {
    async fn load(visitor_id: Uuid, storage: FileStorage, api: ApiClient) -> Self {
        Self {
            visitor_id,
            cart: Mutex::new(CartStore::load(storage).await),
            wishlist: WishlistService::new(api),
            sewing: Mutex::new(SewingDraft::new()),
        }
    }

    #[must_use]
    pub const fn visitor_id(&self) -> Uuid {
        self.visitor_id
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    checkout: CheckoutService<ApiClient>,
    sewing: SewingWorkflow<ApiClient>,
    shoppers: Cache<Uuid, Arc<Shopper>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built from `config.api`.
    pub fn new(config: StorefrontConfig) -> Result<Self, ClientError> {
        let api = ApiClient::new(&config.api)?;
        let checkout = CheckoutService::new(api.clone(), config.delivery_fee);
        let sewing = SewingWorkflow::new(api.clone());
        let shoppers = Cache::builder()
            .max_capacity(MAX_SHOPPERS)
            .time_to_idle(SHOPPER_IDLE)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                checkout,
                sewing,
                shoppers,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Hosted API client; implements every backend trait.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService<ApiClient> {
        &self.inner.checkout
    }

    #[must_use]
    pub fn sewing(&self) -> &SewingWorkflow<ApiClient> {
        &self.inner.sewing
    }

    /// The state of the visitor owning `session`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the visitor id cannot be read from or written to
    /// the session.
    pub async fn shopper(&self, session: &Session) -> Result<Arc<Shopper>, tower_sessions::session::Error> {
        let visitor_id = match session.get::<Uuid>(keys::VISITOR_ID).await? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                session.insert(keys::VISITOR_ID, id).await?;
                tracing::debug!(visitor_id = %id, "New visitor");
                id
            }
        };

        let storage = FileStorage::new(self.config().data_dir.join(visitor_id.to_string()));
        let api = self.api().clone();
        Ok(self
            .inner
            .shoppers
            .get_with(visitor_id, async move {
                Arc::new(Shopper::load(visitor_id, storage, api).await)
            })
            .await)
    }
}
