//! Custom sewing request submission.
//!
//! A request is two backend writes: a `sewing` order, then its detail
//! record. If the second write fails, the order id is kept on the draft and
//! the next attempt by the same account only retries the detail.

use thiserror::Error;
use tracing::instrument;

use dowslakers_core::{OrderId, SewingDraft, WizardError};

use crate::backend::{BackendError, NewOrder, NewSewingDetail, OrderStore, SewingOrderDetail};
use crate::services::session::Identity;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("sign in to submit a sewing request")]
    AuthRequired,

    #[error(transparent)]
    Invalid(#[from] WizardError),

    #[error("failed to create sewing order: {0}")]
    OrderFailed(BackendError),

    /// The order exists; resubmitting retries only the detail.
    #[error("order {order_id} was created but its sewing details could not be saved: {source}")]
    DetailFailed {
        order_id: OrderId,
        source: BackendError,
    },
}

/// Submits [`SewingDraft`]s through an [`OrderStore`].
#[derive(Debug, Clone)]
pub struct SewingWorkflow<O> {
    orders: O,
}

impl<O: OrderStore> SewingWorkflow<O> {
    #[must_use]
    pub const fn new(orders: O) -> Self {
        Self { orders }
    }

    /// Submit the draft at its review step.
    ///
    /// On success the draft moves to `Submitted` and its data is cleared.
    ///
    /// # Errors
    ///
    /// Nothing is sent when signed out or when the draft is not ready.
    #[instrument(skip_all, fields(step = draft.step().number()))]
    pub async fn submit(
        &self,
        identity: Option<&Identity>,
        draft: &mut SewingDraft,
    ) -> Result<SewingOrderDetail, SubmitError> {
        let identity = identity.ok_or(SubmitError::AuthRequired)?;
        let style_id = draft.ready_to_submit()?.id;

        if let Some(order_id) = draft.retain_pending_order_for(identity.user_id()) {
            tracing::warn!(%order_id, "Dropping sewing order created by another account");
        }
        let order_id = match draft.pending_order() {
            Some(order_id) => {
                tracing::info!(%order_id, "Retrying sewing details for existing order");
                order_id
            }
            None => {
                let order = NewOrder::sewing(identity.user_id(), draft.special_instructions());
                self.orders
                    .create_order(&identity.token, &order)
                    .await
                    .map_err(SubmitError::OrderFailed)?
                    .id
            }
        };

        let detail = NewSewingDetail {
            order_id,
            sewing_style_id: style_id,
            size_option: draft.resolved_size(),
            measurements: draft.submitted_measurements(),
            special_instructions: draft.special_instructions().map(str::to_string),
        };
        match self.orders.create_sewing_detail(&identity.token, &detail).await {
            Ok(saved) => {
                draft.mark_submitted();
                tracing::info!(%order_id, "Sewing request submitted");
                Ok(saved)
            }
            Err(source) => {
                tracing::error!(%order_id, error = %source, "Sewing order created without details");
                draft.set_pending_order(identity.user_id(), order_id);
                Err(SubmitError::DetailFailed { order_id, source })
            }
        }
    }
}
