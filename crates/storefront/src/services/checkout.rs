//! Ready-made order placement.
//!
//! Places an order for the current cart in two writes: the order row, then
//! its line items. The cart is cleared only after both succeed.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use dowslakers_core::{CheckoutForm, CheckoutTotal, OrderId, OrderType, ValidationError, compute_total};

use crate::backend::{BackendError, NewOrder, NewOrderItem, OrderStore};
use crate::services::cart::CartStore;
use crate::services::session::Identity;
use crate::storage::LocalStorage;

/// Failed checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("sign in to check out")]
    AuthRequired,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("failed to place order: {0}")]
    OrderFailed(BackendError),

    /// The order exists upstream but its items do not. The cart is kept.
    #[error("order {order_id} was created but its items could not be saved: {source}")]
    ItemsFailed {
        order_id: OrderId,
        source: BackendError,
    },
}

/// A successfully placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total: CheckoutTotal,
}

/// Places ready-made orders through an [`OrderStore`].
#[derive(Debug, Clone)]
pub struct CheckoutService<O> {
    orders: O,
    delivery_fee: Decimal,
}

impl<O: OrderStore> CheckoutService<O> {
    #[must_use]
    pub const fn new(orders: O, delivery_fee: Decimal) -> Self {
        Self {
            orders,
            delivery_fee,
        }
    }

    /// Total for the cart under `form`'s delivery method.
    #[must_use]
    pub fn quote<S: LocalStorage>(&self, cart: &CartStore<S>, form: &CheckoutForm) -> CheckoutTotal {
        compute_total(cart.lines(), form.delivery_method, self.delivery_fee)
    }

    /// Validate, create the order and its items, then clear the cart.
    ///
    /// Checks run before any backend call, in this order: signed in,
    /// non-empty cart, form fields.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]. The cart is only cleared on success.
    #[instrument(skip_all, fields(delivery_method = %form.delivery_method))]
    pub async fn place_order<S: LocalStorage>(
        &self,
        identity: Option<&Identity>,
        cart: &mut CartStore<S>,
        form: &CheckoutForm,
    ) -> Result<PlacedOrder, CheckoutError> {
        let identity = identity.ok_or(CheckoutError::AuthRequired)?;
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        form.validate()?;

        let total = self.quote(cart, form);
        // The stored amount is the merchandise subtotal; the delivery fee is
        // settled separately.
        let order = NewOrder {
            user_id: identity.user_id(),
            order_type: OrderType::Product,
            total_amount: Some(total.subtotal),
            delivery_method: Some(form.delivery_method),
            delivery_address: form.delivery_address().map(str::to_string),
            delivery_contact: Some(form.phone.trim().to_string()),
            notes: form.notes().map(str::to_string),
        };
        let order = self
            .orders
            .create_order(&identity.token, &order)
            .await
            .map_err(CheckoutError::OrderFailed)?;

        let items: Vec<NewOrderItem> = cart
            .lines()
            .iter()
            .map(|line| NewOrderItem {
                order_id: order.id,
                product_id: line.product.id,
                quantity: line.quantity.get(),
                size: line.size.clone(),
                price: line.product.price,
            })
            .collect();
        if let Err(source) = self.orders.create_order_items(&identity.token, &items).await {
            tracing::error!(order_id = %order.id, error = %source, "Order created without items");
            return Err(CheckoutError::ItemsFailed {
                order_id: order.id,
                source,
            });
        }

        cart.clear().await;
        tracing::info!(order_id = %order.id, grand_total = %total.grand_total, "Order placed");
        Ok(PlacedOrder {
            order_id: order.id,
            total,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use dowslakers_core::{DeliveryMethod, OrderStatus, Product, ProductId, UserRole};

    use crate::backend::{AccessToken, NewSewingDetail, Order, SewingOrderDetail};
    use crate::services::session::tests::identity;
    use crate::storage::MemoryStorage;

    /// Records every write; individual steps can be made to fail.
    #[derive(Default)]
    pub(crate) struct FakeOrders {
        pub orders: Mutex<Vec<NewOrder>>,
        pub items: Mutex<Vec<NewOrderItem>>,
        pub details: Mutex<Vec<NewSewingDetail>>,
        pub fail_order: bool,
        pub fail_items: bool,
        pub fail_detail: bool,
    }

    pub(crate) fn order_from(id: OrderId, new: &NewOrder) -> Order {
        Order {
            id,
            user_id: Some(new.user_id),
            order_type: Some(new.order_type),
            status: OrderStatus::Pending,
            total_amount: new.total_amount,
            delivery_method: new.delivery_method,
            delivery_address: new.delivery_address.clone(),
            delivery_contact: new.delivery_contact.clone(),
            notes: new.notes.clone(),
            created_at: None,
            order_items: vec![],
            sewing_order_details: vec![],
        }
    }

    impl OrderStore for Arc<FakeOrders> {
        async fn create_order(
            &self,
            _token: &AccessToken,
            order: &NewOrder,
        ) -> Result<Order, BackendError> {
            if self.fail_order {
                return Err(BackendError::Transient("timeout".to_string()));
            }
            self.orders.lock().unwrap().push(order.clone());
            Ok(order_from(OrderId::random(), order))
        }

        async fn create_order_items(
            &self,
            _token: &AccessToken,
            items: &[NewOrderItem],
        ) -> Result<(), BackendError> {
            if self.fail_items {
                return Err(BackendError::Transient("timeout".to_string()));
            }
            self.items.lock().unwrap().extend_from_slice(items);
            Ok(())
        }

        async fn create_sewing_detail(
            &self,
            _token: &AccessToken,
            detail: &NewSewingDetail,
        ) -> Result<SewingOrderDetail, BackendError> {
            if self.fail_detail {
                return Err(BackendError::Rejected {
                    status: 400,
                    message: "bad measurements".to_string(),
                });
            }
            self.details.lock().unwrap().push(detail.clone());
            Ok(SewingOrderDetail {
                id: dowslakers_core::OrderDetailId::random(),
                order_id: detail.order_id,
                sewing_style_id: Some(detail.sewing_style_id),
                size_option: Some(detail.size_option.clone()),
                measurements: None,
                special_instructions: detail.special_instructions.clone(),
                sewing_style: None,
                created_at: None,
            })
        }

        async fn user_orders(&self, _token: &AccessToken) -> Result<Vec<Order>, BackendError> {
            Ok(vec![])
        }

        async fn order(&self, _token: &AccessToken, id: OrderId) -> Result<Order, BackendError> {
            Err(BackendError::NotFound(id.to_string()))
        }
    }

    fn product(price: i64) -> Product {
        Product {
            id: ProductId::random(),
            name: "Aso Oke Set".to_string(),
            description: None,
            price: Decimal::from(price),
            images: vec![],
            sizes: vec![],
            stock_quantity: None,
            category_id: None,
            category: None,
            is_active: Some(true),
            created_at: None,
        }
    }

    async fn filled_cart() -> CartStore<MemoryStorage> {
        let mut cart = CartStore::load(MemoryStorage::new()).await;
        cart.add_item(product(1_000), "M", 2).await.unwrap();
        cart.add_item(product(500), "L", 3).await.unwrap();
        cart
    }

    fn form(delivery_method: DeliveryMethod) -> CheckoutForm {
        CheckoutForm {
            full_name: "Chidi Okafor".to_string(),
            email: None,
            phone: " 0803 123 4567 ".to_string(),
            address: "12 Allen Avenue, Ikeja".to_string(),
            delivery_method,
            notes: String::new(),
        }
    }

    fn service(orders: &Arc<FakeOrders>) -> CheckoutService<Arc<FakeOrders>> {
        CheckoutService::new(orders.clone(), Decimal::from(3_500))
    }

    #[tokio::test]
    async fn test_places_delivery_order_and_clears_cart() {
        let orders = Arc::new(FakeOrders::default());
        let mut cart = filled_cart().await;
        let user = identity(UserRole::Customer);

        let placed = service(&orders)
            .place_order(Some(&user), &mut cart, &form(DeliveryMethod::Delivery))
            .await
            .unwrap();

        assert_eq!(placed.total.grand_total, Decimal::from(7_000));
        assert!(cart.is_empty());

        let sent = orders.orders.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].order_type, OrderType::Product);
        assert_eq!(sent[0].total_amount, Some(Decimal::from(3_500)));
        assert_eq!(sent[0].delivery_address.as_deref(), Some("12 Allen Avenue, Ikeja"));
        assert_eq!(sent[0].delivery_contact.as_deref(), Some("0803 123 4567"));
        assert_eq!(sent[0].notes, None);

        let items = orders.items.lock().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.order_id == placed.order_id));
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].price, Decimal::from(1_000));
    }

    #[tokio::test]
    async fn test_pickup_omits_address_and_fee() {
        let orders = Arc::new(FakeOrders::default());
        let mut cart = filled_cart().await;

        let placed = service(&orders)
            .place_order(
                Some(&identity(UserRole::Customer)),
                &mut cart,
                &form(DeliveryMethod::Pickup),
            )
            .await
            .unwrap();

        assert_eq!(placed.total.grand_total, Decimal::from(3_500));
        assert_eq!(orders.orders.lock().unwrap()[0].delivery_address, None);
    }

    #[tokio::test]
    async fn test_guards_run_before_any_call() {
        let orders = Arc::new(FakeOrders::default());
        let checkout = service(&orders);
        let user = identity(UserRole::Customer);

        let mut cart = filled_cart().await;
        let err = checkout
            .place_order(None, &mut cart, &form(DeliveryMethod::Delivery))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::AuthRequired));

        let mut empty = CartStore::load(MemoryStorage::new()).await;
        let err = checkout
            .place_order(Some(&user), &mut empty, &form(DeliveryMethod::Delivery))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Invalid(ValidationError::EmptyCart)));

        let mut no_address = form(DeliveryMethod::Delivery);
        no_address.address = "  ".to_string();
        let err = checkout
            .place_order(Some(&user), &mut cart, &no_address)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Invalid(ValidationError::MissingAddress)));

        assert!(orders.orders.lock().unwrap().is_empty());
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_item_failure_keeps_cart_and_reports_order_id() {
        let orders = Arc::new(FakeOrders {
            fail_items: true,
            ..FakeOrders::default()
        });
        let mut cart = filled_cart().await;

        let err = service(&orders)
            .place_order(
                Some(&identity(UserRole::Customer)),
                &mut cart,
                &form(DeliveryMethod::Delivery),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ItemsFailed { .. }));
        assert_eq!(cart.total_items(), 5);
    }

    #[tokio::test]
    async fn test_order_failure_keeps_cart() {
        let orders = Arc::new(FakeOrders {
            fail_order: true,
            ..FakeOrders::default()
        });
        let mut cart = filled_cart().await;

        let err = service(&orders)
            .place_order(
                Some(&identity(UserRole::Customer)),
                &mut cart,
                &form(DeliveryMethod::Delivery),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::OrderFailed(_)));
        assert!(!cart.is_empty());
    }
}
