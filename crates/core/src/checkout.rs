//! Checkout totals and delivery form validation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::CartLine;
use crate::types::{DeliveryMethod, Price};

/// Subtotal, delivery surcharge, and grand total for a checkout.
///
/// Always derived from the current cart; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutTotal {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub grand_total: Decimal,
}

impl CheckoutTotal {
    /// Display strings for the order summary panel.
    #[must_use]
    pub fn formatted(&self) -> FormattedTotal {
        FormattedTotal {
            subtotal: Price::naira(self.subtotal).display(),
            shipping_fee: if self.shipping_fee.is_zero() {
                "Free".to_string()
            } else {
                Price::naira(self.shipping_fee).display()
            },
            grand_total: Price::naira(self.grand_total).display(),
        }
    }
}

/// [`CheckoutTotal`] rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedTotal {
    pub subtotal: String,
    pub shipping_fee: String,
    pub grand_total: String,
}

/// Compute the checkout total for `lines`.
///
/// Pickup is free; delivery adds `flat_delivery_fee`. Inputs are not
/// validated here.
#[must_use]
pub fn compute_total(
    lines: &[CartLine],
    delivery_method: DeliveryMethod,
    flat_delivery_fee: Decimal,
) -> CheckoutTotal {
    let subtotal = lines
        .iter()
        .map(|line| line.product.price * Decimal::from(line.quantity.get()))
        .sum::<Decimal>();
    let shipping_fee = match delivery_method {
        DeliveryMethod::Pickup => Decimal::ZERO,
        DeliveryMethod::Delivery => flat_delivery_fee,
    };
    CheckoutTotal {
        subtotal,
        shipping_fee,
        grand_total: subtotal + shipping_fee,
    }
}

/// A validation failure caught before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("your cart is empty")]
    EmptyCart,
    #[error("please enter your full name")]
    MissingFullName,
    #[error("please enter your phone number")]
    MissingPhone,
    #[error("please enter your delivery address")]
    MissingAddress,
}

/// Contact and fulfilment details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub notes: String,
}

impl CheckoutForm {
    /// Check required fields in the order the form presents them.
    ///
    /// # Errors
    ///
    /// Returns the first missing field. The address is only required for
    /// home delivery.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::MissingFullName);
        }
        if self.phone.trim().is_empty() {
            return Err(ValidationError::MissingPhone);
        }
        if self.delivery_method == DeliveryMethod::Delivery && self.address.trim().is_empty() {
            return Err(ValidationError::MissingAddress);
        }
        Ok(())
    }

    /// Address to send with the order: only for delivery.
    #[must_use]
    pub fn delivery_address(&self) -> Option<&str> {
        match self.delivery_method {
            DeliveryMethod::Delivery => Some(self.address.trim()),
            DeliveryMethod::Pickup => None,
        }
    }

    /// Notes, or `None` when blank.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        Some(self.notes.trim()).filter(|n| !n.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use crate::catalog::Product;
    use crate::types::ProductId;
    use std::num::NonZeroU32;

    fn cart_of(lines: &[(i64, u32)]) -> Cart {
        let mut cart = Cart::new();
        for &(price, quantity) in lines {
            let product = Product {
                id: ProductId::random(),
                name: "Buba".to_string(),
                description: None,
                price: Decimal::from(price),
                images: vec![],
                sizes: vec![],
                stock_quantity: None,
                category_id: None,
                category: None,
                is_active: None,
                created_at: None,
            };
            cart.add(product, "M", NonZeroU32::new(quantity).unwrap());
        }
        cart
    }

    #[test]
    fn test_delivery_adds_flat_fee() {
        let cart = cart_of(&[(1_000, 2), (500, 3)]);
        let total = compute_total(cart.lines(), DeliveryMethod::Delivery, Decimal::from(3_500));
        assert_eq!(total.subtotal, Decimal::from(3_500));
        assert_eq!(total.shipping_fee, Decimal::from(3_500));
        assert_eq!(total.grand_total, Decimal::from(7_000));
    }

    #[test]
    fn test_pickup_is_free() {
        let cart = cart_of(&[(1_000, 2), (500, 3)]);
        let total = compute_total(cart.lines(), DeliveryMethod::Pickup, Decimal::from(3_500));
        assert_eq!(total.shipping_fee, Decimal::ZERO);
        assert_eq!(total.grand_total, Decimal::from(3_500));
        assert_eq!(total.formatted().shipping_fee, "Free");
        assert_eq!(total.formatted().grand_total, "₦3,500");
    }

    #[test]
    fn test_empty_cart_totals_only_fee() {
        let total = compute_total(&[], DeliveryMethod::Delivery, Decimal::from(3_500));
        assert_eq!(total.subtotal, Decimal::ZERO);
        assert_eq!(total.grand_total, Decimal::from(3_500));
    }

    #[test]
    fn test_form_validation_order() {
        let mut form = CheckoutForm::default();
        assert_eq!(form.validate(), Err(ValidationError::MissingFullName));

        form.full_name = "Ada Obi".to_string();
        assert_eq!(form.validate(), Err(ValidationError::MissingPhone));

        form.phone = "0803 000 0000".to_string();
        assert_eq!(form.validate(), Err(ValidationError::MissingAddress));

        form.delivery_method = DeliveryMethod::Pickup;
        assert_eq!(form.validate(), Ok(()));
        assert_eq!(form.delivery_address(), None);
    }

    #[test]
    fn test_form_whitespace_only_is_missing() {
        let form = CheckoutForm {
            full_name: "Ada".to_string(),
            phone: "080".to_string(),
            address: "   ".to_string(),
            ..CheckoutForm::default()
        };
        assert_eq!(form.validate(), Err(ValidationError::MissingAddress));
        assert_eq!(form.notes(), None);
    }
}
