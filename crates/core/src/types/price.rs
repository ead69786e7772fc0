//! Monetary amounts and their display formatting.
//!
//! The store operates in a single currency (Nigerian naira) and shows prices
//! in whole units with thousands separators, e.g. `₦12,000`. Arithmetic is
//! done on [`Decimal`] so subtotals never accumulate float error.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (naira, not kobo).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// A zero amount in the store currency.
    pub const ZERO: Self = Self::naira(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in the store currency.
    #[must_use]
    pub const fn naira(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::NGN)
    }

    /// Multiply a unit price by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Format for display with zero minor digits, e.g. `₦12,000`.
    ///
    /// Fractional amounts are rounded half away from zero.
    #[must_use]
    pub fn display(&self) -> String {
        let whole = self
            .amount
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let sign = if whole.is_sign_negative() && !whole.is_zero() {
            "-"
        } else {
            ""
        };
        let digits = whole.abs().trunc().to_string();
        format!(
            "{sign}{}{}",
            self.currency_code.symbol(),
            group_thousands(&digits)
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Format an amount in the store currency, e.g. `₦3,500`.
#[must_use]
pub fn format_naira(amount: Decimal) -> String {
    Price::naira(amount).display()
}

/// Insert `,` every three digits from the right.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// ISO 4217 currency codes the store can price in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    NGN,
    USD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::NGN => "₦",
            Self::USD => "$",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_whole_units_with_grouping() {
        assert_eq!(format_naira(Decimal::from(12_000)), "₦12,000");
        assert_eq!(format_naira(Decimal::from(3_500)), "₦3,500");
        assert_eq!(format_naira(Decimal::from(999)), "₦999");
        assert_eq!(format_naira(Decimal::from(1_250_000)), "₦1,250,000");
        assert_eq!(format_naira(Decimal::ZERO), "₦0");
    }

    #[test]
    fn test_display_rounds_fractional_amounts() {
        assert_eq!(format_naira(Decimal::new(1_999_50, 2)), "₦2,000");
        assert_eq!(format_naira(Decimal::new(1_999_49, 2)), "₦1,999");
    }

    #[test]
    fn test_display_negative() {
        assert_eq!(format_naira(Decimal::from(-4_500)), "-₦4,500");
    }

    #[test]
    fn test_times_and_sum() {
        let unit = Price::naira(Decimal::from(1_000));
        let total: Price = [unit.times(2), Price::naira(Decimal::from(500)).times(3)]
            .into_iter()
            .sum();
        assert_eq!(total.amount, Decimal::from(3_500));
        assert_eq!(total.currency_code, CurrencyCode::NGN);
    }
}
