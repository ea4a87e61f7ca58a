//! Decimal quantities and monetary amounts.
//!
//! Amounts are `rust_decimal::Decimal` values rounded to the currency's number of
//! digits with banker's rounding (half to even), so the same rounding applied to
//! both sides of a double-entry move keeps it balanced.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Strictly positive quantity of a product, expressed in its unit of measure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "quantity must be positive (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl ValueObject for Quantity {}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Non-negative price per unit of measure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct UnitPrice(Decimal);

impl UnitPrice {
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "unit price cannot be negative (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl ValueObject for UnitPrice {}

impl TryFrom<Decimal> for UnitPrice {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitPrice> for Decimal {
    fn from(value: UnitPrice) -> Self {
        value.0
    }
}

/// Round an amount to `digits` decimal places, half to even.
pub fn round_to_digits(value: Decimal, digits: u32) -> Decimal {
    value.round_dp_with_strategy(digits, RoundingStrategy::MidpointNearestEven)
}

/// Extended amount of a line: `quantity × unit_price`, rounded to the currency digits.
pub fn extend_amount(
    quantity: Quantity,
    unit_price: UnitPrice,
    digits: u32,
) -> Result<Decimal, DomainError> {
    quantity
        .value()
        .checked_mul(unit_price.value())
        .map(|amount| round_to_digits(amount, digits))
        .ok_or_else(|| {
            DomainError::validation(format!(
                "line amount overflows ({quantity} × {})",
                unit_price.value()
            ))
        })
}

/// Sum of `values`, or `None` when it leaves the `Decimal` range.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quantity_rejects_zero_and_negative() {
        assert!(Quantity::new(dec!(0)).is_err());
        assert!(Quantity::new(dec!(-1.5)).is_err());
        assert_eq!(Quantity::new(dec!(3)).unwrap().value(), dec!(3));
    }

    #[test]
    fn unit_price_allows_zero() {
        assert!(UnitPrice::new(dec!(0)).is_ok());
        assert!(UnitPrice::new(dec!(-0.01)).is_err());
    }

    #[test]
    fn extend_amount_multiplies_and_rounds_half_even() {
        let q = Quantity::new(dec!(3)).unwrap();
        let p = UnitPrice::new(dec!(10)).unwrap();
        assert_eq!(extend_amount(q, p, 2).unwrap(), dec!(30));

        let q = Quantity::new(dec!(1)).unwrap();
        assert_eq!(extend_amount(q, UnitPrice::new(dec!(0.125)).unwrap(), 2).unwrap(), dec!(0.12));
        assert_eq!(extend_amount(q, UnitPrice::new(dec!(0.135)).unwrap(), 2).unwrap(), dec!(0.14));
    }

    #[test]
    fn oversized_line_amount_is_a_validation_error() {
        let q = Quantity::new(Decimal::MAX).unwrap();
        let p = UnitPrice::new(dec!(2)).unwrap();
        assert!(matches!(extend_amount(q, p, 2), Err(DomainError::Validation(_))));
        assert_eq!(extend_amount(q, UnitPrice::new(Decimal::ZERO).unwrap(), 2).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn checked_sum_reports_overflow() {
        assert_eq!(checked_sum([dec!(1.5), dec!(2)]), Some(dec!(3.5)));
        assert_eq!(checked_sum([Decimal::MAX, dec!(1)]), None);
        assert_eq!(checked_sum([Decimal::MAX, Decimal::MIN]), Some(Decimal::ZERO));
    }

    #[test]
    fn quantity_deserialization_is_validated() {
        let ok: Quantity = serde_json::from_str("\"2.5\"").unwrap();
        assert_eq!(ok.value(), dec!(2.5));
        assert!(serde_json::from_str::<Quantity>("\"0\"").is_err());
    }

    proptest! {
        #[test]
        fn rounding_never_moves_more_than_half_a_unit(cents in 0i64..10_000_000, scale in 0u32..6) {
            let value = Decimal::new(cents, scale + 2);
            let rounded = round_to_digits(value, 2);
            prop_assert!((rounded - value).abs() <= dec!(0.005));
            prop_assert!(rounded.scale() <= 2);
        }
    }
}
