use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use std::ops::RangeInclusive;

/// Maps a request price to the number of connects an officer must escrow to
/// apply.
///
/// Implementations must be pure: the same price always yields the same
/// requirement. Plain closures qualify.
pub trait ConnectRequirement: Send + Sync {
    fn required_for(&self, price: Decimal) -> u32;

    /// Range an explicitly supplied requirement must fall in.
    fn bounds(&self) -> RangeInclusive<u32> {
        1..=10
    }
}

impl<F> ConnectRequirement for F
where
    F: Fn(Decimal) -> u32 + Send + Sync,
{
    fn required_for(&self, price: Decimal) -> u32 {
        self(price)
    }
}

/// `ceil(price / price_per_connect)` clamped to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRequirement {
    price_per_connect: Decimal,
    min: u32,
    max: u32,
}

impl StepRequirement {
    pub fn new(price_per_connect: Decimal, min: u32, max: u32) -> Result<Self> {
        if price_per_connect <= Decimal::ZERO {
            return Err(PaymentError::Validation(
                "price per connect must be positive".to_string(),
            ));
        }
        if min == 0 || min > max {
            return Err(PaymentError::Validation(format!(
                "invalid required connect bounds [{min}, {max}]"
            )));
        }
        Ok(Self {
            price_per_connect,
            min,
            max,
        })
    }
}

impl Default for StepRequirement {
    fn default() -> Self {
        Self {
            price_per_connect: dec!(100),
            min: 1,
            max: 10,
        }
    }
}

impl ConnectRequirement for StepRequirement {
    fn required_for(&self, price: Decimal) -> u32 {
        // Overflow only happens far above the cap.
        let Some(steps) = price.checked_div(self.price_per_connect) else {
            return self.max;
        };
        let steps = steps.ceil();
        if steps <= Decimal::from(self.min) {
            self.min
        } else if steps >= Decimal::from(self.max) {
            self.max
        } else {
            steps.to_u32().unwrap_or(self.max)
        }
    }

    fn bounds(&self) -> RangeInclusive<u32> {
        self.min..=self.max
    }
}

/// Price of a single purchased connect. Used both when a purchase is
/// initialized and when its payment is reconciled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectPricing {
    unit_price: Decimal,
}

impl ConnectPricing {
    pub fn new(unit_price: Decimal) -> Result<Self> {
        if unit_price <= Decimal::ZERO {
            return Err(PaymentError::Validation(
                "connect unit price must be positive".to_string(),
            ));
        }
        Ok(Self { unit_price })
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn charge_for(&self, quantity: u32) -> Result<Decimal> {
        self.unit_price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| {
                PaymentError::Validation(format!("charge for {quantity} connects overflows"))
            })
    }
}

impl Default for ConnectPricing {
    fn default() -> Self {
        Self {
            unit_price: dec!(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_requirement_examples() {
        let policy = StepRequirement::default();
        assert_eq!(policy.required_for(dec!(250)), 3);
        assert_eq!(policy.required_for(dec!(100)), 1);
        assert_eq!(policy.required_for(dec!(100.01)), 2);
        assert_eq!(policy.required_for(dec!(0.5)), 1);
        assert_eq!(policy.required_for(dec!(5000)), 10);
    }

    #[test]
    fn test_step_requirement_is_monotonic() {
        let policy = StepRequirement::default();
        let mut previous = 0;
        for cents in (1..200_000).step_by(997) {
            let required = policy.required_for(Decimal::new(cents, 2));
            assert!(required >= previous);
            assert!((1..=10).contains(&required));
            previous = required;
        }
    }

    #[test]
    fn test_step_requirement_rejects_bad_bounds() {
        assert!(StepRequirement::new(dec!(0), 1, 10).is_err());
        assert!(StepRequirement::new(dec!(100), 0, 10).is_err());
        assert!(StepRequirement::new(dec!(100), 5, 4).is_err());
    }

    #[test]
    fn test_closure_requirement() {
        let flat = |_: Decimal| 2u32;
        assert_eq!(flat.required_for(dec!(999)), 2);
        assert_eq!(flat.bounds(), 1..=10);
    }

    #[test]
    fn test_connect_pricing() {
        let pricing = ConnectPricing::default();
        assert_eq!(pricing.charge_for(4).unwrap(), dec!(40));
        assert!(ConnectPricing::new(dec!(-1)).is_err());
    }

    #[test]
    fn test_huge_price_clamps_to_max() {
        let policy = StepRequirement::new(dec!(0.01), 1, 10).unwrap();
        assert_eq!(policy.required_for(Decimal::MAX), 10);
        assert_eq!(policy.required_for(dec!(0.01)), 1);
    }

    #[test]
    fn test_overflowing_charge_is_rejected() {
        let pricing = ConnectPricing::new(Decimal::MAX).unwrap();
        assert!(matches!(
            pricing.charge_for(2),
            Err(PaymentError::Validation(_))
        ));
        assert_eq!(pricing.charge_for(1).unwrap(), Decimal::MAX);
    }
}
