use bigdecimal::{BigDecimal, ToPrimitive};

use super::errors::DomainError;

/// Number of minor units (paise, cents) in one major currency unit.
const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Convert a fixed-point major-unit amount into the integer minor units the
/// payment gateway expects, e.g. `1000.00` → `100000`.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, DomainError> {
    let minor = (amount * BigDecimal::from(MINOR_UNITS_PER_MAJOR)).round(0);
    minor
        .to_i64()
        .filter(|v| *v >= 0)
        .ok_or_else(|| DomainError::InvalidInput(format!("Amount {amount} cannot be charged")))
}

/// `unit_price * quantity`, kept in fixed point.
pub fn line_total(unit_price: &BigDecimal, quantity: i32) -> BigDecimal {
    unit_price * BigDecimal::from(quantity)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    #[test]
    fn whole_amount_converts_to_paise() {
        assert_eq!(to_minor_units(&dec("1000")).unwrap(), 100_000);
    }

    #[test]
    fn fractional_amount_converts_exactly() {
        assert_eq!(to_minor_units(&dec("19.99")).unwrap(), 1999);
    }

    #[test]
    fn sub_minor_precision_is_rounded() {
        assert_eq!(to_minor_units(&dec("0.015")).unwrap(), 2);
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(matches!(to_minor_units(&dec("-1.00")), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn line_total_multiplies_without_float_drift() {
        assert_eq!(line_total(&dec("0.10"), 3), dec("0.30"));
    }
}
