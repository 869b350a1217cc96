use bigdecimal::BigDecimal;
use num_traits::{ToPrimitive, Zero};

/// Percentage change from `old_value` to `new_value`, computed in exact decimal.
///
/// Returns `None` for a zero base so callers decide what "no change" means.
pub fn percentage_change(old_value: &BigDecimal, new_value: &BigDecimal) -> Option<BigDecimal> {
    if old_value.is_zero() {
        return None;
    }

    Some((new_value - old_value) / old_value * BigDecimal::from(100))
}

/// Arithmetic mean of a non-empty series.
pub fn mean<'a, I>(values: I) -> Option<BigDecimal>
where
    I: IntoIterator<Item = &'a BigDecimal>,
{
    let mut count: u64 = 0;
    let mut sum = BigDecimal::zero();
    for value in values {
        sum += value;
        count += 1;
    }

    if count == 0 {
        return None;
    }

    Some(sum / BigDecimal::from(count))
}

/// Lossy conversion for presentation only.
pub fn to_f64_lossy(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_percentage_change() {
        let change = percentage_change(&BigDecimal::from(100), &BigDecimal::from(150)).unwrap();
        assert_eq!(change, BigDecimal::from(50));

        let drop = percentage_change(&BigDecimal::from(200), &BigDecimal::from(150)).unwrap();
        assert_eq!(drop, BigDecimal::from(-25));
    }

    #[test]
    fn test_percentage_change_zero_base() {
        assert!(percentage_change(&BigDecimal::zero(), &BigDecimal::from(10)).is_none());
    }

    #[test]
    fn test_mean() {
        let values = vec![
            BigDecimal::from_str("0.1").unwrap(),
            BigDecimal::from_str("0.2").unwrap(),
        ];
        assert_eq!(mean(&values).unwrap(), BigDecimal::from_str("0.15").unwrap());
        assert!(mean(&Vec::<BigDecimal>::new()).is_none());
    }

    #[test]
    fn test_to_f64_lossy() {
        assert_eq!(to_f64_lossy(&BigDecimal::from(50)), 50.0);
    }
}
