use crate::modules::error::SessionError;
use alloy_primitives::U256;

pub const DECIMALS: usize = 18;

/// 10^18, the number of base units in one whole token.
pub const BASE_UNITS_PER_TOKEN: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Parse a human decimal amount ("1", "0.25", ".5") into base units.
pub fn to_base_units(amount: &str) -> Result<U256, SessionError> {
    let s = amount.trim();
    let invalid = |why: &str| SessionError::InvalidAmount(format!("{why}: {amount:?}"));

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("empty amount"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a non-negative decimal"));
    }
    if frac.len() > DECIMALS {
        return Err(invalid("more than 18 fractional digits"));
    }

    let whole_units = parse_digits(whole)
        .and_then(|w| w.checked_mul(BASE_UNITS_PER_TOKEN))
        .ok_or_else(|| invalid("amount too large"))?;

    let padded = format!("{frac:0<width$}", width = DECIMALS);
    let frac_units = parse_digits(&padded).ok_or_else(|| invalid("amount too large"))?;

    whole_units
        .checked_add(frac_units)
        .ok_or_else(|| invalid("amount too large"))
}

/// Render base units as a decimal string, keeping at least one fractional digit ("1.0").
pub fn to_decimal_string(base_units: U256) -> String {
    let whole = base_units / BASE_UNITS_PER_TOKEN;
    let frac = base_units % BASE_UNITS_PER_TOKEN;

    let frac = format!("{:0>width$}", frac.to_string(), width = DECIMALS);
    let trimmed = frac.trim_end_matches('0');
    let frac = if trimmed.is_empty() { "0" } else { trimmed };

    format!("{whole}.{frac}")
}

fn parse_digits(digits: &str) -> Option<U256> {
    let ten = U256::from(10u64);
    digits.bytes().try_fold(U256::ZERO, |acc, b| {
        acc.checked_mul(ten)?
            .checked_add(U256::from(u64::from(b - b'0')))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei(s: &str) -> U256 {
        s.parse().unwrap()
    }

    #[test]
    fn whole_and_fractional_amounts() {
        assert_eq!(to_base_units("10").unwrap(), wei("10000000000000000000"));
        assert_eq!(to_base_units("1.0").unwrap(), wei("1000000000000000000"));
        assert_eq!(to_base_units("0.000000000000000001").unwrap(), U256::from(1u64));
        assert_eq!(to_base_units(".5").unwrap(), wei("500000000000000000"));
        assert_eq!(to_base_units(" 2 ").unwrap(), wei("2000000000000000000"));
        assert_eq!(to_base_units("0").unwrap(), U256::ZERO);
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["abc", "-1.0", "", "1.23456789012345678901", ".", "1e5", "+1", "1.2.3", "0x10"] {
            match to_base_units(bad) {
                Err(SessionError::InvalidAmount(_)) => {}
                other => panic!("{bad:?} should be InvalidAmount, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_values_past_u256() {
        let too_big = format!("{}0", U256::MAX);
        assert!(matches!(
            to_base_units(&too_big),
            Err(SessionError::InvalidAmount(_))
        ));
    }

    #[test]
    fn formats_like_ether_units() {
        assert_eq!(to_decimal_string(wei("1000000000000000000")), "1.0");
        assert_eq!(to_decimal_string(U256::ZERO), "0.0");
        assert_eq!(to_decimal_string(wei("1500000000000000000")), "1.5");
        assert_eq!(to_decimal_string(U256::from(1u64)), "0.000000000000000001");
        assert_eq!(to_decimal_string(wei("123000000000000000000000")), "123000.0");
    }

    #[test]
    fn formatted_values_parse_back_exactly() {
        let samples = [
            U256::ZERO,
            U256::from(1u64),
            U256::from(999_999_999_999_999_999u64),
            BASE_UNITS_PER_TOKEN,
            wei("123456789012345678901234567890"),
            U256::MAX,
        ];
        for x in samples {
            assert_eq!(to_base_units(&to_decimal_string(x)).unwrap(), x, "{x}");
        }
    }

    #[test]
    fn parsed_amounts_keep_their_value() {
        assert_eq!(to_decimal_string(to_base_units("0.10").unwrap()), "0.1");
        assert_eq!(to_decimal_string(to_base_units("42").unwrap()), "42.0");
        assert_eq!(
            to_decimal_string(to_base_units("3.141592653589793238").unwrap()),
            "3.141592653589793238"
        );
    }
}
