//! Conversion between display units ("100.5 tokens") and the ledger's
//! smallest indivisible units.

use primitive_types::U256;

use crate::ledger::{Amount, DECIMALS};

/// Largest power of ten that fits in 256 bits.
const MAX_DECIMALS: u8 = 77;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid character in amount {0:?}")]
    InvalidDigit(String),
    #[error("amount has {actual} fractional digits, at most {max} allowed")]
    TooManyDecimals { max: u8, actual: usize },
    #[error("amount does not fit in 256 bits")]
    Overflow,
    #[error("unsupported decimals {0}")]
    UnsupportedDecimals(u8),
}

/// `n` whole tokens at the ledger's fixed precision.
pub fn tokens(n: u64) -> Amount {
    U256::from(n) * U256::exp10(DECIMALS as usize)
}

/// Parses a decimal display amount into smallest units.
pub fn parse_units(text: &str, decimals: u8) -> Result<Amount, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    let text = text.trim().replace('_', "");
    if text.is_empty() {
        return Err(UnitsError::Empty);
    }
    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text.as_str(), ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Empty);
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(UnitsError::InvalidDigit(text.clone()));
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooManyDecimals {
            max: decimals,
            actual: frac.len(),
        });
    }

    let scale = U256::exp10(decimals as usize);
    let whole_value = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|_| UnitsError::Overflow)?
    };
    let mut padded = frac.to_string();
    padded.extend(std::iter::repeat('0').take(decimals as usize - frac.len()));
    let frac_value = if padded.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(&padded).map_err(|_| UnitsError::Overflow)?
    };

    whole_value
        .checked_mul(scale)
        .and_then(|scaled| scaled.checked_add(frac_value))
        .ok_or(UnitsError::Overflow)
}

/// Renders smallest units as a display amount, trimming trailing zeros.
pub fn format_units(amount: Amount, decimals: u8) -> String {
    let decimals = decimals.min(MAX_DECIMALS) as usize;
    let (whole, frac) = amount.div_mod(U256::exp10(decimals));
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Serde adapter writing amounts as decimal strings of smallest units.
pub mod serde_amount {
    use primitive_types::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        U256::from_dec_str(encoded.trim())
            .map_err(|e| D::Error::custom(format!("invalid amount {encoded:?}: {e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_scales_by_eighteen_decimals() {
        assert_eq!(tokens(1), U256::exp10(18));
        assert_eq!(tokens(100), U256::from(100u64) * U256::exp10(18));
        assert_eq!(tokens(0), U256::zero());
    }

    #[test]
    fn parse_whole_and_fractional() {
        assert_eq!(parse_units("100", 18).unwrap(), tokens(100));
        assert_eq!(parse_units("1_000_000", 18).unwrap(), tokens(1_000_000));
        assert_eq!(
            parse_units("1.5", 18).unwrap(),
            U256::from(15u64) * U256::exp10(17)
        );
        assert_eq!(parse_units(".25", 2).unwrap(), U256::from(25u64));
        assert_eq!(parse_units("7", 0).unwrap(), U256::from(7u64));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(parse_units("", 18), Err(UnitsError::Empty));
        assert_eq!(parse_units(".", 18), Err(UnitsError::Empty));
        assert!(matches!(
            parse_units("-5", 18),
            Err(UnitsError::InvalidDigit(_))
        ));
        assert!(matches!(
            parse_units("1.2.3", 18),
            Err(UnitsError::InvalidDigit(_))
        ));
        assert_eq!(
            parse_units("0.001", 2),
            Err(UnitsError::TooManyDecimals { max: 2, actual: 3 })
        );
        let huge = "9".repeat(80);
        assert_eq!(parse_units(&huge, 18), Err(UnitsError::Overflow));
        assert_eq!(
            parse_units("1", 78),
            Err(UnitsError::UnsupportedDecimals(78))
        );
    }

    #[test]
    fn format_trims_trailing_zeros() {
        assert_eq!(format_units(tokens(999_900), 18), "999900");
        assert_eq!(
            format_units(U256::from(15u64) * U256::exp10(17), 18),
            "1.5"
        );
        assert_eq!(format_units(U256::one(), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::zero(), 18), "0");
    }

    #[test]
    fn serde_amount_is_decimal_string() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Wrapper {
            #[serde(with = "serde_amount")]
            value: U256,
        }
        let w = Wrapper { value: tokens(2) };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"value":"2000000000000000000"}"#);
        assert_eq!(serde_json::from_str::<Wrapper>(&json).unwrap(), w);
        assert!(serde_json::from_str::<Wrapper>(r#"{"value":"0x10"}"#).is_err());
    }
}
