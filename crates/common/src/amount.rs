//! Fixed-point currency amounts.
//!
//! Balances are held in minor units (hundredths) as `u64`. An unsigned
//! representation makes a negative balance unrepresentable, and every
//! mutation goes through the checked helpers below.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minor units per whole unit.
pub const MINOR_PER_UNIT: u64 = 100;

/// Maximum number of fractional digits accepted by the parser.
const MAX_FRACTION_DIGITS: usize = 2;

/// Non-negative currency amount in minor units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Whole units, saturating at `u64::MAX` minor units.
    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self(units.saturating_mul(MINOR_PER_UNIT))
    }

    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    #[must_use]
    pub const fn minor(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    #[must_use]
    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / MINOR_PER_UNIT, self.0 % MINOR_PER_UNIT)
    }
}

/// Error returned when a decimal amount string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,

    #[error("amount {0:?} is not a non-negative decimal")]
    Malformed(String),

    #[error("amount {0:?} has more than two fractional digits")]
    TooPrecise(String),

    #[error("amount {0:?} is too large")]
    Overflow(String),
}

impl FromStr for Amount {
    type Err = AmountParseError;

    /// Accepts `123`, `123.4` and `123.45`. Signs, exponents and bare
    /// points are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (whole, fraction) = match s.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (s, None),
        };

        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || fraction.is_some_and(|f| !all_digits(f)) {
            return Err(AmountParseError::Malformed(s.to_string()));
        }

        let fraction = fraction.unwrap_or("");
        if fraction.len() > MAX_FRACTION_DIGITS {
            return Err(AmountParseError::TooPrecise(s.to_string()));
        }

        let overflow = || AmountParseError::Overflow(s.to_string());
        let whole: u64 = whole.parse().map_err(|_| overflow())?;
        let mut minor_fraction: u64 = 0;
        for (i, b) in fraction.bytes().enumerate() {
            let digit = u64::from(b - b'0');
            minor_fraction += digit * 10u64.pow((MAX_FRACTION_DIGITS - 1 - i) as u32);
        }

        whole
            .checked_mul(MINOR_PER_UNIT)
            .and_then(|m| m.checked_add(minor_fraction))
            .map(Amount)
            .ok_or_else(overflow)
    }
}

/// Serde adapter for human-facing amounts in configuration files.
///
/// Accepts an integer (`15`), a float (`2.5`) or a decimal string (`"2.50"`),
/// all interpreted as whole units. Serializes as a decimal string.
pub mod units {
    use super::Amount;
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u64),
        Float(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Int(units) => units
                .checked_mul(super::MINOR_PER_UNIT)
                .map(Amount::from_minor)
                .ok_or_else(|| de::Error::custom("amount overflow")),
            Repr::Float(value) => format!("{value}").parse().map_err(de::Error::custom),
            Repr::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!("10".parse::<Amount>(), Ok(Amount::from_units(10)));
        assert_eq!("10.5".parse::<Amount>(), Ok(Amount::from_minor(1050)));
        assert_eq!("10.25".parse::<Amount>(), Ok(Amount::from_minor(1025)));
        assert_eq!("0".parse::<Amount>(), Ok(Amount::ZERO));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["-1", "+1", "1.", ".5", "1e3", "ten", "1.2.3"] {
            assert!(
                matches!(bad.parse::<Amount>(), Err(AmountParseError::Malformed(_))),
                "{bad} should be malformed"
            );
        }
        assert_eq!("".parse::<Amount>(), Err(AmountParseError::Empty));
        assert!(matches!("1.234".parse::<Amount>(), Err(AmountParseError::TooPrecise(_))));
        assert!(matches!(
            "184467440737095516160".parse::<Amount>(),
            Err(AmountParseError::Overflow(_))
        ));
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Amount::from_units(300).to_string(), "300.00");
        assert_eq!(Amount::from_minor(1005).to_string(), "10.05");
    }

    #[test]
    fn checked_arithmetic() {
        let a = Amount::from_units(5);
        assert_eq!(a.checked_add(a), Some(Amount::from_units(10)));
        assert_eq!(Amount::from_minor(u64::MAX).checked_add(Amount::from_minor(1)), None);
    }
}
