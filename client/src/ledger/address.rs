//! Ledger addresses.
//!
//! An address is the `0x`-prefixed, 40-hex-digit identifier the ledger keys
//! everything by. Input is normalized to lowercase on parse so that equality
//! — and in particular the owner check — is case-insensitive, the way the
//! ledger itself treats addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Hex-digit length of an address payload (20 bytes).
const ADDRESS_HEX_LEN: usize = 40;

/// Errors produced when parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The input string was empty.
    #[error("address is empty")]
    Empty,

    /// The input did not start with `0x`.
    #[error("address must start with 0x")]
    MissingPrefix,

    /// The hex payload had the wrong length.
    #[error("address has {got} hex digits, expected {ADDRESS_HEX_LEN}")]
    WrongLength {
        /// Number of hex digits in the rejected input.
        got: usize,
    },

    /// The payload contained a non-hex character.
    #[error("address contains a non-hex character")]
    InvalidHex,
}

/// A normalized ledger address.
///
/// Construction goes through [`Address::parse`], which validates the format
/// and lowercases the payload. Two addresses that differ only in hex casing
/// compare equal after parsing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parses and normalizes an address string.
    ///
    /// # Errors
    ///
    /// Returns an [`AddressError`] for an empty string, a missing `0x`
    /// prefix, a payload that is not exactly 40 hex digits, or non-hex
    /// characters.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        if input.is_empty() {
            return Err(AddressError::Empty);
        }
        let payload = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        if payload.len() != ADDRESS_HEX_LEN {
            return Err(AddressError::WrongLength { got: payload.len() });
        }
        hex::decode(payload).map_err(|_| AddressError::InvalidHex)?;
        Ok(Address(format!("0x{}", payload.to_lowercase())))
    }

    /// Returns the full normalized string form (`0x` + 40 lowercase hex).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the truncated display form used in user-facing messages:
    /// the first six and last four characters, e.g. `0x1234…abcd`.
    pub fn short(&self) -> String {
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    #[test]
    fn parses_valid_address() {
        let addr = Address::parse(ALICE).unwrap();
        assert_eq!(addr.as_str(), ALICE);
    }

    #[test]
    fn normalizes_casing() {
        let upper = Address::parse("0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA").unwrap();
        let lower = Address::parse(ALICE).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(Address::parse(""), Err(AddressError::Empty));
        assert_eq!(
            Address::parse("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!(
            Address::parse("0xabc"),
            Err(AddressError::WrongLength { got: 3 })
        );
        assert_eq!(
            Address::parse("0xzzaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            Err(AddressError::InvalidHex)
        );
    }

    #[test]
    fn short_form() {
        let addr = Address::parse("0x1234567890abcdef1234567890abcdef12345678").unwrap();
        assert_eq!(addr.short(), "0x1234…5678");
    }

    #[test]
    fn serde_round_trip() {
        let addr = Address::parse(ALICE).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
