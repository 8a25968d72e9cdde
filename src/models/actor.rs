// src/models/actor.rs
//! Actor identifiers: the 20-byte addresses coupons are scoped to.
//!
//! Identifiers arrive as text from allow-lists and are normalized here before
//! they reach the encoder, so `0xABCD…`, `0xabcd…` and the EIP-55 checksummed
//! spelling of one address all produce the same bytes.

use crate::error::EncodingError;
use ethers_core::types::Address;
use ethers_core::utils::{hex, to_checksum};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of an identifier in bytes.
pub const IDENTIFIER_LEN: usize = 20;

/// A normalized 20-byte actor identifier.
///
/// Ordering follows the raw bytes, which keeps coupon books stable when
/// written out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorIdentifier(Address);

impl ActorIdentifier {
    /// Wraps already-canonical address bytes.
    pub fn from_address(address: Address) -> Self {
        ActorIdentifier(address)
    }

    /// Parses and normalizes a textual identifier.
    ///
    /// # Accepted forms
    /// - 40 hex digits, with or without a `0x` prefix
    /// - all-lowercase or all-uppercase digits (no checksum applied)
    /// - mixed case only when it is a valid EIP-55 checksum
    ///
    /// # Errors
    /// `EncodingError::InvalidIdentifier` naming the rejected input.
    pub fn parse(input: &str) -> Result<Self, EncodingError> {
        let invalid = |reason: &str| EncodingError::InvalidIdentifier {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if body.len() != IDENTIFIER_LEN * 2 {
            return Err(invalid(&format!(
                "expected {} hex digits, found {}",
                IDENTIFIER_LEN * 2,
                body.len()
            )));
        }
        if !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("contains non-hex characters"));
        }

        let bytes = hex::decode(body).map_err(|e| invalid(&e.to_string()))?;
        let address = Address::from_slice(&bytes);

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            let expected = to_checksum(&address, None);
            if expected[2..] != *body {
                return Err(invalid("mixed-case checksum does not match"));
            }
        }

        Ok(ActorIdentifier(address))
    }

    /// The underlying address.
    pub fn address(&self) -> Address {
        self.0
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// EIP-55 checksummed spelling, as used for distribution file keys.
    pub fn to_checksum(&self) -> String {
        to_checksum(&self.0, None)
    }
}

impl From<Address> for ActorIdentifier {
    fn from(address: Address) -> Self {
        ActorIdentifier(address)
    }
}

impl FromStr for ActorIdentifier {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActorIdentifier::parse(s)
    }
}

/// Lowercase `0x`-prefixed form.
impl fmt::Display for ActorIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl Serialize for ActorIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for ActorIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        ActorIdentifier::parse(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOWER: &str = "0xabcdef0123456789abcdef0123456789abcd1234";

    #[test]
    fn test_case_variants_normalize_identically() {
        let lower = ActorIdentifier::parse(LOWER).unwrap();
        let upper = ActorIdentifier::parse(&format!("0x{}", LOWER[2..].to_uppercase())).unwrap();
        let bare = ActorIdentifier::parse(&LOWER[2..]).unwrap();
        let checksummed = ActorIdentifier::parse(&lower.to_checksum()).unwrap();

        assert_eq!(lower, upper);
        assert_eq!(lower, bare);
        assert_eq!(lower, checksummed);
        assert_eq!(lower.to_string(), LOWER);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let checksummed = ActorIdentifier::parse(LOWER).unwrap().to_checksum();
        // Flip the case of the first letter to break the checksum.
        let mut chars: Vec<char> = checksummed.chars().collect();
        let pos = chars
            .iter()
            .enumerate()
            .skip(2)
            .find(|(_, c)| c.is_ascii_alphabetic())
            .map(|(i, _)| i)
            .unwrap();
        chars[pos] = if chars[pos].is_ascii_uppercase() {
            chars[pos].to_ascii_lowercase()
        } else {
            chars[pos].to_ascii_uppercase()
        };
        let broken: String = chars.into_iter().collect();

        assert!(matches!(
            ActorIdentifier::parse(&broken),
            Err(EncodingError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_wrong_length_and_non_hex_rejected() {
        assert!(ActorIdentifier::parse("0x1234").is_err());
        assert!(ActorIdentifier::parse(&format!("{}00", LOWER)).is_err());
        assert!(ActorIdentifier::parse("0xzzcdef0123456789abcdef0123456789abcd1234").is_err());
        assert!(ActorIdentifier::parse("").is_err());
    }

    #[test]
    fn test_serde_uses_checksum_form() {
        let id = ActorIdentifier::parse(LOWER).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_checksum()));

        let back: ActorIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
