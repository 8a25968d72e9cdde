// src/models/coupon.rs
//! Coupon data model.
//!
//! A coupon is an issuer signature over the canonical encoding of
//! `(class, actor[, extra parameters])`. The class discriminant is the domain
//! separator: a coupon issued for one class never verifies for another.
//!
//! # Lifecycle
//! Coupons are created once by the batch issuance driver and are immutable
//! afterwards. Revocation happens on the verifier side (see
//! [`crate::services::verifier::PhasePolicy`]); coupon bytes are never changed.

use crate::error::EncodingError;
use crate::models::actor::ActorIdentifier;
use crate::utils::abi_encoding::{AbiType, AbiValue};
use ethers_core::types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Restricted-action classes a coupon can unlock.
///
/// The numeric values are shared with the deployed verifier and must never be
/// renumbered; doing so invalidates every coupon of the affected class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum CouponClass {
    Genesis = 0,
    Author = 1,
    Presale = 2,
}

impl CouponClass {
    /// Every class, in discriminant order.
    pub const ALL: [CouponClass; 3] = [CouponClass::Genesis, CouponClass::Author, CouponClass::Presale];

    /// Stable numeric discriminant.
    pub fn discriminant(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            CouponClass::Genesis => "Genesis",
            CouponClass::Author => "Author",
            CouponClass::Presale => "Presale",
        }
    }
}

impl TryFrom<u8> for CouponClass {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CouponClass::Genesis),
            1 => Ok(CouponClass::Author),
            2 => Ok(CouponClass::Presale),
            other => Err(EncodingError::UnknownCouponClass(other.to_string())),
        }
    }
}

impl From<CouponClass> for u8 {
    fn from(class: CouponClass) -> Self {
        class.discriminant()
    }
}

/// Accepts either the discriminant (`"2"`) or the name (`"presale"`, any case).
impl FromStr for CouponClass {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(value) = s.parse::<u8>() {
            return CouponClass::try_from(value);
        }
        CouponClass::ALL
            .into_iter()
            .find(|class| class.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| EncodingError::UnknownCouponClass(s.to_string()))
    }
}

impl fmt::Display for CouponClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.discriminant())
    }
}

/// The message a coupon signs: class, actor, and optional static parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CouponPayload {
    pub class: CouponClass,
    pub actor: ActorIdentifier,
    /// Extra typed fields appended after the actor, e.g. a per-actor mint cap.
    pub extra: Vec<(AbiType, AbiValue)>,
}

impl CouponPayload {
    /// Payload with no extra parameters, the form used for all current classes.
    pub fn new(class: CouponClass, actor: ActorIdentifier) -> Self {
        CouponPayload {
            class,
            actor,
            extra: Vec::new(),
        }
    }

    /// Appends one extra typed parameter.
    pub fn with_param(mut self, ty: AbiType, value: AbiValue) -> Self {
        self.extra.push((ty, value));
        self
    }

    /// Ordered type list: `uint256, address, extra...`.
    pub fn types(&self) -> Vec<AbiType> {
        let mut types = vec![AbiType::Uint(256), AbiType::Address];
        types.extend(self.extra.iter().map(|(ty, _)| *ty));
        types
    }

    /// Ordered value list matching [`CouponPayload::types`].
    pub fn values(&self) -> Vec<AbiValue> {
        let mut values = vec![
            AbiValue::Uint(U256::from(self.class.discriminant())),
            AbiValue::Address(self.actor.address()),
        ];
        values.extend(self.extra.iter().map(|(_, value)| value.clone()));
        values
    }
}

/// Raw recoverable ECDSA signature.
///
/// `v` follows the Ethereum convention: `27 + recovery_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CouponSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

/// Offset added to the recovery id to form `v`.
pub const RECOVERY_BYTE_OFFSET: u8 = 27;

/// Transport form of a coupon: fixed-width hex `r`/`s` and numeric `v`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// `0x`-prefixed, 64 lowercase hex digits
    pub r: String,
    /// `0x`-prefixed, 64 lowercase hex digits
    pub s: String,
    /// Recovery byte, 27 or 28
    pub v: u8,
}

/// Per-actor entry of a distribution document: `{ "coupon": { r, s, v } }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponEnvelope {
    pub coupon: Coupon,
}

/// Issued coupons keyed by normalized actor.
pub type CouponBook = BTreeMap<ActorIdentifier, Coupon>;

/// Distribution document written for front-ends, keyed by checksummed address.
pub type CouponDistribution = BTreeMap<ActorIdentifier, CouponEnvelope>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_discriminants_are_stable() {
        assert_eq!(CouponClass::Genesis.discriminant(), 0);
        assert_eq!(CouponClass::Author.discriminant(), 1);
        assert_eq!(CouponClass::Presale.discriminant(), 2);
    }

    #[test]
    fn test_class_parsing() {
        assert_eq!("2".parse::<CouponClass>().unwrap(), CouponClass::Presale);
        assert_eq!("author".parse::<CouponClass>().unwrap(), CouponClass::Author);
        assert_eq!("GENESIS".parse::<CouponClass>().unwrap(), CouponClass::Genesis);
        assert!("3".parse::<CouponClass>().is_err());
        assert!("whitelist".parse::<CouponClass>().is_err());
        assert!(CouponClass::try_from(7u8).is_err());
    }

    #[test]
    fn test_class_serde_is_numeric() {
        assert_eq!(serde_json::to_string(&CouponClass::Presale).unwrap(), "2");
        let parsed: CouponClass = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, CouponClass::Author);
        assert!(serde_json::from_str::<CouponClass>("9").is_err());
    }

    #[test]
    fn test_payload_type_and_value_lists_line_up() {
        let actor = ActorIdentifier::parse("0x00000000000000000000000000000000000000aa").unwrap();
        let payload = CouponPayload::new(CouponClass::Author, actor)
            .with_param(AbiType::Uint(16), AbiValue::Uint(U256::from(5u8)));

        assert_eq!(payload.types(), vec![AbiType::Uint(256), AbiType::Address, AbiType::Uint(16)]);
        assert_eq!(payload.values().len(), 3);
        assert_eq!(payload.values()[0], AbiValue::Uint(U256::one()));
    }
}
