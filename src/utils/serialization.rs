// src/utils/serialization.rs
//! Serialization utilities for coupons.
//!
//! Provides:
//! - Conversion between raw signatures and their fixed-width hex transport form
//! - JSON encoding of coupon distribution documents

use crate::error::MalformedCouponError;
use crate::models::coupon::{
    Coupon, CouponBook, CouponDistribution, CouponEnvelope, CouponSignature, RECOVERY_BYTE_OFFSET,
};
use ethers_core::utils::hex;
use serde::{Deserialize, Serialize};

/// Hex digits in one 32-byte signature component.
const COMPONENT_HEX_LEN: usize = 64;

/// Serializes a value to a pretty-printed JSON string.
///
/// # Arguments
/// * `data` - The value to serialize (must implement `Serialize`)
///
/// # Returns
/// - `Ok(String)` with JSON representation on success
/// - `Err(serde_json::Error)` if serialization fails
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

/// Deserializes a value from a JSON string.
///
/// # Arguments
/// * `data` - JSON string to deserialize
///
/// # Returns
/// - `Ok(T)` with deserialized value on success
/// - `Err(serde_json::Error)` if deserialization fails
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}

/// Converts a raw signature into its transport form.
///
/// `r` and `s` become `0x`-prefixed 64-digit lowercase hex; `v` is copied.
pub fn serialize_coupon(signature: &CouponSignature) -> Coupon {
    Coupon {
        r: format!("0x{}", hex::encode(signature.r)),
        s: format!("0x{}", hex::encode(signature.s)),
        v: signature.v,
    }
}

/// Parses a transport coupon back into a raw signature.
///
/// The `0x` prefix is optional and hex digits may be of either case.
///
/// # Errors
/// - `FieldWidth` when `r` or `s` is not exactly 64 hex digits
/// - `InvalidHex` for non-hex content
/// - `InvalidRecoveryByte` when `v` is not 27 or 28
pub fn deserialize_coupon(coupon: &Coupon) -> Result<CouponSignature, MalformedCouponError> {
    if coupon.v != RECOVERY_BYTE_OFFSET && coupon.v != RECOVERY_BYTE_OFFSET + 1 {
        return Err(MalformedCouponError::InvalidRecoveryByte(coupon.v));
    }

    Ok(CouponSignature {
        r: parse_component("r", &coupon.r)?,
        s: parse_component("s", &coupon.s)?,
        v: coupon.v,
    })
}

fn parse_component(field: &'static str, text: &str) -> Result<[u8; 32], MalformedCouponError> {
    let body = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    if body.len() != COMPONENT_HEX_LEN {
        return Err(MalformedCouponError::FieldWidth {
            field,
            expected: COMPONENT_HEX_LEN,
            actual: body.len(),
        });
    }
    if !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MalformedCouponError::InvalidHex {
            field,
            reason: "contains non-hex characters".to_string(),
        });
    }

    let bytes = hex::decode(body).map_err(|e| MalformedCouponError::InvalidHex {
        field,
        reason: e.to_string(),
    })?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Wraps each coupon in the `{ "coupon": … }` envelope front-ends expect.
pub fn to_distribution(book: &CouponBook) -> CouponDistribution {
    book.iter()
        .map(|(actor, coupon)| {
            (
                *actor,
                CouponEnvelope {
                    coupon: coupon.clone(),
                },
            )
        })
        .collect()
}

/// Renders a coupon book as a distribution JSON document.
pub fn distribution_json(book: &CouponBook) -> Result<String, serde_json::Error> {
    serialize(&to_distribution(book))
}

/// Parses a distribution JSON document back into a coupon book.
///
/// Keys are normalized on the way in, so documents keyed by lowercase or
/// checksummed addresses load identically.
pub fn parse_distribution(data: &str) -> Result<CouponBook, serde_json::Error> {
    let distribution: CouponDistribution = deserialize(data)?;
    Ok(distribution
        .into_iter()
        .map(|(actor, envelope)| (actor, envelope.coupon))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actor::ActorIdentifier;
    use proptest::prelude::*;

    fn sample_signature() -> CouponSignature {
        CouponSignature {
            r: [0x11; 32],
            s: [0x2f; 32],
            v: 28,
        }
    }

    #[test]
    fn test_coupon_fields_are_fixed_width_hex() {
        let coupon = serialize_coupon(&sample_signature());
        assert_eq!(coupon.r, format!("0x{}", "11".repeat(32)));
        assert_eq!(coupon.s, format!("0x{}", "2f".repeat(32)));
        assert_eq!(coupon.v, 28);
    }

    #[test]
    fn test_prefix_and_case_are_optional() {
        let coupon = Coupon {
            r: "11".repeat(32),
            s: format!("0X{}", "2F".repeat(32)),
            v: 28,
        };
        assert_eq!(deserialize_coupon(&coupon).unwrap(), sample_signature());
    }

    #[test]
    fn test_out_of_range_v_rejected() {
        for v in [0u8, 1, 26, 29, 255] {
            let mut coupon = serialize_coupon(&sample_signature());
            coupon.v = v;
            assert_eq!(
                deserialize_coupon(&coupon),
                Err(MalformedCouponError::InvalidRecoveryByte(v))
            );
        }
    }

    #[test]
    fn test_wrong_width_rejected() {
        let mut coupon = serialize_coupon(&sample_signature());
        coupon.r.push('0');
        assert!(matches!(
            deserialize_coupon(&coupon),
            Err(MalformedCouponError::FieldWidth { field: "r", expected: 64, actual: 65 })
        ));

        let mut coupon = serialize_coupon(&sample_signature());
        coupon.s.truncate(10);
        assert!(matches!(
            deserialize_coupon(&coupon),
            Err(MalformedCouponError::FieldWidth { field: "s", .. })
        ));
    }

    #[test]
    fn test_non_hex_rejected() {
        let mut coupon = serialize_coupon(&sample_signature());
        coupon.s = format!("0x{}zz", "00".repeat(31));
        assert!(matches!(
            deserialize_coupon(&coupon),
            Err(MalformedCouponError::InvalidHex { field: "s", .. })
        ));
    }

    #[test]
    fn test_distribution_document_shape() {
        let actor = ActorIdentifier::parse("0xabcdef0123456789abcdef0123456789abcd1234").unwrap();
        let mut book = CouponBook::new();
        book.insert(actor, serialize_coupon(&sample_signature()));

        let json = distribution_json(&book).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &value[actor.to_checksum()]["coupon"];
        assert_eq!(entry["v"], 28);
        assert_eq!(entry["r"], format!("0x{}", "11".repeat(32)));

        assert_eq!(parse_distribution(&json).unwrap(), book);
    }

    proptest! {
        /// Property: deserialize(serialize(s)) == s
        #[test]
        fn prop_coupon_serialization_inverts(
            r in any::<[u8; 32]>(),
            s in any::<[u8; 32]>(),
            parity in any::<bool>(),
        ) {
            let signature = CouponSignature { r, s, v: 27 + u8::from(parity) };
            prop_assert_eq!(deserialize_coupon(&serialize_coupon(&signature)).unwrap(), signature);
        }
    }
}
