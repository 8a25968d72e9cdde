// src/utils/crypto.rs
//! Digest and address helpers shared by issuer and verifier.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) for all operations,
//! since the deployed verifier recomputes digests with Solidity's `keccak256()`.

use crate::error::EncodingError;
use crate::models::coupon::CouponPayload;
use crate::utils::abi_encoding;
use ethers_core::types::Address;
use ethers_core::utils::keccak256;
use k256::ecdsa::VerifyingKey;

/// 32-byte signed payload.
pub type Digest = [u8; 32];

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> Digest {
    keccak256(data)
}

/// Encodes a coupon payload and hashes it: the exact value the issuer signs.
///
/// # Errors
/// Propagates encoder failures for malformed extra parameters.
pub fn coupon_digest(payload: &CouponPayload) -> Result<Digest, EncodingError> {
    let encoded = abi_encoding::encode(&payload.types(), &payload.values())?;
    Ok(hash_data(&encoded))
}

/// Derives the Ethereum address of a secp256k1 public key.
///
/// The address is the last 20 bytes of the Keccak-256 hash of the
/// uncompressed point without its `0x04` tag.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actor::ActorIdentifier;
    use crate::models::coupon::CouponClass;
    use ethers_core::utils::hex;
    use proptest::prelude::*;

    #[test]
    fn test_hash_known_vector() {
        assert_eq!(
            hex::encode(hash_data(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_classes_are_domain_separated() {
        let actor = ActorIdentifier::parse("0xabcdef0123456789abcdef0123456789abcd1234").unwrap();
        let digests: Vec<Digest> = CouponClass::ALL
            .iter()
            .map(|class| coupon_digest(&CouponPayload::new(*class, actor)).unwrap())
            .collect();

        assert_ne!(digests[0], digests[1]);
        assert_ne!(digests[1], digests[2]);
        assert_ne!(digests[0], digests[2]);
    }

    proptest! {
        /// Property: changing any single byte of the message changes the digest
        #[test]
        fn prop_single_byte_change_alters_digest(
            message in proptest::collection::vec(any::<u8>(), 1..128),
            position in any::<prop::sample::Index>(),
            delta in 1u8..=255,
        ) {
            let mut altered = message.clone();
            let i = position.index(altered.len());
            altered[i] = altered[i].wrapping_add(delta);

            prop_assert_ne!(hash_data(&message), hash_data(&altered));
        }

        /// Property: same input always produces same digest
        #[test]
        fn prop_digest_deterministic(message in any::<Vec<u8>>()) {
            prop_assert_eq!(hash_data(&message), hash_data(&message));
        }
    }
}
