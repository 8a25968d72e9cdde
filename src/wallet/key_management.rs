// src/wallet/key_management.rs
//! Issuer key management.
//!
//! Holds the issuer's secp256k1 private key and produces recoverable
//! signatures over coupon digests.
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 curve (via `k256` crate)
//! - Deterministic ECDSA nonces (RFC 6979)
//! - Keccak-256 address derivation (via `ethers-core`)

use crate::error::SigningError;
use crate::models::actor::ActorIdentifier;
use crate::models::coupon::{CouponSignature, RECOVERY_BYTE_OFFSET};
use crate::utils::crypto::{address_from_verifying_key, Digest};
use ethers_core::utils::hex;
use k256::ecdsa::SigningKey;
use std::fmt;

/// Length of a raw secp256k1 private key.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Issuer signing key together with its derived identity.
///
/// # Security Notes
/// - The secret scalar is never exposed through `Debug` or logging
/// - `SigningKey` zeroizes its scalar on drop
/// - Signing is a pure function of (digest, key); nothing is persisted
#[derive(Clone)]
pub struct IssuerKey {
    signing_key: SigningKey,
    identity: ActorIdentifier,
}

impl IssuerKey {
    /// Generates a fresh issuer key from the system RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Loads a key from raw scalar bytes.
    ///
    /// # Errors
    /// `SigningError::InvalidKey` if the slice is not 32 bytes, is zero, or is
    /// not below the curve order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigningError> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(SigningError::InvalidKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_LEN,
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|_| SigningError::InvalidKey("scalar is zero or exceeds the curve order".into()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Loads a key from hex (with or without `0x` prefix).
    pub fn from_hex(text: &str) -> Result<Self, SigningError> {
        let trimmed = text.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(body).map_err(|e| SigningError::InvalidKey(format!("not valid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let identity = ActorIdentifier::from_address(address_from_verifying_key(signing_key.verifying_key()));
        IssuerKey { signing_key, identity }
    }

    /// Address the verifier must be configured to trust.
    pub fn identity(&self) -> ActorIdentifier {
        self.identity
    }

    /// Hex form of the private key, for the key generation utility only.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Signs a 32-byte digest.
    ///
    /// # Returns
    /// `(r, s, v)` with low `s` and `v = 27 + recovery_id`
    ///
    /// # Security
    /// - Uses deterministic ECDSA (RFC 6979), so no RNG quality is assumed
    /// - The digest is signed as-is; no further prefix or hashing is applied
    pub fn sign_digest(&self, digest: &Digest) -> Result<CouponSignature, SigningError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| SigningError::Signature(e.to_string()))?;

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(CouponSignature {
            r,
            s,
            v: RECOVERY_BYTE_OFFSET + recovery_id.to_byte(),
        })
    }
}

impl fmt::Debug for IssuerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerKey")
            .field("identity", &self.identity.to_checksum())
            .finish_non_exhaustive()
    }
}
