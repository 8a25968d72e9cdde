// src/lib.rs

//! # Coupon Issuer
//!
//! Off-chain authorization coupons for gated actions such as presale minting.
//!
//! A trusted issuer signs one coupon per eligible actor. The actor later hands
//! the coupon to a verifier, which rebuilds the same message, recovers the
//! signer and grants the action only if it is the trusted issuer. The issuer
//! never writes per-actor state anywhere.
//!
//! ## Pipeline
//! 1. **Canonical encoding**: `abi.encode(uint256 class, address actor, ...)`
//!    ([`utils::abi_encoding`])
//! 2. **Digest**: Keccak-256 of the encoding ([`utils::crypto`])
//! 3. **Signing**: recoverable secp256k1 ECDSA ([`wallet::key_management`])
//! 4. **Serialization**: fixed-width hex `{ r, s, v }` ([`utils::serialization`])
//!
//! [`services::coupon_issuer`] runs the pipeline over an allow-list;
//! [`services::verifier`] runs it backwards.

pub mod error;
pub mod models;
pub mod services;
pub mod settings;
pub mod utils;
pub mod wallet;

pub use error::{BatchIssuanceError, ConfigError, EncodingError, MalformedCouponError, SigningError, VerificationError};
pub use models::actor::ActorIdentifier;
pub use models::coupon::{Coupon, CouponBook, CouponClass, CouponPayload, CouponSignature};
pub use services::coupon_issuer::{issue_all, CouponIssuer, IssuerConfig};
pub use services::verifier::{recover_signer, CouponPolicy, PhasePolicy, Verdict, Verifier, VerifierConfig};
pub use wallet::key_management::IssuerKey;
