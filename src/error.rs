// src/error.rs
//! Error taxonomy for coupon issuance and verification.
//!
//! Every fallible operation in the crate returns one of these typed errors.
//! Only the binary converts them into process exit codes.

use thiserror::Error;

/// Failure to build or parse a canonical encoded message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("type list has {types} entries but value list has {values}")]
    LengthMismatch { types: usize, values: usize },

    #[error("value {index} does not match declared type {expected}")]
    TypeMismatch { index: usize, expected: String },

    #[error("value {index} does not fit declared type {expected}")]
    ValueOutOfRange { index: usize, expected: String },

    #[error("unsupported or malformed type `{0}`")]
    InvalidType(String),

    #[error("encoded message is {actual} bytes, expected {expected}")]
    InvalidEncodedLength { expected: usize, actual: usize },

    #[error("word {index} is not a canonical encoding of {expected}")]
    NonCanonical { index: usize, expected: String },

    #[error("invalid actor identifier `{input}`: {reason}")]
    InvalidIdentifier { input: String, reason: String },

    #[error("unknown coupon class `{0}`")]
    UnknownCouponClass(String),
}

/// Invalid issuer key material or a failure inside the signing primitive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("invalid issuer private key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signature(String),
}

/// A serialized coupon that cannot be turned back into a signature.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedCouponError {
    #[error("coupon field `{field}` has {actual} hex digits, expected {expected}")]
    FieldWidth {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("coupon field `{field}` is not valid hex: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("coupon recovery byte v={0} is out of range (expected 27 or 28)")]
    InvalidRecoveryByte(u8),
}

/// A batch that could not be issued in full.
#[derive(Debug, Error)]
pub enum BatchIssuanceError {
    #[error("actor #{index} (`{input}`) rejected: {source}")]
    InvalidActor {
        index: usize,
        input: String,
        #[source]
        source: EncodingError,
    },

    #[error("failed to encode coupon for {actor}: {source}")]
    Encoding {
        actor: String,
        #[source]
        source: EncodingError,
    },

    #[error("issuer key unusable, batch aborted: {0}")]
    Signing(#[from] SigningError),

    #[error("issuance worker failed: {0}")]
    Worker(String),
}

/// A coupon that could not be checked at all.
///
/// A coupon that parses and recovers but is signed by someone else is not an
/// error; it yields a denied verdict instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error(transparent)]
    Malformed(#[from] MalformedCouponError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("signature is not recoverable: {0}")]
    Unrecoverable(String),
}

/// Missing or invalid runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("required setting `{0}` is not set")]
    Missing(&'static str),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}
