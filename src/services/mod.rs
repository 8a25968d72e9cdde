// src/services/mod.rs
//! Issuance and verification services.

pub mod coupon_issuer;
pub mod verifier;
