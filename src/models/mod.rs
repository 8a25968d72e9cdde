// src/models/mod.rs
//! Data structures shared by issuer and verifier.

pub mod actor;
pub mod coupon;
