// src/wallet/mod.rs
//! Issuer key material.

pub mod key_management;
