// src/utils/mod.rs
//! Encoding, hashing and serialization helpers.

pub mod abi_encoding;
pub mod crypto;
pub mod serialization;
