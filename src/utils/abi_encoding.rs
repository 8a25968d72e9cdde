// src/utils/abi_encoding.rs
//! Canonical encoder for coupon messages.
//!
//! Implements the static subset of the Solidity contract ABI `abi.encode`:
//! every value occupies exactly one 32-byte word, so the encoding of a tuple
//! is the concatenation of its words and never needs a length prefix.
//!
//! | type       | word layout                                  |
//! |------------|----------------------------------------------|
//! | `uint<M>`  | big-endian, left-padded with zeros           |
//! | `address`  | 12 zero bytes followed by the 20 address bytes |
//! | `bool`     | `0` or `1` in the last byte                  |
//! | `bytes<N>` | N bytes followed by zero padding             |
//!
//! The verifier decodes with the same rules, so these layouts are a
//! cross-system contract. Decoding is strict and rejects any word that the
//! encoder could not have produced.

use crate::error::EncodingError;
use ethers_core::types::{Address, U256};
use std::fmt;
use std::str::FromStr;

/// Width of one ABI word.
pub const WORD_LEN: usize = 32;

/// Length of the zero padding in front of an address.
const ADDRESS_PADDING: usize = WORD_LEN - 20;

/// Static ABI types supported by the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// Unsigned integer of the given bit width (8..=256, multiple of 8).
    Uint(u16),
    Address,
    Bool,
    /// Fixed byte array of the given length (1..=32).
    FixedBytes(u8),
}

impl AbiType {
    /// Rejects widths Solidity does not define.
    pub fn validate(&self) -> Result<(), EncodingError> {
        match *self {
            AbiType::Uint(bits) if bits == 0 || bits > 256 || bits % 8 != 0 => {
                Err(EncodingError::InvalidType(self.to_string()))
            }
            AbiType::FixedBytes(len) if len == 0 || len as usize > WORD_LEN => {
                Err(EncodingError::InvalidType(self.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiType::Uint(bits) => write!(f, "uint{}", bits),
            AbiType::Address => write!(f, "address"),
            AbiType::Bool => write!(f, "bool"),
            AbiType::FixedBytes(len) => write!(f, "bytes{}", len),
        }
    }
}

/// Parses Solidity type names such as `uint256`, `uint`, `address`, `bytes32`.
impl FromStr for AbiType {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EncodingError::InvalidType(s.to_string());
        let ty = match s.trim() {
            "address" => AbiType::Address,
            "bool" => AbiType::Bool,
            "uint" => AbiType::Uint(256),
            other => {
                if let Some(bits) = other.strip_prefix("uint") {
                    AbiType::Uint(parse_width(bits).ok_or_else(invalid)?)
                } else if let Some(len) = other.strip_prefix("bytes") {
                    AbiType::FixedBytes(parse_width(len).ok_or_else(invalid)?)
                } else {
                    return Err(invalid());
                }
            }
        };
        ty.validate()?;
        Ok(ty)
    }
}

/// Parses a type-name width: plain ASCII digits, no sign, no leading zero.
fn parse_width<T: FromStr>(digits: &str) -> Option<T> {
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A value tagged with the kind of ABI type it can be encoded as.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AbiValue {
    Uint(U256),
    Address(Address),
    Bool(bool),
    FixedBytes(Vec<u8>),
}

/// Encodes `values` under `types` into a sequence of 32-byte words.
///
/// # Errors
/// - `LengthMismatch` when the two lists differ in length
/// - `InvalidType` for an undefined width such as `uint7`
/// - `TypeMismatch` when a value's kind differs from its type
/// - `ValueOutOfRange` when a value does not fit the declared width
pub fn encode(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, EncodingError> {
    if types.len() != values.len() {
        return Err(EncodingError::LengthMismatch {
            types: types.len(),
            values: values.len(),
        });
    }

    let mut out = Vec::with_capacity(types.len() * WORD_LEN);
    for (index, (ty, value)) in types.iter().zip(values).enumerate() {
        out.extend_from_slice(&encode_word(index, ty, value)?);
    }
    Ok(out)
}

fn encode_word(index: usize, ty: &AbiType, value: &AbiValue) -> Result<[u8; WORD_LEN], EncodingError> {
    ty.validate()?;
    let mut word = [0u8; WORD_LEN];
    let out_of_range = || EncodingError::ValueOutOfRange {
        index,
        expected: ty.to_string(),
    };

    match (ty, value) {
        (AbiType::Uint(bits), AbiValue::Uint(v)) => {
            if v.bits() > *bits as usize {
                return Err(out_of_range());
            }
            v.to_big_endian(&mut word);
        }
        (AbiType::Address, AbiValue::Address(addr)) => {
            word[ADDRESS_PADDING..].copy_from_slice(addr.as_bytes());
        }
        (AbiType::Bool, AbiValue::Bool(b)) => {
            word[WORD_LEN - 1] = u8::from(*b);
        }
        (AbiType::FixedBytes(len), AbiValue::FixedBytes(bytes)) => {
            if bytes.len() != *len as usize {
                return Err(out_of_range());
            }
            word[..bytes.len()].copy_from_slice(bytes);
        }
        _ => {
            return Err(EncodingError::TypeMismatch {
                index,
                expected: ty.to_string(),
            })
        }
    }
    Ok(word)
}

/// Decodes a word sequence produced by [`encode`] under the same `types`.
///
/// # Errors
/// - `InvalidEncodedLength` unless `data` is exactly one word per type
/// - `NonCanonical` for dirty padding, out-of-range integers or booleans
///   other than 0/1
pub fn decode(data: &[u8], types: &[AbiType]) -> Result<Vec<AbiValue>, EncodingError> {
    let expected = types.len() * WORD_LEN;
    if data.len() != expected {
        return Err(EncodingError::InvalidEncodedLength {
            expected,
            actual: data.len(),
        });
    }

    types
        .iter()
        .zip(data.chunks_exact(WORD_LEN))
        .enumerate()
        .map(|(index, (ty, word))| decode_word(index, ty, word))
        .collect()
}

fn decode_word(index: usize, ty: &AbiType, word: &[u8]) -> Result<AbiValue, EncodingError> {
    ty.validate()?;
    let non_canonical = || EncodingError::NonCanonical {
        index,
        expected: ty.to_string(),
    };
    let all_zero = |bytes: &[u8]| bytes.iter().all(|b| *b == 0);

    match ty {
        AbiType::Uint(bits) => {
            let value = U256::from_big_endian(word);
            if value.bits() > *bits as usize {
                return Err(non_canonical());
            }
            Ok(AbiValue::Uint(value))
        }
        AbiType::Address => {
            if !all_zero(&word[..ADDRESS_PADDING]) {
                return Err(non_canonical());
            }
            Ok(AbiValue::Address(Address::from_slice(&word[ADDRESS_PADDING..])))
        }
        AbiType::Bool => {
            if !all_zero(&word[..WORD_LEN - 1]) {
                return Err(non_canonical());
            }
            match word[WORD_LEN - 1] {
                0 => Ok(AbiValue::Bool(false)),
                1 => Ok(AbiValue::Bool(true)),
                _ => Err(non_canonical()),
            }
        }
        AbiType::FixedBytes(len) => {
            let len = *len as usize;
            if !all_zero(&word[len..]) {
                return Err(non_canonical());
            }
            Ok(AbiValue::FixedBytes(word[..len].to_vec()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::abi::{self, Token};
    use proptest::prelude::*;

    fn sample_address() -> Address {
        Address::from_slice(&[
            0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45,
            0x67, 0x89, 0xab, 0xcd, 0x12, 0x34,
        ])
    }

    #[test]
    fn test_presale_message_layout() {
        let encoded = encode(
            &[AbiType::Uint(256), AbiType::Address],
            &[AbiValue::Uint(U256::from(2u8)), AbiValue::Address(sample_address())],
        )
        .unwrap();

        let mut expected = vec![0u8; 64];
        expected[31] = 2;
        expected[44..].copy_from_slice(sample_address().as_bytes());
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_matches_reference_abi_encoder() {
        let types = [
            AbiType::Uint(256),
            AbiType::Address,
            AbiType::Bool,
            AbiType::FixedBytes(4),
            AbiType::Uint(64),
        ];
        let values = [
            AbiValue::Uint(U256::from(1u8)),
            AbiValue::Address(sample_address()),
            AbiValue::Bool(true),
            AbiValue::FixedBytes(vec![0xde, 0xad, 0xbe, 0xef]),
            AbiValue::Uint(U256::from(u64::MAX)),
        ];
        let reference = abi::encode(&[
            Token::Uint(U256::from(1u8)),
            Token::Address(sample_address()),
            Token::Bool(true),
            Token::FixedBytes(vec![0xde, 0xad, 0xbe, 0xef]),
            Token::Uint(U256::from(u64::MAX)),
        ]);

        assert_eq!(encode(&types, &values).unwrap(), reference);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = encode(&[AbiType::Uint(256), AbiType::Address], &[AbiValue::Uint(U256::zero())])
            .unwrap_err();
        assert_eq!(err, EncodingError::LengthMismatch { types: 2, values: 1 });
    }

    #[test]
    fn test_value_must_fit_width() {
        let err = encode(&[AbiType::Uint(8)], &[AbiValue::Uint(U256::from(256u16))]).unwrap_err();
        assert!(matches!(err, EncodingError::ValueOutOfRange { index: 0, .. }));

        let err = encode(&[AbiType::FixedBytes(2)], &[AbiValue::FixedBytes(vec![1, 2, 3])]).unwrap_err();
        assert!(matches!(err, EncodingError::ValueOutOfRange { index: 0, .. }));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let err = encode(&[AbiType::Address], &[AbiValue::Bool(false)]).unwrap_err();
        assert!(matches!(err, EncodingError::TypeMismatch { index: 0, .. }));
    }

    #[test]
    fn test_type_names() {
        assert_eq!("uint256".parse::<AbiType>().unwrap(), AbiType::Uint(256));
        assert_eq!("uint".parse::<AbiType>().unwrap(), AbiType::Uint(256));
        assert_eq!("bytes32".parse::<AbiType>().unwrap(), AbiType::FixedBytes(32));
        assert_eq!("address".parse::<AbiType>().unwrap(), AbiType::Address);
        assert!("uint7".parse::<AbiType>().is_err());
        assert!("uint264".parse::<AbiType>().is_err());
        assert!("bytes33".parse::<AbiType>().is_err());
        assert!("string".parse::<AbiType>().is_err());
    }

    #[test]
    fn test_non_canonical_widths_rejected() {
        for name in ["uint0256", "uint+8", "bytes01", "bytes+1", "uint08", "bytes", "uint 8", "uint-8"] {
            assert!(
                matches!(name.parse::<AbiType>(), Err(EncodingError::InvalidType(_))),
                "{} should be rejected",
                name
            );
        }
        assert_eq!("uint8".parse::<AbiType>().unwrap(), AbiType::Uint(8));
        assert_eq!("bytes1".parse::<AbiType>().unwrap(), AbiType::FixedBytes(1));
    }

    #[test]
    fn test_decode_rejects_non_canonical_words() {
        // dirty address padding
        let mut word = [0u8; WORD_LEN];
        word[0] = 1;
        assert!(matches!(
            decode(&word, &[AbiType::Address]),
            Err(EncodingError::NonCanonical { index: 0, .. })
        ));

        // bool other than 0/1
        let mut word = [0u8; WORD_LEN];
        word[31] = 2;
        assert!(decode(&word, &[AbiType::Bool]).is_err());

        // uint8 above 255
        let mut word = [0u8; WORD_LEN];
        word[30] = 1;
        assert!(decode(&word, &[AbiType::Uint(8)]).is_err());

        // trailing garbage
        assert!(matches!(
            decode(&[0u8; 33], &[AbiType::Uint(256)]),
            Err(EncodingError::InvalidEncodedLength { expected: 32, actual: 33 })
        ));
    }

    proptest! {
        /// Property: decoding an encoding yields the original values
        #[test]
        fn prop_decode_inverts_encode(
            class in any::<u64>(),
            addr in any::<[u8; 20]>(),
            flag in any::<bool>(),
            tag in any::<[u8; 32]>(),
            small in any::<u8>(),
        ) {
            let types = [
                AbiType::Uint(256),
                AbiType::Address,
                AbiType::Bool,
                AbiType::FixedBytes(32),
                AbiType::Uint(8),
            ];
            let values = vec![
                AbiValue::Uint(U256::from(class)),
                AbiValue::Address(Address::from_slice(&addr)),
                AbiValue::Bool(flag),
                AbiValue::FixedBytes(tag.to_vec()),
                AbiValue::Uint(U256::from(small)),
            ];

            let encoded = encode(&types, &values).unwrap();
            prop_assert_eq!(encoded.len(), types.len() * WORD_LEN);
            prop_assert_eq!(decode(&encoded, &types).unwrap(), values);
        }
    }
}
