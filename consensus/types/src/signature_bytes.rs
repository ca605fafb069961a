//! Opaque BLS signature bytes.
//!
//! Signature verification lives behind an external seam; this core only
//! carries the bytes around, so there is no dependency on a BLS library.

use serde::de::Error as _;
use std::fmt;

pub const SIGNATURE_BYTES_LEN: usize = 96;

/// A BLS signature, stored unverified and unparsed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureBytes([u8; SIGNATURE_BYTES_LEN]);

impl SignatureBytes {
    pub fn empty() -> Self {
        Self([0; SIGNATURE_BYTES_LEN])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for SignatureBytes {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..]))
    }
}

impl ssz::Encode for SignatureBytes {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        SIGNATURE_BYTES_LEN
    }

    fn ssz_bytes_len(&self) -> usize {
        SIGNATURE_BYTES_LEN
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0)
    }
}

impl ssz::Decode for SignatureBytes {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        SIGNATURE_BYTES_LEN
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
        if bytes.len() != SIGNATURE_BYTES_LEN {
            return Err(ssz::DecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: SIGNATURE_BYTES_LEN,
            });
        }
        let mut array = [0; SIGNATURE_BYTES_LEN];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }
}

impl tree_hash::TreeHash for SignatureBytes {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Container
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        unreachable!("Container should never be packed.")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("Container should never be packed.")
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        eth2_hashing::hash(&self.0)
    }
}

impl serde::Serialize for SignatureBytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0[..])))
    }
}

impl<'de> serde::Deserialize<'de> for SignatureBytes {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = <String as serde::Deserialize>::deserialize(deserializer)?;
        let stripped = string.trim_start_matches("0x");
        let bytes = hex::decode(stripped).map_err(D::Error::custom)?;
        if bytes.len() != SIGNATURE_BYTES_LEN {
            return Err(D::Error::custom(format!(
                "invalid signature length: {}",
                bytes.len()
            )));
        }
        let mut array = [0; SIGNATURE_BYTES_LEN];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssz::{Decode, Encode};

    #[test]
    fn ssz_round_trip() {
        let mut raw = [0; SIGNATURE_BYTES_LEN];
        raw[0] = 0xc0;
        let signature = SignatureBytes(raw);
        let bytes = signature.as_ssz_bytes();
        assert_eq!(bytes.len(), SIGNATURE_BYTES_LEN);
        assert_eq!(SignatureBytes::from_ssz_bytes(&bytes).unwrap(), signature);
    }

    #[test]
    fn rejects_bad_length() {
        assert!(SignatureBytes::from_ssz_bytes(&[0; 95]).is_err());
    }
}
