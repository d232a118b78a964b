//! Encoding/decoding traits for stored cells
//!
//! Fixed-width big-endian encodings keep timestamp keys order-preserving
//! under the store's lexicographic key order.

use crate::error::{Error, Result};
use centra_common::Timestamp;

/// Encode a value to bytes
pub trait Encode {
    fn encode(&self) -> Result<Vec<u8>>;
}

/// Decode a value from bytes
pub trait Decode: Sized {
    fn decode(bytes: &[u8]) -> Result<Self>;
}

impl Encode for u64 {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_be_bytes().to_vec())
    }
}

impl Decode for u64 {
    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 8 {
            return Err(Error::Encoding(format!(
                "expected 8 bytes for u64, got {}",
                bytes.len()
            )));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }
}

impl Encode for Timestamp {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_bytes().to_vec())
    }
}

impl Decode for Timestamp {
    fn decode(bytes: &[u8]) -> Result<Self> {
        u64::decode(bytes).map(Timestamp::new)
    }
}

impl Encode for Vec<u8> {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.clone())
    }
}

impl Decode for Vec<u8> {
    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_roundtrip() {
        let encoded = 42u64.encode().unwrap();
        assert_eq!(u64::decode(&encoded).unwrap(), 42);
    }

    #[test]
    fn test_u64_rejects_wrong_width() {
        assert!(u64::decode(&[0, 1, 2]).is_err());
    }

    #[test]
    fn test_timestamp_encoding_preserves_order() {
        let lo = Timestamp::new(255).encode().unwrap();
        let hi = Timestamp::new(256).encode().unwrap();
        assert!(lo < hi);
    }
}
