//! SHA-256 content hashing over uncompressed object payloads.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::EmbrError;

/// A 32-byte SHA-256 digest, rendered as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHash([u8; 32]);

impl ObjectHash {
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHash({})", self.to_hex())
    }
}

impl FromStr for ObjectHash {
    type Err = EmbrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(EmbrError::InvalidInput(format!(
                "hash '{s}' must be exactly 64 hex characters"
            )));
        }
        let bytes = hex::decode(s)
            .map_err(|e| EmbrError::InvalidInput(format!("hash '{s}' is not valid hex: {e}")))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Compute the SHA-256 digest of an uncompressed object payload.
pub fn hash_payload(payload: &[u8]) -> ObjectHash {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    ObjectHash(bytes)
}
