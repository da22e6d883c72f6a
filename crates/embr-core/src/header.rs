//! Fixed, little-endian on-disk object header.
//!
//! Layout (56 bytes): u32 magic, u32 version, u32 obj_type, u32 flags,
//! u64 size, u8 hash[32]. Hand-rolled byte reads/writes pin this layout
//! exactly rather than relying on a serialization crate's derive output.

use crate::error::EmbrError;
use crate::hash::ObjectHash;

pub const MAGIC: u32 = 0x4542_564D;
pub const CURRENT_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 4 + 4 + 4 + 4 + 8 + 32;

/// Object kind, stored in `obj_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ObjectType {
    Vector = 0,
    Meta = 1,
}

impl ObjectType {
    fn from_u32(v: u32) -> Result<Self, EmbrError> {
        match v {
            0 => Ok(Self::Vector),
            1 => Ok(Self::Meta),
            other => Err(EmbrError::InvalidFormat(format!(
                "unknown object type {other}"
            ))),
        }
    }
}

/// Header flag bits. For META objects this field instead holds a plain
/// sidecar entry count (see `spec.md` §3) and is read via `.bits()` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectFlags(u32);

impl ObjectFlags {
    pub const NORMALIZE: u32 = 1 << 0;
    pub const COMPRESSED: u32 = 1 << 1;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn insert(&mut self, bit: u32) {
        self.0 |= bit;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ObjectHeader {
    pub version: u32,
    pub obj_type: ObjectType,
    pub flags: ObjectFlags,
    /// Uncompressed payload size.
    pub size: u64,
    pub hash: ObjectHash,
}

impl ObjectHeader {
    pub fn new(obj_type: ObjectType, flags: ObjectFlags, size: u64, hash: ObjectHash) -> Self {
        Self {
            version: CURRENT_VERSION,
            obj_type,
            flags,
            size,
            hash,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&(self.obj_type as u32).to_le_bytes());
        buf[12..16].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[16..24].copy_from_slice(&self.size.to_le_bytes());
        buf[24..56].copy_from_slice(self.hash.as_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, EmbrError> {
        if buf.len() < HEADER_LEN {
            return Err(EmbrError::InvalidFormat(format!(
                "object header truncated: expected {HEADER_LEN} bytes, got {}",
                buf.len()
            )));
        }
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(EmbrError::InvalidFormat(format!(
                "bad object magic: expected {MAGIC:#x}, got {magic:#x}"
            )));
        }
        let version = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        if version > CURRENT_VERSION {
            return Err(EmbrError::InvalidFormat(format!(
                "object version {version} is newer than supported version {CURRENT_VERSION}"
            )));
        }
        let obj_type = ObjectType::from_u32(u32::from_le_bytes(buf[8..12].try_into().unwrap()))?;
        let flags = ObjectFlags::from_bits(u32::from_le_bytes(buf[12..16].try_into().unwrap()));
        let size = u64::from_le_bytes(buf[16..24].try_into().unwrap());
        let mut hash_bytes = [0u8; 32];
        hash_bytes.copy_from_slice(&buf[24..56]);
        let hash = ObjectHash::from_bytes(hash_bytes);

        Ok(Self {
            version,
            obj_type,
            flags,
            size,
            hash,
        })
    }
}
