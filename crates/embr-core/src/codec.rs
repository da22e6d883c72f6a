//! ZSTD framing over object payloads.
//!
//! Frames always carry their uncompressed content size (the default for the
//! `zstd` crate's one-shot helpers); a frame without one is rejected as
//! `InvalidFormat` rather than silently streamed.

use crate::error::EmbrError;

/// Default compression level used for VECTOR objects.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 9;

/// Highest compression level accepted by callers.
pub const MAX_COMPRESSION_LEVEL: i32 = 22;

/// Magic bytes identifying an already-compressed ZSTD frame.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compress `payload` at `level`. Accidental double-compression (the input
/// already looks like a ZSTD frame) is logged but not rejected.
pub fn compress(payload: &[u8], level: i32) -> Result<Vec<u8>, EmbrError> {
    if payload.starts_with(&ZSTD_MAGIC) {
        tracing::warn!("compress() called on input that already looks like a ZSTD frame");
    }
    let level = level.clamp(1, MAX_COMPRESSION_LEVEL);
    zstd::stream::encode_all(payload, level).map_err(|e| EmbrError::Compression(e.to_string()))
}

/// Decompress a ZSTD frame, verifying it carries its declared content size.
///
/// Returns `InvalidFormat` if the frame has no embedded content size, and
/// `Compression` for any other decode failure.
pub fn decompress(frame: &[u8]) -> Result<Vec<u8>, EmbrError> {
    match zstd_safe::get_frame_content_size(frame) {
        Ok(Some(_)) => {}
        Ok(None) | Err(_) => {
            return Err(EmbrError::InvalidFormat(
                "ZSTD frame does not declare its uncompressed content size".to_string(),
            ));
        }
    }

    zstd::stream::decode_all(frame).map_err(|e| EmbrError::Compression(e.to_string()))
}
