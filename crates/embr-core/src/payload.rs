//! Parsing and encoding of the two accepted vector payload formats:
//! NumPy `.npy` v1.0 and raw little-endian binary (`spec.md` §6).

use crate::error::EmbrError;

const NUMPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Npy,
    Bin,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npy => "npy",
            Self::Bin => "bin",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorPayload {
    pub values: Vec<f32>,
    pub file_type: FileType,
}

/// Parse a vector payload, auto-detecting NumPy vs. raw binary framing.
pub fn parse(bytes: &[u8]) -> Result<VectorPayload, EmbrError> {
    if bytes.len() >= 6 && &bytes[0..6] == NUMPY_MAGIC {
        return parse_npy(bytes);
    }
    parse_raw(bytes)
}

fn parse_npy(bytes: &[u8]) -> Result<VectorPayload, EmbrError> {
    if bytes.len() < 10 {
        return Err(EmbrError::InvalidFormat(
            "NumPy payload shorter than its preamble".to_string(),
        ));
    }
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let data_start = 10 + header_len;
    if bytes.len() < data_start {
        return Err(EmbrError::InvalidFormat(
            "NumPy header length exceeds payload size".to_string(),
        ));
    }
    let data = &bytes[data_start..];
    if data.len() % 4 != 0 {
        return Err(EmbrError::InvalidFormat(
            "NumPy payload data is not a whole number of float32 values".to_string(),
        ));
    }
    let values = data
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    Ok(VectorPayload {
        values,
        file_type: FileType::Npy,
    })
}

fn parse_raw(bytes: &[u8]) -> Result<VectorPayload, EmbrError> {
    if bytes.len() < 4 {
        return Err(EmbrError::InvalidFormat(
            "raw binary payload shorter than its dimension header".to_string(),
        ));
    }
    let dims = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let data = &bytes[4..];
    if data.len() != dims * 4 {
        return Err(EmbrError::InvalidFormat(format!(
            "raw binary payload declares {dims} dimensions but carries {} bytes of data",
            data.len()
        )));
    }
    let values = data
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    Ok(VectorPayload {
        values,
        file_type: FileType::Bin,
    })
}

/// Encode `values` as a NumPy `.npy` v1.0 file, padding the header so that
/// `(10 + header_len) % 64 == 0`.
pub fn encode_npy(values: &[f32]) -> Vec<u8> {
    let shape_header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({},), }}",
        values.len()
    );
    // Pad with spaces then a trailing newline so the total preamble is 64-aligned.
    let unpadded_len = 10 + shape_header.len() + 1; // +1 for the trailing newline
    let padding = (64 - (unpadded_len % 64)) % 64;
    let mut header = shape_header;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(10 + header.len() + values.len() * 4);
    out.extend_from_slice(NUMPY_MAGIC);
    out.push(1); // major version
    out.push(0); // minor version
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Encode `values` as the raw binary format: `u32` dimension count then
/// little-endian float32 values.
pub fn encode_raw(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + values.len() * 4);
    out.extend_from_slice(&(values.len() as u32).to_le_bytes());
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_payload_roundtrips() {
        let values = vec![1.0f32, 2.0, 3.0];
        let encoded = encode_raw(&values);
        assert_eq!(
            encoded,
            vec![
                0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, 0x3f, 0x00, 0x00, 0x00, 0x40, 0x00,
                0x00, 0x40, 0x40
            ]
        );
        let parsed = parse(&encoded).unwrap();
        assert_eq!(parsed.values, values);
        assert_eq!(parsed.file_type, FileType::Bin);
    }

    #[test]
    fn npy_payload_has_64_byte_aligned_preamble() {
        let values = vec![0.5f32, -0.5];
        let encoded = encode_npy(&values);
        let header_len = u16::from_le_bytes([encoded[8], encoded[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        let parsed = parse(&encoded).unwrap();
        assert_eq!(parsed.values, values);
        assert_eq!(parsed.file_type, FileType::Npy);
    }

    #[test]
    fn npy_literal_data_bytes_match_scenario() {
        let values = vec![0.5f32, -0.5];
        let encoded = encode_npy(&values);
        let header_len = u16::from_le_bytes([encoded[8], encoded[9]]) as usize;
        let data = &encoded[10 + header_len..];
        assert_eq!(data, &[0x00, 0x00, 0x00, 0x3f, 0x00, 0x00, 0x00, 0xbf]);
    }
}
