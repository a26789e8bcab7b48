//! ## Exchange format
//! A serialized sketch is exactly `SERIALIZED_LEN` bytes, base64-encoded with standard padding:
//! - byte 0        - format version (always `VERSION`).
//! - byte 1        - register offset.
//! - bytes 2..3    - number of non-zero registers (big-endian `u16`).
//! - byte 4        - maximum overflow register.
//! - bytes 5..6    - bucket of the maximum overflow register (big-endian `u16`).
//! - bytes 7..     - `NUM_BUCKET_BYTES` packed registers, two 4-bit registers per byte with the
//!   even bucket in the high nibble.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use tracing::debug;

use crate::error::FormatError;
use crate::sketch::{NUM_BUCKETS, NUM_BUCKET_BYTES};

/// Format version written by this crate.
pub const VERSION: u8 = 1;
/// Length of the fixed header preceding the packed registers.
pub const HEADER_LEN: usize = 7;
/// Total length of a serialized sketch before base64 encoding.
pub const SERIALIZED_LEN: usize = HEADER_LEN + NUM_BUCKET_BYTES;

/// Scalar fields of a sketch as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) version: u8,
    pub(crate) register_offset: u8,
    pub(crate) num_non_zero_registers: u16,
    pub(crate) max_overflow_register: u8,
    pub(crate) max_overflow_bucket: u16,
}

impl Header {
    /// Append the 7 header bytes to `out`.
    #[inline]
    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        out.push(self.version);
        out.push(self.register_offset);
        out.extend_from_slice(&self.num_non_zero_registers.to_be_bytes());
        out.push(self.max_overflow_register);
        out.extend_from_slice(&self.max_overflow_bucket.to_be_bytes());
    }

    #[inline]
    fn read(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            version: bytes[0],
            register_offset: bytes[1],
            num_non_zero_registers: u16::from_be_bytes([bytes[2], bytes[3]]),
            max_overflow_register: bytes[4],
            max_overflow_bucket: u16::from_be_bytes([bytes[5], bytes[6]]),
        }
    }
}

/// Split a raw serialized sketch into its header and packed registers.
pub(crate) fn decode(bytes: &[u8]) -> Result<(Header, &[u8; NUM_BUCKET_BYTES]), FormatError> {
    let length_error = || {
        debug!(len = bytes.len(), "rejecting sketch buffer of unexpected length");
        FormatError::Length {
            expected: SERIALIZED_LEN,
            actual: bytes.len(),
        }
    };
    let (head, registers) = bytes
        .split_first_chunk::<HEADER_LEN>()
        .ok_or_else(length_error)?;
    let registers: &[u8; NUM_BUCKET_BYTES] =
        registers.try_into().map_err(|_| length_error())?;
    let header = Header::read(head);

    if usize::from(header.max_overflow_bucket) >= NUM_BUCKETS {
        debug!(bucket = header.max_overflow_bucket, "rejecting sketch with invalid overflow bucket");
        return Err(FormatError::OverflowBucket(header.max_overflow_bucket));
    }
    if usize::from(header.num_non_zero_registers) > NUM_BUCKETS {
        debug!(count = header.num_non_zero_registers, "rejecting sketch with invalid non-zero count");
        return Err(FormatError::NonZeroCount(header.num_non_zero_registers));
    }

    Ok((header, registers))
}

/// Decode base64 text into raw sketch bytes.
pub(crate) fn decode_base64(encoded: &str) -> Result<Vec<u8>, FormatError> {
    B64.decode(encoded).map_err(|e| {
        debug!(error = %e, "rejecting sketch with malformed base64");
        FormatError::from(e)
    })
}

/// Encode raw sketch bytes as base64 text.
#[inline]
pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    B64.encode(bytes)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use test_case::test_case;

    fn empty_buffer() -> Vec<u8> {
        let mut buf = vec![0u8; SERIALIZED_LEN];
        buf[0] = VERSION;
        buf
    }

    #[test]
    fn test_header_layout() {
        let header = Header {
            version: VERSION,
            register_offset: 3,
            num_non_zero_registers: 0x0102,
            max_overflow_register: 40,
            max_overflow_bucket: 0x07ff,
        };
        let mut out = Vec::new();
        header.write(&mut out);
        assert_eq!(out, [1, 3, 0x01, 0x02, 40, 0x07, 0xff]);

        out.resize(SERIALIZED_LEN, 0);
        let (decoded, registers) = decode(&out).unwrap();
        assert_eq!(decoded, header);
        assert!(registers.iter().all(|&b| b == 0));
    }

    #[test_case(0; "empty buffer")]
    #[test_case(3; "truncated header")]
    #[test_case(HEADER_LEN; "header only")]
    #[test_case(SERIALIZED_LEN - 1; "one byte short")]
    #[test_case(SERIALIZED_LEN + 1; "one byte extra")]
    fn test_decode_wrong_length(len: usize) {
        let buf = vec![0u8; len];
        assert_eq!(
            decode(&buf).unwrap_err(),
            FormatError::Length {
                expected: SERIALIZED_LEN,
                actual: len
            }
        );
    }

    #[test]
    fn test_decode_invalid_overflow_bucket() {
        let mut buf = empty_buffer();
        buf[5] = 0x08;
        assert_eq!(decode(&buf).unwrap_err(), FormatError::OverflowBucket(2048));
    }

    #[test]
    fn test_decode_invalid_non_zero_count() {
        let mut buf = empty_buffer();
        buf[2] = 0x08;
        buf[3] = 0x01;
        assert_eq!(decode(&buf).unwrap_err(), FormatError::NonZeroCount(2049));

        buf[3] = 0x00;
        assert!(decode(&buf).is_ok());
    }

    #[test_case("not base64!"; "invalid characters")]
    #[test_case("AQA"; "missing padding")]
    fn test_decode_base64_invalid(encoded: &str) {
        assert!(matches!(decode_base64(encoded), Err(FormatError::Base64(_))));
    }

    #[test]
    fn test_base64_encoded_length() {
        let encoded = encode_base64(&empty_buffer());
        assert_eq!(encoded.len(), 1376);
        assert!(encoded.starts_with("AQAAAAAAAAAA"));
        assert_eq!(decode_base64(&encoded).unwrap(), empty_buffer());
    }
}
