//! ## Value hashing
//! Maps a value to its `(bucket, register)` pair.
//!
//! The value is hashed with SHA-1 and only the leading 80 bits of the digest are used:
//! - bits 0..63    - the remainder whose leading zero run gives the register rank.
//! - bits 64..79   - the low 11 of these bits select the bucket.
//!
//! Both halves are read as big-endian fixed-width integers, which is equivalent to interpreting
//! the first 20 hex characters of the digest as one integer `h` and taking `h & 0x7ff` and
//! `h >> 16`.

use sha1::{Digest, Sha1};

use crate::sketch::NUM_BUCKETS;

/// Largest register rank a 64-bit remainder can produce.
const MAX_RANK: u32 = 64;

/// Hash `value` and return its bucket index and raw register magnitude.
#[inline]
pub fn hash_value(value: &[u8]) -> (u16, u8) {
    let digest = Sha1::digest(value);
    let mut remainder = [0u8; 8];
    remainder.copy_from_slice(&digest[..8]);
    let low = u16::from_be_bytes([digest[8], digest[9]]);

    let bucket = low & (NUM_BUCKETS as u16 - 1);
    (bucket, register_for(u64::from_be_bytes(remainder)))
}

/// Return the register rank of a 64-bit hash remainder.
///
/// This is the 1-based position of the highest set bit counted from the top, capped at 64.
/// An all-zero remainder maps to 0, not to the clamped maximum of 64.
#[inline]
pub fn register_for(remainder: u64) -> u8 {
    if remainder == 0 {
        return 0;
    }
    (remainder.leading_zeros() + 1).min(MAX_RANK) as u8
}
