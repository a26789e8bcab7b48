//! Sketch allows to estimate number of distinct elements in a stream or dataset and to merge
//! independently built sketches, staying bit-compatible with Druid's dense HyperLogLog layout.
//!
//! # Data-structure design
//!
//! ## Registers
//! `NUM_BUCKETS` registers of 4 bits each are packed two per byte, the even bucket in the high
//! nibble. A stored nibble `n` represents the register magnitude `register_offset + n`, so 4 bits
//! are enough for any rank as long as the registers stay close together.
//!
//! ## Renormalization
//! Once every register is non-zero, `register_offset` is raised by one and every nibble is
//! decremented in place. This happens at most once per insertion or merged byte.
//!
//! ## Overflow register
//! A rank too large for the current window (`> register_offset + RANGE`) cannot be stored in a
//! nibble. The largest such observation is kept in a single overflow slot together with its
//! bucket. A larger observation displaces it, and the displaced pair goes through ordinary
//! insertion again, where it may now fit.
//!
//! ## Union
//! The sketch with the larger offset becomes the receiver, the other side's nibbles are shifted
//! down by the offset difference and merged with a per-nibble maximum, and finally the other
//! side's overflow pair is inserted.

use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use tracing::trace;

use crate::codec::{self, Header, SERIALIZED_LEN, VERSION};
use crate::error::FormatError;
use crate::hash::hash_value;

/// Number of hash bits used for bucket selection
pub const BUCKET_BITS: u32 = 11;
/// Number of buckets (registers)
pub const NUM_BUCKETS: usize = 1 << BUCKET_BITS;
/// Number of bytes holding the packed 4-bit registers
pub const NUM_BUCKET_BYTES: usize = NUM_BUCKETS >> 1;
/// Largest value a 4-bit register can store
pub const RANGE: u8 = 15;

const UPPER_NIBBLE: u8 = 0xf0;
const LOWER_NIBBLE: u8 = 0x0f;

/// Mergeable HyperLogLog sketch in Druid's dense representation.
#[derive(Clone, PartialEq, Eq)]
pub struct Sketch {
    version: u8,
    register_offset: u8,
    num_non_zero_registers: u16,
    max_overflow_register: u8,
    max_overflow_bucket: u16,
    registers: Box<[u8; NUM_BUCKET_BYTES]>,
}

impl Sketch {
    /// Creates new empty `Sketch`
    #[inline]
    pub fn new() -> Self {
        Self {
            version: VERSION,
            register_offset: 0,
            num_non_zero_registers: 0,
            max_overflow_register: 0,
            max_overflow_bucket: 0,
            registers: Box::new([0u8; NUM_BUCKET_BYTES]),
        }
    }

    /// Insert a value into `Sketch`. Text is hashed as its UTF-8 bytes.
    #[inline]
    pub fn insert<T: AsRef<[u8]> + ?Sized>(&mut self, value: &T) {
        let (bucket, register) = hash_value(value.as_ref());
        self.add(bucket, register);
    }

    /// Union a base64-encoded sketch into `Sketch`.
    ///
    /// `self` is left untouched when `encoded` is not a valid sketch.
    pub fn union(&mut self, encoded: &str) -> Result<(), FormatError> {
        let bytes = codec::decode_base64(encoded)?;
        let (header, registers) = codec::decode(&bytes)?;
        self.merge_parts(header, registers);
        Ok(())
    }

    /// Union another in-memory sketch into `Sketch`.
    #[inline]
    pub fn merge(&mut self, rhs: &Sketch) {
        self.merge_parts(rhs.header(), &rhs.registers);
    }

    /// Build a new sketch from the union of base64-encoded sketches.
    pub fn union_all<I>(encoded: I) -> Result<Self, FormatError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut sketch = Self::new();
        for e in encoded {
            sketch.union(e.as_ref())?;
        }
        Ok(sketch)
    }

    /// Serialize `Sketch` into its raw `SERIALIZED_LEN` byte form
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SERIALIZED_LEN);
        self.header().write(&mut out);
        out.extend_from_slice(&self.registers[..]);
        out
    }

    /// Deserialize `Sketch` from its raw byte form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let (header, registers) = codec::decode(bytes)?;
        Ok(Self {
            version: header.version,
            register_offset: header.register_offset,
            num_non_zero_registers: header.num_non_zero_registers,
            max_overflow_register: header.max_overflow_register,
            max_overflow_bucket: header.max_overflow_bucket,
            registers: Box::new(*registers),
        })
    }

    /// Serialize `Sketch` into base64 text
    #[inline]
    pub fn to_base64(&self) -> String {
        codec::encode_base64(&self.to_bytes())
    }

    /// Deserialize `Sketch` from base64 text
    pub fn from_base64(encoded: &str) -> Result<Self, FormatError> {
        let bytes = codec::decode_base64(encoded)?;
        Self::from_bytes(&bytes)
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    #[inline]
    pub fn register_offset(&self) -> u8 {
        self.register_offset
    }

    #[inline]
    pub fn num_non_zero_registers(&self) -> u16 {
        self.num_non_zero_registers
    }

    /// Return `(bucket, register)` of the overflow slot, `(_, 0)` when it is empty
    #[inline]
    pub fn max_overflow(&self) -> (u16, u8) {
        (self.max_overflow_bucket, self.max_overflow_register)
    }

    /// Return packed registers
    #[inline]
    pub fn registers(&self) -> &[u8] {
        &self.registers[..]
    }

    /// Return effective magnitude of `bucket` register, including offset and overflow slot.
    ///
    /// # Panics
    /// Panics if `bucket >= NUM_BUCKETS`.
    pub fn register(&self, bucket: u16) -> u16 {
        let byte = self.registers[usize::from(bucket >> 1)];
        let nibble = if bucket & 1 == 0 { byte >> 4 } else { byte & LOWER_NIBBLE };
        let value = u16::from(self.register_offset) + u16::from(nibble);
        if bucket == self.max_overflow_bucket {
            value.max(u16::from(self.max_overflow_register))
        } else {
            value
        }
    }

    /// Return whether nothing was ever recorded in `Sketch`
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.register_offset == 0
            && self.num_non_zero_registers == 0
            && self.max_overflow_register == 0
    }

    #[inline]
    fn header(&self) -> Header {
        Header {
            version: self.version,
            register_offset: self.register_offset,
            num_non_zero_registers: self.num_non_zero_registers,
            max_overflow_register: self.max_overflow_register,
            max_overflow_bucket: self.max_overflow_bucket,
        }
    }

    /// Record raw `register` magnitude for `bucket`.
    ///
    /// A displaced overflow pair is pushed back through the same loop instead of recursing.
    /// The displaced register is never larger than the new overflow register, so it either fits
    /// or is dropped, and at most one extra iteration runs.
    pub(crate) fn add(&mut self, bucket: u16, register: u8) {
        let mut pending = Some((bucket, register));
        while let Some((bucket, register)) = pending.take() {
            if register <= self.register_offset {
                continue;
            }

            if u16::from(register) > u16::from(self.register_offset) + u16::from(RANGE) {
                if register > self.max_overflow_register {
                    trace!(
                        bucket,
                        register,
                        displaced_bucket = self.max_overflow_bucket,
                        displaced_register = self.max_overflow_register,
                        "overflow register replaced"
                    );
                    pending = Some((self.max_overflow_bucket, self.max_overflow_register));
                    self.max_overflow_bucket = bucket;
                    self.max_overflow_register = register;
                }
                continue;
            }

            self.set_register(bucket, register - self.register_offset);
            self.trim();
        }
    }

    /// Raise nibble of `bucket` to `stored` if it is larger
    #[inline]
    fn set_register(&mut self, bucket: u16, stored: u8) {
        let idx = usize::from(bucket >> 1);
        let (mask, shifted) = if bucket & 1 == 0 {
            (UPPER_NIBBLE, stored << 4)
        } else {
            (LOWER_NIBBLE, stored)
        };

        let old = self.registers[idx];
        self.registers[idx] = (old & mask).max(shifted) | (old & !mask);

        if old & mask == 0 && shifted != 0 {
            self.num_non_zero_registers += 1;
        }
    }

    /// Renormalize registers once all of them are non-zero.
    ///
    /// Each byte is decremented by `0x11` with wrapping arithmetic. When the non-zero count is
    /// accurate no nibble can borrow, but the wrapping subtraction is kept as-is for buffers
    /// whose header disagrees with their registers.
    #[inline]
    fn trim(&mut self) {
        if usize::from(self.num_non_zero_registers) < NUM_BUCKETS {
            return;
        }

        self.register_offset = self.register_offset.saturating_add(1);
        let mut non_zero = 0u16;
        for b in self.registers.iter_mut() {
            *b = b.wrapping_sub(0x11);
            non_zero += u16::from(*b & UPPER_NIBBLE != 0) + u16::from(*b & LOWER_NIBBLE != 0);
        }
        self.num_non_zero_registers = non_zero;

        trace!(
            register_offset = self.register_offset,
            num_non_zero_registers = non_zero,
            "registers renormalized"
        );
    }

    /// Merge decoded sketch parts into `Sketch`
    fn merge_parts(&mut self, mut rhs: Header, rhs_registers: &[u8; NUM_BUCKET_BYTES]) {
        let mut rhs_registers = *rhs_registers;

        // receiver must hold the larger offset, ties swap as well
        if self.register_offset <= rhs.register_offset {
            std::mem::swap(&mut self.register_offset, &mut rhs.register_offset);
            std::mem::swap(&mut self.num_non_zero_registers, &mut rhs.num_non_zero_registers);
            std::mem::swap(&mut self.max_overflow_register, &mut rhs.max_overflow_register);
            std::mem::swap(&mut self.max_overflow_bucket, &mut rhs.max_overflow_bucket);
            std::mem::swap(&mut *self.registers, &mut rhs_registers);
        }

        // computed once, later renormalizations do not shift it
        let offset_diff = i16::from(self.register_offset - rhs.register_offset);

        for (idx, &theirs) in rhs_registers.iter().enumerate() {
            if theirs == 0 {
                continue;
            }
            let ours = self.registers[idx];

            let upper = i16::from(ours & UPPER_NIBBLE);
            let lower = i16::from(ours & LOWER_NIBBLE);
            let new_upper = upper.max(i16::from(theirs & UPPER_NIBBLE) - (offset_diff << 4));
            let new_lower = lower.max(i16::from(theirs & LOWER_NIBBLE) - offset_diff);

            self.registers[idx] = (new_upper | new_lower) as u8;

            if upper == 0 && new_upper > 0 {
                self.num_non_zero_registers += 1;
            }
            if lower == 0 && new_lower > 0 {
                self.num_non_zero_registers += 1;
            }

            self.trim();
        }

        self.add(rhs.max_overflow_bucket, rhs.max_overflow_register);
    }
}

impl Default for Sketch {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Sketch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ version: {}, register_offset: {}, num_non_zero_registers: {}, max_overflow: {:?} }}",
            self.version,
            self.register_offset,
            self.num_non_zero_registers,
            self.max_overflow()
        )
    }
}

impl Display for Sketch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl FromStr for Sketch {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}

impl<T: AsRef<[u8]>> Extend<T> for Sketch {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(&item);
        }
    }
}

impl<T: AsRef<[u8]>> FromIterator<T> for Sketch {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut sketch = Self::new();
        sketch.extend(iter);
        sketch
    }
}
