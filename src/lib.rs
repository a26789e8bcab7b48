//! `druid-hll` is a Rust crate for building and merging HyperLogLog sketches in the dense binary
//! format used by Druid's `hyperUnique` columns.
//!
//! Values are hashed with SHA-1 into one of 2048 buckets, each holding a 4-bit register relative to
//! a shared offset. Sketches serialize to a fixed 1031-byte buffer (base64 on the wire) and can be
//! unioned with other sketches in that form, which is what a partitioned distinct-count
//! aggregation needs.
//!
//! ```
//! use druid_hll::Sketch;
//!
//! let mut lhs = Sketch::new();
//! lhs.insert("user-1");
//!
//! let mut rhs = Sketch::new();
//! rhs.insert("user-2");
//!
//! lhs.union(&rhs.to_base64()).unwrap();
//! assert_eq!(lhs.num_non_zero_registers(), 2);
//! ```
mod codec;
pub mod error;
pub mod hash;
#[cfg(feature = "with_serde")]
mod serde;
pub mod sketch;

pub use codec::{HEADER_LEN, SERIALIZED_LEN, VERSION};
pub use error::FormatError;
pub use sketch::{Sketch, BUCKET_BITS, NUM_BUCKETS, NUM_BUCKET_BYTES, RANGE};
