//! # Serde module for Sketch
//!
//! This module provides serde-based (serialization and deserialization) features for `Sketch`.
//!
//! A `Sketch` is serialized as its base64 exchange form, the same string `Sketch::to_base64`
//! returns, so it can be embedded in JSON documents and handed to Druid unchanged.
//!
//! During deserialization the string is decoded with `Sketch::from_base64`, and any
//! `FormatError` is reported through the deserializer's custom error.
use serde::de::Error;
use serde::{Deserialize, Serialize};

use crate::sketch::Sketch;

impl Serialize for Sketch {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Sketch {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        Sketch::from_base64(&encoded).map_err(Error::custom)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0; "empty set")]
    #[test_case(1; "single element")]
    #[test_case(2; "two distinct elements")]
    #[test_case(100; "hundred distinct elements")]
    #[test_case(100000; "hundred thousand distinct elements")]
    fn test_serde(n: usize) {
        let mut original_sketch = Sketch::new();

        for i in 0..n {
            let item = &format!("item{}", i);
            original_sketch.insert(item);
        }

        let serialized = serde_json::to_string(&original_sketch).expect("serialization failed");
        assert_eq!(serialized, format!("\"{}\"", original_sketch.to_base64()));

        let deserialized_sketch: Sketch =
            serde_json::from_str(&serialized).expect("deserialization failed");

        assert_eq!(original_sketch, deserialized_sketch);
    }

    #[test]
    fn test_deserialize_invalid_json() {
        let invalid_json = "{ invalid_json_string }";
        let result: Result<Sketch, _> = serde_json::from_str(invalid_json);

        assert!(
            result.is_err(),
            "Deserialization should fail for invalid JSON"
        );
    }

    #[test_case("\"AQAAAAAAAAAA\""; "truncated sketch")]
    #[test_case("\"not base64\""; "invalid base64")]
    #[test_case("12345"; "not a string")]
    fn test_failed_deserialization(input: &str) {
        let result: Result<Sketch, _> = serde_json::from_str(input);
        assert!(result.is_err());
    }
}
