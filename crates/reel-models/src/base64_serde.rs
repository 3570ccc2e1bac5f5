//! Base64 (standard alphabet) serde adapters for binary project assets.
//!
//! Project documents store uploaded images, logo and music as base64
//! strings; in memory they are plain byte buffers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

fn decode<E: serde::de::Error>(encoded: &str) -> Result<Vec<u8>, E> {
    STANDARD.decode(encoded.trim()).map_err(E::custom)
}

/// `Vec<Vec<u8>>` as a list of base64 strings.
pub mod list {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&STANDARD.encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let encoded: Vec<String> = Vec::deserialize(deserializer)?;
        encoded.iter().map(|s| decode::<D::Error>(s)).collect()
    }
}

/// `Option<Vec<u8>>` as an optional base64 string.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded.as_deref().map(decode::<D::Error>).transpose()
    }
}
