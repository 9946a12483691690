//! JSON encoding for message bodies.
//!
//! Decoding goes through `serde_path_to_error`, so a failure names the field it
//! happened at (`items[2].price`) instead of only a line and column.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

/// Encode `value` into a JSON body.
///
/// # Errors
///
/// Fails with [`Error::JsonSerialization`] when `value` cannot be represented as JSON,
/// e.g. a map with non-string keys.
///
/// ```
/// let body = plait_core::to_json(&[1, 2, 3]).expect("encodable");
/// assert_eq!(&body[..], b"[1,2,3]");
/// ```
pub fn to_json<T: Serialize>(value: &T) -> Result<Bytes> {
    let encoded = serde_json::to_vec(value)?;
    Ok(Bytes::from(encoded))
}

/// Decode a JSON body into `T`.
///
/// # Errors
///
/// Fails with [`Error::JsonDeserialization`] carrying the path of the offending
/// field. Syntax errors report the document root as their path.
pub fn from_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let deserializer = &mut serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(deserializer).map_err(|failure| {
        let path = failure.path().to_string();
        Error::json_deserialization(path, failure.into_inner().to_string())
    })
}
