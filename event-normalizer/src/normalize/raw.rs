use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::metric_consts::GZIP_PAYLOADS;

const GZIP_MAGIC_NUMBERS: [u8; 3] = [0x1f, 0x8b, 8];

/// Turns a payload into the loose JSON tree the rest of the pipeline walks.
/// Gzip-compressed payloads are inflated first.
pub fn decode(bytes: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    tracing::debug!(len = bytes.len(), "decoding event payload");

    let payload = if bytes.starts_with(&GZIP_MAGIC_NUMBERS) {
        metrics::counter!(GZIP_PAYLOADS).increment(1);
        let mut d = GzDecoder::new(bytes);
        let mut buf = Vec::new();
        d.read_to_end(&mut buf).map_err(|e| {
            tracing::error!("failed to decode gzip: {}", e);
            DecodeError::PayloadDecoding(String::from("invalid gzip data"))
        })?;
        Cow::Owned(buf)
    } else {
        Cow::Borrowed(bytes)
    };

    into_object(serde_json::from_slice(&payload)?)
}

/// The root must be an object, anything else is rejected outright.
pub fn into_object(value: Value) -> Result<Map<String, Value>, DecodeError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::NotAnObject(json_type(&other))),
    }
}

pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
