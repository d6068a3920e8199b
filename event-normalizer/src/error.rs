use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Failures that reject a whole document. Everything else is recoverable and
/// ends up as an [`EventProcessingError`] on the normalized output.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode payload: {0}")]
    PayloadDecoding(String),
    #[error("failed to parse payload: {0}")]
    Parsing(#[from] serde_json::Error),
    #[error("event payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Errors of the command line wrapper.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    ConfigError(#[from] envconfig::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The value has none of the shapes the field accepts.
    ShapeMismatch,
    /// The value has the right shape but could not be coerced.
    InvalidData,
    /// The value exceeded a length cap and was truncated.
    ValueTooLong,
    /// A required attribute (or attribute combination) is missing.
    MissingAttribute,
    InvalidEventId,
    DuplicateThreadId,
    DuplicateStacktrace,
    MissingFrameLocation,
    /// A kind we did not produce ourselves, read back from an input `errors` list.
    Other(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::ShapeMismatch => "shape_mismatch",
            ErrorKind::InvalidData => "invalid_data",
            ErrorKind::ValueTooLong => "value_too_long",
            ErrorKind::MissingAttribute => "missing_attribute",
            ErrorKind::InvalidEventId => "invalid_event_id",
            ErrorKind::DuplicateThreadId => "duplicate_thread_id",
            ErrorKind::DuplicateStacktrace => "duplicate_stacktrace",
            ErrorKind::MissingFrameLocation => "missing_frame_location",
            ErrorKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for ErrorKind {
    fn from(s: &str) -> Self {
        match s {
            "shape_mismatch" => ErrorKind::ShapeMismatch,
            "invalid_data" => ErrorKind::InvalidData,
            "value_too_long" => ErrorKind::ValueTooLong,
            "missing_attribute" => ErrorKind::MissingAttribute,
            "invalid_event_id" => ErrorKind::InvalidEventId,
            "duplicate_thread_id" => ErrorKind::DuplicateThreadId,
            "duplicate_stacktrace" => ErrorKind::DuplicateStacktrace,
            "missing_frame_location" => ErrorKind::MissingFrameLocation,
            other => ErrorKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A recoverable violation found while normalizing one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventProcessingError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>, // Affected key or deep path, `None` for the event itself
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>, // The offending value, as received or as it stood when dropped
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl EventProcessingError {
    pub fn new(name: Option<String>, kind: ErrorKind, value: Option<Value>) -> Self {
        Self {
            name,
            kind,
            value,
            other: Map::new(),
        }
    }

    pub fn is_same_violation(&self, other: &EventProcessingError) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl fmt::Display for EventProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} at {}", self.kind, name),
            None => write!(f, "{}", self.kind),
        }
    }
}
