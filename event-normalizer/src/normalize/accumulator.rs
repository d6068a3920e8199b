use serde_json::Value;
use tracing::debug;

use crate::error::{ErrorKind, EventProcessingError};
use crate::metric_consts::{KNOWN_ERRORS_SKIPPED, PROCESSING_ERRORS, RECORDS_DROPPED};
use crate::normalize::path::FieldPath;

/// Collects the recoverable errors of one decode pass.
///
/// Errors that the input already reported (same name and type) are skipped, so
/// running the normalizer over its own output reports nothing new.
#[derive(Debug, Default)]
pub struct ErrorAccumulator {
    known: Vec<EventProcessingError>,
    errors: Vec<EventProcessingError>,
}

impl ErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors carried over from a previous pass, as read from the input `errors` list.
    pub fn remember(&mut self, prior: &[EventProcessingError]) {
        self.known.extend_from_slice(prior);
    }

    pub fn push(&mut self, path: &FieldPath, kind: ErrorKind, value: Option<Value>) {
        self.record(EventProcessingError::new(path.name(), kind, value));
    }

    /// Like `push`, for a record that was removed from the output.
    pub fn dropped(&mut self, path: &FieldPath, kind: ErrorKind, value: Option<Value>) {
        debug!(path = %path, kind = %kind, "dropping invalid record");
        metrics::counter!(RECORDS_DROPPED, "kind" => kind.as_str().to_string()).increment(1);
        self.push(path, kind, value);
    }

    pub fn record(&mut self, error: EventProcessingError) {
        if self.known.iter().any(|k| k.is_same_violation(&error)) {
            metrics::counter!(KNOWN_ERRORS_SKIPPED).increment(1);
            return;
        }
        metrics::counter!(PROCESSING_ERRORS, "kind" => error.kind.as_str().to_string())
            .increment(1);
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Vec<EventProcessingError> {
        self.errors
    }
}
