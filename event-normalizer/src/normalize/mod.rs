//! The decoding and normalization pipeline.
//!
//! A payload goes through the raw decoder once, then every record decoder walks its
//! fields depth-first: shape resolution, variant discrimination, field coercion and
//! cross-field rules, with one [`ErrorAccumulator`] threaded through the whole walk.

use envconfig::Envconfig;
use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::{DecodeError, ErrorKind, EventProcessingError};
use crate::metric_consts::{EVENTS_DECODED, EVENT_DECODE_FAILED};
use crate::protocol::Event;

pub mod accumulator;
pub mod coerce;
mod contexts;
mod debug_meta;
pub mod discriminate;
mod event;
mod exception;
pub mod fields;
pub mod path;
pub mod raw;
mod records;
mod request;
pub mod rules;
pub mod shape;
mod stacktrace;

pub use accumulator::ErrorAccumulator;
pub use path::FieldPath;

#[derive(Envconfig, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeConfig {
    #[envconfig(default = "8192")]
    pub max_message_length: usize, // Applies to `message` and `formatted`

    #[envconfig(default = "200")]
    pub max_tag_length: usize, // Exclusive, for tag keys and values alike

    #[envconfig(default = "256")]
    pub max_raw_function_length: usize,

    // Events without an id get a fresh one, without reporting an error
    #[envconfig(default = "true")]
    pub backfill_event_id: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_message_length: 8192,
            max_tag_length: 200,
            max_raw_function_length: 256,
            backfill_event_id: true,
        }
    }
}

/// Everything one decode pass carries around: the limits and the error accumulator.
#[derive(Debug)]
pub struct ProcessingState {
    config: NormalizeConfig,
    errors: ErrorAccumulator,
}

impl ProcessingState {
    pub fn new(config: &NormalizeConfig) -> Self {
        Self {
            config: *config,
            errors: ErrorAccumulator::new(),
        }
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    pub fn push(&mut self, path: &FieldPath, kind: ErrorKind, value: Option<Value>) {
        self.errors.push(path, kind, value);
    }

    pub fn dropped(&mut self, path: &FieldPath, kind: ErrorKind, value: Option<Value>) {
        self.errors.dropped(path, kind, value);
    }

    pub fn remember(&mut self, prior: &[EventProcessingError]) {
        self.errors.remember(prior);
    }

    pub fn into_errors(self) -> Vec<EventProcessingError> {
        self.errors.finish()
    }
}

/// The result of a successful decode: the normalized event plus the recoverable
/// errors found on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub event: Event,
    pub errors: Vec<EventProcessingError>,
}

impl NormalizedEvent {
    /// The storage form: new errors are appended to the event's own `errors` list.
    pub fn into_event(self) -> Event {
        let mut event = self.event;
        if !self.errors.is_empty() {
            event.other.shift_remove("errors");
            event
                .errors
                .get_or_insert_with(Vec::new)
                .extend(self.errors);
        }
        event
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventNormalizer {
    config: NormalizeConfig,
}

impl EventNormalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Decodes one payload. Only unreadable payloads are fatal.
    pub fn decode(&self, bytes: &[u8]) -> Result<NormalizedEvent, DecodeError> {
        let result = raw::decode(bytes).map(|root| self.normalize_object(root));
        report_outcome(&result);
        result
    }

    /// Normalizes an already parsed JSON document.
    pub fn normalize_value(&self, value: Value) -> Result<NormalizedEvent, DecodeError> {
        let result = raw::into_object(value).map(|root| self.normalize_object(root));
        report_outcome(&result);
        result
    }

    /// Decodes independent payloads in parallel. Results keep the input order.
    pub fn decode_batch<P>(&self, payloads: &[P]) -> Vec<Result<NormalizedEvent, DecodeError>>
    where
        P: AsRef<[u8]> + Sync,
    {
        payloads
            .par_iter()
            .map(|payload| self.decode(payload.as_ref()))
            .collect()
    }

    #[instrument(skip_all, fields(keys = root.len()))]
    fn normalize_object(&self, root: Map<String, Value>) -> NormalizedEvent {
        let mut state = ProcessingState::new(&self.config);
        let event = event::normalize_event(root, &mut state);
        let errors = state.into_errors();
        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "event normalized with errors");
        }
        NormalizedEvent { event, errors }
    }
}

fn report_outcome(result: &Result<NormalizedEvent, DecodeError>) {
    match result {
        Ok(_) => metrics::counter!(EVENTS_DECODED).increment(1),
        Err(e) => {
            tracing::warn!("failed to decode event: {}", e);
            let cause = match e {
                DecodeError::PayloadDecoding(_) => "payload_decoding",
                DecodeError::Parsing(_) => "parsing",
                DecodeError::NotAnObject(_) => "not_an_object",
            };
            metrics::counter!(EVENT_DECODE_FAILED, "cause" => cause).increment(1);
        }
    }
}
