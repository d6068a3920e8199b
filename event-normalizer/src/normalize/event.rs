use serde_json::{Map, Value};

use crate::error::{ErrorKind, EventProcessingError};
use crate::normalize::contexts::contexts;
use crate::normalize::debug_meta::debug_meta;
use crate::normalize::exception::exception;
use crate::normalize::fields::Fields;
use crate::normalize::path::FieldPath;
use crate::normalize::request::request;
use crate::normalize::stacktrace::{stacktrace, thread};
use crate::normalize::{coerce, records, rules, shape, ProcessingState};
use crate::protocol::{Breadcrumb, Event, Exception, LogEntry, Thread, Values};

type Decoder<T> = fn(Value, &FieldPath, &mut ProcessingState) -> Option<T>;

/// Decodes the root object. Never fails: every problem ends up in `state`.
pub fn normalize_event(root: Map<String, Value>, state: &mut ProcessingState) -> Event {
    let path = FieldPath::root();
    let mut f = Fields::new(root, path.clone());

    // Prior errors first, so the rest of the walk knows what was already reported
    let errors = f.get("errors", state, processing_errors);
    if let Some(prior) = &errors {
        state.remember(prior);
    }

    let event_id = rules::resolve_event_id(f.claim("event_id"), &path.key("event_id"), state);
    let logentry = event_logentry(&mut f, state);

    let event = Event {
        event_id,
        ty: f.get("type", state, coerce::event_type),
        timestamp: f.get("timestamp", state, coerce::timestamp),
        received: f.get("received", state, coerce::timestamp),
        level: f.get("level", state, coerce::level),
        platform: f.get("platform", state, coerce::string),
        logger: f.get("logger", state, coerce::string),
        culprit: f.get("culprit", state, coerce::string),
        transaction: f.get("transaction", state, coerce::string),
        server_name: f.get("server_name", state, coerce::string),
        release: f.get("release", state, coerce::lenient_string),
        dist: f.get("dist", state, coerce::lenient_string),
        environment: f.get("environment", state, coerce::string),
        version: f.get("version", state, coerce::lenient_string),
        time_spent: f.get("time_spent", state, coerce::u64),
        fingerprint: f.get("fingerprint", state, coerce::fingerprint),
        logentry,
        exception: f.get("exception", state, exceptions),
        stacktrace: f.get("stacktrace", state, stacktrace),
        threads: f.get("threads", state, threads),
        breadcrumbs: f.get("breadcrumbs", state, breadcrumbs),
        contexts: f.get("contexts", state, contexts),
        tags: f.get("tags", state, records::tags),
        extra: f.get("extra", state, coerce::object),
        modules: f.get("modules", state, records::modules),
        request: f.get("request", state, request),
        user: f.get("user", state, records::user),
        sdk: f.get("sdk", state, records::sdk),
        debug_meta: f.get("debug_meta", state, debug_meta),
        errors,
        other: f.into_other(),
    };

    rules::validate_event(&event, state);
    event
}

/// `logentry`, or the legacy top-level `message` when there is no usable one. A
/// `message` next to a usable `logentry` is left alone.
fn event_logentry(f: &mut Fields, state: &mut ProcessingState) -> Option<LogEntry> {
    let path = f.path().key("logentry");
    if let Some(value) = f.claim("logentry") {
        if let Some(logentry) = records::logentry(value, &path, state) {
            return Some(logentry);
        }
    }
    let message = f.take("message")?;
    records::logentry(message, &path, state)
}

fn exceptions(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Values<Exception>> {
    values(value, path, state, exception)
}

fn threads(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Values<Thread>> {
    values(value, path, state, thread)
}

fn breadcrumbs(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Values<Breadcrumb>> {
    values(value, path, state, records::breadcrumb)
}

/// Entries are decoded under `<path>.values.N`, N counting kept entries only.
fn values<T>(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
    decode: Decoder<T>,
) -> Option<Values<T>> {
    let (items, other) = shape::values_container(value, path, state)?;
    let values_path = path.key("values");

    let mut values = Vec::with_capacity(items.len());
    for item in items {
        if item.is_null() {
            continue;
        }
        if let Some(decoded) = decode(item, &values_path.index(values.len()), state) {
            values.push(decoded);
        }
    }
    Some(Values { values, other })
}

/// The `errors` list of an event that went through normalization before.
fn processing_errors(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Vec<EventProcessingError>> {
    let items = shape::array(value, path, state)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if item.is_null() {
            continue;
        }
        let error_path = path.index(out.len());
        let Some(map) = shape::object(item, &error_path, state) else {
            continue;
        };
        let mut f = Fields::new(map, error_path.clone());

        let Some(kind) = f.get("type", state, coerce::string) else {
            let record = Value::Object(f.into_other());
            state.push(&error_path, ErrorKind::MissingAttribute, Some(record));
            continue;
        };
        out.push(EventProcessingError {
            name: f.get("name", state, coerce::string),
            kind: ErrorKind::from(kind.as_str()),
            value: f.get("value", state, coerce::any),
            other: f.into_other(),
        });
    }
    Some(out)
}
