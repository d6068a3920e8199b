//! Lenient per-field type coercions.
//!
//! Every coercer takes the raw value, its path and the processing state, and returns
//! `None` (after recording why) when the value cannot be used. A JSON type that the
//! field never accepts is a `shape_mismatch`; the right type with unusable content is
//! `invalid_data`.

use serde_json::{Map, Value};

use crate::error::ErrorKind;
use crate::normalize::path::FieldPath;
use crate::normalize::shape;
use crate::normalize::ProcessingState;
use crate::protocol::{
    Addr, CodeId, DebugId, EventType, Fingerprint, Level, SpanId, ThreadId, Timestamp, TraceId,
};

fn mismatch<T>(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<T> {
    state.push(path, ErrorKind::ShapeMismatch, Some(value));
    None
}

fn invalid<T>(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<T> {
    state.push(path, ErrorKind::InvalidData, Some(value));
    None
}

pub fn string(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        other => mismatch(other, path, state),
    }
}

/// Strings pass through, anything else becomes its compact JSON text. Never fails.
pub fn lenient_string(value: Value, _: &FieldPath, _: &mut ProcessingState) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Truncates to `limit` characters, recording the original value.
pub fn cap(s: String, limit: usize, path: &FieldPath, state: &mut ProcessingState) -> String {
    match s.char_indices().nth(limit) {
        Some((end, _)) => {
            let truncated = s[..end].to_string();
            state.push(path, ErrorKind::ValueTooLong, Some(Value::String(s)));
            truncated
        }
        None => s,
    }
}

/// A lenient string capped at the configured message length.
pub fn message(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<String> {
    let limit = state.config().max_message_length;
    let s = lenient_string(value, path, state)?;
    Some(cap(s, limit, path, state))
}

/// Tags must be shorter than `max_tag_length`, keys and values alike.
fn tag_limit(state: &ProcessingState) -> usize {
    state.config().max_tag_length.saturating_sub(1)
}

pub fn tag_key(key: String, path: &FieldPath, state: &mut ProcessingState) -> String {
    let limit = tag_limit(state);
    cap(key, limit, path, state)
}

/// A lenient string capped below the tag limit.
pub fn tag_value(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<String> {
    let limit = tag_limit(state);
    let s = lenient_string(value, path, state)?;
    Some(cap(s, limit, path, state))
}

pub fn raw_function(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<String> {
    let limit = state.config().max_raw_function_length;
    let s = string(value, path, state)?;
    Some(cap(s, limit, path, state))
}

pub fn bool(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(b),
        other => mismatch(other, path, state),
    }
}

/// A JSON number or a decimal string.
pub fn u64(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<u64> {
    let parsed = match &value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

pub fn i64(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<i64> {
    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

pub fn f64(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<f64> {
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

pub fn timestamp(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Timestamp> {
    let parsed = match &value {
        Value::Number(n) => n.as_f64().and_then(Timestamp::from_epoch_seconds),
        Value::String(s) => Timestamp::parse(s),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

pub fn level(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Level> {
    let parsed = match &value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().and_then(Level::from_number),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

pub fn event_type(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<EventType> {
    let parsed = match &value {
        Value::String(s) => s.parse().ok(),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

/// Numbers are kept as their decimal text.
pub fn thread_id(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<ThreadId> {
    match value {
        Value::String(s) => Some(ThreadId::new(s)),
        Value::Number(n) => Some(ThreadId::new(n.to_string())),
        other => mismatch(other, path, state),
    }
}

/// Numbers are read as the integer value of the 64-bit id.
pub fn span_id(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<SpanId> {
    let parsed = match &value {
        Value::String(s) => SpanId::parse(s),
        Value::Number(n) => n.as_u64().and_then(|n| SpanId::parse(&format!("{n:016x}"))),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

pub fn trace_id(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<TraceId> {
    let parsed = match &value {
        Value::String(s) => TraceId::parse(s),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

pub fn debug_id(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<DebugId> {
    let parsed = match &value {
        Value::String(s) => DebugId::parse(s),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

pub fn code_id(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<CodeId> {
    let parsed = match &value {
        Value::String(s) => CodeId::parse(s),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

pub fn addr(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Addr> {
    let parsed = match &value {
        Value::String(s) => Addr::parse(s),
        Value::Number(n) => n.as_u64().map(Addr),
        _ => return mismatch(value, path, state),
    };
    parsed.or_else(|| invalid(value, path, state))
}

/// A list of strings or a single scalar. Numbers and booleans are stringified.
pub fn fingerprint(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Fingerprint> {
    let items = match value {
        Value::Array(items) => items,
        scalar @ (Value::String(_) | Value::Number(_) | Value::Bool(_)) => vec![scalar],
        other => return mismatch(other, path, state),
    };

    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Null => {}
            Value::String(s) => parts.push(s),
            scalar @ (Value::Number(_) | Value::Bool(_)) => parts.push(scalar.to_string()),
            other => state.push(&path.index(parts.len()), ErrorKind::InvalidData, Some(other)),
        }
    }

    // An empty fingerprint is dropped like any other unusable one
    let fingerprint = Fingerprint::new(parts);
    if fingerprint.is_none() {
        state.push(path, ErrorKind::InvalidData, None);
    }
    fingerprint
}

pub fn object(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Map<String, Value>> {
    shape::object(value, path, state)
}

/// `(string | null)[]`, null entries dropped.
pub fn string_list(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Vec<String>> {
    let items = shape::array(value, path, state)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if item.is_null() {
            continue;
        }
        let item_path = path.index(out.len());
        if let Some(s) = string(item, &item_path, state) {
            out.push(s);
        }
    }
    Some(out)
}

/// Source context lines. Nulls keep their position, so they stay.
pub fn context_lines(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Vec<Option<String>>> {
    let items = shape::array(value, path, state)?;
    let lines = items
        .into_iter()
        .map(|item| match item {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .collect();
    Some(lines)
}

/// Any JSON value except null.
pub fn any(value: Value, _: &FieldPath, _: &mut ProcessingState) -> Option<Value> {
    Some(value)
}
