use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::normalize::fields::Fields;
use crate::normalize::path::FieldPath;
use crate::normalize::stacktrace::stacktrace;
use crate::normalize::{coerce, rules, shape, ProcessingState};
use crate::protocol::{CError, Exception, MachException, Mechanism, MechanismMeta, PosixSignal};

// "ValueError: invalid literal" or "java.lang.NullPointerException: oops"
static TYPE_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(\w+(?:\.\w+)*):(?: (.*))?$").expect("exception value regex is valid")
});

pub fn exception(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Exception> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    let mut exception = Exception {
        ty: f.get("type", state, coerce::string),
        value: f.get("value", state, coerce::lenient_string),
        module: f.get("module", state, coerce::string),
        thread_id: f.get("thread_id", state, coerce::thread_id),
        mechanism: f.get("mechanism", state, mechanism),
        stacktrace: f.get("stacktrace", state, stacktrace),
        other: f.into_other(),
    };
    split_type_from_value(&mut exception);

    rules::apply(exception, path, state)
}

/// Some SDKs only send the rendered `Type: message` string. An explicit `null` type
/// is left alone.
fn split_type_from_value(exception: &mut Exception) {
    if exception.ty.is_some() || exception.other.contains_key("type") {
        return;
    }
    let Some(value) = &exception.value else {
        return;
    };
    let Some(caps) = TYPE_VALUE_REGEX.captures(value) else {
        return;
    };

    let ty = caps[1].to_string();
    let rest = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
    exception.ty = Some(ty);
    exception.value = (!rest.is_empty()).then_some(rest);
}

fn mechanism(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Mechanism> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    let mechanism = Mechanism {
        ty: f.get("type", state, coerce::string),
        description: f.get("description", state, coerce::string),
        help_link: f.get("help_link", state, coerce::string),
        handled: f.get("handled", state, coerce::bool),
        synthetic: f.get("synthetic", state, coerce::bool),
        source: f.get("source", state, coerce::string),
        exception_id: f.get("exception_id", state, coerce::u64),
        parent_id: f.get("parent_id", state, coerce::u64),
        is_exception_group: f.get("is_exception_group", state, coerce::bool),
        data: f.get("data", state, coerce::object),
        meta: f.get("meta", state, mechanism_meta),
        other: f.into_other(),
    };

    rules::apply(mechanism, path, state)
}

fn mechanism_meta(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<MechanismMeta> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    Some(MechanismMeta {
        errno: f.get("errno", state, errno),
        signal: f.get("signal", state, signal),
        mach_exception: f.get("mach_exception", state, mach_exception),
        other: f.into_other(),
    })
}

fn errno(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<CError> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    Some(CError {
        number: f.get("number", state, coerce::i64),
        name: f.get("name", state, coerce::string),
        other: f.into_other(),
    })
}

fn signal(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<PosixSignal> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    Some(PosixSignal {
        number: f.get("number", state, coerce::i64),
        code: f.get("code", state, coerce::i64),
        name: f.get("name", state, coerce::string),
        code_name: f.get("code_name", state, coerce::string),
        other: f.into_other(),
    })
}

fn mach_exception(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<MachException> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    Some(MachException {
        exception: f.get("exception", state, coerce::i64),
        code: f.get("code", state, coerce::u64),
        subcode: f.get("subcode", state, coerce::u64),
        name: f.get("name", state, coerce::string),
        other: f.into_other(),
    })
}
