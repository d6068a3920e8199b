use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ErrorKind;
use crate::normalize::fields::Fields;
use crate::normalize::path::FieldPath;
use crate::normalize::{coerce, rules, shape, ProcessingState};
use crate::protocol::{Frame, Stacktrace, Thread};

pub fn stacktrace(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Stacktrace> {
    let map = shape::object(value, path, state)?;
    let mut fields = Fields::new(map, path.clone());

    let frames = match fields.claim("frames") {
        Some(value) => frames(value, &path.key("frames"), state).unwrap_or_default(),
        None => Vec::new(),
    };

    let stacktrace = Stacktrace {
        frames,
        lang: fields.get("lang", state, coerce::string),
        registers: fields.get("registers", state, registers),
        other: fields.into_other(),
    };

    rules::apply(stacktrace, path, state)
}

fn frames(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Vec<Frame>> {
    let items = shape::array(value, path, state)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if item.is_null() {
            continue;
        }
        if let Some(frame) = frame(item, &path.index(out.len()), state) {
            out.push(frame);
        }
    }
    Some(out)
}

pub fn frame(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Frame> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    let frame = Frame {
        filename: f.get("filename", state, coerce::string),
        abs_path: f.get("abs_path", state, coerce::string),
        function: f.get("function", state, coerce::string),
        raw_function: f.get("raw_function", state, coerce::raw_function),
        symbol: f.get("symbol", state, coerce::string),
        module: f.get("module", state, coerce::string),
        package: f.get("package", state, coerce::string),
        platform: f.get("platform", state, coerce::string),
        lineno: f.get("lineno", state, coerce::u64),
        colno: f.get("colno", state, coerce::u64),
        pre_context: f.get("pre_context", state, coerce::context_lines),
        context_line: f.get("context_line", state, coerce::lenient_string),
        post_context: f.get("post_context", state, coerce::context_lines),
        in_app: f.get("in_app", state, coerce::bool),
        vars: f.get("vars", state, frame_vars),
        instruction_addr: f.get("instruction_addr", state, coerce::addr),
        symbol_addr: f.get("symbol_addr", state, coerce::addr),
        image_addr: f.get("image_addr", state, coerce::addr),
        addr_mode: f.get("addr_mode", state, coerce::string),
        other: f.into_other(),
    };

    rules::apply(frame, path, state)
}

/// Local variables. Some SDKs send positional arguments as a list, those are keyed
/// by their index.
fn frame_vars(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        Value::Array(items) => Some(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        ),
        other => {
            state.push(path, ErrorKind::ShapeMismatch, Some(other));
            None
        }
    }
}

fn registers(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<BTreeMap<String, String>> {
    let map = shape::object(value, path, state)?;
    let mut out = BTreeMap::new();
    for (name, value) in map {
        if value.is_null() {
            continue;
        }
        let register_path = path.key(&name);
        // Register values are addresses, normalized to the same hex form
        if let Some(addr) = coerce::addr(value, &register_path, state) {
            out.insert(name, addr.to_string());
        }
    }
    Some(out)
}

pub fn thread(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Thread> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    Some(Thread {
        id: f.get("id", state, coerce::thread_id),
        name: f.get("name", state, coerce::string),
        crashed: f.get("crashed", state, coerce::bool),
        current: f.get("current", state, coerce::bool),
        stacktrace: f.get("stacktrace", state, stacktrace),
        other: f.into_other(),
    })
}
