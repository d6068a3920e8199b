use serde_json::{Map, Value};

use crate::error::ErrorKind;
use crate::normalize::discriminate::context_kind;
use crate::normalize::fields::Fields;
use crate::normalize::path::FieldPath;
use crate::normalize::{coerce, shape, ProcessingState};
use crate::protocol::{
    AppContext, BrowserContext, Context, ContextKind, Contexts, DeviceContext, GpuContext,
    MonitorContext, OsContext, RuntimeContext, SpanStatus, TraceContext,
};

pub fn contexts(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Contexts> {
    let map = shape::object(value, path, state)?;

    let mut out = Contexts::new();
    for (alias, value) in map {
        if value.is_null() {
            continue;
        }
        let context_path = path.key(&alias);
        let Some(context) = shape::object(value, &context_path, state) else {
            continue;
        };
        out.insert(alias.as_str(), context_from(&alias, context, &context_path, state));
    }
    Some(out)
}

fn context_from(
    alias: &str,
    map: Map<String, Value>,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Context {
    let Some(kind) = context_kind(alias, &map) else {
        return Context::Other(map);
    };

    let mut f = Fields::new(map, path.clone());
    // A type naming the kind is written back on output; any other type stays
    if f.peek_str("type").and_then(|ty| ty.parse::<ContextKind>().ok()) == Some(kind) {
        f.take("type");
    }

    match kind {
        ContextKind::Device => Context::Device(Box::new(device(f, state))),
        ContextKind::Os => Context::Os(Box::new(OsContext {
            name: f.get("name", state, coerce::string),
            version: f.get("version", state, coerce::lenient_string),
            build: f.get("build", state, coerce::lenient_string),
            kernel_version: f.get("kernel_version", state, coerce::string),
            rooted: f.get("rooted", state, coerce::bool),
            raw_description: f.get("raw_description", state, coerce::string),
            other: f.into_other(),
        })),
        ContextKind::Runtime => Context::Runtime(Box::new(RuntimeContext {
            name: f.get("name", state, coerce::string),
            version: f.get("version", state, coerce::lenient_string),
            build: f.get("build", state, coerce::lenient_string),
            raw_description: f.get("raw_description", state, coerce::string),
            other: f.into_other(),
        })),
        ContextKind::App => Context::App(Box::new(AppContext {
            app_start_time: f.get("app_start_time", state, coerce::string),
            device_app_hash: f.get("device_app_hash", state, coerce::string),
            build_type: f.get("build_type", state, coerce::string),
            app_identifier: f.get("app_identifier", state, coerce::string),
            app_name: f.get("app_name", state, coerce::string),
            app_version: f.get("app_version", state, coerce::lenient_string),
            app_build: f.get("app_build", state, coerce::lenient_string),
            other: f.into_other(),
        })),
        ContextKind::Browser => Context::Browser(Box::new(BrowserContext {
            name: f.get("name", state, coerce::string),
            version: f.get("version", state, coerce::lenient_string),
            other: f.into_other(),
        })),
        ContextKind::Gpu => Context::Gpu(Box::new(GpuContext {
            name: f.get("name", state, coerce::string),
            version: f.get("version", state, coerce::lenient_string),
            id: f.get("id", state, coerce::any),
            vendor_id: f.get("vendor_id", state, coerce::lenient_string),
            vendor_name: f.get("vendor_name", state, coerce::string),
            memory_size: f.get("memory_size", state, coerce::u64),
            api_type: f.get("api_type", state, coerce::string),
            multi_threaded_rendering: f.get("multi_threaded_rendering", state, coerce::bool),
            npot_support: f.get("npot_support", state, coerce::string),
            other: f.into_other(),
        })),
        ContextKind::Trace => Context::Trace(Box::new(TraceContext {
            trace_id: f.get("trace_id", state, coerce::trace_id),
            span_id: f.get("span_id", state, coerce::span_id),
            parent_span_id: f.get("parent_span_id", state, coerce::span_id),
            op: f.get("op", state, coerce::string),
            status: f.get("status", state, span_status),
            other: f.into_other(),
        })),
        ContextKind::Monitor => Context::Monitor(Box::new(MonitorContext {
            other: f.into_other(),
        })),
    }
}

fn device(mut f: Fields, state: &mut ProcessingState) -> DeviceContext {
    DeviceContext {
        name: f.get("name", state, coerce::string),
        family: f.get("family", state, coerce::string),
        model: f.get("model", state, coerce::string),
        model_id: f.get("model_id", state, coerce::string),
        brand: f.get("brand", state, coerce::string),
        manufacturer: f.get("manufacturer", state, coerce::string),
        arch: f.get("arch", state, coerce::string),
        battery_level: f.get("battery_level", state, coerce::f64),
        charging: f.get("charging", state, coerce::bool),
        online: f.get("online", state, coerce::bool),
        orientation: f.get("orientation", state, coerce::string),
        simulator: f.get("simulator", state, coerce::bool),
        low_memory: f.get("low_memory", state, coerce::bool),
        memory_size: f.get("memory_size", state, coerce::u64),
        free_memory: f.get("free_memory", state, coerce::u64),
        usable_memory: f.get("usable_memory", state, coerce::u64),
        storage_size: f.get("storage_size", state, coerce::u64),
        free_storage: f.get("free_storage", state, coerce::u64),
        external_storage_size: f.get("external_storage_size", state, coerce::u64),
        external_free_storage: f.get("external_free_storage", state, coerce::u64),
        screen_resolution: f.get("screen_resolution", state, coerce::string),
        screen_density: f.get("screen_density", state, coerce::f64),
        screen_dpi: f.get("screen_dpi", state, coerce::u64),
        boot_time: f.get("boot_time", state, coerce::string),
        timezone: f.get("timezone", state, coerce::string),
        other: f.into_other(),
    }
}

fn span_status(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<SpanStatus> {
    let status = coerce::string(value, path, state)?;
    match status.parse() {
        Ok(status) => Some(status),
        Err(()) => {
            state.push(path, ErrorKind::InvalidData, Some(Value::String(status)));
            None
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::normalize::NormalizeConfig;

    fn new_state() -> ProcessingState {
        ProcessingState::new(&NormalizeConfig::default())
    }

    #[test]
    fn unknown_contexts_are_kept_verbatim() {
        let mut state = new_state();
        let contexts = contexts(
            json!({"unknown_widget": {"foo": "bar"}}),
            &FieldPath::root().key("contexts"),
            &mut state,
        )
        .unwrap();

        let mut expected = Map::new();
        expected.insert("foo".to_string(), json!("bar"));
        assert_eq!(
            contexts.get("unknown_widget"),
            Some(&Context::Other(expected))
        );
        assert!(state.into_errors().is_empty());
    }

    #[test]
    fn known_contexts_are_typed() {
        let mut state = new_state();
        let contexts = contexts(
            json!({
                "os": {"name": "iOS", "version": 17, "x_extra": true},
                "client": {"type": "browser", "name": "Chrome", "version": "120.0"},
                "device": {"memory_size": "17179869184", "battery_level": 42.5, "cpu": 8},
                "trace": {"trace_id": "4C79F60C11214EB38604F4AE0781BFB2", "span_id": "FA90FDEAD5F74052", "status": "ok"},
                "broken": 3,
                "gone": null,
            }),
            &FieldPath::root().key("contexts"),
            &mut state,
        )
        .unwrap();

        assert_eq!(contexts.len(), 4);
        assert_eq!(
            serde_json::to_value(&contexts).unwrap(),
            json!({
                "os": {"type": "os", "name": "iOS", "version": "17", "x_extra": true},
                "client": {"type": "browser", "name": "Chrome", "version": "120.0"},
                "device": {
                    "type": "device",
                    "battery_level": 42.5,
                    "memory_size": 17179869184u64,
                    "cpu": 8,
                },
                "trace": {
                    "type": "trace",
                    "trace_id": "4c79f60c11214eb38604f4ae0781bfb2",
                    "span_id": "fa90fdead5f74052",
                    "status": "ok",
                },
            })
        );

        let errors = state.into_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name.as_deref(), Some("contexts.broken"));
        assert_eq!(errors[0].kind, ErrorKind::ShapeMismatch);
    }

    #[test]
    fn foreign_types_keep_the_alias_kind() {
        let mut state = new_state();
        let contexts = contexts(
            json!({
                "os": {"type": "widget", "name": "Linux"},
                "runtime": {"type": 3, "name": "CPython"},
                "app": {"type": null, "app_name": "shop"},
            }),
            &FieldPath::root().key("contexts"),
            &mut state,
        )
        .unwrap();

        let Some(Context::Os(os)) = contexts.get("os") else {
            panic!("expected an os context");
        };
        assert_eq!(os.name.as_deref(), Some("Linux"));
        assert_eq!(os.other.get("type"), Some(&json!("widget")));
        assert!(matches!(contexts.get("runtime"), Some(Context::Runtime(_))));
        assert!(matches!(contexts.get("app"), Some(Context::App(_))));

        assert_eq!(
            serde_json::to_value(&contexts).unwrap(),
            json!({
                "os": {"name": "Linux", "type": "widget"},
                "runtime": {"name": "CPython", "type": 3},
                "app": {"app_name": "shop", "type": null},
            })
        );
        assert!(state.into_errors().is_empty());
    }

    #[test]
    fn bad_fields_are_dropped_not_the_context() {
        let mut state = new_state();
        let contexts = contexts(
            json!({"trace": {"trace_id": "nope", "op": "http.server", "status": "exploded"}}),
            &FieldPath::root().key("contexts"),
            &mut state,
        )
        .unwrap();

        let Some(Context::Trace(trace)) = contexts.get("trace") else {
            panic!("expected a trace context");
        };
        assert_eq!(trace.trace_id, None);
        assert_eq!(trace.op.as_deref(), Some("http.server"));

        let errors = state.into_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].name.as_deref(), Some("contexts.trace.trace_id"));
        assert_eq!(errors[1].name.as_deref(), Some("contexts.trace.status"));
    }
}
