use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ErrorKind;
use crate::normalize::fields::Fields;
use crate::normalize::path::FieldPath;
use crate::normalize::{coerce, rules, shape, ProcessingState};
use crate::protocol::{Breadcrumb, ClientSdkInfo, ClientSdkPackage, Geo, LogEntry, PairList, User};

const USER_KEYS: [&str; 7] = ["id", "email", "ip_address", "username", "name", "geo", "data"];

/// Known user keys are typed, anything else is moved into `data`. Keys already in
/// `data` win.
pub fn user(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<User> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    let mut user = User {
        id: f.get("id", state, coerce::lenient_string),
        email: f.get("email", state, coerce::string),
        ip_address: f.get("ip_address", state, coerce::string),
        username: f.get("username", state, coerce::lenient_string),
        name: f.get("name", state, coerce::string),
        geo: f.get("geo", state, geo),
        data: f.get("data", state, coerce::object),
        other: Map::new(),
    };

    // Known keys left over are explicit nulls
    let (nulls, unknown): (Vec<_>, Vec<_>) = f
        .into_other()
        .into_iter()
        .partition(|(key, _)| USER_KEYS.contains(&key.as_str()));
    user.other = nulls.into_iter().collect();

    if !unknown.is_empty() {
        user.other.shift_remove("data");
        let data = user.data.get_or_insert_with(Map::new);
        for (key, value) in unknown {
            data.entry(key).or_insert(value);
        }
    }

    Some(user)
}

fn geo(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Geo> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    Some(Geo {
        city: f.get("city", state, coerce::string),
        country_code: f.get("country_code", state, coerce::string),
        region: f.get("region", state, coerce::string),
        other: f.into_other(),
    })
}

pub fn sdk(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<ClientSdkInfo> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    let sdk = ClientSdkInfo {
        name: f.get("name", state, coerce::string),
        version: f.get("version", state, coerce::lenient_string),
        integrations: f.get("integrations", state, coerce::string_list),
        packages: f.get("packages", state, packages),
        other: f.into_other(),
    };

    rules::apply(sdk, path, state)
}

fn packages(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Vec<ClientSdkPackage>> {
    let items = shape::array(value, path, state)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if item.is_null() {
            continue;
        }
        let package_path = path.index(out.len());
        let Some(map) = shape::object(item, &package_path, state) else {
            continue;
        };
        let mut f = Fields::new(map, package_path);
        out.push(ClientSdkPackage {
            name: f.get("name", state, coerce::string),
            version: f.get("version", state, coerce::lenient_string),
            other: f.into_other(),
        });
    }
    Some(out)
}

pub fn breadcrumb(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Breadcrumb> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    Some(Breadcrumb {
        timestamp: f.get("timestamp", state, coerce::timestamp),
        ty: f.get("type", state, coerce::string),
        category: f.get("category", state, coerce::string),
        level: f.get("level", state, coerce::level),
        message: f.get("message", state, coerce::message),
        data: f.get("data", state, coerce::object),
        other: f.into_other(),
    })
}

/// An object, or a bare string taken as the already formatted message. `formatted`
/// is filled in from the template when missing.
pub fn logentry(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<LogEntry> {
    let mut entry = match value {
        Value::Object(map) => {
            let mut f = Fields::new(map, path.clone());
            LogEntry {
                message: f.get("message", state, coerce::message),
                formatted: f.get("formatted", state, coerce::message),
                params: f.get("params", state, coerce::any),
                other: f.into_other(),
            }
        }
        other @ Value::Array(_) => {
            state.push(path, ErrorKind::ShapeMismatch, Some(other));
            return None;
        }
        scalar => LogEntry {
            formatted: coerce::message(scalar, &path.key("formatted"), state),
            ..Default::default()
        },
    };

    if entry.formatted.is_none() && !entry.other.contains_key("formatted") {
        if let Some(template) = &entry.message {
            let formatted = match &entry.params {
                Some(Value::Array(params)) => format_params(template, params),
                _ => template.clone(),
            };
            let limit = state.config().max_message_length;
            entry.formatted = Some(coerce::cap(
                formatted,
                limit,
                &path.key("formatted"),
                state,
            ));
        }
    }

    Some(entry)
}

/// Substitutes positional `%s` placeholders. Extra placeholders are left as they are.
fn format_params(template: &str, params: &[Value]) -> String {
    let mut params = params.iter();
    let mut out = String::with_capacity(template.len());
    let mut parts = template.split("%s");
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    for part in parts {
        match params.next() {
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => out.push_str(&other.to_string()),
            None => out.push_str("%s"),
        }
        out.push_str(part);
    }
    out
}

/// Tags as pairs. Keys and values are both kept below the tag limit; errors point
/// at `tags.N.0` for the key and `tags.N.1` for the value.
pub fn tags(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<PairList<String>> {
    let pairs = shape::pairs(value, path, state, None)?;

    let mut out = PairList::new();
    for (key, value) in pairs {
        let entry_path = path.index(out.len());
        let key = coerce::tag_key(key, &entry_path.index(0), state);
        if let Some(value) = coerce::tag_value(value, &entry_path.index(1), state) {
            out.push(key, value);
        }
    }
    Some(out)
}

pub fn modules(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<BTreeMap<String, String>> {
    let map = shape::object(value, path, state)?;
    let mut out = BTreeMap::new();
    for (name, version) in map {
        if version.is_null() {
            continue;
        }
        let module_path = path.key(&name);
        if let Some(version) = coerce::lenient_string(version, &module_path, state) {
            out.insert(name, version);
        }
    }
    Some(out)
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
    fn unknown_user_keys_move_into_data() {
        let mut state = new_state();
        let user = user(
            json!({"id": 42, "email": "a@b.c", "plan": "pro", "data": {"plan": "free"}, "seats": 3}),
            &FieldPath::root().key("user"),
            &mut state,
        )
        .unwrap();

        assert_eq!(user.id.as_deref(), Some("42"));
        assert_eq!(user.data, json!({"plan": "free", "seats": 3}).as_object().cloned());
        assert!(user.other.is_empty());
    }

    #[test]
    fn null_user_keys_stay_null() {
        let mut state = new_state();
        let path = FieldPath::root().key("user");

        let user = user(json!({"id": null, "data": null, "seats": null}), &path, &mut state)
            .unwrap();
        assert_eq!(user.id, None);
        assert_eq!(user.data, json!({"seats": null}).as_object().cloned());
        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            json!({"id": null, "data": {"seats": null}})
        );
        assert!(state.into_errors().is_empty());
    }

    #[test]
    fn sdks_need_name_and_version() {
        let mut state = new_state();
        let path = FieldPath::root().key("sdk");

        assert!(sdk(json!({"name": "sentry.python"}), &path, &mut state).is_none());
        let kept = sdk(
            json!({"name": "sentry.python", "version": "1.40.0", "integrations": ["django", null], "packages": [{"name": "pypi:sentry-sdk", "version": "1.40.0"}]}),
            &path,
            &mut state,
        )
        .unwrap();
        assert_eq!(kept.integrations.unwrap(), vec!["django"]);
        assert_eq!(kept.packages.unwrap().len(), 1);

        let errors = state.into_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name.as_deref(), Some("sdk"));
    }

    #[test]
    fn breadcrumbs_coerce_their_fields() {
        let mut state = new_state();
        let crumb = breadcrumb(
            json!({"timestamp": 1304358096, "message": "clicked", "level": "warn", "data": null}),
            &FieldPath::root().key("breadcrumbs").key("values").index(0),
            &mut state,
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&crumb).unwrap(),
            json!({"timestamp": "2011-05-02T17:41:36Z", "level": "warning", "message": "clicked", "data": null})
        );
        assert!(state.into_errors().is_empty());
    }

    #[test]
    fn logentries_backfill_formatted() {
        let mut state = new_state();
        let path = FieldPath::root().key("logentry");

        let entry = logentry(
            json!({"message": "Sending %s requests to %s", "params": [3, "api"]}),
            &path,
            &mut state,
        )
        .unwrap();
        assert_eq!(entry.formatted.as_deref(), Some("Sending 3 requests to api"));

        let entry = logentry(json!({"message": "hi %s", "params": {"a": 1}}), &path, &mut state)
            .unwrap();
        assert_eq!(entry.formatted.as_deref(), Some("hi %s"));

        let entry = logentry(json!("plain"), &path, &mut state).unwrap();
        assert_eq!(entry.formatted.as_deref(), Some("plain"));
        assert_eq!(entry.message, None);

        let entry = logentry(json!({"message": "hi", "formatted": null}), &path, &mut state)
            .unwrap();
        assert_eq!(entry.formatted, None);
        assert_eq!(entry.other.get("formatted"), Some(&Value::Null));

        assert!(state.into_errors().is_empty());
    }

    #[test]
    fn tags_are_capped_on_both_sides() {
        let config = NormalizeConfig {
            max_tag_length: 5,
            ..Default::default()
        };
        let mut state = ProcessingState::new(&config);
        let path = FieldPath::root().key("tags");

        let tags = tags(
            json!({"environment": "prod", "ok": "value!", "n": 5}),
            &path,
            &mut state,
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&tags).unwrap(),
            json!([["envi", "prod"], ["ok", "valu"], ["n", "5"]])
        );

        let errors = state.into_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].name.as_deref(), Some("tags.0.0"));
        assert_eq!(errors[1].name.as_deref(), Some("tags.1.1"));
        assert!(errors.iter().all(|e| e.kind == ErrorKind::ValueTooLong));
    }
}
