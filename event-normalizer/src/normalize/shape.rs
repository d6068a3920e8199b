//! Picks one of the accepted wire shapes of a field and canonicalizes it.

use serde_json::{Map, Value};

use crate::error::ErrorKind;
use crate::normalize::path::FieldPath;
use crate::normalize::ProcessingState;

/// String forms a pair list may arrive in, besides an object or a list of pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicroSyntax {
    /// `a=1&b=2`, form-urlencoded, optionally with a leading `?`
    QueryString,
    /// `a=1; b=2`
    Cookies,
}

pub fn object(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        other => {
            state.push(path, ErrorKind::ShapeMismatch, Some(other));
            None
        }
    }
}

pub fn array(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        other => {
            state.push(path, ErrorKind::ShapeMismatch, Some(other));
            None
        }
    }
}

/// `{"values": [...], ...}` or a bare array. Returns the entries and the container's
/// remaining keys.
pub fn values_container(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<(Vec<Value>, Map<String, Value>)> {
    match value {
        Value::Array(items) => Some((items, Map::new())),
        Value::Object(mut map) => match map.shift_remove("values") {
            Some(Value::Array(items)) => Some((items, map)),
            Some(Value::Null) | None => Some((Vec::new(), map)),
            Some(other) => {
                state.push(&path.key("values"), ErrorKind::ShapeMismatch, Some(other));
                None
            }
        },
        other => {
            state.push(path, ErrorKind::ShapeMismatch, Some(other));
            None
        }
    }
}

/// An object, a list of `[key, value]` pairs, or (when the field allows it) a string
/// micro-syntax, as ordered pairs. Pairs with a null key or value are dropped silently,
/// since the schema allows them.
pub fn pairs(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
    syntax: Option<MicroSyntax>,
) -> Option<Vec<(String, Value)>> {
    match value {
        Value::Object(map) => Some(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Null => {}
                    Value::Array(pair) if pair.len() == 2 => {
                        let mut pair = pair.into_iter();
                        let (Some(key), Some(value)) = (pair.next(), pair.next()) else {
                            continue;
                        };
                        if key.is_null() || value.is_null() {
                            continue;
                        }
                        let key = match key {
                            Value::String(key) => key,
                            other => other.to_string(),
                        };
                        out.push((key, value));
                    }
                    other => {
                        state.push(&path.index(out.len()), ErrorKind::ShapeMismatch, Some(other))
                    }
                }
            }
            Some(out)
        }
        Value::String(s) if syntax.is_some() => {
            let parsed = match syntax {
                Some(MicroSyntax::QueryString) => parse_query_string(&s),
                Some(MicroSyntax::Cookies) => Some(parse_cookies(&s)),
                None => None,
            };
            match parsed {
                Some(pairs) => Some(
                    pairs
                        .into_iter()
                        .map(|(k, v)| (k, Value::String(v)))
                        .collect(),
                ),
                None => {
                    state.push(path, ErrorKind::InvalidData, Some(Value::String(s)));
                    None
                }
            }
        }
        other => {
            state.push(path, ErrorKind::ShapeMismatch, Some(other));
            None
        }
    }
}

pub fn parse_query_string(s: &str) -> Option<Vec<(String, String)>> {
    let s = s.strip_prefix('?').unwrap_or(s);
    serde_urlencoded::from_str::<Vec<(String, String)>>(s).ok()
}

pub fn parse_cookies(s: &str) -> Vec<(String, String)> {
    s.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
            None => (segment.to_string(), String::new()),
        })
        .collect()
}

/// `content-TYPE` -> `Content-Type`
pub fn header_name(name: &str) -> String {
    name.trim()
        .split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
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
    fn values_containers_accept_bare_arrays() {
        let mut state = new_state();
        let path = FieldPath::root().key("exception");

        let (values, other) = values_container(json!([{"type": "A"}]), &path, &mut state).unwrap();
        assert_eq!(values.len(), 1);
        assert!(other.is_empty());

        let (values, other) =
            values_container(json!({"values": [1, 2], "extra": true}), &path, &mut state)
                .unwrap();
        assert_eq!(values, vec![json!(1), json!(2)]);
        assert_eq!(other["extra"], json!(true));

        assert!(values_container(json!("nope"), &path, &mut state).is_none());
        assert_eq!(state.into_errors().len(), 1);
    }

    #[test]
    fn pairs_from_objects_and_lists_agree() {
        let mut state = new_state();
        let path = FieldPath::root().key("tags");

        let from_object = pairs(json!({"a": "1", "b": "2", "c": null}), &path, &mut state, None);
        let from_list = pairs(
            json!([["a", "1"], null, ["b", "2"], [null, "x"], ["c", null]]),
            &path,
            &mut state,
            None,
        );
        assert_eq!(from_object, from_list);
        assert!(state.into_errors().is_empty());
    }

    #[test]
    fn malformed_pairs_are_reported() {
        let mut state = new_state();
        let path = FieldPath::root().key("tags");

        let out = pairs(json!([["a", "1"], ["lonely"], 7]), &path, &mut state, None).unwrap();
        assert_eq!(out.len(), 1);

        let errors = state.into_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].name.as_deref(), Some("tags.1"));
        assert_eq!(errors[0].kind, ErrorKind::ShapeMismatch);

        let mut state = new_state();
        assert!(pairs(json!("a=b"), &path, &mut state, None).is_none());
    }

    #[test]
    fn string_micro_syntaxes() {
        assert_eq!(
            parse_query_string("?foo=bar&baz=a%20b&foo=2").unwrap(),
            vec![
                ("foo".to_string(), "bar".to_string()),
                ("baz".to_string(), "a b".to_string()),
                ("foo".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(
            parse_cookies("PHPSESSID=298zf09hf012fh2; csrftoken=u32t4o3tb3gg43;flag"),
            vec![
                ("PHPSESSID".to_string(), "298zf09hf012fh2".to_string()),
                ("csrftoken".to_string(), "u32t4o3tb3gg43".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn header_names_are_title_cased() {
        assert_eq!(header_name("content-TYPE"), "Content-Type");
        assert_eq!(header_name("x-forwarded-for"), "X-Forwarded-For");
        assert_eq!(header_name("Accept"), "Accept");
    }
}
