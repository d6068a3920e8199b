use serde_json::{Map, Value};

use crate::normalize::fields::Fields;
use crate::normalize::path::FieldPath;
use crate::normalize::shape::{self, MicroSyntax};
use crate::normalize::{coerce, ProcessingState};
use crate::protocol::{PairList, Request};

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub fn request(value: Value, path: &FieldPath, state: &mut ProcessingState) -> Option<Request> {
    let map = shape::object(value, path, state)?;
    let mut f = Fields::new(map, path.clone());

    let mut request = Request {
        url: f.get("url", state, coerce::string),
        method: f
            .get("method", state, coerce::string)
            .map(|m| m.to_ascii_uppercase()),
        data: f.get("data", state, coerce::any),
        query_string: f.get("query_string", state, query_string),
        fragment: f.get("fragment", state, coerce::string),
        cookies: f.get("cookies", state, cookies),
        headers: f.get("headers", state, headers),
        env: f.get("env", state, coerce::object),
        inferred_content_type: f.get("inferred_content_type", state, coerce::string),
        other: f.into_other(),
    };

    move_url_parts(&mut request);
    infer_content_type(&mut request);
    Some(request)
}

fn query_string(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<PairList<String>> {
    let pairs = shape::pairs(value, path, state, Some(MicroSyntax::QueryString))?;
    Some(string_pairs(pairs, path, state))
}

fn cookies(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<PairList<String>> {
    let pairs = shape::pairs(value, path, state, Some(MicroSyntax::Cookies))?;
    Some(string_pairs(pairs, path, state))
}

fn string_pairs(
    pairs: Vec<(String, Value)>,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> PairList<String> {
    let mut out = PairList::new();
    for (key, value) in pairs {
        let entry_path = path.index(out.len());
        if let Some(value) = coerce::lenient_string(value, &entry_path, state) {
            out.push(key, value);
        }
    }
    out
}

/// Names are title-cased, multi-valued headers are joined with `, `.
fn headers(
    value: Value,
    path: &FieldPath,
    state: &mut ProcessingState,
) -> Option<PairList<String>> {
    let pairs = shape::pairs(value, path, state, None)?;
    let mut out = PairList::new();
    for (name, value) in pairs {
        let value = match value {
            Value::String(s) => s,
            Value::Array(items) => items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_string(),
        };
        out.push(shape::header_name(&name), value);
    }
    Some(out)
}

/// `https://example.com/path?a=1#top` keeps the path only, when the query string and
/// fragment were not given separately. A `null` counts as given.
fn move_url_parts(request: &mut Request) {
    let Some(mut url) = request.url.take() else {
        return;
    };

    if request.fragment.is_none() && !request.other.contains_key("fragment") {
        if let Some((rest, fragment)) = url.split_once('#') {
            request.fragment = Some(fragment.to_string());
            url = rest.to_string();
        }
    }

    if request.query_string.is_none() && !request.other.contains_key("query_string") {
        if let Some((rest, query)) = url.split_once('?') {
            if let Some(pairs) = shape::parse_query_string(query) {
                request.query_string = Some(pairs.into_iter().collect());
                url = rest.to_string();
            }
        }
    }

    request.url = Some(url);
}

/// Structured bodies are JSON. String bodies are parsed as JSON or as a form when
/// possible. An explicit content type, `null` included, is never replaced.
fn infer_content_type(request: &mut Request) {
    let inferred = match request.data.take() {
        None => None,
        Some(Value::String(body)) => {
            let (data, inferred) = parse_body(body);
            request.data = Some(data);
            inferred
        }
        Some(data @ (Value::Object(_) | Value::Array(_))) => {
            request.data = Some(data);
            Some(JSON_CONTENT_TYPE)
        }
        Some(data) => {
            request.data = Some(data);
            None
        }
    };

    if request.other.contains_key("inferred_content_type") {
        return;
    }
    if let Some(inferred) = inferred {
        request
            .inferred_content_type
            .get_or_insert_with(|| inferred.to_string());
    }
}

fn parse_body(body: String) -> (Value, Option<&'static str>) {
    if let Ok(parsed @ (Value::Object(_) | Value::Array(_))) =
        serde_json::from_str::<Value>(&body)
    {
        return (parsed, Some(JSON_CONTENT_TYPE));
    }

    if body.contains('=') {
        if let Some(pairs) = shape::parse_query_string(&body) {
            let form: Map<String, Value> = pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            return (Value::Object(form), Some(FORM_CONTENT_TYPE));
        }
    }

    (Value::String(body), None)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::normalize::NormalizeConfig;

    fn normalize(value: Value) -> Request {
        let mut state = ProcessingState::new(&NormalizeConfig::default());
        let request = request(value, &FieldPath::root().key("request"), &mut state).unwrap();
        assert!(state.into_errors().is_empty());
        request
    }

    #[test]
    fn url_parts_move_to_their_own_fields() {
        let r = normalize(json!({
            "url": "https://example.com/search?q=rust&page=2#results",
            "method": "post",
        }));

        assert_eq!(r.url.as_deref(), Some("https://example.com/search"));
        assert_eq!(r.fragment.as_deref(), Some("results"));
        assert_eq!(r.method.as_deref(), Some("POST"));
        let qs = r.query_string.unwrap();
        assert_eq!(qs.get("q").unwrap(), "rust");
        assert_eq!(qs.get("page").unwrap(), "2");
    }

    #[test]
    fn explicit_query_string_is_kept() {
        let r = normalize(json!({
            "url": "https://example.com/?a=1",
            "query_string": [["b", "2"]],
        }));
        assert_eq!(r.url.as_deref(), Some("https://example.com/?a=1"));
        assert_eq!(r.query_string.unwrap().get("b").unwrap(), "2");

        let r = normalize(json!({
            "url": "https://example.com/?a=1#top",
            "query_string": null,
            "data": {"a": 1},
            "inferred_content_type": null,
        }));
        assert_eq!(r.url.as_deref(), Some("https://example.com/?a=1"));
        assert_eq!(r.fragment.as_deref(), Some("top"));
        assert_eq!(r.query_string, None);
        assert_eq!(r.inferred_content_type, None);
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({
                "url": "https://example.com/?a=1",
                "data": {"a": 1},
                "fragment": "top",
                "query_string": null,
                "inferred_content_type": null,
            })
        );
    }

    #[test]
    fn cookies_and_headers_accept_all_shapes() {
        let r = normalize(json!({
            "cookies": "PHPSESSID=298zf09hf012fh2; csrftoken=u32t4o3tb3gg43",
            "headers": {"content-type": "text/html", "x-multi": ["a", "b"]},
        }));

        let cookies = r.cookies.unwrap();
        assert_eq!(cookies.get("csrftoken").unwrap(), "u32t4o3tb3gg43");
        assert_eq!(
            serde_json::to_value(r.headers.unwrap()).unwrap(),
            json!([["Content-Type", "text/html"], ["X-Multi", "a, b"]])
        );

        let r = normalize(json!({"cookies": [["a", "1"], ["a", "2"]]}));
        assert_eq!(r.cookies.unwrap().len(), 2);
    }

    #[test]
    fn bodies_get_a_content_type() {
        let r = normalize(json!({"data": "{\"foo\": \"bar\"}"}));
        assert_eq!(r.data, Some(json!({"foo": "bar"})));
        assert_eq!(r.inferred_content_type.as_deref(), Some(JSON_CONTENT_TYPE));

        let r = normalize(json!({"data": "foo=bar&baz=1"}));
        assert_eq!(r.data, Some(json!({"foo": "bar", "baz": "1"})));
        assert_eq!(r.inferred_content_type.as_deref(), Some(FORM_CONTENT_TYPE));

        let r = normalize(json!({"data": "plain text"}));
        assert_eq!(r.data, Some(json!("plain text")));
        assert_eq!(r.inferred_content_type, None);

        let r = normalize(json!({"data": [1, 2], "inferred_content_type": "application/x-custom"}));
        assert_eq!(
            r.inferred_content_type.as_deref(),
            Some("application/x-custom")
        );
    }
}
