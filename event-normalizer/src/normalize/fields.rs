use serde_json::{Map, Value};

use crate::normalize::path::FieldPath;
use crate::normalize::ProcessingState;

/// The remaining keys of one input record.
///
/// Decoders take the keys they know; whatever is left over becomes the record's
/// `other` map, in input order. A known key set to `null` is left over as well, so
/// the output says `null` where the input did and stays silent where it did.
#[derive(Debug)]
pub struct Fields {
    map: Map<String, Value>,
    path: FieldPath,
}

impl Fields {
    pub fn new(map: Map<String, Value>, path: FieldPath) -> Self {
        Self { map, path }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Removes a key and returns its value. An explicit `null` is not a value and
    /// stays where it is.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        if self.map.get(key)?.is_null() {
            return None;
        }
        // shift_remove keeps the order of the remaining keys
        self.map.shift_remove(key)
    }

    /// Removes a key, `null` included. For fields the decoder fills in on its own.
    pub fn claim(&mut self, key: &str) -> Option<Value> {
        self.map.shift_remove(key).filter(|value| !value.is_null())
    }

    /// Takes a key and hands it to a coercer along with its path.
    pub fn get<T>(
        &mut self,
        key: &str,
        state: &mut ProcessingState,
        coerce: impl FnOnce(Value, &FieldPath, &mut ProcessingState) -> Option<T>,
    ) -> Option<T> {
        let value = self.take(key)?;
        let path = self.path.key(key);
        coerce(value, &path, state)
    }

    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn peek_str(&self, key: &str) -> Option<&str> {
        self.peek(key).and_then(Value::as_str)
    }

    pub fn into_other(self) -> Map<String, Value> {
        self.map
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::normalize::{coerce, NormalizeConfig};

    #[test]
    fn takes_known_keys_and_keeps_the_rest_in_order() {
        let config = NormalizeConfig::default();
        let mut state = ProcessingState::new(&config);

        let Value::Object(map) = json!({"z": 1, "type": "ValueError", "a": null, "m": [1]})
        else {
            panic!("not an object");
        };
        let mut fields = Fields::new(map, FieldPath::root().key("exception"));

        assert_eq!(fields.peek_str("type"), Some("ValueError"));
        assert_eq!(fields.peek("a"), None);
        assert_eq!(
            fields.get("type", &mut state, coerce::string).as_deref(),
            Some("ValueError")
        );
        assert_eq!(fields.take("a"), None);
        assert_eq!(fields.take("missing"), None);

        let other = fields.into_other();
        assert_eq!(other.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(other.get("a"), Some(&Value::Null));
        assert!(state.into_errors().is_empty());
    }

    #[test]
    fn claimed_keys_are_gone_even_when_null() {
        let Value::Object(map) = json!({"frames": null, "event_id": "abc"}) else {
            panic!("not an object");
        };
        let mut fields = Fields::new(map, FieldPath::root());

        assert_eq!(fields.claim("frames"), None);
        assert_eq!(fields.claim("event_id"), Some(json!("abc")));
        assert!(fields.into_other().is_empty());
    }
}
