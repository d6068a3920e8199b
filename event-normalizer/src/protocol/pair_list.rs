use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// An ordered multi-map of string keys.
///
/// Tags, headers, cookies and query strings can be sent either as an object or as a
/// list of `[key, value]` pairs. Both shapes end up here: an object yields unique keys,
/// a pair list keeps duplicates and order. The canonical wire form is the pair list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairList<T>(Vec<(String, T)>);

impl<T> Default for PairList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> PairList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: T) {
        self.0.push((key.into(), value));
    }

    /// First value for the key.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for PairList<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<T: Serialize> Serialize for PairList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            seq.serialize_element(&(key, value))?;
        }
        seq.end()
    }
}
