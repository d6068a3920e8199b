use std::fmt;

/// Dotted location of a field inside the event, e.g. `exception.values.0.mechanism`.
/// Indices refer to positions in the normalized output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_string())
        } else {
            Self(format!("{}.{}", self.0, key))
        }
    }

    pub fn index(&self, index: usize) -> Self {
        self.key(&index.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The error name for this location, `None` for the event itself.
    pub fn name(&self) -> Option<String> {
        (!self.is_root()).then(|| self.0.clone())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("<event>")
        } else {
            f.write_str(&self.0)
        }
    }
}
