//! Resolves polymorphic records into one of their known variants.
//!
//! Discrimination only looks at the record; it never fails and never drops anything.
//! Whatever cannot be resolved goes to the open variant untouched.

use serde_json::{Map, Value};

use crate::protocol::{ContextKind, NativeImageKind};

/// A recognized `type` decides. Otherwise the alias the context is stored under
/// decides (`"os": {...}` is an OS context). Both comparisons are case-sensitive.
pub fn context_kind(alias: &str, context: &Map<String, Value>) -> Option<ContextKind> {
    context
        .get("type")
        .and_then(Value::as_str)
        .and_then(|ty| ty.parse().ok())
        .or_else(|| alias.parse().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageVariant {
    Apple,
    Native(NativeImageKind),
    Proguard,
}

/// `None` for images without a known `type`.
pub fn image_variant(image: &Map<String, Value>) -> Option<ImageVariant> {
    match image.get("type").and_then(Value::as_str)? {
        "apple" => Some(ImageVariant::Apple),
        "proguard" => Some(ImageVariant::Proguard),
        ty => ty.parse().ok().map(ImageVariant::Native),
    }
}
