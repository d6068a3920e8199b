use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::protocol::{SpanId, TraceId};

/// Contexts keyed by their alias, in input order. Aliases are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contexts(Vec<(String, Context)>);

impl Contexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>, context: Context) {
        let alias = alias.into();
        match self.0.iter_mut().find(|(a, _)| *a == alias) {
            Some((_, existing)) => *existing = context,
            None => self.0.push((alias, context)),
        }
    }

    pub fn get(&self, alias: &str) -> Option<&Context> {
        self.0.iter().find(|(a, _)| a == alias).map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Context)> {
        self.0.iter().map(|(a, c)| (a.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Contexts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (alias, context) in &self.0 {
            map.serialize_entry(alias, context)?;
        }
        map.end()
    }
}

/// The context types we know how to read. Everything else is kept as an open map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Device,
    Os,
    Runtime,
    App,
    Browser,
    Gpu,
    Trace,
    Monitor,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Device => "device",
            ContextKind::Os => "os",
            ContextKind::Runtime => "runtime",
            ContextKind::App => "app",
            ContextKind::Browser => "browser",
            ContextKind::Gpu => "gpu",
            ContextKind::Trace => "trace",
            ContextKind::Monitor => "monitor",
        }
    }
}

impl FromStr for ContextKind {
    type Err = ();

    // Case-sensitive: `OS` is an alias, not a kind
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(ContextKind::Device),
            "os" => Ok(ContextKind::Os),
            "runtime" => Ok(ContextKind::Runtime),
            "app" => Ok(ContextKind::App),
            "browser" => Ok(ContextKind::Browser),
            "gpu" => Ok(ContextKind::Gpu),
            "trace" => Ok(ContextKind::Trace),
            "monitor" => Ok(ContextKind::Monitor),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Context {
    Device(Box<DeviceContext>),
    Os(Box<OsContext>),
    Runtime(Box<RuntimeContext>),
    App(Box<AppContext>),
    Browser(Box<BrowserContext>),
    Gpu(Box<GpuContext>),
    Trace(Box<TraceContext>),
    Monitor(Box<MonitorContext>),
    /// Anything we could not discriminate, kept exactly as received.
    Other(Map<String, Value>),
}

impl Context {
    pub fn kind(&self) -> Option<ContextKind> {
        match self {
            Context::Device(_) => Some(ContextKind::Device),
            Context::Os(_) => Some(ContextKind::Os),
            Context::Runtime(_) => Some(ContextKind::Runtime),
            Context::App(_) => Some(ContextKind::App),
            Context::Browser(_) => Some(ContextKind::Browser),
            Context::Gpu(_) => Some(ContextKind::Gpu),
            Context::Trace(_) => Some(ContextKind::Trace),
            Context::Monitor(_) => Some(ContextKind::Monitor),
            Context::Other(_) => None,
        }
    }
}

#[derive(Serialize)]
struct Tagged<'a, T> {
    #[serde(rename = "type")]
    ty: &'static str,
    #[serde(flatten)]
    inner: &'a T,
}

/// A `type` the context arrived with is kept as is, otherwise the kind is written.
fn tagged<S: Serializer, T: Serialize>(
    serializer: S,
    kind: ContextKind,
    inner: &T,
    other: &Map<String, Value>,
) -> Result<S::Ok, S::Error> {
    if other.contains_key("type") {
        return inner.serialize(serializer);
    }
    Tagged {
        ty: kind.as_str(),
        inner,
    }
    .serialize(serializer)
}

impl Serialize for Context {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Context::Device(c) => tagged(serializer, ContextKind::Device, c, &c.other),
            Context::Os(c) => tagged(serializer, ContextKind::Os, c, &c.other),
            Context::Runtime(c) => tagged(serializer, ContextKind::Runtime, c, &c.other),
            Context::App(c) => tagged(serializer, ContextKind::App, c, &c.other),
            Context::Browser(c) => tagged(serializer, ContextKind::Browser, c, &c.other),
            Context::Gpu(c) => tagged(serializer, ContextKind::Gpu, c, &c.other),
            Context::Trace(c) => tagged(serializer, ContextKind::Trace, c, &c.other),
            Context::Monitor(c) => tagged(serializer, ContextKind::Monitor, c, &c.other),
            Context::Other(map) => map.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>, // e.g. `iPhone`, `Samsung Galaxy`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f64>, // Percent, 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_memory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usable_memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_storage: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_storage_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_free_storage: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>, // e.g. `800x600`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_dpi: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OsContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>, // Usually the whole `uname` output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_description: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuntimeContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_description: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_app_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_type: Option<String>, // e.g. `testflight`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_build: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BrowserContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpuContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>, // PCI identifier, any shape
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u64>, // Megabytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_threaded_rendering: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npot_support: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<TraceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<SpanId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SpanStatus>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorContext {
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// OpenTelemetry span status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    InternalError,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl FromStr for SpanStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "ok" => SpanStatus::Ok,
            "cancelled" => SpanStatus::Cancelled,
            "unknown" => SpanStatus::Unknown,
            "invalid_argument" => SpanStatus::InvalidArgument,
            "deadline_exceeded" => SpanStatus::DeadlineExceeded,
            "not_found" => SpanStatus::NotFound,
            "already_exists" => SpanStatus::AlreadyExists,
            "permission_denied" => SpanStatus::PermissionDenied,
            "resource_exhausted" => SpanStatus::ResourceExhausted,
            "failed_precondition" => SpanStatus::FailedPrecondition,
            "aborted" => SpanStatus::Aborted,
            "out_of_range" => SpanStatus::OutOfRange,
            "unimplemented" => SpanStatus::Unimplemented,
            "internal_error" => SpanStatus::InternalError,
            "unavailable" => SpanStatus::Unavailable,
            "data_loss" => SpanStatus::DataLoss,
            "unauthenticated" => SpanStatus::Unauthenticated,
            _ => return Err(()),
        };
        Ok(status)
    }
}
