//! Strictly typed, normalized event records.
//!
//! These types are only ever produced by the normalizer, so they implement
//! `Serialize` but not `Deserialize`: their serialized form is the canonical one.

mod breadcrumb;
mod contexts;
mod debug_meta;
mod event;
mod exception;
mod ids;
mod pair_list;
mod request;
mod sdk;
mod stacktrace;
mod timestamp;
mod user;

pub use breadcrumb::Breadcrumb;
pub use contexts::{
    AppContext, BrowserContext, Context, ContextKind, Contexts, DeviceContext, GpuContext,
    MonitorContext, OsContext, RuntimeContext, SpanStatus, TraceContext,
};
pub use debug_meta::{
    AppleDebugImage, DebugImage, DebugMeta, NativeDebugImage, NativeImageKind,
    ProguardDebugImage, SystemSdkInfo,
};
pub use event::{Event, EventType, Fingerprint, Level, LogEntry, Values};
pub use exception::{CError, Exception, MachException, Mechanism, MechanismMeta, PosixSignal};
pub use ids::{Addr, CodeId, DebugId, EventId, SpanId, ThreadId, TraceId};
pub use pair_list::PairList;
pub use request::Request;
pub use sdk::{ClientSdkInfo, ClientSdkPackage};
pub use stacktrace::{Frame, Stacktrace, Thread};
pub use timestamp::Timestamp;
pub use user::{Geo, User};
