use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::protocol::{Addr, CodeId, DebugId};

/// Debug information for native and JVM events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebugMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<DebugImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_info: Option<SystemSdkInfo>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// The platform SDK a native app was built against, e.g. `iOS 10.3.1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemSdkInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_major: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_minor: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_patchlevel: Option<u64>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DebugImage {
    Apple(Box<AppleDebugImage>),
    Native(Box<NativeDebugImage>),
    Proguard(Box<ProguardDebugImage>),
    /// Unknown or missing `type`, kept exactly as received.
    Other(Map<String, Value>),
}

impl DebugImage {
    pub fn image_type(&self) -> Option<&'static str> {
        match self {
            DebugImage::Apple(_) => Some("apple"),
            DebugImage::Native(image) => Some(image.kind.as_str()),
            DebugImage::Proguard(_) => Some("proguard"),
            DebugImage::Other(_) => None,
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

impl Serialize for DebugImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DebugImage::Apple(image) => Tagged {
                ty: "apple",
                inner: image,
            }
            .serialize(serializer),
            DebugImage::Native(image) => Tagged {
                ty: image.kind.as_str(),
                inner: image,
            }
            .serialize(serializer),
            DebugImage::Proguard(image) => Tagged {
                ty: "proguard",
                inner: image,
            }
            .serialize(serializer),
            DebugImage::Other(map) => map.serialize(serializer),
        }
    }
}

/// Image in the legacy Apple crash report format.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppleDebugImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_type: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_subtype: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_addr: Option<Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_vmaddr: Option<Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeImageKind {
    Elf,
    Pe,
    MachO,
}

impl NativeImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeImageKind::Elf => "elf",
            NativeImageKind::Pe => "pe",
            NativeImageKind::MachO => "macho",
        }
    }
}

impl FromStr for NativeImageKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "elf" => Ok(NativeImageKind::Elf),
            "pe" => Ok(NativeImageKind::Pe),
            "macho" => Ok(NativeImageKind::MachO),
            _ => Err(()),
        }
    }
}

/// An ELF, PE or Mach-O image loaded into the process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeDebugImage {
    #[serde(skip)]
    pub kind: NativeImageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_id: Option<CodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_id: Option<DebugId>, // Required, images without one are dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_addr: Option<Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_vmaddr: Option<Addr>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl NativeDebugImage {
    pub fn new(kind: NativeImageKind) -> Self {
        Self {
            kind,
            code_file: None,
            code_id: None,
            debug_file: None,
            debug_id: None,
            arch: None,
            image_addr: None,
            image_size: None,
            image_vmaddr: None,
            other: Map::new(),
        }
    }
}

/// A ProGuard mapping file, referenced by its uuid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProguardDebugImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}
