use serde::Serialize;
use serde_json::{Map, Value};

/// The client SDK that produced the event. `name` and `version` are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientSdkInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>, // `entity.ecosystem[.flavor]`, e.g. `sentry.python`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<ClientSdkPackage>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientSdkPackage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>, // `source:identifier`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}
