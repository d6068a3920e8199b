use serde::Serialize;
use serde_json::{Map, Value};

use crate::protocol::PairList;

/// The HTTP request that was being handled when the event happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Request {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>, // Without query string or fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_string: Option<PairList<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<PairList<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<PairList<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<Map<String, Value>>, // CGI-style environment, e.g. `REMOTE_ADDR`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_content_type: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}
