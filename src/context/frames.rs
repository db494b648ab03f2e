//! Frame kinds carried by a context chain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::advice::AdviceFrame;
use crate::context::api_version::ApiVersionFrame;
use crate::context::locale::LocaleFrame;
use crate::error::{ResourceError, ResourceResult};

pub const ROOT: &str = "root";
pub const SECURITY: &str = "security";
pub const HTTP: &str = "http";
pub const API_VERSION: &str = "apiVersion";
pub const ADVICE: &str = "advice";
pub const LOCALE: &str = "locale";
pub const INTERNAL: &str = "internal";
pub const ROUTER: &str = "router";

/// Kind-specific state of one context frame.
#[derive(Debug)]
pub enum Frame {
    /// Start of every chain; carries nothing.
    Root,
    Security(SecurityFrame),
    Http(HttpFrame),
    ApiVersion(ApiVersionFrame),
    Advice(AdviceFrame),
    Locale(LocaleFrame),
    /// Marks a request issued from inside the server.
    Internal,
    Router(RouterFrame),
    Custom(CustomFrame),
}

impl Frame {
    /// Discriminator used for lookup and persistence.
    pub fn kind(&self) -> &str {
        match self {
            Frame::Root => ROOT,
            Frame::Security(_) => SECURITY,
            Frame::Http(_) => HTTP,
            Frame::ApiVersion(_) => API_VERSION,
            Frame::Advice(_) => ADVICE,
            Frame::Locale(_) => LOCALE,
            Frame::Internal => INTERNAL,
            Frame::Router(_) => ROUTER,
            Frame::Custom(custom) => &custom.kind,
        }
    }

    /// Payload as a JSON object, without the frame id.
    pub fn payload(&self) -> Map<String, Value> {
        let value = match self {
            Frame::Root | Frame::Internal => Value::Object(Map::new()),
            Frame::Security(f) => to_object(f),
            Frame::Http(f) => to_object(f),
            Frame::ApiVersion(f) => to_object(f),
            Frame::Advice(f) => f.to_payload(),
            Frame::Locale(f) => to_object(f),
            Frame::Router(f) => to_object(f),
            Frame::Custom(f) => f.payload.clone(),
        };
        match value {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        }
    }
}

fn to_object<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

/// Decode a typed payload, reporting schema mismatches as restore failures.
pub(crate) fn from_payload<T: for<'de> Deserialize<'de>>(
    kind: &str,
    payload: &Value,
) -> ResourceResult<T> {
    serde_json::from_value(payload.clone()).map_err(|e| {
        ResourceError::ContextRestore(format!("payload of kind '{}' is invalid: {}", kind, e))
    })
}

/// Typed access to one frame variant.
pub trait FrameKind {
    /// Discriminator of the variant.
    const KIND: &'static str;

    fn from_frame(frame: &Frame) -> Option<&Self>;
}

/// Identity of the authenticated principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFrame {
    pub authentication_id: String,
    #[serde(default)]
    pub authorization: Map<String, Value>,
}

impl SecurityFrame {
    pub fn new(authentication_id: impl Into<String>) -> Self {
        Self {
            authentication_id: authentication_id.into(),
            authorization: Map::new(),
        }
    }

    pub fn with_authorization(mut self, key: impl Into<String>, value: Value) -> Self {
        self.authorization.insert(key.into(), value);
        self
    }
}

/// The transport-level request that created the chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpFrame {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub parameters: BTreeMap<String, Vec<String>>,
}

impl HttpFrame {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.first())
            .map(String::as_str)
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}

/// What a router matched and what it forwarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterFrame {
    pub matched_uri: String,
    pub remaining_uri: String,
    #[serde(default)]
    pub uri_template_variables: BTreeMap<String, String>,
}

impl RouterFrame {
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.uri_template_variables.get(name).map(String::as_str)
    }
}

/// Application-defined frame registered by name.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomFrame {
    pub kind: String,
    pub payload: Value,
}

impl CustomFrame {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

macro_rules! frame_kind {
    ($ty:ty, $variant:ident, $kind:expr) => {
        impl FrameKind for $ty {
            const KIND: &'static str = $kind;

            fn from_frame(frame: &Frame) -> Option<&Self> {
                match frame {
                    Frame::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

frame_kind!(SecurityFrame, Security, SECURITY);
frame_kind!(HttpFrame, Http, HTTP);
frame_kind!(ApiVersionFrame, ApiVersion, API_VERSION);
frame_kind!(AdviceFrame, Advice, ADVICE);
frame_kind!(LocaleFrame, Locale, LOCALE);
frame_kind!(RouterFrame, Router, ROUTER);
