//! Saving and restoring context chains.
//!
//! A saved chain is nested JSON, one object per frame:
//!
//! ```text
//! { "kind": "advice",
//!   "payload": { "id": "...", "advices": {...}, ... },
//!   "parent": { "kind": "root", "payload": { "id": "..." } } }
//! ```
//!
//! The frame id travels inside the payload. Restoring maps each `kind` back
//! to a decoder through a [`KindRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::advice::AdviceFrame;
use crate::context::chain::Context;
use crate::context::frames::{
    from_payload, CustomFrame, Frame, ADVICE, API_VERSION, HTTP, INTERNAL, LOCALE, ROOT, ROUTER,
    SECURITY,
};
use crate::error::{ResourceError, ResourceResult};

const FIELD_KIND: &str = "kind";
const FIELD_PAYLOAD: &str = "payload";
const FIELD_PARENT: &str = "parent";
const FIELD_ID: &str = "id";

type Decoder = Arc<dyn Fn(&Value) -> ResourceResult<Frame> + Send + Sync>;

/// Maps frame discriminators to payload decoders.
#[derive(Clone)]
pub struct KindRegistry {
    decoders: HashMap<String, Decoder>,
}

impl KindRegistry {
    /// A registry that knows no kinds at all.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry with every built-in frame kind.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(ROOT, |_| Ok(Frame::Root));
        registry.register(INTERNAL, |_| Ok(Frame::Internal));
        registry.register(SECURITY, |p| Ok(Frame::Security(from_payload(SECURITY, p)?)));
        registry.register(HTTP, |p| Ok(Frame::Http(from_payload(HTTP, p)?)));
        registry.register(API_VERSION, |p| {
            Ok(Frame::ApiVersion(from_payload(API_VERSION, p)?))
        });
        registry.register(ADVICE, |p| Ok(Frame::Advice(AdviceFrame::from_payload(p)?)));
        registry.register(LOCALE, |p| Ok(Frame::Locale(from_payload(LOCALE, p)?)));
        registry.register(ROUTER, |p| Ok(Frame::Router(from_payload(ROUTER, p)?)));
        registry
    }

    /// Register (or replace) the decoder for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, decoder: F) -> &mut Self
    where
        F: Fn(&Value) -> ResourceResult<Frame> + Send + Sync + 'static,
    {
        self.decoders.insert(kind.into(), Arc::new(decoder));
        self
    }

    /// Register an application kind whose payload is kept as opaque JSON.
    pub fn register_custom(&mut self, kind: impl Into<String>) -> &mut Self {
        let kind = kind.into();
        let name = kind.clone();
        self.register(kind, move |payload| {
            Ok(Frame::Custom(CustomFrame::new(name.clone(), payload.clone())))
        })
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    fn decode(&self, kind: &str, payload: &Value) -> ResourceResult<Frame> {
        let decoder = self.decoders.get(kind).ok_or_else(|| {
            ResourceError::ContextRestore(format!("unknown context kind '{}'", kind))
        })?;
        decoder(payload)
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&String> = self.decoders.keys().collect();
        kinds.sort();
        f.debug_struct("KindRegistry").field("kinds", &kinds).finish()
    }
}

impl Context {
    /// Save the chain, this frame outermost and the root innermost.
    pub fn to_json(&self) -> Value {
        let frames: Vec<&Context> = self.ancestors().collect();
        let mut saved: Option<Value> = None;
        for ctx in frames.into_iter().rev() {
            let mut payload = ctx.frame().payload();
            payload.insert(FIELD_ID.to_string(), Value::String(ctx.id().to_string()));

            let mut node = Map::new();
            node.insert(FIELD_KIND.to_string(), Value::String(ctx.kind().to_string()));
            node.insert(FIELD_PAYLOAD.to_string(), Value::Object(payload));
            if let Some(parent) = saved.take() {
                node.insert(FIELD_PARENT.to_string(), parent);
            }
            saved = Some(Value::Object(node));
        }
        saved.unwrap_or(Value::Null)
    }

    /// Rebuild a chain saved by [`Context::to_json`].
    pub fn from_json(saved: &Value, registry: &KindRegistry) -> ResourceResult<Context> {
        let mut nodes = Vec::new();
        let mut cursor = Some(saved);
        while let Some(node) = cursor {
            let object = node.as_object().ok_or_else(|| {
                ResourceError::ContextRestore("saved context frame is not an object".to_string())
            })?;
            let kind = object
                .get(FIELD_KIND)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ResourceError::ContextRestore("saved context frame has no kind".to_string())
                })?;
            let payload = object
                .get(FIELD_PAYLOAD)
                .filter(|p| p.is_object())
                .ok_or_else(|| {
                    ResourceError::ContextRestore(format!(
                        "saved '{}' frame has no payload object",
                        kind
                    ))
                })?;
            cursor = object.get(FIELD_PARENT).filter(|p| !p.is_null());

            let is_root = kind == ROOT;
            if is_root != cursor.is_none() {
                return Err(ResourceError::ContextRestore(format!(
                    "frame '{}' is misplaced: only the root frame may lack a parent",
                    kind
                )));
            }
            nodes.push((kind, payload));
        }

        let mut context: Option<Context> = None;
        for (kind, payload) in nodes.into_iter().rev() {
            let id = payload
                .get(FIELD_ID)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    ResourceError::ContextRestore(format!("saved '{}' frame has no id", kind))
                })?;
            let mut body = payload.clone();
            if let Some(map) = body.as_object_mut() {
                map.remove(FIELD_ID);
            }
            let frame = registry.decode(kind, &body)?;
            context = Some(Context::with_id(context, id, frame));
        }

        context.ok_or_else(|| ResourceError::ContextRestore("empty saved context".to_string()))
    }
}
