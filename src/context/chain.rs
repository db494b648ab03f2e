//! The immutable, singly-linked context chain.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::context::advice::AdviceFrame;
use crate::context::api_version::ApiVersionFrame;
use crate::context::frames::{
    CustomFrame, Frame, FrameKind, HttpFrame, RouterFrame, SecurityFrame, ROUTER,
};
use crate::context::locale::LocaleFrame;
use crate::error::{ResourceError, ResourceResult};

struct ContextNode {
    id: String,
    frame: Frame,
    parent: Option<Context>,
}

/// One frame of request-scoped state plus a shared link to its parent.
///
/// Cloning is cheap and shares the whole chain. A frame's parent is fixed at
/// creation, so chains are acyclic and siblings extended from the same parent
/// never observe each other.
#[derive(Clone)]
pub struct Context {
    node: Arc<ContextNode>,
}

impl Context {
    /// Start a new chain.
    pub fn root() -> Self {
        Self::with_id(None, Uuid::new_v4().to_string(), Frame::Root)
    }

    pub(crate) fn with_id(parent: Option<Context>, id: String, frame: Frame) -> Self {
        Self {
            node: Arc::new(ContextNode { id, frame, parent }),
        }
    }

    /// Add a frame on top of this one.
    ///
    /// A chain has exactly one root, so extending with [`Frame::Root`] fails.
    pub fn extend(&self, frame: Frame) -> ResourceResult<Context> {
        if matches!(frame, Frame::Root) {
            return Err(ResourceError::InvalidArgument(
                "a context chain has exactly one root frame".to_string(),
            ));
        }
        Ok(self.push(frame))
    }

    fn push(&self, frame: Frame) -> Context {
        Self::with_id(Some(self.clone()), Uuid::new_v4().to_string(), frame)
    }

    pub fn with_security(&self, frame: SecurityFrame) -> Context {
        self.push(Frame::Security(frame))
    }

    pub fn with_http(&self, frame: HttpFrame) -> Context {
        self.push(Frame::Http(frame))
    }

    pub fn with_api_version(&self, frame: ApiVersionFrame) -> Context {
        self.push(Frame::ApiVersion(frame))
    }

    pub fn with_advice(&self, frame: AdviceFrame) -> Context {
        self.push(Frame::Advice(frame))
    }

    pub fn with_locale(&self, frame: LocaleFrame) -> Context {
        self.push(Frame::Locale(frame))
    }

    pub fn with_router(&self, frame: RouterFrame) -> Context {
        self.push(Frame::Router(frame))
    }

    pub fn with_custom(&self, frame: CustomFrame) -> Context {
        self.push(Frame::Custom(frame))
    }

    /// Mark everything below as originating inside the server.
    pub fn internal(&self) -> Context {
        self.push(Frame::Internal)
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn kind(&self) -> &str {
        self.node.frame.kind()
    }

    pub fn frame(&self) -> &Frame {
        &self.node.frame
    }

    pub fn parent(&self) -> Option<&Context> {
        self.node.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    /// Frames from this one toward the root.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Nearest frame, this one included, whose discriminator is `kind`.
    pub fn as_context(&self, kind: &str) -> ResourceResult<&Context> {
        self.ancestors()
            .find(|c| c.kind() == kind)
            .ok_or_else(|| ResourceError::ContextNotFound(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.ancestors().any(|c| c.kind() == kind)
    }

    /// Nearest frame of type `T`.
    pub fn get<T: FrameKind>(&self) -> ResourceResult<&T> {
        self.ancestors()
            .find_map(|c| T::from_frame(c.frame()))
            .ok_or_else(|| ResourceError::ContextNotFound(T::KIND.to_string()))
    }

    pub fn contains_frame<T: FrameKind>(&self) -> bool {
        self.get::<T>().is_ok()
    }

    /// Nearest custom frame registered under `kind`.
    pub fn custom(&self, kind: &str) -> ResourceResult<&CustomFrame> {
        match self.as_context(kind)?.frame() {
            Frame::Custom(custom) => Ok(custom),
            _ => Err(ResourceError::ContextNotFound(kind.to_string())),
        }
    }

    /// Append advice to this context's own advice frame.
    ///
    /// Advice frames further up belong to the layers that pushed them; to
    /// advise from below, push a new [`AdviceFrame`] first.
    pub fn put_advice(&self, name: &str, value: &str) -> ResourceResult<()> {
        match self.frame() {
            Frame::Advice(advice) => advice.append(name, value),
            _ if self.contains_frame::<AdviceFrame>() => Err(ResourceError::InvalidArgument(
                "advice can only be added to the context that owns the advice frame".to_string(),
            )),
            _ => Err(ResourceError::ContextNotFound(AdviceFrame::KIND.to_string())),
        }
    }

    /// A route template variable bound by this or any enclosing router.
    pub fn template_variable(&self, name: &str) -> Option<&str> {
        self.ancestors()
            .filter(|c| c.kind() == ROUTER)
            .find_map(|c| match c.frame() {
                Frame::Router(router) => router.variable(name),
                _ => None,
            })
    }

    /// Whether the request came from outside the server.
    ///
    /// The nearest `http` or `internal` frame decides; neither means internal.
    pub fn is_external(&self) -> bool {
        for c in self.ancestors() {
            match c.frame() {
                Frame::Http(_) => return true,
                Frame::Internal => return false,
                _ => {}
            }
        }
        false
    }
}

/// Iterator returned by [`Context::ancestors`].
pub struct Ancestors<'a> {
    next: Option<&'a Context>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Context;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.ancestors().map(Context::kind).collect();
        f.debug_struct("Context")
            .field("id", &self.id())
            .field("chain", &kinds)
            .finish()
    }
}

impl Drop for ContextNode {
    // Unlink iteratively so very long chains cannot overflow the stack.
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(ctx) = next {
            match Arc::try_unwrap(ctx.node) {
                Ok(mut node) => next = node.parent.take(),
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::api_version::Version;
    use std::collections::BTreeMap;

    fn api_version() -> ApiVersionFrame {
        ApiVersionFrame {
            protocol_name: "crest".into(),
            protocol_version: Version::new(2, 0),
            resource_version: None,
        }
    }

    #[test]
    fn test_lookup_returns_nearest() {
        let root = Context::root();
        let outer = root.with_security(SecurityFrame::new("outer"));
        let inner = outer
            .with_api_version(api_version())
            .with_security(SecurityFrame::new("inner"));

        assert_eq!(inner.get::<SecurityFrame>().unwrap().authentication_id, "inner");
        assert_eq!(outer.get::<SecurityFrame>().unwrap().authentication_id, "outer");
        assert_eq!(inner.as_context("apiVersion").unwrap().kind(), "apiVersion");
        assert!(inner.as_context("root").unwrap().is_root());
    }

    #[test]
    fn test_missing_kind() {
        let ctx = Context::root().with_security(SecurityFrame::new("bjensen"));
        assert!(!ctx.contains("advice"));
        assert!(matches!(
            ctx.get::<AdviceFrame>(),
            Err(ResourceError::ContextNotFound(kind)) if kind == "advice"
        ));
        assert!(matches!(
            ctx.put_advice("Warning", "x"),
            Err(ResourceError::ContextNotFound(_))
        ));
    }

    #[test]
    fn test_second_root_rejected() {
        let root = Context::root();
        assert!(root.extend(Frame::Root).is_err());
        assert!(root.extend(Frame::Internal).is_ok());
    }

    #[test]
    fn test_siblings_are_isolated() {
        let parent = Context::root().with_advice(AdviceFrame::new(Vec::<String>::new()));
        let left = parent.with_security(SecurityFrame::new("left"));
        let right = parent.with_security(SecurityFrame::new("right"));

        assert_eq!(left.get::<SecurityFrame>().unwrap().authentication_id, "left");
        assert_eq!(right.get::<SecurityFrame>().unwrap().authentication_id, "right");
        assert!(parent.get::<SecurityFrame>().is_err());
        assert_eq!(left.parent().unwrap().id(), right.parent().unwrap().id());
    }

    #[test]
    fn test_advice_stays_with_its_owner() {
        let parent = Context::root().with_advice(AdviceFrame::new(Vec::<String>::new()));
        parent.put_advice("X-Parent", "yes").unwrap();

        let left = parent.internal();
        let right = parent.internal();
        assert!(matches!(
            left.put_advice("X", "from-left"),
            Err(ResourceError::InvalidArgument(_))
        ));

        let own = right.with_advice(AdviceFrame::new(Vec::<String>::new()));
        own.put_advice("X", "from-right").unwrap();

        let parent_advice = parent.get::<AdviceFrame>().unwrap().advices();
        assert_eq!(parent_advice.len(), 1);
        assert_eq!(parent_advice["X-Parent"], vec!["yes"]);
        assert_eq!(left.get::<AdviceFrame>().unwrap().advices(), parent_advice);
        assert_eq!(right.get::<AdviceFrame>().unwrap().advices(), parent_advice);
        assert_eq!(own.get::<AdviceFrame>().unwrap().advices()["X"], vec!["from-right"]);
    }

    #[test]
    fn test_template_variables_walk_all_routers() {
        let mut outer = BTreeMap::new();
        outer.insert("userId".to_string(), "bjensen".to_string());
        let mut inner = BTreeMap::new();
        inner.insert("deviceId".to_string(), "d1".to_string());

        let ctx = Context::root()
            .with_router(RouterFrame {
                matched_uri: "users/bjensen".into(),
                remaining_uri: "devices/d1".into(),
                uri_template_variables: outer,
            })
            .with_router(RouterFrame {
                matched_uri: "devices/d1".into(),
                remaining_uri: "".into(),
                uri_template_variables: inner,
            });

        assert_eq!(ctx.template_variable("deviceId"), Some("d1"));
        assert_eq!(ctx.template_variable("userId"), Some("bjensen"));
        assert_eq!(ctx.template_variable("other"), None);
    }

    #[test]
    fn test_is_external() {
        let root = Context::root();
        assert!(!root.is_external());
        let http = root.with_http(HttpFrame::default());
        assert!(http.is_external());
        assert!(!http.internal().is_external());
    }

    #[test]
    fn test_long_chain_drops() {
        let mut ctx = Context::root();
        for _ in 0..100_000 {
            ctx = ctx.internal();
        }
        assert_eq!(ctx.ancestors().count(), 100_001);
        drop(ctx);
    }
}
