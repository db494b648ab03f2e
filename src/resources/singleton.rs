//! Singletons: a resource with exactly one instance and no children.

use std::sync::Arc;

use crate::context::Context;
use crate::error::ResourceError;
use crate::request::handler::ready;
use crate::request::{Request, RequestHandler, RequestKind, ResponseFuture};
use crate::resources::collection::not_supported;

pub trait SingletonProvider: Send + Sync + 'static {
    fn read_instance(&self, _context: Context, request: Request) -> ResponseFuture {
        not_supported(&request)
    }

    fn update_instance(&self, _context: Context, request: Request) -> ResponseFuture {
        not_supported(&request)
    }

    fn patch_instance(&self, _context: Context, request: Request) -> ResponseFuture {
        not_supported(&request)
    }

    fn action_instance(&self, _context: Context, request: Request) -> ResponseFuture {
        not_supported(&request)
    }
}

pub struct Singleton<P> {
    provider: Arc<P>,
}

impl<P: SingletonProvider> Singleton<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

impl<P: SingletonProvider> RequestHandler for Singleton<P> {
    fn handle(&self, context: Context, request: Request) -> ResponseFuture {
        if !request.resource_name().is_empty() {
            return ready(Err(ResourceError::NotFound(format!(
                "resource '{}' not found",
                request.resource_name()
            ))));
        }
        match request.kind() {
            RequestKind::Read => self.provider.read_instance(context, request),
            RequestKind::Update { .. } => self.provider.update_instance(context, request),
            RequestKind::Patch { .. } => self.provider.patch_instance(context, request),
            RequestKind::Action { .. } => self.provider.action_instance(context, request),
            RequestKind::Create { .. } | RequestKind::Delete { .. } | RequestKind::Query(_) => {
                ready(Err(ResourceError::BadRequest(format!(
                    "a singleton resource cannot be the target of a {} request",
                    request.request_type()
                ))))
            }
        }
    }
}
