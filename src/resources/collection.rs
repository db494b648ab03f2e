//! Collections: a set of instances addressed by id.

use std::sync::Arc;

use crate::context::Context;
use crate::error::ResourceError;
use crate::request::handler::ready;
use crate::request::{Request, RequestHandler, RequestKind, ResponseFuture};

pub(crate) fn not_supported(request: &Request) -> ResponseFuture {
    ready(Err(ResourceError::NotSupported(format!(
        "{} is not supported by this resource",
        request.request_type()
    ))))
}

/// Operations a collection implementation may support.
///
/// Every method defaults to `NotSupported`. `id` is the decoded instance id,
/// so `users/test%2fuser` arrives as `test/user`.
pub trait CollectionProvider: Send + Sync + 'static {
    fn create_instance(&self, _context: Context, request: Request) -> ResponseFuture {
        not_supported(&request)
    }

    fn read_instance(&self, _context: Context, _id: String, request: Request) -> ResponseFuture {
        not_supported(&request)
    }

    fn update_instance(&self, _context: Context, _id: String, request: Request) -> ResponseFuture {
        not_supported(&request)
    }

    fn delete_instance(&self, _context: Context, _id: String, request: Request) -> ResponseFuture {
        not_supported(&request)
    }

    fn patch_instance(&self, _context: Context, _id: String, request: Request) -> ResponseFuture {
        not_supported(&request)
    }

    fn action_instance(&self, _context: Context, _id: String, request: Request) -> ResponseFuture {
        not_supported(&request)
    }

    fn action_collection(&self, _context: Context, request: Request) -> ResponseFuture {
        not_supported(&request)
    }

    fn query_collection(&self, _context: Context, request: Request) -> ResponseFuture {
        not_supported(&request)
    }
}

/// Dispatches requests to a [`CollectionProvider`] by the shape of the
/// remaining resource name.
pub struct Collection<P> {
    provider: Arc<P>,
}

impl<P: CollectionProvider> Collection<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    pub fn from_shared(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }
}

impl<P> Clone for Collection<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
        }
    }
}

impl<P: CollectionProvider> RequestHandler for Collection<P> {
    fn handle(&self, context: Context, request: Request) -> ResponseFuture {
        let name = request.resource_name();
        match name.size() {
            0 => match request.kind() {
                RequestKind::Create { .. } => self.provider.create_instance(context, request),
                RequestKind::Query(_) => self.provider.query_collection(context, request),
                RequestKind::Action { .. } => self.provider.action_collection(context, request),
                _ => ready(Err(ResourceError::BadRequest(format!(
                    "the resource collection cannot be the target of a {} request",
                    request.request_type()
                )))),
            },
            1 => {
                let id = name.leaf().unwrap_or_default().to_string();
                match request.kind() {
                    RequestKind::Read => self.provider.read_instance(context, id, request),
                    RequestKind::Update { .. } => {
                        self.provider.update_instance(context, id, request)
                    }
                    RequestKind::Delete { .. } => {
                        self.provider.delete_instance(context, id, request)
                    }
                    RequestKind::Patch { .. } => self.provider.patch_instance(context, id, request),
                    RequestKind::Action { .. } => {
                        self.provider.action_instance(context, id, request)
                    }
                    RequestKind::Create { .. } | RequestKind::Query(_) => {
                        ready(Err(ResourceError::BadRequest(format!(
                            "the resource instance '{}' cannot be the target of a {} request",
                            id,
                            request.request_type()
                        ))))
                    }
                }
            }
            _ => ready(Err(ResourceError::NotFound(format!(
                "resource '{}' not found",
                name
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::ResourceName;
    use crate::request::{ActionResponse, Response};
    use serde_json::{json, Value};

    /// Reports which operation was invoked and with which id.
    struct Recorder;

    fn record(op: &str, id: Option<String>) -> ResponseFuture {
        ready(Ok(Response::Action(ActionResponse::new(json!({ "op": op, "id": id })))))
    }

    impl CollectionProvider for Recorder {
        fn create_instance(&self, _: Context, _: Request) -> ResponseFuture {
            record("create", None)
        }
        fn read_instance(&self, _: Context, id: String, _: Request) -> ResponseFuture {
            record("read", Some(id))
        }
        fn query_collection(&self, _: Context, _: Request) -> ResponseFuture {
            record("query", None)
        }
    }

    async fn call(request: Request) -> Result<Value, ResourceError> {
        Collection::new(Recorder)
            .handle(Context::root(), request)
            .await
            .map(|r| r.to_json())
    }

    fn name(path: &str) -> ResourceName {
        ResourceName::parse(path).unwrap()
    }

    #[tokio::test]
    async fn test_instance_id_is_decoded() {
        for (path, id) in [
            ("test", "test"),
            ("test%2fuser", "test/user"),
            ("test user", "test user"),
            ("test%20user", "test user"),
            ("test+%2buser", "test++user"),
        ] {
            let out = call(Request::read(name(path)).build().unwrap()).await.unwrap();
            assert_eq!(out, json!({ "op": "read", "id": id }));
        }
    }

    #[tokio::test]
    async fn test_collection_operations() {
        let out = call(Request::create(name(""), json!({})).build().unwrap())
            .await
            .unwrap();
        assert_eq!(out["op"], "create");

        let out = call(Request::query(name("")).query_filter("true").build().unwrap())
            .await
            .unwrap();
        assert_eq!(out["op"], "query");
    }

    #[tokio::test]
    async fn test_misdirected_requests() {
        assert!(matches!(
            call(Request::read(name("")).build().unwrap()).await,
            Err(ResourceError::BadRequest(_))
        ));
        assert!(matches!(
            call(Request::create(name("x"), json!({})).build().unwrap()).await,
            Err(ResourceError::BadRequest(_))
        ));
        assert!(matches!(
            call(Request::read(name("x/y")).build().unwrap()).await,
            Err(ResourceError::NotFound(_))
        ));
        assert!(matches!(
            call(Request::delete(name("x")).build().unwrap()).await,
            Err(ResourceError::NotSupported(_))
        ));
    }
}
