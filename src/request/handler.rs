//! The handler seam every router, collection and terminal resource plugs into.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};

use crate::context::Context;
use crate::error::ResourceResult;
use crate::request::model::Request;
use crate::request::response::Response;

/// Pending outcome of a dispatched request.
pub type ResponseFuture = BoxFuture<'static, ResourceResult<Response>>;

/// Anything that can answer a request.
///
/// `handle` returns as soon as the work is dispatched. Whoever invoked the
/// handler owns the returned future and decides when, and whether, to await it.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, context: Context, request: Request) -> ResponseFuture;
}

impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    fn handle(&self, context: Context, request: Request) -> ResponseFuture {
        (**self).handle(context, request)
    }
}

impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    fn handle(&self, context: Context, request: Request) -> ResponseFuture {
        (**self).handle(context, request)
    }
}

/// Adapter returned by [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Turn an async closure into a [`RequestHandler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync,
    Fut: Future<Output = ResourceResult<Response>> + Send + 'static,
{
    HandlerFn { f }
}

impl<F, Fut> RequestHandler for HandlerFn<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync,
    Fut: Future<Output = ResourceResult<Response>> + Send + 'static,
{
    fn handle(&self, context: Context, request: Request) -> ResponseFuture {
        (self.f)(context, request).boxed()
    }
}

/// An already-settled outcome.
pub fn ready(result: ResourceResult<Response>) -> ResponseFuture {
    future::ready(result).boxed()
}
