//! Request and response values exchanged between routers and resources.
//!
//! # Data Flow
//! ```text
//! transport adapter
//!     → Request::read(name).field(..).build()   (builder.rs)
//!     → RequestHandler::handle(context, request) (handler.rs)
//!     → Router rewrites the resource name to the unmatched suffix
//!     → resource provider matches on RequestKind (model.rs)
//!     → Response::{Resource, Action, Query}      (response.rs)
//! ```
//!
//! # Design Decisions
//! - Request kinds are one closed enum; dispatchers match exhaustively
//! - Requests are immutable once built; forwarding produces a new value
//! - Handlers return boxed futures so routing never awaits the work it
//!   dispatches

pub mod builder;
pub mod handler;
pub mod model;
pub mod patch;
pub mod response;

pub use builder::RequestBuilder;
pub use handler::{handler_fn, ready, HandlerFn, RequestHandler, ResponseFuture};
pub use model::{CountPolicy, QueryParams, Request, RequestKind, RequestType, SortKey};
pub use patch::{PatchOp, PatchOperation};
pub use response::{ActionResponse, QueryResponse, ResourceResponse, Response};
