//! Hierarchical resource routing with request-scoped context chains.

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod name;
pub mod observability;
pub mod request;
pub mod resources;
pub mod routing;

pub use config::schema::ServerConfig;
pub use context::Context;
pub use error::{ResourceError, ResourceResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use name::ResourceName;
pub use request::{Request, RequestHandler, Response};
pub use routing::{RouteMode, Router};
