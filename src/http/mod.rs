//! HTTP adapter subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → request.rs (context chain, method + parameters → Request)
//!     → routing::Router::handle
//!     → response.rs (status, ETag, Location, advice headers, error body)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - One handler serves every path; resource routing is the router's job
//! - Bodies are buffered with a hard cap since every payload is JSON
//! - Errors carry a stable `{code, reason, message}` shape

pub mod request;
pub mod response;
pub mod server;

pub use request::{build_context, parse_request, AdaptedRequest, ApiSettings};
pub use response::{error_response, render, RenderOptions};
pub use server::{AppState, HttpServer, MAX_BODY_BYTES};
