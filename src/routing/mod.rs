//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request (context, resource name)
//!     → router.rs (snapshot of bindings)
//!     → matcher.rs (each binding: match? consumed, variables)
//!     → rank survivors: longest consumption → EQUALS → literal segments
//!     → tie left over: RouteAmbiguous; nothing left: default route or RouteNotFound
//!     → push RouterFrame, strip consumed prefix, hand off to the handler
//!
//! Route patterns (template.rs):
//!     "users/{userId}" → [Literal("users"), Variable("userId")]
//! ```
//!
//! # Design Decisions
//! - Bindings can change at runtime; the table is swapped atomically
//! - Deterministic: same table and name always select the same route
//! - A true tie is a configuration error and is reported, never guessed
//! - A router is itself a handler, so trees of routers compose

pub mod matcher;
pub mod router;
pub mod template;

pub use matcher::{RouteMatch, RouteMatcher, RouteMode};
pub use router::{RouteBinding, RouteId, Router, Selected};
pub use template::{RouteTemplate, Segment};
