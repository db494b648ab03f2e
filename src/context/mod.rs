//! Request-scoped context chains.
//!
//! # Data Flow
//! ```text
//! transport adapter
//!     → Context::root()
//!     → .with_http(..) → .with_api_version(..) → .with_advice(..)
//!     → Router adds a router frame per level (matched prefix, template vars)
//!     → handler: ctx.get::<SecurityFrame>(), ctx.get::<AdviceFrame>()
//!
//! Crossing a persistence boundary:
//!     ctx.to_json() → stored JSON → Context::from_json(json, &KindRegistry)
//! ```
//!
//! # Design Decisions
//! - Frames are a closed enum with a string discriminator plus `Custom`
//!   for application kinds; lookup walks toward the root, nearest wins
//! - Parents are shared `Arc`s fixed at creation: acyclic, cheap to fork
//! - The advice frame is the one append-only accumulator, and only the
//!   context whose own frame it is may append; everything else is read-only
//!   after creation
//! - Persistence keys decoders by discriminator, never by type name

pub mod advice;
pub mod api_version;
pub mod chain;
pub mod frames;
pub mod locale;
pub mod registry;

pub use advice::AdviceFrame;
pub use api_version::{AcceptApiVersion, ApiVersionFrame, Version};
pub use chain::Context;
pub use frames::{CustomFrame, Frame, FrameKind, HttpFrame, RouterFrame, SecurityFrame};
pub use locale::LocaleFrame;
pub use registry::KindRegistry;
