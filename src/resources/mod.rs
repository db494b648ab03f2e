//! Terminal resource handlers.
//!
//! # Data Flow
//! ```text
//! Router forwards suffix
//!     → Collection:  ""    → create / query / collection action
//!                    "id"  → read / update / delete / patch / instance action
//!                    deeper → NotFound
//!     → Singleton:   ""    → read / update / patch / action
//!     → provider returns Response
//!     → filter.rs projects content onto requested fields (adapter side)
//! ```
//!
//! # Design Decisions
//! - Providers implement only what they support; the rest is `NotSupported`
//! - Instance ids arrive decoded, straight from the resource name element
//! - `MemoryCollection` is the store behind configured mounts

pub mod collection;
pub mod filter;
pub mod memory;
pub mod singleton;

pub use collection::{Collection, CollectionProvider};
pub use filter::filter_resource;
pub use memory::MemoryCollection;
pub use singleton::{Singleton, SingletonProvider};
