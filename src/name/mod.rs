//! Resource addressing.
//!
//! # Data Flow
//! ```text
//! raw path text ("/users/hello%20world/")
//!     → resource_name.rs (trim, split on '/', reject empty elements)
//!     → encoding.rs (decode %XX per element)
//!     → ResourceName (immutable, case-insensitive comparable)
//!     → Display re-encodes with the pchar set; canonical form also folds case
//! ```
//!
//! # Design Decisions
//! - Elements are stored decoded; `/` inside an element is content
//! - Equality, ordering and hashing agree and ignore ASCII case
//! - The empty name is a single shared allocation

pub mod encoding;
pub mod resource_name;

pub use encoding::{url_decode, url_encode};
pub use resource_name::ResourceName;
