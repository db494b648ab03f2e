//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router, resources, HTTP adapter produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields, not formatted strings, carry the data
//! - Request ID flows from the HTTP layer into every span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
