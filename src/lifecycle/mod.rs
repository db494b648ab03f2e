//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown_signal() resolves
//!
//! Shutdown (shutdown.rs):
//!     Shutdown::trigger() → every subscriber wakes
//!     → HTTP server stops accepting, drains in-flight requests → exit
//! ```
//!
//! # Design Decisions
//! - Signals and shutdown are decoupled: tests trigger shutdown directly
//! - One broadcast channel fans the event out to any number of tasks

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
