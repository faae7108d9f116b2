//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl-C / application shutdown
//!     → shutdown.rs (Shutdown::trigger)
//!     → every ShutdownListener wakes
//!     → retry loops abort their backoff wait with TransportError::Cancelled
//! ```
//!
//! # Design Decisions
//! - Cancellation is terminal, never classified as retryable
//! - Only the backoff wait observes the signal; an attempt in progress finishes
//! - Dropping a call future cancels it as well

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownListener};
