//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Logical call:
//!     → retries.rs (RetryService: attempt loop, backoff waits)
//!         → inner chain (traffic logger → mock router → transport)
//!         ← response | transport error
//!     → policy.rs (classify outcome → RetryDecision)
//!     → backoff.rs (delay = min(initial * 2^attempt, max))
//! ```
//!
//! # Design Decisions
//! - Policy is pure and environment-keyed; orchestration owns all effects
//! - Server errors (5xx subset) and 429 are transient; other 4xx are not
//! - No jitter: delays are deterministic per environment

pub mod backoff;
pub mod policy;
pub mod retries;

pub use policy::{RetryDecision, RetryPolicy, StopReason};
pub use retries::{AttemptOutcome, RequestAttempt, RetryLayer, RetryService};
