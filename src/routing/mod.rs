//! Mock routing subsystem.
//!
//! # Data Flow
//! ```text
//! ApiRequest (method, path, body)
//!     → router.rs (mock mode active for this call?)
//!         no  → forward to transport
//!         yes → matcher.rs (first rule whose substring + method match)
//!               → payloads.rs (canned JSON, identifiers echoed)
//!               → ApiResponse (200/201, or structured 404)
//! ```
//!
//! # Design Decisions
//! - Rule table compiled at startup, immutable at runtime
//! - No regex in hot path (substring matching only)
//! - Deterministic: same input always matches same rule
//! - First match wins (ordered by pattern specificity)

pub mod matcher;
pub mod payloads;
pub mod router;

pub use router::{MockRouter, MockRouterLayer, MockRouterService, MockRule, X_MOCK_RESPONSE};
