//! Mock rule matching logic.
//!
//! # Responsibilities
//! - Match a substring of the request path (case-sensitive)
//! - Match the HTTP method
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Path matching is a substring test, so rule order decides overlaps
//! - No regex to guarantee O(n) matching

use axum::http::Method;

use crate::http::ApiRequest;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &ApiRequest) -> bool;
}

/// Matches when the path contains a fixed substring.
#[derive(Debug, Clone)]
pub struct PathContainsMatcher {
    pattern: String,
}

impl PathContainsMatcher {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl Matcher for PathContainsMatcher {
    fn matches(&self, req: &ApiRequest) -> bool {
        req.path().contains(&self.pattern)
    }
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: Method,
}

impl MethodMatcher {
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &ApiRequest) -> bool {
        *req.method() == self.method
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &ApiRequest) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }
}
