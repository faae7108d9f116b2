//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pipeline.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Deployment environment. Selects the retry budget and backoff limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mock,
    Development,
    /// Reserved; uses the production retry parameters.
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Mock => "mock",
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(Environment::Mock),
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Settings that stay fixed for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallProfile {
    pub environment: Environment,
    pub mock_enabled: bool,
}

/// Root configuration for the request pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Environment in force for every call.
    pub environment: Environment,

    /// Persisted mock switch. Overrides the environment-derived default when set.
    pub mock_override: Option<bool>,

    /// Network transport settings.
    pub transport: TransportConfig,

    /// Request/response traffic logging.
    pub traffic_log: TrafficLogConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl PipelineConfig {
    /// Whether requests are answered by the mock router.
    pub fn mock_enabled(&self) -> bool {
        self.mock_override
            .unwrap_or(self.environment == Environment::Mock)
    }

    /// Snapshot of the per-call settings.
    pub fn call_profile(&self) -> CallProfile {
        CallProfile {
            environment: self.environment,
            mock_enabled: self.mock_enabled(),
        }
    }
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL relative request paths are resolved against.
    pub base_url: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Per-attempt timeout (send + full body read) in milliseconds.
    pub request_timeout_ms: u64,

    /// Maximum buffered response body size.
    pub max_response_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api/v1".to_string(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            max_response_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Traffic logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrafficLogConfig {
    /// Enable request/response logging.
    pub enabled: bool,

    /// Bodies longer than this many characters are truncated.
    pub body_limit_chars: usize,

    /// Include headers in log records.
    pub log_headers: bool,

    /// Headers whose values are replaced by a placeholder.
    pub redact_headers: Vec<String>,
}

impl Default for TrafficLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            body_limit_chars: 4000,
            log_headers: true,
            redact_headers: vec!["authorization".to_string(), "cookie".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
