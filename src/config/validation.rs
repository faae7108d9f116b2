//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0)
//! - Check the transport base URL and metrics address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PipelineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::PipelineConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("transport.base_url '{0}' is not a valid URL")]
    InvalidBaseUrl(String),

    #[error("transport.base_url scheme '{0}' is not supported (expected http)")]
    UnsupportedScheme(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &PipelineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.transport.base_url) {
        Ok(url) if url.scheme() != "http" => {
            errors.push(ValidationError::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::InvalidBaseUrl(config.transport.base_url.clone())),
    }

    if config.transport.connect_timeout_ms == 0 {
        errors.push(ValidationError::Zero("transport.connect_timeout_ms"));
    }
    if config.transport.request_timeout_ms == 0 {
        errors.push(ValidationError::Zero("transport.request_timeout_ms"));
    }
    if config.transport.max_response_bytes == 0 {
        errors.push(ValidationError::Zero("transport.max_response_bytes"));
    }
    if config.traffic_log.body_limit_chars == 0 {
        errors.push(ValidationError::Zero("traffic_log.body_limit_chars"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&PipelineConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = PipelineConfig::default();
        config.transport.base_url = "::nope::".into();
        config.transport.request_timeout_ms = 0;
        config.traffic_log.body_limit_chars = 0;
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "localhost".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero("transport.request_timeout_ms")));
        assert!(errors.contains(&ValidationError::InvalidMetricsAddress("localhost".into())));
    }

    #[test]
    fn test_rejects_https() {
        let mut config = PipelineConfig::default();
        config.transport.base_url = "https://api.example.com".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::UnsupportedScheme("https".into())]);
    }
}
