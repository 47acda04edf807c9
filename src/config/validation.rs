//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Check the feed base URL is absolute
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HubConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::HubConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. "listener.bind_address".
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &HubConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".into(),
            message: format!("not a socket address: {}", config.listener.bind_address),
        });
    }

    if config.storage.repo_root.trim().is_empty() {
        errors.push(ValidationError {
            field: "storage.repo_root".into(),
            message: "must not be empty".into(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ValidationError {
            field: "storage.database_path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.uploads.max_bytes == 0 {
        errors.push(ValidationError {
            field: "uploads.max_bytes".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_secs".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.auth.admin_username.trim().is_empty() {
        errors.push(ValidationError {
            field: "auth.admin_username".into(),
            message: "must not be empty".into(),
        });
    }

    if config.auth.admin_password.is_empty() {
        errors.push(ValidationError {
            field: "auth.admin_password".into(),
            message: "must not be empty".into(),
        });
    }

    match url::Url::parse(&config.feeds.base_url) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
        _ => errors.push(ValidationError {
            field: "feeds.base_url".into(),
            message: format!("not an absolute http(s) URL: {}", config.feeds.base_url),
        }),
    }

    if config.feeds.item_limit == 0 {
        errors.push(ValidationError {
            field: "feeds.item_limit".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address".into(),
            message: format!(
                "not a socket address: {}",
                config.observability.metrics_address
            ),
        });
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
        let config = HubConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = HubConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.uploads.max_bytes = 0;
        config.feeds.base_url = "ftp://example.com".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "listener.bind_address"));
        assert!(errors.iter().any(|e| e.field == "uploads.max_bytes"));
        assert!(errors.iter().any(|e| e.field == "feeds.base_url"));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = HubConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
