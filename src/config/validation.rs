//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect conflicting mounts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServerConfig;
use crate::context::Version;
use crate::routing::RouteTemplate;

/// One semantic problem, tagged with the offending key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn is_printable(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new(
            "listener.max_connections",
            "must be greater than zero",
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    if config.api.protocol_name.is_empty() {
        errors.push(ValidationError::new("api.protocol_name", "must not be empty"));
    }
    if config.api.protocol_version.parse::<Version>().is_err() {
        errors.push(ValidationError::new(
            "api.protocol_version",
            format!("'{}' is not a major.minor version", config.api.protocol_version),
        ));
    }
    for name in &config.api.restricted_advice_names {
        if !is_printable(name) {
            errors.push(ValidationError::new(
                "api.restricted_advice_names",
                format!("'{}' is not printable ASCII", name.escape_debug()),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    let mut seen = HashSet::new();
    for (i, mount) in config.mounts.iter().enumerate() {
        let field = format!("mounts[{}]", i);
        match RouteTemplate::parse(&mount.pattern) {
            Ok(template) => {
                if !seen.insert((mount.mode, template.as_name().clone())) {
                    errors.push(ValidationError::new(
                        field.clone(),
                        format!("duplicate {} mount for '{}'", mount.mode, mount.pattern),
                    ));
                }
            }
            Err(e) => errors.push(ValidationError::new(field.clone(), e.to_string())),
        }
        if mount.collection.is_empty() {
            errors.push(ValidationError::new(field, "collection name must not be empty"));
        }
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
    use crate::config::schema::MountConfig;
    use crate::routing::RouteMode;

    fn mount(pattern: &str, mode: RouteMode) -> MountConfig {
        MountConfig {
            pattern: pattern.to_string(),
            mode,
            collection: "c".to_string(),
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_secs = 0;
        config.api.protocol_version = "two".into();
        config.api.restricted_advice_names.push("Bad\nName".into());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "timeouts.request_secs",
                "api.protocol_version",
                "api.restricted_advice_names",
            ]
        );
    }

    #[test]
    fn test_mounts() {
        let mut config = ServerConfig::default();
        config.mounts = vec![
            mount("users", RouteMode::StartsWith),
            mount("Users/", RouteMode::StartsWith),
            mount("users", RouteMode::Equals),
            mount("a//b", RouteMode::StartsWith),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "mounts[1]");
        assert_eq!(errors[1].field, "mounts[3]");
    }
}
