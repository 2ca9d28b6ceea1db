//! Typed configuration, assembled by the CLI in `main.rs` and validated once
//! at startup.
//!
//! Grounded in the original source's flag set and the teacher's `bin/` crate
//! CLI layout; field names follow SPEC_FULL.md §6 exactly.

use crate::error::RegistryError;
use std::time::Duration;

/// Fully resolved configuration for one run of the daemon.
#[derive(Debug, Clone)]
pub struct Config {
    pub to_aws: bool,
    pub to_eureka: bool,
    pub aws_namespace_id: String,
    pub aws_service_prefix: String,
    pub eureka_service_prefix: String,
    pub aws_poll_interval: Duration,
    pub eureka_poll_interval: Duration,
    pub aws_dns_ttl: i64,
    pub stale: bool,
    pub eureka_domain: String,
    pub eureka_allow_list: Vec<String>,
    pub environment: String,
}

impl Config {
    /// Startup validation. Rejects configurations that would otherwise fail
    /// silently or destructively once workers are running.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.eureka_allow_list.is_empty() {
            return Err(RegistryError::ConfigError {
                message: "eureka_allow_list must not be empty".to_string(),
            });
        }
        if self.aws_namespace_id.is_empty() {
            return Err(RegistryError::ConfigError {
                message: "aws_namespace_id is required".to_string(),
            });
        }
        if self.eureka_domain.is_empty() {
            return Err(RegistryError::ConfigError {
                message: "eureka_domain is required".to_string(),
            });
        }
        if !self.to_aws && !self.to_eureka {
            return Err(RegistryError::ConfigError {
                message: "at least one of to_aws / to_eureka must be enabled".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            to_aws: false,
            to_eureka: false,
            aws_namespace_id: String::new(),
            aws_service_prefix: String::new(),
            eureka_service_prefix: String::new(),
            aws_poll_interval: Duration::from_secs(30),
            eureka_poll_interval: Duration::from_secs(30),
            aws_dns_ttl: 60,
            stale: false,
            eureka_domain: String::new(),
            eureka_allow_list: Vec::new(),
            environment: "stage-v2".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            to_aws: true,
            aws_namespace_id: "ns-123".to_string(),
            eureka_domain: "http://eureka.internal:8761/eureka".to_string(),
            eureka_allow_list: vec!["checkout".to_string()],
            ..Config::default()
        }
    }

    #[test]
    fn rejects_empty_allow_list() {
        let config = Config { eureka_allow_list: Vec::new(), ..valid_config() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_namespace() {
        let config = Config { aws_namespace_id: String::new(), ..valid_config() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_no_direction_enabled() {
        let config = Config { to_aws: false, to_eureka: false, ..valid_config() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_a_well_formed_config() {
        assert!(valid_config().validate().is_ok());
    }
}
