//! Configuration validation.
//!
//! Checks that configured values are within ranges the service can run with.
//! Startup refuses to continue when validation fails.

use thiserror::Error;

use crate::config::{
    AnalysisConfig, ComprehendConfig, Config, ObservabilityConfig, ServerConfig, ALL_FEATURES,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port} for {field}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.server.validate() {
            errors.push(e);
        }
        if let Err(e) = self.analysis.validate() {
            errors.push(e);
        }
        if let Err(e) = self.comprehend.validate() {
            errors.push(e);
        }
        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Load (with environment overrides) and validate configuration.
    pub fn load_and_validate() -> anyhow::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "server.port".into(),
            });
        }
        if self.host.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "server.host".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

impl Validate for AnalysisConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.char_limit == 0 {
            return Err(ValidationError::InvalidValue {
                field: "analysis.char_limit".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.language_code.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "analysis.language_code".into(),
                reason: "must not be empty".into(),
            });
        }
        if let Some(unknown) = self
            .features
            .iter()
            .find(|f| !ALL_FEATURES.contains(&f.as_str()))
        {
            return Err(ValidationError::InvalidValue {
                field: "analysis.features".into(),
                reason: format!(
                    "unknown feature '{}', expected one of: {}",
                    unknown,
                    ALL_FEATURES.join(", ")
                ),
            });
        }
        Ok(())
    }
}

impl Validate for ComprehendConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "comprehend.timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if matches!(self.region.as_deref(), Some(r) if r.trim().is_empty()) {
            return Err(ValidationError::InvalidValue {
                field: "comprehend.region".into(),
                reason: "must not be empty when set".into(),
            });
        }
        if let Some(ref endpoint) = self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ValidationError::InvalidValue {
                    field: "comprehend.endpoint".into(),
                    reason: format!("'{}' is not an http(s) URL", endpoint),
                });
            }
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of: {}", LEVELS.join(", ")),
            });
        }
        if self.log_format != "json" && self.log_format != "pretty" {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: "must be 'json' or 'pretty'".into(),
            });
        }
        Ok(())
    }
}
