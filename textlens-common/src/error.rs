//! Error types for the textlens service.

use thiserror::Error;

/// Result type alias using the textlens error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for startup, configuration and serving failures.
///
/// Per-feature provider failures are not represented here; they are
/// recorded inside the analysis result instead of being propagated.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider credentials could not be resolved
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Template or page rendering error
    #[error("Render error: {0}")]
    Render(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is a configuration error (including credentials).
    pub fn is_config(&self) -> bool {
        match self {
            Self::Config(_) | Self::Credentials(_) => true,
            Self::WithContext { source, .. } => source.is_config(),
            _ => false,
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::WithContext { source, .. } => source.status_code(),
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::InvalidInput("test".into()).status_code(), 400);
        assert_eq!(Error::Config("test".into()).status_code(), 500);
        assert_eq!(Error::Render("test".into()).status_code(), 500);
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::InvalidInput("text too long".into());
        let with_ctx = err.with_context("building request");
        assert!(matches!(with_ctx, Error::WithContext { .. }));
        assert_eq!(with_ctx.status_code(), 400);
        assert_eq!(
            with_ctx.to_string(),
            "building request: Invalid input: text too long"
        );
    }

    #[test]
    fn test_is_config_through_context() {
        let err = Error::Credentials("no profile".into()).with_context("startup");
        assert!(err.is_config());
        assert!(!Error::Internal("x".into()).is_config());
    }
}
