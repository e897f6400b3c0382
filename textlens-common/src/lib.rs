//! textlens common - shared configuration, errors, and logging.
//!
//! This crate provides:
//! - Configuration types and loading (file, `.env`, environment overrides)
//! - Configuration validation
//! - The unified error type
//! - Logging setup and tracing helpers
//! - Small text and number utilities

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    AnalysisConfig, ComprehendConfig, Config, DisplayConfig, ObservabilityConfig, ServerConfig,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};

