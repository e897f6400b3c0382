//! Configuration management for the textlens service.
//!
//! Configuration lives in `~/.textlens/config.json` (or the path named by
//! `TEXTLENS_CONFIG`). Every field has a default, so a missing file is not
//! an error.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (a `.env` file is loaded first if present)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `APP_HOST` → server.host
//! - `APP_PORT` → server.port
//! - `CHAR_LIMIT` → analysis.char_limit
//! - `AWS_REGION` / `AWS_DEFAULT_REGION` → comprehend.region
//! - `AWS_PROFILE` → comprehend.profile
//! - `COMPREHEND_ENDPOINT` → comprehend.endpoint
//! - `LOG_LEVEL` → observability.log_level
//! - `LOG_FORMAT` → observability.log_format
//!
//! Numeric values that fail to parse are ignored and the previous value is kept.
//! Log levels are case-insensitive from either source, and the Python-style
//! names `WARNING` and `CRITICAL` are accepted.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternate config file.
pub const CONFIG_PATH_ENV: &str = "TEXTLENS_CONFIG";

/// Names of every analysis feature, in display order.
pub const ALL_FEATURES: &[&str] = &[
    "sentiment",
    "entities",
    "key_phrases",
    "syntax",
    "language",
    "pii",
    "targeted_sentiment",
];

/// Largest encoded size of one character in a request body.
///
/// A 4-byte UTF-8 scalar takes 12 bytes form-encoded (`%F0%9F%98%80`) and
/// 12 bytes as a JSON surrogate pair (`\ud83d\ude00`).
pub const MAX_ENCODED_BYTES_PER_CHAR: usize = 12;

/// Body allowance for everything besides the text itself.
pub const REQUEST_OVERHEAD_BYTES: usize = 4 * 1024;

/// Map a log level name onto the tracing level names.
///
/// Case is ignored; `warning` becomes `warn`, `critical` and `fatal` become
/// `error`. Anything else is returned lowercased for validation to reject.
pub fn normalize_log_level(raw: &str) -> String {
    let level = raw.trim().to_lowercase();
    match level.as_str() {
        "warning" => "warn".into(),
        "critical" | "fatal" => "error".into(),
        _ => level,
    }
}

fn deserialize_log_level<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|raw| normalize_log_level(&raw))
}

fn deserialize_lowercase<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|raw| raw.trim().to_lowercase())
}

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".textlens"),
        |dirs| dirs.home_dir().join(".textlens"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| config_dir().join("config.json"))
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP serving layer
    #[serde(default)]
    pub server: ServerConfig,

    /// Analysis request limits and enabled features
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Amazon Comprehend client settings
    #[serde(default)]
    pub comprehend: ComprehendConfig,

    /// Result page presentation caps
    #[serde(default)]
    pub display: DisplayConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host. Default: "127.0.0.1" (local only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Minimum request body limit in bytes. Raised at runtime to fit
    /// `analysis.char_limit`, see [`Config::effective_body_limit`].
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum number of characters accepted in one submission
    #[serde(default = "default_char_limit")]
    pub char_limit: usize,

    /// Language code passed to every language-dependent feature
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// Features run for each submission (see [`ALL_FEATURES`])
    #[serde(default = "default_features")]
    pub features: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            char_limit: default_char_limit(),
            language_code: default_language_code(),
            features: default_features(),
        }
    }
}

/// Amazon Comprehend client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehendConfig {
    /// AWS region (e.g. "us-east-1"). Falls back to [`DEFAULT_REGION`] when unset.
    #[serde(default)]
    pub region: Option<String>,

    /// Named profile in the shared credentials file.
    /// When unset, environment credentials are tried before the `default` profile.
    #[serde(default)]
    pub profile: Option<String>,

    /// Endpoint override (VPC endpoints, local stubs)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-call HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Region used when neither config nor environment provides one.
pub const DEFAULT_REGION: &str = "us-east-1";

impl ComprehendConfig {
    /// Region to sign and route requests for.
    pub fn region_or_default(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }
}

impl Default for ComprehendConfig {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            endpoint: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Presentation caps for the curated result page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_max_entities")]
    pub max_entities: usize,

    #[serde(default = "default_max_key_phrases")]
    pub max_key_phrases: usize,

    #[serde(default = "default_max_entities")]
    pub max_pii: usize,

    #[serde(default = "default_max_entities")]
    pub max_targeted: usize,

    /// Number of part-of-speech tags shown, most frequent first
    #[serde(default = "default_top_pos")]
    pub top_pos: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_entities: default_max_entities(),
            max_key_phrases: default_max_key_phrases(),
            max_pii: default_max_entities(),
            max_targeted: default_max_entities(),
            top_pos: default_top_pos(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(
        default = "default_log_level",
        alias = "level",
        deserialize_with = "deserialize_log_level"
    )]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(
        default = "default_log_format",
        alias = "format",
        deserialize_with = "deserialize_lowercase"
    )]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load `.env`, the config file, then environment overrides.
    pub fn load_with_env() -> Result<Self> {
        // A missing .env file is the normal case.
        dotenv::dotenv().ok();

        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply process environment overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides read through `lookup` (an environment accessor).
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("APP_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("APP_PORT") {
            if let Ok(p) = port.trim().parse() {
                self.server.port = p;
            }
        }
        if let Some(limit) = lookup("CHAR_LIMIT") {
            if let Ok(l) = limit.trim().parse() {
                self.analysis.char_limit = l;
            }
        }

        if let Some(region) = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")) {
            self.comprehend.region = Some(region);
        }
        if let Some(profile) = lookup("AWS_PROFILE") {
            self.comprehend.profile = Some(profile);
        }
        if let Some(endpoint) = lookup("COMPREHEND_ENDPOINT") {
            self.comprehend.endpoint = Some(endpoint);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.observability.log_level = normalize_log_level(&level);
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.observability.log_format = format.trim().to_lowercase();
        }
    }

    /// Body size needed for a request carrying `char_limit` characters.
    pub fn required_body_limit(&self) -> usize {
        self.analysis
            .char_limit
            .saturating_mul(MAX_ENCODED_BYTES_PER_CHAR)
            .saturating_add(REQUEST_OVERHEAD_BYTES)
    }

    /// Request body limit the server enforces.
    ///
    /// Never below [`Config::required_body_limit`], so text within the
    /// character limit always reaches the handlers.
    pub fn effective_body_limit(&self) -> usize {
        self.server.body_limit_bytes.max(self.required_body_limit())
    }

    /// Address the HTTP server binds to, as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_body_limit() -> usize {
    64 * 1024
}
fn default_char_limit() -> usize {
    2000
}
fn default_language_code() -> String {
    "en".into()
}
fn default_features() -> Vec<String> {
    ALL_FEATURES.iter().map(|f| f.to_string()).collect()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_entities() -> usize {
    50
}
fn default_max_key_phrases() -> usize {
    30
}
fn default_top_pos() -> usize {
    10
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.analysis.char_limit, 2000);
        assert_eq!(config.analysis.language_code, "en");
        assert_eq!(config.analysis.features.len(), ALL_FEATURES.len());
        assert_eq!(config.comprehend.region_or_default(), DEFAULT_REGION);
        assert_eq!(config.display.max_entities, 50);
        assert_eq!(config.display.max_key_phrases, 30);
        assert_eq!(config.display.top_pos, 10);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"analysis": {"char_limit": 500}}"#).unwrap();
        assert_eq!(config.analysis.char_limit, 500);
        assert_eq!(config.analysis.language_code, "en");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_observability_aliases() {
        let config: Config =
            serde_json::from_str(r#"{"observability": {"level": "debug", "format": "json"}}"#)
                .unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides_from(lookup_from(&[
            ("APP_HOST", "0.0.0.0"),
            ("APP_PORT", "9001"),
            ("CHAR_LIMIT", "1500"),
            ("AWS_REGION", "eu-west-1"),
            ("AWS_PROFILE", "demo"),
            ("LOG_LEVEL", "DEBUG"),
        ]));

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.analysis.char_limit, 1500);
        assert_eq!(config.comprehend.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.comprehend.profile.as_deref(), Some("demo"));
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.bind_address(), "0.0.0.0:9001");
    }

    #[test]
    fn test_log_level_names_normalised_from_env() {
        for (raw, expected) in [
            ("WARNING", "warn"),
            ("Warn", "warn"),
            ("CRITICAL", "error"),
            (" INFO ", "info"),
            ("trace", "trace"),
        ] {
            let mut config = Config::default();
            config.apply_overrides_from(lookup_from(&[("LOG_LEVEL", raw)]));
            assert_eq!(config.observability.log_level, expected, "LOG_LEVEL={raw}");
        }
    }

    #[test]
    fn test_log_level_names_normalised_from_file() {
        let config: Config = serde_json::from_str(
            r#"{"observability": {"log_level": "INFO", "log_format": "JSON"}}"#,
        )
        .unwrap();
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.observability.log_format, "json");

        let config: Config =
            serde_json::from_str(r#"{"observability": {"level": "Warning"}}"#).unwrap();
        assert_eq!(config.observability.log_level, "warn");
    }

    #[test]
    fn test_effective_body_limit_covers_char_limit() {
        let mut config = Config::default();
        assert_eq!(config.effective_body_limit(), 64 * 1024);

        config.analysis.char_limit = 100_000;
        assert_eq!(
            config.effective_body_limit(),
            100_000 * MAX_ENCODED_BYTES_PER_CHAR + REQUEST_OVERHEAD_BYTES
        );

        config.server.body_limit_bytes = 4 * 1024 * 1024;
        assert_eq!(config.effective_body_limit(), 4 * 1024 * 1024);
    }

    #[test]
    fn test_unparseable_numbers_keep_previous_value() {
        let mut config = Config::default();
        config.apply_overrides_from(lookup_from(&[
            ("APP_PORT", "eighty"),
            ("CHAR_LIMIT", "lots"),
        ]));
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.analysis.char_limit, 2000);
    }

    #[test]
    fn test_default_region_fallback_env() {
        let mut config = Config::default();
        config.apply_overrides_from(lookup_from(&[("AWS_DEFAULT_REGION", "ap-south-1")]));
        assert_eq!(config.comprehend.region_or_default(), "ap-south-1");

        config.apply_overrides_from(lookup_from(&[
            ("AWS_REGION", "us-west-2"),
            ("AWS_DEFAULT_REGION", "ap-south-1"),
        ]));
        assert_eq!(config.comprehend.region_or_default(), "us-west-2");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 8123}}, "comprehend": {{"endpoint": "http://127.0.0.1:4566"}}}}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 8123);
        assert_eq!(
            config.comprehend.endpoint.as_deref(),
            Some("http://127.0.0.1:4566")
        );
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
