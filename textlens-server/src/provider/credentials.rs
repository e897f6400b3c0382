//! AWS credential resolution.
//!
//! Resolved once at startup and handed to the analyzer; the analyzer never
//! looks at the environment itself.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use textlens_common::{Error, Result};

const DEFAULT_PROFILE: &str = "default";

/// Static AWS credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***REDACTED***")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Resolve credentials through the environment accessor `lookup`.
    ///
    /// A configured `profile` is read from the shared credentials file.
    /// Otherwise `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY` are used when
    /// set, then the `default` profile.
    pub fn resolve_with<F>(profile: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = shared_credentials_path(&lookup);

        if let Some(name) = profile {
            return Self::from_profile_file(&path, name);
        }

        if let Some(creds) = Self::from_env_with(&lookup) {
            tracing::debug!("Using AWS credentials from environment");
            return Ok(creds);
        }

        Self::from_profile_file(&path, DEFAULT_PROFILE).map_err(|e| {
            Error::Credentials(format!(
                "no AWS credentials in environment and default profile unavailable ({})",
                e
            ))
        })
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN` through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key_id = lookup("AWS_ACCESS_KEY_ID").filter(|v| !v.is_empty())?;
        let secret_access_key = lookup("AWS_SECRET_ACCESS_KEY").filter(|v| !v.is_empty())?;
        let session_token = lookup("AWS_SESSION_TOKEN").filter(|v| !v.is_empty());
        Some(Self::new(access_key_id, secret_access_key, session_token))
    }

    /// Load one profile from a shared credentials file.
    pub fn from_profile_file(path: &Path, profile: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;

        let profiles = parse_profiles(&content);
        let section = profiles.get(profile).ok_or_else(|| {
            Error::Credentials(format!(
                "profile '{}' not found in {}",
                profile,
                path.display()
            ))
        })?;

        let field = |key: &str| {
            section.get(key).cloned().filter(|v| !v.is_empty()).ok_or_else(|| {
                Error::Credentials(format!("profile '{}' is missing {}", profile, key))
            })
        };

        tracing::debug!(profile = profile, "Using AWS credentials from shared file");
        Ok(Self::new(
            field("aws_access_key_id")?,
            field("aws_secret_access_key")?,
            section.get("aws_session_token").cloned(),
        ))
    }
}

fn shared_credentials_path<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup("AWS_SHARED_CREDENTIALS_FILE") {
        return PathBuf::from(path);
    }
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".aws").join("credentials"),
        |dirs| dirs.home_dir().join(".aws").join("credentials"),
    )
}

/// Parse an INI-style credentials file into profile → key → value.
///
/// Accepts both `[name]` and `[profile name]` headers; `#` and `;` start
/// comment lines.
fn parse_profiles(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut profiles: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = header.trim();
            let name = name.strip_prefix("profile ").map(str::trim).unwrap_or(name);
            profiles.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            continue;
        }

        if let (Some(section), Some((key, value))) = (current.as_ref(), line.split_once('=')) {
            if let Some(entries) = profiles.get_mut(section) {
                entries.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
        }
    }

    profiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
# shared credentials
[default]
aws_access_key_id = AKIDDEFAULT
aws_secret_access_key = secret-default

[profile demo]
aws_access_key_id=AKIDDEMO
aws_secret_access_key=secret-demo
aws_session_token = token-demo
; trailing comment
[broken]
aws_access_key_id = AKIDBROKEN
";

    fn write_sample() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_profiles() {
        let profiles = parse_profiles(SAMPLE);
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles["default"]["aws_access_key_id"], "AKIDDEFAULT");
        assert_eq!(profiles["demo"]["aws_session_token"], "token-demo");
    }

    #[test]
    fn test_from_profile_file() {
        let file = write_sample();
        let creds = Credentials::from_profile_file(file.path(), "demo").unwrap();
        assert_eq!(creds.access_key_id(), "AKIDDEMO");
        assert_eq!(creds.secret_access_key(), "secret-demo");
        assert_eq!(creds.session_token(), Some("token-demo"));
    }

    #[test]
    fn test_missing_profile_and_missing_key() {
        let file = write_sample();
        let err = Credentials::from_profile_file(file.path(), "nope").unwrap_err();
        assert!(err.to_string().contains("profile 'nope' not found"));

        let err = Credentials::from_profile_file(file.path(), "broken").unwrap_err();
        assert!(err.to_string().contains("aws_secret_access_key"));
        assert!(err.is_config());
    }

    #[test]
    fn test_env_credentials() {
        let creds = Credentials::from_env_with(|key| match key {
            "AWS_ACCESS_KEY_ID" => Some("AKIDENV".into()),
            "AWS_SECRET_ACCESS_KEY" => Some("secret-env".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(creds.access_key_id(), "AKIDENV");
        assert!(creds.session_token().is_none());

        assert!(Credentials::from_env_with(no_env).is_none());
    }

    #[test]
    fn test_resolve_prefers_configured_profile() {
        let file = write_sample();
        let path = file.path().to_string_lossy().to_string();
        let lookup = move |key: &str| match key {
            "AWS_SHARED_CREDENTIALS_FILE" => Some(path.clone()),
            "AWS_ACCESS_KEY_ID" => Some("AKIDENV".into()),
            "AWS_SECRET_ACCESS_KEY" => Some("secret-env".into()),
            _ => None,
        };

        let creds = Credentials::resolve_with(Some("demo"), &lookup).unwrap();
        assert_eq!(creds.access_key_id(), "AKIDDEMO");

        let creds = Credentials::resolve_with(None, &lookup).unwrap();
        assert_eq!(creds.access_key_id(), "AKIDENV");
    }

    #[test]
    fn test_resolve_falls_back_to_default_profile() {
        let file = write_sample();
        let path = file.path().to_string_lossy().to_string();
        let creds = Credentials::resolve_with(None, |key: &str| {
            (key == "AWS_SHARED_CREDENTIALS_FILE").then(|| path.clone())
        })
        .unwrap();
        assert_eq!(creds.access_key_id(), "AKIDDEFAULT");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("AKID", "very-secret", Some("tok".into()));
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("tok\""));
    }
}
