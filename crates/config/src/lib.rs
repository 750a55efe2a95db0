//! Configuration loading, validation, and management for Colloquy.
//!
//! Loads configuration from `~/.colloquy/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.colloquy/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Context assembly settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Capability token verification
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Token limit used when a context request does not name one.
    #[serde(default = "default_context_tokens")]
    pub default_max_tokens: u32,
}

fn default_context_tokens() -> u32 {
    2048
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_max_tokens: default_context_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum accepted request body size.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    // 100 messages of 50k characters each, with room for JSON framing.
    8 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// When false, every request is treated as carrying an admin capability.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// HS256 secret used to verify capability tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jwt_secret: None,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("jwt_secret", &redact(&self.jwt_secret))
            .finish()
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.colloquy/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `COLLOQUY_JWT_SECRET`
    /// - `COLLOQUY_CONTEXT_TOKENS`
    /// - `COLLOQUY_AUTH_ENABLED` (`false`/`0` disables verification)
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::load_unchecked()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load) but skips [`validate`](Self::validate), so an
    /// incomplete configuration can still be inspected.
    pub fn load_unchecked() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::read_unchecked(&config_path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_unchecked(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file (defaults when absent) without validating it.
    pub fn read_unchecked(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(secret) = std::env::var("COLLOQUY_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }

        if let Ok(raw) = std::env::var("COLLOQUY_CONTEXT_TOKENS") {
            self.context.default_max_tokens = raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "COLLOQUY_CONTEXT_TOKENS must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        if let Ok(raw) = std::env::var("COLLOQUY_AUTH_ENABLED") {
            self.auth.enabled = !matches!(raw.to_ascii_lowercase().as_str(), "false" | "0" | "no");
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.default_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "context.default_max_tokens must be greater than 0".into(),
            ));
        }

        if self.auth.enabled && self.auth.jwt_secret.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret is required when auth is enabled".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".colloquy")
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn open_config() -> AppConfig {
        AppConfig {
            auth: AuthConfig {
                enabled: false,
                jwt_secret: None,
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn default_context_limit_is_2048() {
        let config = AppConfig::default();
        assert_eq!(config.context.default_max_tokens, 2048);
        assert_eq!(config.gateway.port, 8000);
        assert!(config.auth.enabled);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = open_config();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.context.default_max_tokens, 2048);
        assert!(!parsed.auth.enabled);
    }

    #[test]
    fn zero_token_limit_rejected() {
        let mut config = open_config();
        config.context.default_max_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn enabled_auth_requires_secret() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jwt_secret"));

        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some("s3cret".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_redacts_secret() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some("hunter2".into());
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[context]
default_max_tokens = 4096

[gateway]
port = 9100

[auth]
jwt_secret = "file-secret"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.context.default_max_tokens, 4096);
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("file-secret"));
    }

    #[test]
    fn missing_file_with_auth_enabled_fails_validation() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn incomplete_config_can_be_read_unchecked() {
        let config = AppConfig::read_unchecked(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.auth.enabled);
        assert!(config.auth.jwt_secret.is_none());
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[context\ndefault_max_tokens = ").unwrap();
        let result = AppConfig::load_from(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("default_max_tokens = 2048"));
        assert!(toml_str.contains("8000"));
    }
}
