//! Session service configuration.

use serde::Deserialize;
use thiserror::Error;

/// Session service configuration.
///
/// # Config File Format
///
/// ```toml
/// [session]
/// request_timeout_secs = 1
/// session_timeout_secs = 86400
/// auto_challenge = true
/// ```
///
/// Missing keys take their default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Age after which a pending request is reported as timed out
    pub request_timeout_secs: u64,
    /// Idle time after which a session is dropped by `expire_sessions`
    pub session_timeout_secs: u64,
    /// Answer Random packets and messages from keyless peers with a WHOAREYOU
    /// immediately instead of waiting for the host to call `send_who_are_you`
    pub auto_challenge: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 1,
            session_timeout_secs: 86_400,
            auto_challenge: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    session: SessionConfig,
}

impl SessionConfig {
    /// Create a config suitable for testing (short timeouts).
    pub fn for_testing() -> Self {
        Self {
            request_timeout_secs: 2,
            session_timeout_secs: 60,
            auto_challenge: true,
        }
    }

    /// Parse the `[session]` table of a TOML document and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        file.session.validate()?;
        Ok(file.session)
    }

    /// Reject zero timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.session_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "session_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur during config loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },
    /// TOML parse error.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// Value out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
