use std::fs;
use std::path::Path;

use tracing::debug;

use crate::service::{ConfigError, SessionConfig};

/// Load a [`SessionConfig`] from the `[session]` table of a TOML file.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed, or holds invalid values.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SessionConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let config = SessionConfig::from_toml_str(&content)?;
    debug!(path = %path.display(), ?config, "Loaded session config");
    Ok(config)
}
