use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

mod schema;

pub use schema::{CmdRunnerConfig, PlatformConfig, ShellConfig};

/// File name looked up in the working directory by [`load_or_default`].
pub const CONFIG_FILE_NAME: &str = "cmdrunner.toml";

/// Why a `cmdrunner.toml` could not be turned into a [`CmdRunnerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("config validation error: {message}")]
    Validation { message: String },
}

/// Read the config at `path`.
///
/// A missing file is not an error: it yields the built-in settings
/// (`mono` as the alternate runtime marker, `/bin/sh` and `cmd.exe` as
/// shells). A file that exists but fails to read, parse or validate is.
pub fn load_config(path: &Path) -> Result<CmdRunnerConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(CmdRunnerConfig::default());
    }

    let data = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_config(&data)
}

/// Parse TOML text. Omitted sections and keys keep their built-in values;
/// unknown keys are rejected.
pub fn parse_config(data: &str) -> Result<CmdRunnerConfig, ConfigError> {
    let config: CmdRunnerConfig = toml::from_str(data)?;
    validate(&config)?;
    Ok(config)
}

/// Config for commands run without `--config`: `./cmdrunner.toml` when it
/// loads, otherwise the built-in settings. A broken file is logged, not fatal.
pub fn load_or_default() -> CmdRunnerConfig {
    let path = PathBuf::from(CONFIG_FILE_NAME);
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), %e, "failed to load config, falling back to defaults");
            CmdRunnerConfig::default()
        }
    }
}

fn validate(config: &CmdRunnerConfig) -> Result<(), ConfigError> {
    if config.shell.unix.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "shell.unix must not be empty".to_string(),
        });
    }

    if config.shell.windows.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "shell.windows must not be empty".to_string(),
        });
    }

    if config
        .platform
        .alternate_runtime_marker
        .chars()
        .any(|c| c == '/' || c == '\\')
    {
        return Err(ConfigError::Validation {
            message: format!(
                "platform.alternate_runtime_marker must be a program name, got '{}'",
                config.platform.alternate_runtime_marker
            ),
        });
    }

    Ok(())
}
