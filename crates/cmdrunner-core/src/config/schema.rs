use serde::{Deserialize, Serialize};

use crate::platform::probe::DEFAULT_ALTERNATE_RUNTIME_MARKER;

/// Top-level configuration loaded from `cmdrunner.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CmdRunnerConfig {
    pub platform: PlatformConfig,
    pub shell: ShellConfig,
}

/// Platform detection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PlatformConfig {
    /// Program whose presence on `PATH` marks the alternate runtime.
    /// Empty disables the check.
    pub alternate_runtime_marker: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            alternate_runtime_marker: DEFAULT_ALTERNATE_RUNTIME_MARKER.to_string(),
        }
    }
}

/// Shell programs used to run command lines on each platform family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ShellConfig {
    pub unix: String,
    pub windows: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            unix: "/bin/sh".to_string(),
            windows: "cmd.exe".to_string(),
        }
    }
}
