//! Platform-specific shell and executable naming.
//!
//! Builds the argv a command runner would hand to the OS. Nothing here
//! spawns a process.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Platform;
use crate::config::ShellConfig;
use crate::{CmdRunnerError, Result};

/// Shell program plus the arguments that precede the command text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellCommand {
    /// Full argv for running `command` through this shell.
    pub fn wrap(&self, command: &str) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv.push(command.to_string());
        argv
    }
}

/// Shell used to run command lines on `platform`.
///
/// Windows runs through `cmd.exe /C`; Mac and Linux through `/bin/sh -c`.
/// Programs come from `config`.
pub fn shell_for(platform: Platform, config: &ShellConfig) -> ShellCommand {
    match platform {
        Platform::Windows => ShellCommand {
            program: config.windows.clone(),
            args: vec!["/C".to_string()],
        },
        Platform::Mac | Platform::Linux => ShellCommand {
            program: config.unix.clone(),
            args: vec!["-c".to_string()],
        },
    }
}

/// Name of an executable called `stem` on `platform`.
///
/// Appends `.exe` on Windows unless the stem already carries it.
pub fn executable_name(platform: Platform, stem: &str) -> String {
    match platform {
        Platform::Windows if !stem.to_ascii_lowercase().ends_with(".exe") => {
            format!("{stem}.exe")
        }
        _ => stem.to_string(),
    }
}

/// Resolve the shell program for `platform` to a path on this host.
pub fn locate_shell(platform: Platform, config: &ShellConfig) -> Result<PathBuf> {
    let shell = shell_for(platform, config);
    let path = which::which(&shell.program).map_err(|source| CmdRunnerError::ShellNotFound {
        program: shell.program.clone(),
        source,
    })?;
    debug!(platform = %platform, path = %path.display(), "located shell");
    Ok(path)
}
