use thiserror::Error;

/// Top-level error type for the cmdrunner-core library.
///
/// Platform detection never fails. Config loading has its own
/// [`ConfigError`](crate::config::ConfigError); this covers shell lookup.
#[derive(Debug, Error)]
pub enum CmdRunnerError {
    /// The configured shell program could not be found on `PATH`.
    #[error("shell '{program}' not found: {source}")]
    ShellNotFound {
        program: String,
        source: which::Error,
    },
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, CmdRunnerError>;
