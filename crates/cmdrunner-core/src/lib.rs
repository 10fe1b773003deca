pub mod config;
pub mod error;
pub mod platform;
pub mod report;

pub use error::{CmdRunnerError, Result};
pub use platform::{get_platform, is_mac, is_windows, Platform, PlatformDetector};
