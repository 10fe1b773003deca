//! Diagnostic snapshot of platform detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CmdRunnerConfig;
use crate::platform::shell::{shell_for, ShellCommand};
use crate::platform::{
    is_alternate_runtime, HostProbe, Platform, PlatformCode, PlatformDetector, RuntimeVersion,
};

/// Everything the detector saw and what it decided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub timestamp: DateTime<Utc>,
    pub platform: Platform,
    pub platform_code: PlatformCode,
    pub runtime_version: RuntimeVersion,
    pub kernel_major: Option<u32>,
    pub alternate_runtime: bool,
    pub modern_runtime: bool,
    pub shell: ShellCommand,
}

impl DetectionReport {
    /// Resolve `probe` through a fresh detector and record the evidence.
    pub fn collect<P: HostProbe>(probe: P, config: &CmdRunnerConfig) -> Self {
        let detector = PlatformDetector::new(probe);
        let platform = detector.platform();
        let probe = detector.probe();
        let alternate_runtime = is_alternate_runtime(probe);
        let runtime_version = probe.runtime_version();

        Self {
            timestamp: Utc::now(),
            platform,
            platform_code: probe.platform_code(),
            runtime_version,
            kernel_major: probe.kernel_major(),
            alternate_runtime,
            modern_runtime: runtime_version.is_modern(alternate_runtime),
            shell: shell_for(platform, &config.shell),
        }
    }

    pub fn is_windows(&self) -> bool {
        self.platform == Platform::Windows
    }

    pub fn is_mac(&self) -> bool {
        self.platform == Platform::Mac
    }

    /// Human-readable lines, one fact per line.
    pub fn summary_lines(&self) -> Vec<String> {
        let kernel = self
            .kernel_major
            .map_or_else(|| "n/a".to_string(), |k| k.to_string());
        let runtime_kind = if self.modern_runtime { "modern" } else { "legacy" };
        vec![
            format!("Platform:      {}", self.platform),
            format!("Platform code: {}", self.platform_code),
            format!("Runtime:       {} ({runtime_kind})", self.runtime_version),
            format!("Kernel major:  {kernel}"),
            format!("Alternate rt:  {}", if self.alternate_runtime { "yes" } else { "no" }),
            format!(
                "Shell:         {} {}",
                self.shell.program,
                self.shell.args.join(" ")
            ),
        ]
    }
}
