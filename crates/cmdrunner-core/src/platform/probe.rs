//! Host introspection behind the [`HostProbe`] seam.
//!
//! The detector never asks the OS anything directly. Everything it needs
//! (platform code, runtime version, kernel version, alternate runtime
//! marker) comes through a probe so tests can simulate any host.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Raw OS platform identifier as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformCode(pub u32);

impl PlatformCode {
    pub const WIN32S: Self = Self(0);
    pub const WIN32_WINDOWS: Self = Self(1);
    pub const WIN32_NT: Self = Self(2);
    pub const WINCE: Self = Self(3);
    /// Unix as enumerated by second-generation runtimes.
    pub const UNIX: Self = Self(4);
    pub const XBOX: Self = Self(5);
    /// Mac OS X, only enumerated by modern runtimes.
    pub const MACOSX: Self = Self(6);
    /// Unix as enumerated by first-generation runtimes, which had no value for it.
    pub const LEGACY_UNIX: Self = Self(128);

    /// Returns `true` for any of the Windows variants.
    pub fn is_windows_family(self) -> bool {
        matches!(
            self,
            Self::WIN32S | Self::WIN32_WINDOWS | Self::WIN32_NT | Self::WINCE
        )
    }

    /// Returns `true` for either of the Unix codes.
    pub fn is_unix_family(self) -> bool {
        matches!(self, Self::UNIX | Self::LEGACY_UNIX)
    }
}

impl fmt::Display for PlatformCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version of the runtime that reports the platform code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
}

impl RuntimeVersion {
    /// What a native build reports. Native targets always name macOS
    /// distinctly, so this sits in the modern range.
    pub const NATIVE: Self = Self::new(4, 0);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether this runtime enumerates Mac OS X with its own platform code.
    ///
    /// Any major version from 3 up qualifies. Under the alternate runtime,
    /// 2.2 and later (with a minor of at least 2) also qualify.
    pub fn is_modern(self, alternate_runtime: bool) -> bool {
        self.major >= 3 || (alternate_runtime && self.major >= 2 && self.minor >= 2)
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for RuntimeVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (major, minor) = s.split_once('.').unwrap_or((s, "0"));
        let major = major
            .parse()
            .map_err(|_| format!("invalid runtime major version '{major}'"))?;
        let minor = minor
            .parse()
            .map_err(|_| format!("invalid runtime minor version '{minor}'"))?;
        Ok(Self::new(major, minor))
    }
}

/// Abstraction over host introspection so detection can be simulated.
pub trait HostProbe: Send + Sync {
    /// Raw OS platform identifier.
    fn platform_code(&self) -> PlatformCode;

    /// Version of the runtime reporting [`HostProbe::platform_code`].
    fn runtime_version(&self) -> RuntimeVersion;

    /// Major number of the OS kernel release, if it can be read.
    fn kernel_major(&self) -> Option<u32>;

    /// Whether the alternate runtime marker is resolvable on this host.
    fn alternate_runtime_present(&self) -> bool;
}

impl<P: HostProbe + ?Sized> HostProbe for &P {
    fn platform_code(&self) -> PlatformCode {
        (**self).platform_code()
    }

    fn runtime_version(&self) -> RuntimeVersion {
        (**self).runtime_version()
    }

    fn kernel_major(&self) -> Option<u32> {
        (**self).kernel_major()
    }

    fn alternate_runtime_present(&self) -> bool {
        (**self).alternate_runtime_present()
    }
}

/// Marker looked up on `PATH` when no configuration says otherwise.
pub const DEFAULT_ALTERNATE_RUNTIME_MARKER: &str = "mono";

/// Probe backed by the real host.
#[derive(Debug, Clone)]
pub struct NativeProbe {
    alternate_marker: Option<String>,
}

impl NativeProbe {
    /// Create a probe that looks for `marker` on `PATH` to decide whether
    /// the alternate runtime is present. `None` or an empty marker disables
    /// the lookup.
    pub fn new(marker: Option<&str>) -> Self {
        let alternate_marker = marker
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        Self { alternate_marker }
    }

    pub fn alternate_marker(&self) -> Option<&str> {
        self.alternate_marker.as_deref()
    }
}

impl Default for NativeProbe {
    fn default() -> Self {
        Self::new(Some(DEFAULT_ALTERNATE_RUNTIME_MARKER))
    }
}

impl HostProbe for NativeProbe {
    fn platform_code(&self) -> PlatformCode {
        if cfg!(windows) {
            PlatformCode::WIN32_NT
        } else if cfg!(any(target_os = "macos", target_os = "ios")) {
            PlatformCode::MACOSX
        } else {
            PlatformCode::UNIX
        }
    }

    fn runtime_version(&self) -> RuntimeVersion {
        RuntimeVersion::NATIVE
    }

    fn kernel_major(&self) -> Option<u32> {
        kernel_release().as_deref().and_then(parse_kernel_major)
    }

    fn alternate_runtime_present(&self) -> bool {
        let Some(marker) = self.alternate_marker.as_deref() else {
            return false;
        };
        match which::which(marker) {
            Ok(path) => {
                debug!(marker, path = %path.display(), "alternate runtime marker found");
                true
            }
            Err(e) => {
                debug!(marker, error = %e, "alternate runtime marker not found");
                false
            }
        }
    }
}

/// Probe whose answers are plain fields. Used for simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticProbe {
    pub platform_code: PlatformCode,
    pub runtime_version: RuntimeVersion,
    pub kernel_major: Option<u32>,
    pub alternate_runtime: bool,
}

impl StaticProbe {
    /// Snapshot every answer from another probe.
    pub fn capture(probe: &dyn HostProbe) -> Self {
        Self {
            platform_code: probe.platform_code(),
            runtime_version: probe.runtime_version(),
            kernel_major: probe.kernel_major(),
            alternate_runtime: probe.alternate_runtime_present(),
        }
    }
}

impl HostProbe for StaticProbe {
    fn platform_code(&self) -> PlatformCode {
        self.platform_code
    }

    fn runtime_version(&self) -> RuntimeVersion {
        self.runtime_version
    }

    fn kernel_major(&self) -> Option<u32> {
        self.kernel_major
    }

    fn alternate_runtime_present(&self) -> bool {
        self.alternate_runtime
    }
}

#[cfg(unix)]
fn kernel_release() -> Option<String> {
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        debug!(error = %std::io::Error::last_os_error(), "uname failed");
        return None;
    }
    let release = unsafe { std::ffi::CStr::from_ptr(uts.release.as_ptr()) };
    Some(release.to_string_lossy().into_owned())
}

#[cfg(not(unix))]
fn kernel_release() -> Option<String> {
    None
}

/// Leading decimal digits of a kernel release string, e.g. `9` for `"9.8.0"`.
fn parse_kernel_major(release: &str) -> Option<u32> {
    let digits: String = release
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
