//! Operating system family detection.
//!
//! [`PlatformDetector`] resolves the host into Windows, Mac or Linux once and
//! caches the answer. The process-wide [`get_platform`], [`is_windows`] and
//! [`is_mac`] helpers share a single detector backed by [`NativeProbe`].

pub mod probe;
pub mod shell;

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub use probe::{HostProbe, NativeProbe, PlatformCode, RuntimeVersion, StaticProbe};

/// Broad OS family of the host.
///
/// Anything that is neither Windows nor recognised as Mac is classified as
/// `Linux`, including other Unix systems such as Solaris, AIX or the BSDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Mac,
    Linux,
}

impl Platform {
    /// Label shown for a detector that has not resolved yet.
    pub const UNKNOWN_LABEL: &'static str = "unknown";

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Mac => "mac",
            Self::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" => Ok(Self::Windows),
            "mac" | "macos" => Ok(Self::Mac),
            "linux" => Ok(Self::Linux),
            other => Err(format!(
                "unknown platform '{other}'; expected windows, mac or linux"
            )),
        }
    }
}

/// Resolve the platform from a probe without caching.
pub fn resolve_platform(probe: &dyn HostProbe) -> Platform {
    let code = probe.platform_code();
    let platform = if code.is_windows_family() {
        Platform::Windows
    } else if is_mac_detected(probe) {
        Platform::Mac
    } else {
        Platform::Linux
    };

    debug!(
        code = %code,
        runtime = %probe.runtime_version(),
        platform = %platform,
        "resolved host platform"
    );
    platform
}

/// Decide whether the host is a Mac.
///
/// Modern runtimes report Mac OS X as its own code. Older ones only report
/// a generic Unix code, so the Darwin kernel major (8, 9 or 10) is used to
/// tell a Mac apart. A missing kernel version is not a Mac.
pub fn is_mac_detected(probe: &dyn HostProbe) -> bool {
    let code = probe.platform_code();
    let runtime = probe.runtime_version();
    let alternate = is_alternate_runtime(probe);

    if runtime.is_modern(alternate) {
        return code == PlatformCode::MACOSX;
    }

    if !code.is_unix_family() {
        return false;
    }

    // Darwin 8 = Tiger, 9 = Leopard, 10 = Snow Leopard. Other Unix kernels
    // can share these numbers.
    let kernel_major = probe.kernel_major();
    trace!(?kernel_major, %runtime, "legacy runtime, checking darwin kernel");
    matches!(kernel_major, Some(8..=10))
}

/// Whether the alternate runtime marker is present. Absence is `false`.
pub fn is_alternate_runtime(probe: &dyn HostProbe) -> bool {
    probe.alternate_runtime_present()
}

/// Lazily resolves and caches the host platform.
///
/// The first call to [`PlatformDetector::platform`] runs the probe; every
/// later call returns the cached value. Concurrent first callers race on a
/// [`OnceLock`], so exactly one resolution is stored and all of them observe it.
pub struct PlatformDetector<P = NativeProbe> {
    probe: P,
    resolved: OnceLock<Platform>,
}

impl<P: HostProbe> PlatformDetector<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            resolved: OnceLock::new(),
        }
    }

    /// Return the cached platform, resolving it on first use.
    pub fn platform(&self) -> Platform {
        if let Some(platform) = self.resolved.get() {
            trace!(platform = %platform, "platform cache hit");
            return *platform;
        }
        *self.resolved.get_or_init(|| resolve_platform(&self.probe))
    }

    pub fn is_windows(&self) -> bool {
        self.platform() == Platform::Windows
    }

    pub fn is_mac(&self) -> bool {
        self.platform() == Platform::Mac
    }

    /// Cached value, or `None` while still unresolved. Never probes.
    pub fn cached(&self) -> Option<Platform> {
        self.resolved.get().copied()
    }

    /// Drop the cached value so the next query probes again.
    pub fn reset(&mut self) {
        self.resolved.take();
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }
}

impl Default for PlatformDetector<NativeProbe> {
    fn default() -> Self {
        Self::new(NativeProbe::default())
    }
}

impl<P> fmt::Debug for PlatformDetector<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self
            .resolved
            .get()
            .map_or(Platform::UNKNOWN_LABEL, |p| p.as_str());
        f.debug_struct("PlatformDetector")
            .field("resolved", &state)
            .finish_non_exhaustive()
    }
}

static HOST: OnceLock<PlatformDetector<NativeProbe>> = OnceLock::new();

fn host() -> &'static PlatformDetector<NativeProbe> {
    HOST.get_or_init(PlatformDetector::default)
}

/// Platform of the current process, resolved once and cached for its lifetime.
pub fn get_platform() -> Platform {
    host().platform()
}

/// Returns `true` when the current process runs on Windows.
pub fn is_windows() -> bool {
    get_platform() == Platform::Windows
}

/// Returns `true` when the current process runs on a Mac.
pub fn is_mac() -> bool {
    get_platform() == Platform::Mac
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct FakeProbe {
        code: u32,
        runtime: (u32, u32),
        kernel_major: Option<u32>,
        alternate: bool,
        code_reads: AtomicUsize,
    }

    impl FakeProbe {
        fn new(code: u32, runtime: (u32, u32), kernel_major: Option<u32>) -> Self {
            Self {
                code,
                runtime,
                kernel_major,
                alternate: false,
                code_reads: AtomicUsize::new(0),
            }
        }

        fn alternate(mut self) -> Self {
            self.alternate = true;
            self
        }
    }

    impl HostProbe for FakeProbe {
        fn platform_code(&self) -> PlatformCode {
            self.code_reads.fetch_add(1, Ordering::SeqCst);
            PlatformCode(self.code)
        }

        fn runtime_version(&self) -> RuntimeVersion {
            RuntimeVersion::new(self.runtime.0, self.runtime.1)
        }

        fn kernel_major(&self) -> Option<u32> {
            self.kernel_major
        }

        fn alternate_runtime_present(&self) -> bool {
            self.alternate
        }
    }

    #[test]
    fn windows_codes_resolve_to_windows() {
        for code in [0, 1, 2, 3] {
            for runtime in [(1, 1), (2, 0), (4, 0)] {
                let probe = FakeProbe::new(code, runtime, Some(9));
                assert_eq!(resolve_platform(&probe), Platform::Windows);
            }
        }
    }

    #[test]
    fn modern_runtime_code_six_is_mac() {
        let probe = FakeProbe::new(6, (3, 0), None);
        assert_eq!(resolve_platform(&probe), Platform::Mac);
    }

    #[test]
    fn modern_runtime_unix_code_is_linux_even_with_darwin_kernel() {
        let probe = FakeProbe::new(4, (4, 0), Some(9));
        assert_eq!(resolve_platform(&probe), Platform::Linux);
    }

    #[test]
    fn alternate_runtime_two_two_is_modern() {
        let probe = FakeProbe::new(6, (2, 2), None).alternate();
        assert_eq!(resolve_platform(&probe), Platform::Mac);

        let probe = FakeProbe::new(4, (2, 2), Some(9)).alternate();
        assert_eq!(resolve_platform(&probe), Platform::Linux);
    }

    #[test]
    fn legacy_runtime_darwin_kernels_are_mac() {
        for code in [4, 128] {
            for kernel in [8, 9, 10] {
                let probe = FakeProbe::new(code, (2, 0), Some(kernel));
                assert_eq!(
                    resolve_platform(&probe),
                    Platform::Mac,
                    "code {code} kernel {kernel}"
                );
            }
        }
    }

    #[test]
    fn legacy_runtime_other_kernels_fall_through_to_linux() {
        for kernel in [Some(5), Some(7), Some(11), None] {
            let probe = FakeProbe::new(4, (2, 0), kernel);
            assert_eq!(resolve_platform(&probe), Platform::Linux);
        }
    }

    #[test]
    fn legacy_runtime_ignores_code_six() {
        let probe = FakeProbe::new(6, (1, 1), Some(9));
        assert_eq!(resolve_platform(&probe), Platform::Linux);
    }

    #[test]
    fn alternate_runtime_below_two_two_uses_legacy_check() {
        let probe = FakeProbe::new(128, (2, 1), Some(10)).alternate();
        assert!(is_mac_detected(&probe));
    }

    #[test]
    fn unrecognised_codes_are_linux() {
        for code in [5, 7, 42, 255] {
            let probe = FakeProbe::new(code, (2, 0), Some(9));
            assert_eq!(resolve_platform(&probe), Platform::Linux);
        }
    }

    #[test]
    fn is_alternate_runtime_reflects_probe() {
        assert!(!is_alternate_runtime(&FakeProbe::new(4, (2, 0), None)));
        assert!(is_alternate_runtime(&FakeProbe::new(4, (2, 0), None).alternate()));
    }

    #[test]
    fn detector_starts_unresolved() {
        let detector = PlatformDetector::new(FakeProbe::new(2, (4, 0), None));
        assert_eq!(detector.cached(), None);
        assert_eq!(detector.probe().code_reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn detector_memoizes() {
        let detector = PlatformDetector::new(FakeProbe::new(6, (4, 0), None));
        assert_eq!(detector.platform(), Platform::Mac);
        assert_eq!(detector.platform(), Platform::Mac);
        assert!(detector.is_mac());
        assert!(!detector.is_windows());
        assert_eq!(detector.cached(), Some(Platform::Mac));
        assert_eq!(detector.probe().code_reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reset_returns_to_unresolved() {
        let mut detector = PlatformDetector::new(FakeProbe::new(2, (4, 0), None));
        assert!(detector.is_windows());
        detector.reset();
        assert_eq!(detector.cached(), None);
        assert!(detector.is_windows());
        assert_eq!(detector.probe().code_reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn projections_match_platform() {
        for (code, runtime, kernel) in [(2, (4, 0), None), (6, (4, 0), None), (4, (4, 0), None)] {
            let detector = PlatformDetector::new(FakeProbe::new(code, runtime, kernel));
            let platform = detector.platform();
            assert_eq!(detector.is_windows(), platform == Platform::Windows);
            assert_eq!(detector.is_mac(), platform == Platform::Mac);
        }
    }

    #[test]
    fn concurrent_first_calls_agree() {
        let detector = Arc::new(PlatformDetector::new(FakeProbe::new(128, (1, 1), Some(8))));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let detector = Arc::clone(&detector);
                std::thread::spawn(move || detector.platform())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Platform::Mac);
        }
        assert_eq!(detector.cached(), Some(Platform::Mac));
    }

    #[test]
    fn debug_shows_unknown_until_resolved() {
        let detector = PlatformDetector::new(FakeProbe::new(2, (4, 0), None));
        assert!(format!("{detector:?}").contains("unknown"));
        detector.platform();
        assert!(format!("{detector:?}").contains("windows"));
    }

    #[test]
    fn platform_parses_and_displays() {
        assert_eq!("Windows".parse::<Platform>(), Ok(Platform::Windows));
        assert_eq!("macos".parse::<Platform>(), Ok(Platform::Mac));
        assert_eq!(" linux ".parse::<Platform>(), Ok(Platform::Linux));
        assert!("solaris".parse::<Platform>().is_err());
        assert_eq!(Platform::Mac.to_string(), "mac");
    }

    #[test]
    fn platform_serializes_lowercase() {
        let json = serde_json::to_string(&Platform::Windows).unwrap();
        assert_eq!(json, "\"windows\"");
        let back: Platform = serde_json::from_str("\"mac\"").unwrap();
        assert_eq!(back, Platform::Mac);
    }

    #[test]
    fn host_platform_is_stable() {
        let first = get_platform();
        for _ in 0..4 {
            assert_eq!(get_platform(), first);
        }
        assert_eq!(is_windows(), first == Platform::Windows);
        assert_eq!(is_mac(), first == Platform::Mac);
    }

    #[test]
    fn host_platform_matches_target() {
        let expected = if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Linux
        };
        assert_eq!(get_platform(), expected);
    }
}
