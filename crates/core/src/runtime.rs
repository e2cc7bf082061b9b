//! Runtime and environment inspection
//!
//! External test runners consume these as pure query functions: they read
//! the process environment once and return plain values. Backend selection
//! downstream works off the explicit [`DatabaseCapabilities`] descriptor
//! rather than probing ambient state at call sites.

use serde::{Deserialize, Serialize};

/// Environment variable naming a host-managed database to use for tests.
pub const MANAGED_DATABASE_ENV: &str = "TESTKIT_DATABASE_URL";

/// Snapshot of the host environment the tests are running in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    /// Operating system (`std::env::consts::OS`)
    pub os: String,

    /// CPU architecture (`std::env::consts::ARCH`)
    pub arch: String,

    /// Whether a CI environment was detected (`CI` set and not "false")
    pub ci: bool,

    /// Available parallelism, 1 if it cannot be determined
    pub cpus: usize,

    /// Hostname, if the environment exposes one
    pub hostname: Option<String>,
}

/// Collect environment facts. No side effects beyond reading `std::env`.
pub fn environment_info() -> EnvironmentInfo {
    EnvironmentInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        ci: env_flag("CI"),
        cpus: std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1),
        hostname: std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty()),
    }
}

/// Which database backends the current host can offer a test session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCapabilities {
    /// A host-managed connection handle is available (the host owns its
    /// lifecycle; adapters must never close it)
    pub managed_handle: bool,

    /// An embedded file-backed driver is available
    pub embedded_driver: bool,
}

impl DatabaseCapabilities {
    /// No backends beyond in-memory
    pub fn none() -> Self {
        Self {
            managed_handle: false,
            embedded_driver: false,
        }
    }
}

impl Default for DatabaseCapabilities {
    fn default() -> Self {
        Self::none()
    }
}

/// Runtime facts decided once by the lifecycle driver and passed down
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEnv {
    pub environment: EnvironmentInfo,
    pub database: DatabaseCapabilities,
}

impl RuntimeEnv {
    /// Inspect the process environment once and build the descriptor.
    ///
    /// The embedded driver is compiled in (bundled sqlite), so it is always
    /// reported available; a managed handle is hinted by
    /// [`MANAGED_DATABASE_ENV`]. Detection is best-effort and never fails.
    pub fn detect() -> Self {
        Self {
            environment: environment_info(),
            database: DatabaseCapabilities {
                managed_handle: std::env::var(MANAGED_DATABASE_ENV)
                    .map(|v| !v.is_empty())
                    .unwrap_or(false),
                embedded_driver: true,
            },
        }
    }

    /// A descriptor with fixed capabilities, for callers that decide
    /// explicitly instead of detecting.
    pub fn with_capabilities(database: DatabaseCapabilities) -> Self {
        Self {
            environment: environment_info(),
            database,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_info_populates_consts() {
        let info = environment_info();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
        assert!(info.cpus >= 1);
    }

    #[test]
    fn test_detect_reports_embedded_driver() {
        let env = RuntimeEnv::detect();
        assert!(env.database.embedded_driver);
    }

    #[test]
    fn test_capabilities_default_is_none() {
        let caps = DatabaseCapabilities::default();
        assert!(!caps.managed_handle);
        assert!(!caps.embedded_driver);
    }
}
