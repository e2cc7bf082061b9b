//! Testkit Core Library
//!
//! Shared error taxonomy and host-environment inspection for the testkit
//! workspace.

pub mod error;
pub mod runtime;

// Re-export commonly used types
pub use error::{Error, Result};
pub use runtime::{environment_info, DatabaseCapabilities, EnvironmentInfo, RuntimeEnv};

/// Testkit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
