//! Platform capability layer
//!
//! The host is classified once as POSIX-like or Windows-like and the
//! matching [`PlatformOs`] implementation is handed to consumers:
//! - `posix.rs`: libc-backed bindings (Unix only)
//! - `windows.rs`: every facility absent, username from the environment
//!
//! The Windows variant carries no OS calls, so it is compiled on every
//! host and can be exercised anywhere.

pub mod capabilities;
#[cfg(unix)]
pub mod posix;
pub mod windows;

pub use capabilities::*;
#[cfg(unix)]
pub use posix::PosixOs;
pub use windows::WindowsOs;

use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::error::Result;

/// Host platform class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Posix,
    Windows,
}

impl PlatformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Posix => "posix",
            PlatformKind::Windows => "windows",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of resolving the owner of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerLookup {
    Found(String),
    /// The platform has no uid-based ownership model
    Unsupported,
}

/// Uniform surface over the OS facilities of one platform class
pub trait PlatformOs: Send + Sync + fmt::Debug {
    fn kind(&self) -> PlatformKind;

    /// The capability table, populated once at construction
    fn capabilities(&self) -> &Capabilities;

    /// Login name of the current user
    fn local_username(&self) -> Result<String>;

    /// Login name owning `path`
    fn file_owner_name(&self, path: &Path) -> Result<OwnerLookup>;

    /// Real user id of the process, where the platform has one
    fn real_uid(&self) -> Option<u32>;
}

/// Select the implementation for the host this binary was built for
pub fn detect() -> Box<dyn PlatformOs> {
    #[cfg(unix)]
    {
        tracing::debug!("Detected POSIX-like host");
        Box::new(PosixOs::new())
    }

    #[cfg(not(unix))]
    {
        tracing::debug!("Detected Windows-like host");
        Box::new(WindowsOs::new())
    }
}
