use std::ffi::OsString;
use std::fmt;
use std::path::Path;

use super::{Capabilities, OwnerLookup, PlatformKind, PlatformOs};
use crate::error::{CompatError, Result};

/// Environment lookup used to resolve the username
pub type EnvLookup = fn(&str) -> Option<OsString>;

/// Windows-like platform: no POSIX facilities
pub struct WindowsOs {
    capabilities: Capabilities,
    env: EnvLookup,
}

impl WindowsOs {
    pub fn new() -> Self {
        Self::with_env(|key| std::env::var_os(key))
    }

    /// Build with a custom environment source
    pub fn with_env(env: EnvLookup) -> Self {
        Self {
            capabilities: Capabilities::unsupported(),
            env,
        }
    }
}

impl Default for WindowsOs {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WindowsOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowsOs").finish_non_exhaustive()
    }
}

impl PlatformOs for WindowsOs {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Windows
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn local_username(&self) -> Result<String> {
        (self.env)("USERNAME")
            .and_then(|value| value.into_string().ok())
            .ok_or(CompatError::MissingEnvironment("USERNAME"))
    }

    fn file_owner_name(&self, _path: &Path) -> Result<OwnerLookup> {
        Ok(OwnerLookup::Unsupported)
    }

    fn real_uid(&self) -> Option<u32> {
        None
    }
}
