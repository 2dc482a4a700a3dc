use std::path::Path;

use crate::error::Result;
use crate::platform::{OwnerLookup, PlatformOs};

/// Login name of the current user
///
/// POSIX: the passwd entry of the effective uid. Windows: `USERNAME`.
pub fn get_local_username(os: &dyn PlatformOs) -> Result<String> {
    os.local_username()
}

/// Login name owning `path`
///
/// Returns [`OwnerLookup::Unsupported`] on Windows, where ownership is not
/// uid-based.
pub fn get_file_owner_name(os: &dyn PlatformOs, path: impl AsRef<Path>) -> Result<OwnerLookup> {
    os.file_owner_name(path.as_ref())
}
