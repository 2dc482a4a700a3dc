use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::log_lock::{LogLock, log_lock_path};
use crate::platform::{self, Capabilities, PlatformKind, PlatformOs};

/// Overrides for the location of the shared log lock
#[derive(Debug, Clone, Default)]
pub struct LockSettings {
    /// Directory holding the lock file; defaults to the system temp dir
    pub dir: Option<PathBuf>,
    /// Uid keying the file name; defaults to the real uid of the process
    pub uid: Option<u32>,
}

/// Platform bindings plus the process-wide log lock
///
/// Build one during process start-up and hand it by reference to every
/// component that needs OS facilities or log serialization.
#[derive(Debug)]
pub struct CompatContext {
    os: Box<dyn PlatformOs>,
    log_lock: Option<LogLock>,
}

impl CompatContext {
    /// Detect the host and open the shared log lock at its default location
    pub fn init() -> Result<Self> {
        Self::with_settings(&LockSettings::default())
    }

    pub fn with_settings(settings: &LockSettings) -> Result<Self> {
        Self::from_os(platform::detect(), settings)
    }

    /// Build around a specific platform implementation
    ///
    /// The shared lock is only opened on POSIX-like platforms; elsewhere it
    /// stays absent.
    pub fn from_os(os: Box<dyn PlatformOs>, settings: &LockSettings) -> Result<Self> {
        let log_lock = match (os.kind(), settings.uid.or_else(|| os.real_uid())) {
            (PlatformKind::Posix, Some(uid)) => {
                let dir = settings.dir.clone().unwrap_or_else(std::env::temp_dir);
                Some(LogLock::open(log_lock_path(&dir, uid))?)
            }
            _ => None,
        };

        tracing::debug!(
            "Platform {} initialized (shared log lock: {})",
            os.kind(),
            log_lock
                .as_ref()
                .map(|lock| lock.path().display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        Ok(Self { os, log_lock })
    }

    pub fn os(&self) -> &dyn PlatformOs {
        self.os.as_ref()
    }

    pub fn kind(&self) -> PlatformKind {
        self.os.kind()
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.os.capabilities()
    }

    /// The shared log lock, absent on Windows-like platforms
    pub fn log_lock(&self) -> Option<&LogLock> {
        self.log_lock.as_ref()
    }

    pub fn shared_lock_path(&self) -> Option<&Path> {
        self.log_lock.as_ref().map(LogLock::path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_lock::{LockOutcome, log_flock, log_unflock};
    use crate::platform::WindowsOs;
    use tempfile::tempdir;

    #[test]
    fn test_windows_context_has_no_lock() {
        let ctx = CompatContext::from_os(Box::new(WindowsOs::new()), &LockSettings::default())
            .unwrap();

        assert_eq!(ctx.kind(), PlatformKind::Windows);
        assert!(ctx.log_lock().is_none());
        assert_eq!(log_flock(&ctx, None), LockOutcome::Unsupported);
        assert_eq!(log_unflock(&ctx, None), LockOutcome::Unsupported);
    }

    #[test]
    fn test_windows_context_ignores_task_handle() {
        let dir = tempdir().unwrap();
        let task = LogLock::open(dir.path().join("task.lock")).unwrap();
        let ctx = CompatContext::from_os(Box::new(WindowsOs::new()), &LockSettings::default())
            .unwrap();

        assert_eq!(log_flock(&ctx, Some(&task)), LockOutcome::Unsupported);
    }

    #[test]
    #[cfg(unix)]
    fn test_posix_context_opens_shared_lock() {
        let dir = tempdir().unwrap();
        let settings = LockSettings {
            dir: Some(dir.path().to_path_buf()),
            uid: Some(1000),
        };
        let ctx = CompatContext::with_settings(&settings).unwrap();

        let expected = dir.path().join(".ansible-lock.1000");
        assert_eq!(ctx.kind(), PlatformKind::Posix);
        assert_eq!(ctx.shared_lock_path(), Some(expected.as_path()));
        assert!(expected.exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_posix_context_defaults_to_real_uid() {
        let dir = tempdir().unwrap();
        let settings = LockSettings {
            dir: Some(dir.path().to_path_buf()),
            uid: None,
        };
        let ctx = CompatContext::with_settings(&settings).unwrap();

        let uid = unsafe { libc::getuid() };
        assert_eq!(
            ctx.shared_lock_path(),
            Some(log_lock_path(dir.path(), uid).as_path())
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_shared_and_task_locks() {
        let dir = tempdir().unwrap();
        let settings = LockSettings {
            dir: Some(dir.path().to_path_buf()),
            uid: Some(1000),
        };
        let ctx = CompatContext::with_settings(&settings).unwrap();
        let task = LogLock::open(dir.path().join("task.lock")).unwrap();

        for _ in 0..2 {
            assert_eq!(log_flock(&ctx, None), LockOutcome::Locked);
            assert_eq!(log_unflock(&ctx, None), LockOutcome::Unlocked);
        }

        assert_eq!(log_flock(&ctx, Some(&task)), LockOutcome::Locked);
        task.close();
        assert_eq!(log_unflock(&ctx, Some(&task)), LockOutcome::TargetClosed);
        assert_eq!(log_unflock(&ctx, Some(&task)), LockOutcome::TargetClosed);
    }

    #[test]
    #[cfg(unix)]
    fn test_unwritable_lock_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let settings = LockSettings {
            dir: Some(dir.path().join("does-not-exist")),
            uid: Some(1000),
        };
        assert!(CompatContext::with_settings(&settings).is_err());
    }
}
