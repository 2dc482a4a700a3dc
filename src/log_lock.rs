//! Advisory lock files used to serialize log output across processes
//!
//! One shared lock lives at `<tempdir>/.ansible-lock.<uid>` and is owned by
//! the [`CompatContext`]. Callers that write isolated per-task output can
//! open their own [`LogLock`] and pass it instead; those never contend with
//! the shared one.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::context::CompatContext;
use crate::error::{CompatError, Result};
use crate::platform::{LockFn, LockMode};

/// File name prefix of the shared lock; the numeric uid is appended
pub const LOCK_FILE_PREFIX: &str = ".ansible-lock.";

/// Path of the shared lock file for `uid` inside `dir`
pub fn log_lock_path(dir: &Path, uid: u32) -> PathBuf {
    dir.join(format!("{LOCK_FILE_PREFIX}{uid}"))
}

/// What happened to a lock or unlock request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Locked,
    Unlocked,
    /// The handle was already closed; there was nothing to lock
    TargetClosed,
    /// The platform has no advisory lock primitive
    Unsupported,
    /// The OS refused for another reason
    Failed(io::ErrorKind),
}

impl LockOutcome {
    /// True when the request reached the OS and succeeded
    pub fn is_applied(&self) -> bool {
        matches!(self, LockOutcome::Locked | LockOutcome::Unlocked)
    }
}

/// An open lock file
///
/// Lock and unlock requests share the handle; [`LogLock::close`] waits for
/// any request that is still blocked in the OS before dropping the file.
#[derive(Debug)]
pub struct LogLock {
    path: PathBuf,
    file: RwLock<Option<File>>,
}

impl LogLock {
    /// Open `path` for writing, creating it if absent, close-on-exec
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| {
                CompatError::os(format!("Failed to open lock file {}", path.display()), e)
            })?;

        #[cfg(unix)]
        crate::platform::posix::set_cloexec(&file).map_err(|e| {
            CompatError::os(format!("Failed to set FD_CLOEXEC on {}", path.display()), e)
        })?;

        tracing::debug!("Opened lock file {}", path.display());

        Ok(Self::from_file(path, file))
    }

    /// Wrap an already open file
    pub fn from_file(path: impl Into<PathBuf>, file: File) -> Self {
        Self {
            path: path.into(),
            file: RwLock::new(Some(file)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.file
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Close the descriptor. Any lock held through it is released by the OS.
    pub fn close(&self) {
        let mut file = self.file.write().unwrap_or_else(PoisonError::into_inner);
        if file.take().is_some() {
            tracing::debug!("Closed lock file {}", self.path.display());
        }
    }

    /// Block until an exclusive lock is held
    pub fn acquire(&self) -> LockOutcome {
        self.request(LockMode::Exclusive)
    }

    pub fn release(&self) -> LockOutcome {
        self.request(LockMode::Unlock)
    }

    /// Acquire the lock for the lifetime of the returned guard
    pub fn guard(&self) -> LogLockGuard<'_> {
        LogLockGuard {
            lock: self,
            outcome: self.acquire(),
        }
    }

    fn request(&self, mode: LockMode) -> LockOutcome {
        #[cfg(unix)]
        {
            self.request_with(crate::platform::posix::lockf, mode)
        }

        #[cfg(not(unix))]
        {
            let _ = mode;
            LockOutcome::Unsupported
        }
    }

    /// Issue `mode` through a specific lock primitive
    pub fn request_with(&self, primitive: LockFn, mode: LockMode) -> LockOutcome {
        let file = self.file.read().unwrap_or_else(PoisonError::into_inner);
        let Some(file) = file.as_ref() else {
            tracing::debug!("Lock file {} already closed", self.path.display());
            return LockOutcome::TargetClosed;
        };

        match primitive(file, mode) {
            Ok(()) if mode == LockMode::Unlock => LockOutcome::Unlocked,
            Ok(()) => LockOutcome::Locked,
            Err(e) if descriptor_is_gone(file, &e) => {
                tracing::debug!("Lock file {} descriptor is gone", self.path.display());
                LockOutcome::TargetClosed
            }
            Err(e) => {
                tracing::warn!("Lock request on {} failed: {}", self.path.display(), e);
                LockOutcome::Failed(e.kind())
            }
        }
    }
}

/// EBADF also covers an open descriptor lacking write access, so only treat
/// it as a vanished target when the descriptor no longer resolves.
fn descriptor_is_gone(file: &File, err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;

        err.raw_os_error() == Some(libc::EBADF)
            && unsafe { libc::fcntl(file.as_raw_fd(), libc::F_GETFD) } == -1
    }

    #[cfg(not(unix))]
    {
        let _ = (file, err);
        false
    }
}

/// Holds a [`LogLock`] until dropped
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LogLockGuard<'a> {
    lock: &'a LogLock,
    outcome: LockOutcome,
}

impl LogLockGuard<'_> {
    /// Result of the acquire request that created this guard
    pub fn outcome(&self) -> LockOutcome {
        self.outcome
    }
}

impl Drop for LogLockGuard<'_> {
    fn drop(&mut self) {
        if self.outcome == LockOutcome::Locked {
            self.lock.release();
        }
    }
}

fn lock_target<'a>(ctx: &'a CompatContext, handle: Option<&'a LogLock>) -> Option<&'a LogLock> {
    handle.or_else(|| ctx.log_lock())
}

fn flock_request(ctx: &CompatContext, handle: Option<&LogLock>, mode: LockMode) -> LockOutcome {
    let Some(primitive) = ctx.capabilities().lockf else {
        return LockOutcome::Unsupported;
    };

    match lock_target(ctx, handle) {
        Some(target) => target.request_with(primitive, mode),
        None => LockOutcome::TargetClosed,
    }
}

/// Take the exclusive log lock on `handle`, or on the shared lock when `None`.
///
/// Blocks until granted. A handle that was closed yields
/// [`LockOutcome::TargetClosed`]; nothing here returns an error.
pub fn log_flock(ctx: &CompatContext, handle: Option<&LogLock>) -> LockOutcome {
    flock_request(ctx, handle, LockMode::Exclusive)
}

/// Release the log lock taken by [`log_flock`]
pub fn log_unflock(ctx: &CompatContext, handle: Option<&LogLock>) -> LockOutcome {
    flock_request(ctx, handle, LockMode::Unlock)
}
