//! Platform compatibility shim
//!
//! Exposes one name surface over OS facilities that differ between POSIX
//! systems and Windows: user/group lookup, advisory file locks, terminal
//! attribute control and syslog. On a platform lacking a facility the
//! binding is `None`, never a partial substitute.
//!
//! ```no_run
//! use platform_compat::{CompatContext, get_local_username, log_flock, log_unflock};
//!
//! let ctx = CompatContext::init()?;
//! let user = get_local_username(ctx.os())?;
//!
//! log_flock(&ctx, None);
//! println!("hello from {user}");
//! log_unflock(&ctx, None);
//! # Ok::<(), platform_compat::CompatError>(())
//! ```

pub mod context;
pub mod error;
pub mod log_lock;
pub mod platform;
pub mod users;

pub use context::{CompatContext, LockSettings};
pub use error::{CompatError, Result};
pub use log_lock::{LockOutcome, LogLock, LogLockGuard, log_flock, log_lock_path, log_unflock};
pub use platform::{Capabilities, OwnerLookup, PlatformKind, PlatformOs, detect};
pub use users::{get_file_owner_name, get_local_username};
