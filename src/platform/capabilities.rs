use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io;

use crate::error::Result;

/// Raw file descriptor number as used by the terminal bindings
pub type Fd = i32;

pub type UserByName = fn(&str) -> Result<Option<UserEntry>>;
pub type UserById = fn(u32) -> Result<Option<UserEntry>>;
pub type GroupByName = fn(&str) -> Result<Option<GroupEntry>>;
pub type GroupById = fn(u32) -> Result<Option<GroupEntry>>;
pub type LockFn = fn(&File, LockMode) -> io::Result<()>;
pub type GetAttrFn = fn(Fd) -> io::Result<TerminalAttributes>;
pub type SetAttrFn = fn(Fd, SetWhen, &TerminalAttributes) -> io::Result<()>;
pub type FlushFn = fn(Fd, FlushQueue) -> io::Result<()>;
pub type SetRawFn = fn(Fd, SetWhen) -> io::Result<()>;
pub type OpenLogFn = fn(&str, SyslogOption, SyslogFacility);
pub type SyslogFn = fn(SyslogPriority, &str);

/// An entry from the user database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub gecos: String,
    pub home: String,
    pub shell: String,
}

/// An entry from the group database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    pub name: String,
    pub gid: u32,
    pub members: Vec<String>,
}

/// Operation requested from an advisory lock primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Exclusive,
    Shared,
    Unlock,
}

/// When a terminal attribute change takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetWhen {
    /// Immediately
    Now,
    /// After all queued output has been transmitted
    Drain,
    /// After queued output is transmitted, discarding pending input
    Flush,
}

/// Terminal queue discarded by a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushQueue {
    Input,
    Output,
    Both,
}

/// Opaque terminal attribute set as returned by `tcgetattr`
#[derive(Clone, Copy)]
pub struct TerminalAttributes {
    #[cfg(unix)]
    pub(crate) raw: libc::termios,
}

#[cfg(unix)]
impl TerminalAttributes {
    /// Whether input characters are echoed back
    pub fn echo(&self) -> bool {
        self.raw.c_lflag & libc::ECHO != 0
    }

    /// Whether input is line-buffered (canonical mode)
    pub fn canonical(&self) -> bool {
        self.raw.c_lflag & libc::ICANON != 0
    }
}

impl fmt::Debug for TerminalAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("TerminalAttributes");
        #[cfg(unix)]
        {
            out.field("echo", &self.echo())
                .field("canonical", &self.canonical());
        }
        out.finish_non_exhaustive()
    }
}

/// Flags passed to `openlog`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyslogOption {
    /// Include the process id in each message
    pub pid: bool,
    /// Fall back to the console when the log daemon is unreachable
    pub cons: bool,
    /// Connect to the log daemon immediately
    pub ndelay: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyslogFacility {
    #[default]
    User,
    Daemon,
    Auth,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyslogPriority {
    Emerg,
    Alert,
    Crit,
    Err,
    Warning,
    Notice,
    #[default]
    Info,
    Debug,
}

/// OS facilities bound at startup
///
/// Every field is either a working binding or `None`. A `None` field
/// means the facility does not exist on this platform; callers must not
/// treat it as a transient failure.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub getpwnam: Option<UserByName>,
    pub getpwuid: Option<UserById>,
    pub getgrgid: Option<GroupById>,
    pub getgrnam: Option<GroupByName>,
    pub lock_ex: Option<LockMode>,
    pub lock_un: Option<LockMode>,
    pub lockf: Option<LockFn>,
    pub flock: Option<LockFn>,
    pub tcgetattr: Option<GetAttrFn>,
    pub tcsetattr: Option<SetAttrFn>,
    pub tcflush: Option<FlushFn>,
    pub tcsadrain: Option<SetWhen>,
    pub tciflush: Option<FlushQueue>,
    pub setraw: Option<SetRawFn>,
    pub openlog: Option<OpenLogFn>,
    pub syslog: Option<SyslogFn>,
}

impl Capabilities {
    /// Table with every facility marked absent
    pub fn unsupported() -> Self {
        Self::default()
    }

    /// Presence of each binding, by symbolic name
    pub fn entries(&self) -> [(&'static str, bool); 16] {
        [
            ("getpwnam", self.getpwnam.is_some()),
            ("getpwuid", self.getpwuid.is_some()),
            ("getgrgid", self.getgrgid.is_some()),
            ("getgrnam", self.getgrnam.is_some()),
            ("LOCK_EX", self.lock_ex.is_some()),
            ("LOCK_UN", self.lock_un.is_some()),
            ("lockf", self.lockf.is_some()),
            ("flock", self.flock.is_some()),
            ("tcgetattr", self.tcgetattr.is_some()),
            ("tcsetattr", self.tcsetattr.is_some()),
            ("tcflush", self.tcflush.is_some()),
            ("TCSADRAIN", self.tcsadrain.is_some()),
            ("TCIFLUSH", self.tciflush.is_some()),
            ("setraw", self.setraw.is_some()),
            ("openlog", self.openlog.is_some()),
            ("syslog", self.syslog.is_some()),
        ]
    }

    /// True when every facility is bound
    pub fn is_complete(&self) -> bool {
        self.entries().iter().all(|(_, present)| *present)
    }

    /// True when every facility is absent
    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, present)| !*present)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_map();
        for (name, present) in self.entries() {
            out.entry(&name, &present);
        }
        out.finish()
    }
}
