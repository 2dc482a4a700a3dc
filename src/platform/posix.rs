use libc::{c_char, c_int};
use std::ffi::{CStr, CString};
use std::fmt;
use std::fs::File;
use std::io;
use std::mem;
use std::os::unix::fs::MetadataExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr;
use std::sync::Mutex;

use super::{
    Capabilities, Fd, FlushQueue, GroupEntry, LockMode, OwnerLookup, PlatformKind, PlatformOs,
    SetWhen, SyslogFacility, SyslogOption, SyslogPriority, TerminalAttributes, UserEntry,
};
use crate::error::{CompatError, Result};

/// Fallback when sysconf gives no hint for the `*_r` buffer size
const DEFAULT_BUFFER_LEN: usize = 1024;

/// Upper bound for the `*_r` buffer; entries larger than this are treated as an error
const MAX_BUFFER_LEN: usize = 1 << 20;

/// POSIX-like platform: every facility bound to libc
pub struct PosixOs {
    capabilities: Capabilities,
}

impl PosixOs {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities {
                getpwnam: Some(user_by_name),
                getpwuid: Some(user_by_uid),
                getgrgid: Some(group_by_gid),
                getgrnam: Some(group_by_name),
                lock_ex: Some(LockMode::Exclusive),
                lock_un: Some(LockMode::Unlock),
                lockf: Some(lockf),
                flock: Some(flock),
                tcgetattr: Some(tcgetattr),
                tcsetattr: Some(tcsetattr),
                tcflush: Some(tcflush),
                tcsadrain: Some(SetWhen::Drain),
                tciflush: Some(FlushQueue::Input),
                setraw: Some(setraw),
                openlog: Some(openlog),
                syslog: Some(syslog),
            },
        }
    }
}

impl Default for PosixOs {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PosixOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosixOs").finish_non_exhaustive()
    }
}

impl PlatformOs for PosixOs {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Posix
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn local_username(&self) -> Result<String> {
        let euid = unsafe { libc::geteuid() };
        user_by_uid(euid)?
            .map(|entry| entry.name)
            .ok_or(CompatError::NoSuchUser(euid))
    }

    fn file_owner_name(&self, path: &Path) -> Result<OwnerLookup> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CompatError::PathNotFound(path.to_path_buf()),
            _ => CompatError::os(format!("Failed to stat {}", path.display()), e),
        })?;

        let uid = metadata.uid();
        user_by_uid(uid)?
            .map(|entry| OwnerLookup::Found(entry.name))
            .ok_or(CompatError::NoSuchUser(uid))
    }

    fn real_uid(&self) -> Option<u32> {
        Some(unsafe { libc::getuid() })
    }
}

fn initial_buffer_len(name: c_int) -> usize {
    match unsafe { libc::sysconf(name) } {
        n if n > 0 => n as usize,
        _ => DEFAULT_BUFFER_LEN,
    }
}

unsafe fn owned_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

/// Drive a reentrant database call, growing the scratch buffer on ERANGE.
///
/// `call` fills the record and the result pointer and returns the libc
/// status code. A null result pointer with status 0 means no entry.
fn reentrant_lookup<R, T>(
    what: &str,
    size_hint: c_int,
    mut call: impl FnMut(&mut R, &mut [c_char], &mut *mut R) -> c_int,
    convert: impl FnOnce(&R) -> T,
) -> Result<Option<T>> {
    let mut buf_len = initial_buffer_len(size_hint);

    loop {
        let mut record: R = unsafe { mem::zeroed() };
        let mut buf = vec![0 as c_char; buf_len];
        let mut found: *mut R = ptr::null_mut();

        let rc = call(&mut record, &mut buf, &mut found);

        match rc {
            0 if found.is_null() => return Ok(None),
            0 => return Ok(Some(convert(&record))),
            libc::ERANGE if buf_len < MAX_BUFFER_LEN => buf_len *= 2,
            // Several libcs report "no entry" through these codes
            libc::ENOENT | libc::ESRCH | libc::EBADF | libc::EPERM => return Ok(None),
            code => {
                return Err(CompatError::os(
                    format!("{what} failed"),
                    io::Error::from_raw_os_error(code),
                ));
            }
        }
    }
}

fn user_entry(pwd: &libc::passwd) -> UserEntry {
    unsafe {
        UserEntry {
            name: owned_string(pwd.pw_name),
            uid: pwd.pw_uid,
            gid: pwd.pw_gid,
            gecos: owned_string(pwd.pw_gecos),
            home: owned_string(pwd.pw_dir),
            shell: owned_string(pwd.pw_shell),
        }
    }
}

fn group_entry(grp: &libc::group) -> GroupEntry {
    let mut members = Vec::new();
    if !grp.gr_mem.is_null() {
        let mut cursor = grp.gr_mem;
        unsafe {
            while !(*cursor).is_null() {
                members.push(owned_string(*cursor));
                cursor = cursor.add(1);
            }
        }
    }

    GroupEntry {
        name: unsafe { owned_string(grp.gr_name) },
        gid: grp.gr_gid,
        members,
    }
}

/// Look up a user by login name
pub fn user_by_name(name: &str) -> Result<Option<UserEntry>> {
    let Ok(c_name) = CString::new(name) else {
        return Ok(None);
    };

    reentrant_lookup(
        "getpwnam_r",
        libc::_SC_GETPW_R_SIZE_MAX,
        |pwd: &mut libc::passwd, buf, found| unsafe {
            libc::getpwnam_r(c_name.as_ptr(), pwd, buf.as_mut_ptr(), buf.len(), found)
        },
        user_entry,
    )
}

/// Look up a user by numeric id
pub fn user_by_uid(uid: u32) -> Result<Option<UserEntry>> {
    reentrant_lookup(
        "getpwuid_r",
        libc::_SC_GETPW_R_SIZE_MAX,
        |pwd: &mut libc::passwd, buf, found| unsafe {
            libc::getpwuid_r(uid, pwd, buf.as_mut_ptr(), buf.len(), found)
        },
        user_entry,
    )
}

/// Look up a group by name
pub fn group_by_name(name: &str) -> Result<Option<GroupEntry>> {
    let Ok(c_name) = CString::new(name) else {
        return Ok(None);
    };

    reentrant_lookup(
        "getgrnam_r",
        libc::_SC_GETGR_R_SIZE_MAX,
        |grp: &mut libc::group, buf, found| unsafe {
            libc::getgrnam_r(c_name.as_ptr(), grp, buf.as_mut_ptr(), buf.len(), found)
        },
        group_entry,
    )
}

/// Look up a group by numeric id
pub fn group_by_gid(gid: u32) -> Result<Option<GroupEntry>> {
    reentrant_lookup(
        "getgrgid_r",
        libc::_SC_GETGR_R_SIZE_MAX,
        |grp: &mut libc::group, buf, found| unsafe {
            libc::getgrgid_r(gid, grp, buf.as_mut_ptr(), buf.len(), found)
        },
        group_entry,
    )
}

/// Retry a libc call returning -1 while it is interrupted by a signal
fn retry_eintr(mut call: impl FnMut() -> c_int) -> io::Result<()> {
    loop {
        if call() != -1 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Whole-file POSIX record lock, blocking until granted.
///
/// Record locks belong to the process: they do not exclude other threads
/// of the same process, and closing any descriptor for the file drops them.
pub fn lockf(file: &File, mode: LockMode) -> io::Result<()> {
    let lock_type = match mode {
        LockMode::Exclusive => libc::F_WRLCK,
        LockMode::Shared => libc::F_RDLCK,
        LockMode::Unlock => libc::F_UNLCK,
    };

    let mut lock: libc::flock = unsafe { mem::zeroed() };
    lock.l_type = lock_type as libc::c_short;
    lock.l_whence = libc::SEEK_SET as libc::c_short;
    lock.l_start = 0;
    lock.l_len = 0;

    let fd = file.as_raw_fd();
    retry_eintr(|| unsafe { libc::fcntl(fd, libc::F_SETLKW, &lock) })
}

/// BSD-style lock tied to the open file description, blocking until granted
pub fn flock(file: &File, mode: LockMode) -> io::Result<()> {
    let operation = match mode {
        LockMode::Exclusive => libc::LOCK_EX,
        LockMode::Shared => libc::LOCK_SH,
        LockMode::Unlock => libc::LOCK_UN,
    };

    let fd = file.as_raw_fd();
    retry_eintr(|| unsafe { libc::flock(fd, operation) })
}

/// Mark a descriptor close-on-exec so it is not inherited by spawned programs
pub fn set_cloexec(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags == -1 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn set_when_raw(when: SetWhen) -> c_int {
    match when {
        SetWhen::Now => libc::TCSANOW,
        SetWhen::Drain => libc::TCSADRAIN,
        SetWhen::Flush => libc::TCSAFLUSH,
    }
}

pub fn tcgetattr(fd: Fd) -> io::Result<TerminalAttributes> {
    let mut raw: libc::termios = unsafe { mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut raw) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(TerminalAttributes { raw })
}

pub fn tcsetattr(fd: Fd, when: SetWhen, attrs: &TerminalAttributes) -> io::Result<()> {
    retry_eintr(|| unsafe { libc::tcsetattr(fd, set_when_raw(when), &attrs.raw) })
}

pub fn tcflush(fd: Fd, queue: FlushQueue) -> io::Result<()> {
    let selector = match queue {
        FlushQueue::Input => libc::TCIFLUSH,
        FlushQueue::Output => libc::TCOFLUSH,
        FlushQueue::Both => libc::TCIOFLUSH,
    };
    if unsafe { libc::tcflush(fd, selector) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Put the terminal into raw mode: no echo, no line editing, no signal
/// characters, 8-bit clean, one byte per read.
pub fn setraw(fd: Fd, when: SetWhen) -> io::Result<()> {
    let mut attrs = tcgetattr(fd)?;
    let raw = &mut attrs.raw;

    raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
    raw.c_oflag &= !libc::OPOST;
    raw.c_cflag &= !(libc::CSIZE | libc::PARENB);
    raw.c_cflag |= libc::CS8;
    raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
    raw.c_cc[libc::VMIN] = 1;
    raw.c_cc[libc::VTIME] = 0;

    tcsetattr(fd, when, &attrs)
}

/// openlog keeps the ident pointer, so the string must outlive every later syslog call
static SYSLOG_IDENT: Mutex<Option<CString>> = Mutex::new(None);

fn facility_raw(facility: SyslogFacility) -> c_int {
    match facility {
        SyslogFacility::User => libc::LOG_USER,
        SyslogFacility::Daemon => libc::LOG_DAEMON,
        SyslogFacility::Auth => libc::LOG_AUTH,
        SyslogFacility::Local0 => libc::LOG_LOCAL0,
        SyslogFacility::Local1 => libc::LOG_LOCAL1,
        SyslogFacility::Local2 => libc::LOG_LOCAL2,
        SyslogFacility::Local3 => libc::LOG_LOCAL3,
        SyslogFacility::Local4 => libc::LOG_LOCAL4,
        SyslogFacility::Local5 => libc::LOG_LOCAL5,
        SyslogFacility::Local6 => libc::LOG_LOCAL6,
        SyslogFacility::Local7 => libc::LOG_LOCAL7,
    }
}

fn priority_raw(priority: SyslogPriority) -> c_int {
    match priority {
        SyslogPriority::Emerg => libc::LOG_EMERG,
        SyslogPriority::Alert => libc::LOG_ALERT,
        SyslogPriority::Crit => libc::LOG_CRIT,
        SyslogPriority::Err => libc::LOG_ERR,
        SyslogPriority::Warning => libc::LOG_WARNING,
        SyslogPriority::Notice => libc::LOG_NOTICE,
        SyslogPriority::Info => libc::LOG_INFO,
        SyslogPriority::Debug => libc::LOG_DEBUG,
    }
}

fn option_raw(option: SyslogOption) -> c_int {
    let mut raw = 0;
    if option.pid {
        raw |= libc::LOG_PID;
    }
    if option.cons {
        raw |= libc::LOG_CONS;
    }
    if option.ndelay {
        raw |= libc::LOG_NDELAY;
    }
    raw
}

/// Strip interior NULs so arbitrary text can cross into C
fn c_text(text: &str) -> CString {
    CString::new(text.replace('\0', "")).unwrap_or_default()
}

pub fn openlog(ident: &str, option: SyslogOption, facility: SyslogFacility) {
    let ident = c_text(ident);
    let mut slot = SYSLOG_IDENT
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { libc::openlog(ident.as_ptr(), option_raw(option), facility_raw(facility)) };
    *slot = Some(ident);
}

pub fn syslog(priority: SyslogPriority, message: &str) {
    let message = c_text(message);
    unsafe { libc::syslog(priority_raw(priority), c"%s".as_ptr(), message.as_ptr()) };
}
