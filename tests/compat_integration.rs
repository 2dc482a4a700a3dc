use std::path::Path;
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use assert_fs::prelude::*;
use platform_compat::{
    CompatContext, LockOutcome, LockSettings, LogLock, OwnerLookup, PlatformKind,
    get_file_owner_name, get_local_username, log_flock, log_lock_path, log_unflock,
};

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_platform-compat"))
}

fn run_bin(lock_dir: &Path, args: &[&str]) -> Output {
    bin()
        .arg("--lock-dir")
        .arg(lock_dir)
        .args(args)
        .output()
        .expect("failed to run platform-compat")
}

fn context_in(dir: &Path) -> CompatContext {
    let settings = LockSettings {
        dir: Some(dir.to_path_buf()),
        uid: None,
    };
    CompatContext::with_settings(&settings).unwrap()
}

#[test]
#[cfg(unix)]
fn test_lock_path_is_deterministic() {
    assert_eq!(
        log_lock_path(Path::new("/tmp"), 1000).to_str(),
        Some("/tmp/.ansible-lock.1000")
    );
}

#[test]
fn test_exactly_one_binding_set() {
    let temp = assert_fs::TempDir::new().unwrap();
    let ctx = context_in(temp.path());
    let caps = ctx.capabilities();

    assert!(caps.is_complete() ^ caps.is_empty());
    match ctx.kind() {
        PlatformKind::Posix => assert!(ctx.log_lock().is_some()),
        PlatformKind::Windows => assert!(ctx.log_lock().is_none()),
    }
}

#[test]
#[cfg(unix)]
fn test_helpers_agree_with_user_database() {
    let temp = assert_fs::TempDir::new().unwrap();
    let ctx = context_in(temp.path());

    let getpwuid = ctx.capabilities().getpwuid.unwrap();
    let euid = unsafe { libc::geteuid() };
    let expected = getpwuid(euid).unwrap().unwrap().name;
    assert_eq!(get_local_username(ctx.os()).unwrap(), expected);

    let file = temp.child("owned");
    file.touch().unwrap();
    assert_eq!(
        get_file_owner_name(ctx.os(), file.path()).unwrap(),
        OwnerLookup::Found(expected)
    );
}

#[test]
#[cfg(unix)]
fn test_shared_lock_cycles_and_closed_task_handle() {
    let temp = assert_fs::TempDir::new().unwrap();
    let ctx = context_in(temp.path());

    for _ in 0..2 {
        assert_eq!(log_flock(&ctx, None), LockOutcome::Locked);
        assert_eq!(log_unflock(&ctx, None), LockOutcome::Unlocked);
    }

    let task = LogLock::open(temp.child("task.lock").path()).unwrap();
    task.close();
    assert_eq!(log_flock(&ctx, Some(&task)), LockOutcome::TargetClosed);
    assert_eq!(log_unflock(&ctx, Some(&task)), LockOutcome::TargetClosed);
}

#[test]
#[cfg(unix)]
fn test_whoami_matches_library() {
    let temp = assert_fs::TempDir::new().unwrap();
    let ctx = context_in(temp.path());

    let output = run_bin(temp.path(), &["whoami"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        get_local_username(ctx.os()).unwrap()
    );
}

#[test]
fn test_info_json() {
    let temp = assert_fs::TempDir::new().unwrap();

    let output = run_bin(temp.path(), &["info", "--json"]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let capabilities = report["capabilities"].as_object().unwrap();
    assert_eq!(capabilities.len(), 16);

    #[cfg(unix)]
    {
        assert_eq!(report["platform"], "posix");
        assert!(capabilities.values().all(|v| v == true));
    }
}

#[test]
#[cfg(unix)]
fn test_owner_of_missing_path_fails() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.child("missing");

    let output = run_bin(temp.path(), &["owner", missing.path().to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("path not found"));
}

#[test]
#[cfg(unix)]
fn test_concurrent_writers_keep_every_line() {
    let temp = assert_fs::TempDir::new().unwrap();
    let log = temp.child("shared.log");

    let children: Vec<_> = (0..8)
        .map(|i| {
            bin()
                .arg("--lock-dir")
                .arg(temp.path())
                .arg("log")
                .arg(log.path())
                .arg(format!("line {i}"))
                .spawn()
                .unwrap()
        })
        .collect();

    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    let content = std::fs::read_to_string(log.path()).unwrap();
    let mut lines: Vec<_> = content.lines().collect();
    lines.sort_unstable();
    let expected: Vec<_> = (0..8).map(|i| format!("line {i}")).collect();
    assert_eq!(lines, expected);
}

#[test]
#[cfg(unix)]
fn test_writer_waits_for_lock_holder() {
    let temp = assert_fs::TempDir::new().unwrap();
    let ctx = context_in(temp.path());
    let log = temp.child("held.log");

    assert_eq!(log_flock(&ctx, None), LockOutcome::Locked);

    let mut child = bin()
        .arg("--lock-dir")
        .arg(temp.path())
        .arg("log")
        .arg(log.path())
        .arg("after release")
        .spawn()
        .unwrap();

    thread::sleep(Duration::from_millis(500));
    assert!(child.try_wait().unwrap().is_none(), "writer ran while lock was held");

    assert_eq!(log_unflock(&ctx, None), LockOutcome::Unlocked);
    assert!(child.wait().unwrap().success());
    log.assert("after release\n");
}
