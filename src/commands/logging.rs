use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use platform_compat::platform::{SyslogFacility, SyslogOption, SyslogPriority};
use platform_compat::{CompatContext, LockOutcome};

/// Print the shared log lock path
pub fn run_lock_path(ctx: &CompatContext) -> Result<()> {
    match ctx.shared_lock_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("none"),
    }
    Ok(())
}

/// Append `message` to `file` under the shared log lock
///
/// Returns the outcome of the lock request; the line is written either way.
pub fn append_locked(ctx: &CompatContext, file: &Path, message: &str) -> Result<LockOutcome> {
    let mut out = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .with_context(|| format!("Failed to open log file: {}", file.display()))?;

    let guard = ctx.log_lock().map(|lock| lock.guard());
    let outcome = guard
        .as_ref()
        .map(|g| g.outcome())
        .unwrap_or(LockOutcome::Unsupported);

    if !outcome.is_applied() {
        tracing::debug!("Writing {} without the shared lock ({:?})", file.display(), outcome);
    }

    writeln!(out, "{}", message)
        .with_context(|| format!("Failed to write log file: {}", file.display()))?;
    out.flush()
        .with_context(|| format!("Failed to flush log file: {}", file.display()))?;

    Ok(outcome)
}

pub fn run_log(ctx: &CompatContext, file: &Path, message: &str) -> Result<()> {
    append_locked(ctx, file, message)?;
    Ok(())
}

/// Send one message through the syslog bindings
pub fn run_syslog(ctx: &CompatContext, ident: &str, message: &str) -> Result<()> {
    let caps = ctx.capabilities();
    let (Some(openlog), Some(syslog)) = (caps.openlog, caps.syslog) else {
        anyhow::bail!("syslog is not available on this platform");
    };

    let option = SyslogOption {
        pid: true,
        ..SyslogOption::default()
    };
    openlog(ident, option, SyslogFacility::User);
    syslog(SyslogPriority::Info, message);
    tracing::info!("Sent message to syslog as {}", ident);

    Ok(())
}
