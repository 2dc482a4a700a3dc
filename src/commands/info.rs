use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use platform_compat::{CompatContext, PlatformKind, get_local_username};

use super::utils::mark;

/// Snapshot of what the host provides
#[derive(Debug, Serialize)]
pub struct CapabilityReport {
    pub platform: PlatformKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_lock: Option<PathBuf>,
    pub capabilities: BTreeMap<&'static str, bool>,
}

impl CapabilityReport {
    pub fn collect(ctx: &CompatContext) -> Self {
        let username = match get_local_username(ctx.os()) {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::warn!("Could not resolve local username: {}", e);
                None
            }
        };

        Self {
            platform: ctx.kind(),
            username,
            shared_lock: ctx.shared_lock_path().map(|p| p.to_path_buf()),
            capabilities: ctx.capabilities().entries().into_iter().collect(),
        }
    }
}

/// Print the capability report
pub fn run_info(ctx: &CompatContext, json: bool) -> Result<()> {
    let report = CapabilityReport::collect(ctx);

    if json {
        let content =
            serde_json::to_string_pretty(&report).context("Failed to serialize capability report")?;
        println!("{}", content);
        return Ok(());
    }

    println!("Platform Compatibility Shim v{}", env!("CARGO_PKG_VERSION"));
    println!("Platform: {}", report.platform);
    if let Some(username) = &report.username {
        println!("User: {}", username);
    }
    match &report.shared_lock {
        Some(path) => println!("Shared log lock: {}", path.display()),
        None => println!("Shared log lock: none"),
    }
    println!();

    for (name, present) in &report.capabilities {
        println!("  {} {}", mark(*present), name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_compat::LockSettings;
    use platform_compat::platform::WindowsOs;

    #[test]
    fn test_windows_report() {
        let os = WindowsOs::with_env(|key| (key == "USERNAME").then(|| "alice".into()));
        let ctx = CompatContext::from_os(Box::new(os), &LockSettings::default()).unwrap();

        let report = CapabilityReport::collect(&ctx);
        assert_eq!(report.platform, PlatformKind::Windows);
        assert_eq!(report.username.as_deref(), Some("alice"));
        assert!(report.shared_lock.is_none());
        assert_eq!(report.capabilities.len(), 16);
        assert!(report.capabilities.values().all(|present| !present));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["platform"], "windows");
        assert_eq!(json["capabilities"]["getpwnam"], false);
        assert!(json.get("shared_lock").is_none());
    }

    #[test]
    fn test_report_without_username() {
        let os = WindowsOs::with_env(|_| None);
        let ctx = CompatContext::from_os(Box::new(os), &LockSettings::default()).unwrap();

        let report = CapabilityReport::collect(&ctx);
        assert!(report.username.is_none());
    }

    #[test]
    #[cfg(unix)]
    fn test_posix_report() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LockSettings {
            dir: Some(dir.path().to_path_buf()),
            uid: Some(1000),
        };
        let ctx = CompatContext::with_settings(&settings).unwrap();

        let report = CapabilityReport::collect(&ctx);
        assert_eq!(report.platform, PlatformKind::Posix);
        assert!(report.capabilities.values().all(|present| *present));
        assert_eq!(
            report.shared_lock,
            Some(dir.path().join(".ansible-lock.1000"))
        );
    }
}
