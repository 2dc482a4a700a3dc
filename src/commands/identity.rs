use anyhow::{Context, Result};
use std::path::Path;

use platform_compat::platform::{GroupEntry, UserEntry};
use platform_compat::{
    CompatContext, CompatError, OwnerLookup, get_file_owner_name, get_local_username,
};

/// Print the login name of the current user
pub fn run_whoami(ctx: &CompatContext) -> Result<()> {
    let name = get_local_username(ctx.os()).context("Failed to determine local username")?;
    println!("{}", name);
    Ok(())
}

/// Print the login name owning `path`
pub fn run_owner(ctx: &CompatContext, path: &Path) -> Result<()> {
    let owner = get_file_owner_name(ctx.os(), path)
        .with_context(|| format!("Failed to resolve owner of {}", path.display()))?;

    match owner {
        OwnerLookup::Found(name) => println!("{}", name),
        OwnerLookup::Unsupported => println!("unsupported on this platform"),
    }
    Ok(())
}

/// Resolve a user given as a login name or a numeric uid
///
/// A numeric argument is tried as a uid first, then as a login name.
pub fn lookup_user(ctx: &CompatContext, name: &str) -> Result<Option<UserEntry>> {
    let caps = ctx.capabilities();
    let (Some(getpwuid), Some(getpwnam)) = (caps.getpwuid, caps.getpwnam) else {
        return Ok(None);
    };

    let uid = name.parse::<u32>().ok();
    if let Some(uid) = uid {
        if let Some(entry) = getpwuid(uid)? {
            return Ok(Some(entry));
        }
    }

    match getpwnam(name)? {
        Some(entry) => Ok(Some(entry)),
        None => Err(match uid {
            Some(uid) => CompatError::NoSuchUser(uid),
            None => CompatError::NoSuchUserName(name.to_string()),
        }
        .into()),
    }
}

/// Resolve a group given as a name or a numeric gid
///
/// A numeric argument is tried as a gid first, then as a group name.
pub fn lookup_group(ctx: &CompatContext, name: &str) -> Result<Option<GroupEntry>> {
    let caps = ctx.capabilities();
    let (Some(getgrgid), Some(getgrnam)) = (caps.getgrgid, caps.getgrnam) else {
        return Ok(None);
    };

    let gid = name.parse::<u32>().ok();
    if let Some(gid) = gid {
        if let Some(entry) = getgrgid(gid)? {
            return Ok(Some(entry));
        }
    }

    match getgrnam(name)? {
        Some(entry) => Ok(Some(entry)),
        None => Err(match gid {
            Some(gid) => CompatError::NoSuchGroup(gid),
            None => CompatError::NoSuchGroupName(name.to_string()),
        }
        .into()),
    }
}

pub fn run_user(ctx: &CompatContext, name: &str) -> Result<()> {
    match lookup_user(ctx, name)? {
        Some(entry) => {
            println!("name:  {}", entry.name);
            println!("uid:   {}", entry.uid);
            println!("gid:   {}", entry.gid);
            println!("gecos: {}", entry.gecos);
            println!("home:  {}", entry.home);
            println!("shell: {}", entry.shell);
        }
        None => println!("user database unsupported on this platform"),
    }
    Ok(())
}

pub fn run_group(ctx: &CompatContext, name: &str) -> Result<()> {
    match lookup_group(ctx, name)? {
        Some(entry) => {
            println!("name:    {}", entry.name);
            println!("gid:     {}", entry.gid);
            println!("members: {}", entry.members.join(","));
        }
        None => println!("group database unsupported on this platform"),
    }
    Ok(())
}
