use std::path::PathBuf;

/// Errors surfaced by identity lookups and lock-file setup.
///
/// Facilities that simply do not exist on the host are never reported
/// through this type; they show up as `None` capabilities or as the
/// `Unsupported` variants of the result enums.
#[derive(Debug, thiserror::Error)]
pub enum CompatError {
    #[error("environment variable {0} is not set")]
    MissingEnvironment(&'static str),
    #[error("no passwd entry for uid {0}")]
    NoSuchUser(u32),
    #[error("no group entry for gid {0}")]
    NoSuchGroup(u32),
    #[error("no passwd entry named {0}")]
    NoSuchUserName(String),
    #[error("no group entry named {0}")]
    NoSuchGroupName(String),
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error("{context}: {source}")]
    Os {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CompatError {
    pub(crate) fn os(context: impl Into<String>, source: std::io::Error) -> Self {
        CompatError::Os {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompatError>;
