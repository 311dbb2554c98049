use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenamerError {
    #[error("configuration file not found: {}", path.display())]
    ConfigurationMissing { path: PathBuf },
    #[error("configuration is invalid: {0}")]
    ConfigurationInvalid(String),
    #[error("hook payload is invalid: {0}")]
    PayloadInvalid(String),
    #[error("scene not found: {0}")]
    SceneNotFound(String),
    #[error("scene metadata unavailable: {0}")]
    MetadataSource(String),
    #[error("file is not inside any known stash root: {}", path.display())]
    PathOutsideKnownRoots { path: PathBuf },
    #[error("source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },
    #[error("failed to {operation} {} -> {}: {source}", from.display(), to.display())]
    RelocationIo {
        operation: &'static str,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid pattern in rule '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

impl RenamerError {
    /// Run-level errors abort the invocation; everything else is absorbed per item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationMissing { .. }
                | Self::ConfigurationInvalid(_)
                | Self::PayloadInvalid(_)
                | Self::SceneNotFound(_)
                | Self::MetadataSource(_)
                | Self::InvalidPattern { .. }
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot format date '{original}': {reason}")]
pub struct DateFormatError {
    pub original: String,
    pub reason: String,
}
