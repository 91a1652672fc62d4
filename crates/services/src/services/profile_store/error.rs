use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile '{name}' not found at {}", path.display())]
    NotFound { name: String, path: PathBuf },

    #[error("Invalid YAML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// Well-formed YAML whose shape does not fit a profile config
    #[error("Unexpected structure in {}: {source}", path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Profile '{0}' already exists")]
    AlreadyExists(String),

    #[error("I/O failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile name '{0}'")]
    InvalidName(String),
}

/// Coarse classification used at transport boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileErrorKind {
    NotFound,
    Parse,
    Schema,
    AlreadyExists,
    Io,
    InvalidName,
}

impl ProfileError {
    pub fn kind(&self) -> ProfileErrorKind {
        match self {
            Self::NotFound { .. } => ProfileErrorKind::NotFound,
            Self::Parse { .. } => ProfileErrorKind::Parse,
            Self::Schema { .. } => ProfileErrorKind::Schema,
            Self::AlreadyExists(_) => ProfileErrorKind::AlreadyExists,
            Self::Io { .. } => ProfileErrorKind::Io,
            Self::InvalidName(_) => ProfileErrorKind::InvalidName,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
