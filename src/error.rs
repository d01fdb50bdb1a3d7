use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which flavour of handle an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Exclusive,
    Shared,
    Weak,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleKind::Exclusive => "exclusive",
            HandleKind::Shared => "shared",
            HandleKind::Weak => "weak",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The handle is empty, was reset, moved from, or its resource expired.
    #[error("null dereference through empty {kind} handle")]
    NullDereference { kind: HandleKind },
}

impl HandleError {
    pub fn null(kind: HandleKind) -> Self {
        HandleError::NullDereference { kind }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
