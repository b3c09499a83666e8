//! Unified error type for bardcheck.
//!
//! Only configuration and local I/O problems surface here; advisory network
//! failures and cache I/O errors are swallowed where they occur and show up
//! in the report as `source=unknown` or `unknownReason=lookup_failed`.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BardcheckError>;

/// I/O operation kind, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    Read,
    Write,
    Create,
}

impl std::fmt::Display for IoOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IoOperation::Read => "read",
            IoOperation::Write => "write",
            IoOperation::Create => "create",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug)]
pub enum BardcheckError {
    /// No supported lockfile exists in the target directory.
    #[error(
        "no supported lockfile found (expected package-lock.json, pnpm-lock.yaml, yarn.lock, bun.lock or bun.lockb)"
    )]
    NoLockfile,

    /// The lockfile exists but could not be parsed.
    #[error("lockfile is corrupt: {detail}")]
    LockfileCorrupt { detail: String },

    /// The output directory could not be created or written.
    #[error("output directory {path} is not writable: {source}")]
    OutDirUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A report file could not be written.
    #[error("failed to write report {path}: {source}")]
    ReportWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Mutually exclusive options were requested.
    #[error("conflicting configuration: {0}")]
    ConfigConflict(String),

    /// Local I/O failure that is not swallowed (manifest reads, findings-json).
    #[error("failed to {operation} {path}: {source}")]
    Io {
        path: PathBuf,
        operation: IoOperation,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failure (report or findings output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BardcheckError {
    pub fn lockfile_corrupt(detail: impl std::fmt::Display) -> Self {
        Self::LockfileCorrupt {
            detail: detail.to_string(),
        }
    }

    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: IoOperation::Read,
            source,
        }
    }

    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: IoOperation::Write,
            source,
        }
    }

    /// Every surfaced error is a tool error: exit code 2.
    /// Threshold failures exit 1 and never pass through here.
    pub fn exit_code(&self) -> u8 {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_no_lockfile_message_names_the_formats() {
        let err = BardcheckError::NoLockfile;
        let msg = err.to_string();
        assert!(msg.contains("package-lock.json"));
        assert!(msg.contains("pnpm-lock.yaml"));
        assert!(msg.contains("yarn.lock"));
        assert!(msg.contains("bun.lock"));
    }

    #[test]
    fn test_lockfile_corrupt_carries_detail() {
        let err = BardcheckError::lockfile_corrupt("unexpected token at line 3");
        assert!(err.to_string().contains("unexpected token at line 3"));
    }

    #[test]
    fn test_read_error() {
        let err = BardcheckError::read_error(
            "/path/to/package.json",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("/path/to/package.json"));
        assert!(err.to_string().contains("read"));
    }

    #[test]
    fn test_config_conflict_message() {
        let err = BardcheckError::ConfigConflict("--offline false under strict privacy".into());
        assert!(err.to_string().contains("strict privacy"));
    }

    #[test]
    fn test_all_errors_exit_two() {
        assert_eq!(BardcheckError::NoLockfile.exit_code(), 2);
        assert_eq!(BardcheckError::ConfigConflict("x".into()).exit_code(), 2);
        assert_eq!(BardcheckError::lockfile_corrupt("bad yaml").exit_code(), 2);
    }
}
