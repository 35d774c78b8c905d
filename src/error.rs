//! Error taxonomy: stream failures, disk failures, and interrupt reasons.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure injected by the byte stream source (network origin).
///
/// Never retried here; the writer maps it to an interruption and stops.
/// Stall detection is the source's policy, not the writer's.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// Transport-level failure reported by the transfer layer.
    #[error("network stream failed: {0}")]
    Network(String),
    /// The source saw no data past its stall threshold.
    #[error("network stream stalled")]
    Stalled,
}

/// Disk-side failure: open, write, flush, or rename.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("disk full or quota exceeded at {path}")]
    Full {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("access denied at {path}")]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid target path {path}")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("target already exists: {path}")]
    TargetExists { path: PathBuf },
    #[error("writing to {path} would exceed the {limit}-byte cap")]
    TooLarge { path: PathBuf, limit: u64 },
    #[error("on-disk prefix does not match the resume digest for {path}")]
    PrefixMismatch { path: PathBuf },
    #[error("i/o failure at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DiskError {
    /// Interrupt category reported to the observer for this failure.
    pub fn reason(&self) -> InterruptReason {
        match self {
            DiskError::Full { .. } => InterruptReason::DiskFull,
            DiskError::AccessDenied { .. } => InterruptReason::AccessDenied,
            DiskError::TooLarge { .. } => InterruptReason::FileTooLarge,
            DiskError::TargetExists { .. } | DiskError::PrefixMismatch { .. } => {
                InterruptReason::TargetChanged
            }
            DiskError::InvalidPath { .. } | DiskError::Io { .. } => InterruptReason::DiskFailed,
        }
    }
}

/// Classify an i/o failure at `path` into a `DiskError` variant.
pub fn classify_io(path: &Path, source: io::Error) -> DiskError {
    let path = path.to_path_buf();
    match source.kind() {
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => {
            DiskError::Full { path, source }
        }
        io::ErrorKind::PermissionDenied => DiskError::AccessDenied { path, source },
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
            DiskError::InvalidPath { path, source }
        }
        io::ErrorKind::AlreadyExists => DiskError::TargetExists { path },
        _ => DiskError::Io { path, source },
    }
}

/// Why a download attempt ended without completing.
///
/// Closed tagged set: adding a new cause is a variant addition. Cancel is a
/// normal terminal path, not a failure, but shares this set so the observer
/// sees one reason type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    /// The byte stream source failed or stalled.
    Network,
    /// No space or quota left on the target filesystem.
    DiskFull,
    /// The target path is not writable.
    AccessDenied,
    /// The configured byte cap was hit.
    FileTooLarge,
    /// The target or the resumed prefix is not what the caller expected.
    TargetChanged,
    /// Cancel was requested through the download handle.
    UserCancelled,
    /// Any other disk failure (invalid path, generic i/o).
    DiskFailed,
}

impl InterruptReason {
    /// True for reasons originating on the disk side.
    pub fn is_disk(&self) -> bool {
        !matches!(self, InterruptReason::Network | InterruptReason::UserCancelled)
    }
}

impl std::fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterruptReason::Network => write!(f, "network error"),
            InterruptReason::DiskFull => write!(f, "disk full"),
            InterruptReason::AccessDenied => write!(f, "access denied"),
            InterruptReason::FileTooLarge => write!(f, "file too large"),
            InterruptReason::TargetChanged => write!(f, "target changed"),
            InterruptReason::UserCancelled => write!(f, "cancelled by user"),
            InterruptReason::DiskFailed => write!(f, "disk failure"),
        }
    }
}
