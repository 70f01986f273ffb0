//! Error taxonomy for docket/data-file parsing, validation, and commit.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by this crate's public entry points.
///
/// The propagation policy (§7 of the design this crate implements): the
/// parse-error variants are fatal for the dirstate instance — callers
/// should rebuild by rescanning the working directory rather than attempt
/// partial recovery. [`DirstateError::UnknownIdentifier`] is equivalent.
/// [`DirstateError::Io`] is propagated unchanged.
#[derive(Debug, Error)]
pub enum DirstateError {
    /// The docket's 12-byte magic literal did not match.
    #[error("invalid dirstate-v2 docket magic")]
    InvalidMagic,

    /// The docket file was smaller than the fixed 125-byte minimum.
    #[error("docket is only {actual} bytes, need at least 125")]
    ShortDocket {
        /// Actual byte length of the docket file.
        actual: usize,
    },

    /// A node, tree-metadata, or ordering invariant was violated.
    #[error("corrupt index: {detail} (field {field}, offset {offset})")]
    CorruptIndex {
        /// Name of the field or invariant that failed.
        field: &'static str,
        /// Byte offset at which the violation was detected.
        offset: u32,
        /// Human-readable detail for logging before a resync.
        detail: String,
    },

    /// The docket names a data file that does not exist on disk.
    #[error("data file {path} named by docket does not exist")]
    UnknownIdentifier {
        /// Path of the missing data file.
        path: PathBuf,
    },

    /// An underlying filesystem operation failed.
    #[error(transparent)]
    Io(#[from] fast_io::FastIoError),
}

impl DirstateError {
    /// Builds a [`DirstateError::CorruptIndex`] with the given context.
    pub(crate) fn corrupt(field: &'static str, offset: u32, detail: impl Into<String>) -> Self {
        Self::CorruptIndex {
            field,
            offset,
            detail: detail.into(),
        }
    }
}

/// Result alias used throughout this crate's fallible entry points.
pub type Result<T> = std::result::Result<T, DirstateError>;
