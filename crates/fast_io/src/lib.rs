#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fast_io` provides the two I/O primitives the dirstate-v2 core needs and
//! nothing else: a read-only memory mapping of an append-only data file, and
//! an append/fsync/atomic-rename writer used to publish new generations.
//!
//! # Design
//!
//! - [`MappedFile`] memory-maps a file for the lifetime of the mapping. Pages
//!   a reader has already observed never change, because the dirstate data
//!   file is append-only within a generation (§5 of the design).
//! - [`AppendWriter`] appends bytes to the tail of a file and exposes
//!   `fsync`, matching the commit algorithm's requirement to durably persist
//!   the data file before the docket is rewritten.
//! - [`atomic_write`] writes a whole-file replacement (the docket) via a
//!   temp-file-plus-rename so no reader ever observes a torn file.
//!
//! # Errors
//!
//! All fallible operations return [`FastIoError`], which wraps the
//! underlying [`std::io::Error`] with the path involved.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use logging::{debug_log, DebugFlag};
use thiserror::Error;

/// Durably flushes `file`'s data to disk, backed by `fdatasync` on unix
/// (via `rustix`, which skips the inode-metadata sync `File::sync_data`
/// cannot itself avoid on every platform) and `File::sync_data` elsewhere.
#[cfg(unix)]
fn fdatasync(file: &File) -> io::Result<()> {
    rustix::fs::fdatasync(file).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn fdatasync(file: &File) -> io::Result<()> {
    file.sync_data()
}

/// Errors surfaced by this crate's file operations.
#[derive(Debug, Error)]
pub enum FastIoError {
    /// The underlying I/O operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path the operation was performed against.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl FastIoError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for this crate's operations.
pub type FastIoResult<T> = Result<T, FastIoError>;

/// A read-only memory mapping of a file.
///
/// The mapping is taken once, at open time, and is never remapped. Bytes
/// appended to the file after the mapping was created are simply not part of
/// the mapped slice; the caller is expected to bound all reads by the
/// `used_size` recorded in the docket rather than by `len()`.
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    // `None` when the file was empty: `memmap2::Mmap::map` rejects zero-length
    // mappings, and an empty dirstate data file is a legal starting state.
    mmap: Option<memmap2::Mmap>,
    len: usize,
}

impl MappedFile {
    /// Opens `path` and maps it read-only.
    pub fn open(path: impl AsRef<Path>) -> FastIoResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FastIoError::io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| FastIoError::io(path, e))?
            .len() as usize;

        let mmap = if len == 0 {
            None
        } else {
            // SAFETY: the mapping is read-only and this type never exposes a
            // mutable view; the caller is responsible for not truncating the
            // file out from under a live mapping, which the append-only
            // commit protocol guarantees it never does.
            Some(unsafe { memmap2::Mmap::map(&file) }.map_err(|e| FastIoError::io(path, e))?)
        };

        debug_log!(DebugFlag::Mmap, 1, "mapped {} ({} bytes)", path.display(), len);

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            len,
        })
    }

    /// Returns the full mapped byte slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }

    /// Returns the length of the mapped file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the mapped file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the path this mapping was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An append-only file writer with explicit `fsync` control.
///
/// Bytes already written before this writer was opened are untouched; new
/// writes always land at the current end of file.
pub struct AppendWriter {
    path: PathBuf,
    file: File,
}

impl AppendWriter {
    /// Opens `path` for appending, creating it if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> FastIoResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| FastIoError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Creates `path` fresh, truncating any existing contents.
    ///
    /// Used when the writer mints a new data-file generation (§4.5, "fresh"
    /// mode).
    pub fn create_new_generation(path: impl AsRef<Path>) -> FastIoResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| FastIoError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Appends `bytes` to the tail of the file.
    pub fn append(&mut self, bytes: &[u8]) -> FastIoResult<()> {
        self.file
            .write_all(bytes)
            .map_err(|e| FastIoError::io(&self.path, e))
    }

    /// Flushes and fsyncs the file, guaranteeing the appended bytes are
    /// durable before the caller rewrites the docket.
    pub fn fsync(&mut self) -> FastIoResult<()> {
        self.file
            .flush()
            .map_err(|e| FastIoError::io(&self.path, e))?;
        fdatasync(&self.file).map_err(|e| FastIoError::io(&self.path, e))?;
        debug_log!(DebugFlag::Mmap, 2, "fsynced {}", self.path.display());
        Ok(())
    }

    /// Returns the path this writer is appending to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Atomically replaces the contents of `path` with `bytes`.
///
/// Writes to a temp file in the same directory, fsyncs it, then renames it
/// over `path`. A reader that opens `path` either sees the old full contents
/// or the new full contents, never a partial write, regardless of when a
/// crash interrupts this function (aside from the rename itself, which the
/// filesystem guarantees is atomic on the same volume).
pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> FastIoResult<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{file_name}.tmp"));

    let mut tmp = File::create(&tmp_path).map_err(|e| FastIoError::io(&tmp_path, e))?;
    tmp.write_all(bytes)
        .map_err(|e| FastIoError::io(&tmp_path, e))?;
    tmp.sync_all().map_err(|e| FastIoError::io(&tmp_path, e))?;
    drop(tmp);

    fs::rename(&tmp_path, path).map_err(|e| FastIoError::io(path, e))?;

    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }

    Ok(())
}
