#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Shared fixtures for tests that need a scratch repository directory.
//!
//! Every crate in this workspace that touches the filesystem depends on
//! this crate under `[dev-dependencies]` rather than hand-rolling its own
//! `tempfile::TempDir` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use tempfile::TempDir;

/// A temporary directory laid out like a repository's metadata directory
/// (`.hg` in the on-disk layout this workspace targets), kept alive for the
/// lifetime of the value.
pub struct ScratchRepo {
    _dir: TempDir,
    meta_dir: PathBuf,
}

impl ScratchRepo {
    /// Creates a fresh scratch repository with an empty metadata directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created, which is only
    /// expected on a broken test environment.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir for scratch repository");
        let meta_dir = dir.path().join(".hg");
        fs::create_dir_all(&meta_dir).expect("failed to create metadata directory");
        Self {
            _dir: dir,
            meta_dir,
        }
    }

    /// Returns the path of the metadata directory (`.hg`).
    #[must_use]
    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }

    /// Returns the path of the docket file within the metadata directory.
    #[must_use]
    pub fn docket_path(&self) -> PathBuf {
        self.meta_dir.join("dirstate")
    }

    /// Returns the path of a data file named by `id` within the metadata
    /// directory.
    #[must_use]
    pub fn data_file_path(&self, id: &str) -> PathBuf {
        self.meta_dir.join(format!("dirstate.{id}"))
    }

    /// Writes `.hg/requires` with the `dirstate-v2` token present, as the
    /// on-disk layout requires for this format to be selected.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn mark_dirstate_v2(&self) {
        fs::write(self.meta_dir.join("requires"), "dirstate-v2\n")
            .expect("failed to write requires file");
    }

    /// Writes `.hg/requires` without the `dirstate-v2` token, simulating a
    /// repository still on the legacy flat-file format.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn mark_legacy_format(&self) {
        fs::write(self.meta_dir.join("requires"), "revlogv1\n")
            .expect("failed to write requires file");
    }
}

impl Default for ScratchRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a random hex-encoded data-file identifier of `byte_len` bytes
/// of underlying randomness, matching the identifier style the writer mints
/// for a fresh generation.
#[must_use]
pub fn random_hex_id(byte_len: usize) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..byte_len).map(|_| rng.gen::<u8>()).collect();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
