//! Docket manager (§4.7): loads/validates the docket, resolves the data
//! file by identifier, and drives the writer to publish new generations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use logging::{debug_log, info_log, DebugFlag, InfoFlag};
use rand::Rng;

use crate::docket::{Docket, TreeMetadata};
use crate::error::DirstateError;
use crate::overlay::Overlay;
use crate::tree::Tree;
use crate::writer::{self, CommitMode};

const REQUIRES_TOKEN: &str = "dirstate-v2";
const DOCKET_FILE_NAME: &str = "dirstate";
const REQUIRES_FILE_NAME: &str = "requires";

/// Default fraction of `used_size` that `unreachable_bytes` must exceed
/// before [`DocketManager::recommended_mode`] suggests a fresh rewrite.
const DEFAULT_REWRITE_THRESHOLD: f64 = 0.5;

/// Default number of random bytes used to mint a fresh data-file identifier,
/// hex-encoded to twice that many ASCII bytes.
const DEFAULT_ID_BYTE_LEN: usize = 16;

/// Configuration for [`DocketManager::open`].
///
/// Built via `with_*` setters and validated at `build()`, matching the
/// workspace's usual small-config-struct pattern.
#[derive(Debug, Clone, Copy)]
pub struct DocketManagerConfig {
    rewrite_threshold: f64,
    id_byte_len: usize,
}

impl DocketManagerConfig {
    /// Starts a config at the defaults (50% rewrite threshold, 16-byte
    /// random identifiers).
    #[must_use]
    pub fn new() -> Self {
        Self {
            rewrite_threshold: DEFAULT_REWRITE_THRESHOLD,
            id_byte_len: DEFAULT_ID_BYTE_LEN,
        }
    }

    /// Sets the `unreachable_bytes / used_size` fraction above which a
    /// fresh rewrite is recommended.
    #[must_use]
    pub fn with_rewrite_threshold(mut self, threshold: f64) -> Self {
        self.rewrite_threshold = threshold;
        self
    }

    /// Sets the number of random bytes used to mint a fresh data-file
    /// identifier.
    #[must_use]
    pub fn with_id_byte_len(mut self, id_byte_len: usize) -> Self {
        self.id_byte_len = id_byte_len;
        self
    }

    /// Validates and returns the config.
    ///
    /// # Panics
    ///
    /// Panics if `rewrite_threshold` is not in `(0.0, 1.0]` or
    /// `id_byte_len` is 0.
    #[must_use]
    pub fn build(self) -> Self {
        assert!(
            self.rewrite_threshold > 0.0 && self.rewrite_threshold <= 1.0,
            "rewrite threshold must be in (0.0, 1.0]"
        );
        assert!(self.id_byte_len > 0, "id_byte_len must be non-zero");
        self
    }
}

impl Default for DocketManagerConfig {
    fn default() -> Self {
        Self::new().build()
    }
}

/// Marker returned by [`DocketManager::open`] when the repository's
/// `requires` file does not name the `dirstate-v2` token: the legacy
/// flat-file format applies and is out of this crate's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyFormat;

/// Result of [`DocketManager::open`].
#[derive(Debug)]
pub enum OpenOutcome {
    /// The repository selects dirstate-v2; the manager is ready to use.
    V2(DocketManager),
    /// The repository is on the legacy format.
    Legacy(LegacyFormat),
}

fn io_error(path: &Path, source: io::Error) -> DirstateError {
    DirstateError::Io(fast_io::FastIoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn random_hex_id(byte_len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..byte_len)
        .flat_map(|_| {
            let byte: u8 = rng.gen();
            format!("{byte:02x}").into_bytes()
        })
        .collect()
}

fn data_file_name(id: &[u8]) -> String {
    format!("dirstate.{}", String::from_utf8_lossy(id))
}

/// Owns the mapped current-generation data file and the decoded docket,
/// and drives commits through the writer.
#[derive(Debug)]
pub struct DocketManager {
    meta_dir: PathBuf,
    config: DocketManagerConfig,
    docket: Docket,
    mapped: fast_io::MappedFile,
}

impl DocketManager {
    /// Opens the dirstate at `meta_dir` (a repository's metadata directory,
    /// e.g. `.hg`), dispatching on the `requires` token.
    ///
    /// # Errors
    ///
    /// Returns [`DirstateError::Io`] on filesystem failure, or any docket
    /// parse error from [`Docket::decode`].
    pub fn open(meta_dir: impl AsRef<Path>, config: DocketManagerConfig) -> Result<OpenOutcome, DirstateError> {
        let meta_dir = meta_dir.as_ref();
        let requires_path = meta_dir.join(REQUIRES_FILE_NAME);

        let uses_v2 = match fs::read_to_string(&requires_path) {
            Ok(contents) => contents.lines().any(|line| line.trim() == REQUIRES_TOKEN),
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(io_error(&requires_path, e)),
        };

        if !uses_v2 {
            info_log!(InfoFlag::Legacy, 1, "{} lacks the dirstate-v2 token", requires_path.display());
            return Ok(OpenOutcome::Legacy(LegacyFormat));
        }

        Self::load(meta_dir, config).map(OpenOutcome::V2)
    }

    fn load(meta_dir: &Path, config: DocketManagerConfig) -> Result<Self, DirstateError> {
        let docket_path = meta_dir.join(DOCKET_FILE_NAME);
        let docket_bytes = fs::read(&docket_path).map_err(|e| io_error(&docket_path, e))?;
        let docket = Docket::decode(&docket_bytes)?;
        debug_log!(
            DebugFlag::Docket,
            1,
            "loaded docket at {}: used_size={} id={}",
            docket_path.display(),
            docket.used_size,
            String::from_utf8_lossy(&docket.id)
        );

        let data_path = meta_dir.join(data_file_name(&docket.id));
        if !data_path.is_file() {
            return Err(DirstateError::UnknownIdentifier { path: data_path });
        }

        let mapped = fast_io::MappedFile::open(&data_path)?;
        if docket.used_size as usize > mapped.len() {
            return Err(DirstateError::corrupt(
                "used_size",
                0,
                "used_size exceeds the mapped data file's length",
            ));
        }

        Ok(Self {
            meta_dir: meta_dir.to_path_buf(),
            config,
            docket,
            mapped,
        })
    }

    fn docket_path(&self) -> PathBuf {
        self.meta_dir.join(DOCKET_FILE_NAME)
    }

    fn data_path(&self) -> PathBuf {
        self.meta_dir.join(data_file_name(&self.docket.id))
    }

    /// Returns the slice of the mapped data file that belongs to the
    /// current generation, excluding any in-flight trailing append.
    fn bounded_slice(&self) -> &[u8] {
        &self.mapped.as_slice()[..self.docket.used_size as usize]
    }

    /// Hands out a read-only tree view over the current generation.
    #[must_use]
    pub fn tree(&self) -> Tree<'_> {
        Tree::new(
            self.bounded_slice(),
            self.docket.tree.root_ptr,
            self.docket.tree.root_count,
        )
    }

    /// Creates an empty overlay ready to accumulate pending changes against
    /// this manager's tree.
    #[must_use]
    pub fn overlay(&self) -> Overlay {
        Overlay::new()
    }

    /// Current ignore-pattern hash, or the all-zero sentinel if absent.
    #[must_use]
    pub fn ignore_hash(&self) -> [u8; crate::ignore_hash::IGNORE_HASH_LEN] {
        self.docket.ignore_hash
    }

    /// Records a freshly computed ignore-pattern hash, taking effect on the
    /// next commit.
    pub fn set_ignore_hash(&mut self, hash: [u8; crate::ignore_hash::IGNORE_HASH_LEN]) {
        self.docket.ignore_hash = hash;
    }

    /// Implements the rewrite-threshold policy (§4.5): recommends
    /// [`CommitMode::Fresh`] once `unreachable_bytes / used_size` exceeds
    /// the configured threshold, [`CommitMode::Append`] otherwise.
    #[must_use]
    pub fn recommended_mode(&self) -> CommitMode {
        if self.docket.used_size == 0 {
            return CommitMode::Append;
        }
        let ratio = f64::from(self.docket.tree.unreachable_bytes) / f64::from(self.docket.used_size);
        if ratio > self.config.rewrite_threshold {
            info_log!(
                InfoFlag::Rewrite,
                1,
                "unreachable_bytes/used_size={:.2} exceeds threshold {:.2}",
                ratio,
                self.config.rewrite_threshold
            );
            CommitMode::Fresh
        } else {
            CommitMode::Append
        }
    }

    /// Merges `overlay` against the current tree and publishes the result:
    /// writes the new data-file bytes (appending, or starting a fresh
    /// generation under a new random identifier per `mode`), fsyncs them,
    /// then atomically rewrites the docket with the new parents and tree
    /// metadata.
    ///
    /// # Errors
    ///
    /// Returns [`DirstateError::CorruptIndex`] if decoding the base tree
    /// fails, or [`DirstateError::Io`] on filesystem failure.
    pub fn commit(
        &mut self,
        overlay: &Overlay,
        mode: CommitMode,
        parent1: [u8; 32],
        parent2: [u8; 32],
    ) -> Result<(), DirstateError> {
        let result = {
            let base = self.tree();
            writer::commit(
                &base,
                overlay,
                mode,
                self.docket.used_size,
                self.docket.tree.unreachable_bytes,
            )?
        };

        let (data_path, new_id) = match mode {
            CommitMode::Append => (self.data_path(), self.docket.id.clone()),
            CommitMode::Fresh => {
                let id = random_hex_id(self.config.id_byte_len);
                (self.meta_dir.join(data_file_name(&id)), id)
            }
        };

        if !result.data.is_empty() || mode == CommitMode::Fresh {
            let mut data_writer = match mode {
                CommitMode::Append => fast_io::AppendWriter::open(&data_path)?,
                CommitMode::Fresh => fast_io::AppendWriter::create_new_generation(&data_path)?,
            };
            data_writer.append(&result.data)?;
            data_writer.fsync()?;
        }

        let new_docket = Docket {
            parent1,
            parent2,
            tree: TreeMetadata {
                root_ptr: result.root_ptr,
                root_count: result.root_count,
                dirstate_entry_count: result.dirstate_entry_count,
                copy_source_count: result.copy_source_count,
                unreachable_bytes: result.unreachable_bytes,
            },
            ignore_hash: self.docket.ignore_hash,
            used_size: result.used_size,
            id: new_id,
        };

        fast_io::atomic_write(self.docket_path(), &new_docket.encode())?;

        self.mapped = fast_io::MappedFile::open(&data_path)?;
        info_log!(
            InfoFlag::Commit,
            1,
            "committed generation id={} mode={:?} used_size={} unreachable_bytes={}",
            String::from_utf8_lossy(&new_docket.id),
            mode,
            new_docket.used_size,
            new_docket.tree.unreachable_bytes
        );
        self.docket = new_docket;
        Ok(())
    }
}
