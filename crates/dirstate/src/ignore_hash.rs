//! Ignore-pattern hash (§4.4): an incremental SHA-1 digest over the sorted,
//! recursively expanded contents of the root ignore files.
//!
//! Parsing an ignore file's syntax — in particular, recognising which lines
//! name an included file — is an external collaborator's concern. This
//! module only computes the digest once the include structure is already
//! known, via [`FileIgnoreSource`]'s own `includes` field.

use std::fs;
use std::path::PathBuf;

use checksums::strong::Sha1;
use logging::{debug_log, DebugFlag};

use crate::error::DirstateError;

/// Width of the digest stored in tree metadata.
pub const IGNORE_HASH_LEN: usize = 20;

/// All-zero hash, meaning "no ignore-pattern hash recorded".
pub const ABSENT: [u8; IGNORE_HASH_LEN] = [0u8; IGNORE_HASH_LEN];

/// A root (or included) ignore file plus the files it includes, in include
/// order.
///
/// The "expanded contents" of a source is its own bytes followed by the
/// expanded contents of each entry in `includes`, recursively.
#[derive(Debug, Clone)]
pub struct FileIgnoreSource {
    /// Path of this ignore file, used both to read its contents and (for
    /// root-level sources) to determine sort order among root files.
    pub path: PathBuf,
    /// Files this one includes, in the order they are referenced.
    pub includes: Vec<FileIgnoreSource>,
}

impl FileIgnoreSource {
    /// Creates a leaf source with no includes.
    #[must_use]
    pub fn leaf(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            includes: Vec::new(),
        }
    }

    fn write_expanded(&self, hasher: &mut Sha1) -> Result<(), DirstateError> {
        let bytes = fs::read(&self.path).map_err(|source| {
            DirstateError::Io(fast_io::FastIoError::Io {
                path: self.path.clone(),
                source,
            })
        })?;
        hasher.update(&bytes);
        for include in &self.includes {
            include.write_expanded(hasher)?;
        }
        Ok(())
    }
}

/// Computes the ignore-pattern hash over `root_files`, sorted by path
/// string as the format requires.
///
/// Feeds the hasher the expanded contents of each file incrementally,
/// without materialising a combined buffer.
///
/// # Errors
///
/// Returns [`DirstateError::Io`] if any source file cannot be read.
pub fn compute(mut root_files: Vec<FileIgnoreSource>) -> Result<[u8; IGNORE_HASH_LEN], DirstateError> {
    root_files.sort_by(|a, b| a.path.to_string_lossy().cmp(&b.path.to_string_lossy()));

    debug_log!(DebugFlag::Ignore, 1, "hashing {} root ignore file(s)", root_files.len());

    let mut hasher = Sha1::new();
    for file in &root_files {
        file.write_expanded(&mut hasher)?;
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_root_file_list_hashes_to_sha1_of_empty_input() {
        let digest = compute(Vec::new()).unwrap();
        assert_eq!(digest, Sha1::digest(b""));
    }

    #[test]
    fn compute_is_order_independent_in_root_file_argument_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.ignore");
        let b = dir.path().join("b.ignore");
        fs::write(&a, b"pattern-a\n").unwrap();
        fs::write(&b, b"pattern-b\n").unwrap();

        let forward = compute(vec![
            FileIgnoreSource::leaf(&a),
            FileIgnoreSource::leaf(&b),
        ])
        .unwrap();
        let reversed = compute(vec![
            FileIgnoreSource::leaf(&b),
            FileIgnoreSource::leaf(&a),
        ])
        .unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn includes_are_expanded_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("root.ignore");
        let included = dir.path().join("included.ignore");
        fs::write(&root, b"root-pattern\n").unwrap();
        fs::write(&included, b"included-pattern\n").unwrap();

        let source = FileIgnoreSource {
            path: root.clone(),
            includes: vec![FileIgnoreSource::leaf(&included)],
        };
        let digest = compute(vec![source]).unwrap();

        let mut expected_bytes = Vec::new();
        expected_bytes.write_all(b"root-pattern\n").unwrap();
        expected_bytes.write_all(b"included-pattern\n").unwrap();
        assert_eq!(digest, Sha1::digest(&expected_bytes));
    }

    #[test]
    fn missing_file_surfaces_as_io_error() {
        let result = compute(vec![FileIgnoreSource::leaf("/nonexistent/path/to/ignore")]);
        assert!(matches!(result, Err(DirstateError::Io(_))));
    }
}
