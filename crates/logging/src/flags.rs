//! Per-subsystem debug and info flag identities.

/// Debug categories for the dirstate-v2 core's internal subsystems.
///
/// Enabled via `--debug=FLAG[LEVEL]`-style tokens (e.g. `docket2`), one
/// category per subsystem rather than a single blanket verbosity knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugFlag {
    /// Docket parsing, validation, and rewriting.
    Docket,
    /// Node decoding and bounds checking.
    Node,
    /// Tree façade lookups and traversal.
    Tree,
    /// Mutable overlay insert/update/remove bookkeeping.
    Overlay,
    /// Writer commit (append/fresh) decisions.
    Writer,
    /// Status-driver mtime comparison and clean/modified classification.
    Status,
    /// Ignore-pattern hash computation.
    Ignore,
    /// Memory-mapped file lifecycle.
    Mmap,
}

impl DebugFlag {
    /// Parses the flag name portion of a `--debug`-style token (e.g. `docket`
    /// in `docket2`). Returns `None` for unrecognised names.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "docket" => Self::Docket,
            "node" => Self::Node,
            "tree" => Self::Tree,
            "overlay" => Self::Overlay,
            "writer" => Self::Writer,
            "status" => Self::Status,
            "ignore" => Self::Ignore,
            "mmap" => Self::Mmap,
            _ => return None,
        })
    }

    /// All known flags, in declaration order.
    #[must_use]
    pub const fn all() -> [Self; 8] {
        [
            Self::Docket,
            Self::Node,
            Self::Tree,
            Self::Overlay,
            Self::Writer,
            Self::Status,
            Self::Ignore,
            Self::Mmap,
        ]
    }
}

/// Info categories: coarser, user-facing diagnostics enabled at `-v` levels
/// rather than by explicit `--debug=FLAG` opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoFlag {
    /// A commit (append or fresh write) completed.
    Commit,
    /// A fresh-generation rewrite was triggered by the unreachable-bytes
    /// threshold.
    Rewrite,
    /// An mtime comparison was ambiguous and required a content read.
    Mtime,
    /// A `CorruptIndex` condition was encountered and handled.
    Corrupt,
    /// A directory's `readdir` was skipped via the clean-directory cache.
    Readdir,
    /// Aggregate tree-metadata counters after a commit.
    Stats,
    /// A status check was skipped because cached metadata was clean.
    Skip,
    /// The legacy (non-v2) dirstate format was detected.
    Legacy,
}

impl InfoFlag {
    /// Parses the flag name portion of an `--info`-style token.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "commit" => Self::Commit,
            "rewrite" => Self::Rewrite,
            "mtime" => Self::Mtime,
            "corrupt" => Self::Corrupt,
            "readdir" => Self::Readdir,
            "stats" => Self::Stats,
            "skip" => Self::Skip,
            "legacy" => Self::Legacy,
            _ => return None,
        })
    }

    /// All known flags, in declaration order.
    #[must_use]
    pub const fn all() -> [Self; 8] {
        [
            Self::Commit,
            Self::Rewrite,
            Self::Mtime,
            Self::Corrupt,
            Self::Readdir,
            Self::Stats,
            Self::Skip,
            Self::Legacy,
        ]
    }
}
