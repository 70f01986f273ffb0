//! Node flag bitset (§3): 16 bits, the rest reserved-zero.

use bitflags::bitflags;

bitflags! {
    /// Per-node flag bitset, stored as the 16-bit `flags` field of a node
    /// record.
    ///
    /// Bit order matches the on-disk least-significant-first layout; unknown
    /// bits beyond the 16 documented ones are preserved on read and cleared
    /// on the next write of the owning record (§9, forward-compat note).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u16 {
        /// Present in the working directory.
        const WDIR_TRACKED = 1 << 0;
        /// Present in the first parent changeset.
        const P1_TRACKED = 1 << 1;
        /// Involved in a merge with the second parent.
        const P2_INFO = 1 << 2;
        /// Cached mode bit: executable permission set.
        const MODE_EXEC_PERM = 1 << 3;
        /// Cached mode bit: is a symlink.
        const MODE_IS_SYMLINK = 1 << 4;
        /// A fallback executable bit is recorded (platform cannot store exec bit).
        const HAS_FALLBACK_EXEC = 1 << 5;
        /// The fallback executable bit's value, meaningful only with `HAS_FALLBACK_EXEC`.
        const FALLBACK_EXEC = 1 << 6;
        /// A fallback symlink bit is recorded (platform cannot store symlinks).
        const HAS_FALLBACK_SYMLINK = 1 << 7;
        /// The fallback symlink bit's value, meaningful only with `HAS_FALLBACK_SYMLINK`.
        const FALLBACK_SYMLINK = 1 << 8;
        /// Cached result: the entry's content is known to differ from what is recorded.
        const EXPECTED_STATE_IS_MODIFIED = 1 << 9;
        /// `size` and the mode bits are meaningful.
        const HAS_MODE_AND_SIZE = 1 << 10;
        /// `mtime_seconds`/`mtime_nanoseconds` are meaningful.
        const HAS_MTIME = 1 << 11;
        /// The stored mtime's seconds component is ambiguous without sub-second precision.
        const MTIME_SECOND_AMBIGUOUS = 1 << 12;
        /// This node represents a directory.
        const DIRECTORY = 1 << 13;
        /// All unknown files under this directory are recorded (readdir-skip eligible).
        const ALL_UNKNOWN_RECORDED = 1 << 14;
        /// All ignored files under this directory are recorded (readdir-skip eligible).
        const ALL_IGNORED_RECORDED = 1 << 15;
    }
}

impl NodeFlags {
    /// The three flags that make a node "tracked anywhere" per the glossary.
    pub const TRACKED_ANYWHERE: Self =
        Self::WDIR_TRACKED.union(Self::P1_TRACKED).union(Self::P2_INFO);

    /// Returns `true` if any of `WDIR_TRACKED`, `P1_TRACKED`, `P2_INFO` is set.
    #[must_use]
    pub fn is_tracked_anywhere(self) -> bool {
        self.intersects(Self::TRACKED_ANYWHERE)
    }
}
