//! Status driver contract (§4.3): the interface by which a filesystem
//! walker consumes the tree and decides clean/modified/ambiguous, plus the
//! `readdir`-skip optimisation.

use bitflags::bitflags;
use logging::{debug_log, DebugFlag};

use crate::flags::NodeFlags;
use crate::node::{NodeData, NodeView};

/// Filesystem metadata observed for a single path during a status walk.
#[derive(Debug, Clone, Copy)]
pub struct ObservedStat {
    /// Observed file size.
    pub size: u32,
    /// Observed executable-permission bit.
    pub exec_perm: bool,
    /// Observed symlink-ness.
    pub is_symlink: bool,
    /// Observed mtime seconds component.
    pub mtime_seconds: u32,
    /// Observed mtime nanoseconds component, 0 if the platform/filesystem
    /// cannot report sub-second precision.
    pub mtime_nanoseconds: u32,
    /// Whether `mtime_nanoseconds` carries real sub-second precision (as
    /// opposed to being a reported-but-meaningless zero).
    pub has_subsecond_precision: bool,
}

/// Outcome of comparing a node's cached metadata against an [`ObservedStat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Cached metadata matches; the walker can skip reading file contents.
    Clean,
    /// Cached metadata matches, but the entry is cached as known-modified.
    Modified,
    /// Cached metadata is missing or does not match; contents must be read.
    Ambiguous,
}

/// Compares a stored mtime against an observed one under the comparison
/// rule (§4.3): equal when seconds match and either side lacks sub-second
/// precision, or nanoseconds match exactly. A `MTIME_SECOND_AMBIGUOUS`
/// stored mtime only compares against an observation that itself carries
/// sub-second precision.
#[must_use]
pub fn mtimes_equal(
    stored_seconds: u32,
    stored_nanoseconds: u32,
    stored_second_ambiguous: bool,
    observed: &ObservedStat,
) -> bool {
    if stored_second_ambiguous && !observed.has_subsecond_precision {
        return false;
    }
    if stored_seconds != observed.mtime_seconds {
        return false;
    }
    stored_nanoseconds == 0 || observed.mtime_nanoseconds == 0 || stored_nanoseconds == observed.mtime_nanoseconds
}

/// Returns `true` when an mtime observed at `observed_seconds` may be
/// stored with `HAS_MTIME` set, per the storage rule (§4.3): only when it
/// was observed strictly in the past relative to the writer's wall clock.
#[must_use]
pub fn mtime_storable(observed_seconds: u32, writer_wall_clock_seconds: u32) -> bool {
    observed_seconds < writer_wall_clock_seconds
}

/// Classifies `node` against `observed` per the status protocol.
#[must_use]
pub fn classify(node: &NodeView<'_>, observed: &ObservedStat) -> EntryStatus {
    let flags = node.flags();
    if !flags.contains(NodeFlags::HAS_MODE_AND_SIZE) || !flags.contains(NodeFlags::HAS_MTIME) {
        debug_log!(DebugFlag::Status, 2, "no cached mode/size/mtime for {:?}", node.full_path());
        return EntryStatus::Ambiguous;
    }

    let Some((stored_seconds, stored_nanoseconds)) = node.mtime() else {
        debug_log!(DebugFlag::Status, 2, "HAS_MTIME set but mtime fields absent for {:?}", node.full_path());
        return EntryStatus::Ambiguous;
    };

    let size_matches = node.size() == observed.size;
    let exec_matches = flags.contains(NodeFlags::MODE_EXEC_PERM) == observed.exec_perm;
    let symlink_matches = flags.contains(NodeFlags::MODE_IS_SYMLINK) == observed.is_symlink;
    let mtime_matches = mtimes_equal(
        stored_seconds,
        stored_nanoseconds,
        flags.contains(NodeFlags::MTIME_SECOND_AMBIGUOUS),
        observed,
    );

    if size_matches && exec_matches && symlink_matches && mtime_matches {
        if flags.contains(NodeFlags::EXPECTED_STATE_IS_MODIFIED) {
            EntryStatus::Modified
        } else {
            EntryStatus::Clean
        }
    } else {
        EntryStatus::Ambiguous
    }
}

bitflags! {
    /// Which default-status views a caller is asking the walker to cover,
    /// used to decide whether the `readdir`-skip optimisation applies.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusView: u8 {
        /// The caller wants untracked ("unknown") files reported.
        const UNKNOWNS = 1 << 0;
        /// The caller wants ignored files reported.
        const IGNORED = 1 << 1;
    }
}

/// Returns `true` when the walker may skip `readdir` for `node` and iterate
/// its stored children instead, given the caller's requested `view` and
/// whether the current ignore-pattern hash matches the one recorded when
/// the node's cached state was last validated.
#[must_use]
pub fn can_skip_readdir(node: &NodeView<'_>, view: StatusView, ignore_hash_matches: bool) -> bool {
    let flags = node.flags();
    if !flags.contains(NodeFlags::DIRECTORY) || !flags.contains(NodeFlags::HAS_MTIME) {
        return false;
    }
    if !ignore_hash_matches {
        return false;
    }
    if view.contains(StatusView::UNKNOWNS) && !flags.contains(NodeFlags::ALL_UNKNOWN_RECORDED) {
        return false;
    }
    if view.contains(StatusView::IGNORED) && !flags.contains(NodeFlags::ALL_IGNORED_RECORDED) {
        return false;
    }
    true
}

/// A status walker's decision for a path after completing its observation,
/// ready to be written back into the overlay.
///
/// Carries only what the walker decided; the mtime storage rule
/// (§4.3) and the choice of whether to cache `EXPECTED_STATE_IS_MODIFIED`
/// are both the walker's responsibility, not this crate's — it only
/// encodes the decision faithfully.
#[derive(Debug, Clone, Copy)]
pub struct StatusObservation {
    /// Observed size.
    pub size: u32,
    /// Observed executable-permission bit.
    pub exec_perm: bool,
    /// Observed symlink-ness.
    pub is_symlink: bool,
    /// Mtime to store, if the storage rule allows it.
    pub storable_mtime: Option<(u32, u32)>,
    /// Whether the stored mtime should carry `MTIME_SECOND_AMBIGUOUS`.
    pub second_ambiguous: bool,
    /// Whether the walker determined (by reading contents) that this entry
    /// is modified relative to what was previously recorded, worth caching
    /// via `EXPECTED_STATE_IS_MODIFIED` so a future run can skip the read.
    pub content_modified: bool,
}

impl StatusObservation {
    /// Builds the [`NodeData`] to write back into the overlay for a tracked
    /// entry, combining this observation with the tracked-anywhere flags
    /// and copy source that are not this type's concern.
    #[must_use]
    pub fn into_node_data(self, tracked_flags: NodeFlags, copy_source: Option<Vec<u8>>) -> NodeData {
        let mut flags = tracked_flags | NodeFlags::HAS_MODE_AND_SIZE;
        flags.set(NodeFlags::MODE_EXEC_PERM, self.exec_perm);
        flags.set(NodeFlags::MODE_IS_SYMLINK, self.is_symlink);
        flags.set(NodeFlags::HAS_MTIME, self.storable_mtime.is_some());
        flags.set(
            NodeFlags::MTIME_SECOND_AMBIGUOUS,
            self.storable_mtime.is_some() && self.second_ambiguous,
        );
        flags.set(NodeFlags::EXPECTED_STATE_IS_MODIFIED, self.content_modified);

        NodeData {
            copy_source,
            flags,
            size: self.size,
            mtime: self.storable_mtime,
        }
    }
}
