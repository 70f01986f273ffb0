//! Mutable overlay (§4.7): an in-memory shadow recording insertions,
//! updates, and removals since load.
//!
//! Represented as a sorted map keyed by full path from `Vec<u8>` to one of
//! [`OverlayOp::Insert`], [`OverlayOp::Update`], or [`OverlayOp::Remove`].
//! The writer merges this map against the base tree in one pass; there is
//! no separate dirty-subtree marker because every commit in this crate
//! re-walks the whole merged tree (see `writer` module docs for why that
//! trade-off is acceptable here).

use std::collections::BTreeMap;

use logging::{debug_log, DebugFlag};

use crate::node::NodeData;

/// A single pending change recorded against a path.
#[derive(Debug, Clone)]
pub enum OverlayOp {
    /// The path did not exist in the base tree and should be created.
    Insert(NodeData),
    /// The path existed in the base tree and its fields should be replaced.
    Update(NodeData),
    /// The path (and everything beneath it) should be removed.
    Remove,
}

/// The mutable overlay: a sorted map of pending changes, keyed by full path.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    ops: BTreeMap<Vec<u8>, OverlayOp>,
}

impl Overlay {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no changes are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of pending changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Records an insertion of a path that is assumed not to already exist
    /// in the base tree.
    pub fn insert(&mut self, path: Vec<u8>, data: NodeData) {
        debug_log!(DebugFlag::Overlay, 3, "insert {:?}", String::from_utf8_lossy(&path));
        self.ops.insert(path, OverlayOp::Insert(data));
    }

    /// Records an update of a path that is assumed to already exist in the
    /// base tree (or to have a pending insert/update in this overlay).
    pub fn update(&mut self, path: Vec<u8>, data: NodeData) {
        debug_log!(DebugFlag::Overlay, 3, "update {:?}", String::from_utf8_lossy(&path));
        self.ops.insert(path, OverlayOp::Update(data));
    }

    /// Records removal of `path` and everything beneath it.
    pub fn remove(&mut self, path: Vec<u8>) {
        debug_log!(DebugFlag::Overlay, 3, "remove {:?}", String::from_utf8_lossy(&path));
        self.ops.insert(path, OverlayOp::Remove);
    }

    /// Returns the pending operation for `path`, if any.
    #[must_use]
    pub fn get(&self, path: &[u8]) -> Option<&OverlayOp> {
        self.ops.get(path)
    }

    /// Iterates pending operations in ascending path order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &OverlayOp)> {
        self.ops.iter().map(|(k, v)| (k.as_slice(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::NodeFlags;

    #[test]
    fn insert_then_get_returns_inserted_value() {
        let mut overlay = Overlay::new();
        overlay.insert(
            b"foo".to_vec(),
            NodeData {
                flags: NodeFlags::WDIR_TRACKED,
                ..Default::default()
            },
        );
        assert!(matches!(overlay.get(b"foo"), Some(OverlayOp::Insert(_))));
    }

    #[test]
    fn later_op_on_same_path_replaces_earlier_one() {
        let mut overlay = Overlay::new();
        overlay.insert(b"foo".to_vec(), NodeData::default());
        overlay.remove(b"foo".to_vec());
        assert!(matches!(overlay.get(b"foo"), Some(OverlayOp::Remove)));
        assert_eq!(overlay.len(), 1);
    }

    #[test]
    fn iter_visits_paths_in_sorted_order() {
        let mut overlay = Overlay::new();
        overlay.insert(b"b".to_vec(), NodeData::default());
        overlay.insert(b"a".to_vec(), NodeData::default());
        let paths: Vec<_> = overlay.iter().map(|(p, _)| p.to_vec()).collect();
        assert_eq!(paths, vec![b"a".to_vec(), b"b".to_vec()]);
    }
}
