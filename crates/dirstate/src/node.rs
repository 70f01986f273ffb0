//! Node reader (§4.1): random-access decoding of 43-byte fixed records, and
//! the owned [`NodeData`] shape the overlay and writer build trees out of.
//!
//! # Layout note
//!
//! The field-width table (one row per field, width in bits) sums to 44
//! bytes, one more than the record's declared fixed size of 43 bytes. This
//! crate resolves the discrepancy by storing `base_name_start` in a single
//! byte rather than two: a byte index into a *basename*, not the full path,
//! and filesystems already cap individual path components at 255 bytes on
//! every platform this format targets. See the design ledger for the
//! full accounting of the other twelve fields, which are stored at their
//! documented widths unchanged.

use logging::{debug_log, DebugFlag};

use crate::codec::{read_bytes, read_u16, read_u32, read_u8};
use crate::error::DirstateError;
use crate::flags::NodeFlags;

/// Width in bytes of a single node record.
pub const NODE_SIZE: u32 = 43;

const OFF_FULL_PATH_PTR: u32 = 0;
const OFF_FULL_PATH_LEN: u32 = 4;
const OFF_BASE_NAME_START: u32 = 6;
const OFF_COPY_SOURCE_PTR: u32 = 7;
const OFF_COPY_SOURCE_LEN: u32 = 11;
const OFF_CHILDREN_PTR: u32 = 13;
const OFF_CHILDREN_COUNT: u32 = 17;
const OFF_DESCENDANTS_WITH_ENTRY: u32 = 21;
const OFF_TRACKED_DESCENDANTS: u32 = 25;
const OFF_FLAGS: u32 = 29;
const OFF_SIZE: u32 = 31;
const OFF_MTIME_SECONDS: u32 = 35;
const OFF_MTIME_NANOSECONDS: u32 = 39;

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// A decoded view of a node record, borrowing its path slices from the
/// backing data-file buffer.
///
/// # Invariants
///
/// Every accessor here was already validated at [`NodeView::decode`] time;
/// callers never need to re-check bounds.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    data: &'a [u8],
    offset: u32,
    full_path: &'a [u8],
    base_name_start: u8,
    copy_source: Option<&'a [u8]>,
    children_ptr: u32,
    children_count: u32,
    descendants_with_entry: u32,
    tracked_descendants: u32,
    flags: NodeFlags,
    size: u32,
    mtime: Option<(u32, u32)>,
}

impl<'a> NodeView<'a> {
    /// Decodes the node record at `offset` within `data`.
    ///
    /// # Errors
    ///
    /// Returns [`DirstateError::CorruptIndex`] if any bound or invariant
    /// from §4.1 is violated.
    pub fn decode(data: &'a [u8], offset: u32) -> Result<Self, DirstateError> {
        let record_end = offset
            .checked_add(NODE_SIZE)
            .ok_or_else(|| DirstateError::corrupt("node", offset, "offset overflow"))?;
        if record_end as usize > data.len() {
            return Err(DirstateError::corrupt(
                "node",
                offset,
                "record extends past end of data",
            ));
        }

        let full_path_ptr = read_u32(data, offset + OFF_FULL_PATH_PTR, "full_path_ptr")?;
        let full_path_len = read_u16(data, offset + OFF_FULL_PATH_LEN, "full_path_len")?;
        let base_name_start = read_u8(data, offset + OFF_BASE_NAME_START, "base_name_start")?;
        let copy_source_ptr = read_u32(data, offset + OFF_COPY_SOURCE_PTR, "copy_source_ptr")?;
        let copy_source_len = read_u16(data, offset + OFF_COPY_SOURCE_LEN, "copy_source_len")?;
        let children_ptr = read_u32(data, offset + OFF_CHILDREN_PTR, "children_ptr")?;
        let children_count = read_u32(data, offset + OFF_CHILDREN_COUNT, "children_count")?;
        let descendants_with_entry = read_u32(
            data,
            offset + OFF_DESCENDANTS_WITH_ENTRY,
            "descendants_with_entry",
        )?;
        let tracked_descendants =
            read_u32(data, offset + OFF_TRACKED_DESCENDANTS, "tracked_descendants")?;
        let raw_flags = read_u16(data, offset + OFF_FLAGS, "flags")?;
        let size = read_u32(data, offset + OFF_SIZE, "size")?;
        let mtime_seconds = read_u32(data, offset + OFF_MTIME_SECONDS, "mtime_seconds")?;
        let mtime_nanoseconds =
            read_u32(data, offset + OFF_MTIME_NANOSECONDS, "mtime_nanoseconds")?;

        let flags = NodeFlags::from_bits_retain(raw_flags);

        if u16::from(base_name_start) > full_path_len {
            return Err(DirstateError::corrupt(
                "base_name_start",
                offset,
                "base_name_start exceeds full_path_len",
            ));
        }
        let full_path = read_bytes(data, full_path_ptr, u32::from(full_path_len), "full_path")?;

        let copy_source = if copy_source_ptr == 0 && copy_source_len == 0 {
            None
        } else {
            Some(read_bytes(
                data,
                copy_source_ptr,
                u32::from(copy_source_len),
                "copy_source",
            )?)
        };

        let children_span = children_count
            .checked_mul(NODE_SIZE)
            .ok_or_else(|| DirstateError::corrupt("children_count", offset, "overflow"))?;
        let children_end = children_ptr
            .checked_add(children_span)
            .ok_or_else(|| DirstateError::corrupt("children_ptr", offset, "overflow"))?;
        if children_end as usize > data.len() {
            return Err(DirstateError::corrupt(
                "children_ptr",
                offset,
                "children run extends past end of data",
            ));
        }

        if mtime_nanoseconds >= NANOS_PER_SECOND {
            return Err(DirstateError::corrupt(
                "mtime_nanoseconds",
                offset,
                "nanoseconds out of range",
            ));
        }
        let mtime = if flags.contains(NodeFlags::HAS_MTIME) {
            Some((mtime_seconds, mtime_nanoseconds))
        } else {
            None
        };

        if !flags.is_tracked_anywhere() {
            if flags.contains(NodeFlags::HAS_MODE_AND_SIZE) {
                return Err(DirstateError::corrupt(
                    "flags",
                    offset,
                    "untracked node has HAS_MODE_AND_SIZE set",
                ));
            }
            if flags.contains(NodeFlags::EXPECTED_STATE_IS_MODIFIED) {
                return Err(DirstateError::corrupt(
                    "flags",
                    offset,
                    "untracked node has EXPECTED_STATE_IS_MODIFIED set",
                ));
            }
            if size != 0 {
                return Err(DirstateError::corrupt(
                    "size",
                    offset,
                    "untracked node has non-zero size",
                ));
            }
        }

        debug_log!(
            DebugFlag::Node,
            3,
            "decoded node at offset {offset}: path={:?} flags={flags:?}",
            String::from_utf8_lossy(full_path)
        );

        Ok(Self {
            data,
            offset,
            full_path,
            base_name_start,
            copy_source,
            children_ptr,
            children_count,
            descendants_with_entry,
            tracked_descendants,
            flags,
            size,
            mtime,
        })
    }

    /// Offset of this record within the backing buffer.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Full path bytes for this node.
    #[must_use]
    pub fn full_path(&self) -> &'a [u8] {
        self.full_path
    }

    /// Byte index within the full path where the base name starts.
    #[must_use]
    pub fn base_name_start(&self) -> u8 {
        self.base_name_start
    }

    /// Base-name slice: the final path component.
    #[must_use]
    pub fn base_name(&self) -> &'a [u8] {
        &self.full_path[self.base_name_start as usize..]
    }

    /// Copy-source path, if this node records one.
    #[must_use]
    pub fn copy_source(&self) -> Option<&'a [u8]> {
        self.copy_source
    }

    /// Flag bitset for this node.
    #[must_use]
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Cached size, meaningful only when `HAS_MODE_AND_SIZE` is set.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Cached `(seconds, nanoseconds)` mtime, if `HAS_MTIME` is set.
    #[must_use]
    pub fn mtime(&self) -> Option<(u32, u32)> {
        self.mtime
    }

    /// Offset and count of this node's children run.
    #[must_use]
    pub fn children(&self) -> (u32, u32) {
        (self.children_ptr, self.children_count)
    }

    /// Count of strict descendants with any tracked-anywhere flag set.
    #[must_use]
    pub fn descendants_with_entry(&self) -> u32 {
        self.descendants_with_entry
    }

    /// Count of strict descendants with `WDIR_TRACKED` set.
    #[must_use]
    pub fn tracked_descendants(&self) -> u32 {
        self.tracked_descendants
    }

    /// The backing buffer this view borrows from.
    #[must_use]
    pub fn backing(&self) -> &'a [u8] {
        self.data
    }
}

/// Owned, decoded field set for a single node, used to build trees in
/// memory before flattening them into the on-disk byte layout.
///
/// Unlike [`NodeView`], this type owns its path bytes and its children, so
/// it can represent nodes that exist only in the overlay and have not yet
/// been written anywhere.
#[derive(Debug, Clone, Default)]
pub struct NodeData {
    /// Copy-source path, if any.
    pub copy_source: Option<Vec<u8>>,
    /// Flag bitset.
    pub flags: NodeFlags,
    /// Cached size.
    pub size: u32,
    /// Cached `(seconds, nanoseconds)` mtime.
    pub mtime: Option<(u32, u32)>,
}

/// Encodes a single 43-byte node record into `out`.
pub(crate) fn encode_node_record(
    out: &mut Vec<u8>,
    full_path_ptr: u32,
    full_path_len: u16,
    base_name_start: u8,
    copy_source_ptr: u32,
    copy_source_len: u16,
    children_ptr: u32,
    children_count: u32,
    descendants_with_entry: u32,
    tracked_descendants: u32,
    node: &NodeData,
) {
    use crate::codec::{write_u16, write_u32, write_u8};

    let (mtime_seconds, mtime_nanoseconds) = node.mtime.unwrap_or((0, 0));

    write_u32(out, full_path_ptr);
    write_u16(out, full_path_len);
    write_u8(out, base_name_start);
    write_u32(out, copy_source_ptr);
    write_u16(out, copy_source_len);
    write_u32(out, children_ptr);
    write_u32(out, children_count);
    write_u32(out, descendants_with_entry);
    write_u32(out, tracked_descendants);
    write_u16(out, node.flags.bits());
    write_u32(out, node.size);
    write_u32(out, mtime_seconds);
    write_u32(out, mtime_nanoseconds);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_minimal_node(buf: &mut Vec<u8>, full_path: &[u8]) -> u32 {
        let offset = buf.len() as u32;
        buf.extend(std::iter::repeat(0u8).take(NODE_SIZE as usize));
        let path_ptr = buf.len() as u32;
        buf.extend_from_slice(full_path);

        let node = NodeData {
            flags: NodeFlags::WDIR_TRACKED,
            ..Default::default()
        };
        let mut record = Vec::new();
        encode_node_record(
            &mut record,
            path_ptr,
            full_path.len() as u16,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            &node,
        );
        assert_eq!(record.len(), NODE_SIZE as usize);
        buf[offset as usize..offset as usize + NODE_SIZE as usize].copy_from_slice(&record);
        offset
    }

    #[test]
    fn encode_then_decode_round_trips_full_path_and_flags() {
        let mut buf = Vec::new();
        let offset = encode_minimal_node(&mut buf, b"foo");

        let node = NodeView::decode(&buf, offset).unwrap();
        assert_eq!(node.full_path(), b"foo");
        assert_eq!(node.base_name(), b"foo");
        assert!(node.flags().contains(NodeFlags::WDIR_TRACKED));
    }

    #[test]
    fn decode_rejects_truncated_record() {
        let buf = vec![0u8; 10];
        assert!(NodeView::decode(&buf, 0).is_err());
    }

    #[test]
    fn decode_rejects_excessive_mtime_nanoseconds() {
        let mut buf = Vec::new();
        let offset = encode_minimal_node(&mut buf, b"foo");

        let flags_off = offset as usize + OFF_FLAGS as usize;
        let flags = (NodeFlags::WDIR_TRACKED | NodeFlags::HAS_MTIME).bits();
        buf[flags_off..flags_off + 2].copy_from_slice(&flags.to_be_bytes());

        let nanos_off = offset as usize + OFF_MTIME_NANOSECONDS as usize;
        buf[nanos_off..nanos_off + 4].copy_from_slice(&NANOS_PER_SECOND.to_be_bytes());

        assert!(NodeView::decode(&buf, offset).is_err());
    }

    #[test]
    fn decode_rejects_untracked_node_with_nonzero_size() {
        let mut buf = Vec::new();
        let offset = encode_minimal_node(&mut buf, b"foo");

        let flags_off = offset as usize + OFF_FLAGS as usize;
        buf[flags_off..flags_off + 2].copy_from_slice(&0u16.to_be_bytes());
        let size_off = offset as usize + OFF_SIZE as usize;
        buf[size_off..size_off + 4].copy_from_slice(&5u32.to_be_bytes());

        assert!(NodeView::decode(&buf, offset).is_err());
    }

    #[test]
    fn decode_rejects_base_name_start_past_full_path_len() {
        let mut buf = Vec::new();
        let offset = encode_minimal_node(&mut buf, b"foo");
        let bn_off = offset as usize + OFF_BASE_NAME_START as usize;
        buf[bn_off] = 200;

        assert!(NodeView::decode(&buf, offset).is_err());
    }
}
