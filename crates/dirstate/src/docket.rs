//! Docket (§3, §6): the small fixed-layout file naming the current data
//! file and carrying tree metadata.

use crate::codec::{read_bytes, read_u32, read_u8, write_u32, write_u8};
use crate::error::DirstateError;

const MAGIC: &[u8; 12] = b"dirstate-v2\n";
const MIN_DOCKET_LEN: usize = 125;

const OFF_MAGIC: u32 = 0;
const OFF_PARENT1: u32 = 12;
const OFF_PARENT2: u32 = 44;
const OFF_ROOT_PTR: u32 = 76;
const OFF_ROOT_COUNT: u32 = 80;
const OFF_DIRSTATE_ENTRY_COUNT: u32 = 84;
const OFF_COPY_SOURCE_COUNT: u32 = 88;
const OFF_UNREACHABLE_BYTES: u32 = 92;
const OFF_RESERVED: u32 = 96;
const OFF_IGNORE_HASH: u32 = 100;
const OFF_USED_SIZE: u32 = 120;
const OFF_ID_LENGTH: u32 = 124;
const OFF_ID: u32 = 125;

const PARENT_ID_LEN: usize = 32;
const IGNORE_HASH_LEN: usize = 20;

/// Tree metadata embedded in the docket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeMetadata {
    /// Root pointer into the data file.
    pub root_ptr: u32,
    /// Root sibling count.
    pub root_count: u32,
    /// Number of nodes tracked anywhere.
    pub dirstate_entry_count: u32,
    /// Number of nodes with a non-empty copy source.
    pub copy_source_count: u32,
    /// Estimate of bytes within `used_size` unreachable from root.
    pub unreachable_bytes: u32,
}

/// A fully decoded docket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Docket {
    /// First parent changeset id, left-aligned and zero-padded to 32 bytes.
    pub parent1: [u8; PARENT_ID_LEN],
    /// Second parent changeset id, all-zero when there is no merge parent.
    pub parent2: [u8; PARENT_ID_LEN],
    /// Tree metadata.
    pub tree: TreeMetadata,
    /// Ignore-pattern digest, or all-zero when absent.
    pub ignore_hash: [u8; IGNORE_HASH_LEN],
    /// Number of bytes of the data file that belong to this generation.
    pub used_size: u32,
    /// Random identifier naming `dirstate.<id>`.
    pub id: Vec<u8>,
}

impl Docket {
    /// Returns `true` when no ignore-pattern hash has been recorded.
    #[must_use]
    pub fn ignore_hash_is_absent(&self) -> bool {
        self.ignore_hash == [0u8; IGNORE_HASH_LEN]
    }

    /// Decodes a docket from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`DirstateError::ShortDocket`] if `bytes` is smaller than the
    /// fixed 125-byte minimum, or [`DirstateError::InvalidMagic`] if the
    /// leading 12-byte literal does not match.
    pub fn decode(bytes: &[u8]) -> Result<Self, DirstateError> {
        if bytes.len() < MIN_DOCKET_LEN {
            return Err(DirstateError::ShortDocket {
                actual: bytes.len(),
            });
        }

        let magic = read_bytes(bytes, OFF_MAGIC, 12, "magic")?;
        if magic != MAGIC {
            return Err(DirstateError::InvalidMagic);
        }

        let mut parent1 = [0u8; PARENT_ID_LEN];
        parent1.copy_from_slice(read_bytes(
            bytes,
            OFF_PARENT1,
            PARENT_ID_LEN as u32,
            "parent1",
        )?);
        let mut parent2 = [0u8; PARENT_ID_LEN];
        parent2.copy_from_slice(read_bytes(
            bytes,
            OFF_PARENT2,
            PARENT_ID_LEN as u32,
            "parent2",
        )?);

        let tree = TreeMetadata {
            root_ptr: read_u32(bytes, OFF_ROOT_PTR, "root_ptr")?,
            root_count: read_u32(bytes, OFF_ROOT_COUNT, "root_count")?,
            dirstate_entry_count: read_u32(
                bytes,
                OFF_DIRSTATE_ENTRY_COUNT,
                "dirstate_entry_count",
            )?,
            copy_source_count: read_u32(bytes, OFF_COPY_SOURCE_COUNT, "copy_source_count")?,
            unreachable_bytes: read_u32(bytes, OFF_UNREACHABLE_BYTES, "unreachable_bytes")?,
        };

        let mut ignore_hash = [0u8; IGNORE_HASH_LEN];
        ignore_hash.copy_from_slice(read_bytes(
            bytes,
            OFF_IGNORE_HASH,
            IGNORE_HASH_LEN as u32,
            "ignore_hash",
        )?);

        let used_size = read_u32(bytes, OFF_USED_SIZE, "used_size")?;
        let id_length = read_u8(bytes, OFF_ID_LENGTH, "id_length")?;
        let id = read_bytes(bytes, OFF_ID, u32::from(id_length), "id")?.to_vec();

        Ok(Self {
            parent1,
            parent2,
            tree,
            ignore_hash,
            used_size,
            id,
        })
    }

    /// Encodes this docket to its exact `125 + id.len()` byte layout.
    ///
    /// # Panics
    ///
    /// Panics if `id` is longer than 255 bytes, which the format cannot
    /// address.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let id_length = u8::try_from(self.id.len()).expect("docket id exceeds 255 bytes");

        let mut out = Vec::with_capacity(MIN_DOCKET_LEN + self.id.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.parent1);
        out.extend_from_slice(&self.parent2);
        write_u32(&mut out, self.tree.root_ptr);
        write_u32(&mut out, self.tree.root_count);
        write_u32(&mut out, self.tree.dirstate_entry_count);
        write_u32(&mut out, self.tree.copy_source_count);
        write_u32(&mut out, self.tree.unreachable_bytes);
        write_u32(&mut out, 0); // reserved, zeroed on write
        out.extend_from_slice(&self.ignore_hash);
        write_u32(&mut out, self.used_size);
        write_u8(&mut out, id_length);
        out.extend_from_slice(&self.id);

        debug_assert_eq!(out.len(), MIN_DOCKET_LEN + self.id.len());
        debug_assert_eq!(out.len() - MIN_DOCKET_LEN, self.id.len());
        let _ = OFF_RESERVED; // documents the reserved field's offset for readers
        out
    }
}
