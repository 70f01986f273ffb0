//! Tree façade (§4.2): point lookup by binary search on each level, descent,
//! and ordered depth-first iteration.

use logging::{info_log, InfoFlag};

use crate::error::DirstateError;
use crate::node::NodeView;

/// A read-only view over the live tree encoded in a data-file buffer,
/// rooted at a given `(root_ptr, root_count)` pair taken from the docket's
/// tree metadata.
#[derive(Debug, Clone, Copy)]
pub struct Tree<'a> {
    data: &'a [u8],
    root_ptr: u32,
    root_count: u32,
}

impl<'a> Tree<'a> {
    /// Builds a tree view over `data`, rooted at `(root_ptr, root_count)`.
    #[must_use]
    pub fn new(data: &'a [u8], root_ptr: u32, root_count: u32) -> Self {
        Self {
            data,
            root_ptr,
            root_count,
        }
    }

    /// Returns the root-level sibling run as `(ptr, count)`.
    #[must_use]
    pub fn root(&self) -> (u32, u32) {
        (self.root_ptr, self.root_count)
    }

    /// Returns the backing byte slice this tree is decoded from.
    #[must_use]
    pub fn backing(&self) -> &'a [u8] {
        self.data
    }

    /// Looks up `path` (components separated by `/`), returning the
    /// matching node if present.
    ///
    /// # Errors
    ///
    /// Returns [`DirstateError::CorruptIndex`] if decoding any node visited
    /// along the way fails.
    pub fn lookup(&self, path: &[u8]) -> Result<Option<NodeView<'a>>, DirstateError> {
        let mut ptr = self.root_ptr;
        let mut count = self.root_count;
        let mut remaining = path;

        loop {
            let (component, rest) = split_first_component(remaining);
            let Some(node) = binary_search_siblings(self.data, ptr, count, component)? else {
                return Ok(None);
            };
            match rest {
                None => return Ok(Some(node)),
                Some(rest) => {
                    let (child_ptr, child_count) = node.children();
                    ptr = child_ptr;
                    count = child_count;
                    remaining = rest;
                }
            }
        }
    }

    /// Returns the node for `path`'s children run, i.e. the `(ptr, count)`
    /// a directory walker should iterate to list `path`'s direct entries.
    ///
    /// Returns `(root_ptr, root_count)` when `path` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`DirstateError::CorruptIndex`] if decoding fails along the
    /// way, or `Ok(None)` if `path` does not name a node in the tree.
    pub fn children_of(&self, path: &[u8]) -> Result<Option<(u32, u32)>, DirstateError> {
        if path.is_empty() {
            return Ok(Some((self.root_ptr, self.root_count)));
        }
        Ok(self.lookup(path)?.map(|node| node.children()))
    }

    /// Returns an iterator over every node in the tree, in depth-first
    /// order with siblings visited in stored (sorted) order.
    #[must_use]
    pub fn iter(&self) -> TreeIter<'a> {
        TreeIter {
            data: self.data,
            stack: vec![SiblingCursor {
                ptr: self.root_ptr,
                count: self.root_count,
                index: 0,
            }],
        }
    }
}

fn split_first_component(path: &[u8]) -> (&[u8], Option<&[u8]>) {
    match path.iter().position(|&b| b == b'/') {
        Some(i) => (&path[..i], Some(&path[i + 1..])),
        None => (path, None),
    }
}

fn binary_search_siblings<'a>(
    data: &'a [u8],
    ptr: u32,
    count: u32,
    base_name: &[u8],
) -> Result<Option<NodeView<'a>>, DirstateError> {
    let mut lo: i64 = 0;
    let mut hi: i64 = i64::from(count) - 1;

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let offset = ptr + (mid as u32) * crate::node::NODE_SIZE;
        let node = NodeView::decode(data, offset).map_err(|e| {
            info_log!(InfoFlag::Corrupt, 1, "sibling decode failed at offset {offset}: {e}");
            e
        })?;
        match node.base_name().cmp(base_name) {
            std::cmp::Ordering::Equal => return Ok(Some(node)),
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid - 1,
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, Copy)]
struct SiblingCursor {
    ptr: u32,
    count: u32,
    index: u32,
}

/// Depth-first iterator over a [`Tree`]'s nodes.
pub struct TreeIter<'a> {
    data: &'a [u8],
    stack: Vec<SiblingCursor>,
}

impl<'a> Iterator for TreeIter<'a> {
    type Item = Result<NodeView<'a>, DirstateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cursor = self.stack.last_mut()?;
            if cursor.index >= cursor.count {
                self.stack.pop();
                continue;
            }
            let offset = cursor.ptr + cursor.index * crate::node::NODE_SIZE;
            cursor.index += 1;

            return Some(match NodeView::decode(self.data, offset) {
                Ok(node) => {
                    let (child_ptr, child_count) = node.children();
                    if child_count > 0 {
                        self.stack.push(SiblingCursor {
                            ptr: child_ptr,
                            count: child_count,
                            index: 0,
                        });
                    }
                    Ok(node)
                }
                Err(e) => Err(e),
            });
        }
    }
}
