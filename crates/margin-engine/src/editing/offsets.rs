//! Mapping between tree positions and the flat-offset space.
//!
//! The flat text of a document is the text of each top-level block, in
//! order, with exactly one separator between consecutive blocks. Nested
//! containers (list items, table cells) are linearised into their top-level
//! block without extra separators. Offsets count Unicode scalar values;
//! void elements contribute nothing.
//!
//! Mapping runs one way in practice: selections arrive as tree positions
//! from the editing surface and are turned into flat ranges for anchoring.
//! [`locate_flat`] is a best-effort inverse and is not used to rebuild
//! selections.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::editing::{Document, Node, Path};

/// Separator that stands for a block boundary in the flat text
pub const BLOCK_SEPARATOR: char = '\n';

/// A caret position as reported by the editing surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TreePosition {
    pub path: Path,
    /// Character offset into the addressed text run
    pub offset: usize,
}

impl TreePosition {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

/// Half-open `[start, end)` range in flat-offset space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FlatRange {
    pub start: usize,
    pub end: usize,
}

impl FlatRange {
    /// Build a range from two offsets in either order
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Open-interval overlap: touching ranges do not overlap
    pub fn overlaps(&self, other: &FlatRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Map a tree position to its flat offset.
///
/// Returns 0 if the path does not resolve to a text run; the result only
/// positions UI, so a traversal failure is not an error. Offsets past the
/// end of the run are clamped to its length.
pub fn map_to_flat(document: &Document, position: &TreePosition) -> usize {
    match try_map_to_flat(document, position) {
        Some(offset) => offset,
        None => {
            debug!("map_to_flat: unresolvable position {position:?}, using 0");
            0
        }
    }
}

/// Flat range covered by a selection, independent of its direction
pub fn map_selection(document: &Document, anchor: &TreePosition, focus: &TreePosition) -> FlatRange {
    FlatRange::new(map_to_flat(document, anchor), map_to_flat(document, focus))
}

fn try_map_to_flat(document: &Document, position: &TreePosition) -> Option<usize> {
    let (&block_index, rest) = position.path.split_first()?;
    let blocks = document.nodes();
    let block = blocks.get(block_index)?;

    // One separator unit per preceding block
    let preceding: usize = blocks[..block_index]
        .iter()
        .map(|node| node.text_len() + 1)
        .sum();

    Some(preceding + offset_within(block, rest, position.offset)?)
}

fn offset_within(node: &Node, path: &[usize], offset: usize) -> Option<usize> {
    let Some((&index, rest)) = path.split_first() else {
        return match node {
            Node::Text(run) => {
                let len = run.char_len();
                if offset > len {
                    debug!("map_to_flat: offset {offset} past text length {len}, clamping");
                }
                Some(offset.min(len))
            }
            Node::Element(_) => None,
        };
    };

    let children = node.children()?;
    let child = children.get(index)?;
    if node.is_void() {
        return Some(0);
    }
    let before: usize = children[..index].iter().map(Node::text_len).sum();
    Some(before + offset_within(child, rest, offset)?)
}

/// The linearised text of the document, blocks joined by [`BLOCK_SEPARATOR`]
pub fn flat_text(document: &Document) -> String {
    let mut out = String::new();
    for (index, block) in document.nodes().iter().enumerate() {
        if index > 0 {
            out.push(BLOCK_SEPARATOR);
        }
        out.push_str(&block.plain_text());
    }
    out
}

/// Flat offset at which each top-level block starts
pub fn block_offsets(document: &Document) -> Vec<usize> {
    let mut start = 0;
    document
        .nodes()
        .iter()
        .map(|block| {
            let offset = start;
            start += block.text_len() + 1;
            offset
        })
        .collect()
}

/// Flat span of the node at `path`, separators excluded.
///
/// `None` if the path does not resolve. A node inside a void element spans
/// nothing.
pub fn node_range(document: &Document, path: &[usize]) -> Option<FlatRange> {
    let (&block_index, rest) = path.split_first()?;
    let blocks = document.nodes();
    let mut node = blocks.get(block_index)?;
    let mut start: usize = blocks[..block_index]
        .iter()
        .map(|block| block.text_len() + 1)
        .sum();

    for &index in rest {
        let children = node.children()?;
        let child = children.get(index)?;
        if node.is_void() {
            return Some(FlatRange::new(start, start));
        }
        start += children[..index].iter().map(Node::text_len).sum::<usize>();
        node = child;
    }
    Some(FlatRange {
        start,
        end: start + node.text_len(),
    })
}

/// The flat text covered by `range`, clamped to the document
pub fn slice_flat(document: &Document, range: FlatRange) -> String {
    flat_text(document)
        .chars()
        .skip(range.start)
        .take(range.len())
        .collect()
}

/// Best-effort inverse of [`map_to_flat`].
///
/// Finds the text run whose span contains `flat`. An offset on a boundary
/// between two runs resolves to the end of the earlier one; an offset that
/// lands on a block separator resolves to the end of the preceding block.
/// Returns `None` past the end of the document.
pub fn locate_flat(document: &Document, flat: usize) -> Option<TreePosition> {
    let mut block_start = 0;
    for (index, block) in document.nodes().iter().enumerate() {
        let len = block.text_len();
        if flat <= block_start + len {
            let mut leaves = Vec::new();
            collect_leaves(block, &mut vec![index], &mut leaves);
            let mut local = flat - block_start;
            for (path, leaf_len) in leaves {
                if local <= leaf_len {
                    return Some(TreePosition::new(path, local));
                }
                local -= leaf_len;
            }
            return None;
        }
        block_start += len + 1;
    }
    None
}

/// Paths of every editable text run, in document order
pub(crate) fn leaf_paths(document: &Document) -> Vec<Path> {
    let mut leaves = Vec::new();
    for (index, block) in document.nodes().iter().enumerate() {
        collect_leaves(block, &mut vec![index], &mut leaves);
    }
    leaves.into_iter().map(|(path, _)| path).collect()
}

/// Paths and lengths of the editable text runs under `node`
fn collect_leaves(node: &Node, path: &mut Path, out: &mut Vec<(Path, usize)>) {
    match node {
        Node::Text(run) => out.push((path.clone(), run.char_len())),
        Node::Element(element) if element.kind.is_void() => {}
        Node::Element(element) => {
            for (index, child) in element.children.iter().enumerate() {
                path.push(index);
                collect_leaves(child, path, out);
                path.pop();
            }
        }
    }
}
