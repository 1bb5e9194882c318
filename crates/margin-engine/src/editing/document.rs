use log::debug;

use crate::editing::{
    EditOperation, NodeProperties, Patch, Path,
    node::{Node, TextRun},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("no node at path {0:?}")]
    InvalidPath(Path),
    #[error("node at {0:?} is not a text run")]
    NotText(Path),
    #[error("node at {0:?} is not an element")]
    NotElement(Path),
    #[error("offset {offset} out of range (length {len}) at {path:?}")]
    OffsetOutOfRange {
        path: Path,
        offset: usize,
        len: usize,
    },
    #[error("cannot merge node at {0:?} into its previous sibling")]
    CannotMerge(Path),
    #[error("cannot move node at {from:?} into its own subtree at {to:?}")]
    MoveIntoSelf { from: Path, to: Path },
    #[error("properties do not apply to node at {0:?}")]
    PropertyMismatch(Path),
    #[error("{0} is not a block format")]
    NotABlockFormat(String),
}

/// One page's content: the ordered top-level blocks of the tree.
///
/// The document is owned by the editing session. It is replaced wholesale
/// when a page is loaded (`from_persisted`), mutated in place through
/// [`Document::apply`], and serialised wholesale on save (`to_persisted`).
///
/// After every structural edit the tree is normalised so that no element is
/// left without children; see [`Document::normalize`].
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub(crate) nodes: Vec<Node>,
    /// Incremented on each applied operation
    pub(crate) version: u64,
}

impl Document {
    /// Wrap top-level nodes as-is, without normalising them
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes, version: 0 }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up the node addressed by `path`
    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.nodes.get(first)?;
        for &index in rest {
            node = node.children()?.get(index)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.nodes.get_mut(first)?;
        for &index in rest {
            node = node.children_mut()?.get_mut(index)?;
        }
        Some(node)
    }

    /// Apply a single normalisation fix.
    ///
    /// Finds the first element (depth-first, document order) with no
    /// children and gives it an empty text run. An empty document gets an
    /// empty paragraph. Returns `true` if a fix was applied; callers loop
    /// until it returns `false` (or use [`Document::normalize_fully`]).
    pub fn normalize(&mut self) -> bool {
        if self.nodes.is_empty() {
            debug!("normalize: empty document, inserting paragraph");
            self.nodes.push(Node::paragraph(""));
            return true;
        }

        let Some(path) = find_childless_element(&self.nodes, &mut Vec::new()) else {
            return false;
        };
        debug!("normalize: element at {path:?} has no children");
        match self.node_mut(&path).and_then(Node::children_mut) {
            Some(children) => {
                children.insert(0, Node::Text(TextRun::empty()));
                true
            }
            None => false,
        }
    }

    /// Run [`Document::normalize`] until stable, returning the number of fixes
    pub fn normalize_fully(&mut self) -> usize {
        let mut passes = 0;
        while self.normalize() {
            passes += 1;
        }
        passes
    }

    /// Apply an edit operation to the tree.
    ///
    /// Structural operations are followed by a full normalisation. Invalid
    /// paths and offsets are rejected without modifying the document.
    pub fn apply(&mut self, op: &EditOperation) -> Result<Patch, DocumentError> {
        match op {
            EditOperation::InsertText { path, offset, text } => {
                self.insert_text(path, *offset, text)?
            }
            EditOperation::RemoveText { path, offset, text } => {
                self.remove_text(path, *offset, text)?
            }
            EditOperation::InsertNode { path, node } => self
                .insert_node(path, node.clone())
                .map_err(|(err, _)| err)?,
            EditOperation::RemoveNode { path, .. } => {
                self.remove_node(path)?;
            }
            EditOperation::SetNode { path, properties } => self.set_node(path, properties)?,
            EditOperation::MergeNode { path, .. } => self.merge_node(path)?,
            EditOperation::SplitNode { path, position } => self.split_node(path, *position)?,
            EditOperation::MoveNode { path, new_path } => self.move_node(path, new_path)?,
        }

        let structural = op.is_structural();
        let normalize_passes = if structural { self.normalize_fully() } else { 0 };
        self.version += 1;

        Ok(Patch {
            path: op.path().to_vec(),
            structural,
            normalize_passes,
            version: self.version,
        })
    }

    fn text_mut(&mut self, path: &[usize]) -> Result<&mut TextRun, DocumentError> {
        match self.node_mut(path) {
            Some(Node::Text(run)) => Ok(run),
            Some(Node::Element(_)) => Err(DocumentError::NotText(path.to_vec())),
            None => Err(DocumentError::InvalidPath(path.to_vec())),
        }
    }

    /// Children of the node at `parent`; the root's children for an empty path
    fn children_at_mut(&mut self, parent: &[usize]) -> Result<&mut Vec<Node>, DocumentError> {
        if parent.is_empty() {
            return Ok(&mut self.nodes);
        }
        match self.node_mut(parent) {
            Some(node) => node
                .children_mut()
                .ok_or_else(|| DocumentError::NotElement(parent.to_vec())),
            None => Err(DocumentError::InvalidPath(parent.to_vec())),
        }
    }

    fn insert_text(&mut self, path: &[usize], offset: usize, text: &str) -> Result<(), DocumentError> {
        let run = self.text_mut(path)?;
        let len = run.char_len();
        if offset > len {
            return Err(DocumentError::OffsetOutOfRange {
                path: path.to_vec(),
                offset,
                len,
            });
        }
        let at = char_to_byte(&run.text, offset);
        run.text.insert_str(at, text);
        Ok(())
    }

    fn remove_text(&mut self, path: &[usize], offset: usize, text: &str) -> Result<(), DocumentError> {
        let run = self.text_mut(path)?;
        let len = run.char_len();
        let end = match offset.checked_add(text.chars().count()) {
            Some(end) if end <= len => end,
            _ => {
                return Err(DocumentError::OffsetOutOfRange {
                    path: path.to_vec(),
                    offset,
                    len,
                });
            }
        };
        let range = char_to_byte(&run.text, offset)..char_to_byte(&run.text, end);
        if run.text[range.clone()] != *text {
            debug!("remove_text at {path:?}: removed text differs from operation payload");
        }
        run.text.replace_range(range, "");
        Ok(())
    }

    /// Insert `node` at `path`, handing the node back if the path is invalid
    fn insert_node(&mut self, path: &[usize], node: Node) -> Result<(), (DocumentError, Node)> {
        let Some((&index, parent)) = path.split_last() else {
            return Err((DocumentError::InvalidPath(path.to_vec()), node));
        };
        let children = match self.children_at_mut(parent) {
            Ok(children) => children,
            Err(err) => return Err((err, node)),
        };
        if index > children.len() {
            return Err((DocumentError::InvalidPath(path.to_vec()), node));
        }
        children.insert(index, node);
        Ok(())
    }

    fn remove_node(&mut self, path: &[usize]) -> Result<Node, DocumentError> {
        let (&index, parent) = path
            .split_last()
            .ok_or_else(|| DocumentError::InvalidPath(path.to_vec()))?;
        let children = self.children_at_mut(parent)?;
        if index >= children.len() {
            return Err(DocumentError::InvalidPath(path.to_vec()));
        }
        Ok(children.remove(index))
    }

    fn set_node(&mut self, path: &[usize], properties: &NodeProperties) -> Result<(), DocumentError> {
        let node = self
            .node_mut(path)
            .ok_or_else(|| DocumentError::InvalidPath(path.to_vec()))?;
        match node {
            Node::Text(run) => {
                if properties.touches_element() {
                    return Err(DocumentError::PropertyMismatch(path.to_vec()));
                }
                if let Some(marks) = &properties.marks {
                    run.marks = marks.clone();
                }
                if let Some(color) = &properties.color {
                    run.color = color.clone();
                }
            }
            Node::Element(element) => {
                if properties.touches_text() {
                    return Err(DocumentError::PropertyMismatch(path.to_vec()));
                }
                if let Some(kind) = &properties.kind {
                    element.kind = kind.clone();
                }
                if let Some(align) = properties.align {
                    element.align = align;
                }
            }
        }
        Ok(())
    }

    fn merge_node(&mut self, path: &[usize]) -> Result<(), DocumentError> {
        let (&index, parent) = path
            .split_last()
            .ok_or_else(|| DocumentError::InvalidPath(path.to_vec()))?;
        if index == 0 {
            return Err(DocumentError::CannotMerge(path.to_vec()));
        }
        let children = self.children_at_mut(parent)?;
        if index >= children.len() {
            return Err(DocumentError::InvalidPath(path.to_vec()));
        }

        let node = children.remove(index);
        let rejected = match (&mut children[index - 1], node) {
            (Node::Text(previous), Node::Text(run)) => {
                previous.text.push_str(&run.text);
                None
            }
            (Node::Element(previous), Node::Element(element)) => {
                previous.children.extend(element.children);
                None
            }
            (_, node) => Some(node),
        };
        if let Some(node) = rejected {
            children.insert(index, node);
            return Err(DocumentError::CannotMerge(path.to_vec()));
        }
        Ok(())
    }

    fn split_node(&mut self, path: &[usize], position: usize) -> Result<(), DocumentError> {
        let (&index, parent) = path
            .split_last()
            .ok_or_else(|| DocumentError::InvalidPath(path.to_vec()))?;
        let children = self.children_at_mut(parent)?;
        let node = children
            .get_mut(index)
            .ok_or_else(|| DocumentError::InvalidPath(path.to_vec()))?;

        let tail = match node {
            Node::Text(run) => {
                let len = run.char_len();
                if position > len {
                    return Err(DocumentError::OffsetOutOfRange {
                        path: path.to_vec(),
                        offset: position,
                        len,
                    });
                }
                let at = char_to_byte(&run.text, position);
                let rest = run.text.split_off(at);
                Node::Text(run.with_text(rest))
            }
            Node::Element(element) => {
                let len = element.children.len();
                if position > len {
                    return Err(DocumentError::OffsetOutOfRange {
                        path: path.to_vec(),
                        offset: position,
                        len,
                    });
                }
                let rest = element.children.split_off(position);
                Node::Element(element.with_children(rest))
            }
        };
        children.insert(index + 1, tail);
        Ok(())
    }

    fn move_node(&mut self, path: &[usize], new_path: &[usize]) -> Result<(), DocumentError> {
        if path == new_path {
            return Ok(());
        }
        if path.is_empty() || new_path.is_empty() {
            return Err(DocumentError::InvalidPath(path.to_vec()));
        }
        if new_path.starts_with(path) {
            return Err(DocumentError::MoveIntoSelf {
                from: path.to_vec(),
                to: new_path.to_vec(),
            });
        }

        // `new_path` is read against the tree after removal, except when the
        // destination sits inside a later sibling of the moved node.
        let mut target = new_path.to_vec();
        if path.len() < new_path.len() && ends_before(path, new_path) {
            target[path.len() - 1] -= 1;
        }

        let node = self.remove_node(path)?;
        if let Err((err, node)) = self.insert_node(&target, node) {
            // Put it back where it was; removal did not disturb that slot.
            let _ = self.insert_node(path, node);
            return Err(err);
        }
        Ok(())
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        // The version counter is edit history, not content
        self.nodes == other.nodes
    }
}

/// True only for images
pub fn is_void(node: &Node) -> bool {
    node.is_void()
}

/// True only for links
pub fn is_inline(node: &Node) -> bool {
    node.is_inline()
}

fn find_childless_element(nodes: &[Node], prefix: &mut Path) -> Option<Path> {
    for (index, node) in nodes.iter().enumerate() {
        if let Node::Element(element) = node {
            prefix.push(index);
            if element.children.is_empty() {
                return Some(prefix.clone());
            }
            if let Some(found) = find_childless_element(&element.children, prefix) {
                return Some(found);
            }
            prefix.pop();
        }
    }
    None
}

/// Whether `a` precedes `b` at the depth of `a`'s last index
fn ends_before(a: &[usize], b: &[usize]) -> bool {
    let Some((&last, parent)) = a.split_last() else {
        return false;
    };
    b.len() > parent.len() && b.starts_with(parent) && last < b[parent.len()]
}

/// Byte index of the `char_index`-th character, or the end of the string
pub(crate) fn char_to_byte(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}
