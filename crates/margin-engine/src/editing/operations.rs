use std::collections::BTreeSet;

use crate::editing::node::{Align, ElementKind, Mark, Node};

/// Child indices from the document root down to a node
pub type Path = Vec<usize>;

/// Atomic edits emitted by the editing surface.
///
/// Text offsets are character offsets into the addressed text run. Paths for
/// `RemoveText`/`RemoveNode` refer to the tree *before* the operation.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOperation {
    InsertText {
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        path: Path,
        offset: usize,
        text: String,
    },
    InsertNode {
        path: Path,
        node: Node,
    },
    RemoveNode {
        path: Path,
        node: Node,
    },
    SetNode {
        path: Path,
        properties: NodeProperties,
    },
    /// Merge the node at `path` into its previous sibling
    MergeNode {
        path: Path,
        position: usize,
    },
    /// Split the node at `path`; text at a character `position`, elements at a child index
    SplitNode {
        path: Path,
        position: usize,
    },
    MoveNode {
        path: Path,
        new_path: Path,
    },
}

impl EditOperation {
    pub fn path(&self) -> &[usize] {
        match self {
            EditOperation::InsertText { path, .. }
            | EditOperation::RemoveText { path, .. }
            | EditOperation::InsertNode { path, .. }
            | EditOperation::RemoveNode { path, .. }
            | EditOperation::SetNode { path, .. }
            | EditOperation::MergeNode { path, .. }
            | EditOperation::SplitNode { path, .. }
            | EditOperation::MoveNode { path, .. } => path,
        }
    }

    /// Operations that change the shape of the tree rather than text inside a run
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            EditOperation::InsertText { .. } | EditOperation::RemoveText { .. }
        )
    }
}

/// Property changes carried by `SetNode`. `None` leaves a property alone;
/// `Some(None)` clears an optional one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeProperties {
    pub kind: Option<ElementKind>,
    pub align: Option<Option<Align>>,
    pub marks: Option<BTreeSet<Mark>>,
    pub color: Option<Option<String>>,
}

impl NodeProperties {
    pub fn kind(kind: ElementKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn marks(marks: impl IntoIterator<Item = Mark>) -> Self {
        Self {
            marks: Some(marks.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn align(align: Option<Align>) -> Self {
        Self {
            align: Some(align),
            ..Self::default()
        }
    }

    pub(crate) fn touches_element(&self) -> bool {
        self.kind.is_some() || self.align.is_some()
    }

    pub(crate) fn touches_text(&self) -> bool {
        self.marks.is_some() || self.color.is_some()
    }
}
