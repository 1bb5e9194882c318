//! Formatting commands issued from the editor toolbar.
//!
//! A [`Cmd`] is compiled against the current document into the
//! [`EditOperation`]s that carry it out, the same operations the editing
//! surface emits for typing. Each operation's paths refer to the tree as left
//! by the operations before it, so the list can be applied in order with
//! [`Document::apply`]. Commands rearrange and restyle text but never delete
//! any of it.

use std::collections::BTreeSet;

use log::debug;

use crate::editing::{
    Document, DocumentError, EditOperation, NodeProperties, Patch, Path, TreePosition,
    node::{Align, ElementKind, Mark, Node},
    offsets::{leaf_paths, node_range},
};

/// Commands that can be applied to the document
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Add `mark` to the selected text, or remove it if the first selected
    /// run already carries it
    ToggleMark {
        anchor: TreePosition,
        focus: TreePosition,
        mark: Mark,
    },
    /// Turn the selected blocks into `kind`, or back into paragraphs if one
    /// of them already is one. List kinds wrap the blocks as list items.
    ToggleBlock {
        anchor: TreePosition,
        focus: TreePosition,
        kind: ElementKind,
    },
    /// Wrap the selected text in a link. At a caret the url itself is
    /// inserted as the link text.
    InsertLink {
        anchor: TreePosition,
        focus: TreePosition,
        url: String,
    },
    InsertImage {
        at: TreePosition,
        url: String,
    },
    /// Insert a `rows` x `cols` table of empty cells and an empty paragraph
    /// after it
    InsertTable {
        at: TreePosition,
        rows: usize,
        cols: usize,
    },
    /// Align the selected blocks. `Align::Left` is the default and clears
    /// the attribute.
    SetAlign {
        anchor: TreePosition,
        focus: TreePosition,
        align: Align,
    },
}

impl Document {
    /// The operations that carry out `cmd`, without touching the document
    pub fn compile(&self, cmd: &Cmd) -> Result<Vec<EditOperation>, DocumentError> {
        compile_command(self, cmd)
    }

    /// Compile and apply `cmd`
    pub fn execute(&mut self, cmd: &Cmd) -> Result<Vec<Patch>, DocumentError> {
        let ops = compile_command(self, cmd)?;
        ops.iter().map(|op| self.apply(op)).collect()
    }
}

/// Compile a command into edit operations
pub(crate) fn compile_command(
    doc: &Document,
    cmd: &Cmd,
) -> Result<Vec<EditOperation>, DocumentError> {
    let mut compiler = Compiler {
        scratch: doc.clone(),
        ops: Vec::new(),
    };
    match cmd {
        Cmd::ToggleMark {
            anchor,
            focus,
            mark,
        } => compiler.toggle_mark(anchor, focus, *mark)?,
        Cmd::ToggleBlock {
            anchor,
            focus,
            kind,
        } => compiler.toggle_block(anchor, focus, kind)?,
        Cmd::InsertLink { anchor, focus, url } => compiler.insert_link(anchor, focus, url)?,
        Cmd::InsertImage { at, url } => {
            let index = compiler.block_insertion_point(at)?;
            compiler.push(EditOperation::InsertNode {
                path: vec![index],
                node: Node::element(ElementKind::image(url.as_str()), vec![Node::text("")]),
            })?;
        }
        Cmd::InsertTable { at, rows, cols } => {
            if *rows == 0 || *cols == 0 {
                debug!("insert_table: ignoring empty {rows}x{cols} table");
            } else {
                let index = compiler.block_insertion_point(at)?;
                compiler.push(EditOperation::InsertNode {
                    path: vec![index],
                    node: empty_table(*rows, *cols),
                })?;
                compiler.push(EditOperation::InsertNode {
                    path: vec![index + 1],
                    node: Node::paragraph(""),
                })?;
            }
        }
        Cmd::SetAlign {
            anchor,
            focus,
            align,
        } => compiler.set_align(anchor, focus, *align)?,
    }
    Ok(compiler.ops)
}

/// Records operations while replaying them on a scratch copy, so each one
/// is built against the tree its predecessors produced
struct Compiler {
    scratch: Document,
    ops: Vec<EditOperation>,
}

impl Compiler {
    fn push(&mut self, op: EditOperation) -> Result<(), DocumentError> {
        self.scratch.apply(&op)?;
        self.ops.push(op);
        Ok(())
    }

    fn remove_node(&mut self, path: Path) -> Result<(), DocumentError> {
        let node = self
            .scratch
            .node(&path)
            .cloned()
            .ok_or_else(|| DocumentError::InvalidPath(path.clone()))?;
        self.push(EditOperation::RemoveNode { path, node })
    }

    fn leaf_len(&self, path: &[usize]) -> Result<usize, DocumentError> {
        match self.scratch.node(path) {
            Some(Node::Text(run)) => Ok(run.char_len()),
            Some(Node::Element(_)) => Err(DocumentError::NotText(path.to_vec())),
            None => Err(DocumentError::InvalidPath(path.to_vec())),
        }
    }

    /// Check a caret addresses a text run and clamp its offset into it
    fn resolve_one(&self, position: &TreePosition) -> Result<TreePosition, DocumentError> {
        let len = self.leaf_len(&position.path)?;
        Ok(TreePosition::new(position.path.clone(), position.offset.min(len)))
    }

    /// Both ends of a selection, in document order
    fn resolve(
        &self,
        anchor: &TreePosition,
        focus: &TreePosition,
    ) -> Result<(TreePosition, TreePosition), DocumentError> {
        let anchor = self.resolve_one(anchor)?;
        let focus = self.resolve_one(focus)?;
        if (&focus.path, focus.offset) < (&anchor.path, anchor.offset) {
            Ok((focus, anchor))
        } else {
            Ok((anchor, focus))
        }
    }

    /// Text runs between two leaf paths, inclusive
    fn leaves_between(&self, start: &Path, end: &Path) -> Vec<Path> {
        leaf_paths(&self.scratch)
            .into_iter()
            .filter(|path| path >= start && path <= end)
            .collect()
    }

    /// Split runs at both ends of the selection and return the non-empty
    /// runs now lying wholly inside it
    fn split_selection(
        &mut self,
        start: &TreePosition,
        end: &TreePosition,
    ) -> Result<Vec<Path>, DocumentError> {
        let mut first = start.path.clone();
        let mut last = end.path.clone();

        // The end goes first so the start's path is still valid afterwards
        let end_len = self.leaf_len(&last)?;
        if end.offset > 0 && end.offset < end_len {
            self.push(EditOperation::SplitNode {
                path: last.clone(),
                position: end.offset,
            })?;
        }
        let start_len = self.leaf_len(&first)?;
        let start_included = start.offset < start_len;
        if start.offset > 0 && start_included {
            self.push(EditOperation::SplitNode {
                path: first.clone(),
                position: start.offset,
            })?;
            if first[..first.len() - 1] == last[..last.len() - 1] {
                bump_last(&mut last);
            }
            bump_last(&mut first);
        }
        let end_included = end.offset > 0;

        let selected = self
            .leaves_between(&first, &last)
            .into_iter()
            .filter(|path| start_included || *path != first)
            .filter(|path| end_included || *path != last)
            .filter(|path| self.leaf_len(path).is_ok_and(|len| len > 0))
            .collect();
        Ok(selected)
    }

    fn toggle_mark(
        &mut self,
        anchor: &TreePosition,
        focus: &TreePosition,
        mark: Mark,
    ) -> Result<(), DocumentError> {
        let (start, end) = self.resolve(anchor, focus)?;
        if start == end {
            return Ok(());
        }
        let runs = self.split_selection(&start, &end)?;
        let Some(first) = runs.first() else {
            return Ok(());
        };
        let active = self.marks_at(first).contains(&mark);

        for path in runs {
            let mut marks = self.marks_at(&path);
            let changed = if active {
                marks.remove(&mark)
            } else {
                marks.insert(mark)
            };
            if changed {
                self.push(EditOperation::SetNode {
                    path,
                    properties: NodeProperties::marks(marks),
                })?;
            }
        }
        Ok(())
    }

    fn marks_at(&self, path: &[usize]) -> BTreeSet<Mark> {
        match self.scratch.node(path) {
            Some(Node::Text(run)) => run.marks.clone(),
            _ => BTreeSet::new(),
        }
    }

    fn toggle_block(
        &mut self,
        anchor: &TreePosition,
        focus: &TreePosition,
        kind: &ElementKind,
    ) -> Result<(), DocumentError> {
        if !is_block_format(kind) {
            return Err(DocumentError::NotABlockFormat(kind.tag().to_string()));
        }
        let (start, end) = self.resolve(anchor, focus)?;

        // Top-level blocks touched by the selection, with the list items
        // touched inside each list
        let mut blocks: Vec<(usize, Vec<usize>)> = Vec::new();
        for path in self.leaves_between(&start.path, &end.path) {
            let block = path[0];
            let item = match self.scratch.nodes().get(block) {
                Some(Node::Element(list)) if list.kind.is_list() && path.len() > 2 => {
                    Some(path[1])
                }
                _ => None,
            };
            match blocks.last_mut() {
                Some((last, items)) if *last == block => {
                    if let Some(item) = item.filter(|item| items.last() != Some(item)) {
                        items.push(item);
                    }
                }
                _ => blocks.push((block, item.into_iter().collect())),
            }
        }

        let active = blocks.iter().any(|(block, items)| {
            let Some(Node::Element(element)) = self.scratch.nodes().get(*block) else {
                return false;
            };
            if kind.is_list() {
                element.kind == *kind && !items.is_empty()
            } else if items.is_empty() {
                element.kind == *kind
            } else {
                items.iter().any(|item| {
                    matches!(
                        element.children.get(*item),
                        Some(Node::Element(child)) if child.kind == *kind
                    )
                })
            }
        });
        let target = if active {
            ElementKind::Paragraph
        } else if kind.is_list() {
            ElementKind::ListItem
        } else {
            kind.clone()
        };

        // Lists go first, from the last block back, so earlier indices hold
        let mut placed: Vec<(usize, bool)> = Vec::new();
        for (block, items) in blocks.iter().rev() {
            let (indices, added) = if items.is_empty() {
                (vec![*block], 0)
            } else {
                self.unwrap_list(*block, items)?
            };
            for entry in &mut placed {
                entry.0 += added;
            }
            let units: Vec<(usize, bool)> = indices
                .into_iter()
                .map(|index| {
                    let convertible = self.scratch.nodes().get(index).is_some_and(is_text_block);
                    (index, convertible)
                })
                .collect();
            placed.splice(0..0, units);
        }

        for &(index, convertible) in &placed {
            let current = match self.scratch.nodes().get(index) {
                Some(Node::Element(element)) => &element.kind,
                _ => continue,
            };
            if convertible && *current != target {
                self.push(EditOperation::SetNode {
                    path: vec![index],
                    properties: NodeProperties::kind(target.clone()),
                })?;
            }
        }

        if !active && kind.is_list() {
            let mut runs: Vec<(usize, usize)> = Vec::new();
            for &(index, convertible) in &placed {
                if !convertible {
                    continue;
                }
                match runs.last_mut() {
                    Some((first, count)) if *first + *count == index => *count += 1,
                    _ => runs.push((index, 1)),
                }
            }
            for &(first, count) in runs.iter().rev() {
                self.wrap(&[], first, count, kind.clone())?;
            }
        }
        Ok(())
    }

    /// Lift the selected items `items` of the top-level list at `block` out
    /// to the top level, splitting the list around them. Returns the indices
    /// the items now occupy and how many top-level nodes were added.
    fn unwrap_list(
        &mut self,
        block: usize,
        items: &[usize],
    ) -> Result<(Vec<usize>, usize), DocumentError> {
        let (Some(&first), Some(&last)) = (items.first(), items.last()) else {
            return Ok((vec![block], 0));
        };
        let len = self
            .scratch
            .node(&[block])
            .and_then(Node::children)
            .map_or(0, <[Node]>::len);

        let split_after = last + 1 < len;
        if split_after {
            self.push(EditOperation::SplitNode {
                path: vec![block],
                position: last + 1,
            })?;
        }
        let split_before = first > 0;
        let target = if split_before {
            self.push(EditOperation::SplitNode {
                path: vec![block],
                position: first,
            })?;
            block + 1
        } else {
            block
        };

        let count = last - first + 1;
        for offset in 0..count {
            self.push(EditOperation::MoveNode {
                path: vec![target + offset, 0],
                new_path: vec![target + offset],
            })?;
        }
        self.remove_node(vec![target + count])?;

        let added = usize::from(split_before) + usize::from(split_after) + count - 1;
        Ok(((target..target + count).collect(), added))
    }

    /// Wrap `count` siblings under `parent`, starting at `first`, in a new
    /// element of `kind`
    fn wrap(
        &mut self,
        parent: &[usize],
        first: usize,
        count: usize,
        kind: ElementKind,
    ) -> Result<(), DocumentError> {
        let at = |index: usize| {
            let mut path = parent.to_vec();
            path.push(index);
            path
        };
        // Normalisation gives the empty wrapper a placeholder run
        self.push(EditOperation::InsertNode {
            path: at(first),
            node: Node::element(kind, Vec::new()),
        })?;
        for index in 0..count {
            let mut new_path = at(first);
            new_path.push(index);
            self.push(EditOperation::MoveNode {
                path: at(first + 1),
                new_path,
            })?;
        }
        let mut placeholder = at(first);
        placeholder.push(count);
        self.remove_node(placeholder)
    }

    fn insert_link(
        &mut self,
        anchor: &TreePosition,
        focus: &TreePosition,
        url: &str,
    ) -> Result<(), DocumentError> {
        let (start, end) = self.resolve(anchor, focus)?;
        if start == end {
            let (mut path, index) = self.inline_insertion_point(&start)?;
            path.push(index);
            return self.push(EditOperation::InsertNode {
                path,
                node: Node::element(ElementKind::link(url), vec![Node::text(url)]),
            });
        }

        let runs: Vec<Path> = self
            .split_selection(&start, &end)?
            .into_iter()
            .filter(|path| !self.parent_is_inline(path))
            .collect();

        // Consecutive siblings share one link
        let mut groups: Vec<(Path, usize, usize)> = Vec::new();
        for path in runs {
            let Some((&index, parent)) = path.split_last() else {
                continue;
            };
            match groups.last_mut() {
                Some((group_parent, first, count))
                    if group_parent.as_slice() == parent && *first + *count == index =>
                {
                    *count += 1
                }
                _ => groups.push((parent.to_vec(), index, 1)),
            }
        }
        for (parent, first, count) in groups.into_iter().rev() {
            self.wrap(&parent, first, count, ElementKind::link(url))?;
        }
        Ok(())
    }

    fn parent_is_inline(&self, path: &[usize]) -> bool {
        path.split_last()
            .and_then(|(_, parent)| self.scratch.node(parent))
            .is_some_and(Node::is_inline)
    }

    /// Parent path and child index at which an inline node goes for a caret,
    /// splitting the run under it if needed. A caret inside a link places
    /// the new node beside that link.
    fn inline_insertion_point(
        &mut self,
        caret: &TreePosition,
    ) -> Result<(Path, usize), DocumentError> {
        let Some((&leaf, parent)) = caret.path.split_last() else {
            return Err(DocumentError::InvalidPath(caret.path.clone()));
        };
        if self.parent_is_inline(&caret.path) {
            if let Some((&link, outer)) = parent.split_last() {
                let index = if leaf == 0 && caret.offset == 0 {
                    link
                } else {
                    link + 1
                };
                return Ok((outer.to_vec(), index));
            }
        }

        let len = self.leaf_len(&caret.path)?;
        let index = if caret.offset == 0 {
            leaf
        } else if caret.offset >= len {
            leaf + 1
        } else {
            self.push(EditOperation::SplitNode {
                path: caret.path.clone(),
                position: caret.offset,
            })?;
            leaf + 1
        };
        Ok((parent.to_vec(), index))
    }

    /// Top-level index at which a new block goes for a caret. A caret in the
    /// middle of a plain block splits it in two.
    fn block_insertion_point(&mut self, at: &TreePosition) -> Result<usize, DocumentError> {
        let caret = self.resolve_one(at)?;
        let block = caret.path[0];
        let (Some(leaf_span), Some(block_span)) = (
            node_range(&self.scratch, &caret.path),
            node_range(&self.scratch, &[block]),
        ) else {
            return Err(DocumentError::InvalidPath(caret.path.clone()));
        };
        let local = leaf_span.start - block_span.start + caret.offset;

        if local == 0 {
            return Ok(block);
        }
        if local >= block_span.len() || caret.path.len() != 2 {
            return Ok(block + 1);
        }

        let leaf = caret.path[1];
        let len = self.leaf_len(&caret.path)?;
        let position = if caret.offset == 0 {
            leaf
        } else if caret.offset >= len {
            leaf + 1
        } else {
            self.push(EditOperation::SplitNode {
                path: caret.path.clone(),
                position: caret.offset,
            })?;
            leaf + 1
        };
        self.push(EditOperation::SplitNode {
            path: vec![block],
            position,
        })?;
        Ok(block + 1)
    }

    fn set_align(
        &mut self,
        anchor: &TreePosition,
        focus: &TreePosition,
        align: Align,
    ) -> Result<(), DocumentError> {
        let (start, end) = self.resolve(anchor, focus)?;
        let value = (align != Align::Left).then_some(align);

        let mut blocks: Vec<Path> = Vec::new();
        for path in self.leaves_between(&start.path, &end.path) {
            let mut block = path[..path.len() - 1].to_vec();
            while !block.is_empty() && self.scratch.node(&block).is_some_and(Node::is_inline) {
                block.pop();
            }
            if !block.is_empty() && blocks.last() != Some(&block) {
                blocks.push(block);
            }
        }

        for path in blocks {
            let current = match self.scratch.node(&path) {
                Some(Node::Element(element)) => element.align,
                _ => continue,
            };
            if current != value {
                self.push(EditOperation::SetNode {
                    path,
                    properties: NodeProperties::align(value),
                })?;
            }
        }
        Ok(())
    }
}

fn bump_last(path: &mut Path) {
    if let Some(last) = path.last_mut() {
        *last += 1;
    }
}

fn is_block_format(kind: &ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Title
            | ElementKind::Paragraph
            | ElementKind::Heading(_)
            | ElementKind::Blockquote
            | ElementKind::NumberedList
            | ElementKind::BulletedList
            | ElementKind::CodeBlock
    )
}

/// A block whose children are all text or inline elements
fn is_text_block(node: &Node) -> bool {
    let Node::Element(element) = node else {
        return false;
    };
    let structural = matches!(
        element.kind,
        ElementKind::Table | ElementKind::TableRow | ElementKind::TableCell
    );
    !structural
        && !element.kind.is_list()
        && !element.kind.is_void()
        && !element.kind.is_inline()
        && element
            .children
            .iter()
            .all(|child| matches!(child, Node::Text(_)) || child.is_inline())
}

fn empty_table(rows: usize, cols: usize) -> Node {
    let row = || {
        Node::element(
            ElementKind::TableRow,
            (0..cols)
                .map(|_| Node::element(ElementKind::TableCell, vec![Node::paragraph("")]))
                .collect(),
        )
    };
    Node::element(ElementKind::Table, (0..rows).map(|_| row()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{
        flat_text,
        node::{Element, HeadingLevel, TextRun},
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn pos(path: &[usize], offset: usize) -> TreePosition {
        TreePosition::new(path.to_vec(), offset)
    }

    fn bold(text: &str) -> Node {
        Node::Text(TextRun::new(text).with_mark(Mark::Bold))
    }

    fn item(text: &str) -> Node {
        Node::element(ElementKind::ListItem, vec![Node::text(text)])
    }

    fn list(kind: ElementKind, items: &[&str]) -> Node {
        Node::element(kind, items.iter().map(|text| item(text)).collect())
    }

    fn hello() -> Document {
        Document::new(vec![Node::paragraph("Hello world")])
    }

    // ============ Marks ============

    #[test]
    fn test_toggle_mark_splits_out_selected_text() {
        let mut document = hello();
        document
            .execute(&Cmd::ToggleMark {
                anchor: pos(&[0, 0], 0),
                focus: pos(&[0, 0], 5),
                mark: Mark::Bold,
            })
            .unwrap();

        assert_eq!(
            document.nodes(),
            &[Node::element(
                ElementKind::Paragraph,
                vec![bold("Hello"), Node::text(" world")]
            )]
        );
    }

    #[test]
    fn test_toggle_mark_removes_when_first_run_has_it() {
        let mut document = Document::new(vec![Node::element(
            ElementKind::Paragraph,
            vec![bold("Hello"), Node::text(" world")],
        )]);
        document
            .execute(&Cmd::ToggleMark {
                anchor: pos(&[0, 1], 3),
                focus: pos(&[0, 0], 2),
                mark: Mark::Bold,
            })
            .unwrap();

        assert_eq!(
            document.nodes(),
            &[Node::element(
                ElementKind::Paragraph,
                vec![
                    bold("He"),
                    Node::text("llo"),
                    Node::text(" wo"),
                    Node::text("rld")
                ]
            )]
        );
    }

    #[test]
    fn test_toggle_mark_across_blocks() {
        let mut document = Document::new(vec![Node::paragraph("AB"), Node::paragraph("CD")]);
        document
            .execute(&Cmd::ToggleMark {
                anchor: pos(&[0, 0], 1),
                focus: pos(&[1, 0], 1),
                mark: Mark::Italic,
            })
            .unwrap();

        let italic = |text: &str| Node::Text(TextRun::new(text).with_mark(Mark::Italic));
        assert_eq!(
            document.nodes(),
            &[
                Node::element(ElementKind::Paragraph, vec![Node::text("A"), italic("B")]),
                Node::element(ElementKind::Paragraph, vec![italic("C"), Node::text("D")]),
            ]
        );
        assert_eq!(flat_text(&document), "AB\nCD");
    }

    #[test]
    fn test_toggle_mark_at_caret_does_nothing() {
        let ops = hello()
            .compile(&Cmd::ToggleMark {
                anchor: pos(&[0, 0], 3),
                focus: pos(&[0, 0], 3),
                mark: Mark::Code,
            })
            .unwrap();
        assert!(ops.is_empty());
    }

    // ============ Blocks ============

    #[test]
    fn test_toggle_block_sets_and_clears_heading() {
        let mut document = hello();
        let heading = Cmd::ToggleBlock {
            anchor: pos(&[0, 0], 2),
            focus: pos(&[0, 0], 2),
            kind: ElementKind::Heading(HeadingLevel::One),
        };

        document.execute(&heading).unwrap();
        assert_eq!(
            document.nodes(),
            &[Node::element(
                ElementKind::Heading(HeadingLevel::One),
                vec![Node::text("Hello world")]
            )]
        );

        document.execute(&heading).unwrap();
        assert_eq!(document, hello());
    }

    #[test]
    fn test_toggle_list_wraps_blocks_in_list_items() {
        let mut document = Document::new(vec![
            Node::paragraph("one"),
            Node::paragraph("two"),
            Node::paragraph("after"),
        ]);
        document
            .execute(&Cmd::ToggleBlock {
                anchor: pos(&[0, 0], 0),
                focus: pos(&[1, 0], 1),
                kind: ElementKind::BulletedList,
            })
            .unwrap();

        assert_eq!(
            document.nodes(),
            &[
                list(ElementKind::BulletedList, &["one", "two"]),
                Node::paragraph("after"),
            ]
        );
    }

    #[test]
    fn test_toggle_list_off_lifts_item_and_splits_list() {
        let mut document = Document::new(vec![list(
            ElementKind::BulletedList,
            &["one", "two", "three"],
        )]);
        document
            .execute(&Cmd::ToggleBlock {
                anchor: pos(&[0, 1, 0], 0),
                focus: pos(&[0, 1, 0], 0),
                kind: ElementKind::BulletedList,
            })
            .unwrap();

        assert_eq!(
            document.nodes(),
            &[
                list(ElementKind::BulletedList, &["one"]),
                Node::paragraph("two"),
                list(ElementKind::BulletedList, &["three"]),
            ]
        );
    }

    #[test]
    fn test_toggle_other_list_kind_rewraps() {
        let mut document = Document::new(vec![list(ElementKind::BulletedList, &["one", "two"])]);
        document
            .execute(&Cmd::ToggleBlock {
                anchor: pos(&[0, 0, 0], 0),
                focus: pos(&[0, 1, 0], 3),
                kind: ElementKind::NumberedList,
            })
            .unwrap();

        assert_eq!(
            document.nodes(),
            &[list(ElementKind::NumberedList, &["one", "two"])]
        );
    }

    #[test]
    fn test_toggle_block_rejects_non_block_kinds() {
        let err = hello()
            .compile(&Cmd::ToggleBlock {
                anchor: pos(&[0, 0], 0),
                focus: pos(&[0, 0], 0),
                kind: ElementKind::Table,
            })
            .unwrap_err();
        assert_eq!(err, DocumentError::NotABlockFormat("table".into()));
    }

    // ============ Links, images, tables ============

    #[test]
    fn test_insert_link_at_caret_uses_url_as_text() {
        let mut document = hello();
        document
            .execute(&Cmd::InsertLink {
                anchor: pos(&[0, 0], 5),
                focus: pos(&[0, 0], 5),
                url: "https://example.com".into(),
            })
            .unwrap();

        assert_eq!(
            document.nodes(),
            &[Node::element(
                ElementKind::Paragraph,
                vec![
                    Node::text("Hello"),
                    Node::element(
                        ElementKind::link("https://example.com"),
                        vec![Node::text("https://example.com")]
                    ),
                    Node::text(" world"),
                ]
            )]
        );
    }

    #[test]
    fn test_insert_link_wraps_selection_without_changing_text() {
        let mut document = hello();
        document
            .execute(&Cmd::InsertLink {
                anchor: pos(&[0, 0], 6),
                focus: pos(&[0, 0], 11),
                url: "https://example.com".into(),
            })
            .unwrap();

        assert_eq!(
            document.nodes(),
            &[Node::element(
                ElementKind::Paragraph,
                vec![
                    Node::text("Hello "),
                    Node::element(
                        ElementKind::link("https://example.com"),
                        vec![Node::text("world")]
                    ),
                ]
            )]
        );
        assert_eq!(flat_text(&document), "Hello world");
    }

    #[test]
    fn test_insert_image_splits_paragraph_at_caret() {
        let mut document = hello();
        document
            .execute(&Cmd::InsertImage {
                at: pos(&[0, 0], 5),
                url: "cat.png".into(),
            })
            .unwrap();

        assert_eq!(
            document.nodes(),
            &[
                Node::paragraph("Hello"),
                Node::element(ElementKind::image("cat.png"), vec![Node::text("")]),
                Node::paragraph(" world"),
            ]
        );
    }

    #[rstest]
    #[case::at_start(0, 0)]
    #[case::at_end(11, 1)]
    fn test_insert_image_at_block_edge(#[case] offset: usize, #[case] index: usize) {
        let mut document = hello();
        document
            .execute(&Cmd::InsertImage {
                at: pos(&[0, 0], offset),
                url: "cat.png".into(),
            })
            .unwrap();

        assert_eq!(document.nodes().len(), 2);
        assert!(document.nodes()[index].is_void());
    }

    #[test]
    fn test_insert_table_adds_grid_and_trailing_paragraph() {
        let mut document = hello();
        document
            .execute(&Cmd::InsertTable {
                at: pos(&[0, 0], 11),
                rows: 2,
                cols: 3,
            })
            .unwrap();

        assert_eq!(document.nodes().len(), 3);
        assert_eq!(document.nodes()[1], empty_table(2, 3));
        assert_eq!(document.nodes()[2], Node::paragraph(""));
        let Some(Node::Element(row)) = document.node(&[1, 1]) else {
            panic!("expected row");
        };
        assert_eq!(row.children.len(), 3);
    }

    #[test]
    fn test_empty_table_is_ignored() {
        let ops = hello()
            .compile(&Cmd::InsertTable {
                at: pos(&[0, 0], 0),
                rows: 0,
                cols: 3,
            })
            .unwrap();
        assert!(ops.is_empty());
    }

    // ============ Alignment ============

    #[test]
    fn test_set_align_then_left_clears() {
        let mut document = Document::new(vec![Node::paragraph("AB"), Node::paragraph("CD")]);
        let align = |align| Cmd::SetAlign {
            anchor: pos(&[0, 0], 1),
            focus: pos(&[1, 0], 1),
            align,
        };

        document.execute(&align(Align::Center)).unwrap();
        assert_eq!(
            document.nodes(),
            &[
                Node::Element(Element::paragraph("AB").with_align(Align::Center)),
                Node::Element(Element::paragraph("CD").with_align(Align::Center)),
            ]
        );

        document.execute(&align(Align::Left)).unwrap();
        assert_eq!(
            document.nodes(),
            &[Node::paragraph("AB"), Node::paragraph("CD")]
        );
    }

    // ============ Compilation ============

    #[test]
    fn test_compile_leaves_document_untouched() {
        let document = hello();
        let cmd = Cmd::InsertLink {
            anchor: pos(&[0, 0], 0),
            focus: pos(&[0, 0], 5),
            url: "u".into(),
        };

        let ops = document.compile(&cmd).unwrap();
        assert_eq!(document, hello());

        let mut replayed = hello();
        for op in &ops {
            replayed.apply(op).unwrap();
        }
        let mut executed = hello();
        executed.execute(&cmd).unwrap();
        assert_eq!(replayed, executed);
    }

    #[test]
    fn test_selection_must_address_text() {
        let err = hello()
            .compile(&Cmd::SetAlign {
                anchor: pos(&[0], 0),
                focus: pos(&[0, 0], 1),
                align: Align::Right,
            })
            .unwrap_err();
        assert_eq!(err, DocumentError::NotText(vec![0]));
    }
}
