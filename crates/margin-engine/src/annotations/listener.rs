//! Translates edit operations into annotation invalidations.
//!
//! Deletions invalidate the annotations they overlap:
//!
//! - `RemoveText`: the removed characters
//! - `RemoveNode`: the node's text, plus one separator for a top-level block
//! - `MergeNode` at the top level: the separator between the two blocks
//!
//! Insertions, splits and moves are ignored and do not shift later ranges,
//! so annotations after such an edit drift until the document is reloaded.

use log::debug;

use crate::{
    annotations::{Annotation, AnnotationStore},
    editing::{Document, EditOperation, FlatRange, Path, TreePosition, map_to_flat, node_range},
};

/// Flat range removed by `op`, computed against the document *before* it
/// is applied. `None` for operations that delete no text.
pub fn deleted_range(document: &Document, op: &EditOperation) -> Option<FlatRange> {
    let range = match op {
        EditOperation::RemoveText { path, offset, text } => {
            let start = map_to_flat(document, &TreePosition::new(path.clone(), *offset));
            FlatRange {
                start,
                end: start.saturating_add(text.chars().count()),
            }
        }
        EditOperation::RemoveNode { path, .. } => removed_node_range(document, path)?,
        EditOperation::MergeNode { path, .. } => merged_separator(document, path)?,
        _ => return None,
    };
    (!range.is_empty()).then_some(range)
}

/// A removed top-level block takes one separator with it: the one after
/// it, or the one before it if it is the last block
fn removed_node_range(document: &Document, path: &Path) -> Option<FlatRange> {
    let mut range = node_range(document, path)?;
    if let [index] = path.as_slice() {
        if index + 1 < document.nodes().len() {
            range.end += 1;
        } else if *index > 0 {
            range.start -= 1;
        }
    }
    Some(range)
}

fn merged_separator(document: &Document, path: &Path) -> Option<FlatRange> {
    let [index] = path.as_slice() else {
        return None;
    };
    if *index == 0 {
        return None;
    }
    let start = node_range(document, path)?.start;
    Some(FlatRange {
        start: start - 1,
        end: start,
    })
}

/// Prune the annotations invalidated by `op`, returning them
pub fn observe(
    document: &Document,
    op: &EditOperation,
    store: &mut AnnotationStore,
) -> Vec<Annotation> {
    let Some(range) = deleted_range(document, op) else {
        return Vec::new();
    };
    let pruned = store.prune_overlapping(range);
    if !pruned.is_empty() {
        debug!(
            "deletion of {}..{} invalidated {} annotation(s)",
            range.start,
            range.end,
            pruned.len()
        );
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Node;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn hello_world() -> Document {
        Document::new(vec![Node::paragraph("Intro"), Node::paragraph("Hello world")])
    }

    fn store_with(range: FlatRange) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store
            .add(Annotation::comment("note", "me", "", range, Utc::now()))
            .unwrap();
        store
    }

    #[test]
    fn test_remove_text_maps_to_flat_range() {
        let op = EditOperation::RemoveText {
            path: vec![1, 0],
            offset: 2,
            text: "llo".to_string(),
        };
        assert_eq!(deleted_range(&hello_world(), &op), Some(FlatRange::new(8, 11)));
    }

    #[test]
    fn test_deletion_length_counts_characters() {
        let document = Document::new(vec![Node::paragraph("naïve café")]);
        let op = EditOperation::RemoveText {
            path: vec![0, 0],
            offset: 6,
            text: "café".to_string(),
        };
        assert_eq!(deleted_range(&document, &op), Some(FlatRange::new(6, 10)));
    }

    #[test]
    fn test_non_deletions_produce_no_range() {
        let document = hello_world();
        for op in [
            EditOperation::InsertText {
                path: vec![1, 0],
                offset: 0,
                text: "Oh, ".to_string(),
            },
            EditOperation::RemoveText {
                path: vec![1, 0],
                offset: 0,
                text: String::new(),
            },
            EditOperation::SplitNode {
                path: vec![1, 0],
                position: 3,
            },
            EditOperation::MergeNode {
                path: vec![1, 1],
                position: 5,
            },
            EditOperation::RemoveNode {
                path: vec![9],
                node: Node::paragraph("gone"),
            },
            EditOperation::MoveNode {
                path: vec![0],
                new_path: vec![1],
            },
        ] {
            assert_eq!(deleted_range(&document, &op), None);
        }
    }

    #[test]
    fn test_observe_prunes_overlapping_annotation() {
        let mut store = store_with(FlatRange::new(6, 11));
        let op = EditOperation::RemoveText {
            path: vec![1, 0],
            offset: 0,
            text: "Hel".to_string(),
        };

        let pruned = observe(&hello_world(), &op, &mut store);
        assert_eq!(pruned.len(), 1);
        assert!(store.is_empty());
    }

    #[rstest]
    #[case::first_block_takes_following_separator(vec![0], FlatRange::new(0, 6))]
    #[case::last_block_takes_preceding_separator(vec![1], FlatRange::new(5, 17))]
    #[case::nested_run(vec![1, 0], FlatRange::new(6, 17))]
    fn test_remove_node_range(#[case] path: Vec<usize>, #[case] expected: FlatRange) {
        let op = EditOperation::RemoveNode {
            node: hello_world().node(&path).cloned().unwrap(),
            path,
        };
        assert_eq!(deleted_range(&hello_world(), &op), Some(expected));
    }

    #[test]
    fn test_removing_only_block_has_no_separator() {
        let document = Document::new(vec![Node::paragraph("solo")]);
        let op = EditOperation::RemoveNode {
            path: vec![0],
            node: Node::paragraph("solo"),
        };
        assert_eq!(deleted_range(&document, &op), Some(FlatRange::new(0, 4)));
    }

    #[test]
    fn test_removing_block_prunes_its_annotation() {
        let document = Document::new(vec![
            Node::paragraph("Intro"),
            Node::paragraph("Moon is square"),
            Node::paragraph("Other text here"),
        ]);
        let mut store = AnnotationStore::new();
        for (body, range) in [
            ("claim", FlatRange::new(6, 20)),
            ("intro", FlatRange::new(0, 5)),
            ("other", FlatRange::new(21, 26)),
        ] {
            store
                .add(Annotation::comment(body, "me", "", range, Utc::now()))
                .unwrap();
        }

        let op = EditOperation::RemoveNode {
            path: vec![1],
            node: document.nodes()[1].clone(),
        };
        let pruned = observe(&document, &op, &mut store);

        assert_eq!(pruned.iter().map(|a| a.text.as_str()).collect::<Vec<_>>(), vec!["claim"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_top_level_merge_removes_separator() {
        let op = EditOperation::MergeNode {
            path: vec![1],
            position: 1,
        };
        assert_eq!(deleted_range(&hello_world(), &op), Some(FlatRange::new(5, 6)));

        let mut across = store_with(FlatRange::new(3, 8));
        assert_eq!(observe(&hello_world(), &op, &mut across).len(), 1);

        let mut inside = store_with(FlatRange::new(6, 11));
        assert!(observe(&hello_world(), &op, &mut inside).is_empty());
    }

    #[test]
    fn test_insertion_leaves_annotations_in_place() {
        let mut store = store_with(FlatRange::new(6, 11));
        let op = EditOperation::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "An ".to_string(),
        };

        assert!(observe(&hello_world(), &op, &mut store).is_empty());
        assert_eq!(store.iter().next().map(|a| a.range), Some(FlatRange::new(6, 11)));
    }
}
