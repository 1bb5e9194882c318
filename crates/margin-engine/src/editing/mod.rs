/*!
 * # Editing Core
 *
 * The in-memory model of one page and the coordinate space annotations are
 * anchored in.
 *
 * ## Architecture Overview
 *
 * ### 1. Document Tree
 * - A page is an ordered forest of [`Node`]s: text runs carrying marks, and
 *   typed elements carrying children
 * - Every non-void element keeps at least one child; [`Document::normalize`]
 *   restores this one fix at a time and is run to a fixed point after each
 *   structural edit
 * - `image` is the only void element, `link` the only inline one
 *
 * ### 2. Edit Operations
 * - The editing surface reports edits as [`EditOperation`]s and the document
 *   applies them through a single dispatch, [`Document::apply`]
 * - Each application yields a [`Patch`] describing what happened
 * - Toolbar formatting ([`Cmd`]) compiles down to the same operations
 *
 * ### 3. Flat-Offset Space
 * - Annotations are anchored to `[start, end)` ranges over the document's
 *   linearised text, one separator per top-level block boundary
 * - [`map_to_flat`] turns a tree position into that coordinate and never
 *   fails; traversal problems map to 0
 *
 * ### 4. Persisted Shape
 * - Page content is stored as a JSON array of nodes
 * - Loading is forgiving and always yields a normalised document; saving
 *   writes back unknown attributes untouched
 *
 * ## Module Structure
 *
 * - **`commands`**: toolbar formatting commands compiled to operations
 * - **`node`**: `Node`, `TextRun`, `Element` and their enums
 * - **`operations`**: `EditOperation` and `NodeProperties`
 * - **`document`**: `Document`, normalisation and operation application
 * - **`offsets`**: tree position to flat offset mapping
 * - **`patch`**: edit result metadata
 *
 * ## Usage Pattern
 *
 * ```rust
 * use margin_engine::editing::*;
 * use serde_json::json;
 *
 * let content = json!([{"type": "paragraph", "children": [{"text": "Hello world"}]}]);
 * let mut doc = Document::from_persisted(&content);
 *
 * let range = map_selection(
 *     &doc,
 *     &TreePosition::new(vec![0, 0], 0),
 *     &TreePosition::new(vec![0, 0], 5),
 * );
 * assert_eq!(range, FlatRange::new(0, 5));
 *
 * doc.apply(&EditOperation::InsertText {
 *     path: vec![0, 0],
 *     offset: 11,
 *     text: "!".to_string(),
 * })
 * .unwrap();
 * assert_eq!(flat_text(&doc), "Hello world!");
 * ```
 */

pub mod commands;
pub mod document;
pub mod node;
pub mod offsets;
pub mod operations;
pub mod patch;
mod persisted;

pub use commands::Cmd;
pub use document::{Document, DocumentError, is_inline, is_void};
pub use node::{Align, Element, ElementKind, HeadingLevel, Mark, Node, TextRun};
pub use offsets::{
    BLOCK_SEPARATOR, FlatRange, TreePosition, block_offsets, flat_text, locate_flat, map_selection,
    map_to_flat, node_range, slice_flat,
};
pub use operations::{EditOperation, NodeProperties, Path};
pub use patch::Patch;
