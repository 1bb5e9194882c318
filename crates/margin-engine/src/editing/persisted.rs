//! Conversion between the document tree and its persisted JSON shape.
//!
//! Elements are objects with a `type` tag and `children`; text runs are
//! objects with `text`, boolean mark keys and an optional `color`. Attributes
//! the editor does not model are carried through in each node's `extra` map
//! so that a load/save cycle writes back what it read. Unknown tags survive
//! as [`ElementKind::Other`], and a mark stored as `false` stays in `extra`.
//! The one deliberate rewrite is the legacy `{type: "heading", level}` form,
//! which is saved back under its `heading-*` tag.

use log::debug;
use serde_json::{Map, Value};

use crate::editing::{
    Document,
    node::{Align, Element, ElementKind, HeadingLevel, Mark, Node, TextRun},
};

impl Document {
    /// Build a document from persisted page content.
    ///
    /// Never fails: an empty or non-array value yields the first-run
    /// document, top-level objects without a `type` become paragraphs, and
    /// the result is fully normalised.
    pub fn from_persisted(value: &Value) -> Self {
        let items = match value.as_array() {
            Some(items) if !items.is_empty() => items,
            _ => {
                debug!("from_persisted: no content, using default document");
                return Self::default_content();
            }
        };

        let mut document = Document::new(items.iter().map(block_from_value).collect());
        let fixes = document.normalize_fully();
        if fixes > 0 {
            debug!("from_persisted: applied {fixes} normalisation fixes");
        }
        document
    }

    /// Serialise the tree back to its persisted shape
    pub fn to_persisted(&self) -> Value {
        Value::Array(self.nodes.iter().map(node_to_value).collect())
    }

    /// Document shown for a page that has no content yet
    pub fn default_content() -> Self {
        let link_blue = "#0066cc";
        Document::new(vec![
            Node::element(
                ElementKind::Title,
                vec![Node::text("Welcome to your new page")],
            ),
            Node::element(
                ElementKind::Paragraph,
                vec![
                    Node::text("Start writing here. Select any sentence and ask for a "),
                    Node::Text(
                        TextRun::new("fact check")
                            .with_mark(Mark::Bold)
                            .with_color(link_blue),
                    ),
                    Node::text(" to get a note anchored to exactly that text."),
                ],
            ),
            Node::paragraph(""),
            Node::element(
                ElementKind::Paragraph,
                vec![
                    Node::Text(TextRun::new("The Moon is a square").with_mark(Mark::Highlight)),
                    Node::text("."),
                ],
            ),
        ])
    }
}

/// Top-level entries: anything without a string `type` is coerced to a paragraph
fn block_from_value(value: &Value) -> Node {
    match value {
        Value::Object(object) if has_type(object) => element_from_object(object),
        Value::Object(object) => {
            debug!("from_persisted: top-level node without type, coercing to paragraph");
            Node::element(ElementKind::Paragraph, vec![text_from_object(object)])
        }
        Value::String(text) => {
            debug!("from_persisted: top-level bare string, coercing to paragraph");
            Node::paragraph(text.as_str())
        }
        _ => {
            debug!("from_persisted: top-level value is not an object, using empty paragraph");
            Node::paragraph("")
        }
    }
}

fn node_from_value(value: &Value) -> Node {
    match value {
        Value::Object(object) if has_type(object) => element_from_object(object),
        Value::Object(object) => text_from_object(object),
        Value::String(text) => Node::text(text.as_str()),
        _ => Node::Text(TextRun::empty()),
    }
}

fn has_type(object: &Map<String, Value>) -> bool {
    matches!(object.get("type"), Some(Value::String(_)))
}

fn element_from_object(object: &Map<String, Value>) -> Node {
    let tag = object.get("type").and_then(Value::as_str).unwrap_or_default();
    let url = object.get("url").and_then(Value::as_str).map(str::to_string);

    let kind = match tag {
        "title" => ElementKind::Title,
        "paragraph" => ElementKind::Paragraph,
        "heading-one" => ElementKind::Heading(HeadingLevel::One),
        "heading-two" => ElementKind::Heading(HeadingLevel::Two),
        "heading-three" => ElementKind::Heading(HeadingLevel::Three),
        "heading" => ElementKind::Heading(HeadingLevel::from_number(
            object.get("level").and_then(Value::as_u64).unwrap_or(1),
        )),
        "block-quote" => ElementKind::Blockquote,
        "numbered-list" => ElementKind::NumberedList,
        "bulleted-list" => ElementKind::BulletedList,
        "list-item" => ElementKind::ListItem,
        "code-block" => ElementKind::CodeBlock,
        "link" => ElementKind::Link { url },
        "image" => ElementKind::Image { url },
        "table" => ElementKind::Table,
        "table-row" => ElementKind::TableRow,
        "table-cell" => ElementKind::TableCell,
        other => {
            debug!("from_persisted: unknown element type {other:?}, keeping as is");
            ElementKind::Other(other.to_string())
        }
    };

    let mut align = None;
    let mut extra = Map::new();
    for (key, value) in object {
        match key.as_str() {
            "type" | "children" => {}
            "url" if matches!(kind, ElementKind::Link { .. } | ElementKind::Image { .. })
                && value.is_string() => {}
            "level" if tag == "heading" => {}
            "align" => match value.as_str().and_then(Align::parse) {
                Some(parsed) => align = Some(parsed),
                None => {
                    extra.insert(key.clone(), value.clone());
                }
            },
            _ => {
                extra.insert(key.clone(), value.clone());
            }
        }
    }

    let children = object
        .get("children")
        .and_then(Value::as_array)
        .map(|children| children.iter().map(node_from_value).collect())
        .unwrap_or_default();

    Node::Element(Element {
        kind,
        align,
        children,
        extra,
    })
}

fn text_from_object(object: &Map<String, Value>) -> Node {
    let mut run = TextRun::empty();
    for (key, value) in object {
        if key == "text" {
            if let Some(text) = value.as_str() {
                run.text = text.to_string();
            }
            continue;
        }
        if let Some(mark) = Mark::from_key(key) {
            match value {
                Value::Bool(true) => {
                    run.marks.insert(mark);
                }
                _ => {
                    run.extra.insert(key.clone(), value.clone());
                }
            }
            continue;
        }
        match (key.as_str(), value) {
            ("color", Value::String(color)) => run.color = Some(color.clone()),
            _ => {
                run.extra.insert(key.clone(), value.clone());
            }
        }
    }
    Node::Text(run)
}

fn node_to_value(node: &Node) -> Value {
    match node {
        Node::Text(run) => {
            let mut object = run.extra.clone();
            object.insert("text".into(), Value::String(run.text.clone()));
            // An explicit `false` read from storage stays in `extra`
            for mark in &run.marks {
                object.insert(mark.key().into(), Value::Bool(true));
            }
            if let Some(color) = &run.color {
                object.insert("color".into(), Value::String(color.clone()));
            }
            Value::Object(object)
        }
        Node::Element(element) => {
            let mut object = element.extra.clone();
            object.insert("type".into(), Value::String(element.kind.tag().into()));
            if let Some(align) = element.align {
                object.insert("align".into(), Value::String(align.as_str().into()));
            }
            if let ElementKind::Link { url: Some(url) } | ElementKind::Image { url: Some(url) } =
                &element.kind
            {
                object.insert("url".into(), Value::String(url.clone()));
            }
            object.insert(
                "children".into(),
                Value::Array(element.children.iter().map(node_to_value).collect()),
            );
            Value::Object(object)
        }
    }
}
