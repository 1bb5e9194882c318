use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Inline formatting carried by a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Highlight,
}

impl Mark {
    pub const ALL: [Mark; 6] = [
        Mark::Bold,
        Mark::Italic,
        Mark::Underline,
        Mark::Strikethrough,
        Mark::Code,
        Mark::Highlight,
    ];

    /// Key used for this mark in persisted text runs
    pub fn key(self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
            Mark::Strikethrough => "strikethrough",
            Mark::Code => "code",
            Mark::Highlight => "highlight",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Mark::ALL.into_iter().find(|mark| mark.key() == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    One,
    Two,
    Three,
}

impl HeadingLevel {
    /// Levels outside 1-3 are clamped into range
    pub fn from_number(level: u64) -> Self {
        match level {
            0 | 1 => HeadingLevel::One,
            2 => HeadingLevel::Two,
            _ => HeadingLevel::Three,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            HeadingLevel::One => 1,
            HeadingLevel::Two => 2,
            HeadingLevel::Three => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    pub fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Align::Left),
            "center" => Some(Align::Center),
            "right" => Some(Align::Right),
            _ => None,
        }
    }
}

/// Element types understood by the editor
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Title,
    Paragraph,
    Heading(HeadingLevel),
    Blockquote,
    NumberedList,
    BulletedList,
    ListItem,
    CodeBlock,
    Link { url: Option<String> },
    Image { url: Option<String> },
    Table,
    TableRow,
    TableCell,
    /// A tag this editor does not know, kept so it is written back as read
    Other(String),
}

impl ElementKind {
    pub fn link(url: impl Into<String>) -> Self {
        ElementKind::Link {
            url: Some(url.into()),
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        ElementKind::Image {
            url: Some(url.into()),
        }
    }

    /// The `type` tag written for this element
    pub fn tag(&self) -> &str {
        match self {
            ElementKind::Title => "title",
            ElementKind::Paragraph => "paragraph",
            ElementKind::Heading(HeadingLevel::One) => "heading-one",
            ElementKind::Heading(HeadingLevel::Two) => "heading-two",
            ElementKind::Heading(HeadingLevel::Three) => "heading-three",
            ElementKind::Blockquote => "block-quote",
            ElementKind::NumberedList => "numbered-list",
            ElementKind::BulletedList => "bulleted-list",
            ElementKind::ListItem => "list-item",
            ElementKind::CodeBlock => "code-block",
            ElementKind::Link { .. } => "link",
            ElementKind::Image { .. } => "image",
            ElementKind::Table => "table",
            ElementKind::TableRow => "table-row",
            ElementKind::TableCell => "table-cell",
            ElementKind::Other(tag) => tag,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ElementKind::NumberedList | ElementKind::BulletedList)
    }

    /// Only images are void: they hold no editable text.
    pub fn is_void(&self) -> bool {
        matches!(self, ElementKind::Image { .. })
    }

    /// Only links flow inside running text.
    pub fn is_inline(&self) -> bool {
        matches!(self, ElementKind::Link { .. })
    }
}

/// Leaf node: a run of text sharing one set of marks
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextRun {
    pub text: String,
    pub marks: BTreeSet<Mark>,
    pub color: Option<String>,
    /// Attributes the editor does not model, written back untouched
    pub extra: Map<String, Value>,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.marks.insert(mark);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Same formatting, different text
    pub(crate) fn with_text(&self, text: String) -> Self {
        Self {
            text,
            marks: self.marks.clone(),
            color: self.color.clone(),
            extra: self.extra.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    pub align: Option<Align>,
    pub children: Vec<Node>,
    pub extra: Map<String, Value>,
}

impl Element {
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            align: None,
            children,
            extra: Map::new(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Paragraph, vec![Node::text(text)])
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    /// Same properties, different children
    pub(crate) fn with_children(&self, children: Vec<Node>) -> Self {
        Self {
            kind: self.kind.clone(),
            align: self.align,
            children,
            extra: self.extra.clone(),
        }
    }
}

/// A node of the document tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(TextRun),
    Element(Element),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextRun::new(text))
    }

    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Node::Element(Element::new(kind, children))
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::Element(Element::paragraph(text))
    }

    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Text(_) => None,
            Node::Element(element) => Some(&element.children),
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Text(_) => None,
            Node::Element(element) => Some(&mut element.children),
        }
    }

    pub fn is_void(&self) -> bool {
        match self {
            Node::Text(_) => false,
            Node::Element(element) => element.kind.is_void(),
        }
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Node::Text(_) => false,
            Node::Element(element) => element.kind.is_inline(),
        }
    }

    /// Length of the subtree's text in characters. Void subtrees count as zero.
    pub fn text_len(&self) -> usize {
        match self {
            Node::Text(run) => run.char_len(),
            Node::Element(element) if element.kind.is_void() => 0,
            Node::Element(element) => element.children.iter().map(Node::text_len).sum(),
        }
    }

    /// Concatenated text of the subtree in document order
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(run) => out.push_str(&run.text),
            Node::Element(element) if element.kind.is_void() => {}
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

impl From<TextRun> for Node {
    fn from(run: TextRun) -> Self {
        Node::Text(run)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_keys_round_trip() {
        for mark in Mark::ALL {
            assert_eq!(Mark::from_key(mark.key()), Some(mark));
        }
        assert_eq!(Mark::from_key("shadow"), None);
    }

    #[test]
    fn test_heading_level_clamps() {
        assert_eq!(HeadingLevel::from_number(0), HeadingLevel::One);
        assert_eq!(HeadingLevel::from_number(2), HeadingLevel::Two);
        assert_eq!(HeadingLevel::from_number(6), HeadingLevel::Three);
    }

    #[test]
    fn test_only_image_is_void_and_only_link_is_inline() {
        let image = Node::element(
            ElementKind::image("https://example.com/a.png"),
            vec![Node::text("")],
        );
        let link = Node::element(ElementKind::link("https://example.com"), vec![Node::text("site")]);
        let unknown = Node::element(ElementKind::Other("callout".into()), vec![Node::text("x")]);
        let paragraph = Node::paragraph("text");

        assert!(image.is_void());
        assert!(!image.is_inline());
        assert!(link.is_inline());
        assert!(!link.is_void());
        assert!(!paragraph.is_void());
        assert!(!paragraph.is_inline());
        assert!(!unknown.is_void());
        assert!(!unknown.is_inline());
        assert!(!Node::text("leaf").is_void());
    }

    #[test]
    fn test_text_len_counts_characters_and_skips_void() {
        let block = Node::element(
            ElementKind::Paragraph,
            vec![
                Node::text("héllo "),
                Node::element(ElementKind::image("x.png"), vec![Node::text("ignored")]),
                Node::element(ElementKind::link("u"), vec![Node::text("🦀")]),
            ],
        );

        assert_eq!(block.text_len(), 7);
        assert_eq!(block.plain_text(), "héllo 🦀");
    }
}
