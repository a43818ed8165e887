//! Structural elements extracted from a generation stream.
//!
//! The stream carries three element kinds: nodes (text boxes placed on a
//! logical grid), groups (containers holding one level of nodes) and edges
//! (connectors between two elements). [`ParsedElement`] is the tagged union
//! the parser hands to the layout session.
//!
//! Row and column values are *logical* grid coordinates. They are signed and
//! unbounded as parsed; the layout engine clamps and normalizes them.

use std::fmt;

use serde::Deserialize;

use crate::{identifier::Id, span::Span};

/// Display category of a node, taken from its `type` attribute.
///
/// Unknown categories fall back to [`NodeKind::Default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Concept,
    Question,
    Example,
    Detail,
    Summary,
    Note,
    #[default]
    Default,
}

impl NodeKind {
    /// Parses a category name, case-insensitively.
    ///
    /// Returns `None` for names outside the known set so that the caller can
    /// report the fallback.
    ///
    /// # Examples
    ///
    /// ```
    /// # use trellis_core::element::NodeKind;
    /// assert_eq!(NodeKind::parse("Concept"), Some(NodeKind::Concept));
    /// assert_eq!(NodeKind::parse("hologram"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value.trim().to_ascii_lowercase().as_str() {
            "concept" => Self::Concept,
            "question" => Self::Question,
            "example" => Self::Example,
            "detail" => Self::Detail,
            "summary" => Self::Summary,
            "note" => Self::Note,
            "default" => Self::Default,
            _ => return None,
        };
        Some(kind)
    }

    /// The canonical lowercase name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Question => "question",
            Self::Example => "example",
            Self::Detail => "detail",
            Self::Summary => "summary",
            Self::Note => "note",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arrowhead placement of an edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EdgeDirection {
    /// Arrow points at `to`.
    #[default]
    Forward,
    /// Arrow points at `from`.
    Backward,
    /// Arrows at both ends.
    Both,
    /// Plain line.
    None,
}

impl EdgeDirection {
    /// Parses a `dir` attribute value. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        let direction = match value.trim().to_ascii_lowercase().as_str() {
            "forward" => Self::Forward,
            "backward" => Self::Backward,
            "both" => Self::Both,
            "none" => Self::None,
            _ => return None,
        };
        Some(direction)
    }

    /// The canonical lowercase name of the direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Both => "both",
            Self::None => "none",
        }
    }
}

/// A text node placed on the logical grid.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeElement {
    id: Id,
    kind: NodeKind,
    title: Option<String>,
    row: i32,
    col: i32,
    content: String,
    group_id: Option<Id>,
    span: Span,
}

impl NodeElement {
    /// Creates a node with empty content and the fallback category.
    pub fn new(id: Id, row: i32, col: i32) -> Self {
        Self {
            id,
            kind: NodeKind::Default,
            title: None,
            row,
            col,
            content: String::new(),
            group_id: None,
            span: Span::default(),
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_group(mut self, group_id: Option<Id>) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn row(&self) -> i32 {
        self.row
    }

    pub fn col(&self) -> i32 {
        self.col
    }

    /// Body text between the opening and closing tags, as extracted.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The enclosing group, when the node was nested inside one.
    pub fn group_id(&self) -> Option<Id> {
        self.group_id
    }

    /// Location of the whole element in the stream buffer.
    pub fn span(&self) -> Span {
        self.span
    }
}

/// A container with one level of child nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupElement {
    id: Id,
    title: String,
    row: i32,
    col: i32,
    children: Vec<NodeElement>,
    span: Span,
}

impl GroupElement {
    pub fn new(id: Id, title: impl Into<String>, row: i32, col: i32) -> Self {
        Self {
            id,
            title: title.into(),
            row,
            col,
            children: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn with_children(mut self, children: Vec<NodeElement>) -> Self {
        self.children = children;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn row(&self) -> i32 {
        self.row
    }

    pub fn col(&self) -> i32 {
        self.col
    }

    /// Complete child nodes, in stream order.
    pub fn children(&self) -> &[NodeElement] {
        &self.children
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

/// A connector between two elements.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeElement {
    from: Id,
    to: Id,
    direction: EdgeDirection,
    label: Option<String>,
    span: Span,
}

impl EdgeElement {
    pub fn new(from: Id, to: Id) -> Self {
        Self {
            from,
            to,
            direction: EdgeDirection::Forward,
            label: None,
            span: Span::default(),
        }
    }

    pub fn with_direction(mut self, direction: EdgeDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn from(&self) -> Id {
        self.from
    }

    pub fn to(&self) -> Id {
        self.to
    }

    pub fn direction(&self) -> EdgeDirection {
        self.direction
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

/// A complete element extracted from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedElement {
    Node(NodeElement),
    Group(GroupElement),
    Edge(EdgeElement),
}

impl ParsedElement {
    /// Location of the element in the stream buffer.
    pub fn span(&self) -> Span {
        match self {
            Self::Node(node) => node.span(),
            Self::Group(group) => group.span(),
            Self::Edge(edge) => edge.span(),
        }
    }

    /// Short element kind name, used in log output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Group(_) => "group",
            Self::Edge(_) => "edge",
        }
    }
}
