//! Incremental extraction of elements from an append-only stream buffer.
//!
//! [`StreamTagParser`] owns the raw text received so far and a processed
//! cursor. Every detection call rescans from the cursor, so chunk boundaries
//! may fall anywhere, including inside tag names or attribute values.
//!
//! A complete element is emitted exactly once. Emitting moves the cursor to
//! the element's end; elements that are malformed or lack required attributes
//! are reported once and skipped without moving the cursor.

use std::collections::{HashSet, VecDeque};

use log::{debug, trace};

use trellis_core::{
    element::{EdgeDirection, EdgeElement, GroupElement, NodeElement, NodeKind, ParsedElement},
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    identifier::Id,
    span::Span,
};

use crate::tag::{self, Attributes, Scan, Tag, TagKind, TagName};

/// Where the body of an element with content ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyEnd {
    /// `content_end` is the start of the closing tag, `end` is just past it.
    Closed { content_end: usize, end: usize },
    /// Another element tag starts at `at` before any closing tag.
    Interrupted { at: usize },
    /// The buffer ends first; content runs to `content_end`.
    Pending { content_end: usize },
}

/// Outcome of consuming one tag during a scan.
enum Step {
    Continue(usize),
    Wait,
}

/// Incremental parser for one streaming session.
///
/// # Examples
///
/// ```
/// # use trellis_parser::StreamTagParser;
/// let mut parser = StreamTagParser::new();
/// parser.append(r#"<node id="n1" type="concept" row="0" col="0">Content text</"#);
/// assert!(parser.detect_complete_nodes().is_empty());
///
/// parser.append("node>");
/// let nodes = parser.detect_complete_nodes();
/// assert_eq!(nodes.len(), 1);
/// assert_eq!(nodes[0].content(), "Content text");
/// ```
#[derive(Debug, Default)]
pub struct StreamTagParser {
    buffer: String,
    processed_length: usize,
    /// Complete elements found by a scan but not yet handed out.
    ready: VecDeque<ParsedElement>,
    /// Start offsets of skipped matches that were already reported.
    reported: HashSet<usize>,
    finished: bool,
    diagnostics: DiagnosticCollector,
}

impl StreamTagParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk to the buffer. No scanning happens here.
    pub fn append(&mut self, chunk: &str) {
        trace!(len = chunk.len(), total = self.buffer.len() + chunk.len(); "Appending chunk");
        self.buffer.push_str(chunk);
    }

    /// The full text received so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// End offset of the last emitted element. Never decreases.
    pub fn processed_length(&self) -> usize {
        self.processed_length
    }

    /// Text after the processed cursor.
    pub fn unprocessed(&self) -> &str {
        &self.buffer[self.processed_length..]
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Every newly completed element, in document order.
    pub fn detect_complete(&mut self) -> Vec<ParsedElement> {
        self.scan();
        std::mem::take(&mut self.ready).into()
    }

    /// Newly completed nodes. Other kinds found by the same scan stay queued.
    pub fn detect_complete_nodes(&mut self) -> Vec<NodeElement> {
        self.scan();
        self.drain_ready(|element| match element {
            ParsedElement::Node(node) => Ok(node),
            other => Err(other),
        })
    }

    /// Newly completed groups, with their complete children.
    pub fn detect_complete_groups(&mut self) -> Vec<GroupElement> {
        self.scan();
        self.drain_ready(|element| match element {
            ParsedElement::Group(group) => Ok(group),
            other => Err(other),
        })
    }

    pub fn detect_complete_edges(&mut self) -> Vec<EdgeElement> {
        self.scan();
        self.drain_ready(|element| match element {
            ParsedElement::Edge(edge) => Ok(edge),
            other => Err(other),
        })
    }

    /// Best-effort snapshot of the node currently being streamed.
    ///
    /// Looks only at the unprocessed tail. Returns `None` when no node body is
    /// open or when its opening tag lacks a required attribute.
    pub fn detect_incomplete_node(&self) -> Option<NodeElement> {
        let (open, content_end) = tag::tags_between(&self.buffer, self.processed_length, self.buffer.len())
            .filter(|tag| tag.is_open_with_body(TagName::Node))
            .filter_map(|tag| match find_body_end(&self.buffer, tag.end) {
                BodyEnd::Pending { content_end } => Some((tag, content_end)),
                _ => None,
            })
            .last()?;

        let content = &self.buffer[open.end..content_end];
        let span = Span::new(open.start..content_end);
        build_node(&open, content, span, self.enclosing_group_id(open.start), &mut Vec::new())
    }

    /// Best-effort snapshot of the group currently being streamed.
    ///
    /// The group's children are the nodes already complete inside it.
    pub fn detect_incomplete_group(&self) -> Option<GroupElement> {
        let mut depth = 0usize;
        let mut open_group: Option<Tag> = None;
        for tag in tag::tags_between(&self.buffer, self.processed_length, self.buffer.len()) {
            if tag.is_open_with_body(TagName::Group) {
                depth += 1;
                if depth == 1 {
                    open_group = Some(tag);
                }
            } else if tag.is_close(TagName::Group) && depth > 0 {
                depth -= 1;
                if depth == 0 {
                    open_group = None;
                }
            }
        }

        let open = open_group?;
        let span = Span::new(open.start..self.buffer.len());
        let group = build_group(&open, span, &mut Vec::new())?;
        let children = self.group_children(open.end, self.buffer.len(), group.id());
        Some(group.with_children(children))
    }

    /// Marks the end of the stream and returns the elements it completes.
    ///
    /// Body-less edges waiting for a possible `</edge>` are emitted, and any
    /// element still open is reported as malformed.
    pub fn finish(&mut self) -> Vec<ParsedElement> {
        self.finished = true;
        self.scan();

        if let (1.., Some(open)) = self.open_group_before(self.buffer.len()) {
            let diag = Diagnostic::error("group is never closed")
                .with_code(ErrorCode::E100)
                .with_label(Span::new(open.start..open.end), "group opened here")
                .with_help("add `</group>` after the group's last node");
            self.report_once(open.start, vec![diag]);
        }

        std::mem::take(&mut self.ready).into()
    }

    /// Diagnostics raised so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    /// Removes and returns the diagnostics raised so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    /// Id of the group whose body is open at byte offset `at`.
    pub fn enclosing_group_id(&self, at: usize) -> Option<Id> {
        let (_, open) = self.open_group_before(at);
        open.and_then(|tag| tag.attributes.get_non_empty("id").map(Id::new))
    }

    fn scan(&mut self) {
        let mut pos = self.processed_length;
        while let Some(relative) = self.buffer[pos..].find('<') {
            let start = pos + relative;
            match tag::scan_tag(&self.buffer, start) {
                Scan::Text => pos = start + 1,
                Scan::Partial => {
                    if self.finished && self.buffer.len() - start > 1 {
                        let diag = Diagnostic::error("stream ended inside a tag")
                            .with_code(ErrorCode::E100)
                            .with_label(Span::new(start..self.buffer.len()), "truncated tag");
                        self.report_once(start, vec![diag]);
                    }
                    break;
                }
                Scan::Malformed { end, reason } => {
                    let diag = Diagnostic::error(format!("malformed tag: {reason}"))
                        .with_code(ErrorCode::E100)
                        .with_label(Span::new(start..end), "skipped");
                    self.report_once(start, vec![diag]);
                    pos = end.max(start + 1);
                }
                Scan::Tag(tag) => match self.consume(tag) {
                    Step::Continue(next) => pos = next,
                    Step::Wait => break,
                },
            }
        }
        trace!(cursor = self.processed_length, stopped_at = pos; "Scan finished");
    }

    fn consume(&mut self, tag: Tag) -> Step {
        match (tag.name, tag.kind.clone()) {
            (TagName::Node, TagKind::Open { self_closing: true }) => {
                self.complete_node(&tag, tag.end, tag.end);
                Step::Continue(tag.end)
            }
            (TagName::Node, TagKind::Open { .. }) => match find_body_end(&self.buffer, tag.end) {
                BodyEnd::Closed { content_end, end } => {
                    self.complete_node(&tag, content_end, end);
                    Step::Continue(end)
                }
                BodyEnd::Interrupted { at } => {
                    let diag = Diagnostic::error("node is not closed before the next tag")
                        .with_code(ErrorCode::E100)
                        .with_label(Span::new(tag.start..tag.end), "node opened here")
                        .with_secondary_label(Span::new(at..at), "next tag starts here")
                        .with_help("close the node with `</node>`");
                    self.report_once(tag.start, vec![diag]);
                    Step::Continue(at)
                }
                BodyEnd::Pending { .. } if self.finished => {
                    let diag = Diagnostic::error("stream ended inside a node")
                        .with_code(ErrorCode::E100)
                        .with_label(Span::new(tag.start..tag.end), "node opened here");
                    self.report_once(tag.start, vec![diag]);
                    Step::Continue(self.buffer.len())
                }
                BodyEnd::Pending { .. } => Step::Wait,
            },
            (TagName::Group, TagKind::Open { self_closing: true }) => {
                self.complete_group(&tag, tag.end, tag.end);
                Step::Continue(tag.end)
            }
            (TagName::Group, TagKind::Open { .. }) => {
                if let (1.., Some(outer)) = self.open_group_before(tag.start) {
                    let diag = Diagnostic::error("groups cannot be nested")
                        .with_code(ErrorCode::E100)
                        .with_label(Span::new(tag.start..tag.end), "nested group ignored")
                        .with_secondary_label(Span::new(outer.start..outer.end), "outer group");
                    self.report_once(tag.start, vec![diag]);
                }
                Step::Continue(tag.end)
            }
            (TagName::Group, TagKind::Close) => {
                match self.open_group_before(tag.start) {
                    (1, Some(open)) => self.complete_group(&open, tag.start, tag.end),
                    (0, _) => self.report_stray_close(&tag),
                    // Closes a nested group that was already reported.
                    _ => {}
                }
                Step::Continue(tag.end)
            }
            (TagName::Edge, TagKind::Open { self_closing: true }) => {
                self.complete_edge(&tag, tag.end);
                Step::Continue(tag.end)
            }
            (TagName::Edge, TagKind::Open { .. }) => match self.edge_end(tag.end) {
                Some(end) => {
                    self.complete_edge(&tag, end);
                    Step::Continue(end)
                }
                None => Step::Wait,
            },
            (TagName::Node | TagName::Edge, TagKind::Close) => {
                self.report_stray_close(&tag);
                Step::Continue(tag.end)
            }
        }
    }

    fn complete_node(&mut self, open: &Tag, content_end: usize, end: usize) {
        let mut issues = Vec::new();
        let content = &self.buffer[open.end..content_end];
        let span = Span::new(open.start..end);
        let group = self.enclosing_group_id(open.start);
        match build_node(open, content, span, group, &mut issues) {
            Some(node) => {
                self.report_all(issues);
                self.emit(ParsedElement::Node(node), end);
            }
            None => self.report_once(open.start, issues),
        }
    }

    fn complete_group(&mut self, open: &Tag, body_end: usize, end: usize) {
        let mut issues = Vec::new();
        let span = Span::new(open.start..end);
        match build_group(open, span, &mut issues) {
            Some(group) => {
                let children = self.group_children(open.end, body_end, group.id());
                self.report_all(issues);
                self.emit(ParsedElement::Group(group.with_children(children)), end);
            }
            None => self.report_once(open.start, issues),
        }
    }

    fn complete_edge(&mut self, open: &Tag, end: usize) {
        let mut issues = Vec::new();
        let span = Span::new(open.start..end);
        match build_edge(open, span, &mut issues) {
            Some(edge) => {
                self.report_all(issues);
                self.emit(ParsedElement::Edge(edge), end);
            }
            None => self.report_once(open.start, issues),
        }
    }

    /// End of an edge written with a body. `None` means wait for more input.
    fn edge_end(&self, from: usize) -> Option<usize> {
        let mut pos = from;
        while let Some(relative) = self.buffer[pos..].find('<') {
            let start = pos + relative;
            match tag::scan_tag(&self.buffer, start) {
                Scan::Text => pos = start + 1,
                Scan::Tag(close) if close.is_close(TagName::Edge) => return Some(close.end),
                Scan::Partial if !self.finished => return None,
                // Any other tag ends a body-less edge at its opening tag.
                _ => return Some(from),
            }
        }
        self.finished.then_some(from)
    }

    /// Complete child nodes in `buffer[from..to]`, parsed without reporting.
    fn group_children(&self, from: usize, to: usize, group_id: Id) -> Vec<NodeElement> {
        let scope = &self.buffer[..to];
        tag::tags_between(scope, from, to)
            .filter(|tag| tag.is_open(TagName::Node))
            .filter_map(|open| {
                let (content_end, end) = match open.kind {
                    TagKind::Open { self_closing: true } => (open.end, open.end),
                    _ => match find_body_end(scope, open.end) {
                        BodyEnd::Closed { content_end, end } => (content_end, end),
                        _ => return None,
                    },
                };
                let content = &scope[open.end..content_end];
                let span = Span::new(open.start..end);
                build_node(&open, content, span, Some(group_id), &mut Vec::new())
            })
            .collect()
    }

    /// Nesting depth and outermost open group tag at byte offset `at`.
    fn open_group_before(&self, at: usize) -> (usize, Option<Tag>) {
        let mut depth = 0usize;
        let mut outer = None;
        for tag in tag::tags_between(&self.buffer, 0, at) {
            if tag.is_open_with_body(TagName::Group) {
                depth += 1;
                if depth == 1 {
                    outer = Some(tag);
                }
            } else if tag.is_close(TagName::Group) && depth > 0 {
                depth -= 1;
                if depth == 0 {
                    outer = None;
                }
            }
        }
        (depth, outer)
    }

    fn emit(&mut self, element: ParsedElement, end: usize) {
        debug!(
            kind = element.kind_name(),
            start = element.span().start(),
            end = end;
            "Detected complete element"
        );
        self.ready.push_back(element);
        self.processed_length = self.processed_length.max(end);
    }

    fn report_stray_close(&mut self, tag: &Tag) {
        let diag = Diagnostic::error("closing tag without a matching opening tag")
            .with_code(ErrorCode::E100)
            .with_label(Span::new(tag.start..tag.end), "stray closing tag");
        self.report_once(tag.start, vec![diag]);
    }

    fn report_all(&mut self, issues: Vec<Diagnostic>) {
        for diag in issues {
            self.diagnostics.emit(diag);
        }
    }

    /// Reports `issues` unless the match starting at `key` was reported before.
    fn report_once(&mut self, key: usize, issues: Vec<Diagnostic>) {
        if self.reported.insert(key) {
            self.report_all(issues);
        }
    }

    fn drain_ready<T>(&mut self, pick: impl Fn(ParsedElement) -> Result<T, ParsedElement>) -> Vec<T> {
        let mut picked = Vec::new();
        let mut remaining = VecDeque::new();
        for element in std::mem::take(&mut self.ready) {
            match pick(element) {
                Ok(value) => picked.push(value),
                Err(element) => remaining.push_back(element),
            }
        }
        self.ready = remaining;
        picked
    }
}

fn find_body_end(buffer: &str, from: usize) -> BodyEnd {
    let mut pos = from;
    while let Some(relative) = buffer[pos..].find('<') {
        let start = pos + relative;
        match tag::scan_tag(buffer, start) {
            Scan::Text => pos = start + 1,
            Scan::Tag(close) if close.is_close(TagName::Node) => {
                return BodyEnd::Closed {
                    content_end: start,
                    end: close.end,
                };
            }
            Scan::Tag(_) | Scan::Malformed { .. } => return BodyEnd::Interrupted { at: start },
            Scan::Partial => return BodyEnd::Pending { content_end: start },
        }
    }
    BodyEnd::Pending {
        content_end: buffer.len(),
    }
}

fn tag_span(tag: &Tag) -> Span {
    Span::new(tag.start..tag.end)
}

fn required<'a>(
    attributes: &'a Attributes,
    name: &str,
    element: &str,
    tag: &Tag,
    issues: &mut Vec<Diagnostic>,
) -> Option<&'a str> {
    let value = attributes.get_non_empty(name);
    if value.is_none() {
        issues.push(
            Diagnostic::error(format!("{element} is missing required attribute `{name}`"))
                .with_code(ErrorCode::E101)
                .with_label(tag_span(tag), format!("{element} dropped"))
                .with_help(format!("add `{name}=\"...\"` to the opening tag")),
        );
    }
    value
}

fn coordinate(
    attributes: &Attributes,
    name: &str,
    element: &str,
    tag: &Tag,
    issues: &mut Vec<Diagnostic>,
) -> Option<i32> {
    let value = required(attributes, name, element, tag, issues)?;
    match value.parse::<i64>() {
        Ok(parsed) => Some(parsed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32),
        Err(_) => {
            issues.push(
                Diagnostic::error(format!("`{name}` must be an integer, found `{value}`"))
                    .with_code(ErrorCode::E102)
                    .with_label(tag_span(tag), format!("{element} dropped")),
            );
            None
        }
    }
}

fn build_node(
    open: &Tag,
    content: &str,
    span: Span,
    group: Option<Id>,
    issues: &mut Vec<Diagnostic>,
) -> Option<NodeElement> {
    let attributes = &open.attributes;
    let id = required(attributes, "id", "node", open, issues);
    let row = coordinate(attributes, "row", "node", open, issues);
    let col = coordinate(attributes, "col", "node", open, issues);
    let (id, row, col) = (id?, row?, col?);

    let kind = match attributes.get_non_empty("type") {
        None => NodeKind::Default,
        Some(name) => NodeKind::parse(name).unwrap_or_else(|| {
            issues.push(
                Diagnostic::warning(format!("unknown node type `{name}`, using `default`"))
                    .with_code(ErrorCode::E103)
                    .with_label(tag_span(open), "unknown type"),
            );
            NodeKind::Default
        }),
    };

    Some(
        NodeElement::new(Id::new(id), row, col)
            .with_kind(kind)
            .with_title(attributes.get_non_empty("title").map(str::to_string))
            .with_content(content)
            .with_group(group)
            .with_span(span),
    )
}

fn build_group(open: &Tag, span: Span, issues: &mut Vec<Diagnostic>) -> Option<GroupElement> {
    let attributes = &open.attributes;
    let id = required(attributes, "id", "group", open, issues);
    let row = coordinate(attributes, "row", "group", open, issues);
    let col = coordinate(attributes, "col", "group", open, issues);
    let (id, row, col) = (id?, row?, col?);
    let title = attributes.get("title").map(str::trim).unwrap_or_default();

    Some(GroupElement::new(Id::new(id), title, row, col).with_span(span))
}

fn build_edge(open: &Tag, span: Span, issues: &mut Vec<Diagnostic>) -> Option<EdgeElement> {
    let attributes = &open.attributes;
    let from = required(attributes, "from", "edge", open, issues);
    let to = required(attributes, "to", "edge", open, issues);
    let (from, to) = (from?, to?);

    let direction = match attributes.get_non_empty("dir") {
        None => EdgeDirection::default(),
        Some(value) => EdgeDirection::parse(value).unwrap_or_else(|| {
            issues.push(
                Diagnostic::warning(format!("unknown edge direction `{value}`, using `forward`"))
                    .with_code(ErrorCode::E102)
                    .with_label(tag_span(open), "invalid `dir`")
                    .with_help("use one of `forward`, `backward`, `both` or `none`"),
            );
            EdgeDirection::default()
        }),
    };

    Some(
        EdgeElement::new(Id::new(from), Id::new(to))
            .with_direction(direction)
            .with_label(attributes.get_non_empty("label").map(str::to_string))
            .with_span(span),
    )
}
