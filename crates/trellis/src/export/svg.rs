//! In-memory host surface with SVG output.

use std::{fs::File, io::Write, path::Path};

use indexmap::IndexMap;
use log::{debug, error, info, trace};
use svg::{Document, node::Text as SvgText, node::element as svg_element};

use trellis_core::{
    color::Color,
    element::{EdgeDirection, EdgeElement, NodeKind},
    geometry::{Bounds, Point, Size},
    identifier::Id,
    text::{TextMeasurer, TextStyle},
};

use crate::{
    config::StyleConfig,
    error::TrellisError,
    host::{HostSurface, NodeRender},
};

/// Inset between a node border and its text.
const NODE_PADDING: f32 = 12.0;
/// Space between a node title and its content.
const TITLE_GAP: f32 = 6.0;
/// Margin around the content in the exported document.
const CANVAS_MARGIN: f32 = 50.0;
const CORNER_RADIUS: f32 = 6.0;
const STROKE_COLOR: &str = "#5f6368";
const MARKER_START_ID: &str = "edge-arrow-start";
const MARKER_END_ID: &str = "edge-arrow-end";

/// Position and size are kept apart so moves never re-derive the size.
#[derive(Debug, Clone)]
struct NodeShape {
    kind: NodeKind,
    title: Option<String>,
    lines: Vec<String>,
    top_left: Point,
    size: Size,
}

impl NodeShape {
    fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.top_left, self.size)
    }
}

#[derive(Debug, Clone)]
struct GroupShape {
    title: String,
    top_left: Point,
    size: Size,
}

impl GroupShape {
    fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.top_left, self.size)
    }
}

/// Records placements from a session and serializes them to SVG.
///
/// Node sizes are computed from real font metrics: content is wrapped to the
/// width the session requests and measured with [`TextMeasurer`].
#[derive(Debug, Default)]
pub struct SvgSurface {
    style: StyleConfig,
    text_style: TextStyle,
    nodes: IndexMap<Id, NodeShape>,
    groups: IndexMap<Id, GroupShape>,
    edges: Vec<EdgeElement>,
    refreshes: usize,
}

impl SvgSurface {
    pub fn new(style: StyleConfig) -> Self {
        Self {
            text_style: style.text_style(),
            style,
            ..Self::default()
        }
    }

    pub fn node_bounds(&self, id: Id) -> Option<Bounds> {
        self.nodes.get(&id).map(NodeShape::bounds)
    }

    /// Size last reported for a node, unaffected by later moves.
    pub fn node_size(&self, id: Id) -> Option<Size> {
        self.nodes.get(&id).map(|node| node.size)
    }

    pub fn group_bounds(&self, id: Id) -> Option<Bounds> {
        self.groups.get(&id).map(GroupShape::bounds)
    }

    /// Content of a node as wrapped for drawing.
    pub fn node_lines(&self, id: Id) -> Option<&[String]> {
        self.nodes.get(&id).map(|node| node.lines.as_slice())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of batched refreshes received.
    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    /// Union of every node and group box, or `None` for an empty surface.
    pub fn content_bounds(&self) -> Option<Bounds> {
        self.groups
            .values()
            .map(GroupShape::bounds)
            .chain(self.nodes.values().map(NodeShape::bounds))
            .reduce(|acc, bounds| acc.merge(&bounds))
    }

    /// Builds the SVG document for the current state.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Config`] if a configured color cannot be parsed.
    pub fn to_document(&self) -> Result<Document, TrellisError> {
        let content = self.content_bounds().unwrap_or_default();
        let width = content.width() + 2.0 * CANVAS_MARGIN;
        let height = content.height() + 2.0 * CANVAS_MARGIN;

        let mut doc = Document::new()
            .set("viewBox", format!("0 0 {width} {height}"))
            .set("width", width)
            .set("height", height);

        if let Some(background) = self.style.background_color().map_err(TrellisError::Config)? {
            doc = doc.add(
                svg_element::Rectangle::new()
                    .set("width", width)
                    .set("height", height)
                    .set("fill", background.to_string())
                    .set("fill-opacity", background.alpha()),
            );
        }
        doc = doc.add(marker_definitions());

        let mut main_group = svg_element::Group::new().set(
            "transform",
            format!(
                "translate({}, {})",
                CANVAS_MARGIN - content.min_x(),
                CANVAS_MARGIN - content.min_y()
            ),
        );
        for group in self.groups.values() {
            main_group = main_group.add(self.render_group_frame(group));
        }
        for edge in &self.edges {
            if let Some(path) = self.render_edge_path(edge) {
                main_group = main_group.add(path);
            }
        }
        for node in self.nodes.values() {
            main_group = main_group.add(self.render_node_box(node)?);
        }

        debug!(width, height; "SVG document rendered");
        Ok(doc.add(main_group))
    }

    /// Serializes the current state to an SVG string.
    pub fn to_svg_string(&self) -> Result<String, TrellisError> {
        Ok(self.to_document()?.to_string())
    }

    /// Writes the current state to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), TrellisError> {
        let path = path.as_ref();
        let doc = self.to_document()?;
        info!(path:? = path; "Creating SVG file");

        let mut file = File::create(path).map_err(|err| {
            error!(path:? = path, err:% = err; "Failed to create SVG file");
            TrellisError::Io(err)
        })?;
        write!(file, "{doc}").map_err(|err| {
            error!(path:? = path, err:% = err; "Failed to write SVG content");
            TrellisError::Io(err)
        })?;
        Ok(())
    }

    fn title_style(&self) -> TextStyle {
        TextStyle::new(
            self.text_style.font_family(),
            self.text_style.font_size().saturating_add(2),
        )
    }

    fn render_group_frame(&self, group: &GroupShape) -> svg_element::Group {
        let bounds = group.bounds();
        let frame = svg_element::Rectangle::new()
            .set("x", bounds.min_x())
            .set("y", bounds.min_y())
            .set("width", group.size.width())
            .set("height", group.size.height())
            .set("fill", "#f8f9fa")
            .set("stroke", STROKE_COLOR)
            .set("stroke-dasharray", "6 4")
            .set("rx", CORNER_RADIUS);

        let title_style = self.title_style();
        let title = svg_element::Text::new("")
            .set("x", bounds.min_x() + NODE_PADDING)
            .set("y", bounds.min_y() + NODE_PADDING)
            .set("dominant-baseline", "hanging")
            .set("font-family", title_style.font_family())
            .set("font-size", title_style.font_size())
            .set("font-weight", "bold")
            .add(SvgText::new(group.title.as_str()));

        svg_element::Group::new().add(frame).add(title)
    }

    fn render_node_box(&self, node: &NodeShape) -> Result<svg_element::Group, TrellisError> {
        let fill = self
            .style
            .node_color(node.kind)
            .map_err(TrellisError::Config)?;
        let bounds = node.bounds();

        let mut group = svg_element::Group::new().add(
            svg_element::Rectangle::new()
                .set("x", bounds.min_x())
                .set("y", bounds.min_y())
                .set("width", node.size.width())
                .set("height", node.size.height())
                .set("fill", &fill)
                .set("fill-opacity", fill.alpha())
                .set("stroke", STROKE_COLOR)
                .set("rx", CORNER_RADIUS),
        );

        let x = bounds.min_x() + NODE_PADDING;
        let mut y = bounds.min_y() + NODE_PADDING;
        if let Some(title) = &node.title {
            let title_style = self.title_style();
            group = group.add(
                svg_element::Text::new("")
                    .set("x", x)
                    .set("y", y)
                    .set("dominant-baseline", "hanging")
                    .set("font-family", title_style.font_family())
                    .set("font-size", title_style.font_size())
                    .set("font-weight", "bold")
                    .add(SvgText::new(title.as_str())),
            );
            y += title_style.line_height() + TITLE_GAP;
        }

        if !node.lines.is_empty() {
            let line_height = self.text_style.line_height();
            let mut text = svg_element::Text::new("")
                .set("x", x)
                .set("y", y - line_height)
                .set("dominant-baseline", "hanging")
                .set("font-family", self.text_style.font_family())
                .set("font-size", self.text_style.font_size());
            for line in &node.lines {
                text = text.add(
                    svg_element::TSpan::new("")
                        .set("x", x)
                        .set("dy", line_height)
                        .add(SvgText::new(line.as_str())),
                );
            }
            group = group.add(text);
        }

        Ok(group)
    }

    fn element_bounds(&self, id: Id) -> Option<Bounds> {
        self.node_bounds(id).or_else(|| self.group_bounds(id))
    }

    fn render_edge_path(&self, edge: &EdgeElement) -> Option<svg_element::Group> {
        let source = self.element_bounds(edge.from())?;
        let target = self.element_bounds(edge.to())?;
        let start = boundary_point(source, target.center());
        let end = boundary_point(target, source.center());

        let mut path = svg_element::Path::new()
            .set(
                "d",
                format!("M {} {} L {} {}", start.x(), start.y(), end.x(), end.y()),
            )
            .set("fill", "none")
            .set("stroke", STROKE_COLOR)
            .set("stroke-width", 1.5);
        if matches!(edge.direction(), EdgeDirection::Backward | EdgeDirection::Both) {
            path = path.set("marker-start", format!("url(#{MARKER_START_ID})"));
        }
        if matches!(edge.direction(), EdgeDirection::Forward | EdgeDirection::Both) {
            path = path.set("marker-end", format!("url(#{MARKER_END_ID})"));
        }

        let mut group = svg_element::Group::new().add(path);
        if let Some(label) = edge.label() {
            group = group.add(
                svg_element::Text::new("")
                    .set("x", (start.x() + end.x()) / 2.0)
                    .set("y", (start.y() + end.y()) / 2.0)
                    .set("text-anchor", "middle")
                    .set("dominant-baseline", "central")
                    .set("font-family", self.text_style.font_family())
                    .set("font-size", self.text_style.font_size())
                    .add(SvgText::new(label)),
            );
        }
        Some(group)
    }
}

impl HostSurface for SvgSurface {
    fn render_node(&mut self, node: &NodeRender<'_>) -> Size {
        let measurer = TextMeasurer::global();
        let inner_width = (node.width - 2.0 * NODE_PADDING).max(1.0);
        let lines = wrap_lines(measurer, node.content, &self.text_style, inner_width);

        let title_height = node
            .title
            .map(|_| self.title_style().line_height() + TITLE_GAP)
            .unwrap_or(0.0);
        let size = Size::new(
            node.width,
            2.0 * NODE_PADDING + title_height + lines.len() as f32 * self.text_style.line_height(),
        );

        debug!(id:% = node.id, lines = lines.len(), height = size.height(); "Node rendered");
        self.nodes.insert(
            node.id,
            NodeShape {
                kind: node.kind,
                title: node.title.map(str::to_string),
                lines,
                top_left: node.position,
                size,
            },
        );
        size
    }

    fn render_group(&mut self, id: Id, title: &str, bounds: Bounds) {
        self.groups.insert(
            id,
            GroupShape {
                title: title.to_string(),
                top_left: bounds.min_point(),
                size: bounds.to_size(),
            },
        );
    }

    fn render_edge(&mut self, edge: &EdgeElement) {
        self.edges.push(edge.clone());
    }

    fn move_element(&mut self, id: Id, position: Point) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.top_left = position;
        } else if let Some(group) = self.groups.get_mut(&id) {
            group.top_left = position;
        }
    }

    fn remove_element(&mut self, id: Id) {
        self.nodes.shift_remove(&id);
        self.groups.shift_remove(&id);
        self.edges
            .retain(|edge| edge.from() != id && edge.to() != id);
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
        trace!(refreshes = self.refreshes; "Surface refreshed");
    }
}

/// Greedy word wrap of `text` at `max_width`, keeping explicit line breaks.
fn wrap_lines(
    measurer: &TextMeasurer,
    text: &str,
    style: &TextStyle,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measurer.measure(&candidate, style, None).width() <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
    }
    lines
}

/// Point where the segment from the center of `bounds` toward `toward` leaves the box.
fn boundary_point(bounds: Bounds, toward: Point) -> Point {
    let origin = bounds.center();
    let delta = toward.sub_point(origin);
    if delta.is_zero() {
        return origin;
    }

    let half_width = bounds.width() / 2.0;
    let half_height = bounds.height() / 2.0;
    let scale_x = if delta.x() == 0.0 { f32::INFINITY } else { half_width / delta.x().abs() };
    let scale_y = if delta.y() == 0.0 { f32::INFINITY } else { half_height / delta.y().abs() };
    let scale = scale_x.min(scale_y).min(1.0);

    Point::new(origin.x() + delta.x() * scale, origin.y() + delta.y() * scale)
}

fn marker_definitions() -> svg_element::Definitions {
    let color = Color::new(STROKE_COLOR).unwrap_or_default();
    svg_element::Definitions::new()
        .add(arrow_marker(MARKER_END_ID, "M 0 0 L 10 5 L 0 10 z", 9, color))
        .add(arrow_marker(MARKER_START_ID, "M 10 0 L 0 5 L 10 10 z", 1, color))
}

fn arrow_marker(id: &str, shape: &str, ref_x: u8, color: Color) -> svg_element::Marker {
    svg_element::Marker::new()
        .set("id", id)
        .set("viewBox", "0 0 10 10")
        .set("refX", ref_x)
        .set("refY", 5)
        .set("markerWidth", 6)
        .set("markerHeight", 6)
        .set("orient", "auto")
        .add(
            svg_element::Path::new()
                .set("d", shape)
                .set("fill", color.to_string())
                .set("fill-opacity", color.alpha()),
        )
}
