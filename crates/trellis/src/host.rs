//! The rendering surface a session draws onto.

use trellis_core::{
    element::{EdgeElement, NodeKind},
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

/// Everything a host needs to draw or redraw one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRender<'a> {
    pub id: Id,
    pub kind: NodeKind,
    pub title: Option<&'a str>,
    /// Prepared content: sanitized and dedented.
    pub content: &'a str,
    /// Absolute top-left corner.
    pub position: Point,
    /// Width the host should wrap content at.
    pub width: f32,
}

/// Host-side collaborator of a streaming session.
///
/// The session never measures content itself. It asks the host to draw a
/// node and reacts to the size the host reports. All coordinates are
/// absolute canvas pixels.
pub trait HostSurface {
    /// Draws `node`, or redraws it if its id is already on the surface, and
    /// returns its true rendered size.
    fn render_node(&mut self, node: &NodeRender<'_>) -> Size;

    /// Draws or redraws a group frame.
    fn render_group(&mut self, id: Id, title: &str, bounds: Bounds);

    /// Draws a connector between two elements that are already on the surface.
    fn render_edge(&mut self, edge: &EdgeElement);

    /// Moves an element's top-left corner to `position`.
    fn move_element(&mut self, id: Id, position: Point);

    /// Removes an element and any connectors attached to it.
    fn remove_element(&mut self, id: Id);

    /// Confirms a batch of changes. Called once per processed chunk.
    fn refresh(&mut self) {}
}
