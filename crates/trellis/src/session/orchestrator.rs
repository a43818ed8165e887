//! Glue between the stream parser, the containers and the host surface.

use indexmap::IndexMap;
use log::{debug, info, trace};

use trellis_core::{
    element::{EdgeElement, GroupElement, NodeElement, NodeKind, ParsedElement},
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    geometry::{Bounds, Point, Size},
    identifier::Id,
    span::Span,
};
use trellis_parser::{StreamTagParser, prepare_content};

use crate::{
    config::LayoutConfig,
    host::{HostSurface, NodeRender},
    layout::{Container, ContainerBounds, InboundSide, LayoutChanges},
    session::resolver::{DependencyResolver, Pending},
};

/// Where a session draws on the host canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionOptions {
    origin: Point,
    inbound: InboundSide,
}

impl SessionOptions {
    /// Session whose root container is anchored at `origin`.
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            inbound: InboundSide::None,
        }
    }

    /// Side of the root container an inbound connector attaches to.
    pub fn with_inbound(mut self, inbound: InboundSide) -> Self {
        self.inbound = inbound;
        self
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn inbound(&self) -> InboundSide {
        self.inbound
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Root,
    Group(Id),
}

#[derive(Debug, Clone)]
struct NodeRecord {
    kind: NodeKind,
    title: Option<String>,
    content: String,
    parent: Parent,
    span: Span,
    /// `false` while the node is an in-progress preview.
    complete: bool,
}

#[derive(Debug, Clone)]
struct GroupState {
    container: Container,
    title: String,
    /// Displacement of the group frame from its locked anchor.
    offset: Point,
    span: Span,
    complete: bool,
}

/// One streaming session: everything parsed and placed for one stream.
///
/// Each chunk passed to [`feed`](Self::feed) is processed to completion,
/// including every cascade it triggers, and ends with a single
/// [`HostSurface::refresh`].
#[derive(Debug)]
pub struct Session {
    config: LayoutConfig,
    parser: StreamTagParser,
    root: Container,
    nodes: IndexMap<Id, NodeRecord>,
    groups: IndexMap<Id, GroupState>,
    edges: Vec<EdgeElement>,
    resolver: DependencyResolver,
    diagnostics: DiagnosticCollector,
    created: Vec<Id>,
    finishing: bool,
}

impl Session {
    pub fn new(config: LayoutConfig, options: SessionOptions) -> Self {
        info!(
            x = options.origin().x(),
            y = options.origin().y(),
            inbound:? = options.inbound();
            "Starting session",
        );
        Self {
            root: Container::new(options.origin(), options.inbound(), config.clone()),
            config,
            parser: StreamTagParser::new(),
            nodes: IndexMap::new(),
            groups: IndexMap::new(),
            edges: Vec::new(),
            resolver: DependencyResolver::new(),
            diagnostics: DiagnosticCollector::new(),
            created: Vec::new(),
            finishing: false,
        }
    }

    /// Appends a chunk and draws everything it makes available.
    ///
    /// Returns the ids of nodes and groups that appeared on the surface for
    /// the first time, previews included.
    pub fn feed(&mut self, chunk: &str, host: &mut impl HostSurface) -> Vec<Id> {
        trace!(bytes = chunk.len(); "Feeding chunk");
        self.parser.append(chunk);

        if let Some(group) = self.parser.detect_incomplete_group() {
            self.preview_group(group, host);
        }
        for element in self.parser.detect_complete() {
            self.consume(element, host);
        }
        if let Some(node) = self.parser.detect_incomplete_node() {
            self.preview_node(node, host);
        }

        self.absorb_parser_diagnostics();
        host.refresh();
        std::mem::take(&mut self.created)
    }

    /// Ends the stream.
    ///
    /// Trailing complete elements are drawn. Nodes whose group never arrived
    /// are placed at the top level; edges whose endpoints never arrived are
    /// dropped. Both are reported as unresolved references.
    pub fn finish(&mut self, host: &mut impl HostSurface) -> Vec<Id> {
        for element in self.parser.finish() {
            self.consume(element, host);
        }
        self.absorb_parser_diagnostics();
        self.finishing = true;

        let (orphans, edges): (Vec<_>, Vec<_>) = self
            .resolver
            .drain()
            .into_iter()
            .partition(|pending| matches!(pending, Pending::Node(_)));

        for pending in orphans.into_iter().chain(edges) {
            match pending {
                Pending::Node(node) => {
                    if let Some(group_id) = node.group_id() {
                        self.diagnostics.emit(
                            Diagnostic::warning(format!(
                                "group `{group_id}` of node `{}` never arrived",
                                node.id()
                            ))
                            .with_code(ErrorCode::E202)
                            .with_label(node.span(), "placed at the top level instead"),
                        );
                    }
                    self.complete_node(node.with_group(None), host);
                }
                Pending::Edge(edge) => self.add_edge(edge, host),
            }
        }

        host.refresh();
        info!(
            nodes = self.nodes.len(),
            groups = self.groups.len(),
            edges = self.edges.len(),
            diagnostics = self.diagnostics.diagnostics().len();
            "Session finished",
        );
        std::mem::take(&mut self.created)
    }

    /// Places a node at the top level, outside the stream.
    ///
    /// Returns the node's top-left corner. An id that is already in use is
    /// reported and the existing element's position is returned.
    pub fn create_element(
        &mut self,
        id: Id,
        row: i32,
        col: i32,
        content: &str,
        host: &mut impl HostSurface,
    ) -> Point {
        if let Some(position) = self.element_position(id) {
            self.diagnostics.emit(
                Diagnostic::error(format!("element id `{id}` is already in use"))
                    .with_code(ErrorCode::E104),
            );
            return position;
        }

        let node = NodeElement::new(id, row, col).with_content(content);
        self.place_node(&node, true, host);
        self.created.retain(|&created| created != id);
        self.release(id, host);
        host.refresh();
        self.element_position(id).unwrap_or_default()
    }

    /// Replaces a node's content and settles the layout around its new size.
    ///
    /// Returns `false` if `id` is not a node.
    pub fn update_element_content(
        &mut self,
        id: Id,
        content: &str,
        host: &mut impl HostSurface,
    ) -> bool {
        let updated = self.update_content(id, prepare_content(content), host);
        if updated {
            host.refresh();
        }
        updated
    }

    /// Bounds of the root container.
    pub fn container_bounds(&self) -> ContainerBounds {
        self.root.bounds()
    }

    /// Absolute bounds of a group frame.
    pub fn group_bounds(&self, id: Id) -> Option<Bounds> {
        self.root.member_bounds(id).filter(|_| self.groups.contains_key(&id))
    }

    /// Absolute bounds of a node or group.
    pub fn element_bounds(&self, id: Id) -> Option<Bounds> {
        if self.groups.contains_key(&id) {
            return self.root.member_bounds(id);
        }
        let record = self.nodes.get(&id)?;
        match record.parent {
            Parent::Root => self.root.member_bounds(id),
            Parent::Group(group_id) => {
                let state = self.groups.get(&group_id)?;
                Some(state.container.member_bounds(id)?.translate(state.offset))
            }
        }
    }

    pub fn element_position(&self, id: Id) -> Option<Point> {
        self.element_bounds(id).map(Bounds::min_point)
    }

    /// Prepared content of a node.
    pub fn node_content(&self, id: Id) -> Option<&str> {
        self.nodes.get(&id).map(|record| record.content.as_str())
    }

    /// Whether `id` is drawn and its closing tag has arrived.
    pub fn is_complete(&self, id: Id) -> bool {
        self.nodes.get(&id).map(|record| record.complete).unwrap_or(false)
            || self.groups.get(&id).map(|state| state.complete).unwrap_or(false)
    }

    /// Ids of all drawn nodes and groups.
    pub fn element_ids(&self) -> Vec<Id> {
        self.groups.keys().chain(self.nodes.keys()).copied().collect()
    }

    pub fn element_count(&self) -> usize {
        self.nodes.len() + self.groups.len()
    }

    pub fn edges(&self) -> &[EdgeElement] {
        &self.edges
    }

    /// Elements parked behind a reference that does not exist yet.
    pub fn pending_count(&self) -> usize {
        self.resolver.len()
    }

    /// The raw stream received so far.
    pub fn source(&self) -> &str {
        self.parser.buffer()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    pub fn diagnostic_collector_mut(&mut self) -> &mut DiagnosticCollector {
        &mut self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    fn absorb_parser_diagnostics(&mut self) {
        let parsed = self.parser.take_diagnostics();
        self.diagnostics.absorb(parsed);
    }

    fn exists(&self, id: Id) -> bool {
        self.nodes.contains_key(&id) || self.groups.contains_key(&id)
    }

    fn consume(&mut self, element: ParsedElement, host: &mut dyn HostSurface) {
        match element {
            ParsedElement::Node(node) => self.complete_node(node, host),
            ParsedElement::Group(group) => self.complete_group(group, host),
            ParsedElement::Edge(edge) => self.add_edge(edge, host),
        }
    }

    fn report_duplicate(&mut self, id: Id, span: Span, first: Option<Span>) {
        let mut diag = Diagnostic::error(format!("element id `{id}` is already in use"))
            .with_code(ErrorCode::E104)
            .with_label(span, "duplicate dropped");
        if let Some(first) = first {
            diag = diag.with_secondary_label(first, "first defined here");
        }
        self.diagnostics.emit(diag);
    }

    fn complete_node(&mut self, node: NodeElement, host: &mut dyn HostSurface) {
        let id = node.id();
        if let Some(group) = self.groups.get(&id) {
            let first = group.span;
            self.report_duplicate(id, node.span(), Some(first));
            return;
        }

        match self.nodes.get(&id) {
            Some(record) if record.span.start() != node.span().start() => {
                let first = record.span;
                self.report_duplicate(id, node.span(), Some(first));
            }
            Some(record) if record.complete => {}
            Some(_) => self.finalize_node(node, host),
            None => self.resolve_node(node, host),
        }
    }

    /// Draws a node now, or parks it until its group exists.
    fn resolve_node(&mut self, node: NodeElement, host: &mut dyn HostSurface) {
        if let Some(group_id) = node.group_id() {
            if !self.groups.contains_key(&group_id) {
                match self.resolver.defer(group_id, Pending::Node(node)) {
                    Ok(()) => {}
                    Err(Pending::Node(node)) => self.resolve_node(node.with_group(None), host),
                    Err(Pending::Edge(edge)) => self.add_edge(edge, host),
                }
                return;
            }
        }

        let id = node.id();
        self.place_node(&node, true, host);
        self.release(id, host);
    }

    fn finalize_node(&mut self, node: NodeElement, host: &mut dyn HostSurface) {
        let id = node.id();
        if let Some(record) = self.nodes.get_mut(&id) {
            record.complete = true;
            record.span = node.span();
        }
        debug!(id:% = id; "Preview finalized");
        self.update_content(id, prepare_content(node.content()), host);
    }

    fn preview_node(&mut self, node: NodeElement, host: &mut dyn HostSurface) {
        let id = node.id();
        if self.groups.contains_key(&id) {
            return;
        }

        match self.nodes.get(&id) {
            Some(record) if record.complete || record.span.start() != node.span().start() => {}
            Some(_) => {
                self.update_content(id, prepare_content(node.content()), host);
            }
            None => {
                let group_ready = node
                    .group_id()
                    .map(|group_id| self.groups.contains_key(&group_id))
                    .unwrap_or(true);
                if group_ready {
                    self.place_node(&node, false, host);
                    self.release(id, host);
                }
            }
        }
    }

    fn complete_group(&mut self, group: GroupElement, host: &mut dyn HostSurface) {
        let id = group.id();
        if let Some(record) = self.nodes.get(&id) {
            let first = record.span;
            self.report_duplicate(id, group.span(), Some(first));
            return;
        }

        match self.groups.get_mut(&id) {
            Some(state) if state.span.start() != group.span().start() => {
                let first = state.span;
                self.report_duplicate(id, group.span(), Some(first));
            }
            Some(state) => {
                state.complete = true;
                state.span = group.span();
                self.adopt_children(&group, host);
            }
            None => self.create_group(&group, true, host),
        }
    }

    fn preview_group(&mut self, group: GroupElement, host: &mut dyn HostSurface) {
        let id = group.id();
        if self.nodes.contains_key(&id) {
            return;
        }

        match self.groups.get(&id) {
            Some(state) if state.complete || state.span.start() != group.span().start() => {}
            Some(_) => self.adopt_children(&group, host),
            None => self.create_group(&group, false, host),
        }
    }

    fn create_group(&mut self, group: &GroupElement, complete: bool, host: &mut dyn HostSurface) {
        let id = group.id();
        let position = self
            .root
            .position_for(id, group.row(), group.col(), &mut self.diagnostics);
        let container = Container::new(position.top_left(), InboundSide::None, self.config.clone());
        let bounds = container.bounds();

        host.render_group(id, group.title(), bounds.to_bounds());
        let changes = self
            .root
            .insert(id, &position, bounds.size(), &mut self.diagnostics);
        self.groups.insert(
            id,
            GroupState {
                container,
                title: group.title().to_string(),
                offset: Point::default(),
                span: group.span(),
                complete,
            },
        );
        self.apply_root_moves(changes.moves(), host);
        self.created.push(id);
        info!(id:% = id, row = position.row(), col = position.col(); "Group created");

        self.adopt_children(group, host);
        self.release(id, host);
    }

    /// Draws the group's complete children that are not on the surface yet.
    fn adopt_children(&mut self, group: &GroupElement, host: &mut dyn HostSurface) {
        for child in group.children() {
            match self.nodes.get(&child.id()) {
                None => self.complete_node(child.clone(), host),
                Some(record) if !record.complete => self.complete_node(child.clone(), host),
                Some(_) => {}
            }
        }
    }

    /// Hands everything parked behind `id` back to the session.
    fn release(&mut self, id: Id, host: &mut dyn HostSurface) {
        if !self.resolver.begin(id) {
            return;
        }
        for pending in self.resolver.ready(id) {
            match pending {
                Pending::Node(node) => self.complete_node(node, host),
                Pending::Edge(edge) => self.add_edge(edge, host),
            }
        }
        self.resolver.end(id);
    }

    fn add_edge(&mut self, edge: EdgeElement, host: &mut dyn HostSurface) {
        let missing = [edge.from(), edge.to()]
            .into_iter()
            .find(|&endpoint| !self.exists(endpoint));

        let Some(missing) = missing else {
            debug!(from:% = edge.from(), to:% = edge.to(); "Edge drawn");
            host.render_edge(&edge);
            self.edges.push(edge);
            return;
        };

        if self.finishing {
            self.report_unresolved(&edge, missing);
            return;
        }
        match self.resolver.defer(missing, Pending::Edge(edge)) {
            Ok(()) => {}
            Err(Pending::Edge(edge)) => self.report_unresolved(&edge, missing),
            Err(Pending::Node(node)) => self.resolve_node(node, host),
        }
    }

    fn report_unresolved(&mut self, edge: &EdgeElement, missing: Id) {
        self.diagnostics.emit(
            Diagnostic::warning(format!(
                "edge `{}` -> `{}` references `{missing}`, which never arrived",
                edge.from(),
                edge.to()
            ))
            .with_code(ErrorCode::E202)
            .with_label(edge.span(), "edge dropped"),
        );
    }

    fn place_node(&mut self, node: &NodeElement, complete: bool, host: &mut dyn HostSurface) {
        let id = node.id();
        let parent = match node.group_id() {
            Some(group_id) if self.groups.contains_key(&group_id) => Parent::Group(group_id),
            _ => Parent::Root,
        };

        let (position, offset) = match parent {
            Parent::Root => (
                self.root
                    .position_for(id, node.row(), node.col(), &mut self.diagnostics),
                Point::default(),
            ),
            Parent::Group(group_id) => {
                let Some(state) = self.groups.get_mut(&group_id) else {
                    return;
                };
                (
                    state
                        .container
                        .position_for(id, node.row(), node.col(), &mut self.diagnostics),
                    state.offset,
                )
            }
        };

        let content = prepare_content(node.content());
        let size = host.render_node(&NodeRender {
            id,
            kind: node.kind(),
            title: node.title(),
            content: &content,
            position: position.top_left().add_point(offset),
            width: self.config.element_width(),
        });
        let size = self.placeholder_if_unmeasured(size);

        let changes = match parent {
            Parent::Root => self.root.insert(id, &position, size, &mut self.diagnostics),
            Parent::Group(group_id) => match self.groups.get_mut(&group_id) {
                Some(state) => state
                    .container
                    .insert(id, &position, size, &mut self.diagnostics),
                None => LayoutChanges::default(),
            },
        };

        self.nodes.insert(
            id,
            NodeRecord {
                kind: node.kind(),
                title: node.title().map(str::to_string),
                content,
                parent,
                span: node.span(),
                complete,
            },
        );
        self.created.push(id);
        info!(id:% = id, row = position.row(), col = position.col(), complete; "Node created");

        self.apply_changes(parent, &changes, host);
    }

    /// Hosts that cannot measure yet report an empty extent; the configured
    /// element size stands in until a real measurement arrives.
    fn placeholder_if_unmeasured(&self, size: Size) -> Size {
        let width = if size.width() > 0.0 { size.width() } else { self.config.element_width() };
        let height = if size.height() > 0.0 { size.height() } else { self.config.element_height() };
        Size::new(width, height)
    }

    fn update_content(&mut self, id: Id, content: String, host: &mut dyn HostSurface) -> bool {
        let Some(record) = self.nodes.get_mut(&id) else {
            return false;
        };
        if record.content == content {
            return true;
        }
        record.content = content;
        let record = record.clone();

        let Some(bounds) = self.element_bounds(id) else {
            return false;
        };
        let size = host.render_node(&NodeRender {
            id,
            kind: record.kind,
            title: record.title.as_deref(),
            content: &record.content,
            position: bounds.min_point(),
            width: self.config.element_width(),
        });
        let size = self.placeholder_if_unmeasured(size);
        debug!(id:% = id, width = size.width(), height = size.height(); "Node resized");

        let changes = match record.parent {
            Parent::Root => self.root.resize(id, size, &mut self.diagnostics),
            Parent::Group(group_id) => match self.groups.get_mut(&group_id) {
                Some(state) => state.container.resize(id, size, &mut self.diagnostics),
                None => LayoutChanges::default(),
            },
        };
        self.apply_changes(record.parent, &changes, host);
        true
    }

    fn apply_changes(&mut self, parent: Parent, changes: &LayoutChanges, host: &mut dyn HostSurface) {
        match parent {
            Parent::Root => self.apply_root_moves(changes.moves(), host),
            Parent::Group(group_id) => {
                let Some(state) = self.groups.get(&group_id) else {
                    return;
                };
                for &(id, position) in changes.moves() {
                    host.move_element(id, position.add_point(state.offset));
                }
                if changes.bounds_grew() {
                    self.sync_group_size(group_id, host);
                }
            }
        }
    }

    /// Redraws a group frame after its container grew and lets the root react.
    fn sync_group_size(&mut self, group_id: Id, host: &mut dyn HostSurface) {
        let Some(state) = self.groups.get(&group_id) else {
            return;
        };
        let bounds = state.container.bounds();
        host.render_group(group_id, &state.title, bounds.to_bounds().translate(state.offset));

        let changes = self
            .root
            .resize(group_id, bounds.size(), &mut self.diagnostics);
        self.apply_root_moves(changes.moves(), host);
    }

    /// Moves root members. A moved group carries its children along.
    fn apply_root_moves(&mut self, moves: &[(Id, Point)], host: &mut dyn HostSurface) {
        for &(id, position) in moves {
            match self.groups.get_mut(&id) {
                Some(state) => {
                    state.offset = position.sub_point(state.container.anchor().origin());
                    host.move_element(id, position);
                    for member in state.container.members() {
                        host.move_element(member.id(), member.top_left().add_point(state.offset));
                    }
                }
                None => host.move_element(id, position),
            }
        }
    }
}
