//! A laid-out region: one anchor, its column ledgers and its bounds.

use std::collections::HashMap;

use log::{debug, info};

use trellis_core::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

use crate::{
    config::LayoutConfig,
    layout::{
        anchor::{AnchorState, InboundSide},
        column::{ColumnEntry, ColumnTracker},
        engine::{ElementPosition, LayoutEngine},
    },
};

/// Pixel box of a container. The origin always equals the container anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerBounds {
    origin: Point,
    size: Size,
}

impl ContainerBounds {
    pub fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn x(&self) -> f32 {
        self.origin.x()
    }

    pub fn y(&self) -> f32 {
        self.origin.y()
    }

    pub fn width(&self) -> f32 {
        self.size.width()
    }

    pub fn height(&self) -> f32 {
        self.size.height()
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn to_bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.origin, self.size)
    }
}

/// Geometry changes produced by one insert or resize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutChanges {
    moves: Vec<(Id, Point)>,
    bounds_grew: bool,
}

impl LayoutChanges {
    /// Members whose top-left corner changed, with their new position.
    pub fn moves(&self) -> &[(Id, Point)] {
        &self.moves
    }

    pub fn bounds_grew(&self) -> bool {
        self.bounds_grew
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && !self.bounds_grew
    }
}

/// One streaming container and its layout state.
///
/// The container is created with its anchor already locked. Every insert or
/// resize settles the whole container before returning: vertical cascade,
/// horizontal reflow, overlap correction and bounds growth, in that order.
#[derive(Debug, Clone)]
pub struct Container {
    engine: LayoutEngine,
    anchor: AnchorState,
    columns: ColumnTracker,
    bounds: ContainerBounds,
    reflow_pending: bool,
}

impl Container {
    /// Creates a container anchored at `origin`.
    ///
    /// The initial bounds already cover the header band and the safe zone, so
    /// an empty container still renders its title chrome.
    pub fn new(origin: Point, inbound: InboundSide, config: LayoutConfig) -> Self {
        let anchor = AnchorState::lock(origin, inbound);
        let safe_zone = config.edge_label_safe_zone();
        let size = Size::new(
            2.0 * config.padding() + anchor.left_safe_zone(safe_zone),
            config.header_clearance() + config.padding() + anchor.top_safe_zone(safe_zone),
        );

        Self {
            engine: LayoutEngine::new(config),
            anchor,
            columns: ColumnTracker::new(),
            bounds: ContainerBounds::new(origin, size),
            reflow_pending: false,
        }
    }

    pub fn anchor(&self) -> &AnchorState {
        &self.anchor
    }

    pub fn config(&self) -> &LayoutConfig {
        self.engine.config()
    }

    pub fn bounds(&self) -> ContainerBounds {
        self.bounds
    }

    pub fn contains(&self, id: Id) -> bool {
        self.columns.contains(id)
    }

    pub fn members(&self) -> impl Iterator<Item = &ColumnEntry> {
        self.columns.entries()
    }

    pub fn member_bounds(&self, id: Id) -> Option<Bounds> {
        self.columns.entry(id).map(ColumnEntry::bounds)
    }

    /// Computes where a new element goes, before the host has drawn it.
    ///
    /// For a member that is already placed, the result is the position it
    /// would get if it were inserted again.
    pub fn position_for(
        &mut self,
        id: Id,
        row: i32,
        col: i32,
        diagnostics: &mut DiagnosticCollector,
    ) -> ElementPosition {
        let min_col = self.anchor.min_col_seen();
        let position = self.engine.calculate_element_position(
            id,
            row,
            col,
            &mut self.anchor,
            &self.columns,
            diagnostics,
        );
        if self.anchor.min_col_seen() < min_col {
            debug!(id:% = id, min_col = self.anchor.min_col_seen(); "Column minimum dropped");
            self.reflow_pending = true;
        }
        position
    }

    /// Registers a drawn element and settles the container.
    ///
    /// The returned moves may include `id` itself if the overlap pass had to
    /// correct it.
    pub fn insert(
        &mut self,
        id: Id,
        position: &ElementPosition,
        size: Size,
        diagnostics: &mut DiagnosticCollector,
    ) -> LayoutChanges {
        let mut snapshot = self.snapshot();
        snapshot.insert(id, position.top_left());

        let grew = self
            .engine
            .register_element_in_column(&mut self.columns, id, position, size);
        self.settle(position.col(), position.row(), grew, snapshot, diagnostics)
    }

    /// Records a new measured size for a member and settles the container.
    ///
    /// Unknown ids are ignored.
    pub fn resize(
        &mut self,
        id: Id,
        size: Size,
        diagnostics: &mut DiagnosticCollector,
    ) -> LayoutChanges {
        let (Some(col), Some(row)) = (
            self.columns.column_of(id),
            self.columns.entry(id).map(ColumnEntry::row),
        ) else {
            return LayoutChanges::default();
        };

        let snapshot = self.snapshot();
        let grew = self.columns.set_size(id, size);
        self.settle(col, row, grew, snapshot, diagnostics)
    }

    fn snapshot(&self) -> HashMap<Id, Point> {
        self.columns
            .entries()
            .map(|entry| (entry.id(), entry.top_left()))
            .collect()
    }

    fn settle(
        &mut self,
        col: i32,
        changed_row: i32,
        width_grew: bool,
        snapshot: HashMap<Id, Point>,
        diagnostics: &mut DiagnosticCollector,
    ) -> LayoutChanges {
        for update in self
            .engine
            .calculate_repositioning(&self.anchor, &self.columns, col, changed_row)
        {
            self.columns.set_y(update.id(), update.y());
        }

        let reflow = std::mem::take(&mut self.reflow_pending) || width_grew;
        if reflow {
            for (id, x) in self.engine.calculate_column_reflow(&self.anchor, &self.columns) {
                self.columns.set_x(id, x);
            }
        }

        for correction in self.engine.detect_overlaps(&self.columns, col) {
            diagnostics.emit(
                Diagnostic::warning(format!(
                    "`{}` overlapped `{}` and was moved down to y={}",
                    correction.lower(),
                    correction.upper(),
                    correction.y()
                ))
                .with_code(ErrorCode::E201),
            );
            self.columns.set_y(correction.lower(), correction.y());
        }

        let previous = self.bounds;
        self.bounds = self.engine.calculate_container_bounds(
            previous,
            self.columns.entries().map(ColumnEntry::bounds),
            &self.anchor,
        );
        let bounds_grew = self.bounds != previous;
        if bounds_grew {
            info!(
                width = self.bounds.width(),
                height = self.bounds.height();
                "Container bounds grew",
            );
        }

        let moves = self
            .columns
            .entries()
            .filter(|entry| snapshot.get(&entry.id()) != Some(&entry.top_left()))
            .map(|entry| (entry.id(), entry.top_left()))
            .collect();

        LayoutChanges { moves, bounds_grew }
    }
}
