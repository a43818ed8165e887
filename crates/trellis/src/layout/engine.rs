//! Positioning functions for streamed elements.
//!
//! [`LayoutEngine`] holds only configuration. All session state is passed in
//! explicitly: the container's [`AnchorState`] and its [`ColumnTracker`].
//!
//! Vertical placement follows actual heights reported by the host: an element
//! sits `vertical_gap` below the element stacked above it in the same
//! column. Horizontal placement sums the widest element of every column to
//! the left.

use log::debug;

use trellis_core::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

use crate::{
    config::LayoutConfig,
    layout::{
        anchor::AnchorState,
        column::ColumnTracker,
        container::ContainerBounds,
    },
};

/// Residual overlap, in pixels, that is not reported.
pub const OVERLAP_TOLERANCE: f32 = 1.0;

/// Where a new element goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementPosition {
    row: i32,
    col: i32,
    top_left: Point,
}

impl ElementPosition {
    /// Clamped logical row.
    pub fn row(&self) -> i32 {
        self.row
    }

    /// Clamped logical column.
    pub fn col(&self) -> i32 {
        self.col
    }

    /// Pixel position of the element's top-left corner.
    pub fn top_left(&self) -> Point {
        self.top_left
    }
}

/// New vertical position for an element after a cascade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    id: Id,
    y: f32,
}

impl PositionUpdate {
    pub fn id(&self) -> Id {
        self.id
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}

/// A detected overlap between two adjacent entries of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapCorrection {
    upper: Id,
    lower: Id,
    y: f32,
}

impl OverlapCorrection {
    pub fn upper(&self) -> Id {
        self.upper
    }

    pub fn lower(&self) -> Id {
        self.lower
    }

    /// Corrected `y` for the lower element.
    pub fn y(&self) -> f32 {
        self.y
    }
}

/// Pure positioning over explicit container state.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Clamps a logical coordinate to the configured symmetric bound.
    ///
    /// Emits an [`ErrorCode::E200`] warning when the value was out of range.
    pub fn clamp_coordinate(
        &self,
        id: Id,
        axis: &str,
        value: i32,
        diagnostics: &mut DiagnosticCollector,
    ) -> i32 {
        let bound = self.config.coordinate_bound();
        let clamped = value.clamp(-bound, bound);
        if clamped != value {
            diagnostics.emit(
                Diagnostic::warning(format!(
                    "`{axis}` {value} of `{id}` is outside -{bound}..={bound}, clamped to {clamped}"
                ))
                .with_code(ErrorCode::E200),
            );
        }
        clamped
    }

    /// Computes the position of a new element from its logical coordinates.
    ///
    /// # Arguments
    ///
    /// * `id` - The element being placed; an existing ledger entry with this
    ///   id is ignored when looking for the element above.
    /// * `row`, `col` - Logical grid coordinates as parsed.
    /// * `anchor` - The container anchor; its running minimums are updated.
    /// * `columns` - The container's column ledgers.
    /// * `diagnostics` - Receives clamping warnings.
    ///
    /// # Returns
    ///
    /// The clamped coordinates and the pixel top-left corner.
    pub fn calculate_element_position(
        &self,
        id: Id,
        row: i32,
        col: i32,
        anchor: &mut AnchorState,
        columns: &ColumnTracker,
        diagnostics: &mut DiagnosticCollector,
    ) -> ElementPosition {
        let row = self.clamp_coordinate(id, "row", row, diagnostics);
        let col = self.clamp_coordinate(id, "col", col, diagnostics);
        anchor.observe(row, col);

        let x = self.column_x(col, anchor, columns);
        let y = match columns
            .column(col)
            .and_then(|track| track.previous_for(row, Some(id)))
        {
            Some(above) => above.y() + above.height() + self.config.vertical_gap(),
            None => self.first_row_y(anchor),
        };

        debug!(id:% = id, row, col, x, y; "Calculated element position");
        ElementPosition {
            row,
            col,
            top_left: Point::new(x, y),
        }
    }

    /// `y` of the first element in any column.
    pub fn first_row_y(&self, anchor: &AnchorState) -> f32 {
        anchor.y()
            + self.config.header_clearance()
            + anchor.top_safe_zone(self.config.edge_label_safe_zone())
    }

    /// `x` of logical column `col`.
    ///
    /// Columns between the running minimum and `col` contribute their widest
    /// element, or the default element width when nothing is tracked there.
    pub fn column_x(&self, col: i32, anchor: &AnchorState, columns: &ColumnTracker) -> f32 {
        let default_width = self.config.element_width();
        let gap = self.config.horizontal_gap();
        let min_col = anchor.min_col_seen();
        let (_, span) = anchor.normalize(0, col);

        let tracked_extra: f32 = columns
            .columns_between(min_col, col)
            .filter(|track| track.max_width() > 0.0)
            .map(|track| track.max_width() - default_width)
            .sum();

        anchor.x()
            + self.config.padding()
            + anchor.left_safe_zone(self.config.edge_label_safe_zone())
            + span as f32 * (default_width + gap)
            + tracked_extra
    }

    /// Records an element's position and measured size in its column.
    ///
    /// Returns `true` if the column's max width grew.
    pub fn register_element_in_column(
        &self,
        columns: &mut ColumnTracker,
        id: Id,
        position: &ElementPosition,
        size: Size,
    ) -> bool {
        columns.register(id, position.row, position.col, position.top_left, size)
    }

    /// Recomputes `y` for entries of column `col` below `changed_row`.
    ///
    /// Entries at or above `changed_row`, and other columns, are untouched.
    /// Only entries whose `y` actually changes are returned.
    pub fn calculate_repositioning(
        &self,
        anchor: &AnchorState,
        columns: &ColumnTracker,
        col: i32,
        changed_row: i32,
    ) -> Vec<PositionUpdate> {
        let Some(track) = columns.column(col) else {
            return Vec::new();
        };

        let mut updates = Vec::new();
        let mut above: Option<(f32, f32)> = None;
        for entry in track.entries() {
            let mut y = entry.y();
            if entry.row() > changed_row {
                y = match above {
                    Some((above_y, above_height)) => {
                        above_y + above_height + self.config.vertical_gap()
                    }
                    None => self.first_row_y(anchor),
                };
                if (y - entry.y()).abs() > f32::EPSILON {
                    updates.push(PositionUpdate { id: entry.id(), y });
                }
            }
            above = Some((y, entry.height()));
        }
        updates
    }

    /// New `x` for every entry whose column position changed.
    pub fn calculate_column_reflow(
        &self,
        anchor: &AnchorState,
        columns: &ColumnTracker,
    ) -> Vec<(Id, f32)> {
        columns
            .columns()
            .flat_map(|track| {
                let x = self.column_x(track.column(), anchor, columns);
                track
                    .entries()
                    .iter()
                    .filter(move |entry| (entry.x() - x).abs() > f32::EPSILON)
                    .map(move |entry| (entry.id(), x))
            })
            .collect()
    }

    /// Finds adjacent entries in column `col` that are closer than the gap.
    ///
    /// Corrections are computed in row order, each one taking the previous
    /// corrections into account.
    pub fn detect_overlaps(&self, columns: &ColumnTracker, col: i32) -> Vec<OverlapCorrection> {
        let Some(track) = columns.column(col) else {
            return Vec::new();
        };

        let mut corrections = Vec::new();
        let mut above: Option<(Id, f32, f32)> = None;
        for entry in track.entries() {
            let mut y = entry.y();
            if let Some((upper, above_y, above_height)) = above {
                let min_y = above_y + above_height + self.config.vertical_gap();
                if y < min_y - OVERLAP_TOLERANCE {
                    corrections.push(OverlapCorrection {
                        upper,
                        lower: entry.id(),
                        y: min_y,
                    });
                    y = min_y;
                }
            }
            above = Some((entry.id(), y, entry.height()));
        }
        corrections
    }

    /// Grows `current` to enclose `members` plus padding.
    ///
    /// The origin always equals the anchor and neither dimension shrinks.
    pub fn calculate_container_bounds(
        &self,
        current: ContainerBounds,
        members: impl IntoIterator<Item = Bounds>,
        anchor: &AnchorState,
    ) -> ContainerBounds {
        let (right, bottom) = members
            .into_iter()
            .fold((anchor.x(), anchor.y()), |(right, bottom), member| {
                (right.max(member.max_x()), bottom.max(member.max_y()))
            });
        let padding = self.config.padding();

        ContainerBounds::new(
            anchor.origin(),
            Size::new(
                current.width().max(right - anchor.x() + padding),
                current.height().max(bottom - anchor.y() + padding),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::layout::anchor::InboundSide;

    struct Fixture {
        engine: LayoutEngine,
        anchor: AnchorState,
        columns: ColumnTracker,
        diagnostics: DiagnosticCollector,
    }

    impl Fixture {
        /// Anchor at y=300 puts the first row at y=360 with default config.
        fn new(inbound: InboundSide) -> Self {
            Self {
                engine: LayoutEngine::default(),
                anchor: AnchorState::lock(Point::new(100.0, 300.0), inbound),
                columns: ColumnTracker::new(),
                diagnostics: DiagnosticCollector::new(),
            }
        }

        fn place(&mut self, id: &str, row: i32, col: i32, size: Size) -> ElementPosition {
            let id = Id::new(id);
            let position = self.engine.calculate_element_position(
                id,
                row,
                col,
                &mut self.anchor,
                &self.columns,
                &mut self.diagnostics,
            );
            self.engine
                .register_element_in_column(&mut self.columns, id, &position, size);
            position
        }

        fn y(&self, id: &str) -> f32 {
            self.columns.entry(Id::new(id)).unwrap().y()
        }
    }

    #[test]
    fn test_stacking_uses_actual_heights() {
        let mut fx = Fixture::new(InboundSide::None);
        let size = Size::new(360.0, 200.0);

        let ys: Vec<f32> = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(row, id)| fx.place(id, row as i32, 0, size).top_left().y())
            .collect();

        assert_eq!(ys, [360.0, 600.0, 840.0]);
    }

    #[test]
    fn test_repositioning_after_growth() {
        let mut fx = Fixture::new(InboundSide::None);
        let size = Size::new(360.0, 200.0);
        fx.place("a", 0, 0, size);
        fx.place("b", 1, 0, size);
        fx.place("c", 2, 0, size);

        fx.columns.set_size(Id::new("a"), Size::new(360.0, 400.0));
        let updates = fx
            .engine
            .calculate_repositioning(&fx.anchor, &fx.columns, 0, 0);
        for update in &updates {
            fx.columns.set_y(update.id(), update.y());
        }

        assert_eq!(updates.len(), 2);
        assert_eq!([fx.y("a"), fx.y("b"), fx.y("c")], [360.0, 800.0, 1040.0]);
    }

    #[test]
    fn test_repositioning_leaves_rows_above_and_other_columns() {
        let mut fx = Fixture::new(InboundSide::None);
        let size = Size::new(360.0, 200.0);
        fx.place("a", 0, 0, size);
        fx.place("b", 1, 0, size);
        fx.place("other", 1, 1, size);

        fx.columns.set_size(Id::new("b"), Size::new(360.0, 500.0));
        let updates = fx
            .engine
            .calculate_repositioning(&fx.anchor, &fx.columns, 0, 1);

        assert!(updates.is_empty());
        assert_eq!(fx.y("other"), 360.0);
    }

    #[test]
    fn test_row_gap_in_column_stacks_on_previous() {
        let mut fx = Fixture::new(InboundSide::None);
        fx.place("a", 0, 0, Size::new(360.0, 120.0));
        let position = fx.place("far", 5, 0, Size::new(360.0, 120.0));
        assert_eq!(position.top_left().y(), 360.0 + 120.0 + 40.0);
    }

    #[test]
    fn test_empty_column_starts_at_header() {
        let mut fx = Fixture::new(InboundSide::None);
        let position = fx.place("late", 3, 2, Size::new(360.0, 100.0));
        assert_eq!(position.top_left().y(), 360.0);
    }

    #[test]
    fn test_column_x_uses_max_widths() {
        let mut fx = Fixture::new(InboundSide::None);
        fx.place("wide", 0, 0, Size::new(500.0, 100.0));
        let position = fx.place("next", 0, 1, Size::new(360.0, 100.0));

        // anchor 100 + padding 40 + (500 + 40)
        assert_approx_eq!(f32, position.top_left().x(), 680.0);
    }

    #[test]
    fn test_unknown_columns_use_default_width() {
        let mut fx = Fixture::new(InboundSide::None);
        let position = fx.place("c2", 0, 2, Size::new(360.0, 100.0));
        assert_approx_eq!(f32, position.top_left().x(), 100.0 + 40.0 + 2.0 * 400.0);
    }

    #[test]
    fn test_safe_zones() {
        let mut top = Fixture::new(InboundSide::Top);
        let position = top.place("a", 0, 0, Size::new(360.0, 100.0));
        assert_eq!(position.top_left().y(), 440.0);
        assert_eq!(position.top_left().x(), 140.0);

        let mut left = Fixture::new(InboundSide::Left);
        let position = left.place("a", 0, 0, Size::new(360.0, 100.0));
        assert_eq!(position.top_left().y(), 360.0);
        assert_eq!(position.top_left().x(), 220.0);
    }

    #[test]
    fn test_negative_column_normalizes_without_moving_anchor() {
        let mut fx = Fixture::new(InboundSide::None);
        fx.place("zero", 0, 0, Size::new(360.0, 100.0));
        let left = fx.place("left", 0, -1, Size::new(360.0, 100.0));

        assert_eq!(left.top_left().x(), 140.0);
        assert_eq!(fx.anchor.origin(), Point::new(100.0, 300.0));

        let reflow = fx.engine.calculate_column_reflow(&fx.anchor, &fx.columns);
        assert_eq!(reflow, [(Id::new("zero"), 540.0)]);
    }

    #[test]
    fn test_out_of_range_coordinates_are_clamped() {
        let mut fx = Fixture::new(InboundSide::None);
        let position = fx.place("far", 500, -7, Size::new(360.0, 100.0));

        assert_eq!(position.row(), 100);
        assert_eq!(position.col(), -7);
        assert_eq!(fx.diagnostics.count(ErrorCode::E200), 1);
    }

    #[test]
    fn test_negative_configured_bound_clamps_to_origin() {
        let config: LayoutConfig = toml::from_str("coordinate_bound = -5").unwrap();
        let engine = LayoutEngine::new(config);
        let mut diagnostics = DiagnosticCollector::new();

        assert_eq!(engine.clamp_coordinate(Id::new("a"), "row", 7, &mut diagnostics), 0);
        assert_eq!(engine.clamp_coordinate(Id::new("a"), "col", i32::MIN, &mut diagnostics), 0);
        assert_eq!(diagnostics.count(ErrorCode::E200), 2);
    }

    #[test]
    fn test_detect_overlaps_is_sequential() {
        let mut fx = Fixture::new(InboundSide::None);
        let size = Size::new(360.0, 200.0);
        fx.place("a", 0, 0, size);
        fx.place("b", 1, 0, size);
        fx.place("c", 2, 0, size);
        fx.columns.set_y(Id::new("b"), 400.0);
        fx.columns.set_y(Id::new("c"), 620.0);

        let corrections = fx.engine.detect_overlaps(&fx.columns, 0);

        assert_eq!(corrections.len(), 2);
        assert_eq!(corrections[0].lower(), "b");
        assert_eq!(corrections[0].y(), 600.0);
        assert_eq!(corrections[1].upper(), "b");
        assert_eq!(corrections[1].y(), 840.0);
    }

    #[test]
    fn test_overlap_within_tolerance_is_ignored() {
        let mut fx = Fixture::new(InboundSide::None);
        let size = Size::new(360.0, 200.0);
        fx.place("a", 0, 0, size);
        fx.place("b", 1, 0, size);
        fx.columns.set_y(Id::new("b"), 599.5);

        assert!(fx.engine.detect_overlaps(&fx.columns, 0).is_empty());
    }

    #[test]
    fn test_container_bounds_never_shrink() {
        let fx = Fixture::new(InboundSide::None);
        let current = ContainerBounds::new(fx.anchor.origin(), Size::new(1000.0, 1000.0));
        let member = Bounds::new_from_top_left(Point::new(140.0, 360.0), Size::new(360.0, 200.0));

        let bounds = fx
            .engine
            .calculate_container_bounds(current, [member], &fx.anchor);
        assert_eq!(bounds.width(), 1000.0);
        assert_eq!(bounds.height(), 1000.0);

        let grown = fx.engine.calculate_container_bounds(
            ContainerBounds::new(fx.anchor.origin(), Size::default()),
            [member],
            &fx.anchor,
        );
        assert_eq!(grown.origin(), fx.anchor.origin());
        assert_eq!(grown.width(), 440.0);
        assert_eq!(grown.height(), 300.0);
    }
}
