//! Locked container origin and running coordinate minimums.

use log::debug;

use trellis_core::geometry::Point;

/// Side of a container where an inbound edge attaches.
///
/// The layout reserves an extra safe zone on that side so the edge label
/// does not collide with the first row or column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InboundSide {
    #[default]
    None,
    Top,
    Left,
}

/// Origin of one container for the lifetime of a streaming session.
///
/// The origin is captured by [`AnchorState::lock`] and has no setter.
/// Members whose logical coordinates go below previously seen minimums are
/// normalized against the running minimums instead of moving the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorState {
    origin: Point,
    inbound: InboundSide,
    min_row_seen: i32,
    min_col_seen: i32,
}

impl AnchorState {
    /// Locks the container origin at `origin`.
    ///
    /// Running minimums start at zero, so logical coordinate `0` is the first
    /// row and column until a negative coordinate is observed.
    pub fn lock(origin: Point, inbound: InboundSide) -> Self {
        debug!(x = origin.x(), y = origin.y(), inbound:? = inbound; "Anchor locked");
        Self {
            origin,
            inbound,
            min_row_seen: 0,
            min_col_seen: 0,
        }
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn x(&self) -> f32 {
        self.origin.x()
    }

    pub fn y(&self) -> f32 {
        self.origin.y()
    }

    pub fn inbound(&self) -> InboundSide {
        self.inbound
    }

    pub fn min_row_seen(&self) -> i32 {
        self.min_row_seen
    }

    pub fn min_col_seen(&self) -> i32 {
        self.min_col_seen
    }

    /// Records a clamped coordinate. Returns `true` if the column minimum dropped.
    pub fn observe(&mut self, row: i32, col: i32) -> bool {
        self.min_row_seen = self.min_row_seen.min(row);
        let previous_col = self.min_col_seen;
        self.min_col_seen = previous_col.min(col);
        self.min_col_seen < previous_col
    }

    /// `(row, col)` relative to the running minimums; never negative for observed values.
    pub fn normalize(&self, row: i32, col: i32) -> (u32, u32) {
        let relative = |value: i32, min: i32| {
            u32::try_from(i64::from(value) - i64::from(min)).unwrap_or(0)
        };
        (
            relative(row, self.min_row_seen),
            relative(col, self.min_col_seen),
        )
    }

    /// Extra clearance above the first row.
    pub fn top_safe_zone(&self, safe_zone: f32) -> f32 {
        if self.inbound == InboundSide::Top { safe_zone } else { 0.0 }
    }

    /// Extra clearance left of the first column.
    pub fn left_safe_zone(&self, safe_zone: f32) -> f32 {
        if self.inbound == InboundSide::Left { safe_zone } else { 0.0 }
    }
}
