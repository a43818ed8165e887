//! Per-column ledgers of placed elements.

use std::collections::{BTreeMap, HashMap};

use trellis_core::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

/// One placed element in a column ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnEntry {
    id: Id,
    row: i32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl ColumnEntry {
    pub fn id(&self) -> Id {
        self.id
    }

    /// Clamped logical row.
    pub fn row(&self) -> i32 {
        self.row
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    /// Last width reported by the host.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Last height reported by the host.
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.top_left(), Size::new(self.width, self.height))
    }
}

/// Ledger of one logical column, kept sorted by row.
///
/// Entries with equal rows keep their insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTrack {
    column: i32,
    entries: Vec<ColumnEntry>,
    max_width: f32,
}

impl ColumnTrack {
    fn new(column: i32) -> Self {
        Self {
            column,
            entries: Vec::new(),
            max_width: 0.0,
        }
    }

    /// Clamped logical column index.
    pub fn column(&self) -> i32 {
        self.column
    }

    pub fn entries(&self) -> &[ColumnEntry] {
        &self.entries
    }

    /// Widest element ever registered in this column.
    pub fn max_width(&self) -> f32 {
        self.max_width
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry a new element at `row` would be stacked below, ignoring `skip`.
    pub fn previous_for(&self, row: i32, skip: Option<Id>) -> Option<&ColumnEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| Some(entry.id) != skip && entry.row <= row)
    }

    fn index_of(&self, id: Id) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    fn insert_sorted(&mut self, entry: ColumnEntry) {
        let index = self.entries.partition_point(|existing| existing.row <= entry.row);
        self.entries.insert(index, entry);
    }

    fn grow_width(&mut self, width: f32) -> bool {
        if width > self.max_width {
            self.max_width = width;
            true
        } else {
            false
        }
    }
}

/// Column ledgers for one container, keyed by clamped logical column.
#[derive(Debug, Clone, Default)]
pub struct ColumnTracker {
    columns: BTreeMap<i32, ColumnTrack>,
    locations: HashMap<Id, i32>,
}

impl ColumnTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(&self, col: i32) -> Option<&ColumnTrack> {
        self.columns.get(&col)
    }

    /// All tracked columns in ascending column order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnTrack> {
        self.columns.values()
    }

    /// Tracked columns with index in `from..to`.
    pub fn columns_between(&self, from: i32, to: i32) -> impl Iterator<Item = &ColumnTrack> {
        self.columns.range(from..to.max(from)).map(|(_, track)| track)
    }

    pub fn column_of(&self, id: Id) -> Option<i32> {
        self.locations.get(&id).copied()
    }

    pub fn entry(&self, id: Id) -> Option<&ColumnEntry> {
        let col = self.column_of(id)?;
        self.columns
            .get(&col)?
            .entries
            .iter()
            .find(|entry| entry.id == id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ColumnEntry> {
        self.columns.values().flat_map(|track| track.entries.iter())
    }

    pub fn contains(&self, id: Id) -> bool {
        self.locations.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Inserts or updates an element. Returns `true` if the column's max width grew.
    ///
    /// An element registered again under a different column is moved to it;
    /// under a different row it is re-sorted.
    pub fn register(&mut self, id: Id, row: i32, col: i32, top_left: Point, size: Size) -> bool {
        match self.locations.get(&id).copied() {
            Some(previous_col) if previous_col != col => {
                if let Some(track) = self.columns.get_mut(&previous_col) {
                    track.entries.retain(|entry| entry.id != id);
                }
            }
            _ => {}
        }

        let track = self
            .columns
            .entry(col)
            .or_insert_with(|| ColumnTrack::new(col));
        let entry = ColumnEntry {
            id,
            row,
            x: top_left.x(),
            y: top_left.y(),
            width: size.width(),
            height: size.height(),
        };
        match track.index_of(id) {
            Some(index) if track.entries[index].row == row => track.entries[index] = entry,
            Some(index) => {
                track.entries.remove(index);
                track.insert_sorted(entry);
            }
            None => track.insert_sorted(entry),
        }
        self.locations.insert(id, col);
        track.grow_width(size.width())
    }

    /// Updates the measured size of `id`. Returns `true` if its column's max width grew.
    pub fn set_size(&mut self, id: Id, size: Size) -> bool {
        let Some(track) = self.track_of_mut(id) else {
            return false;
        };
        if let Some(index) = track.index_of(id) {
            track.entries[index].width = size.width();
            track.entries[index].height = size.height();
        }
        track.grow_width(size.width())
    }

    pub fn set_y(&mut self, id: Id, y: f32) {
        if let Some(entry) = self.entry_mut(id) {
            entry.y = y;
        }
    }

    pub fn set_x(&mut self, id: Id, x: f32) {
        if let Some(entry) = self.entry_mut(id) {
            entry.x = x;
        }
    }

    fn track_of_mut(&mut self, id: Id) -> Option<&mut ColumnTrack> {
        let col = self.column_of(id)?;
        self.columns.get_mut(&col)
    }

    fn entry_mut(&mut self, id: Id) -> Option<&mut ColumnEntry> {
        self.track_of_mut(id)?
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
    }
}
