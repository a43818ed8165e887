//! Anchor-based column layout for streamed elements.
//!
//! A [`Container`] owns one locked [`AnchorState`] and the [`ColumnTracker`]
//! ledgers of its members. The positioning math lives in [`LayoutEngine`],
//! which only reads and returns values; the container applies them.

pub mod anchor;
pub mod column;
pub mod container;
pub mod engine;

pub use anchor::{AnchorState, InboundSide};
pub use column::{ColumnEntry, ColumnTrack, ColumnTracker};
pub use container::{Container, ContainerBounds, LayoutChanges};
pub use engine::{ElementPosition, LayoutEngine, OverlapCorrection, PositionUpdate};
