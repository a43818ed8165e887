//! Trellis Core Types
//!
//! This crate provides the foundational types shared by the Trellis stream
//! parser and layout engine. It includes:
//!
//! - **Identifiers**: Interned element identifiers ([`identifier::Id`])
//! - **Elements**: The parsed node / group / edge model ([`element`] module)
//! - **Geometry**: Points, sizes and boxes ([`geometry`] module)
//! - **Diagnostics**: Non-fatal error reporting ([`error`] module)
//! - **Text**: Font-metric text measurement ([`text`] module)

pub mod color;
pub mod element;
pub mod error;
pub mod geometry;
pub mod identifier;
pub mod span;
pub mod text;
