//! Diagnostics for streamed markup and layout.
//!
//! Nothing in the parsing or layout pipeline is fatal: malformed markup is
//! skipped, out-of-range coordinates are clamped and overlaps are corrected.
//! Each of those observations is recorded as a [`Diagnostic`] carrying an
//! [`ErrorCode`], optional labelled [`Span`](crate::span::Span)s into the raw
//! stream, and optional help text. A [`DiagnosticCollector`] accumulates them
//! for one streaming session.
//!
//! # Example
//!
//! ```
//! # use trellis_core::error::{Diagnostic, ErrorCode};
//! # use trellis_core::span::Span;
//! let diag = Diagnostic::error("node is missing required attribute `id`")
//!     .with_code(ErrorCode::E101)
//!     .with_label(Span::new(0..24), "opening tag")
//!     .with_help("add `id=\"...\"` to the tag");
//!
//! assert_eq!(diag.to_string(), "error[E101]: node is missing required attribute `id`");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod severity;

pub use collector::DiagnosticCollector;
pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use severity::Severity;
