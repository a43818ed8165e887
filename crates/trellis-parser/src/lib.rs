//! # Trellis Parser
//!
//! Incremental parser for the tag stream produced by a text generator. The
//! stream carries three element kinds, `<node>`, `<group>` and `<edge>`, and
//! arrives in chunks whose boundaries never line up with the markup.
//!
//! ## Usage
//!
//! ```
//! # use trellis_parser::{StreamTagParser, prepare_content};
//! let mut parser = StreamTagParser::new();
//! parser.append(r#"<node id="intro" row="0" col="0">
//!     Streams arrive
//!     in pieces</no"#);
//!
//! // Nothing is complete yet, but the in-progress node can be previewed.
//! assert!(parser.detect_complete().is_empty());
//! let preview = parser.detect_incomplete_node().unwrap();
//! assert_eq!(prepare_content(preview.content()), "Streams arrive\nin pieces");
//!
//! parser.append("de>");
//! assert_eq!(parser.detect_complete().len(), 1);
//! ```

pub mod content;
mod stream;
#[cfg(test)]
mod stream_tests;
mod tag;

pub use content::{dedent_content, prepare_content, sanitize_content, trim_blank_edges};
pub use stream::StreamTagParser;
