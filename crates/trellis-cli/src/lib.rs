//! CLI logic for the Trellis stream replay tool.
//!
//! A recorded tag stream is replayed chunk by chunk through a Trellis
//! session, the resulting canvas is exported to SVG, and the stream
//! diagnostics are handed back for reporting.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::fs;

use log::{debug, info};

use trellis::{
    StreamRenderer, TrellisError,
    session::{LifecycleEvent, LifecycleEventKind},
};
use trellis_core::error::Diagnostic;

/// Result of a successful replay.
#[derive(Debug)]
pub struct RunReport {
    source: String,
    diagnostics: Vec<Diagnostic>,
    elements: usize,
}

impl RunReport {
    /// The replayed stream, for rendering diagnostic labels.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity().is_error())
    }
}

/// Run the Trellis CLI application
///
/// Replays the input stream and writes the rendered canvas to the output
/// file. Markup and layout problems do not fail the run; they are returned
/// in the [`RunReport`].
///
/// # Errors
///
/// Returns `TrellisError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Export errors
pub fn run(args: &Args) -> Result<RunReport, TrellisError> {
    info!(
        input_path = args.input,
        output_path = args.output,
        chunk_size = args.chunk_size;
        "Replaying stream"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let source = fs::read_to_string(&args.input)?;

    let mut observer = |event: &LifecycleEvent| match event.kind() {
        LifecycleEventKind::ElementCreated { id } => {
            debug!(id:% = id, at:? = event.timestamp(); "Element created");
        }
        kind => debug!(event:? = kind; "Lifecycle event"),
    };
    let renderer = StreamRenderer::new(app_config).with_chunk_size(args.chunk_size);
    let (outcome, surface) = renderer.render(&source, &mut observer);

    surface.write(&args.output)?;
    info!(output_file = args.output; "SVG exported successfully");

    let elements = outcome.session().element_count();
    let diagnostics = outcome.into_session().take_diagnostics();
    Ok(RunReport {
        source,
        diagnostics,
        elements,
    })
}
