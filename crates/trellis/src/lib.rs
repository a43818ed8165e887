//! Trellis - streaming layout for generated canvas content.
//!
//! A text generator emits `<node>`, `<group>` and `<edge>` tags in arbitrary
//! chunks. Trellis parses the stream incrementally, places every element
//! relative to an immutable anchor in a column grid, reflows neighbours as
//! element sizes become known, and reports the placements to a
//! [`host::HostSurface`].

pub mod config;
pub mod export;
pub mod host;
pub mod layout;
pub mod session;

mod error;

pub use trellis_core::{color, element, geometry, identifier, span, text};

pub use error::{TransportError, TrellisError};

use log::{debug, info};

use config::AppConfig;
use export::svg::SvgSurface;
use session::{Generation, GenerationOutcome, LifecycleObserver, SessionOptions};

/// Replays a complete stream source through a [`Generation`] onto an
/// [`SvgSurface`].
///
/// # Examples
///
/// ```
/// use trellis::{StreamRenderer, session::EventLog};
///
/// let source = r#"<node id="a" row="0" col="0">Hello</node>"#;
/// let mut events = EventLog::new();
/// let (outcome, surface) = StreamRenderer::default()
///     .with_chunk_size(8)
///     .render(source, &mut events);
///
/// assert!(outcome.is_success());
/// assert_eq!(surface.node_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreamRenderer {
    config: AppConfig,
    options: SessionOptions,
    chunk_size: Option<usize>,
}

impl StreamRenderer {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Splits the source into chunks of roughly `size` bytes. Without a size
    /// the whole source is delivered as one chunk.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Runs the source through a fresh session.
    pub fn render<O>(&self, source: &str, observer: &mut O) -> (GenerationOutcome, SvgSurface)
    where
        O: LifecycleObserver + ?Sized,
    {
        let chunks = match self.chunk_size {
            Some(size) => split_chunks(source, size),
            None => vec![source],
        };
        debug!(chunks = chunks.len(), bytes = source.len(); "Replaying stream source");

        let mut surface = SvgSurface::new(self.config.style().clone());
        let outcome = Generation::new(self.config.layout().clone())
            .with_options(self.options)
            .run(
                chunks
                    .into_iter()
                    .map(|chunk| Ok::<_, TransportError>(chunk.to_string())),
                &mut surface,
                observer,
            );

        info!(
            elements = outcome.session().element_count(),
            diagnostics = outcome.session().diagnostics().len();
            "Stream replayed"
        );
        (outcome, surface)
    }
}

/// Splits `source` into pieces of at most `size` bytes, never inside a
/// UTF-8 sequence. A piece grows past `size` only to finish a character.
pub fn split_chunks(source: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut rest = source;
    while !rest.is_empty() {
        let mut end = size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end += 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}
