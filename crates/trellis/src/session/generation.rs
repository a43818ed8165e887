//! One generation run: a chunk source driven into a [`Session`].

use log::{error, info};

use trellis_core::{
    error::{Diagnostic, ErrorCode},
    identifier::Id,
};

use crate::{
    config::LayoutConfig,
    error::TransportError,
    host::HostSurface,
    session::{
        lifecycle::{LifecycleEmitter, LifecycleObserver},
        orchestrator::{Session, SessionOptions},
        replacement::{Replacement, ReplacementOutcome},
    },
};

/// Result of [`Generation::run`].
#[derive(Debug)]
pub struct GenerationOutcome {
    session: Session,
    replacement: ReplacementOutcome,
    error: Option<TransportError>,
    chunks: usize,
    bytes: usize,
}

impl GenerationOutcome {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn replacement(&self) -> ReplacementOutcome {
        self.replacement
    }

    /// The transport failure that ended the run, if any.
    pub fn error(&self) -> Option<&TransportError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Chunks received before the run ended.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

/// Configuration of one run.
///
/// # Examples
///
/// ```
/// use trellis::{
///     TransportError,
///     config::LayoutConfig,
///     export::svg::SvgSurface,
///     session::{EventLog, Generation},
/// };
///
/// let chunks = [r#"<node id="a" row="0" col="0">Hel"#, "lo</node>"]
///     .map(|chunk| Ok::<_, TransportError>(chunk.to_string()));
///
/// let mut surface = SvgSurface::default();
/// let mut events = EventLog::new();
/// let outcome = Generation::new(LayoutConfig::default()).run(chunks, &mut surface, &mut events);
///
/// assert!(outcome.is_success());
/// assert_eq!(outcome.session().node_content("a".into()), Some("Hello"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Generation {
    config: LayoutConfig,
    options: SessionOptions,
    originals: Vec<Id>,
}

impl Generation {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            options: SessionOptions::default(),
            originals: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Elements the new content replaces.
    ///
    /// They are removed from the host when the first chunk arrives, and kept
    /// if the run fails before that.
    pub fn replacing(mut self, originals: Vec<Id>) -> Self {
        self.originals = originals;
        self
    }

    /// Drives every chunk into a fresh session.
    ///
    /// A transport error ends the run immediately: no further chunks are
    /// read, the stream is not finished, and the partial content already on
    /// the surface stays as the result.
    pub fn run<I, H, O>(self, chunks: I, host: &mut H, observer: &mut O) -> GenerationOutcome
    where
        I: IntoIterator<Item = Result<String, TransportError>>,
        H: HostSurface,
        O: LifecycleObserver + ?Sized,
    {
        let mut session = Session::new(self.config, self.options);
        let mut replacement = Replacement::new(self.originals);
        let mut emitter = LifecycleEmitter::new(observer);
        let mut received = 0usize;
        let mut bytes = 0usize;

        emitter.start();
        for chunk in chunks {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    error!(chunks = received, err:% = err; "Stream transport failed");
                    session.diagnostic_collector_mut().emit(
                        Diagnostic::error(format!("stream transport failed: {err}"))
                            .with_code(ErrorCode::E300),
                    );
                    emitter.fail(err.message());
                    return GenerationOutcome {
                        session,
                        replacement: replacement.outcome(),
                        error: Some(err),
                        chunks: received,
                        bytes,
                    };
                }
            };

            replacement.on_chunk(host);
            received += 1;
            bytes += chunk.len();

            for id in session.feed(&chunk, host) {
                emitter.element_created(id);
            }
            emitter.progress(received, bytes);
        }

        for id in session.finish(host) {
            emitter.element_created(id);
        }
        emitter.complete(session.element_count());
        info!(chunks = received, bytes, elements = session.element_count(); "Generation completed");

        GenerationOutcome {
            session,
            replacement: replacement.outcome(),
            error: None,
            chunks: received,
            bytes,
        }
    }
}
