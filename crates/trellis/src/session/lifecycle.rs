//! Lifecycle events of one generation run.
//!
//! A run emits exactly one [`LifecycleEventKind::Started`] first, then any
//! number of element and progress events, then exactly one terminal event.
//! [`LifecycleEmitter`] enforces that sequence whatever order its methods
//! are called in.

use std::time::{Duration, Instant};

use log::{debug, trace};

use trellis_core::identifier::Id;

/// Minimum spacing between two event timestamps.
const TIMESTAMP_STEP: Duration = Duration::from_micros(1);

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEventKind {
    Started,
    ElementCreated { id: Id },
    Progress { chunks: usize, bytes: usize },
    Completed { elements: usize },
    Failed { error: String },
}

impl LifecycleEventKind {
    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    kind: LifecycleEventKind,
    /// Time since the run started.
    timestamp: Duration,
}

impl LifecycleEvent {
    pub fn kind(&self) -> &LifecycleEventKind {
        &self.kind
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

/// Receives lifecycle events.
pub trait LifecycleObserver {
    fn on_event(&mut self, event: &LifecycleEvent);
}

impl<F> LifecycleObserver for F
where
    F: FnMut(&LifecycleEvent),
{
    fn on_event(&mut self, event: &LifecycleEvent) {
        self(event)
    }
}

/// Observer that records every event.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<LifecycleEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    pub fn kinds(&self) -> impl Iterator<Item = &LifecycleEventKind> {
        self.events.iter().map(LifecycleEvent::kind)
    }
}

impl LifecycleObserver for EventLog {
    fn on_event(&mut self, event: &LifecycleEvent) {
        self.events.push(event.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Done,
}

/// Sequencing guard in front of a [`LifecycleObserver`].
///
/// Events before [`start`](Self::start) or after a terminal event are
/// dropped. Timestamps are strictly increasing.
pub struct LifecycleEmitter<'a, O: LifecycleObserver + ?Sized> {
    observer: &'a mut O,
    phase: Phase,
    started_at: Instant,
    last: Option<Duration>,
}

impl<'a, O: LifecycleObserver + ?Sized> LifecycleEmitter<'a, O> {
    pub fn new(observer: &'a mut O) -> Self {
        Self {
            observer,
            phase: Phase::Idle,
            started_at: Instant::now(),
            last: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Emits the start event. Only the first call has an effect.
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.phase = Phase::Running;
        self.started_at = Instant::now();
        self.send(LifecycleEventKind::Started);
        true
    }

    pub fn element_created(&mut self, id: Id) -> bool {
        self.emit(LifecycleEventKind::ElementCreated { id })
    }

    pub fn progress(&mut self, chunks: usize, bytes: usize) -> bool {
        self.emit(LifecycleEventKind::Progress { chunks, bytes })
    }

    /// Emits the success event and closes the run.
    pub fn complete(&mut self, elements: usize) -> bool {
        self.emit(LifecycleEventKind::Completed { elements })
    }

    /// Emits the failure event and closes the run.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        self.emit(LifecycleEventKind::Failed {
            error: error.into(),
        })
    }

    fn emit(&mut self, kind: LifecycleEventKind) -> bool {
        if self.phase != Phase::Running {
            debug!(event:? = kind, phase:? = self.phase; "Dropping out-of-sequence lifecycle event");
            return false;
        }
        if kind.is_terminal() {
            self.phase = Phase::Done;
        }
        self.send(kind);
        true
    }

    fn send(&mut self, kind: LifecycleEventKind) {
        let elapsed = self.started_at.elapsed();
        let timestamp = match self.last {
            Some(last) if elapsed <= last => last + TIMESTAMP_STEP,
            _ => elapsed,
        };
        self.last = Some(timestamp);

        trace!(event:? = kind, timestamp:? = timestamp; "Lifecycle event");
        self.observer.on_event(&LifecycleEvent { kind, timestamp });
    }
}
