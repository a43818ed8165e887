//! Streaming sessions.
//!
//! A [`Session`] turns a chunked tag stream into placed elements on a
//! [`HostSurface`](crate::host::HostSurface). [`Generation`] wraps a session
//! with the run-level guarantees: originals of a regenerated region are
//! replaced in two phases, and lifecycle events are emitted in a fixed
//! sequence.

mod generation;
mod lifecycle;
mod orchestrator;
mod replacement;
mod resolver;
#[cfg(test)]
mod session_tests;

pub use generation::{Generation, GenerationOutcome};
pub use lifecycle::{
    EventLog, LifecycleEmitter, LifecycleEvent, LifecycleEventKind, LifecycleObserver,
};
pub use orchestrator::{Session, SessionOptions};
pub use replacement::{Replacement, ReplacementOutcome};
pub use resolver::{DependencyResolver, Pending};
