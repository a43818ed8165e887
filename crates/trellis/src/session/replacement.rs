//! Two-phase replacement of a region's existing content.
//!
//! Regenerating a region must never leave it empty because of a transient
//! failure. The originals stay on the surface until the first chunk of new
//! content arrives and are removed exactly once, at that moment.

use log::info;

use trellis_core::identifier::Id;

use crate::host::HostSurface;

/// What happened to the originals once a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementOutcome {
    /// No new content arrived; all originals are still on the surface.
    Preserved { kept: usize },
    /// The originals were removed when new content first arrived.
    Replaced { removed: usize },
}

/// Tracks the originals of a region being regenerated.
#[derive(Debug, Clone)]
pub struct Replacement {
    originals: Vec<Id>,
    committed: bool,
}

impl Replacement {
    pub fn new(originals: Vec<Id>) -> Self {
        Self {
            originals,
            committed: false,
        }
    }

    /// A replacement with no originals. Committing it removes nothing.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn originals(&self) -> &[Id] {
        &self.originals
    }

    /// Whether the originals have been removed.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Call for every successfully received chunk.
    ///
    /// The first call removes the originals from `host`; later calls do
    /// nothing. Returns `true` on the call that removed them.
    pub fn on_chunk(&mut self, host: &mut impl HostSurface) -> bool {
        if self.committed {
            return false;
        }
        self.committed = true;

        info!(originals = self.originals.len(); "New content arrived, removing originals");
        for &id in &self.originals {
            host.remove_element(id);
        }
        true
    }

    pub fn outcome(&self) -> ReplacementOutcome {
        if self.committed {
            ReplacementOutcome::Replaced {
                removed: self.originals.len(),
            }
        } else {
            ReplacementOutcome::Preserved {
                kept: self.originals.len(),
            }
        }
    }
}
