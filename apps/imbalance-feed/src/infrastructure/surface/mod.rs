//! In-Memory Chart Surface
//!
//! Stands in for a rendering host. Each attached sink publishes its rows to
//! a shared slot, so the process (or a test) can observe exactly what the
//! chart would draw without owning the sinks.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::application::ports::{ChartSink, ChartSurface, SeriesKind};
use crate::domain::chart::ChartRow;

#[derive(Debug, Default)]
struct SinkSlot {
    rows: Option<Vec<ChartRow>>,
    replacements: u64,
}

type SharedSlot = Arc<RwLock<SinkSlot>>;

/// Surface whose sinks can be observed from other handles.
///
/// Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    historical: SharedSlot,
    live: SharedSlot,
}

impl MemorySurface {
    /// Create a surface with nothing attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: SeriesKind) -> &SharedSlot {
        match kind {
            SeriesKind::Historical => &self.historical,
            SeriesKind::Live => &self.live,
        }
    }

    /// Rows currently drawn by a sink, or `None` if it was never attached.
    #[must_use]
    pub fn snapshot(&self, kind: SeriesKind) -> Option<Vec<ChartRow>> {
        self.slot(kind).read().rows.clone()
    }

    /// Whether a sink of this kind has been attached.
    #[must_use]
    pub fn is_attached(&self, kind: SeriesKind) -> bool {
        self.slot(kind).read().rows.is_some()
    }

    /// Wholesale replacements made through a sink since it was attached.
    #[must_use]
    pub fn replacements(&self, kind: SeriesKind) -> u64 {
        self.slot(kind).read().replacements
    }
}

impl ChartSurface for MemorySurface {
    fn attach(&mut self, kind: SeriesKind, rows: &[ChartRow]) -> Box<dyn ChartSink> {
        let slot = Arc::clone(self.slot(kind));
        {
            let mut guard = slot.write();
            guard.rows = Some(rows.to_vec());
            guard.replacements = 0;
        }
        tracing::debug!(series = kind.as_str(), rows = rows.len(), "Sink attached");
        Box::new(MemorySink { kind, slot })
    }
}

/// Sink writing into a `MemorySurface` slot.
#[derive(Debug)]
pub struct MemorySink {
    kind: SeriesKind,
    slot: SharedSlot,
}

impl ChartSink for MemorySink {
    fn replace(&mut self, rows: &[ChartRow]) {
        let mut guard = self.slot.write();
        guard.rows = Some(rows.to_vec());
        guard.replacements += 1;
        tracing::trace!(series = self.kind.as_str(), rows = rows.len(), "Sink replaced");
    }
}
