//! Per-page bookkeeping of regions that were already rewritten.

use crate::domain::Rect;

/// Edge tolerance for span, word and line detections.
pub const DEFAULT_TOLERANCE: f32 = 5.0;

/// Edge tolerance for symbol-anchored detections.
pub const ANCHOR_TOLERANCE: f32 = 20.0;

/// Regions committed on the current page.
///
/// A fresh tracker is created for every page; no two committed regions are
/// near-identical under the tolerance used to check them.
#[derive(Debug, Clone, Default)]
pub struct OcclusionTracker {
    committed: Vec<Rect>,
}

impl OcclusionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if some committed region has all four edges within `tolerance`
    /// of `region`.
    pub fn already_processed(&self, region: &Rect, tolerance: f32) -> bool {
        self.committed
            .iter()
            .any(|existing| existing.near_identical(region, tolerance))
    }

    /// Records a region. Callers check [`already_processed`](Self::already_processed) first.
    pub fn commit(&mut self, region: Rect) {
        self.committed.push(region);
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn regions(&self) -> &[Rect] {
        &self.committed
    }
}
