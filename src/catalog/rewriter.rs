//! Per-page price rewriting.

use super::color::{ColorSample, ColorSampler};
use super::locator::{PriceLocator, PriceOccurrence, Strategy};
use super::occlusion::OcclusionTracker;
use crate::backend::CatalogPage;
use crate::domain::{NumericFormatter, Point, Rect};
use crate::error::{CatalogError, CatalogResult};
use tracing::{debug, warn};

/// Bounds of the estimated font size when no style is known.
pub const MIN_FONT_SIZE: f32 = 8.0;
pub const MAX_FONT_SIZE: f32 = 72.0;

/// Distance between the region's bottom edge and the new text baseline.
pub const BASELINE_OFFSET: f32 = 2.0;

/// Replaces every detected price on a page with its marked-up value.
#[derive(Debug, Clone)]
pub struct PriceRewriter {
    locator: PriceLocator,
    markup: f64,
}

impl PriceRewriter {
    pub fn new(markup: f64) -> Self {
        Self {
            locator: PriceLocator::new(),
            markup,
        }
    }

    /// Rewrites all prices on `page` and returns how many were updated.
    ///
    /// Scans run in [`Strategy::ALL`] order against one fresh
    /// [`OcclusionTracker`]. A failing scan or occurrence is logged and
    /// skipped; the rest of the page is still processed.
    pub fn rewrite_page<P: CatalogPage + ?Sized>(&self, page: &mut P) -> usize {
        let mut tracker = OcclusionTracker::new();
        let mut updated = 0;

        for strategy in Strategy::ALL {
            let occurrences = match self.locator.scan(page, strategy) {
                Ok(found) => found,
                Err(e) => {
                    warn!(strategy = %strategy, error = %e, "Price scan failed");
                    continue;
                }
            };

            for occurrence in occurrences {
                match self.rewrite_occurrence(page, &mut tracker, &occurrence) {
                    Ok(true) => updated += 1,
                    Ok(false) => {}
                    Err(CatalogError::PriceUnparsable { text }) => {
                        debug!(text = %text, "Skipping unparseable price");
                    }
                    Err(e) => {
                        warn!(
                            text = %occurrence.raw_text,
                            strategy = %strategy,
                            error = %e,
                            "Failed to rewrite price"
                        );
                    }
                }
            }
        }

        updated
    }

    /// Rewrites one occurrence. Returns `Ok(false)` for a region that was
    /// already rewritten on this page.
    pub fn rewrite_occurrence<P: CatalogPage + ?Sized>(
        &self,
        page: &mut P,
        tracker: &mut OcclusionTracker,
        occurrence: &PriceOccurrence,
    ) -> CatalogResult<bool> {
        let region = occurrence.region;
        if tracker.already_processed(&region, occurrence.strategy.tolerance()) {
            return Ok(false);
        }

        if !occurrence.is_price() {
            return Err(CatalogError::PriceUnparsable {
                text: occurrence.raw_text.clone(),
            });
        }

        let new_value = occurrence.parsed_value + self.markup;
        let text = NumericFormatter::try_format(new_value).ok_or_else(|| {
            CatalogError::InvalidInput {
                parameter: "price".to_string(),
                reason: format!("{} + {} cannot be printed", occurrence.parsed_value, self.markup),
            }
        })?;

        let colors = match occurrence.style.and_then(|s| s.color) {
            Some(foreground) => ColorSample {
                background: ColorSampler::sample_background(&*page, &region),
                foreground,
            },
            None => ColorSampler::sample(&*page, &region),
        };
        let font_size = occurrence
            .style
            .map(|s| s.font_size)
            .filter(|size| size.is_finite() && *size > 0.0)
            .unwrap_or_else(|| estimate_font_size(&region));

        let anchor = region.bottom_left();
        page.fill_rect(region, colors.background)?;
        page.insert_text(
            Point::new(anchor.x, anchor.y - BASELINE_OFFSET),
            &text,
            font_size,
            colors.foreground,
        )?;
        tracker.commit(region);

        debug!(
            from = %occurrence.raw_text,
            to = %text,
            strategy = %occurrence.strategy,
            "Price rewritten"
        );
        Ok(true)
    }
}

/// Font size for a region without a style hint: three quarters of its
/// height, clamped to [`MIN_FONT_SIZE`]..=[`MAX_FONT_SIZE`].
pub fn estimate_font_size(region: &Rect) -> f32 {
    (region.height() * 0.75).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}
