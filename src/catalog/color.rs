//! Background and foreground color inference from rendered pixels.

use crate::backend::CatalogPage;
use crate::domain::{Rect, Rgb};
use crate::error::{CatalogError, CatalogResult};
use image::RgbImage;
use tracing::warn;

/// Margin added around a region before sampling its background.
pub const BACKGROUND_MARGIN: f32 = 5.0;

/// Minimum channel-wise absolute difference (out of 765) for a pixel to
/// count as foreground.
pub const FOREGROUND_THRESHOLD: u32 = 100;

/// Scale of the whole-page render used to find the dominant page color.
pub const PAGE_BACKGROUND_SCALE: f32 = 0.01;

/// Inferred colors of a page region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub background: Rgb,
    pub foreground: Rgb,
}

/// Infers colors by reading rendered pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorSampler;

impl ColorSampler {
    /// Black for light backgrounds, white for dark ones.
    pub fn contrast_of(background: Rgb) -> Rgb {
        background.contrast()
    }

    /// Background color around `region`; white if rendering fails.
    pub fn sample_background<P: CatalogPage + ?Sized>(page: &P, region: &Rect) -> Rgb {
        Self::try_background(page, region).unwrap_or_else(|e| {
            warn!(error = %e, "Background sampling failed, using white");
            Rgb::WHITE
        })
    }

    /// Reads the top-left pixel of the region grown by [`BACKGROUND_MARGIN`].
    pub fn try_background<P: CatalogPage + ?Sized>(page: &P, region: &Rect) -> CatalogResult<Rgb> {
        let raster = page.rasterize(Some(region.expand(BACKGROUND_MARGIN)), 1.0)?;
        corner_pixel(&raster).map(Rgb::from_u8)
    }

    /// Text color inside `region`.
    ///
    /// Falls back to the contrast of the region's corner color when no pixel
    /// stands out, and to black if rendering fails.
    pub fn sample_foreground<P: CatalogPage + ?Sized>(page: &P, region: &Rect) -> Rgb {
        Self::try_foreground(page, region).unwrap_or_else(|e| {
            warn!(error = %e, "Foreground sampling failed, using black");
            Rgb::BLACK
        })
    }

    pub fn try_foreground<P: CatalogPage + ?Sized>(page: &P, region: &Rect) -> CatalogResult<Rgb> {
        let raster = page.rasterize(Some(*region), 1.0)?;
        let corner = corner_pixel(&raster)?;
        Ok(match first_contrasting_pixel(&raster, corner) {
            Some(pixel) => Rgb::from_u8(pixel),
            None => Self::contrast_of(Rgb::from_u8(corner)),
        })
    }

    /// Samples both colors of a region.
    pub fn sample<P: CatalogPage + ?Sized>(page: &P, region: &Rect) -> ColorSample {
        ColorSample {
            background: Self::sample_background(page, region),
            foreground: Self::sample_foreground(page, region),
        }
    }

    /// Dominant color of the whole page, read from a heavily down-scaled
    /// render; white if rendering fails.
    pub fn page_background<P: CatalogPage + ?Sized>(page: &P) -> Rgb {
        page.rasterize(None, PAGE_BACKGROUND_SCALE)
            .and_then(|raster| corner_pixel(&raster))
            .map(Rgb::from_u8)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Page background sampling failed, using white");
                Rgb::WHITE
            })
    }
}

fn corner_pixel(raster: &RgbImage) -> CatalogResult<[u8; 3]> {
    if raster.width() == 0 || raster.height() == 0 {
        return Err(CatalogError::ColorSampleFailed {
            reason: "Rendered region is empty".to_string(),
        });
    }
    Ok(raster.get_pixel(0, 0).0)
}

/// Scans row by row for the first pixel that differs from `reference` by
/// more than [`FOREGROUND_THRESHOLD`]; stops at the first hit.
pub fn first_contrasting_pixel(raster: &RgbImage, reference: [u8; 3]) -> Option<[u8; 3]> {
    raster.pixels().map(|p| p.0).find(|pixel| {
        let diff: u32 = pixel
            .iter()
            .zip(reference.iter())
            .map(|(a, b)| u32::from(a.abs_diff(*b)))
            .sum();
        diff > FOREGROUND_THRESHOLD
    })
}
