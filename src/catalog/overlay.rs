//! Brand logo placement on product pictures.

use crate::backend::CatalogPage;
use crate::domain::{BrandImage, Rect};
use tracing::{debug, warn};

/// Smallest visible side for a picture to count as a product photo.
pub const MIN_PICTURE_SIDE: f32 = 100.0;

/// Accepted width/height ratio of product photos.
pub const MIN_ASPECT: f32 = 0.3;
pub const MAX_ASPECT: f32 = 3.0;

/// Logo side as a fraction of the visible picture width.
pub const LOGO_SCALE: f32 = 0.15;

/// Inset of the logo from the picture's bottom-left corner.
pub const LOGO_INSET: f32 = 20.0;

/// Stamps a brand image onto every qualifying picture of a page.
#[derive(Debug, Clone, Copy)]
pub struct ImageOverlayPlacer<'a> {
    logo: &'a BrandImage,
}

impl<'a> ImageOverlayPlacer<'a> {
    pub fn new(logo: &'a BrandImage) -> Self {
        Self { logo }
    }

    /// Places the logo on each qualifying picture rectangle and returns how
    /// many logos were drawn.
    pub fn place<P: CatalogPage + ?Sized>(&self, page: &mut P) -> usize {
        let pictures = match page.pictures() {
            Ok(pictures) => pictures,
            Err(e) => {
                warn!(error = %e, "Picture enumeration failed");
                return 0;
            }
        };

        let bounds = page.bounds();
        let mut placed = 0;
        for picture in &pictures {
            for rect in &picture.rects {
                let Some(dest) = logo_destination(rect, &bounds) else {
                    debug!(picture = %picture.name, "Picture does not qualify for a logo");
                    continue;
                };
                match page.insert_image(dest, self.logo) {
                    Ok(()) => placed += 1,
                    Err(e) => warn!(picture = %picture.name, error = %e, "Failed to insert logo"),
                }
            }
        }
        placed
    }
}

/// Where the logo goes for a picture painted at `painted`, or `None` if the
/// visible part of the picture is too small or too elongated.
pub fn logo_destination(painted: &Rect, bounds: &Rect) -> Option<Rect> {
    let visible = painted.intersect(bounds);
    if visible.is_empty()
        || visible.width() < MIN_PICTURE_SIDE
        || visible.height() < MIN_PICTURE_SIDE
    {
        return None;
    }

    let aspect = visible.width() / visible.height();
    if !(MIN_ASPECT..=MAX_ASPECT).contains(&aspect) {
        return None;
    }

    let size = visible.width() * LOGO_SCALE;
    Some(Rect::new(
        visible.x0 + LOGO_INSET,
        visible.y1 - size - LOGO_INSET,
        visible.x0 + size + LOGO_INSET,
        visible.y1 - LOGO_INSET,
    ))
}
