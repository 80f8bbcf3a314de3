//! Brand image loaded once per run.

use crate::error::{CatalogError, CatalogResult};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// A decoded brand image ready to be embedded into pages.
#[derive(Debug, Clone)]
pub struct BrandImage {
    path: PathBuf,
    pixels: RgbaImage,
}

impl BrandImage {
    /// Decodes the image at `path` (any format supported by `image`).
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if !path.exists() {
            return Err(CatalogError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let pixels = image::open(path)
            .map_err(|e| CatalogError::ImageInsertFailed {
                reason: format!("Failed to decode '{}': {}", path.display(), e),
            })?
            .to_rgba8();

        Ok(Self {
            path: path.to_path_buf(),
            pixels,
        })
    }

    /// Wraps already decoded pixels.
    pub fn from_pixels(path: impl Into<PathBuf>, pixels: RgbaImage) -> Self {
        Self {
            path: path.into(),
            pixels,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Width over height; 1.0 for degenerate images.
    pub fn aspect_ratio(&self) -> f32 {
        if self.pixels.height() == 0 {
            return 1.0;
        }
        self.pixels.width() as f32 / self.pixels.height() as f32
    }

    /// True if any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.pixels.pixels().any(|p| p.0[3] < u8::MAX)
    }
}
