//! Document backends.
//!
//! The catalog engine never touches a PDF library directly. It works against
//! the [`CatalogPage`] and [`CatalogBackend`] traits, which expose exactly the
//! page queries and drawing primitives the engine needs. [`PdfBackend`] is
//! the production implementation.

pub mod content;
pub mod fonts;
pub mod pdf;

pub use pdf::{PdfBackend, PdfPage};

use crate::domain::{BrandImage, Point, Rect, Rgb};
use crate::error::CatalogResult;
use image::RgbImage;
use std::ops::Range;
use std::path::Path;

/// Width and height of synthetic pages (A4 in points).
pub const DEFAULT_PAGE_SIZE: (f32, f32) = (595.0, 842.0);

/// Color attached to a text run by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunColor {
    /// Packed `0xRRGGBB`
    Packed(u32),
    /// Three components in either `0..=1` or `0..=255`
    Components([f32; 3]),
}

impl RunColor {
    pub fn to_rgb(self) -> Rgb {
        match self {
            Self::Packed(value) => Rgb::from_packed(value),
            Self::Components(c) => Rgb::from_components(c),
        }
    }
}

/// A contiguous stretch of text sharing one font, size and color.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub bbox: Rect,
    pub font_size: f32,
    pub color: Option<RunColor>,
    /// Per-character boxes aligned with `text.chars()`; may be empty
    pub glyphs: Vec<Rect>,
}

impl TextRun {
    /// Box around the characters in the byte range `range` of `text`.
    ///
    /// Falls back to the whole run when glyph boxes are not available.
    pub fn range_bbox(&self, range: Range<usize>) -> Rect {
        if self.glyphs.len() != self.text.chars().count() {
            return self.bbox;
        }
        let (Some(before), Some(inside)) = (self.text.get(..range.start), self.text.get(range))
        else {
            return self.bbox;
        };
        let start = before.chars().count();
        let len = inside.chars().count();
        self.glyphs[start..start + len]
            .iter()
            .copied()
            .reduce(|acc, r| acc.union(&r))
            .unwrap_or(self.bbox)
    }
}

/// A whitespace-delimited word with its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub bbox: Rect,
    pub text: String,
}

/// An embedded picture and every rectangle it is painted at.
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub name: String,
    pub rects: Vec<Rect>,
}

/// Output trade-off when writing a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Keep objects and streams as they are
    #[default]
    Preserve,
    /// Drop unreachable objects and deflate streams
    Compact,
}

/// A single page: layout queries, rasterization and drawing primitives.
///
/// Drawing never alters existing content; it paints on top of it.
pub trait CatalogPage {
    /// Visible area of the page (crop box) in page space.
    fn bounds(&self) -> Rect;

    /// Text runs in reading order.
    fn text_runs(&self) -> CatalogResult<Vec<TextRun>>;

    /// Word tokens in reading order.
    fn words(&self) -> CatalogResult<Vec<Word>>;

    /// Plain text of the page, or of the part inside `clip`.
    fn text(&self, clip: Option<Rect>) -> CatalogResult<String>;

    /// Every rectangle where `needle` occurs.
    fn search(&self, needle: &str) -> CatalogResult<Vec<Rect>>;

    /// Renders the page (or `clip`) at `scale` pixels per unit.
    fn rasterize(&self, clip: Option<Rect>, scale: f32) -> CatalogResult<RgbImage>;

    /// Embedded pictures with their painted rectangles.
    fn pictures(&self) -> CatalogResult<Vec<Picture>>;

    /// Paints an opaque rectangle.
    fn fill_rect(&mut self, rect: Rect, color: Rgb) -> CatalogResult<()>;

    /// Writes `text` with its baseline starting at `origin`.
    fn insert_text(
        &mut self,
        origin: Point,
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> CatalogResult<()>;

    /// Draws `image` inside `rect`, preserving its aspect ratio.
    fn insert_image(&mut self, rect: Rect, image: &BrandImage) -> CatalogResult<()>;

    /// Advance width of `text` in the font used by [`CatalogPage::insert_text`].
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        fonts::text_width(text, font_size)
    }
}

/// A source document plus the output document being assembled from it.
pub trait CatalogBackend {
    type Page: CatalogPage;

    /// Number of pages in the source document.
    fn page_count(&self) -> usize;

    /// Loads a source page for processing.
    fn load_page(&self, index: usize) -> CatalogResult<Self::Page>;

    /// Creates a blank page of [`DEFAULT_PAGE_SIZE`] for the output.
    fn new_page(&mut self) -> CatalogResult<Self::Page>;

    /// Appends a (possibly processed) page to the output document.
    fn append_page(&mut self, page: Self::Page) -> CatalogResult<()>;

    /// Number of pages appended so far.
    fn output_len(&self) -> usize;

    /// Writes the output document and releases both documents.
    fn save(self, path: &Path, mode: SaveMode) -> CatalogResult<()>;
}
