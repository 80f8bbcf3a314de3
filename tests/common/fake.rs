//! In-memory page and document backends.
//!
//! `FakePage` lays out monospaced text lines and renders flat colors, which
//! is enough to drive every scan, sampler and drawing call without MuPDF.

use image::{Rgb as Pixel, RgbImage};
use repricer::backend::{
    CatalogBackend, CatalogPage, Picture, RunColor, SaveMode, TextRun, Word, DEFAULT_PAGE_SIZE,
};
use repricer::domain::{BrandImage, Point, Rect, Rgb};
use repricer::error::{CatalogError, CatalogResult};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Horizontal advance of every glyph, as a fraction of the font size.
pub const ADVANCE: f32 = 0.5;

/// A drawing call recorded by [`FakePage`].
#[derive(Debug, Clone, PartialEq)]
pub enum FakeOp {
    Fill(Rect, Rgb),
    Text {
        origin: Point,
        text: String,
        size: f32,
        color: Rgb,
    },
    Image(Rect, PathBuf),
}

#[derive(Debug, Clone)]
struct FakeLine {
    glyphs: Vec<(char, Rect)>,
    size: f32,
    color: Option<RunColor>,
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub label: String,
    pub bounds: Rect,
    pub paper: [u8; 3],
    pub ink: [u8; 3],
    pub pictures: Vec<Picture>,
    pub ops: Vec<FakeOp>,
    pub fail_raster: bool,
    pub fail_image: bool,
    lines: Vec<FakeLine>,
    patches: Vec<(Rect, [u8; 3])>,
}

impl FakePage {
    pub fn new(label: &str) -> Self {
        let (w, h) = DEFAULT_PAGE_SIZE;
        Self {
            label: label.to_string(),
            bounds: Rect::new(0.0, 0.0, w, h),
            paper: [255, 255, 255],
            ink: [0, 0, 0],
            pictures: Vec::new(),
            ops: Vec::new(),
            fail_raster: false,
            fail_image: false,
            lines: Vec::new(),
            patches: Vec::new(),
        }
    }

    pub fn with_paper(mut self, paper: [u8; 3]) -> Self {
        self.paper = paper;
        self
    }

    pub fn with_ink(mut self, ink: [u8; 3]) -> Self {
        self.ink = ink;
        self
    }

    /// Adds a line of text with its baseline starting at `(x, y)`.
    pub fn with_line(self, x: f32, y: f32, size: f32, text: &str) -> Self {
        self.with_styled_line(x, y, size, text, None)
    }

    pub fn with_styled_line(
        mut self,
        x: f32,
        y: f32,
        size: f32,
        text: &str,
        color: Option<RunColor>,
    ) -> Self {
        let advance = size * ADVANCE;
        let glyphs = text
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + i as f32 * advance;
                (c, Rect::new(x0, y - size, x0 + advance, y))
            })
            .collect();
        self.lines.push(FakeLine {
            glyphs,
            size,
            color,
        });
        self
    }

    /// Adds a picture painted at `rect`.
    pub fn with_picture(mut self, name: &str, rects: &[Rect]) -> Self {
        self.pictures.push(Picture {
            name: name.to_string(),
            rects: rects.to_vec(),
        });
        self
    }

    /// Paints a flat colored area into the rendered page.
    pub fn with_patch(mut self, rect: Rect, rgb: [u8; 3]) -> Self {
        self.patches.push((rect, rgb));
        self
    }

    pub fn fills(&self) -> Vec<(Rect, Rgb)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                FakeOp::Fill(rect, color) => Some((*rect, *color)),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                FakeOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn images(&self) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                FakeOp::Image(rect, _) => Some(*rect),
                _ => None,
            })
            .collect()
    }

    fn paint(&self, img: &mut RgbImage, rect: &Rect, rgb: [u8; 3], scale: f32) {
        let x0 = (rect.x0 * scale).max(0.0) as u32;
        let y0 = (rect.y0 * scale).max(0.0) as u32;
        let x1 = ((rect.x1 * scale).max(0.0) as u32).min(img.width());
        let y1 = ((rect.y1 * scale).max(0.0) as u32).min(img.height());
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Pixel(rgb));
            }
        }
    }
}

fn bounding(glyphs: &[(char, Rect)]) -> Option<Rect> {
    glyphs.iter().map(|(_, r)| *r).reduce(|a, b| a.union(&b))
}

impl CatalogPage for FakePage {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn text_runs(&self) -> CatalogResult<Vec<TextRun>> {
        Ok(self
            .lines
            .iter()
            .filter_map(|line| {
                Some(TextRun {
                    text: line.glyphs.iter().map(|(c, _)| *c).collect(),
                    bbox: bounding(&line.glyphs)?,
                    font_size: line.size,
                    color: line.color,
                    glyphs: line.glyphs.iter().map(|(_, r)| *r).collect(),
                })
            })
            .collect())
    }

    fn words(&self) -> CatalogResult<Vec<Word>> {
        let mut words = Vec::new();
        for line in &self.lines {
            for chunk in line.glyphs.split(|(c, _)| c.is_whitespace()) {
                if let Some(bbox) = bounding(chunk) {
                    words.push(Word {
                        bbox,
                        text: chunk.iter().map(|(c, _)| *c).collect(),
                    });
                }
            }
        }
        Ok(words)
    }

    fn text(&self, clip: Option<Rect>) -> CatalogResult<String> {
        let lines: Vec<String> = self
            .lines
            .iter()
            .map(|line| {
                line.glyphs
                    .iter()
                    .filter(|(_, r)| clip.map_or(true, |c| c.contains(r.center())))
                    .map(|(c, _)| *c)
                    .collect::<String>()
            })
            .filter(|text| clip.is_none() || !text.trim().is_empty())
            .collect();
        Ok(lines.join("\n"))
    }

    fn search(&self, needle: &str) -> CatalogResult<Vec<Rect>> {
        let needle: Vec<char> = needle.chars().collect();
        let mut hits = Vec::new();
        if needle.is_empty() {
            return Ok(hits);
        }
        for line in &self.lines {
            for window in line.glyphs.windows(needle.len()) {
                if window.iter().map(|(c, _)| *c).eq(needle.iter().copied()) {
                    hits.extend(bounding(window));
                }
            }
        }
        Ok(hits)
    }

    fn rasterize(&self, clip: Option<Rect>, scale: f32) -> CatalogResult<RgbImage> {
        if self.fail_raster {
            return Err(CatalogError::ColorSampleFailed {
                reason: "render disabled".to_string(),
            });
        }
        let w = ((self.bounds.width() * scale).ceil() as u32).max(1);
        let h = ((self.bounds.height() * scale).ceil() as u32).max(1);
        let mut img = RgbImage::from_pixel(w, h, Pixel(self.paper));
        for (rect, rgb) in &self.patches {
            self.paint(&mut img, rect, *rgb, scale);
        }
        for line in &self.lines {
            for (c, rect) in &line.glyphs {
                if !c.is_whitespace() {
                    // Strokes sit in the middle of the glyph cell
                    let stroke = Rect::new(
                        rect.x0 + rect.width() / 3.0,
                        rect.y0 + rect.height() / 3.0,
                        rect.x1 - rect.width() / 3.0,
                        rect.y1 - rect.height() / 3.0,
                    );
                    self.paint(&mut img, &stroke, self.ink, scale);
                }
            }
        }

        let Some(clip) = clip else {
            return Ok(img);
        };
        let x0 = (clip.x0 * scale).max(0.0) as u32;
        let y0 = (clip.y0 * scale).max(0.0) as u32;
        let x1 = ((clip.x1 * scale).ceil().max(0.0) as u32).min(w);
        let y1 = ((clip.y1 * scale).ceil().max(0.0) as u32).min(h);
        if x1 <= x0 || y1 <= y0 {
            return Ok(RgbImage::new(0, 0));
        }
        Ok(image::imageops::crop_imm(&img, x0, y0, x1 - x0, y1 - y0).to_image())
    }

    fn pictures(&self) -> CatalogResult<Vec<Picture>> {
        Ok(self.pictures.clone())
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) -> CatalogResult<()> {
        self.ops.push(FakeOp::Fill(rect, color));
        Ok(())
    }

    fn insert_text(
        &mut self,
        origin: Point,
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> CatalogResult<()> {
        self.ops.push(FakeOp::Text {
            origin,
            text: text.to_string(),
            size: font_size,
            color,
        });
        Ok(())
    }

    fn insert_image(&mut self, rect: Rect, image: &BrandImage) -> CatalogResult<()> {
        if self.fail_image {
            return Err(CatalogError::ImageInsertFailed {
                reason: "image insertion disabled".to_string(),
            });
        }
        self.ops.push(FakeOp::Image(rect, image.path().to_path_buf()));
        Ok(())
    }
}

/// What a [`FakeBackend`] did, readable after it was consumed by `save`.
#[derive(Debug, Default)]
pub struct FakeLog {
    pub loaded: Vec<usize>,
    pub output: Vec<FakePage>,
    pub saved_to: Option<PathBuf>,
    pub mode: Option<SaveMode>,
}

pub struct FakeBackend {
    pages: Vec<FakePage>,
    output: Vec<FakePage>,
    log: Rc<RefCell<FakeLog>>,
    pub fail_save: bool,
    pub fail_load: Option<usize>,
}

impl FakeBackend {
    pub fn new(pages: Vec<FakePage>) -> (Self, Rc<RefCell<FakeLog>>) {
        let log = Rc::new(RefCell::new(FakeLog::default()));
        let backend = Self {
            pages,
            output: Vec::new(),
            log: Rc::clone(&log),
            fail_save: false,
            fail_load: None,
        };
        (backend, log)
    }

    /// Plain pages labelled `p0`, `p1`, ... each with one price.
    pub fn numbered(count: usize) -> (Self, Rc<RefCell<FakeLog>>) {
        let pages = (0..count)
            .map(|i| {
                FakePage::new(&format!("p{}", i)).with_line(
                    50.0,
                    100.0,
                    12.0,
                    &format!("Item {}: R$ {},00", i, 10 + i),
                )
            })
            .collect();
        Self::new(pages)
    }
}

impl CatalogBackend for FakeBackend {
    type Page = FakePage;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn load_page(&self, index: usize) -> CatalogResult<FakePage> {
        if self.fail_load == Some(index) {
            return Err(CatalogError::Backend {
                backend: "fake".to_string(),
                message: format!("page {} is corrupt", index),
            });
        }
        self.log.borrow_mut().loaded.push(index);
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| CatalogError::InvalidInput {
                parameter: "page".to_string(),
                reason: format!("no page {}", index),
            })
    }

    fn new_page(&mut self) -> CatalogResult<FakePage> {
        Ok(FakePage::new("new"))
    }

    fn append_page(&mut self, page: FakePage) -> CatalogResult<()> {
        self.output.push(page);
        Ok(())
    }

    fn output_len(&self) -> usize {
        self.output.len()
    }

    fn save(self, path: &Path, mode: SaveMode) -> CatalogResult<()> {
        if self.fail_save {
            return Err(CatalogError::DocumentSaveFailed {
                path: path.to_path_buf(),
                reason: "disk full".to_string(),
            });
        }
        let mut log = self.log.borrow_mut();
        log.output = self.output;
        log.saved_to = Some(path.to_path_buf());
        log.mode = Some(mode);
        Ok(())
    }
}
