//! PDF backend using MuPDF and lopdf.
//!
//! MuPDF reads the source: text layout, literal search and rasterization.
//! lopdf owns the object graph: drawing commands queued on a page are
//! appended as a new content stream when the page is transferred to the
//! output, and the output page tree is rebuilt on save.

use super::content::{self, DrawOp, PageFrame, INHERITABLE_KEYS};
use super::{
    CatalogBackend, CatalogPage, Picture, SaveMode, TextRun, Word, DEFAULT_PAGE_SIZE,
};
use crate::domain::{BrandImage, Point, Rect, Rgb};
use crate::error::{CatalogError, CatalogResult};
use image::{imageops, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use mupdf::pdf::PdfDocument;
use mupdf::{Colorspace, Matrix, Quad, TextPageOptions};
use once_cell::unsync::OnceCell;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maximum search hits per needle and page.
const MAX_SEARCH_HITS: u32 = 500;

/// Resource name of the font used for new text.
const FONT_RESOURCE: &str = "RpF1";

/// Prefix for resource names of inserted images.
const IMAGE_RESOURCE_PREFIX: &str = "RpIm";

/// Catalog entries that point into the old page tree.
const STALE_CATALOG_KEYS: [&[u8]; 4] = [b"Outlines", b"StructTreeRoot", b"OpenAction", b"PageLabels"];

/// Thumbnail rasterization scale.
pub const THUMBNAIL_SCALE: f32 = 0.15;

#[derive(Debug, Clone)]
struct LayoutChar {
    c: char,
    bbox: Rect,
    size: f32,
}

#[derive(Debug, Clone)]
struct LayoutLine {
    chars: Vec<LayoutChar>,
}

enum PageSource {
    /// A page of the source document
    Source {
        index: usize,
        page_id: ObjectId,
        page: mupdf::Page,
    },
    /// A page created from scratch
    Blank,
}

/// A page loaded from (or created for) a [`PdfBackend`].
pub struct PdfPage {
    source: PageSource,
    bounds: Rect,
    frame: PageFrame,
    pictures: Vec<Picture>,
    layout: OnceCell<Vec<LayoutLine>>,
    raster: OnceCell<RgbImage>,
    ops: Vec<DrawOp>,
    images: Vec<BrandImage>,
}

impl PdfPage {
    fn blank(width: f32, height: f32) -> Self {
        Self {
            source: PageSource::Blank,
            bounds: Rect::new(0.0, 0.0, width, height),
            frame: PageFrame::sized(width, height),
            pictures: Vec::new(),
            layout: OnceCell::new(),
            raster: OnceCell::new(),
            ops: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Zero-based index in the source document, if any.
    pub fn source_index(&self) -> Option<usize> {
        match &self.source {
            PageSource::Source { index, .. } => Some(*index),
            PageSource::Blank => None,
        }
    }

    /// Number of drawing commands queued on this page.
    pub fn pending_operations(&self) -> usize {
        self.ops.len()
    }

    fn layout(&self) -> CatalogResult<&[LayoutLine]> {
        self.layout
            .get_or_try_init(|| match &self.source {
                PageSource::Source { page, .. } => read_layout(page),
                PageSource::Blank => Ok(Vec::new()),
            })
            .map(|lines| lines.as_slice())
    }

    fn full_raster(&self, scale: f32) -> CatalogResult<Cow<'_, RgbImage>> {
        let page = match &self.source {
            PageSource::Source { page, .. } => page,
            PageSource::Blank => {
                return Err(CatalogError::backend("MuPDF", "Blank pages cannot be rendered"))
            }
        };
        if (scale - 1.0).abs() < f32::EPSILON {
            return self
                .raster
                .get_or_try_init(|| render(page, 1.0))
                .map(Cow::Borrowed);
        }
        render(page, scale).map(Cow::Owned)
    }

    fn image_index(&mut self, image: &BrandImage) -> usize {
        if let Some(idx) = self.images.iter().position(|i| i.path() == image.path()) {
            return idx;
        }
        self.images.push(image.clone());
        self.images.len() - 1
    }
}

impl CatalogPage for PdfPage {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn text_runs(&self) -> CatalogResult<Vec<TextRun>> {
        let mut runs = Vec::new();
        for line in self.layout()? {
            let mut current: Option<TextRun> = None;
            for ch in &line.chars {
                match current.as_mut() {
                    Some(run) if (run.font_size - ch.size).abs() < 0.01 => {
                        run.text.push(ch.c);
                        run.bbox = run.bbox.union(&ch.bbox);
                        run.glyphs.push(ch.bbox);
                    }
                    _ => {
                        runs.extend(current.take());
                        current = Some(TextRun {
                            text: ch.c.to_string(),
                            bbox: ch.bbox,
                            font_size: ch.size,
                            color: None,
                            glyphs: vec![ch.bbox],
                        });
                    }
                }
            }
            runs.extend(current);
        }
        Ok(runs)
    }

    fn words(&self) -> CatalogResult<Vec<Word>> {
        let mut words = Vec::new();
        for line in self.layout()? {
            let mut current: Option<Word> = None;
            for ch in &line.chars {
                if ch.c.is_whitespace() {
                    words.extend(current.take());
                    continue;
                }
                match current.as_mut() {
                    Some(word) => {
                        word.text.push(ch.c);
                        word.bbox = word.bbox.union(&ch.bbox);
                    }
                    None => {
                        current = Some(Word {
                            bbox: ch.bbox,
                            text: ch.c.to_string(),
                        })
                    }
                }
            }
            words.extend(current);
        }
        Ok(words)
    }

    fn text(&self, clip: Option<Rect>) -> CatalogResult<String> {
        let mut lines = Vec::new();
        for line in self.layout()? {
            let text: String = line
                .chars
                .iter()
                .filter(|ch| clip.map_or(true, |c| c.contains(ch.bbox.center())))
                .map(|ch| ch.c)
                .collect();
            if clip.is_none() || !text.trim().is_empty() {
                lines.push(text);
            }
        }
        Ok(lines.join("\n"))
    }

    fn search(&self, needle: &str) -> CatalogResult<Vec<Rect>> {
        let page = match &self.source {
            PageSource::Source { page, .. } => page,
            PageSource::Blank => return Ok(Vec::new()),
        };
        let hits = page
            .search(needle, MAX_SEARCH_HITS)
            .map_err(|e| CatalogError::backend("MuPDF", format!("Search failed for '{}': {}", needle, e)))?;
        Ok(hits.iter().map(quad_rect).collect())
    }

    fn rasterize(&self, clip: Option<Rect>, scale: f32) -> CatalogResult<RgbImage> {
        let full = self.full_raster(scale)?;
        let Some(clip) = clip else {
            return Ok(full.into_owned());
        };

        let x0 = (clip.x0 * scale).floor().max(0.0) as u32;
        let y0 = (clip.y0 * scale).floor().max(0.0) as u32;
        let x1 = ((clip.x1 * scale).ceil().max(0.0) as u32).min(full.width());
        let y1 = ((clip.y1 * scale).ceil().max(0.0) as u32).min(full.height());
        if x1 <= x0 || y1 <= y0 {
            return Err(CatalogError::ColorSampleFailed {
                reason: format!("Clip {:?} lies outside the page", clip),
            });
        }
        Ok(imageops::crop_imm(&*full, x0, y0, x1 - x0, y1 - y0).to_image())
    }

    fn pictures(&self) -> CatalogResult<Vec<Picture>> {
        Ok(self.pictures.clone())
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb) -> CatalogResult<()> {
        self.ops.push(DrawOp::Fill { rect, color });
        Ok(())
    }

    fn insert_text(
        &mut self,
        origin: Point,
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> CatalogResult<()> {
        self.ops.push(DrawOp::Text {
            origin,
            text: text.to_string(),
            font_size,
            color,
        });
        Ok(())
    }

    fn insert_image(&mut self, rect: Rect, image: &BrandImage) -> CatalogResult<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CatalogError::ImageInsertFailed {
                reason: format!("Image '{}' is empty", image.path().display()),
            });
        }
        if rect.is_empty() {
            return Err(CatalogError::ImageInsertFailed {
                reason: format!("Destination {:?} is empty", rect),
            });
        }
        let idx = self.image_index(image);
        self.ops.push(DrawOp::Image { rect, image: idx });
        Ok(())
    }
}

fn quad_rect(quad: &Quad) -> Rect {
    Rect::new(
        quad.ul.x.min(quad.ll.x).min(quad.ur.x).min(quad.lr.x),
        quad.ul.y.min(quad.ll.y).min(quad.ur.y).min(quad.lr.y),
        quad.ul.x.max(quad.ll.x).max(quad.ur.x).max(quad.lr.x),
        quad.ul.y.max(quad.ll.y).max(quad.ur.y).max(quad.lr.y),
    )
}

fn read_layout(page: &mupdf::Page) -> CatalogResult<Vec<LayoutLine>> {
    let text_page = page.to_text_page(TextPageOptions::empty())?;
    let mut lines = Vec::new();
    for block in text_page.blocks() {
        for line in block.lines() {
            let chars: Vec<LayoutChar> = line
                .chars()
                .filter_map(|ch| {
                    ch.char().map(|c| LayoutChar {
                        c,
                        bbox: quad_rect(&ch.quad()),
                        size: ch.size(),
                    })
                })
                .collect();
            if !chars.is_empty() {
                lines.push(LayoutLine { chars });
            }
        }
    }
    Ok(lines)
}

fn render(page: &mupdf::Page, scale: f32) -> CatalogResult<RgbImage> {
    let matrix = Matrix::new_scale(scale, scale);
    let pixmap = page.to_pixmap(&matrix, &Colorspace::device_rgb(), false, false)?;
    pixmap_to_rgb(&pixmap)
}

fn pixmap_to_rgb(pixmap: &mupdf::Pixmap) -> CatalogResult<RgbImage> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let n = pixmap.n() as usize;
    let samples = pixmap.samples();
    if width == 0 || height == 0 || n < 3 {
        return Err(CatalogError::backend("MuPDF", "Rendered an empty pixmap"));
    }

    let stride = samples.len() / height as usize;
    let mut buf = Vec::with_capacity(width as usize * height as usize * 3);
    for row in samples.chunks(stride).take(height as usize) {
        for px in row.chunks(n).take(width as usize) {
            buf.extend_from_slice(&px[..3]);
        }
    }

    RgbImage::from_raw(width, height, buf)
        .ok_or_else(|| CatalogError::backend("MuPDF", "Pixmap size mismatch"))
}

/// Source document opened with MuPDF and lopdf side by side.
pub struct PdfBackend {
    source: PdfDocument,
    doc: Document,
    page_ids: Vec<ObjectId>,
    output: Vec<ObjectId>,
    font_id: Option<ObjectId>,
    image_ids: HashMap<PathBuf, ObjectId>,
}

impl PdfBackend {
    /// Opens a PDF for processing.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if !path.exists() {
            return Err(CatalogError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let open_failed = |reason: String| CatalogError::DocumentOpenFailed {
            path: path.to_path_buf(),
            reason,
        };

        let path_str = path
            .to_str()
            .ok_or_else(|| open_failed("Path contains invalid UTF-8".to_string()))?;
        let source = PdfDocument::open(path_str).map_err(|e| open_failed(e.to_string()))?;
        let doc = Document::load(path).map_err(|e| open_failed(e.to_string()))?;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let mupdf_pages = source
            .page_count()
            .map_err(|e| open_failed(e.to_string()))?;
        if mupdf_pages as usize != page_ids.len() {
            return Err(open_failed(format!(
                "Page tree mismatch: MuPDF sees {} pages, lopdf sees {}",
                mupdf_pages,
                page_ids.len()
            )));
        }

        debug!(path = %path.display(), pages = page_ids.len(), "Opened source document");

        Ok(Self {
            source,
            doc,
            page_ids,
            output: Vec::new(),
            font_id: None,
            image_ids: HashMap::new(),
        })
    }

    /// Renders every page of `input` at thumbnail scale into `dir`.
    ///
    /// Returns the paths written so far if a page fails to render.
    pub fn thumbnails(input: &Path, dir: &Path) -> CatalogResult<Vec<PathBuf>> {
        let path_str = input.to_str().ok_or_else(|| CatalogError::InvalidInput {
            parameter: "input".to_string(),
            reason: "Path contains invalid UTF-8".to_string(),
        })?;
        let doc = mupdf::Document::open(path_str).map_err(|e| CatalogError::DocumentOpenFailed {
            path: input.to_path_buf(),
            reason: e.to_string(),
        })?;

        let stem = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let mut thumbs = Vec::new();
        for index in 0..doc.page_count()? {
            let result = doc
                .load_page(index)
                .map_err(CatalogError::from)
                .and_then(|page| render(&page, THUMBNAIL_SCALE))
                .and_then(|img| {
                    let target = dir.join(format!("thumb_{}_{}.jpg", stem, index));
                    img.save(&target)?;
                    Ok(target)
                });
            match result {
                Ok(target) => thumbs.push(target),
                Err(e) => {
                    warn!(page = index, error = %e, "Thumbnail generation stopped");
                    break;
                }
            }
        }
        Ok(thumbs)
    }

    fn font(&mut self) -> ObjectId {
        if let Some(id) = self.font_id {
            return id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => super::fonts::BASE_FONT,
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_id = Some(id);
        id
    }

    fn image_object(&mut self, image: &BrandImage) -> ObjectId {
        if let Some(id) = self.image_ids.get(image.path()) {
            return *id;
        }

        let pixels = image.pixels();
        let (width, height) = (i64::from(pixels.width()), i64::from(pixels.height()));
        let rgb: Vec<u8> = pixels.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect();

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };

        if image.has_transparency() {
            let alpha: Vec<u8> = pixels.pixels().map(|p| p.0[3]).collect();
            let smask_id = self.doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha,
            ));
            dict.set("SMask", smask_id);
        }

        let id = self.doc.add_object(Stream::new(dict, rgb));
        self.image_ids.insert(image.path().to_path_buf(), id);
        id
    }

    /// Registers font and images in `resources` and encodes the page's
    /// queued commands, preceded by `lead` operations.
    fn encode_ops(
        &mut self,
        page: &PdfPage,
        resources: &mut Dictionary,
        lead: Vec<Operation>,
    ) -> CatalogResult<Vec<u8>> {
        let mut fonts = resources
            .get(b"Font")
            .ok()
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_default();
        let mut xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_default();

        if page.ops.iter().any(|op| matches!(op, DrawOp::Text { .. })) {
            fonts.set(FONT_RESOURCE, self.font());
        }

        // One resource name per drawn image so each placement is enumerable.
        let mut names: Vec<Option<(String, f32)>> = Vec::new();
        let mut next = 0usize;
        for op in &page.ops {
            let DrawOp::Image { image, .. } = op else {
                names.push(None);
                continue;
            };
            let brand = &page.images[*image];
            let id = self.image_object(brand);
            let name = loop {
                next += 1;
                let candidate = format!("{}{}", IMAGE_RESOURCE_PREFIX, next);
                if !xobjects.has(candidate.as_bytes()) {
                    break candidate;
                }
            };
            xobjects.set(name.clone(), id);
            names.push(Some((name, brand.aspect_ratio())));
        }

        if !fonts.is_empty() {
            resources.set("Font", Object::Dictionary(fonts));
        }
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        // Each op is encoded on its own so image ops can pick their own name.
        let mut operations = lead;
        for (op, name) in page.ops.iter().zip(names) {
            operations.extend(content::draw_operations(
                std::slice::from_ref(op),
                &page.frame,
                FONT_RESOURCE,
                |_| name.clone(),
            ));
        }

        Content { operations }
            .encode()
            .map_err(CatalogError::from)
    }

    fn append_source(&mut self, page: PdfPage, page_id: ObjectId) -> CatalogResult<()> {
        // Pin inherited attributes before the page is re-parented.
        let mut pinned: Vec<(&[u8], Object)> = INHERITABLE_KEYS
            .iter()
            .filter_map(|key| content::inherited(&self.doc, page_id, key).map(|v| (*key, v.clone())))
            .collect();
        let mut resources = content::owned_resources(&self.doc, page_id);
        pinned.retain(|(key, _)| *key != b"Resources");

        if !page.ops.is_empty() {
            // Balance whatever graphics state the original content leaves behind.
            let bytes = self.encode_ops(&page, &mut resources, vec![Operation::new("Q", vec![])])?;
            let open_id = self.doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
            let draw_id = self.doc.add_object(Stream::new(dictionary! {}, bytes));

            let mut contents = content::content_streams(&self.doc, page_id);
            contents.insert(0, Object::Reference(open_id));
            contents.push(Object::Reference(draw_id));

            let page_dict = self.doc.get_object_mut(page_id)?.as_dict_mut()?;
            page_dict.set("Contents", Object::Array(contents));
        }

        let page_dict = self.doc.get_object_mut(page_id)?.as_dict_mut()?;
        for (key, value) in pinned {
            page_dict.set(key.to_vec(), value);
        }
        page_dict.set("Resources", Object::Dictionary(resources));

        self.output.push(page_id);
        Ok(())
    }

    fn append_blank(&mut self, page: PdfPage) -> CatalogResult<()> {
        let mut resources = Dictionary::new();
        let bytes = self.encode_ops(&page, &mut resources, Vec::new())?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, bytes));
        let crop = page.frame.crop;
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![crop.x0.into(), crop.y0.into(), crop.x1.into(), crop.y1.into()],
            "Resources" => resources,
            "Contents" => content_id,
        });
        self.output.push(page_id);
        Ok(())
    }

    fn pages_root(&self) -> CatalogResult<(ObjectId, ObjectId)> {
        let catalog_id = self.doc.trailer.get(b"Root")?.as_reference()?;
        let pages_id = self
            .doc
            .get_object(catalog_id)?
            .as_dict()?
            .get(b"Pages")?
            .as_reference()?;
        Ok((catalog_id, pages_id))
    }
}

impl CatalogBackend for PdfBackend {
    type Page = PdfPage;

    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn load_page(&self, index: usize) -> CatalogResult<PdfPage> {
        let page_id = *self.page_ids.get(index).ok_or_else(|| CatalogError::InvalidInput {
            parameter: "page".to_string(),
            reason: format!("Page index {} out of range", index),
        })?;
        let page = self.source.load_page(index as i32)?;
        let b = page.bounds()?;
        let frame = content::page_frame(&self.doc, page_id);
        let pictures = content::page_pictures(&self.doc, page_id, &frame);

        Ok(PdfPage {
            source: PageSource::Source {
                index,
                page_id,
                page,
            },
            bounds: Rect::new(b.x0, b.y0, b.x1, b.y1),
            frame,
            pictures,
            layout: OnceCell::new(),
            raster: OnceCell::new(),
            ops: Vec::new(),
            images: Vec::new(),
        })
    }

    fn new_page(&mut self) -> CatalogResult<PdfPage> {
        let (width, height) = DEFAULT_PAGE_SIZE;
        Ok(PdfPage::blank(width, height))
    }

    fn append_page(&mut self, page: PdfPage) -> CatalogResult<()> {
        match page.source {
            PageSource::Source { page_id, .. } => self.append_source(page, page_id),
            PageSource::Blank => self.append_blank(page),
        }
    }

    fn output_len(&self) -> usize {
        self.output.len()
    }

    fn save(mut self, path: &Path, mode: SaveMode) -> CatalogResult<()> {
        let save_failed = |reason: String| CatalogError::DocumentSaveFailed {
            path: path.to_path_buf(),
            reason,
        };

        let (catalog_id, pages_id) = self.pages_root().map_err(|e| save_failed(e.to_string()))?;

        for page_id in &self.output {
            if let Ok(dict) = self.doc.get_object_mut(*page_id).and_then(Object::as_dict_mut) {
                dict.set("Parent", pages_id);
            }
        }

        let kids: Vec<Object> = self.output.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        {
            let pages = self
                .doc
                .get_object_mut(pages_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| save_failed(e.to_string()))?;
            pages.set("Kids", Object::Array(kids));
            pages.set("Count", count);
        }

        if let Ok(catalog) = self.doc.get_object_mut(catalog_id).and_then(Object::as_dict_mut) {
            for key in STALE_CATALOG_KEYS {
                catalog.remove(key);
            }
        }

        if mode == SaveMode::Compact {
            let pruned = self.doc.prune_objects();
            debug!(pruned = pruned.len(), "Pruned unreachable objects");
            self.doc.delete_zero_length_streams();
            self.doc.renumber_objects();
            self.doc.compress();
        }

        self.doc
            .save(path)
            .map_err(|e| save_failed(e.to_string()))?;
        debug!(path = %path.display(), pages = count, "Saved output document");
        Ok(())
    }
}
