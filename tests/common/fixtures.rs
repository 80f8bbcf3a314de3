//! Test fixtures and PDF builders.
//!
//! Catalog pages are written with lopdf so that text and pictures land at
//! exact positions. Positions are given in page space (origin top-left,
//! `y` growing downward), matching the library.

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use repricer::backend::fonts::encode_win_ansi;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;

/// A line of text with its baseline origin.
#[derive(Debug, Clone)]
pub struct TextSpec {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: String,
}

/// A solid-color picture painted at a rectangle.
#[derive(Debug, Clone)]
pub struct PictureSpec {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub rgb: [u8; 3],
}

#[derive(Debug, Clone, Default)]
pub struct PageSpec {
    background: Option<[f32; 3]>,
    texts: Vec<TextSpec>,
    pictures: Vec<PictureSpec>,
}

impl PageSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the whole page with a color before anything else.
    pub fn with_background(mut self, rgb: [f32; 3]) -> Self {
        self.background = Some(rgb);
        self
    }

    /// Adds Helvetica text with its baseline starting at `(x, y)`.
    pub fn with_text(mut self, x: f32, y: f32, size: f32, text: &str) -> Self {
        self.texts.push(TextSpec {
            x,
            y,
            size,
            text: text.to_string(),
        });
        self
    }

    /// Adds a red 100x100 px picture painted into the given rectangle.
    pub fn with_picture(mut self, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        self.pictures.push(PictureSpec {
            x0,
            y0,
            x1,
            y1,
            rgb: [255, 0, 0],
        });
        self
    }
}

/// Builder for multi-page catalog PDFs.
///
/// # Example
///
/// ```no_run
/// # use anyhow::Result;
/// # fn main() -> Result<()> {
/// CatalogPdfBuilder::new()
///     .with_page(PageSpec::new().with_text(50.0, 50.0, 12.0, "Item: R$ 10,00"))
///     .build(std::path::Path::new("/tmp/catalog.pdf"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CatalogPdfBuilder {
    pages: Vec<PageSpec>,
}

impl CatalogPdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: PageSpec) -> Self {
        self.pages.push(page);
        self
    }

    /// Writes the document and returns its path.
    pub fn build(self, output_path: &Path) -> Result<PathBuf> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids = Vec::new();
        for spec in &self.pages {
            let mut xobjects = lopdf::Dictionary::new();
            let mut ops = Vec::new();

            if let Some([r, g, b]) = spec.background {
                ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
                ops.push(Operation::new(
                    "re",
                    vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
                ));
                ops.push(Operation::new("f", vec![]));
            }

            for (i, picture) in spec.pictures.iter().enumerate() {
                let name = format!("Im{}", i + 1);
                let pixels: Vec<u8> = picture.rgb.repeat(100 * 100);
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 100,
                        "Height" => 100,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                    },
                    pixels,
                ));
                xobjects.set(name.as_bytes(), image_id);

                let width = picture.x1 - picture.x0;
                let height = picture.y1 - picture.y0;
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        picture.x0.into(),
                        (PAGE_HEIGHT - picture.y1).into(),
                    ],
                ));
                ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                ops.push(Operation::new("Q", vec![]));
            }

            for text in &spec.texts {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("rg", vec![0.into(), 0.into(), 0.into()]));
                ops.push(Operation::new("Tf", vec!["F1".into(), text.size.into()]));
                ops.push(Operation::new(
                    "Td",
                    vec![text.x.into(), (PAGE_HEIGHT - text.y).into()],
                ));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(encode_win_ansi(&text.text))],
                ));
                ops.push(Operation::new("ET", vec![]));
            }

            let content = Content { operations: ops };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => xobjects,
                },
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();
        doc.save(output_path)?;

        Ok(output_path.to_path_buf())
    }
}

/// Single page with two labelled prices and one product picture.
pub fn create_sample_catalog(path: &Path) -> Result<PathBuf> {
    CatalogPdfBuilder::new()
        .with_page(
            PageSpec::new()
                .with_text(50.0, 50.0, 12.0, "Produto Exemplo: R$ 10,00")
                .with_text(50.0, 80.0, 12.0, "Outro Preço: R$ 1.234,56")
                .with_picture(100.0, 200.0, 300.0, 400.0),
        )
        .build(path)
}

/// `count` pages, each printing its own index and one price.
pub fn create_numbered_catalog(path: &Path, count: usize) -> Result<PathBuf> {
    let mut builder = CatalogPdfBuilder::new();
    for i in 0..count {
        builder = builder.with_page(
            PageSpec::new()
                .with_text(50.0, 50.0, 14.0, &format!("Pagina {}", i))
                .with_text(50.0, 100.0, 12.0, &format!("Item {}: R$ {},00", i, 10 + i)),
        );
    }
    builder.build(path)
}

/// Writes a solid-color PNG logo.
pub fn create_logo(path: &Path, width: u32, height: u32) -> Result<PathBuf> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 90, 200, 255]));
    img.save(path)?;
    Ok(path.to_path_buf())
}

/// Plain text document generated by printpdf, for tests that only need
/// text without exact positions.
pub fn create_text_document(path: &Path, lines: &[&str]) -> Result<PathBuf> {
    let (doc, page1, layer1) = PdfDocument::new("Catalog", Mm(210.0), Mm(297.0), "Layer 1");
    let current_layer = doc.get_page(page1).get_layer(layer1);
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    current_layer.use_text(lines.join(" "), 12.0, Mm(20.0), Mm(270.0), &font);
    doc.save(&mut BufWriter::new(fs::File::create(path)?))?;
    Ok(path.to_path_buf())
}
