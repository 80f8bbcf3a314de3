//! Content-stream helpers built on lopdf.
//!
//! Covers three concerns of the PDF backend: mapping between page space and
//! PDF user space, locating painted image XObjects, and turning queued
//! drawing commands into content-stream operations.

use super::fonts;
use super::Picture;
use crate::domain::{Point, Rect, Rgb};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

/// Page attributes that may be inherited from the page tree.
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

const MAX_TREE_DEPTH: usize = 32;

/// Maps page space (top-left origin, y down) to PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    /// Crop box in PDF user space
    pub crop: Rect,
}

impl PageFrame {
    pub fn new(crop: Rect) -> Self {
        Self { crop }
    }

    /// Frame for a page whose crop box starts at the origin.
    pub fn sized(width: f32, height: f32) -> Self {
        Self::new(Rect::new(0.0, 0.0, width, height))
    }

    pub fn width(&self) -> f32 {
        self.crop.width()
    }

    pub fn height(&self) -> f32 {
        self.crop.height()
    }

    pub fn to_pdf(&self, p: Point) -> Point {
        Point::new(self.crop.x0 + p.x, self.crop.y1 - p.y)
    }

    pub fn from_pdf(&self, p: Point) -> Point {
        Point::new(p.x - self.crop.x0, self.crop.y1 - p.y)
    }

    /// Page-space rectangle as `(x, y, width, height)` in PDF user space.
    pub fn rect_to_pdf(&self, rect: Rect) -> (f32, f32, f32, f32) {
        let bottom_left = self.to_pdf(Point::new(rect.x0, rect.y1));
        (bottom_left.x, bottom_left.y, rect.width(), rect.height())
    }
}

/// A queued drawing command in page space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Fill {
        rect: Rect,
        color: Rgb,
    },
    Text {
        origin: Point,
        text: String,
        font_size: f32,
        color: Rgb,
    },
    Image {
        rect: Rect,
        /// Index into the page's image list
        image: usize,
    },
}

/// Follows a reference to the object it names.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Content stream references of a page, in drawing order.
///
/// `Contents` may be a single stream, an array, or a reference to an array.
pub fn content_streams(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let contents = match doc
        .get_object(page_id)
        .and_then(|page| page.as_dict())
        .and_then(|dict| dict.get(b"Contents"))
    {
        Ok(contents) => contents,
        Err(_) => return Vec::new(),
    };
    match contents {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Object::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

/// Looks up `key` on the page, walking up the page tree when absent.
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Reads a rectangle array (`[llx lly urx ury]`), normalising its corners.
pub fn rect_from_object(doc: &Document, obj: &Object) -> Option<Rect> {
    let array = resolve(doc, obj)?.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let mut values = [0.0f32; 4];
    for (slot, item) in values.iter_mut().zip(array) {
        *slot = number(resolve(doc, item)?)?;
    }
    Some(Rect::new(
        values[0].min(values[2]),
        values[1].min(values[3]),
        values[0].max(values[2]),
        values[1].max(values[3]),
    ))
}

/// Visible box of a page in PDF user space (crop box, else media box).
pub fn page_frame(doc: &Document, page_id: ObjectId) -> PageFrame {
    let media = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| rect_from_object(doc, obj))
        .unwrap_or_else(|| {
            let (w, h) = super::DEFAULT_PAGE_SIZE;
            Rect::new(0.0, 0.0, w, h)
        });
    let crop = inherited(doc, page_id, b"CropBox")
        .and_then(|obj| rect_from_object(doc, obj))
        .map(|crop| crop.intersect(&media))
        .filter(|crop| !crop.is_empty())
        .unwrap_or(media);
    PageFrame::new(crop)
}

/// Effective resources of a page as an owned dictionary.
///
/// Sub-dictionaries that are indirect references are resolved and copied
/// inline so the result can be extended without touching shared objects.
pub fn owned_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dict(doc, obj))
        .cloned()
        .unwrap_or_default();

    for key in [b"Font".as_slice(), b"XObject".as_slice()] {
        let inline = resources
            .get(key)
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
            .cloned();
        if let Some(dict) = inline {
            resources.set(key.to_vec(), Object::Dictionary(dict));
        }
    }
    resources
}

/// Image XObjects referenced by the resources, keyed by resource name.
fn image_xobjects(doc: &Document, resources: &Dictionary) -> Vec<Vec<u8>> {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter(|(_, obj)| {
            resolve_dict(doc, obj)
                .and_then(|dict| dict.get(b"Subtype").ok())
                .and_then(|subtype| subtype.as_name().ok())
                .map_or(false, |name| name == b"Image")
        })
        .map(|(name, _)| name.clone())
        .collect()
}

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn concat(m: &Matrix, ctm: &Matrix) -> Matrix {
    [
        m[0] * ctm[0] + m[1] * ctm[2],
        m[0] * ctm[1] + m[1] * ctm[3],
        m[2] * ctm[0] + m[3] * ctm[2],
        m[2] * ctm[1] + m[3] * ctm[3],
        m[4] * ctm[0] + m[5] * ctm[2] + ctm[4],
        m[4] * ctm[1] + m[5] * ctm[3] + ctm[5],
    ]
}

fn transform(m: &Matrix, x: f32, y: f32) -> Point {
    Point::new(x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

/// Finds every image XObject painted by the page's content streams.
///
/// Tracks the current transformation matrix through `q`/`Q`/`cm` and maps
/// the unit square of each `Do` into page space. Images drawn from inside
/// form XObjects are not followed.
pub fn page_pictures(doc: &Document, page_id: ObjectId, frame: &PageFrame) -> Vec<Picture> {
    let resources = owned_resources(doc, page_id);
    let names = image_xobjects(doc, &resources);
    if names.is_empty() {
        return Vec::new();
    }

    let content = match doc
        .get_page_content(page_id)
        .ok()
        .and_then(|bytes| Content::decode(&bytes).ok())
    {
        Some(content) => content,
        None => return Vec::new(),
    };

    let mut pictures: Vec<Picture> = names
        .iter()
        .map(|name| Picture {
            name: String::from_utf8_lossy(name).into_owned(),
            rects: Vec::new(),
        })
        .collect();

    let mut stack: Vec<Matrix> = Vec::new();
    let mut ctm = IDENTITY;

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => stack.push(ctm),
            "Q" => ctm = stack.pop().unwrap_or(IDENTITY),
            "cm" if op.operands.len() == 6 => {
                let values: Vec<f32> = op.operands.iter().filter_map(number).collect();
                if let Ok(m) = <Matrix>::try_from(values.as_slice()) {
                    ctm = concat(&m, &ctm);
                }
            }
            "Do" => {
                let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) else {
                    continue;
                };
                let Some(idx) = names.iter().position(|n| n.as_slice() == name) else {
                    continue;
                };
                let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
                    .map(|(x, y)| frame.from_pdf(transform(&ctm, x, y)));
                if let Some(rect) = Rect::bounding(corners) {
                    pictures[idx].rects.push(rect);
                }
            }
            _ => {}
        }
    }

    pictures
}

fn color_operation(op: &str, color: Rgb) -> Operation {
    Operation::new(op, vec![color.r.into(), color.g.into(), color.b.into()])
}

/// Fits an image of the given aspect ratio inside `rect`, centered.
pub fn fit_aspect(rect: Rect, aspect_ratio: f32) -> Rect {
    if rect.is_empty() || aspect_ratio <= 0.0 || !aspect_ratio.is_finite() {
        return rect;
    }
    let (mut w, mut h) = (rect.width(), rect.height());
    if w / h > aspect_ratio {
        w = h * aspect_ratio;
    } else {
        h = w / aspect_ratio;
    }
    let center = rect.center();
    Rect::new(
        center.x - w / 2.0,
        center.y - h / 2.0,
        center.x + w / 2.0,
        center.y + h / 2.0,
    )
}

/// Translates queued drawing commands into content operations.
///
/// `font` is the resource name of the text font and `image_name` maps an
/// image index to its resource name and aspect ratio.
pub fn draw_operations<F>(
    ops: &[DrawOp],
    frame: &PageFrame,
    font: &str,
    mut image_name: F,
) -> Vec<Operation>
where
    F: FnMut(usize) -> Option<(String, f32)>,
{
    let mut out = Vec::new();
    for op in ops {
        match op {
            DrawOp::Fill { rect, color } => {
                let (x, y, w, h) = frame.rect_to_pdf(*rect);
                out.push(Operation::new("q", vec![]));
                out.push(color_operation("rg", *color));
                out.push(Operation::new(
                    "re",
                    vec![x.into(), y.into(), w.into(), h.into()],
                ));
                out.push(Operation::new("f", vec![]));
                out.push(Operation::new("Q", vec![]));
            }
            DrawOp::Text {
                origin,
                text,
                font_size,
                color,
            } => {
                let p = frame.to_pdf(*origin);
                out.push(Operation::new("q", vec![]));
                out.push(Operation::new("BT", vec![]));
                out.push(Operation::new(
                    "Tf",
                    vec![Object::Name(font.as_bytes().to_vec()), (*font_size).into()],
                ));
                out.push(color_operation("rg", *color));
                out.push(Operation::new("Td", vec![p.x.into(), p.y.into()]));
                out.push(Operation::new(
                    "Tj",
                    vec![Object::String(
                        fonts::encode_win_ansi(text),
                        StringFormat::Literal,
                    )],
                ));
                out.push(Operation::new("ET", vec![]));
                out.push(Operation::new("Q", vec![]));
            }
            DrawOp::Image { rect, image } => {
                let Some((name, aspect)) = image_name(*image) else {
                    continue;
                };
                let fitted = fit_aspect(*rect, aspect);
                let (x, y, w, h) = frame.rect_to_pdf(fitted);
                out.push(Operation::new("q", vec![]));
                out.push(Operation::new(
                    "cm",
                    vec![
                        w.into(),
                        0.into(),
                        0.into(),
                        h.into(),
                        x.into(),
                        y.into(),
                    ],
                ));
                out.push(Operation::new(
                    "Do",
                    vec![Object::Name(name.into_bytes())],
                ));
                out.push(Operation::new("Q", vec![]));
            }
        }
    }
    out
}
