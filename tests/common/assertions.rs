//! Custom assertions for catalog testing.
//!
//! Provides domain-specific assertions that make tests more readable
//! and provide better error messages.

use anyhow::Result;
use lopdf::{Document, Object};
use repricer::CatalogService;
use std::path::Path;

/// Extracts text from a PDF, returning an error instead of panicking.
pub fn extract_text(pdf_path: &Path) -> Result<String> {
    CatalogService::new()
        .extract_text(pdf_path)
        .map_err(|e| anyhow::anyhow!("Failed to extract text: {}", e))
}

/// Asserts that the text of a PDF contains `needle`.
///
/// # Panics
/// Panics if the text is not found.
pub fn assert_contains_text(pdf_path: &Path, needle: &str) {
    let text = extract_text(pdf_path)
        .unwrap_or_else(|e| panic!("Failed to read '{}': {}", pdf_path.display(), e));
    assert!(
        text.contains(needle),
        "Expected '{}' in PDF at '{}'.\nExtracted text: {}",
        needle,
        pdf_path.display(),
        text
    );
}

/// Asserts that a PDF exists, is not empty and loads with lopdf.
pub fn assert_valid_pdf(pdf_path: &Path) {
    assert!(pdf_path.exists(), "PDF should exist at '{}'", pdf_path.display());
    let metadata = std::fs::metadata(pdf_path).expect("Failed to get PDF metadata");
    assert!(metadata.len() > 0, "PDF should not be empty at '{}'", pdf_path.display());
    assert!(
        Document::load(pdf_path).is_ok(),
        "PDF should load at '{}'",
        pdf_path.display()
    );
}

/// Number of pages in a PDF.
pub fn page_count(pdf_path: &Path) -> Result<usize> {
    Ok(Document::load(pdf_path)?.get_pages().len())
}

/// Number of image XObjects reachable from a page's resources.
pub fn image_count(pdf_path: &Path, page_number: u32) -> Result<usize> {
    let doc = Document::load(pdf_path)?;
    let page_id = *doc
        .get_pages()
        .get(&page_number)
        .ok_or_else(|| anyhow::anyhow!("No page {}", page_number))?;

    let page = doc.get_dictionary(page_id)?;
    let resources = match page.get(b"Resources")? {
        Object::Reference(id) => doc.get_dictionary(*id)?,
        other => other.as_dict()?,
    };
    let xobjects = match resources.get(b"XObject") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id)?,
        Ok(other) => other.as_dict()?,
        Err(_) => return Ok(0),
    };

    let mut count = 0;
    for (_, entry) in xobjects.iter() {
        let stream = match entry {
            Object::Reference(id) => doc.get_object(*id)?.as_stream()?,
            other => other.as_stream()?,
        };
        if matches!(stream.dict.get(b"Subtype").and_then(Object::as_name), Ok(b"Image")) {
            count += 1;
        }
    }
    Ok(count)
}
