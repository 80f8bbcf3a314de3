//! Error types for the catalog repricing library.
//!
//! Per-occurrence failures (an unparseable price, a failed color sample, a
//! logo that could not be drawn) are absorbed by the pipeline and only
//! logged; the remaining variants end a catalog job.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Error type for all catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The source document (or another required input) does not exist
    #[error("Input file not found: '{}'", .path.display())]
    InputNotFound { path: PathBuf },

    /// The source document exists but could not be opened
    #[error("Failed to open document '{}': {reason}", .path.display())]
    DocumentOpenFailed { path: PathBuf, reason: String },

    /// The destination document could not be written
    #[error("Failed to save document '{}': {reason}", .path.display())]
    DocumentSaveFailed { path: PathBuf, reason: String },

    /// Matched text did not parse into a positive amount
    #[error("Unparseable price: '{text}'")]
    PriceUnparsable { text: String },

    /// Background or foreground color could not be sampled
    #[error("Color sampling failed: {reason}")]
    ColorSampleFailed { reason: String },

    /// A brand image could not be decoded or drawn
    #[error("Image insertion failed: {reason}")]
    ImageInsertFailed { reason: String },

    /// Unexpected failure while assembling the catalog
    #[error("Catalog processing failed during {stage}: {message}")]
    PipelineFatal { stage: String, message: String },

    /// Error occurred while reading or writing files
    #[error("IO error for path '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Text extraction failed
    #[error("Text extraction failed for '{}': {reason}", .path.display())]
    TextExtraction { path: PathBuf, reason: String },

    /// Invalid configuration or parameters
    #[error("Invalid input for '{parameter}': {reason}")]
    InvalidInput { parameter: String, reason: String },

    /// Backend-specific error (MuPDF, lopdf, etc.)
    #[error("{backend} backend error: {message}")]
    Backend { backend: String, message: String },
}

impl CatalogError {
    /// True for failures the pipeline absorbs without aborting the job.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PriceUnparsable { .. }
                | Self::ColorSampleFailed { .. }
                | Self::ImageInsertFailed { .. }
        )
    }

    /// Wraps any error as a fatal pipeline failure for `stage`.
    ///
    /// Errors that already carry job-level meaning are kept as they are.
    pub fn fatal(stage: impl Into<String>, err: CatalogError) -> Self {
        match err {
            Self::InputNotFound { .. }
            | Self::DocumentOpenFailed { .. }
            | Self::DocumentSaveFailed { .. }
            | Self::PipelineFatal { .. } => err,
            other => Self::PipelineFatal {
                stage: stage.into(),
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn backend(backend: &str, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.to_string(),
            message: message.into(),
        }
    }
}

// Conversion implementations for common error types
impl From<io::Error> for CatalogError {
    fn from(err: io::Error) -> Self {
        Self::backend("std::io", err.to_string())
    }
}

impl From<lopdf::Error> for CatalogError {
    fn from(err: lopdf::Error) -> Self {
        Self::backend("lopdf", err.to_string())
    }
}

impl From<mupdf::Error> for CatalogError {
    fn from(err: mupdf::Error) -> Self {
        Self::backend("MuPDF", err.to_string())
    }
}

impl From<image::ImageError> for CatalogError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageInsertFailed {
            reason: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CatalogError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidInput {
            parameter: "plan".to_string(),
            reason: err.to_string(),
        }
    }
}
