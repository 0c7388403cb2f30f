//! Error types for the object-eraser crate.

/// Reasons the inpainting path can decline to produce a frame.
///
/// Both variants are expected, non-fatal conditions: the caller routes to the
/// patch-fallback synthesizer instead of surfacing them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InpaintFailure {
    /// The removal mask has no foreground pixels, so there is nothing to fill.
    #[error("removal mask has no foreground pixels")]
    MaskEmpty,

    /// The inpainting algorithm itself failed (dimension mismatch, numeric
    /// breakdown, ...).
    #[error("inpaint execution failed: {0}")]
    Execution(String),
}

/// Errors that can occur during engine construction and file processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The object detector could not be initialized. Fatal: without a
    /// detector the pipeline cannot process frames at all.
    #[error("object detector unavailable: {0}")]
    DetectorUnavailable(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// A detection sidecar file could not be parsed.
    #[error("invalid detections: {0}")]
    InvalidDetections(String),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
