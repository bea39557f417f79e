//! Error types for the diffpdf library.

use std::io;
use thiserror::Error;

/// Result type alias for diffpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while comparing documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// One of the two revisions was not supplied.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// The layout mode selector is not one of the recognized values.
    #[error("Invalid layout mode '{0}' (expected 'side-by-side' or 'single')")]
    InvalidLayoutMode(String),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// Text or image extraction failed for a single page.
    #[error("Extraction error on page {page}: {reason}")]
    PageExtract {
        /// Zero-based page index
        page: usize,
        /// Underlying cause
        reason: String,
    },

    /// The canvas could not place a page, draw, or serialize output.
    #[error("Rendering error: {0}")]
    Render(String),

    /// The comparison was cancelled by the caller.
    #[error("Comparison cancelled")]
    Cancelled,

    /// The comparison exceeded its time budget.
    #[error("Comparison timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error was caused by the caller's input (a client error)
    /// rather than by an internal failure.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::MissingInput(_)
                | Error::UnknownFormat
                | Error::UnsupportedVersion(_)
                | Error::PdfParse(_)
                | Error::Encrypted
                | Error::InvalidLayoutMode(_)
        )
    }

    /// Message suitable for showing to the person who submitted the request.
    ///
    /// Input errors are descriptive; internal failures are reported
    /// generically so that no internal state leaks.
    pub fn public_message(&self) -> String {
        if self.is_input_error() {
            self.to_string()
        } else {
            match self {
                Error::Cancelled | Error::Timeout(_) => self.to_string(),
                _ => "Internal error while producing the comparison".to_string(),
            }
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}
