//! PDF header detection for incoming revisions.

use crate::error::{Error, Result};

/// PDF format information read from the file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// How far into the data the header may start. Some producers emit a
/// short preamble (BOM, whitespace) before `%PDF-`.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Detect the PDF version of an in-memory revision.
///
/// Returns `Error::UnknownFormat` when no `%PDF-` header is found near
/// the start of the data and `Error::UnsupportedVersion` when the version
/// is not 1.x or 2.0.
pub fn detect_format(data: &[u8]) -> Result<PdfFormat> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let start = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let version_start = start + PDF_MAGIC.len();
    let version_bytes = data
        .get(version_start..version_start + VERSION_LEN)
        .ok_or(Error::UnknownFormat)?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_supported_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfFormat { version })
}

/// Quick check used before handing bytes to the parser.
pub fn is_pdf(data: &[u8]) -> bool {
    detect_format(data).is_ok()
}

fn is_supported_version(version: &str) -> bool {
    let mut parts = version.split('.');
    let (Some(major), Some(minor), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    match (major.parse::<u8>(), minor.parse::<u8>()) {
        (Ok(1), Ok(minor)) => minor <= 7,
        (Ok(2), Ok(0)) => true,
        _ => false,
    }
}
