//! Input validation: reject anything that is not a PDF before doing work.
//!
//! Two checks run, cheapest first:
//!
//! 1. the upload name must end in `.pdf` (case-insensitive);
//! 2. the `%PDF` signature must appear within the first 1024 bytes. Leading
//!    junk such as a byte-order mark is tolerated, as PDF readers do.
//!
//! Both failures map to [`ErrorCategory::BadInput`](crate::error::ErrorCategory)
//! so a client sees "bad request" rather than a pdfium parse error.

use crate::error::AnnotateError;
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// How far into the file the signature may start.
const HEADER_WINDOW: usize = 1024;

/// Check the upload name carries a `.pdf` extension.
pub fn validate_filename(filename: &str) -> Result<(), AnnotateError> {
    let is_pdf = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if is_pdf {
        Ok(())
    } else {
        Err(AnnotateError::InvalidInput {
            filename: filename.to_string(),
        })
    }
}

/// Check the bytes look like a PDF.
pub fn validate_pdf_bytes(bytes: &[u8]) -> Result<(), AnnotateError> {
    if bytes.is_empty() {
        return Err(AnnotateError::EmptyInput);
    }
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    if !window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        let magic = bytes[..bytes.len().min(PDF_MAGIC.len())].to_vec();
        return Err(AnnotateError::NotAPdf { magic });
    }
    Ok(())
}

/// Read a local file, validating its name and signature.
pub async fn read_pdf(path: &Path) -> Result<Vec<u8>, AnnotateError> {
    validate_filename(&path.to_string_lossy())?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AnnotateError::InputRead {
            path: path.to_path_buf(),
            source: e,
        })?;
    validate_pdf_bytes(&bytes)?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}
