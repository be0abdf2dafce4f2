//! Contract text from uploaded documents.
//!
//! `.pdf` files go through text extraction, one line break after each page
//! that yields text. Everything else must be UTF-8.

use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Why an uploaded document produced no contract text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Error reading PDF: {0}")]
    Pdf(String),

    #[error("Uploaded file is not valid UTF-8 text")]
    InvalidEncoding,
}

/// Reason given when a PDF parses but has no text layer.
pub const NO_PDF_TEXT: &str = "No text could be extracted. The PDF might be an image scan.";

/// True when `file_name` names a PDF (extension compared case-insensitively).
pub fn is_pdf(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".pdf")
}

/// Contract text of an uploaded file, dispatched on its name.
pub fn decode_contract(file_name: Option<&str>, bytes: Vec<u8>) -> Result<String, DocumentError> {
    if file_name.is_some_and(is_pdf) {
        return extract_pdf_text(&bytes);
    }
    String::from_utf8(bytes).map_err(|_| DocumentError::InvalidEncoding)
}

/// Text of every page of a PDF, each followed by `\n`.
///
/// Pages without text are skipped. A document with no text at all is an
/// error, as is anything the PDF reader cannot load.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| DocumentError::Pdf("malformed document".to_string()))?
    .map_err(|e| DocumentError::Pdf(e.to_string()))?;

    let mut text = String::new();
    for page in pages.iter().filter(|page| !page.is_empty()) {
        text.push_str(page);
        text.push('\n');
    }

    if text.trim().is_empty() {
        return Err(DocumentError::Pdf(NO_PDF_TEXT.to_string()));
    }

    tracing::debug!(pages = pages.len(), chars = text.chars().count(), "PDF text extracted");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE_PDF: &[u8] = include_bytes!("../fixtures/lease.pdf");
    const BLANK_PDF: &[u8] = include_bytes!("../fixtures/blank.pdf");

    #[test]
    fn test_pdf_name_detection() {
        assert!(is_pdf("lease.pdf"));
        assert!(is_pdf("LEASE.PDF"));
        assert!(!is_pdf("lease.pdf.txt"));
        assert!(!is_pdf("pdf"));
    }

    #[test]
    fn test_extracts_text_from_every_page() {
        let text = extract_pdf_text(LEASE_PDF).unwrap();
        assert!(text.contains("Tenant shall pay rent monthly."));
        assert!(text.contains("This lease renews automatically."));
        assert!(text.ends_with('\n'));

        let first = text.find("Tenant").unwrap();
        let second = text.find("renews").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_pdf_without_text_is_rejected() {
        let err = extract_pdf_text(BLANK_PDF).unwrap_err();
        assert_eq!(err, DocumentError::Pdf(NO_PDF_TEXT.to_string()));
        assert!(err.to_string().starts_with("Error reading PDF: No text could be extracted"));
    }

    #[test]
    fn test_garbage_pdf_is_rejected() {
        let err = extract_pdf_text(b"%PDF-1.7 not really").unwrap_err();
        assert!(err.to_string().starts_with("Error reading PDF: "));
    }

    #[test]
    fn test_decode_dispatches_on_name() {
        let text = decode_contract(Some("Lease.PDF"), LEASE_PDF.to_vec()).unwrap();
        assert!(text.contains("Tenant shall pay rent monthly."));

        let plain = decode_contract(Some("lease.txt"), b"Term.".to_vec()).unwrap();
        assert_eq!(plain, "Term.");

        let unnamed = decode_contract(None, b"Term.".to_vec()).unwrap();
        assert_eq!(unnamed, "Term.");
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert_eq!(
            decode_contract(Some("blob.bin"), vec![0xff, 0xfe, 0x00]),
            Err(DocumentError::InvalidEncoding)
        );
    }
}
