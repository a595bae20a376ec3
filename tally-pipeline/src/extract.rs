//! Text-layer extraction from PDF bytes.

use tally_core::{Result, TallyError};

/// Text layer of a document and how many pages it has.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub text: String,
    pub page_count: usize,
}

/// Blocking text extraction. Implementations are run on the blocking pool.
pub trait TextExtractor: Send + Sync + 'static {
    fn extract(&self, bytes: &[u8]) -> Result<Extracted>;
}

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Extraction with the pure-Rust `pdf-extract` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Extracted> {
        if !is_pdf(bytes) {
            return Err(TallyError::Extraction("missing %PDF header".to_string()));
        }
        // pdf-extract panics on some malformed inputs instead of erroring.
        let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|_| TallyError::Extraction("malformed PDF".to_string()))?
            .map_err(|e| TallyError::Extraction(e.to_string()))?;
        Ok(Extracted {
            page_count: pages.len(),
            text: pages.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let err = PdfTextExtractor.extract(b"Date,Amount\n").unwrap_err();
        assert!(matches!(err, TallyError::Extraction(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_rejects_truncated_pdf() {
        let err = PdfTextExtractor.extract(b"%PDF-1.4\n%garbage").unwrap_err();
        assert!(matches!(err, TallyError::Extraction(_)));
    }
}
