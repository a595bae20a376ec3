use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    /// The text-extraction engine could not open the document at all.
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("OCR worker pool is shut down")]
    PoolClosed,

    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),

    /// Every tier ran and nothing parsed. Carries the start of the text that
    /// was parsed so the caller can show what went wrong.
    #[error("No transactions found (used OCR: {used_ocr})")]
    NoTransactions { excerpt: String, used_ocr: bool },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TallyError {
    /// Adapter failures are fatal; an empty result is a reported outcome.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TallyError::NoTransactions { .. })
    }

    pub fn excerpt(&self) -> Option<&str> {
        match self {
            TallyError::NoTransactions { excerpt, .. } => Some(excerpt),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_transactions_is_not_fatal() {
        let e = TallyError::NoTransactions {
            excerpt: "Page 1 of 1".to_string(),
            used_ocr: false,
        };
        assert!(!e.is_fatal());
        assert_eq!(e.excerpt(), Some("Page 1 of 1"));
        assert!(TallyError::Extraction("bad xref".to_string()).is_fatal());
    }
}
