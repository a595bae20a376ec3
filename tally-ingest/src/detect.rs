//! Scanned-document detection.
//!
//! Text-based statements yield roughly a thousand characters per page. When
//! the text layer is much thinner than that, or mostly punctuation and
//! symbols, the PDF is almost certainly an image with a poor (or absent) text
//! layer and needs OCR instead of heuristic parsing.

/// Empirical average characters per page of a text-based statement.
pub const EXPECTED_CHARS_PER_PAGE: usize = 1000;

/// Below this fraction of the expected text, the document is treated as scanned.
pub const MIN_TEXT_RATIO: f64 = 0.2;

/// Below this share of `[A-Za-z0-9]` characters, the text is treated as noise.
pub const MIN_ALNUM_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanReason {
    NoPages,
    NoText,
    TooLittleText,
    MostlyNoise,
}

/// Measurements behind a scanned/not-scanned decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanVerdict {
    pub text_length: usize,
    pub expected_length: usize,
    pub alnum_ratio: f64,
    pub reason: Option<ScanReason>,
}

impl ScanVerdict {
    pub fn is_scanned(&self) -> bool {
        self.reason.is_some()
    }
}

pub fn assess(text: &str, page_count: usize) -> ScanVerdict {
    let trimmed = text.trim();
    let text_length = trimmed.chars().count();
    let expected_length = page_count * EXPECTED_CHARS_PER_PAGE;
    let alnum = trimmed.chars().filter(char::is_ascii_alphanumeric).count();
    let alnum_ratio = if text_length == 0 {
        0.0
    } else {
        alnum as f64 / text_length as f64
    };

    let reason = if page_count == 0 {
        Some(ScanReason::NoPages)
    } else if text_length == 0 {
        Some(ScanReason::NoText)
    } else if (text_length as f64) < MIN_TEXT_RATIO * expected_length as f64 {
        Some(ScanReason::TooLittleText)
    } else if alnum_ratio < MIN_ALNUM_RATIO {
        Some(ScanReason::MostlyNoise)
    } else {
        None
    };

    ScanVerdict {
        text_length,
        expected_length,
        alnum_ratio,
        reason,
    }
}

/// True when the extracted text looks like it came from an image-only PDF.
pub fn is_likely_scanned(text: &str, page_count: usize) -> bool {
    assess(text, page_count).is_scanned()
}
