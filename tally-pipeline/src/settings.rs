use serde::{Deserialize, Serialize};

/// OCR knobs, stored as the `[ocr]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// When false, a document that needs OCR is reported as empty instead.
    pub enabled: bool,
    /// Recognition jobs allowed to run at once.
    pub workers: usize,
    pub tesseract_command: String,
    pub pdftoppm_command: String,
    /// Tesseract language pack, e.g. `eng`.
    pub language: String,
    /// Rasterization resolution for scanned PDFs.
    pub dpi: u32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: 2,
            tesseract_command: "tesseract".to_string(),
            pdftoppm_command: "pdftoppm".to_string(),
            language: "eng".to_string(),
            dpi: 300,
        }
    }
}
