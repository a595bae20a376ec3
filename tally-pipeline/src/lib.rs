//! tally-pipeline: document adapters and the orchestrator that turns
//! statement files into transactions.

pub mod extract;
pub mod ocr;
pub mod pipeline;
pub mod pool;
pub mod settings;

pub use extract::{Extracted, PdfTextExtractor, TextExtractor};
pub use ocr::{OcrEngine, Recognized, TesseractEngine, parse_tsv};
pub use pipeline::{CSV_PARSER_KEY, DocumentKind, Pipeline, PipelineConfig, Stage};
pub use pool::OcrPool;
pub use settings::OcrSettings;
