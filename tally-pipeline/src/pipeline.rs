//! Document orchestration: extraction, scanned detection, the OCR fallback,
//! classification, parsing and validation.

use std::path::Path;
use std::sync::Arc;

use tally_core::{ParsedStatement, Result, StatementResult, TallyError, excerpt};
use tally_ingest::{ParseOptions, ParserId, assess, classify, parse_rows, read_rows, repair_ocr_text};
use tracing::{debug, info, warn};

use crate::extract::{PdfTextExtractor, TextExtractor, is_pdf};
use crate::ocr::TesseractEngine;
use crate::pool::OcrPool;
use crate::settings::OcrSettings;

/// Parser key reported for CSV exports.
pub const CSV_PARSER_KEY: &str = "csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Csv,
    Image,
}

impl DocumentKind {
    /// Magic bytes first, then the file extension, then a look at the text.
    pub fn sniff(bytes: &[u8], file_name: Option<&str>) -> Result<Self> {
        if is_pdf(bytes) {
            return Ok(Self::Pdf);
        }
        if is_image(bytes) {
            return Ok(Self::Image);
        }

        let ext = file_name
            .and_then(|n| Path::new(n).extension())
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => return Ok(Self::Pdf),
            Some("csv") => return Ok(Self::Csv),
            Some("png" | "jpg" | "jpeg" | "tif" | "tiff") => return Ok(Self::Image),
            _ => {}
        }

        if looks_like_csv(bytes) {
            return Ok(Self::Csv);
        }
        Err(TallyError::UnsupportedDocument(
            file_name.unwrap_or("input").to_string(),
        ))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Image => "image",
        }
    }
}

fn is_image(bytes: &[u8]) -> bool {
    bytes.starts_with(b"\x89PNG\r\n\x1a\n")
        || bytes.starts_with(b"\xff\xd8\xff")
        || bytes.starts_with(b"II*\0")
        || bytes.starts_with(b"MM\0*")
}

fn looks_like_csv(bytes: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return false;
    };
    text.lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.contains(','))
}

/// Orchestrator states. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    TextExtracted,
    NeedsOcr,
    Recognized,
    Repaired,
    Classified,
    Parsed,
    Validated,
    Done,
    EmptyResult,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::TextExtracted => "text_extracted",
            Stage::NeedsOcr => "needs_ocr",
            Stage::Recognized => "recognized",
            Stage::Repaired => "repaired",
            Stage::Classified => "classified",
            Stage::Parsed => "parsed",
            Stage::Validated => "validated",
            Stage::Done => "done",
            Stage::EmptyResult => "empty_result",
        }
    }
}

fn enter(stage: Stage) {
    debug!(stage = stage.as_str(), "pipeline stage");
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub ocr_enabled: bool,
    pub parse: ParseOptions,
    /// Skip classification and always use this parser.
    pub forced_parser: Option<ParserId>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_enabled: true,
            parse: ParseOptions::default(),
            forced_parser: None,
        }
    }
}

pub struct Pipeline {
    extractor: Arc<dyn TextExtractor>,
    ocr: Option<Arc<OcrPool>>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        ocr: Option<Arc<OcrPool>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extractor,
            ocr,
            config,
        }
    }

    /// The shipped adapters: `pdf-extract` for text layers and tesseract
    /// behind a worker pool when OCR is enabled.
    pub fn from_settings(ocr: &OcrSettings, parse: ParseOptions) -> Self {
        let pool = ocr.enabled.then(|| {
            let engine = Arc::new(TesseractEngine::new(ocr.clone()));
            Arc::new(OcrPool::new(engine, ocr.workers))
        });
        Self::new(
            Arc::new(PdfTextExtractor),
            pool,
            PipelineConfig {
                ocr_enabled: ocr.enabled,
                parse,
                forced_parser: None,
            },
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    /// Turn one document into transactions.
    pub async fn process(&self, bytes: &[u8], file_name: Option<&str>) -> Result<StatementResult> {
        enter(Stage::Start);
        let kind = DocumentKind::sniff(bytes, file_name)?;
        debug!(kind = kind.as_str(), bytes = bytes.len(), "document sniffed");
        match kind {
            DocumentKind::Pdf => self.process_pdf(bytes).await,
            DocumentKind::Csv => self.process_csv(bytes),
            DocumentKind::Image => self.recognize_and_parse(bytes, "", None).await,
        }
    }

    async fn process_pdf(&self, bytes: &[u8]) -> Result<StatementResult> {
        let extractor = self.extractor.clone();
        let shared: Arc<[u8]> = Arc::from(bytes);
        let extracted = {
            let shared = shared.clone();
            tokio::task::spawn_blocking(move || extractor.extract(&shared))
                .await
                .map_err(|e| TallyError::Extraction(format!("extraction task failed: {e}")))??
        };
        enter(Stage::TextExtracted);

        let page_count = Some(extracted.page_count);
        let verdict = assess(&extracted.text, extracted.page_count);
        if let Some(reason) = verdict.reason {
            warn!(
                ?reason,
                chars = verdict.text_length,
                pages = extracted.page_count,
                "document looks scanned, falling back to OCR"
            );
            return self.recognize_and_parse(&shared, &extracted.text, page_count).await;
        }

        let (parser, parsed) = self.classify_and_parse(&extracted.text);
        if !parsed.is_empty() {
            return self.validate(parser.key(), parsed, &extracted.text, false, None, page_count);
        }
        warn!(parser = parser.key(), "text layer parsed to nothing, falling back to OCR");

        // The text layer was readable, so a broken OCR setup is not fatal here.
        match self.recognize_and_parse(&shared, &extracted.text, page_count).await {
            Err(TallyError::Ocr(reason)) => {
                warn!(%reason, "ocr fallback failed, reporting text-layer result");
                enter(Stage::EmptyResult);
                Err(TallyError::NoTransactions {
                    excerpt: excerpt(&extracted.text),
                    used_ocr: false,
                })
            }
            other => other,
        }
    }

    /// The OCR branch. `fallback_text` is what the excerpt shows when OCR is
    /// turned off.
    async fn recognize_and_parse(
        &self,
        bytes: &[u8],
        fallback_text: &str,
        page_count: Option<usize>,
    ) -> Result<StatementResult> {
        enter(Stage::NeedsOcr);
        let pool = match &self.ocr {
            Some(pool) if self.config.ocr_enabled => pool,
            _ => {
                info!("ocr disabled, reporting empty result");
                enter(Stage::EmptyResult);
                return Err(TallyError::NoTransactions {
                    excerpt: excerpt(fallback_text),
                    used_ocr: false,
                });
            }
        };

        let recognized = pool.recognize(bytes).await?;
        enter(Stage::Recognized);
        debug!(
            confidence = recognized.confidence,
            chars = recognized.text.len(),
            "ocr text received"
        );

        let repaired = repair_ocr_text(&recognized.text);
        enter(Stage::Repaired);

        let (parser, parsed) = self.classify_and_parse(&repaired);
        self.validate(
            parser.key(),
            parsed,
            &repaired,
            true,
            Some(recognized.confidence),
            page_count,
        )
    }

    fn process_csv(&self, bytes: &[u8]) -> Result<StatementResult> {
        let rows = read_rows(bytes)?;
        enter(Stage::Classified);
        let transactions = parse_rows(&rows);
        enter(Stage::Parsed);
        debug!(rows = rows.len(), transactions = transactions.len(), "csv rows parsed");
        self.validate(
            CSV_PARSER_KEY,
            ParsedStatement::new(transactions),
            &String::from_utf8_lossy(bytes),
            false,
            None,
            None,
        )
    }

    fn classify_and_parse(&self, text: &str) -> (ParserId, ParsedStatement) {
        let parser = self.config.forced_parser.unwrap_or_else(|| classify(text));
        enter(Stage::Classified);
        debug!(parser = parser.key(), forced = self.config.forced_parser.is_some(), "parser chosen");
        let parsed = parser.parse(text, &self.config.parse);
        enter(Stage::Parsed);
        (parser, parsed)
    }

    fn validate(
        &self,
        parser: &str,
        parsed: ParsedStatement,
        raw_text: &str,
        used_ocr: bool,
        confidence: Option<f32>,
        page_count: Option<usize>,
    ) -> Result<StatementResult> {
        enter(Stage::Validated);
        let ParsedStatement {
            transactions,
            metadata,
        } = parsed;
        let before = transactions.len();
        let transactions: Vec<_> = transactions.into_iter().filter(|t| t.is_valid()).collect();
        if transactions.len() < before {
            debug!(rejected = before - transactions.len(), "invalid records removed");
        }

        if transactions.is_empty() {
            enter(Stage::EmptyResult);
            info!(parser, used_ocr, "no transactions found");
            return Err(TallyError::NoTransactions {
                excerpt: excerpt(raw_text),
                used_ocr,
            });
        }

        enter(Stage::Done);
        info!(
            parser,
            transactions = transactions.len(),
            used_ocr,
            "statement parsed"
        );
        Ok(StatementResult {
            transactions,
            metadata,
            used_ocr,
            confidence,
            parser: parser.to_string(),
            page_count,
        })
    }

    /// Drain and close the OCR pool, if there is one.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.ocr {
            pool.shutdown().await;
        }
    }
}
