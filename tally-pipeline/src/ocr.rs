//! Optical character recognition for scanned statements.
//!
//! The shipped engine shells out to poppler's `pdftoppm` to rasterize PDF
//! pages and to `tesseract ... tsv` to recognize each page. TSV output is
//! used instead of plain text because it carries a confidence per word.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tally_core::{Result, TallyError};
use tokio::process::Command;
use tracing::debug;

use crate::extract::is_pdf;
use crate::settings::OcrSettings;

/// Recognized text with the engine's mean word confidence (0-100).
#[derive(Debug, Clone, PartialEq)]
pub struct Recognized {
    pub text: String,
    pub confidence: f32,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// One-time setup, run before the first recognition job.
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }

    /// Recognize a PDF or a single page image.
    async fn recognize(&self, bytes: &[u8]) -> Result<Recognized>;
}

pub struct TesseractEngine {
    settings: OcrSettings,
}

impl TesseractEngine {
    pub fn new(settings: OcrSettings) -> Self {
        Self { settings }
    }

    async fn rasterize(&self, pdf: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
        let prefix = dir.join("page");
        let args: Vec<OsString> = vec![
            "-r".into(),
            self.settings.dpi.to_string().into(),
            "-png".into(),
            pdf.into(),
            prefix.into(),
        ];
        run(&self.settings.pdftoppm_command, &args).await?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("page") && name.ends_with(".png") {
                pages.push(entry.path());
            }
        }
        // pdftoppm zero-pads page numbers to a common width.
        pages.sort();
        Ok(pages)
    }

    async fn recognize_image(&self, image: &Path) -> Result<TsvPage> {
        let args: Vec<OsString> = vec![
            image.into(),
            "stdout".into(),
            "-l".into(),
            self.settings.language.as_str().into(),
            "tsv".into(),
        ];
        let stdout = run(&self.settings.tesseract_command, &args).await?;
        Ok(parse_tsv(&String::from_utf8_lossy(&stdout)))
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn warm_up(&self) -> Result<()> {
        let path = which::which(&self.settings.tesseract_command).map_err(|e| {
            TallyError::Ocr(format!("{} not found: {e}", self.settings.tesseract_command))
        })?;
        debug!(tesseract = %path.display(), "ocr engine ready");
        Ok(())
    }

    async fn recognize(&self, bytes: &[u8]) -> Result<Recognized> {
        let dir = tempfile::tempdir()?;
        let images = if is_pdf(bytes) {
            let input = dir.path().join("input.pdf");
            tokio::fs::write(&input, bytes).await?;
            self.rasterize(&input, dir.path()).await?
        } else {
            let input = dir.path().join("input.img");
            tokio::fs::write(&input, bytes).await?;
            vec![input]
        };
        if images.is_empty() {
            return Err(TallyError::Ocr("no pages rasterized".to_string()));
        }

        let mut texts = Vec::with_capacity(images.len());
        let mut confidences = Vec::new();
        for image in &images {
            let page = self.recognize_image(image).await?;
            texts.push(page.text);
            confidences.extend(page.confidences);
        }
        debug!(pages = images.len(), words = confidences.len(), "ocr finished");

        Ok(Recognized {
            text: texts.join("\n"),
            confidence: mean(&confidences),
        })
    }
}

async fn run(cmd: &str, args: &[OsString]) -> Result<Vec<u8>> {
    let output = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| TallyError::Ocr(format!("spawning {cmd}: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TallyError::Ocr(format!(
            "{cmd} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(output.stdout)
}

/// One page of tesseract TSV output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TsvPage {
    pub text: String,
    /// Confidence of every recognized word; tesseract's `-1` rows excluded.
    pub confidences: Vec<f32>,
}

/// Rebuild page text from word rows (level 5), one output line per
/// `(page, block, paragraph, line)` group.
pub fn parse_tsv(tsv: &str) -> TsvPage {
    let mut lines: Vec<String> = Vec::new();
    let mut confidences = Vec::new();
    let mut current: Option<[&str; 4]> = None;

    for row in tsv.lines() {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }
        let key = [cols[1], cols[2], cols[3], cols[4]];
        if current != Some(key) {
            lines.push(String::new());
            current = Some(key);
        }
        if let Some(line) = lines.last_mut() {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if let Ok(conf) = cols[10].trim().parse::<f32>() {
            if conf >= 0.0 {
                confidences.push(conf);
            }
        }
    }

    TsvPage {
        text: lines.join("\n"),
        confidences,
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
1\t1\t0\t0\t0\t0\t0\t0\t2480\t3508\t-1\t\n\
4\t1\t1\t1\t1\t0\t100\t100\t900\t40\t-1\t\n\
5\t1\t1\t1\t1\t1\t100\t100\t200\t40\t96.5\t01/12/2024\n\
5\t1\t1\t1\t1\t2\t320\t100\t150\t40\t91.0\tTESCO\n\
5\t1\t1\t1\t1\t3\t480\t100\t150\t40\t88.5\t45.57\n\
5\t1\t1\t1\t2\t1\t100\t150\t200\t40\t80.0\tBalance\n\
5\t1\t1\t1\t2\t2\t320\t150\t200\t40\t-1\t \n";

    #[test]
    fn test_parse_tsv_rebuilds_lines() {
        let page = parse_tsv(TSV);
        assert_eq!(page.text, "01/12/2024 TESCO 45.57\nBalance");
        assert_eq!(page.confidences, vec![96.5, 91.0, 88.5, 80.0]);
        assert_eq!(mean(&page.confidences), 89.0);
    }

    #[test]
    fn test_empty_tsv() {
        let page = parse_tsv("level\tpage_num\n");
        assert!(page.text.is_empty());
        assert_eq!(mean(&page.confidences), 0.0);
    }

    #[tokio::test]
    async fn test_warm_up_fails_without_binary() {
        let engine = TesseractEngine::new(OcrSettings {
            tesseract_command: "tally-no-such-tesseract".to_string(),
            ..OcrSettings::default()
        });
        let err = engine.warm_up().await.unwrap_err();
        assert!(matches!(err, TallyError::Ocr(_)));
    }
}
