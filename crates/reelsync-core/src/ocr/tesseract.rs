//! Tesseract OCR Engine
//!
//! Runs the `tesseract` CLI in TSV mode and rebuilds caption lines from the
//! word rows.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{OcrEngine, OcrError, OcrResult, Recognition, RecognizedWord};
use crate::process::{command, is_missing_binary, run, stderr_tail};
use crate::types::BoundingBox;

/// TSV row level of individual words
const WORD_LEVEL: u32 = 5;
/// Page segmentation mode: a single uniform block of text
const PAGE_SEGMENTATION_MODE: &str = "6";

/// Tesseract CLI engine
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &Path) -> OcrResult<Recognition> {
        let mut cmd = command(&self.binary);
        cmd.arg(image).args([
            "stdout",
            "-l",
            self.language.as_str(),
            "--psm",
            PAGE_SEGMENTATION_MODE,
            "tsv",
        ]);

        let output = run(cmd).await.map_err(|e| {
            if is_missing_binary(&e) {
                OcrError::NotFound(self.binary.display().to_string())
            } else {
                OcrError::Io(e)
            }
        })?;

        if !output.status.success() {
            return Err(OcrError::RecognitionFailed(format!(
                "{}: {}",
                image.display(),
                stderr_tail(&output)
            )));
        }

        parse_tesseract_tsv(&String::from_utf8_lossy(&output.stdout))
    }
}

struct WordRow {
    line_key: (u32, u32, u32),
    text: String,
    confidence: f64,
    bbox: BoundingBox,
}

fn parse_row(row: &str) -> Option<WordRow> {
    let columns: Vec<&str> = row.split('\t').collect();
    if columns.len() < 12 {
        return None;
    }
    let number = |index: usize| columns[index].trim().parse::<f64>().ok();

    if number(0)? as u32 != WORD_LEVEL {
        return None;
    }
    let confidence = number(10)?;
    let text = columns[11..].join("\t").trim().to_string();
    if confidence < 0.0 || text.is_empty() {
        return None;
    }

    let (left, top, width, height) = (number(6)?, number(7)?, number(8)?, number(9)?);
    Some(WordRow {
        line_key: (number(2)? as u32, number(3)? as u32, number(4)? as u32),
        text,
        confidence,
        bbox: BoundingBox::new(left, top, left + width, top + height),
    })
}

/// Parses `tesseract ... tsv` output into lines, confidence and word boxes.
pub fn parse_tesseract_tsv(tsv: &str) -> OcrResult<Recognition> {
    let mut rows = tsv.lines().filter(|line| !line.trim().is_empty());
    match rows.next() {
        None => return Ok(Recognition::default()),
        Some(header) if header.starts_with("level") => {}
        Some(_) => return Err(OcrError::ParseError("missing TSV header".to_string())),
    }

    let words: Vec<WordRow> = rows.filter_map(parse_row).collect();
    if words.is_empty() {
        return Ok(Recognition::default());
    }

    let mut lines: Vec<((u32, u32, u32), Vec<&str>)> = Vec::new();
    for word in &words {
        match lines.iter_mut().find(|(key, _)| *key == word.line_key) {
            Some((_, texts)) => texts.push(word.text.as_str()),
            None => lines.push((word.line_key, vec![word.text.as_str()])),
        }
    }

    let text = lines
        .iter()
        .map(|(_, texts)| texts.join(" "))
        .collect::<Vec<_>>()
        .join("\n");
    let confidence =
        words.iter().map(|w| w.confidence).sum::<f64>() / words.len() as f64 / 100.0;

    Ok(Recognition {
        text,
        confidence: confidence.clamp(0.0, 1.0),
        words: words
            .into_iter()
            .map(|w| RecognizedWord {
                confidence: (w.confidence / 100.0).clamp(0.0, 1.0),
                text: w.text,
                bbox: w.bbox,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_words_grouped_into_lines() {
        let output = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t1080\t672\t-1\t",
            "4\t1\t1\t1\t1\t0\t200\t100\t600\t60\t-1\t",
            "5\t1\t1\t1\t1\t1\t200\t100\t200\t60\t96\tHello",
            "5\t1\t1\t1\t1\t2\t420\t100\t380\t60\t90\tthere,",
            "5\t1\t1\t1\t2\t1\t300\t180\t300\t60\t84\tfriend.",
        ]);
        let recognition = parse_tesseract_tsv(&output).unwrap();

        assert_eq!(recognition.text, "Hello there,\nfriend.");
        assert!((recognition.confidence - 0.90).abs() < 1e-9);
        assert_eq!(recognition.words.len(), 3);
        assert_eq!(
            recognition.bbox(),
            Some(BoundingBox::new(200.0, 100.0, 800.0, 240.0))
        );
    }

    #[test]
    fn test_negative_confidence_and_blank_words_skipped() {
        let output = tsv(&[
            "5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t-1\tghost",
            "5\t1\t1\t1\t1\t2\t0\t0\t10\t10\t55\t   ",
            "5\t1\t1\t1\t1\t3\t20\t0\t10\t10\t80\treal",
        ]);
        let recognition = parse_tesseract_tsv(&output).unwrap();
        assert_eq!(recognition.text, "real");
        assert!((recognition.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_empty_output_is_empty_recognition() {
        assert_eq!(parse_tesseract_tsv("").unwrap(), Recognition::default());
        assert_eq!(parse_tesseract_tsv(HEADER).unwrap(), Recognition::default());
    }

    #[test]
    fn test_missing_header_is_parse_error() {
        assert!(matches!(
            parse_tesseract_tsv("garbage output"),
            Err(OcrError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_reported() {
        let engine = TesseractEngine::new("reelsync-definitely-not-installed-binary", "eng");
        let result = engine.recognize(Path::new("frame.png")).await;
        assert!(matches!(result, Err(OcrError::NotFound(_))));
    }
}
