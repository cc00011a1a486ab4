//! Text recognition with the tesseract command-line engine.
//!
//! Each page image is written to a managed temp PNG and handed to
//! `tesseract <image> stdout tsv`. The TSV report has one row per layout
//! element (page, block, paragraph, line, word) with the columns:
//!
//! ```text
//! level page_num block_num par_num line_num word_num left top width height conf text
//! ```
//!
//! Every row becomes a [`RecognizedToken`]. Structural rows carry an empty
//! text and a confidence of `-1`; they are left for the pipeline's filter to
//! drop rather than being special-cased here.

use crate::config::TesseractConfig;
use crate::engines::{RasterImage, RecognizedToken, Recognizer};
use crate::error::AnnotateError;
use crate::geometry::PixelBox;
use std::process::Command;
use tracing::{debug, warn};

/// Number of columns before the optional `text` column.
const TSV_FIXED_COLUMNS: usize = 11;

/// OCR engine backed by the `tesseract` executable.
#[derive(Debug, Clone, Default)]
pub struct TesseractRecognizer {
    config: TesseractConfig,
}

impl TesseractRecognizer {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }

    /// Check that the executable can be launched.
    pub fn is_available(&self) -> bool {
        Command::new(&self.config.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Fail with [`AnnotateError::EngineUnavailable`] unless the executable runs.
    pub fn ensure_available(&self) -> Result<(), AnnotateError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(AnnotateError::EngineUnavailable {
                engine: "tesseract".into(),
                detail: format!(
                    "could not run '{}'; install tesseract or pass --tesseract",
                    self.config.binary.display()
                ),
            })
        }
    }

    fn command(&self, image_path: &std::path::Path, dpi: u32) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language)
            .arg("--dpi")
            .arg(dpi.to_string());
        if let Some(psm) = self.config.psm {
            cmd.arg("--psm").arg(psm.to_string());
        }
        cmd.arg("tsv");
        cmd
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &RasterImage) -> Result<Vec<RecognizedToken>, AnnotateError> {
        let page = image.page_index + 1;
        let fail = |detail: String| AnnotateError::Recognition { page, detail };

        // Dropped (and deleted) when this function returns.
        let tmp = tempfile::Builder::new()
            .prefix("ocr_page_")
            .suffix(".png")
            .tempfile()
            .map_err(|e| fail(format!("temp image: {e}")))?;
        image
            .image
            .save_with_format(tmp.path(), image::ImageFormat::Png)
            .map_err(|e| fail(format!("PNG encoding failed: {e}")))?;

        let output = self
            .command(tmp.path(), image.dpi)
            .output()
            .map_err(|e| fail(format!("failed to run '{}': {e}", self.config.binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!("tesseract on page {}: {}", page, stderr.trim());
        }

        let tokens = parse_tsv(&String::from_utf8_lossy(&output.stdout)).map_err(fail)?;
        debug!("Page {}: tesseract returned {} rows", page, tokens.len());
        Ok(tokens)
    }
}

/// Parse tesseract's TSV report into tokens, in report order.
///
/// The header row is skipped, as are blank lines. Confidences may be
/// fractional (`96.47`) and are truncated toward zero.
pub fn parse_tsv(tsv: &str) -> Result<Vec<RecognizedToken>, String> {
    let mut tokens = Vec::new();

    for (line_no, line) in tsv.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with("level") {
            continue;
        }

        let cols: Vec<&str> = line.splitn(TSV_FIXED_COLUMNS + 1, '\t').collect();
        if cols.len() < TSV_FIXED_COLUMNS {
            return Err(format!(
                "TSV line {}: expected at least {} columns, got {}",
                line_no + 1,
                TSV_FIXED_COLUMNS,
                cols.len()
            ));
        }

        let px = |i: usize, name: &str| -> Result<u32, String> {
            cols[i]
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("TSV line {}: bad {} '{}'", line_no + 1, name, cols[i]))
        };
        let conf = cols[10]
            .trim()
            .parse::<f32>()
            .map_err(|_| format!("TSV line {}: bad conf '{}'", line_no + 1, cols[10]))?;

        tokens.push(RecognizedToken {
            text: cols.get(11).copied().unwrap_or_default().to_string(),
            confidence: conf.trunc() as i32,
            bbox: PixelBox::new(
                px(6, "left")?,
                px(7, "top")?,
                px(8, "width")?,
                px(9, "height")?,
            ),
        });
    }

    Ok(tokens)
}
