//! OCR engines.
//!
//! Recognition is blocking work; the classifier runs it on tokio's blocking pool.

use super::TextBlock;
use crate::errors::{Error, Result};
use std::{
    io::Write,
    process::{Command, Stdio},
};

/// Turns image bytes into recognized lines.
pub trait OcrEngine: Send + Sync {
    /// Recognizes text in a single image.
    fn recognize(&self, image: &[u8]) -> Result<Vec<TextBlock>>;
}

/// Runs the `tesseract` command line tool with the English model.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: String,
    language: String,
}

impl TesseractCli {
    /// Uses `binary` (a name on `PATH` or an absolute path).
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: "eng".to_string(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &[u8]) -> Result<Vec<TextBlock>> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", self.language.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Ocr {
                message: format!("failed to start {}: {e}", self.binary),
            })?;

        // Dropping stdin closes the pipe so tesseract starts processing
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(image) {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Ocr {
                    message: format!("failed to feed image to {}: {e}", self.binary),
                });
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::Ocr {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(text_blocks(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Splits recognized text into non-empty, trimmed lines.
#[must_use]
pub fn text_blocks(text: &str) -> Vec<TextBlock> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(line, text)| TextBlock {
            text: text.to_string(),
            line,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_blocks_skips_blank_lines() {
        let blocks = text_blocks("  STORE 42 \n\n\tTotal 9.99\n   \n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "STORE 42");
        assert_eq!(blocks[1].line, 1);
        assert_eq!(blocks[1].text, "Total 9.99");
    }

    #[test]
    fn test_missing_binary_is_an_ocr_error() {
        let engine = TesseractCli::new("/nonexistent/tesseract-binary");
        assert!(matches!(engine.recognize(b"png"), Err(Error::Ocr { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_exiting_before_reading_is_an_ocr_error() {
        // `true` exits without draining stdin, so a large write hits a closed pipe
        let engine = TesseractCli::new("true");
        let image = vec![0_u8; 4 * 1024 * 1024];
        let result = engine.recognize(&image);
        assert!(
            matches!(result, Err(Error::Ocr { ref message }) if message.contains("feed")),
            "unexpected result: {result:?}"
        );
    }
}
