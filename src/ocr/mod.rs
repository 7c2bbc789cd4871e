//! Text recognition — Tesseract subprocess engine and text normalization.
//!
//! The engine is resolved once at startup: either an explicit binary path
//! from configuration, or a PATH lookup. A worker that cannot resolve an
//! engine never enters its loop, since no cycle could succeed.

use crate::error::RelayError;
use image::{DynamicImage, ImageFormat};
use regex::Regex;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;

/// Image-to-text seam. Production uses the Tesseract subprocess; tests
/// substitute scripted recognizers.
pub trait TextRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<String, RelayError>;
}

/// Recognizes text by piping a PNG through `tesseract stdin stdout`.
pub struct TesseractEngine {
    program: PathBuf,
    lang: String,
}

impl TesseractEngine {
    /// Resolve the tesseract binary. An explicit override must point at an
    /// existing file; otherwise the binary is looked up on PATH.
    pub fn resolve(override_path: Option<&Path>, lang: &str) -> Result<Self, RelayError> {
        let program = match override_path {
            Some(p) if p.is_file() => p.to_path_buf(),
            Some(p) => {
                return Err(RelayError::OcrEngineUnavailable(format!(
                    "TESSERACT_CMD does not exist: {}",
                    p.display()
                )))
            }
            None => which::which("tesseract").map_err(|e| {
                RelayError::OcrEngineUnavailable(format!("tesseract not found on PATH: {}", e))
            })?,
        };

        log::info!("[OCR] Using engine: {} (lang {})", program.display(), lang);
        Ok(Self {
            program,
            lang: lang.to_string(),
        })
    }
}

impl TextRecognizer for TesseractEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<String, RelayError> {
        let mut png_bytes: Vec<u8> = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
            .map_err(|e| RelayError::RecognitionFailed(format!("PNG encoding failed: {}", e)))?;

        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", &self.lang])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RelayError::OcrEngineUnavailable(format!(
                    "failed to spawn {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        // Tesseract consumes all of stdin before producing output, so a
        // sequential write-then-wait cannot deadlock.
        child
            .stdin
            .take()
            .ok_or_else(|| RelayError::RecognitionFailed("engine stdin unavailable".into()))?
            .write_all(&png_bytes)
            .map_err(|e| RelayError::RecognitionFailed(format!("stdin write failed: {}", e)))?;

        let output = child
            .wait_with_output()
            .map_err(|e| RelayError::RecognitionFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RelayError::RecognitionFailed(format!(
                "engine exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static BLANK_LINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Normalize recognized text before comparison and publishing: trim, then
/// either collapse all whitespace runs to single spaces or, when newlines
/// are kept, only squeeze runs of blank lines.
pub fn normalize_text(text: &str, keep_newlines: bool) -> String {
    let text = text.trim();
    if keep_newlines {
        BLANK_LINE_RUNS.replace_all(text, "\n\n").into_owned()
    } else {
        WHITESPACE_RUNS.replace_all(text, " ").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_collapses() {
        assert_eq!(normalize_text("  Hello\n\t world \n", false), "Hello world");
    }

    #[test]
    fn normalize_keeps_newlines_but_squeezes_blank_runs() {
        let input = "line one\n\n\n\n\nline two";
        assert_eq!(normalize_text(input, true), "line one\n\nline two");
    }

    #[test]
    fn normalize_blank_input_is_empty() {
        assert_eq!(normalize_text("   \n\t  ", false), "");
        assert_eq!(normalize_text("", true), "");
    }

    #[test]
    fn resolve_rejects_missing_override() {
        let result =
            TesseractEngine::resolve(Some(Path::new("/nonexistent/tesseract-bin")), "eng");
        assert!(matches!(result, Err(RelayError::OcrEngineUnavailable(_))));
    }
}
