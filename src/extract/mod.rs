// Text extraction module
// Turns a source document (PDF or plain text) into a linear text stream,
// preferring the machine-readable text layer and falling back to page-image
// OCR for scanned books.


use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::Context;
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::catalog::DocumentKind;
use crate::config::ExtractionConfig;
use crate::{QaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Direct,
    Ocr,
}

impl std::fmt::Display for ExtractionMethod {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionMethod::Direct => f.write_str("direct"),
            ExtractionMethod::Ocr => f.write_str("ocr"),
        }
    }
}

/// Extraction output for one document. Produced once per document during the
/// offline pass; regenerated only by rerunning extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
    pub method: ExtractionMethod,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    config: ExtractionConfig,
}

impl Extractor {
    #[inline]
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extract the text stream for one document.
    ///
    /// Zero usable text from both the text layer and OCR is an error the
    /// caller is expected to log and skip; it never aborts a batch.
    #[inline]
    pub fn extract(&self, path: &Path, kind: DocumentKind) -> Result<ExtractedText> {
        match kind {
            DocumentKind::Txt => self.extract_txt(path),
            DocumentKind::Pdf => self.extract_pdf(path),
        }
    }

    fn extract_txt(&self, path: &Path) -> Result<ExtractedText> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file: {}", path.display()))?;

        if text.trim().is_empty() {
            return Err(QaError::Extraction(format!(
                "text file {} contains no content",
                path.display()
            )));
        }

        Ok(ExtractedText {
            text,
            page_count: 1,
            method: ExtractionMethod::Direct,
        })
    }

    fn extract_pdf(&self, path: &Path) -> Result<ExtractedText> {
        let page_count = pdf_page_count(path).unwrap_or(0);

        let (direct_text, direct_pages) = if page_count > 0 {
            (self.direct_text_by_page(path, page_count), page_count)
        } else {
            self.direct_text_whole(path)
        };

        if filtered_word_count(&direct_text) >= self.config.min_direct_words {
            debug!(
                "Accepted direct text layer for {} ({} pages)",
                path.display(),
                direct_pages
            );
            return Ok(ExtractedText {
                text: direct_text,
                page_count: direct_pages,
                method: ExtractionMethod::Direct,
            });
        }

        debug!(
            "Direct extraction below quality threshold for {}, trying OCR",
            path.display()
        );

        let ocr_text = self.ocr_text(path, page_count)?;
        if !ocr_text.trim().is_empty() {
            return Ok(ExtractedText {
                text: ocr_text,
                page_count: direct_pages.max(1),
                method: ExtractionMethod::Ocr,
            });
        }

        Err(QaError::Extraction(format!(
            "neither text layer nor OCR produced usable content for {}",
            path.display()
        )))
    }

    /// Per-page text layer extraction, concatenated with page markers.
    fn direct_text_by_page(&self, path: &Path, page_count: usize) -> String {
        let mut text = String::new();

        for page in 1..=page_count {
            let output = Command::new("pdftotext")
                .arg("-f")
                .arg(page.to_string())
                .arg("-l")
                .arg(page.to_string())
                .arg("-layout")
                .arg("-nopgbrk")
                .arg(path)
                .arg("-")
                .output();

            let Ok(output) = output else {
                warn!("pdftotext unavailable for {}", path.display());
                break;
            };

            if !output.status.success() {
                continue;
            }

            let page_text = String::from_utf8_lossy(&output.stdout);
            if page_text.trim().is_empty() {
                continue;
            }

            text.push_str(&page_marker(page));
            text.push('\n');
            text.push_str(page_text.trim());
            text.push('\n');
        }

        text
    }

    /// Whole-document extraction when the page count is unknown; poppler
    /// emits form feeds between pages, which we turn into markers.
    fn direct_text_whole(&self, path: &Path) -> (String, usize) {
        let output = match Command::new("pdftotext")
            .arg("-layout")
            .arg(path)
            .arg("-")
            .output()
        {
            Ok(output) => output,
            Err(_) => {
                warn!("pdftotext unavailable for {}", path.display());
                return (String::new(), 0);
            }
        };

        if !output.status.success() {
            return (String::new(), 0);
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let mut text = String::new();
        let mut pages = 0usize;

        for (index, segment) in raw.split('\u{0C}').enumerate() {
            if segment.trim().is_empty() {
                continue;
            }
            pages = index + 1;
            text.push_str(&page_marker(index + 1));
            text.push('\n');
            text.push_str(segment.trim());
            text.push('\n');
        }

        (text, pages.max(1))
    }

    /// OCR fallback: rasterize pages into a scoped temp dir and run
    /// tesseract per page. Capped to the configured page count; a page
    /// failure stops further pages rather than erroring the document.
    fn ocr_text(&self, path: &Path, page_count: usize) -> Result<String> {
        let temp_dir = TempDir::new().context("failed to create OCR scratch directory")?;
        let limit = if page_count > 0 {
            page_count.min(self.config.max_ocr_pages)
        } else {
            self.config.max_ocr_pages
        };

        let mut text = String::new();

        for page in 1..=limit {
            let prefix = temp_dir.path().join(format!("page-{page}"));
            let rasterized = Command::new("pdftoppm")
                .arg("-f")
                .arg(page.to_string())
                .arg("-l")
                .arg(page.to_string())
                .arg("-r")
                .arg(self.config.ocr_dpi.to_string())
                .arg("-png")
                .arg("-singlefile")
                .arg(path)
                .arg(&prefix)
                .output();

            let image_path = prefix.with_extension("png");
            let raster_ok = rasterized
                .map(|out| out.status.success() && image_path.exists())
                .unwrap_or(false);

            if !raster_ok {
                warn!(
                    "Failed to rasterize page {} of {}, stopping OCR",
                    page,
                    path.display()
                );
                break;
            }

            let recognized = Command::new("tesseract")
                .arg(&image_path)
                .arg("stdout")
                .arg("-l")
                .arg(&self.config.ocr_languages)
                .arg("--dpi")
                .arg(self.config.ocr_dpi.to_string())
                .output();

            // The page image is deleted as soon as OCR finishes; the temp
            // dir itself is removed on drop even if we bail out early.
            let _ = fs::remove_file(&image_path);

            let Ok(recognized) = recognized else {
                warn!("tesseract unavailable, stopping OCR for {}", path.display());
                break;
            };

            if !recognized.status.success() {
                warn!(
                    "OCR failed on page {} of {}, stopping",
                    page,
                    path.display()
                );
                break;
            }

            let page_text = String::from_utf8_lossy(&recognized.stdout);
            if page_text.trim().is_empty() {
                continue;
            }

            text.push_str(&page_marker(page));
            text.push('\n');
            text.push_str(page_text.trim());
            text.push('\n');

            debug!("OCR recognized page {} of {}", page, path.display());
        }

        Ok(text)
    }
}

/// Page-boundary marker recording the page number. Downstream stages treat
/// it as ordinary text.
#[inline]
pub fn page_marker(page: usize) -> String {
    format!("[পৃষ্ঠা {page}]")
}

/// Words longer than two characters, the quality signal for deciding
/// whether a text layer is real or an artifact of a scanned PDF.
#[inline]
pub fn filtered_word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .count()
}

/// Total page count via pdfinfo.
fn pdf_page_count(path: &Path) -> Option<usize> {
    let output = Command::new("pdfinfo").arg(path).output().ok()?;

    if !output.status.success() {
        return None;
    }

    parse_page_count(&String::from_utf8_lossy(&output.stdout))
}

fn parse_page_count(pdfinfo_output: &str) -> Option<usize> {
    let regex = Regex::new(r"(?m)^Pages:\s+(\d+)\s*$").ok()?;
    regex
        .captures(pdfinfo_output)
        .ok()
        .flatten()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
}

/// Check PATH presence via `which`; some poppler binaries return non-zero
/// for --version so probing a flag is unreliable.
#[inline]
pub fn command_available(binary: &str) -> bool {
    Command::new("which")
        .arg(binary)
        .output()
        .map(|out| out.status.success() && !out.stdout.is_empty())
        .unwrap_or(false)
}
