//! Job results: output blobs, per-page OCR text, metadata and stats.

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// The success outcome of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutput {
    /// Output blobs in the order they were produced.
    pub files: Vec<OutputFile>,
    /// Per-page recognition results (OCR only; empty otherwise).
    pub pages: Vec<PageText>,
    /// Metadata of the source document, when the input was a PDF.
    pub metadata: Option<DocumentMetadata>,
    pub stats: JobStats,
}

impl JobOutput {
    /// Assembled OCR text, if this job produced any.
    pub fn text(&self) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.mime_type == MIME_TEXT)
            .and_then(|f| std::str::from_utf8(&f.bytes).ok())
    }
}

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain; charset=utf-8";

/// One output blob with its file name.
#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
    pub filename: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    /// Pages in the output document; `None` for text outputs.
    pub page_count: Option<usize>,
    pub size_bytes: usize,
}

impl OutputFile {
    pub fn pdf(filename: impl Into<String>, bytes: Vec<u8>, page_count: usize) -> Self {
        Self {
            filename: filename.into(),
            size_bytes: bytes.len(),
            bytes,
            mime_type: MIME_PDF,
            page_count: Some(page_count),
        }
    }

    pub fn text(filename: impl Into<String>, text: String) -> Self {
        let bytes = text.into_bytes();
        Self {
            filename: filename.into(),
            size_bytes: bytes.len(),
            bytes,
            mime_type: MIME_TEXT,
            page_count: None,
        }
    }
}

/// Recognition result for a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// Cleaned text; empty when the page failed.
    pub text: String,
    pub error: Option<PageError>,
}

impl PageText {
    /// Text as it appears in the assembled output: the page text, or the
    /// failure marker.
    pub fn rendered(&self) -> String {
        match &self.error {
            Some(e) => format!("{}\n", e.marker()),
            None => self.text.clone(),
        }
    }
}

/// Document information dictionary plus structural facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// Width and height of the first page in points.
    pub first_page_size: Option<(f32, f32)>,
}

/// Counters for one job run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStats {
    pub operation: String,
    /// Pages (or images) the job touched.
    pub units_processed: usize,
    /// OCR pages that produced a failure marker.
    pub units_failed: usize,
    pub outputs: usize,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_page_renders_marker() {
        let p = PageText {
            page_num: 3,
            text: String::new(),
            error: Some(PageError::RecognitionFailed {
                page: 3,
                detail: "timeout".into(),
            }),
        };
        assert_eq!(p.rendered(), "[OCR failed on page 3: timeout]\n");
    }

    #[test]
    fn text_accessor_finds_text_output() {
        let out = JobOutput {
            files: vec![
                OutputFile::pdf("a.pdf", b"%PDF".to_vec(), 1),
                OutputFile::text("a_ocr.txt", "hello\n".into()),
            ],
            pages: vec![],
            metadata: None,
            stats: JobStats::default(),
        };
        assert_eq!(out.text(), Some("hello\n"));
        assert_eq!(out.files[1].size_bytes, 6);
    }
}
