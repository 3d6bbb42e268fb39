use std::panic::{catch_unwind, AssertUnwindSafe};

use super::types::{ExtractedText, ReportExtractor};
use super::ExtractionError;
use crate::pipeline::import::DocumentFormat;

/// PDF text extractor using the pdf-extract crate.
/// Reads the embedded text layer only; scanned pages come back empty.
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Text of every page, in page order. A page without a text layer
    /// yields an empty string.
    pub fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed inputs instead of erroring.
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }));

        match outcome {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(read_error(e.to_string())),
            Err(_) => Err(read_error("PDF parser aborted on malformed input".into())),
        }
    }
}

impl ReportExtractor for PdfTextExtractor {
    fn extract(&self, pdf_bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let pages = self.extract_pages(pdf_bytes)?;
        tracing::debug!(pages = pages.len(), "PDF text layer extracted");
        Ok(ExtractedText::from_pages(pages))
    }
}

fn read_error(reason: String) -> ExtractionError {
    ExtractionError::Read {
        format: DocumentFormat::Pdf,
        reason,
    }
}
