use std::path::Path;

use serde::{Deserialize, Serialize};

use super::docx::DocxTextExtractor;
use super::pdf::PdfTextExtractor;
use super::plain_text::PlainTextExtractor;
use super::xml::XmlTextExtractor;
use super::ExtractionError;
use crate::pipeline::import::DocumentFormat;

/// An uploaded report: its name, detected format and raw bytes.
#[derive(Debug, Clone)]
pub struct Document {
    file_name: String,
    format: DocumentFormat,
    bytes: Vec<u8>,
}

impl Document {
    pub fn new(file_name: impl Into<String>, format: DocumentFormat, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            format,
            bytes,
        }
    }

    /// Read a report from disk, keeping `file_name` as its display name.
    pub fn read(
        path: &Path,
        file_name: impl Into<String>,
        format: DocumentFormat,
    ) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(file_name, format, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Raw text pulled out of a report, before normalization.
///
/// Built from ordered fragments joined by a single newline; blank fragments
/// never make it in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Join fragments in order with `\n`, dropping blank ones.
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let kept: Vec<String> = fragments
            .into_iter()
            .filter(|f| !f.as_ref().trim().is_empty())
            .map(|f| f.as_ref().to_string())
            .collect();
        Self(kept.join("\n"))
    }

    /// Concatenate page texts directly, with no separator between pages.
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(pages.into_iter().fold(String::new(), |mut acc, page| {
            acc.push_str(page.as_ref());
            acc
        }))
    }

    /// Take a decoded text body as-is.
    pub fn verbatim(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-format text extraction.
pub trait ReportExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractionError>;
}

/// Dispatch a document to the extractor for its format.
pub fn extract_document(document: &Document) -> Result<ExtractedText, ExtractionError> {
    let bytes = document.bytes();
    match document.format() {
        DocumentFormat::Pdf => PdfTextExtractor.extract(bytes),
        DocumentFormat::Docx => DocxTextExtractor.extract(bytes),
        DocumentFormat::PlainText => PlainTextExtractor.extract(bytes),
        DocumentFormat::Xml => XmlTextExtractor.extract(bytes),
    }
}
