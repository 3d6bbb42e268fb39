//! Report ingestion orchestrator.
//!
//! Runs the full chain for one uploaded report:
//!   detect format → stage transient copy → extract → normalize.
//!
//! Each call is synchronous and stateless. The staged copy lives only for
//! the duration of the call and is removed on every exit path.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::extraction::{extract_document, normalize, Document, ExtractionError, NormalizedText};
use super::import::{default_staging_dir, detect_format, stage_upload, DocumentFormat, ImportError};

/// The four ways an ingestion attempt can fail. All are terminal.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported file format: {0}. Use PDF, DOCX, TXT, or XML")]
    UnsupportedFormat(String),

    #[error("Could not decode report text: {0}")]
    Decode(String),

    #[error("Invalid XML file: {0}")]
    InvalidXml(String),

    #[error("Could not read report: {0}")]
    Read(String),
}

impl IngestError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::Decode(_) => "DECODE_ERROR",
            Self::InvalidXml(_) => "INVALID_XML",
            Self::Read(_) => "READ_ERROR",
        }
    }
}

impl From<ImportError> for IngestError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::UnsupportedFormat { extension } => Self::UnsupportedFormat(extension),
            ImportError::Io(e) => Self::Read(e.to_string()),
        }
    }
}

impl From<ExtractionError> for IngestError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Decode(msg) => Self::Decode(msg),
            ExtractionError::InvalidXml(msg) => Self::InvalidXml(msg),
            read @ ExtractionError::Read { .. } => Self::Read(read.to_string()),
            ExtractionError::Io(e) => Self::Read(e.to_string()),
        }
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedReport {
    pub file_name: String,
    pub format: DocumentFormat,
    /// Characters extracted before normalization.
    pub extracted_chars: usize,
    pub text: NormalizedText,
}

/// Detect → extract → normalize, for one report at a time.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    staging_dir: PathBuf,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new(default_staging_dir())
    }
}

impl IngestionPipeline {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Ingest uploaded bytes through a transient on-disk copy.
    ///
    /// Nothing is written when the format is rejected. Once written, the
    /// copy is removed before this returns, whether extraction succeeded
    /// or not.
    pub fn ingest_upload(&self, file_name: &str, bytes: &[u8]) -> Result<IngestedReport, IngestError> {
        let format = detect_format(file_name)?;
        let staged = stage_upload(bytes, format, &self.staging_dir)?;
        let document = Document::read(staged.path(), file_name, staged.format())?;
        self.finish(document)
        // `staged` drops here, or earlier on any `?`, deleting the copy.
    }

    /// Ingest a report the caller already has on disk. The file is left as-is.
    pub fn ingest_path(&self, path: &Path) -> Result<IngestedReport, IngestError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let format = detect_format(file_name)?;
        let document = Document::read(path, file_name, format)?;
        self.finish(document)
    }

    /// Ingest an in-memory report without touching disk.
    pub fn ingest_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<IngestedReport, IngestError> {
        let format = detect_format(file_name)?;
        self.finish(Document::new(file_name, format, bytes))
    }

    fn finish(&self, document: Document) -> Result<IngestedReport, IngestError> {
        tracing::info!(
            file_name = %document.file_name(),
            format = document.format().as_str(),
            size = document.bytes().len(),
            "Ingesting report"
        );

        let extracted = extract_document(&document).map_err(|e| {
            tracing::warn!(
                file_name = %document.file_name(),
                format = document.format().as_str(),
                error = %e,
                "Report extraction failed"
            );
            IngestError::from(e)
        })?;
        let extracted_chars = extracted.as_str().chars().count();
        let text = normalize(&extracted);

        tracing::info!(
            file_name = %document.file_name(),
            extracted_chars,
            normalized_chars = text.char_count(),
            "Report ingested"
        );

        Ok(IngestedReport {
            file_name: document.file_name().to_string(),
            format: document.format(),
            extracted_chars,
            text,
        })
    }
}
