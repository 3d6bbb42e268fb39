use super::types::{ExtractedText, ReportExtractor};
use super::ExtractionError;

/// Reads `.txt` reports: the whole byte stream must be valid UTF-8.
pub struct PlainTextExtractor;

impl ReportExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| ExtractionError::Decode(e.to_string()))?;
        Ok(ExtractedText::verbatim(text))
    }
}
