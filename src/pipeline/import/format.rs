use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ImportError;

/// Report formats we can extract text from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
    Xml,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 4] = [Self::Pdf, Self::Docx, Self::PlainText, Self::Xml];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "plain_text",
            Self::Xml => "xml",
        }
    }

    /// The literal file suffix (without the dot) that selects this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "txt",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the report format from its file name.
///
/// Matching is a case-sensitive suffix check on `.pdf`, `.docx`, `.txt` and
/// `.xml`. File content is never inspected, so a renamed file is trusted.
pub fn detect_format(file_name: &str) -> Result<DocumentFormat, ImportError> {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);

    DocumentFormat::ALL
        .into_iter()
        .find(|format| {
            name.strip_suffix(format.extension())
                .is_some_and(|stem| stem.ends_with('.'))
        })
        .ok_or_else(|| ImportError::UnsupportedFormat {
            extension: rejected_extension(name),
        })
}

/// Extension reported back when a name is rejected.
fn rejected_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_string(),
        _ => "(none)".to_string(),
    }
}

/// Longest file name kept, in characters.
pub const MAX_FILENAME_CHARS: usize = 255;

/// Sanitize a client-supplied filename: strip path components, limit length.
///
/// Over-long names lose characters from the stem, never from the extension,
/// since the extension selects the format.
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .collect();

    if clean.is_empty() {
        return "report".to_string();
    }
    if clean.chars().count() <= MAX_FILENAME_CHARS {
        return clean;
    }

    match clean.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.chars().count() < MAX_FILENAME_CHARS / 2 => {
            let keep = MAX_FILENAME_CHARS - ext.chars().count() - 1;
            let stem: String = stem.chars().take(keep).collect();
            format!("{stem}.{ext}")
        }
        _ => clean.chars().take(MAX_FILENAME_CHARS).collect(),
    }
}
