use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::ExtractedText;
use crate::config::REDACTION_TOKEN;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Case-sensitive on purpose: only the exact `Patient ID:` label is redacted.
static PATIENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Patient ID:\s*\d+").unwrap());

/// Report text ready to hand to the completion service.
///
/// Holds no run of two or more whitespace characters and no
/// `Patient ID: <digits>` sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Collapse whitespace, redact patient IDs, trim.
///
/// This is a single-pattern scrub, not general PHI removal.
pub fn normalize_text(raw: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(raw, " ");
    let redacted = PATIENT_ID.replace_all(&collapsed, REDACTION_TOKEN);
    redacted.trim().to_string()
}

/// Normalize a whole extracted document. Applied once, never per fragment.
pub fn normalize(extracted: &ExtractedText) -> NormalizedText {
    NormalizedText(normalize_text(extracted.as_str()))
}
