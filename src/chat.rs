//! Report sessions: the uploaded report, its analysis, and the question
//! history that builds up around it.
//!
//! Sessions live in memory only. `SessionStore` is bounded and evicts the
//! least recently touched session once full.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::extraction::NormalizedText;
use crate::pipeline::import::DocumentFormat;
use crate::pipeline::processor::IngestedReport;

/// One question and the answer given for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        }
    }

    /// Turn recorded when the completion call failed. The error text stands
    /// in for the answer.
    pub fn failed(question: impl Into<String>, error: &impl std::fmt::Display) -> Self {
        Self::new(question, format!("Error processing question: {error}"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub file_name: Option<String>,
    pub format: Option<DocumentFormat>,
    pub report_text: NormalizedText,
    pub analysis: Option<String>,
    pub history: Vec<ChatTurn>,
}

impl ReportSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            file_name: None,
            format: None,
            report_text: NormalizedText::default(),
            analysis: None,
            history: Vec::new(),
        }
    }

    /// Swap in a newly uploaded report. History is kept.
    pub fn attach_report(&mut self, report: IngestedReport, analysis: String) {
        self.file_name = Some(report.file_name);
        self.format = Some(report.format);
        self.report_text = report.text;
        self.analysis = Some(analysis);
        self.touch();
    }

    pub fn set_analysis(&mut self, analysis: String) {
        self.analysis = Some(analysis);
        self.touch();
    }

    pub fn record_turn(&mut self, turn: ChatTurn) {
        self.history.push(turn);
        self.touch();
    }

    pub fn has_report(&self) -> bool {
        !self.report_text.is_empty()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for ReportSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded in-memory map of sessions.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<Uuid, ReportSession>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&ReportSession> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut ReportSession> {
        self.sessions.get_mut(id)
    }

    /// Insert a session, evicting the least recently touched one if full.
    pub fn insert(&mut self, session: ReportSession) {
        if !self.sessions.contains_key(&session.id) && self.sessions.len() >= self.capacity {
            let oldest = self
                .sessions
                .values()
                .min_by_key(|s| s.updated_at)
                .map(|s| s.id);
            if let Some(oldest) = oldest {
                self.sessions.remove(&oldest);
                tracing::info!(session_id = %oldest, "Evicted idle report session");
            }
        }
        self.sessions.insert(session.id, session);
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<ReportSession> {
        self.sessions.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{normalize, ExtractedText};

    fn ingested(file_name: &str, text: &str) -> IngestedReport {
        IngestedReport {
            file_name: file_name.into(),
            format: DocumentFormat::PlainText,
            extracted_chars: text.len(),
            text: normalize(&ExtractedText::verbatim(text)),
        }
    }

    #[test]
    fn new_session_is_empty() {
        let session = ReportSession::new();
        assert!(!session.has_report());
        assert!(session.analysis.is_none());
        assert!(session.history.is_empty());
    }

    #[test]
    fn new_upload_replaces_report_keeps_history() {
        let mut session = ReportSession::new();
        session.attach_report(ingested("a.txt", "LDL 4.9"), "LDL high".into());
        session.record_turn(ChatTurn::new("Is it bad?", "Somewhat."));

        session.attach_report(ingested("b.txt", "LDL 2.1"), "LDL normal".into());
        assert_eq!(session.file_name.as_deref(), Some("b.txt"));
        assert_eq!(session.report_text.as_str(), "LDL 2.1");
        assert_eq!(session.analysis.as_deref(), Some("LDL normal"));
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].question, "Is it bad?");
    }

    #[test]
    fn failed_turn_carries_error_text() {
        let turn = ChatTurn::failed("Why?", &"service down");
        assert_eq!(turn.answer, "Error processing question: service down");
    }

    #[test]
    fn store_evicts_least_recently_touched() {
        let mut store = SessionStore::new(2);
        let mut first = ReportSession::new();
        let second = ReportSession::new();
        let third = ReportSession::new();
        let (first_id, second_id, third_id) = (first.id, second.id, third.id);

        // `first` becomes the most recently touched.
        first.updated_at = second.updated_at + chrono::Duration::seconds(5);
        store.insert(first);
        store.insert(second);
        store.insert(third);

        assert_eq!(store.len(), 2);
        assert!(store.get(&first_id).is_some());
        assert!(store.get(&second_id).is_none());
        assert!(store.get(&third_id).is_some());
    }

    #[test]
    fn reinserting_existing_session_does_not_evict() {
        let mut store = SessionStore::new(1);
        let session = ReportSession::new();
        let id = session.id;
        store.insert(session.clone());
        store.insert(session);
        assert_eq!(store.len(), 1);
        assert!(store.get(&id).is_some());
    }

    #[test]
    fn remove_forgets_session() {
        let mut store = SessionStore::new(4);
        let session = ReportSession::new();
        let id = session.id;
        store.insert(session);
        assert!(store.remove(&id).is_some());
        assert!(store.is_empty());
        assert!(store.remove(&id).is_none());
    }

    #[test]
    fn session_serializes_history() {
        let mut session = ReportSession::new();
        session.record_turn(ChatTurn::new("Q", "A"));
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["history"][0]["question"], "Q");
        assert_eq!(json["history"][0]["answer"], "A");
        assert!(json["report_text"].is_string());
    }
}
