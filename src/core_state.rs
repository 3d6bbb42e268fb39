//! Shared application state for the HTTP layer.
//!
//! `CoreState` owns the ingestion pipeline, the completion assistant, and
//! the in-memory session store. Sessions sit behind an `RwLock` so snapshot
//! reads do not block each other.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::chat::{ChatTurn, ReportSession, SessionStore};
use crate::config::{self, Settings};
use crate::pipeline::assistant::{AssistantError, ChatCompletionClient, ReportAssistant};
use crate::pipeline::extraction::NormalizedText;
use crate::pipeline::processor::{IngestedReport, IngestionPipeline};

pub struct CoreState {
    settings: Settings,
    pipeline: IngestionPipeline,
    assistant: ReportAssistant,
    sessions: RwLock<SessionStore>,
}

impl CoreState {
    /// Build state from settings, wiring the hosted completion client.
    pub fn new(settings: Settings) -> Result<Self, CoreError> {
        let client = ChatCompletionClient::from_settings(&settings)?;
        let assistant = ReportAssistant::new(
            Arc::new(client),
            settings.analysis_model.clone(),
            settings.chat_model.clone(),
        );
        Ok(Self::with_assistant(settings, assistant))
    }

    /// Build state around an existing assistant (tests use a mock client).
    pub fn with_assistant(settings: Settings, assistant: ReportAssistant) -> Self {
        let pipeline = match &settings.staging_dir {
            Some(dir) => IngestionPipeline::new(dir.clone()),
            None => IngestionPipeline::default(),
        };
        Self {
            settings,
            pipeline,
            assistant,
            sessions: RwLock::new(SessionStore::new(config::MAX_SESSIONS)),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }

    pub fn assistant(&self) -> &ReportAssistant {
        &self.assistant
    }

    pub fn model_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    // ── Session access ──────────────────────────────────────

    pub fn read_sessions(&self) -> Result<RwLockReadGuard<'_, SessionStore>, CoreError> {
        self.sessions.read().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionStore>, CoreError> {
        self.sessions.write().map_err(|_| CoreError::LockPoisoned)
    }

    /// Store an ingested report and its analysis.
    ///
    /// With `session_id`, the existing session's report is replaced and its
    /// history kept. Without it, a new session is opened.
    pub fn store_report(
        &self,
        session_id: Option<Uuid>,
        report: IngestedReport,
        analysis: String,
    ) -> Result<Uuid, CoreError> {
        let mut sessions = self.write_sessions()?;
        match session_id {
            Some(id) => {
                let session = sessions
                    .get_mut(&id)
                    .ok_or(CoreError::SessionNotFound(id))?;
                session.attach_report(report, analysis);
                Ok(id)
            }
            None => {
                let mut session = ReportSession::new();
                session.attach_report(report, analysis);
                let id = session.id;
                sessions.insert(session);
                tracing::info!(session_id = %id, "Report session opened");
                Ok(id)
            }
        }
    }

    pub fn session_exists(&self, id: Uuid) -> Result<bool, CoreError> {
        Ok(self.read_sessions()?.get(&id).is_some())
    }

    /// Report text of a session, for answering questions outside the lock.
    pub fn session_report(&self, id: Uuid) -> Result<NormalizedText, CoreError> {
        let sessions = self.read_sessions()?;
        let session = sessions.get(&id).ok_or(CoreError::SessionNotFound(id))?;
        Ok(session.report_text.clone())
    }

    /// Replace a session's analysis, e.g. after a streamed re-analysis.
    pub fn set_analysis(&self, id: Uuid, analysis: String) -> Result<(), CoreError> {
        let mut sessions = self.write_sessions()?;
        let session = sessions.get_mut(&id).ok_or(CoreError::SessionNotFound(id))?;
        session.set_analysis(analysis);
        Ok(())
    }

    pub fn record_turn(&self, id: Uuid, turn: ChatTurn) -> Result<(), CoreError> {
        let mut sessions = self.write_sessions()?;
        let session = sessions.get_mut(&id).ok_or(CoreError::SessionNotFound(id))?;
        session.record_turn(turn);
        Ok(())
    }

    pub fn session_snapshot(&self, id: Uuid) -> Result<ReportSession, CoreError> {
        let sessions = self.read_sessions()?;
        sessions
            .get(&id)
            .cloned()
            .ok_or(CoreError::SessionNotFound(id))
    }

    pub fn remove_session(&self, id: Uuid) -> Result<(), CoreError> {
        self.write_sessions()?
            .remove(&id)
            .map(|_| tracing::info!(session_id = %id, "Report session closed"))
            .ok_or(CoreError::SessionNotFound(id))
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("Completion client error: {0}")]
    Assistant(#[from] AssistantError),
}
