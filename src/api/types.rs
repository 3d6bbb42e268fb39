//! Shared types for the API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chat::ChatTurn;
use crate::core_state::CoreState;
use crate::pipeline::import::DocumentFormat;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Response to `POST /api/reports`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub file_name: String,
    pub format: DocumentFormat,
    pub report_text: String,
    pub analysis: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub question: String,
    pub answer: String,
}

impl From<ChatTurn> for AnswerResponse {
    fn from(turn: ChatTurn) -> Self {
        Self {
            question: turn.question,
            answer: turn.answer,
        }
    }
}
