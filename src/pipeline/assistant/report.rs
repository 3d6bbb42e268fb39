use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::{AssistantError, CompletionClient, CompletionRequest};
use crate::pipeline::extraction::NormalizedText;
use crate::pipeline::prompt_templates::{question_user_message, PromptKind};

/// Turns normalized report text into an analysis and answers follow-up
/// questions about it.
#[derive(Clone)]
pub struct ReportAssistant {
    client: Arc<dyn CompletionClient>,
    analysis_model: String,
    chat_model: String,
}

impl ReportAssistant {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        analysis_model: impl Into<String>,
        chat_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            analysis_model: analysis_model.into(),
            chat_model: chat_model.into(),
        }
    }

    pub fn analysis_model(&self) -> &str {
        &self.analysis_model
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    /// Full analysis of a report, returned once the stream completes.
    pub fn analyze_report(&self, report: &NormalizedText) -> Result<String, AssistantError> {
        self.analyze_report_streaming(report, None)
    }

    /// Streamed analysis. Each content delta is forwarded to `token_tx`.
    pub fn analyze_report_streaming(
        &self,
        report: &NormalizedText,
        token_tx: Option<Sender<String>>,
    ) -> Result<String, AssistantError> {
        if report.is_empty() {
            return Err(AssistantError::EmptyReport);
        }

        let request = build_request(PromptKind::Analysis, &self.analysis_model, report.as_str());
        tracing::info!(
            model = %self.analysis_model,
            report_chars = report.char_count(),
            "Requesting report analysis"
        );

        let analysis = self.client.complete_streaming(&request, token_tx)?;
        tracing::info!(analysis_chars = analysis.len(), "Report analysis complete");
        Ok(analysis)
    }

    /// Answer one question grounded in the report text.
    pub fn ask_question(
        &self,
        question: &str,
        report: &NormalizedText,
    ) -> Result<String, AssistantError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }
        if report.is_empty() {
            return Err(AssistantError::EmptyReport);
        }

        let user = question_user_message(question, report.as_str());
        let request = build_request(PromptKind::Question, &self.chat_model, &user);
        tracing::info!(
            model = %self.chat_model,
            question_chars = question.len(),
            "Answering report question"
        );

        self.client.complete(&request)
    }
}

fn build_request(kind: PromptKind, model: &str, user: &str) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        system: kind.system_prompt().to_string(),
        user: user.to_string(),
        temperature: kind.temperature(),
        max_tokens: kind.max_tokens(),
        top_p: kind.top_p(),
    }
}
