//! Session endpoints: ask a question, fetch a snapshot, forget a session.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{AnswerResponse, ApiContext, QuestionRequest};
use crate::chat::{ChatTurn, ReportSession};
use crate::pipeline::assistant::AssistantError;

/// `POST /api/sessions/:id/questions`
///
/// A failed completion is still recorded in the history, with the error
/// text as the answer, before the 502 goes back to the caller.
pub async fn ask(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let report = ctx.core.session_report(id)?;
    let question = request.question.trim().to_string();

    let core = ctx.core.clone();
    let asked = question.clone();
    let result =
        tokio::task::spawn_blocking(move || core.assistant().ask_question(&asked, &report))
            .await?;

    match result {
        Ok(answer) => {
            let turn = ChatTurn::new(question, answer);
            ctx.core.record_turn(id, turn.clone())?;
            Ok(Json(turn.into()))
        }
        Err(e @ (AssistantError::EmptyQuestion | AssistantError::EmptyReport)) => Err(e.into()),
        Err(e) => {
            ctx.core.record_turn(id, ChatTurn::failed(question, &e))?;
            Err(e.into())
        }
    }
}

/// `GET /api/sessions/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportSession>, ApiError> {
    Ok(Json(ctx.core.session_snapshot(id)?))
}

/// `DELETE /api/sessions/:id`
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ctx.core.remove_session(id)?;
    Ok(StatusCode::NO_CONTENT)
}
