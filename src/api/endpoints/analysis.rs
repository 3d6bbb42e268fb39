//! `GET /api/sessions/:id/analysis/stream`: re-analyze a session's report and
//! stream the answer as server-sent events.
//!
//! Events:
//! - `token`: `{"text": "..."}` for each content delta
//! - `done`: `{"analysis": "..."}` once the full analysis is stored
//! - `error`: `{"message": "..."}` when the completion call fails

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive};
use axum::response::Sse;
use futures_util::Stream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;
use crate::pipeline::assistant::AssistantError;
use crate::pipeline::extraction::NormalizedText;

type EventSender = UnboundedSender<Result<Event, Infallible>>;

pub async fn stream(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let report = ctx.core.session_report(id)?;
    if report.is_empty() {
        return Err(AssistantError::EmptyReport.into());
    }

    let (tx, rx) = unbounded_channel();
    let core = ctx.core.clone();
    tokio::spawn(async move {
        run_analysis(core, id, report, tx).await;
    });

    Ok(Sse::new(UnboundedReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

async fn run_analysis(
    core: std::sync::Arc<CoreState>,
    id: Uuid,
    report: NormalizedText,
    tx: EventSender,
) {
    let (token_tx, token_rx) = std::sync::mpsc::channel::<String>();

    // Ends when the analysis drops its sender.
    let forward_tx = tx.clone();
    let forwarder = tokio::task::spawn_blocking(move || {
        for token in token_rx {
            let event = event("token", serde_json::json!({ "text": token }));
            if forward_tx.send(Ok(event)).is_err() {
                break;
            }
        }
    });

    let analysis_core = core.clone();
    let result = tokio::task::spawn_blocking(move || {
        analysis_core
            .assistant()
            .analyze_report_streaming(&report, Some(token_tx))
    })
    .await;
    let _ = forwarder.await;

    let outcome = match result {
        Ok(Ok(analysis)) => core
            .set_analysis(id, analysis.clone())
            .map(|_| analysis)
            .map_err(|e| e.to_string()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    let final_event = match outcome {
        Ok(analysis) => {
            tracing::info!(session_id = %id, "Streamed analysis stored");
            event("done", serde_json::json!({ "analysis": analysis }))
        }
        Err(message) => {
            tracing::warn!(session_id = %id, error = %message, "Streamed analysis failed");
            event("error", serde_json::json!({ "message": message }))
        }
    };
    let _ = tx.send(Ok(final_event));
}

fn event(name: &str, payload: serde_json::Value) -> Event {
    Event::default().event(name).data(payload.to_string())
}
