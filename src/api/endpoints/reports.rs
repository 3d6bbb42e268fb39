//! `POST /api/reports`: upload a report, extract its text, analyze it.
//!
//! Multipart fields:
//! - `file` (required): the report, named with its extension
//! - `session_id` (optional): attach to an existing session instead of
//!   opening a new one
//!
//! Ingestion and analysis both block, so each runs on the blocking pool.

use axum::extract::{Multipart, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UploadResponse};
use crate::config::MAX_UPLOAD_BYTES;
use crate::pipeline::import::sanitize_filename;

pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut session_id: Option<Uuid> = None;
    let mut file_data: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = sanitize_filename(field.file_name().unwrap_or(""));
                let bytes = field.bytes().await?;
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(ApiError::PayloadTooLarge);
                }
                file_data = Some((file_name, bytes.to_vec()));
            }
            "session_id" => {
                let raw = field.text().await?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let id = Uuid::parse_str(raw)
                        .map_err(|_| ApiError::BadRequest(format!("Invalid session id: {raw}")))?;
                    session_id = Some(id);
                }
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file_data.ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;

    if let Some(id) = session_id {
        if !ctx.core.session_exists(id)? {
            return Err(ApiError::NotFound(format!("Session {id}")));
        }
    }

    tracing::info!(file_name = %file_name, size = bytes.len(), "Report upload received");

    let core = ctx.core.clone();
    let report = tokio::task::spawn_blocking(move || {
        core.pipeline().ingest_upload(&file_name, &bytes)
    })
    .await??;

    let core = ctx.core.clone();
    let text = report.text.clone();
    let analysis = tokio::task::spawn_blocking(move || core.assistant().analyze_report(&text))
        .await?
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Report analysis failed");
            format!("Error analyzing report: {e}")
        });

    let file_name = report.file_name.clone();
    let format = report.format;
    let report_text = report.text.as_str().to_string();
    let id = ctx.core.store_report(session_id, report, analysis.clone())?;

    Ok(Json(UploadResponse {
        session_id: id.to_string(),
        file_name,
        format,
        report_text,
        analysis,
    }))
}
