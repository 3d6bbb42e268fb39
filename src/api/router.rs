//! HTTP API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::config::MAX_UPLOAD_BYTES;
use crate::core_state::CoreState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/reports", post(endpoints::reports::upload))
        .route(
            "/sessions/:id",
            get(endpoints::sessions::detail).delete(endpoints::sessions::remove),
        )
        .route("/sessions/:id/questions", post(endpoints::sessions::ask))
        .route(
            "/sessions/:id/analysis/stream",
            get(endpoints::analysis::stream),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::Settings;
    use crate::pipeline::assistant::{MockCompletionClient, ReportAssistant};

    const BOUNDARY: &str = "healthinsight-test-boundary";

    struct TestApp {
        core: Arc<CoreState>,
        mock: Arc<MockCompletionClient>,
        _staging: tempfile::TempDir,
    }

    impl TestApp {
        fn new(mock: MockCompletionClient) -> Self {
            let staging = tempfile::tempdir().unwrap();
            let mock = Arc::new(mock);
            let assistant = ReportAssistant::new(mock.clone(), "analysis-model", "chat-model");
            let settings = Settings {
                staging_dir: Some(staging.path().to_path_buf()),
                ..Settings::default()
            };
            let core = Arc::new(CoreState::with_assistant(settings, assistant));
            Self {
                core,
                mock,
                _staging: staging,
            }
        }

        fn router(&self) -> Router {
            api_router(self.core.clone())
        }

        fn staged_files(&self) -> usize {
            std::fs::read_dir(self._staging.path())
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    fn multipart_body(file: Option<(&str, &[u8])>, session_id: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(id) = session_id {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"session_id\"\r\n\r\n{id}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(file: Option<(&str, &[u8])>, session_id: Option<&str>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/reports")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(file, session_id)))
            .unwrap()
    }

    fn question_request(session_id: &str, question: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/sessions/{session_id}/questions"))
            .header("Content-Type", "application/json")
            .body(Body::from(
                serde_json::json!({ "question": question }).to_string(),
            ))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn upload_txt(app: &TestApp, text: &str) -> serde_json::Value {
        let response = app
            .router()
            .oneshot(upload_request(Some(("labs.txt", text.as_bytes())), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await
    }

    #[tokio::test]
    async fn health_reports_status_and_version() {
        let app = TestApp::new(MockCompletionClient::new("unused"));
        let response = app
            .router()
            .oneshot(empty_request("GET", "/api/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::config::APP_VERSION);
        assert_eq!(json["model_configured"], false);
    }

    #[tokio::test]
    async fn upload_extracts_normalizes_and_analyzes() {
        let app = TestApp::new(MockCompletionClient::new("## Findings\nAll normal."));
        let json = upload_txt(&app, "Patient ID:  981\n\nHemoglobin   13.5 g/dL").await;

        assert_eq!(json["file_name"], "labs.txt");
        assert_eq!(json["format"], "plain_text");
        assert_eq!(json["report_text"], "[REDACTED] Hemoglobin 13.5 g/dL");
        assert_eq!(json["analysis"], "## Findings\nAll normal.");
        assert!(uuid::Uuid::parse_str(json["session_id"].as_str().unwrap()).is_ok());

        let requests = app.mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user, "[REDACTED] Hemoglobin 13.5 g/dL");
        assert_eq!(app.staged_files(), 0);
    }

    #[tokio::test]
    async fn upload_xml_report() {
        let app = TestApp::new(MockCompletionClient::new("ok"));
        let xml = b"<ClinicalDocument><section><title>Vitals</title><text>BP 120/80</text></section></ClinicalDocument>";
        let response = app
            .router()
            .oneshot(upload_request(Some(("cda.xml", xml)), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["format"], "xml");
        assert_eq!(json["report_text"], "Vitals BP 120/80");
    }

    #[tokio::test]
    async fn upload_rejects_unsupported_format_with_415() {
        let app = TestApp::new(MockCompletionClient::new("unused"));
        let response = app
            .router()
            .oneshot(upload_request(Some(("scan.png", b"\x89PNG")), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "UNSUPPORTED_FORMAT");
        assert!(json["error"]["message"].as_str().unwrap().contains("png"));
        assert!(app.mock.requests().is_empty());
        assert_eq!(app.staged_files(), 0);
    }

    #[tokio::test]
    async fn upload_malformed_xml_returns_422() {
        let app = TestApp::new(MockCompletionClient::new("unused"));
        let response = app
            .router()
            .oneshot(upload_request(Some(("bad.xml", b"<a><b></a>")), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"]["code"], "INVALID_XML");
        assert_eq!(app.staged_files(), 0);
    }

    #[tokio::test]
    async fn upload_over_size_limit_is_413() {
        let app = TestApp::new(MockCompletionClient::new("unused"));
        let oversized = vec![b'a'; MAX_UPLOAD_BYTES + 1024];
        let response = app
            .router()
            .oneshot(upload_request(Some(("big.txt", &oversized)), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["error"]["code"], "PAYLOAD_TOO_LARGE");
        assert!(app.mock.requests().is_empty());
        assert_eq!(app.staged_files(), 0);
    }

    #[tokio::test]
    async fn upload_at_size_limit_is_accepted() {
        let app = TestApp::new(MockCompletionClient::new("ok"));
        let exact = vec![b'a'; MAX_UPLOAD_BYTES];
        let response = app
            .router()
            .oneshot(upload_request(Some(("max.txt", &exact)), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn upload_without_file_is_bad_request() {
        let app = TestApp::new(MockCompletionClient::new("unused"));
        let response = app
            .router()
            .oneshot(upload_request(None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_to_unknown_session_is_404() {
        let app = TestApp::new(MockCompletionClient::new("unused"));
        let missing = uuid::Uuid::new_v4().to_string();
        let response = app
            .router()
            .oneshot(upload_request(Some(("labs.txt", b"Na 140")), Some(&missing)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn analysis_failure_still_stores_report() {
        let app = TestApp::new(MockCompletionClient::failing("http://offline"));
        let json = upload_txt(&app, "LDL 4.9 mmol/L").await;

        let analysis = json["analysis"].as_str().unwrap();
        assert!(analysis.starts_with("Error analyzing report:"), "{analysis}");

        let id: uuid::Uuid = json["session_id"].as_str().unwrap().parse().unwrap();
        assert_eq!(app.core.session_report(id).unwrap().as_str(), "LDL 4.9 mmol/L");
    }

    #[tokio::test]
    async fn second_upload_to_session_keeps_history() {
        let app = TestApp::new(MockCompletionClient::new("answer"));
        let first = upload_txt(&app, "LDL 4.9").await;
        let id = first["session_id"].as_str().unwrap().to_string();

        let response = app
            .router()
            .oneshot(question_request(&id, "Is it high?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .router()
            .oneshot(upload_request(Some(("new.txt", b"LDL 2.0")), Some(&id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["session_id"], id.as_str());

        let snapshot = json_body(
            app.router()
                .oneshot(empty_request("GET", &format!("/api/sessions/{id}")))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(snapshot["file_name"], "new.txt");
        assert_eq!(snapshot["report_text"], "LDL 2.0");
        assert_eq!(snapshot["history"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn question_is_answered_and_recorded() {
        let app = TestApp::new(MockCompletionClient::new("Your LDL is above range."));
        let id = upload_txt(&app, "LDL 4.9 mmol/L").await["session_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .router()
            .oneshot(question_request(&id, "  Is my LDL high? "))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["question"], "Is my LDL high?");
        assert_eq!(json["answer"], "Your LDL is above range.");

        let requests = app.mock.requests();
        assert_eq!(
            requests.last().unwrap().user,
            "Report: LDL 4.9 mmol/L\n\nQuestion: Is my LDL high?"
        );

        let snapshot = app.core.session_snapshot(id.parse().unwrap()).unwrap();
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].answer, "Your LDL is above range.");
    }

    #[tokio::test]
    async fn failed_question_records_error_and_returns_502() {
        let app = TestApp::new(MockCompletionClient::failing("http://offline"));
        let id = upload_txt(&app, "K 5.9").await["session_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .router()
            .oneshot(question_request(&id, "Is potassium high?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["code"], "COMPLETION_FAILED");

        let snapshot = app.core.session_snapshot(id.parse().unwrap()).unwrap();
        assert_eq!(snapshot.history.len(), 1);
        assert!(snapshot.history[0]
            .answer
            .starts_with("Error processing question:"));
    }

    #[tokio::test]
    async fn empty_question_is_rejected_and_not_recorded() {
        let app = TestApp::new(MockCompletionClient::new("unused"));
        let id = upload_txt(&app, "Na 140").await["session_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .router()
            .oneshot(question_request(&id, "   "))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let snapshot = app.core.session_snapshot(id.parse().unwrap()).unwrap();
        assert!(snapshot.history.is_empty());
    }

    #[tokio::test]
    async fn question_for_unknown_session_is_404() {
        let app = TestApp::new(MockCompletionClient::new("unused"));
        let response = app
            .router()
            .oneshot(question_request(&uuid::Uuid::new_v4().to_string(), "Hi?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_forgets_session() {
        let app = TestApp::new(MockCompletionClient::new("ok"));
        let id = upload_txt(&app, "Na 140").await["session_id"]
            .as_str()
            .unwrap()
            .to_string();
        let uri = format!("/api/sessions/{id}");

        let response = app
            .router()
            .oneshot(empty_request("DELETE", &uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .router()
            .oneshot(empty_request("GET", &uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn text_body(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn analysis_stream_emits_tokens_then_done() {
        let app = TestApp::new(MockCompletionClient::new("Sodium is normal."));
        let id = upload_txt(&app, "Na 140").await["session_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .router()
            .oneshot(empty_request(
                "GET",
                &format!("/api/sessions/{id}/analysis/stream"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let body = text_body(response).await;
        let token_at = body.find("event: token").expect("token event");
        let done_at = body.find("event: done").expect("done event");
        assert!(token_at < done_at, "{body}");
        assert!(body.contains(r#"{"text":"Sodium is normal."}"#), "{body}");

        // Upload analysis plus the streamed one.
        assert_eq!(app.mock.requests().len(), 2);
        let snapshot = app.core.session_snapshot(id.parse().unwrap()).unwrap();
        assert_eq!(snapshot.analysis.as_deref(), Some("Sodium is normal."));
    }

    #[tokio::test]
    async fn analysis_stream_reports_completion_failure() {
        let app = TestApp::new(MockCompletionClient::failing("http://offline"));
        let id = upload_txt(&app, "Na 140").await["session_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .router()
            .oneshot(empty_request(
                "GET",
                &format!("/api/sessions/{id}/analysis/stream"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = text_body(response).await;
        assert!(body.contains("event: error"), "{body}");
        assert!(!body.contains("event: done"), "{body}");
    }

    #[tokio::test]
    async fn analysis_stream_for_unknown_session_is_404() {
        let app = TestApp::new(MockCompletionClient::new("unused"));
        let response = app
            .router()
            .oneshot(empty_request(
                "GET",
                &format!("/api/sessions/{}/analysis/stream", uuid::Uuid::new_v4()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(app.mock.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = TestApp::new(MockCompletionClient::new("unused"));
        let response = app
            .router()
            .oneshot(empty_request("GET", "/api/nonexistent"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
