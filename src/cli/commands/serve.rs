//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for report generation and investigative Q&A over a single
//! shared conversation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::CaseLinkError;
use crate::orchestrator::Orchestrator;
use crate::rag::{ConversationChain, ConversationTurn, OpenAIChatModel};
use crate::report::document::{paginate, render_pdf, PageLayout};
use crate::report::{mime_type_for, supported_extensions};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    conversation: Mutex<ConversationChain>,
    output_file: String,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let chat_model = Arc::new(OpenAIChatModel::new(
        &settings.rag.model,
        settings.rag.temperature,
        settings.request_timeout(),
    )?);
    let max_upload_bytes = settings.server.max_upload_mb * 1024 * 1024;
    let output_file = settings.report.output_file.clone();

    let orchestrator = Orchestrator::new(settings)?;
    let conversation = Mutex::new(orchestrator.conversation(chat_model));

    let state = Arc::new(AppState {
        orchestrator,
        conversation,
        output_file,
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("CaseLink API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Report", "POST   /report?filename=clip.mp4[&format=pdf]");
    Output::kv("Ask", "POST   /ask");
    Output::kv("Transcript", "GET    /transcript");
    Output::kv("Reset", "DELETE /transcript");
    Output::kv("Index", "GET    /index");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state, max_upload_bytes)).await?;

    Ok(())
}

fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/report", post(report))
        .route("/ask", post(ask))
        .route("/transcript", get(transcript).delete(clear_transcript))
        .route("/index", get(index_info))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ReportQuery {
    /// Original file name; its extension selects the video type.
    filename: String,
    /// `json` (default) or `pdf`.
    #[serde(default)]
    format: Option<String>,
}

#[derive(Serialize)]
struct ReportResponse {
    report: String,
    passages_indexed: usize,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    sources: Vec<SourceInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    id: String,
    indexed_at: String,
    score: f32,
    content: String,
}

#[derive(Serialize)]
struct TranscriptResponse {
    turns: Vec<ConversationTurn>,
}

#[derive(Serialize)]
struct IndexResponse {
    path: String,
    loaded: bool,
    passages: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// HTTP status for a library error.
fn status_for(error: &CaseLinkError) -> StatusCode {
    match error {
        CaseLinkError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CaseLinkError::NoIndex => StatusCode::CONFLICT,
        CaseLinkError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        CaseLinkError::Generation(_) | CaseLinkError::Answer(_) | CaseLinkError::OpenAI(_) | CaseLinkError::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Request body must contain the video bytes");
    }

    let extension = match Path::new(&query.filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|_| mime_type_for(Path::new(&query.filename)).is_some())
    {
        Some(ext) => ext.to_lowercase(),
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!(
                    "Unsupported video format: {} (expected one of: {})",
                    query.filename,
                    supported_extensions().join(", ")
                ),
            )
        }
    };

    // Removed when `upload` is dropped at the end of the handler.
    let upload = match stage_upload(body.clone(), extension).await {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to stage upload: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    info!("Received {} ({} bytes)", query.filename, body.len());

    let result = match state.orchestrator.generate_report(upload.path()).await {
        Ok(result) => result,
        Err(e) => return error_response(status_for(&e), e.to_string()),
    };

    if query.format.as_deref().is_some_and(|f| f.eq_ignore_ascii_case("pdf")) {
        let layout = PageLayout::default();
        return match render_pdf(&paginate(&result.report, &layout), &layout) {
            Ok(bytes) => (
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", state.output_file),
                    ),
                ],
                bytes,
            )
                .into_response(),
            Err(e) => error_response(status_for(&e), e.to_string()),
        };
    }

    Json(ReportResponse {
        report: result.report,
        passages_indexed: result.passages_indexed,
    })
    .into_response()
}

/// Write the upload to a temporary file on the blocking pool.
async fn stage_upload(bytes: Bytes, extension: String) -> std::io::Result<tempfile::NamedTempFile> {
    tokio::task::spawn_blocking(move || write_upload(&bytes, &extension))
        .await
        .map_err(std::io::Error::other)?
}

fn write_upload(bytes: &[u8], extension: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("caselink-upload-")
        .suffix(&format!(".{}", extension))
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Response {
    let mut conversation = state.conversation.lock().await;

    match conversation.ask(&req.question).await {
        Ok(response) => Json(AskResponse {
            answer: response.answer,
            sources: response
                .retrieval
                .retrieved_passages
                .into_iter()
                .zip(response.retrieval.scores)
                .map(|(passage, score)| SourceInfo {
                    id: passage.id.to_string(),
                    indexed_at: passage.indexed_at.to_rfc3339(),
                    score,
                    content: passage.text,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(status_for(&e), e.to_string()),
    }
}

async fn transcript(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let conversation = state.conversation.lock().await;
    Json(TranscriptResponse {
        turns: conversation.transcript().to_vec(),
    })
}

async fn clear_transcript(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.conversation.lock().await.clear_history();
    StatusCode::NO_CONTENT
}

async fn index_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let index = state.orchestrator.index();
    Json(IndexResponse {
        path: index.path().display().to_string(),
        loaded: index.is_loaded(),
        passages: index.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::testing::{KeywordEmbedder, ScriptedChatModel, StubReportGenerator};
    use crate::vector_store::IndexManager;

    /// Serve the router on an ephemeral port and return its base URL.
    async fn spawn_app(dir: &Path, replies: &[&str]) -> String {
        let index = Arc::new(IndexManager::open(
            dir.join("vectorstore.index"),
            Arc::new(KeywordEmbedder::new(256)),
        ));
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(StubReportGenerator::returning(
                "Suspect wore a red jacket near ATM #4 at 22:10.",
            )),
            index,
        );
        let chat = Arc::new(ScriptedChatModel::replying(replies));
        let conversation = Mutex::new(orchestrator.conversation(chat));
        let app = router(
            Arc::new(AppState {
                orchestrator,
                conversation,
                output_file: "Crime_Report.pdf".to_string(),
            }),
            1024 * 1024,
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_ask_without_index_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_app(dir.path(), &[]).await;

        let response = reqwest::Client::new()
            .post(format!("{}/ask", base))
            .json(&serde_json::json!({ "question": "Who was there?" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_report_then_ask() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_app(dir.path(), &["A red jacket."]).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/report?filename=cctv.mp4", base))
            .body(vec![0u8; 32])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["passages_indexed"], 1);

        let response = client
            .post(format!("{}/ask", base))
            .json(&serde_json::json!({ "question": "What did the suspect wear?" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["answer"], "A red jacket.");
        assert_eq!(body["sources"].as_array().unwrap().len(), 1);

        let body: serde_json::Value = client
            .get(format!("{}/transcript", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["turns"].as_array().unwrap().len(), 2);
        assert_eq!(body["turns"][0]["role"], "user");

        let response = client.delete(format!("{}/transcript", base)).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

        let body: serde_json::Value = client
            .get(format!("{}/index", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["loaded"], true);
        assert_eq!(body["passages"], 1);
    }

    #[tokio::test]
    async fn test_report_as_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_app(dir.path(), &[]).await;

        let response = reqwest::Client::new()
            .post(format!("{}/report?filename=cctv.MOV&format=pdf", base))
            .body(vec![0u8; 32])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/pdf");
        let bytes = response.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_report_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_app(dir.path(), &[]).await;

        let response = reqwest::Client::new()
            .post(format!("{}/report?filename=notes.txt", base))
            .body("hello")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stage_upload_keeps_bytes_and_extension() {
        let upload = stage_upload(Bytes::from_static(b"fake mp4 bytes"), "mp4".to_string())
            .await
            .unwrap();

        let path = upload.path().to_path_buf();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"fake mp4 bytes");

        drop(upload);
        assert!(!path.exists());
    }
}
