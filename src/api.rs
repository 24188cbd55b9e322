//! HTTP surface for Legal Digest.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` – Liveness banner with the summarization engine status (`ready`, `initializing`,
//!   `unavailable`).
//! - `POST /api/summarize` – Multipart upload (field `document`, PDF only). Extracts the text
//!   layer and returns `{ originalText, summary, jobId, documentDigest, chunkCount, ... }`.
//! - `POST /api/summarize/text` – Same pipeline for raw text posted as JSON.
//! - `POST /api/summarize/stream` – Raw text answered as Server-Sent Events: one `progress`
//!   event per batch, then a single `summary` or `error` event. Closing the connection cancels
//!   the job.
//! - `GET /metrics` – Job and chunk counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The HTTP surface shares the same summarization service with the MCP server and the CLI, so
//! behavior is identical across interfaces.

use crate::extraction::{extract_pdf_text, is_pdf};
use crate::metrics::MetricsSnapshot;
use crate::processing::{
    JobControls, ProgressEvent, SummarizationApi, SummarizeError, SummarizeOptions,
    SummaryOutcome,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const UPLOAD_FIELD: &str = "document";

/// Build the HTTP router exposing the summarization API surface.
///
/// `upload_limit` caps the multipart body accepted by `POST /api/summarize`.
pub fn create_router<S>(service: Arc<S>, upload_limit: usize) -> Router
where
    S: SummarizationApi + 'static,
{
    Router::new()
        .route("/", get(root::<S>))
        .route(
            "/api/summarize",
            post(summarize_document::<S>).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/summarize/text", post(summarize_text::<S>))
        .route("/api/summarize/stream", post(summarize_stream::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Response body for `GET /`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RootResponse {
    message: &'static str,
    model_status: &'static str,
}

/// Report that the API is up together with the engine status.
async fn root<S>(State(service): State<Arc<S>>) -> Json<RootResponse>
where
    S: SummarizationApi,
{
    Json(RootResponse {
        message: "Legal Document Summarizer API is running",
        model_status: service.engine_status().label(),
    })
}

/// Request body for the text endpoints.
#[derive(Deserialize)]
struct SummarizeTextRequest {
    /// Raw document text.
    text: String,
    /// Optional per-chunk maximum summary length.
    #[serde(default)]
    max_length: Option<usize>,
    /// Optional per-chunk minimum summary length.
    #[serde(default)]
    min_length: Option<usize>,
}

impl SummarizeTextRequest {
    fn into_parts(self) -> (String, SummarizeOptions) {
        (
            self.text,
            SummarizeOptions {
                max_length: self.max_length,
                min_length: self.min_length,
            },
        )
    }
}

/// Success response shared by the summarize endpoints.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    original_text: Option<String>,
    summary: String,
    job_id: Uuid,
    document_digest: String,
    chunk_count: usize,
    batch_count: usize,
    failed_chunks: usize,
    elapsed_seconds: f64,
    completed_at: String,
}

impl SummarizeResponse {
    fn new(outcome: SummaryOutcome, original_text: Option<String>) -> Self {
        Self {
            original_text,
            summary: outcome.summary,
            job_id: outcome.job_id,
            document_digest: outcome.document_digest,
            chunk_count: outcome.chunk_count,
            batch_count: outcome.batch_count,
            failed_chunks: outcome.failed_chunks,
            elapsed_seconds: outcome.elapsed_seconds,
            completed_at: outcome.completed_at,
        }
    }
}

struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// Summarize an uploaded PDF.
async fn summarize_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: SummarizationApi,
{
    let Some(upload) = read_upload(&mut multipart).await? else {
        return Err(AppError::bad_request(
            "No file uploaded",
            format!("multipart field '{UPLOAD_FIELD}' is missing"),
        ));
    };
    if !is_pdf(upload.filename.as_deref(), upload.content_type.as_deref()) {
        return Err(AppError::bad_request(
            "Only PDF files are allowed",
            format!(
                "received {}",
                upload
                    .content_type
                    .as_deref()
                    .or(upload.filename.as_deref())
                    .unwrap_or("unnamed upload")
            ),
        ));
    }

    tracing::info!(
        filename = upload.filename.as_deref().unwrap_or("unnamed"),
        bytes = upload.bytes.len(),
        "Processing uploaded document"
    );
    let text = extract_pdf_text(upload.bytes)
        .await
        .map_err(SummarizeError::from)?;
    let outcome = service
        .summarize_text(&text, SummarizeOptions::default(), JobControls::default())
        .await?;
    tracing::info!(
        job = %outcome.job_id,
        chunks = outcome.chunk_count,
        failed_chunks = outcome.failed_chunks,
        "Summary generated successfully"
    );
    Ok(Json(SummarizeResponse::new(outcome, Some(text))))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?.to_vec();
        return Ok(Some(Upload {
            filename,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

/// Summarize raw text posted as JSON.
async fn summarize_text<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SummarizeTextRequest>,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: SummarizationApi,
{
    let (text, options) = request.into_parts();
    let outcome = service
        .summarize_text(&text, options, JobControls::default())
        .await?;
    tracing::info!(
        job = %outcome.job_id,
        chunks = outcome.chunk_count,
        failed_chunks = outcome.failed_chunks,
        "Text summary generated"
    );
    Ok(Json(SummarizeResponse::new(outcome, Some(text))))
}

/// Summarize raw text while streaming batch progress as Server-Sent Events.
async fn summarize_stream<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SummarizeTextRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: SummarizationApi + 'static,
{
    let (text, options) = request.into_parts();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let cancel = CancellationToken::new();
    let controls = JobControls {
        progress: Some(Arc::new(progress_tx)),
        cancel: cancel.clone(),
    };
    let job =
        tokio::spawn(async move { service.summarize_text(&text, options, controls).await });
    let cancel_on_disconnect = cancel.drop_guard();

    let stream = async_stream::stream! {
        let _cancel_on_disconnect = cancel_on_disconnect;

        while let Some(progress) = progress_rx.recv().await {
            let payload = json!({
                "processed": progress.processed,
                "total": progress.total,
                "percent": progress.percent().round(),
                "elapsedSeconds": progress.elapsed_seconds,
            });
            yield Ok::<_, Infallible>(Event::default().event("progress").data(payload.to_string()));
        }

        let event = match job.await {
            Ok(Ok(outcome)) => {
                let body = serde_json::to_string(&SummarizeResponse::new(outcome, None))
                    .unwrap_or_default();
                Event::default().event("summary").data(body)
            }
            Ok(Err(error)) => AppError::from(error).into_event(),
            Err(join_error) => {
                tracing::error!(error = %join_error, "Streaming summarization task failed");
                AppError::internal(join_error.to_string()).into_event()
            }
        };
        yield Ok(event);
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Return the summarization counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: SummarizationApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize_document",
                method: "POST",
                path: "/api/summarize",
                description: "Upload a PDF as multipart field 'document'. Response returns { \"originalText\": string, \"summary\": string, \"chunkCount\": number, ... }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summarize_text",
                method: "POST",
                path: "/api/summarize/text",
                description: "Summarize raw text. Optional max_length/min_length bound each chunk summary.",
                request_example: Some(json!({
                    "text": "This Lease Agreement is made between ...",
                    "max_length": 100,
                    "min_length": 20
                })),
            },
            CommandDescriptor {
                name: "summarize_stream",
                method: "POST",
                path: "/api/summarize/stream",
                description: "Summarize raw text and stream 'progress' events followed by a 'summary' or 'error' event (text/event-stream).",
                request_example: Some(json!({
                    "text": "This Lease Agreement is made between ..."
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization job and chunk counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// Error body returned by every endpoint: `{ "error": <message>, "details": <cause> }`.
struct AppError {
    status: StatusCode,
    error: String,
    details: String,
}

impl AppError {
    fn bad_request(error: &str, details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.to_string(),
            details: details.into(),
        }
    }

    fn internal(details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "Error processing the document. Please try again.".to_string(),
            details: details.into(),
        }
    }

    fn body(&self) -> serde_json::Value {
        json!({ "error": self.error, "details": self.details })
    }

    fn into_event(self) -> Event {
        Event::default().event("error").data(self.body().to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

impl From<SummarizeError> for AppError {
    fn from(inner: SummarizeError) -> Self {
        let (status, error) = match &inner {
            SummarizeError::EmptyInput => (
                StatusCode::BAD_REQUEST,
                "No text could be extracted from the document",
            ),
            SummarizeError::Extraction(_) => {
                (StatusCode::BAD_REQUEST, "Could not read the uploaded document")
            }
            SummarizeError::NoSummaryGenerated => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Failed to generate summary. Please try again with a different document.",
            ),
            SummarizeError::MemoryPressure { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server is under heavy load. Please try again later.",
            ),
            SummarizeError::EngineUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Failed to initialize summarization model. Please try again later.",
            ),
            SummarizeError::Cancelled => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing the document. Please try again.",
            ),
        };
        Self {
            status,
            error: error.to_string(),
            details: inner.to_string(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self {
            status: inner.status(),
            error: "Invalid upload".to_string(),
            details: inner.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::inference::EngineStatus;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        JobControls, MemoryReading, PipelineSettings, ProgressEvent, ProgressSink,
        SummarizationApi, SummarizeError, SummarizeOptions, SummaryOutcome,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{Mutex, Notify};
    use tower::ServiceExt;
    use uuid::Uuid;

    const UPLOAD_LIMIT: usize = 1024 * 1024;

    #[derive(Clone, Debug)]
    struct SummarizeCall {
        text: String,
        max_length: Option<usize>,
        min_length: Option<usize>,
    }

    struct StubSummarizationService {
        calls: Mutex<Vec<SummarizeCall>>,
        fail_with: Option<fn() -> SummarizeError>,
        wait_for_cancel: bool,
        cancelled: Notify,
        settings: PipelineSettings,
    }

    impl StubSummarizationService {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_with: None,
                wait_for_cancel: false,
                cancelled: Notify::new(),
                settings: PipelineSettings::default(),
            }
        }

        fn waiting_for_cancel() -> Self {
            Self {
                wait_for_cancel: true,
                ..Self::new()
            }
        }

        fn failing(error: fn() -> SummarizeError) -> Self {
            Self {
                fail_with: Some(error),
                ..Self::new()
            }
        }

        async fn recorded_calls(&self) -> Vec<SummarizeCall> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl SummarizationApi for StubSummarizationService {
        async fn summarize_text(
            &self,
            text: &str,
            options: SummarizeOptions,
            controls: JobControls,
        ) -> Result<SummaryOutcome, SummarizeError> {
            self.calls.lock().await.push(SummarizeCall {
                text: text.to_string(),
                max_length: options.max_length,
                min_length: options.min_length,
            });
            if let Some(error) = self.fail_with {
                return Err(error());
            }
            if self.wait_for_cancel {
                controls.cancel.cancelled().await;
                self.cancelled.notify_one();
                return Err(SummarizeError::Cancelled);
            }
            if let Some(progress) = &controls.progress {
                for processed in [4, 6] {
                    progress.report(ProgressEvent {
                        processed,
                        total: 6,
                        elapsed_seconds: 0.5,
                    });
                }
            }
            Ok(SummaryOutcome {
                job_id: Uuid::nil(),
                document_digest: "ab".repeat(32),
                summary: format!("Summary of: {text}"),
                chunk_count: 6,
                batch_count: 2,
                failed_chunks: 1,
                elapsed_seconds: 1.25,
                completed_at: "2024-01-01T00:00:00Z".into(),
            })
        }

        fn engine_status(&self) -> EngineStatus {
            EngineStatus::Ready
        }

        fn engine_name(&self) -> &str {
            "stub"
        }

        fn settings(&self) -> &PipelineSettings {
            &self.settings
        }

        fn memory_reading(&self) -> Option<MemoryReading> {
            None
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                jobs_completed: 3,
                jobs_failed: 1,
                chunks_processed: 18,
                chunks_failed: 2,
                memory_rejections: 0,
                last_chunk_count: Some(6),
            }
        }
    }

    fn json_request(uri: &str, payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    fn multipart_request(field: &str, filename: &str, content_type: &str, body: &[u8]) -> Request<Body> {
        let boundary = "legal-digest-boundary";
        let mut payload = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        payload.extend_from_slice(body);
        payload.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/api/summarize")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(payload))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn commands_catalog_exposes_summarize_endpoints() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let text = commands
            .iter()
            .find(|cmd| cmd.name == "summarize_text")
            .expect("summarize_text command present");

        assert_eq!(text.method, "POST");
        assert_eq!(text.path, "/api/summarize/text");
        assert!(commands.iter().any(|cmd| cmd.path == "/api/summarize"));
        assert!(commands.len() >= 3);
    }

    #[tokio::test]
    async fn root_reports_model_status() {
        let app = create_router(Arc::new(StubSummarizationService::new()), UPLOAD_LIMIT);
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["modelStatus"], "ready");
        assert_eq!(json["message"], "Legal Document Summarizer API is running");
    }

    #[tokio::test]
    async fn text_route_returns_summary_and_forwards_lengths() {
        let service = Arc::new(StubSummarizationService::new());
        let app = create_router(service.clone(), UPLOAD_LIMIT);

        let response = app
            .oneshot(json_request(
                "/api/summarize/text",
                json!({ "text": "The lessee shall pay rent.", "max_length": 60, "min_length": 10 }),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["summary"], "Summary of: The lessee shall pay rent.");
        assert_eq!(json["originalText"], "The lessee shall pay rent.");
        assert_eq!(json["chunkCount"], 6);
        assert_eq!(json["failedChunks"], 1);

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].max_length, Some(60));
        assert_eq!(calls[0].min_length, Some(10));
    }

    #[tokio::test]
    async fn job_errors_map_to_status_codes() {
        let cases: [(fn() -> SummarizeError, StatusCode); 4] = [
            (|| SummarizeError::EmptyInput, StatusCode::BAD_REQUEST),
            (
                || SummarizeError::NoSummaryGenerated,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                || SummarizeError::MemoryPressure {
                    utilization: 0.93,
                    threshold: 0.8,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                || SummarizeError::EngineUnavailable("model missing".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, expected) in cases {
            let app = create_router(
                Arc::new(StubSummarizationService::failing(error)),
                UPLOAD_LIMIT,
            );
            let response = app
                .oneshot(json_request("/api/summarize/text", json!({ "text": "x" })))
                .await
                .expect("router response");

            assert_eq!(response.status(), expected);
            let json = json_body(response).await;
            assert!(json["error"].is_string());
            assert_eq!(json["details"], error().to_string());
        }
    }

    #[tokio::test]
    async fn upload_requires_document_field() {
        let service = Arc::new(StubSummarizationService::new());
        let app = create_router(service.clone(), UPLOAD_LIMIT);

        let response = app
            .oneshot(multipart_request("attachment", "lease.pdf", "application/pdf", b"%PDF"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file uploaded");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn upload_rejects_non_pdf_files() {
        let service = Arc::new(StubSummarizationService::new());
        let app = create_router(service.clone(), UPLOAD_LIMIT);

        let response = app
            .oneshot(multipart_request("document", "notes.txt", "text/plain", b"hello"))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Only PDF files are allowed");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn unreadable_pdf_is_a_bad_request() {
        let service = Arc::new(StubSummarizationService::new());
        let app = create_router(service.clone(), UPLOAD_LIMIT);

        let response = app
            .oneshot(multipart_request(
                "document",
                "lease.pdf",
                "application/pdf",
                b"definitely not a pdf",
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn stream_route_emits_progress_then_summary() {
        let app = create_router(Arc::new(StubSummarizationService::new()), UPLOAD_LIMIT);

        let response = app
            .oneshot(json_request(
                "/api/summarize/stream",
                json!({ "text": "The lessee shall pay rent." }),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let body = String::from_utf8(body.to_vec()).expect("utf8");

        let first_progress = body.find("event: progress").expect("progress event");
        let summary = body.find("event: summary").expect("summary event");
        assert!(first_progress < summary);
        assert_eq!(body.matches("event: progress").count(), 2);
        assert!(body.contains("Summary of: The lessee shall pay rent."));
        assert!(!body.contains("event: error"));
    }

    #[tokio::test]
    async fn stream_route_reports_job_errors_as_events() {
        let app = create_router(
            Arc::new(StubSummarizationService::failing(|| {
                SummarizeError::NoSummaryGenerated
            })),
            UPLOAD_LIMIT,
        );

        let response = app
            .oneshot(json_request("/api/summarize/stream", json!({ "text": "x" })))
            .await
            .expect("router response");
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let body = String::from_utf8(body.to_vec()).expect("utf8");

        assert!(body.contains("event: error"));
        assert!(!body.contains("event: summary"));
    }

    #[tokio::test]
    async fn dropping_unread_stream_cancels_the_job() {
        let service = Arc::new(StubSummarizationService::waiting_for_cancel());
        let app = create_router(service.clone(), UPLOAD_LIMIT);

        let response = app
            .oneshot(json_request(
                "/api/summarize/stream",
                json!({ "text": "The lessee shall pay rent." }),
            ))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        drop(response);

        tokio::time::timeout(Duration::from_secs(5), service.cancelled.notified())
            .await
            .expect("job observes cancellation without the body being polled");
    }

    #[tokio::test]
    async fn metrics_route_returns_snapshot() {
        let app = create_router(Arc::new(StubSummarizationService::new()), UPLOAD_LIMIT);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["jobs_completed"], 3);
        assert_eq!(json["last_chunk_count"], 6);
    }
}
