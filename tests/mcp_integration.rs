use std::sync::Arc;

use httpmock::{Method::POST, Mock, MockServer};
use legal_digest::{
    config, inference, logging, mcp::LegalDigestMcpServer, processing::SummarizationService,
};
use rmcp::{
    handler::client::ClientHandler,
    model::{
        self, CallToolRequestParam, ClientInfo, PaginatedRequestParam, ReadResourceRequestParam,
        ResourceContents,
    },
    service::{RoleClient, RoleServer, RunningService, Service, serve_directly},
    transport::async_rw::AsyncRwTransport,
};
use serde_json::{Value, json};
use tokio::{io::split, sync::OnceCell};

static INIT: OnceCell<()> = OnceCell::const_new();
static MOCK_SERVER: OnceCell<&'static MockServer> = OnceCell::const_new();
static MOCK_HANDLES: OnceCell<Vec<Mock<'static>>> = OnceCell::const_new();

const LEASE_TEXT: &str = "The tenant shall pay rent on the first day of each month. \
    The landlord shall repair the roof within thirty days of notice.";

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

#[derive(Clone, Default)]
struct DummyClientHandler;

impl ClientHandler for DummyClientHandler {
    fn get_info(&self) -> ClientInfo {
        ClientInfo::default()
    }
}

struct TestHarness {
    service: RunningService<RoleClient, DummyClientHandler>,
    server: RunningService<RoleServer, LegalDigestMcpServer>,
}

impl TestHarness {
    async fn new() -> Self {
        INIT.get_or_init(|| async {
            let mock_server_owned = MockServer::start_async().await;
            let mock_server = Box::leak(Box::new(mock_server_owned));
            let base_url = mock_server.base_url();

            set_env("SUMMARIZATION_PROVIDER", "ollama");
            set_env("SUMMARIZATION_MODEL", "llama-test");
            set_env("OLLAMA_URL", &base_url);
            set_env("TEXT_CHUNK_MAX_CHARS", "60");
            set_env("SUMMARY_BATCH_SIZE", "2");
            set_env("INTER_BATCH_DELAY_MS", "0");
            set_env("MEMORY_THRESHOLD", "1.0");

            MOCK_SERVER.set(mock_server).ok();
            let server = MOCK_SERVER.get().expect("mock server initialized");

            let mocks: Vec<Mock<'static>> = vec![
                server
                    .mock_async(|when, then| {
                        when.method(POST).path("/api/generate");
                        then.status(200).json_body(json!({
                            "response": "Rent is due monthly.",
                            "done": true
                        }));
                    })
                    .await,
            ];
            MOCK_HANDLES.set(mocks).ok();

            config::init_config();
            logging::init_tracing();
        })
        .await;

        let config = config::get_config();
        let client = inference::build_inference_client(config).expect("inference client");
        let summarization = Arc::new(SummarizationService::new(
            client,
            config.pipeline_settings(),
        ));
        let server = LegalDigestMcpServer::new(summarization);

        let (client_stream, server_stream) = tokio::io::duplex(16 * 1024);
        let (client_read, client_write) = split(client_stream);
        let (server_read, server_write) = split(server_stream);

        let client_transport = AsyncRwTransport::new_client(client_read, client_write);
        let server_transport = AsyncRwTransport::new_server(server_read, server_write);

        let server_info = server.get_info();
        let client_handler = DummyClientHandler;
        let client_info = ClientHandler::get_info(&client_handler);

        let server =
            serve_directly::<RoleServer, _, _, _, _>(server, server_transport, Some(client_info));
        let service = serve_directly::<RoleClient, _, _, _, _>(
            client_handler,
            client_transport,
            Some(server_info),
        );

        Self { service, server }
    }

    async fn shutdown(self) {
        let Self { service, server } = self;
        let _ = service.cancel().await;
        let _ = server.cancel().await;
    }
}

fn arguments(value: Value) -> Option<model::JsonObject> {
    value.as_object().cloned()
}

#[tokio::test]
async fn initialize_and_list_tools() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let info = service
        .peer_info()
        .expect("server info should be initialized");
    assert_eq!(info.server_info.name, "legal-digest");
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.resources.is_some());

    let tools_result = service
        .list_tools(Some(PaginatedRequestParam { cursor: None }))
        .await
        .expect("list_tools");
    let names: Vec<_> = tools_result
        .tools
        .iter()
        .map(|tool| tool.name.as_ref())
        .collect();
    assert_eq!(names, vec!["summarize", "metrics"]);

    let resources = service
        .list_resources(Some(PaginatedRequestParam { cursor: None }))
        .await
        .expect("list_resources");
    let uris: Vec<_> = resources
        .resources
        .iter()
        .map(|resource| resource.uri.as_str())
        .collect();
    assert!(uris.contains(&"mcp://health"));
    assert!(uris.contains(&"mcp://settings"));
    assert!(uris.contains(&"mcp://usage"));

    harness.shutdown().await;
}

#[tokio::test]
async fn summarize_tool_runs_the_pipeline() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let response = service
        .call_tool(CallToolRequestParam {
            name: "summarize".into(),
            arguments: arguments(json!({ "text": LEASE_TEXT, "max_length": 40 })),
        })
        .await
        .expect("summarize tool call");

    assert_eq!(response.is_error, Some(false));
    let payload = response.structured_content.expect("structured payload");
    assert_eq!(payload["status"], "ok");
    let chunk_count = payload["chunkCount"].as_u64().expect("chunk count");
    assert!(chunk_count >= 2, "lease text should span several chunks");
    assert_eq!(payload["failedChunks"], 0);
    assert_eq!(
        payload["documentDigest"].as_str().map(str::len),
        Some(64),
        "digest is a hex sha256"
    );
    let summary = payload["summary"].as_str().expect("summary text");
    assert_eq!(
        summary.matches("Rent is due monthly.").count() as u64,
        chunk_count
    );

    let metrics_response = service
        .call_tool(CallToolRequestParam {
            name: "metrics".into(),
            arguments: arguments(json!({})),
        })
        .await
        .expect("metrics tool call");
    assert_eq!(metrics_response.is_error, Some(false));
    let metrics_payload = metrics_response
        .structured_content
        .expect("structured metrics payload");
    assert_eq!(metrics_payload["jobsCompleted"], 1);
    assert_eq!(metrics_payload["lastChunkCount"].as_u64(), Some(chunk_count));

    harness.shutdown().await;
}

#[tokio::test]
async fn settings_resource_reflects_environment() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let result = service
        .read_resource(ReadResourceRequestParam {
            uri: "mcp://settings".into(),
        })
        .await
        .expect("read settings");

    let text = match result.contents.first() {
        Some(ResourceContents::TextResourceContents { text, .. }) => text.clone(),
        other => panic!("expected text contents, got {other:?}"),
    };
    let value: Value = serde_json::from_str(&text).expect("settings JSON");
    assert_eq!(value["pipeline"]["max_chunk_chars"], 60);
    assert_eq!(value["pipeline"]["batch_size"], 2);
    assert_eq!(value["pipeline"]["inter_batch_delay_ms"], 0);

    harness.shutdown().await;
}

#[tokio::test]
async fn empty_text_returns_invalid_params() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let err = service
        .call_tool(CallToolRequestParam {
            name: "summarize".into(),
            arguments: arguments(json!({ "text": "   " })),
        })
        .await
        .expect_err("summarize should fail");

    match err {
        rmcp::service::ServiceError::McpError(data) => {
            assert_eq!(data.code, model::ErrorCode::INVALID_PARAMS);
        }
        other => panic!("expected MCP error, got {other:?}"),
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn unknown_resource_is_rejected() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let err = service
        .read_resource(ReadResourceRequestParam {
            uri: "mcp://collections".into(),
        })
        .await
        .expect_err("unknown resource");

    match err {
        rmcp::service::ServiceError::McpError(data) => {
            assert_eq!(data.code, model::ErrorCode::INVALID_PARAMS);
        }
        other => panic!("expected MCP error, got {other:?}"),
    }

    harness.shutdown().await;
}
