//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    config::CONFIG,
    mcp::{
        format::{SettingsSnapshot, health_payload, json_resource_contents, serialize_json},
        handlers::{metrics::handle_metrics, summarize::handle_summarize},
        registry, schemas,
    },
    processing::{SummarizationApi, SummarizationService},
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
        RawResource, ReadResourceRequestParam, ReadResourceResult, Resource, ServerCapabilities,
        ServerInfo, Tool, ToolAnnotations,
    },
};

const HEALTH_URI: &str = "mcp://health";
const SETTINGS_URI: &str = "mcp://settings";
const USAGE_URI: &str = "mcp://usage";

/// MCP server implementation exposing Legal Digest operations.
#[derive(Clone)]
pub struct LegalDigestMcpServer {
    service: Arc<SummarizationService>,
    registry: Arc<registry::Registry>,
}

impl LegalDigestMcpServer {
    /// Create a new MCP server using the supplied summarization service.
    pub fn new(service: Arc<SummarizationService>) -> Self {
        let mut registry = registry::Registry::new();
        registry.register_resource(HEALTH_URI, resource_health);
        registry.register_resource(SETTINGS_URI, resource_settings);
        registry.register_resource(USAGE_URI, resource_usage);

        registry.register_tool("summarize", tool_summarize);
        registry.register_tool("metrics", tool_metrics);

        Self {
            service,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: Cow::Borrowed("summarize"),
                title: Some("Summarize Document".to_string()),
                description: Some(Cow::Borrowed(
                    "Condense a long document (contract, policy, filing) into a short summary instead of pasting it into chats.",
                )),
                input_schema: Arc::new(schemas::summarize_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Summarize Document")
                        .read_only(true)
                        .idempotent(false)
                        .open_world(false),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("metrics"),
                title: Some("Metrics Snapshot".to_string()),
                description: Some(Cow::Borrowed(
                    "Check summarization volume, chunk failures, and memory rejections at a glance.",
                )),
                input_schema: Arc::new(schemas::empty_object_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Metrics Snapshot")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut health = RawResource::new(HEALTH_URI, "health");
        health.description = Some("Summarization engine readiness and memory headroom".into());

        let mut settings = RawResource::new(SETTINGS_URI, "settings");
        settings.description = Some("Effective chunking, batching, and generation settings".into());

        let mut usage = RawResource::new(USAGE_URI, "usage");
        usage.description =
            Some("Recommended tool flow: check health, then summarize; read metrics after.".into());

        vec![
            health.no_annotation(),
            settings.no_annotation(),
            usage.no_annotation(),
        ]
    }
}

fn resource_health(
    server: &LegalDigestMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let service = server.service.clone();
    Box::pin(async move {
        let model = CONFIG
            .get()
            .map(|config| config.summarization_model.as_str());
        let body = health_payload(
            service.engine_name(),
            service.engine_status(),
            model,
            service.memory_reading(),
            service.settings().memory_threshold,
        );
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(HEALTH_URI, body)],
        })
    })
}

fn resource_settings(
    server: &LegalDigestMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let service = server.service.clone();
    Box::pin(async move {
        let payload = SettingsSnapshot::from(service.settings());
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                SETTINGS_URI,
                serialize_json(&payload, SETTINGS_URI),
            )],
        })
    })
}

fn resource_usage(
    _server: &LegalDigestMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        let usage = serde_json::json!({
            "title": "Legal Digest MCP Usage",
            "policy": [
                "Send the full document text to `summarize`; do not pre-chunk it.",
                "Read mcp://health first when a summarize call fails with a memory or engine error.",
                "Use max_length/min_length to tighten or loosen each chunk summary.",
            ],
            "flows": [
                {
                    "name": "Summarize",
                    "steps": [
                        "readResource(mcp://health)",
                        "summarize({ text, max_length?, min_length? })",
                        "metrics()"
                    ]
                }
            ]
        });
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                USAGE_URI,
                serialize_json(&usage, USAGE_URI),
            )],
        })
    })
}

fn tool_summarize(
    server: &LegalDigestMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_summarize(&service, request.arguments).await })
}

fn tool_metrics(
    server: &LegalDigestMcpServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_metrics(&service).await })
}

impl ServerHandler for LegalDigestMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "legal-digest".to_string();
        implementation.title = Some("Legal Digest MCP".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to condense long legal documents into short summaries. Pass the full text to `summarize`; the server chunks it, summarizes the chunks in memory-guarded batches, and merges the results.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    #[allow(clippy::manual_async_fn)]
    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.resources.get(request.uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
