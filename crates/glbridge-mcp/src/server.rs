//! MCP server implementation.
//!
//! The server handles the MCP protocol lifecycle:
//! 1. Initialize - exchange capabilities
//! 2. Handle tool calls - each call runs on its own task and can be
//!    cancelled by the client
//! 3. Shutdown - at EOF, stop reading and flush outstanding responses

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::protocol::{
    CancelledParams, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, RequestId, ToolCallParams, ToolDefinition, ToolsListResult,
};
use crate::registry::{ToolContext, ToolRegistry};
use crate::transport::{IncomingMessage, StdioTransport};

type InFlight = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// MCP server for glbridge.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    context: Arc<ToolContext>,
    definitions: Vec<ToolDefinition>,
    initialized: bool,
    in_flight: InFlight,
}

impl McpServer {
    /// Create a server. Fails if any tool has an invalid argument descriptor.
    pub fn new(registry: ToolRegistry, context: ToolContext) -> glbridge_core::Result<Self> {
        let definitions = registry.definitions()?;
        Ok(Self {
            registry: Arc::new(registry),
            context: Arc::new(context),
            definitions,
            initialized: false,
            in_flight: Arc::default(),
        })
    }

    /// Run the MCP server on stdin/stdout.
    pub async fn run(&mut self) -> glbridge_core::Result<()> {
        let mut transport = StdioTransport::stdio();
        self.serve(&mut transport).await
    }

    /// Serve one client until its input ends.
    pub async fn serve<R, W>(&mut self, transport: &mut StdioTransport<R, W>) -> glbridge_core::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            "Starting MCP server with {} tools",
            self.definitions.len()
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        loop {
            tokio::select! {
                message = transport.read_message() => match message {
                    Ok(Some(msg)) => {
                        if let Some(resp) = self.handle_message(msg, &tx) {
                            if let Err(e) = transport.write_response(&resp).await {
                                tracing::error!("Failed to write response: {}", e);
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        tracing::info!("EOF received, shutting down");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Transport error: {}", e);
                        let error_resp = JsonRpcResponse::error(
                            RequestId::Null,
                            JsonRpcError::parse_error(&e.to_string()),
                        );
                        if let Err(e) = transport.write_response(&error_resp).await {
                            tracing::error!("Failed to write response: {}", e);
                            break;
                        }
                    }
                },
                Some(resp) = rx.recv() => {
                    if let Err(e) = transport.write_response(&resp).await {
                        tracing::error!("Failed to write response: {}", e);
                        break;
                    }
                }
            }
        }

        // Calls still running report back before we return
        drop(tx);
        while let Some(resp) = rx.recv().await {
            if let Err(e) = transport.write_response(&resp).await {
                tracing::error!("Failed to write response: {}", e);
                break;
            }
        }

        tracing::info!("MCP server stopped");
        Ok(())
    }

    fn handle_message(
        &mut self,
        msg: IncomingMessage,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
    ) -> Option<JsonRpcResponse> {
        match msg {
            IncomingMessage::Request(req) => self.handle_request(req, tx),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif.method, notif.params);
                None
            }
        }
    }

    /// Handle a JSON-RPC request. Tool calls answer through `tx` later.
    fn handle_request(
        &mut self,
        req: JsonRpcRequest,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
    ) -> Option<JsonRpcResponse> {
        tracing::debug!("Handling request: {} (id: {:?})", req.method, req.id);

        match req.method.as_str() {
            "initialize" => Some(self.handle_initialize(req.id, req.params)),
            "tools/list" => Some(self.handle_tools_list(req.id)),
            "tools/call" => self.handle_tools_call(req.id, req.params, tx),
            "ping" => Some(JsonRpcResponse::success(req.id, serde_json::json!({}))),
            method => {
                tracing::warn!("Unknown method: {}", method);
                Some(JsonRpcResponse::error(
                    req.id,
                    JsonRpcError::method_not_found(method),
                ))
            }
        }
    }

    fn handle_notification(&mut self, method: &str, params: Option<Value>) {
        match method {
            "initialized" | "notifications/initialized" => {
                tracing::info!("Client initialized");
            }
            "notifications/cancelled" => {
                let Some(params) = params else {
                    tracing::warn!("Cancellation without params");
                    return;
                };
                match serde_json::from_value::<CancelledParams>(params) {
                    Ok(cancelled) => self.cancel(&cancelled),
                    Err(e) => tracing::warn!("Failed to parse cancellation: {}", e),
                }
            }
            _ => {
                tracing::debug!("Ignoring notification: {}", method);
            }
        }
    }

    fn cancel(&self, cancelled: &CancelledParams) {
        match lock(&self.in_flight).remove(&cancelled.request_id) {
            Some(token) => {
                tracing::info!(
                    "Cancelling request {:?}: {}",
                    cancelled.request_id,
                    cancelled.reason.as_deref().unwrap_or("no reason given")
                );
                token.cancel();
            }
            None => tracing::debug!(
                "Cancellation for unknown or finished request {:?}",
                cancelled.request_id
            ),
        }
    }

    fn handle_initialize(&mut self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        if self.initialized {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Server already initialized"),
            );
        }

        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init_params) => {
                    tracing::info!(
                        "Client: {} v{} (protocol: {})",
                        init_params.client_info.name,
                        init_params.client_info.version,
                        init_params.protocol_version
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to parse initialize params: {}", e);
                }
            }
        }

        self.initialized = true;

        let result = InitializeResult::glbridge();
        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.definitions.clone(),
        };
        JsonRpcResponse::from_result(id, &result)
    }

    /// Start a tool call on its own task.
    fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<Value>,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
    ) -> Option<JsonRpcResponse> {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return Some(JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(&e.to_string()),
                    ));
                }
            },
            None => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing params"),
                ));
            }
        };

        tracing::info!("Calling tool: {}", params.name);

        let token = CancellationToken::new();
        lock(&self.in_flight).insert(id.clone(), token.clone());

        let registry = self.registry.clone();
        let context = self.context.clone();
        let in_flight = self.in_flight.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let call = AssertUnwindSafe(registry.call(&params.name, context, params.arguments))
                .catch_unwind();

            let response = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("Tool call {} cancelled", params.name);
                    None
                }
                outcome = call => Some(match outcome {
                    Ok(Ok(result)) => JsonRpcResponse::from_result(id.clone(), &result),
                    Ok(Err(e)) if e.is_invalid_params() => {
                        JsonRpcResponse::error(id.clone(), JsonRpcError::invalid_params(&e.to_string()))
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("Tool {} failed: {}", params.name, e);
                        JsonRpcResponse::error(id.clone(), JsonRpcError::internal_error(&e.to_string()))
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::error!("Tool {} panicked: {}", params.name, message);
                        JsonRpcResponse::error(
                            id.clone(),
                            JsonRpcError::internal_error(&format!("tool panicked: {}", message)),
                        )
                    }
                }),
            };

            lock(&in_flight).remove(&id);
            if let Some(response) = response {
                // The receiver only goes away once the server has stopped
                let _ = tx.send(response);
            }
        });

        None
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
