//! MCP server loop: reads requests from the transport, dispatches them and
//! writes one response per request. Notifications are never answered.

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncWrite};

use meteo_core::WeatherService;

use crate::protocol::{
    INTERNAL_ERROR, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, RpcError, RpcId, RpcRequest,
    RpcResponse,
};
use crate::tools;
use crate::transport::{JsonlTransport, TransportError};

pub const SERVER_NAME: &str = "openmeteo-weather-mcp";

/// Protocol revisions this server can speak, newest first.
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

pub struct McpServer<R, W> {
    transport: JsonlTransport<R, W>,
    service: WeatherService,
}

impl<R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin> McpServer<R, W> {
    pub fn new(reader: R, writer: W, service: WeatherService) -> Self {
        Self { transport: JsonlTransport::new(reader, writer), service }
    }

    /// Run until EOF or a fatal I/O error. Malformed lines are answered with a
    /// parse error and do not stop the loop.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        loop {
            let message = match self.transport.read_message().await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::info!("Input closed, shutting down");
                    return Ok(());
                }
                Err(TransportError::Parse(e)) => {
                    let error = RpcError::new(PARSE_ERROR, format!("Parse error: {e}"));
                    let response = RpcResponse::error(None, error);
                    self.transport.write_response(&response).await?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(response) = self.handle_message(message).await {
                self.transport.write_response(&response).await?;
            }
        }
    }

    async fn handle_message(&self, message: Value) -> Option<RpcResponse> {
        let request: RpcRequest = match serde_json::from_value(message.clone()) {
            Ok(request) => request,
            Err(e) => {
                let id = message
                    .get("id")
                    .cloned()
                    .and_then(|id| serde_json::from_value::<RpcId>(id).ok());
                return Some(RpcResponse::error(
                    id,
                    RpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")),
                ));
            }
        };

        if request.is_notification() {
            tracing::debug!("Notification {}", request.method);
            return None;
        }

        let id = request.id.clone();
        Some(match self.dispatch(request).await {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::error(id, error),
        })
    }

    async fn dispatch(&self, request: RpcRequest) -> Result<Value, RpcError> {
        let params = request.params.unwrap_or_else(|| json!({}));

        match request.method.as_str() {
            "initialize" => Ok(initialize_result(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::tools_list() })),
            "tools/call" => {
                let name = params.get("name").and_then(Value::as_str).ok_or_else(|| {
                    RpcError::invalid_params("tools/call requires a string 'name'")
                })?;
                let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

                let result = tools::call_tool(&self.service, name, arguments).await?;
                serde_json::to_value(result)
                    .map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))
            }
            other => Err(RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        }
    }

    #[cfg(test)]
    pub fn into_writer(self) -> W {
        self.transport.into_writer()
    }
}

fn initialize_result(params: &Value) -> Value {
    let requested = params.get("protocolVersion").and_then(Value::as_str);
    let version = requested
        .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);

    json!({
        "protocolVersion": version,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}
