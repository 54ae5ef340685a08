//! The two weather tools and their MCP encoding.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use meteo_core::{WeatherError, WeatherService};

use crate::protocol::RpcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    SevenDayWeather,
    CurrentWeather,
}

impl Tool {
    pub const fn all() -> &'static [Tool] {
        &[Tool::SevenDayWeather, Tool::CurrentWeather]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tool::SevenDayWeather => "get_7day_weather",
            Tool::CurrentWeather => "get_current_weather",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::SevenDayWeather => "Get hourly weather forecast for a location.",
            Tool::CurrentWeather => "Get current weather forecast for a location.",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::all().iter().copied().find(|tool| tool.name() == name)
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: self.description(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "Free-text place name, e.g. \"Paris, France\""
                    }
                },
                "required": ["location"]
            }),
        }
    }
}

/// Entry of a `tools/list` result.
#[derive(Debug, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub fn tools_list() -> Vec<ToolDefinition> {
    Tool::all().iter().map(Tool::definition).collect()
}

#[derive(Debug, Deserialize)]
struct LocationInput {
    location: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// Result of `tools/call`, either the tool's value or a tool-level error.
#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "structuredContent")]
    pub structured_content: Value,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl CallToolResult {
    /// Encode a tool value. Non-object values are wrapped as `{"result": value}`.
    pub fn success(value: Value) -> Self {
        let text = value.to_string();
        let structured_content = match value {
            Value::Object(_) => value,
            other => json!({ "result": other }),
        };
        Self { content: vec![Content::Text { text }], structured_content, is_error: false }
    }

    pub fn failure(err: &WeatherError) -> Self {
        let message = err.to_string();
        Self {
            content: vec![Content::Text { text: message.clone() }],
            structured_content: json!({
                "error": { "kind": err.kind(), "message": message }
            }),
            is_error: true,
        }
    }
}

/// Run a tool by name. Protocol-level problems (unknown tool, bad arguments)
/// are `Err`; weather failures come back as an `isError` result.
pub async fn call_tool(
    service: &WeatherService,
    name: &str,
    arguments: Value,
) -> Result<CallToolResult, RpcError> {
    let tool = Tool::from_name(name)
        .ok_or_else(|| RpcError::invalid_params(format!("Unknown tool: {name}")))?;

    let input: LocationInput = serde_json::from_value(arguments)
        .map_err(|e| RpcError::invalid_params(format!("Invalid arguments for {name}: {e}")))?;

    tracing::info!("Calling {} for '{}'", tool.name(), input.location);

    let outcome = match tool {
        Tool::SevenDayWeather => service
            .get_7day_weather(&input.location)
            .await
            .and_then(|records| encode(&records)),
        Tool::CurrentWeather => service
            .get_current_weather(&input.location)
            .await
            .and_then(|current| encode(&current)),
    };

    Ok(match outcome {
        Ok(value) => CallToolResult::success(value),
        Err(err) => {
            tracing::warn!("{} failed for '{}': {}", tool.name(), input.location, err);
            CallToolResult::failure(&err)
        }
    })
}

fn encode<T: Serialize>(value: &T) -> Result<Value, WeatherError> {
    serde_json::to_value(value)
        .map_err(|e| WeatherError::MalformedResponse(format!("failed to encode tool output: {e}")))
}
