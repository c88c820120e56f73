//! Client for an MCP server reached over streamable HTTP.
//!
//! Speaks JSON-RPC 2.0 via POST against a single endpoint URL, carrying the
//! headers from [`ToolConfig`] on every request. The `Mcp-Session-Id`
//! response header from `initialize` identifies the server-side session;
//! closing the client releases it with a DELETE.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ToolConfig;
use crate::http::first_sse_data;

use super::schema::McpToolSchema;

const PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "mcp-session-id";

/// Errors talking to the MCP endpoint.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("MCP endpoint returned status {status}: {body}")]
    Endpoint { status: u16, body: String },
    #[error("MCP server error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Invalid MCP response: {0}")]
    InvalidResponse(String),
    #[error("Invalid header {name} in tool configuration")]
    InvalidHeader { name: String },
    #[error("Tool {tool_name} failed: {message}")]
    ToolExecution { tool_name: String, message: String },
    #[error("MCP session is closed")]
    Closed,
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for McpError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpConnectionState {
    Disconnected,
    Initialized,
    Closed,
}

/// Result of a tool call, in decreasing order of preference:
/// structured content, concatenated text content, raw content items.
#[derive(Debug, Clone)]
pub struct McpToolCallResult {
    pub structured_content: Option<Value>,
    pub text_content: Option<String>,
    pub content: Vec<Value>,
}

impl McpToolCallResult {
    pub fn into_value_or_text(self) -> Value {
        if let Some(structured) = self.structured_content {
            return structured;
        }
        if let Some(text) = self.text_content {
            return Value::String(text);
        }
        Value::Array(self.content)
    }
}

/// Client for one MCP server session.
pub struct McpClient {
    http: reqwest::Client,
    url: String,
    headers: HeaderMap,
    session_id: Option<String>,
    state: McpConnectionState,
    next_id: u64,
}

impl McpClient {
    /// Create a client from the tool endpoint descriptor.
    ///
    /// No network traffic until [`initialize`](Self::initialize).
    pub fn new(config: ToolConfig, http: reqwest::Client) -> Result<Self, McpError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        for (name, value) in &config.headers {
            let header_name = name
                .parse::<HeaderName>()
                .map_err(|_| McpError::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| McpError::InvalidHeader { name: name.clone() })?;
            headers.insert(header_name, header_value);
        }

        Ok(Self {
            http,
            url: config.url,
            headers,
            session_id: None,
            state: McpConnectionState::Disconnected,
            next_id: 1,
        })
    }

    pub fn connection_state(&self) -> McpConnectionState {
        self.state
    }

    /// Perform the MCP handshake. Idempotent once initialized.
    pub async fn initialize(&mut self) -> Result<(), McpError> {
        match self.state {
            McpConnectionState::Initialized => return Ok(()),
            McpConnectionState::Closed => return Err(McpError::Closed),
            McpConnectionState::Disconnected => {}
        }

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "casa",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let (result, session_id) = self.post_rpc("initialize", params).await?;
        if !result.is_object() {
            return Err(McpError::InvalidResponse(
                "initialize returned no result object".into(),
            ));
        }
        self.session_id = session_id;
        debug!(session_id = ?self.session_id, "MCP session initialized");

        // Handshake completion notification; servers reply 202 with no body.
        self.post_notification("notifications/initialized").await?;

        self.state = McpConnectionState::Initialized;
        Ok(())
    }

    /// List the tools the server advertises.
    pub async fn list_tools(&mut self) -> Result<Vec<McpToolSchema>, McpError> {
        self.ensure_initialized()?;
        let (result, _) = self.post_rpc("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .cloned()
            .ok_or_else(|| McpError::InvalidResponse("tools/list returned no tools".into()))?;
        serde_json::from_value(tools)
            .map_err(|e| McpError::InvalidResponse(format!("bad tool schema: {e}")))
    }

    /// Execute a tool on the server.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<McpToolCallResult, McpError> {
        self.ensure_initialized()?;
        let arguments = coerce_tool_arguments(arguments)?;
        let params = json!({
            "name": name,
            "arguments": arguments,
        });
        let (result, _) = self.post_rpc("tools/call", params).await?;
        map_call_result(name, &result)
    }

    /// Release the server-side session. Best-effort: the client is marked
    /// closed regardless of the outcome.
    pub async fn close(&mut self) -> Result<(), McpError> {
        if self.state != McpConnectionState::Initialized {
            self.state = McpConnectionState::Closed;
            return Ok(());
        }
        self.state = McpConnectionState::Closed;

        let mut request = self.http.delete(&self.url).headers(self.headers.clone());
        if let Some(id) = &self.session_id {
            request = request.header(SESSION_HEADER, id);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "MCP session close rejected");
            return Err(McpError::Endpoint {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), McpError> {
        match self.state {
            McpConnectionState::Initialized => Ok(()),
            McpConnectionState::Closed => Err(McpError::Closed),
            McpConnectionState::Disconnected => Err(McpError::InvalidResponse(
                "MCP client must be initialized first".into(),
            )),
        }
    }

    async fn post_rpc(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<(Value, Option<String>), McpError> {
        let id = self.next_id;
        self.next_id += 1;
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = self.http.post(&self.url).headers(self.headers.clone());
        if let Some(session) = &self.session_id {
            request = request.header(SESSION_HEADER, session);
        }
        let response = request.json(&body).send().await?;

        let status = response.status();
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let text = response.text().await?;
        if !status.is_success() {
            return Err(McpError::Endpoint {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope = parse_rpc_body(&text)?;
        if let Some(error) = envelope.get("error") {
            return Err(McpError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown server error")
                    .to_string(),
            });
        }
        let result = envelope.get("result").cloned().unwrap_or(Value::Null);
        Ok((result, session_id))
    }

    async fn post_notification(&self, method: &str) -> Result<(), McpError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
        });
        let mut request = self.http.post(&self.url).headers(self.headers.clone());
        if let Some(session) = &self.session_id {
            request = request.header(SESSION_HEADER, session);
        }
        let response = request.json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(McpError::Endpoint {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Parse a response body that is either plain JSON or a single-event SSE
/// stream wrapping JSON.
fn parse_rpc_body(text: &str) -> Result<Value, McpError> {
    let payload = first_sse_data(text).unwrap_or(text);
    serde_json::from_str(payload)
        .map_err(|e| McpError::InvalidResponse(format!("body is not JSON-RPC: {e}")))
}

/// Accept tool arguments as an object, a JSON-encoded string, or null.
fn coerce_tool_arguments(value: Value) -> Result<Value, McpError> {
    match value {
        Value::Null => Ok(json!({})),
        Value::Object(map) => Ok(Value::Object(map)),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(json!({}));
            }
            let parsed: Value = serde_json::from_str(trimmed).map_err(|e| {
                McpError::InvalidResponse(format!("tool arguments must be valid JSON: {e}"))
            })?;
            coerce_tool_arguments(parsed)
        }
        other => Err(McpError::InvalidResponse(format!(
            "tool arguments must be a JSON object; got {other}"
        ))),
    }
}

fn extract_text_content(content: &[Value]) -> Option<String> {
    let lines: Vec<String> = content
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .map(String::from)
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn map_call_result(name: &str, result: &Value) -> Result<McpToolCallResult, McpError> {
    let content = result
        .get("content")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let text_content = extract_text_content(&content);
    let structured_content = result.get("structuredContent").cloned();

    if result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        let message = structured_content
            .as_ref()
            .map(|v| v.to_string())
            .or_else(|| text_content.clone())
            .unwrap_or_else(|| "MCP tool returned an error result".into());
        return Err(McpError::ToolExecution {
            tool_name: name.to_string(),
            message,
        });
    }

    Ok(McpToolCallResult {
        structured_content,
        text_content,
        content,
    })
}
