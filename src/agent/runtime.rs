//! The tool-use loop driving the language model against the MCP endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::TokenSource;
use crate::config::{build_tool_config, Secrets};
use crate::error::{CasaError, CleanupError};
use crate::mcp::{McpClient, McpToolSchema};

use super::conversation::Turn;
use super::error::AgentError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_MAX_STEPS: usize = 20;

const SYSTEM_PROMPT: &str = "You are a real-estate community assistant. \
Use the available tools to look up community information before answering. \
Answer concisely from tool results.";

/// Single-shot query interface of the tool-augmented agent.
///
/// One call per user turn; the caller blocks on the returned future and
/// never overlaps calls.
#[async_trait]
pub trait AgentRuntime: Send {
    /// Produce an answer for `query` given the bounded conversation context.
    async fn run(&mut self, query: &str, context: &[Turn]) -> Result<String, AgentError>;

    /// Release any underlying network sessions.
    async fn close(&mut self) -> Result<(), CleanupError>;
}

/// Builds the agent for a session when it becomes active.
#[async_trait]
pub trait AgentFactory: Send + Sync {
    async fn build(&self) -> Result<Box<dyn AgentRuntime>, CasaError>;
}

/// Model handle and generation settings for the production agent.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub base_url: String,
    pub max_steps: usize,
}

impl ModelSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }
}

/// Production agent: chat completions with the community-search MCP server
/// exposed as function tools.
///
/// Each run is bounded at `max_steps` model calls; tools are withheld on
/// the final step so the model must produce a best-effort answer.
pub struct McpAgent {
    http: reqwest::Client,
    settings: ModelSettings,
    client: McpClient,
    tools: Option<Vec<McpToolSchema>>,
}

impl McpAgent {
    pub fn new(client: McpClient, settings: ModelSettings, http: reqwest::Client) -> Self {
        Self {
            http,
            settings,
            client,
            tools: None,
        }
    }

    async fn ensure_tools(&mut self) -> Result<&[McpToolSchema], AgentError> {
        if self.tools.is_none() {
            self.client.initialize().await?;
            let tools = self.client.list_tools().await?;
            debug!(count = tools.len(), "discovered MCP tools");
            self.tools = Some(tools);
        }
        Ok(self.tools.as_deref().unwrap_or(&[]))
    }

    fn build_request_body(&self, messages: &[Value], tools: Option<&[Value]>) -> Value {
        let mut body = json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
        });
        if let Some(tools) = tools {
            if !tools.is_empty() {
                if let Some(obj) = body.as_object_mut() {
                    obj.insert("tools".into(), Value::Array(tools.to_vec()));
                }
            }
        }
        body
    }

    /// One chat-completions call; returns `choices[0].message`.
    async fn complete(&self, body: &Value) -> Result<Value, AgentError> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AgentError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: Value = serde_json::from_str(&text)?;
        parsed
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .cloned()
            .ok_or_else(|| AgentError::InvalidResponse("no choices[0].message".into()))
    }

    async fn execute_tool_call(&mut self, call: &Value) -> Result<Value, AgentError> {
        let id = call
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::InvalidResponse("tool call without id".into()))?;
        let function = call
            .get("function")
            .ok_or_else(|| AgentError::InvalidResponse("tool call without function".into()))?;
        let name = function
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::InvalidResponse("tool call without name".into()))?;
        let arguments = function
            .get("arguments")
            .and_then(Value::as_str)
            .unwrap_or("{}");

        debug!(tool = name, "executing tool call");
        let result = self
            .client
            .call_tool(name, Value::String(arguments.to_string()))
            .await?;

        let content = match result.into_value_or_text() {
            Value::String(text) => text,
            other => other.to_string(),
        };
        Ok(json!({
            "role": "tool",
            "tool_call_id": id,
            "content": content,
        }))
    }
}

#[async_trait]
impl AgentRuntime for McpAgent {
    async fn run(&mut self, query: &str, context: &[Turn]) -> Result<String, AgentError> {
        let tool_defs: Vec<Value> = self
            .ensure_tools()
            .await?
            .iter()
            .map(tool_definition)
            .collect();

        let mut messages = vec![json!({"role": "system", "content": SYSTEM_PROMPT})];
        for turn in context {
            messages.push(json!({"role": turn.role.as_str(), "content": turn.content}));
        }
        messages.push(json!({"role": "user", "content": query}));

        for step in 1..=self.settings.max_steps {
            let offer_tools = step < self.settings.max_steps && !tool_defs.is_empty();
            let body = self.build_request_body(&messages, offer_tools.then_some(&tool_defs[..]));
            let message = self.complete(&body).await?;

            let tool_calls = message
                .get("tool_calls")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if tool_calls.is_empty() {
                return Ok(message
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string());
            }

            if !offer_tools {
                warn!("model requested tools on the final step");
                return Err(AgentError::InvalidResponse(
                    "tool call requested after the step limit was reached".into(),
                ));
            }

            messages.push(message.clone());
            for call in &tool_calls {
                let tool_message = self.execute_tool_call(call).await?;
                messages.push(tool_message);
            }
        }

        Err(AgentError::InvalidResponse(
            "exhausted tool steps without an answer".into(),
        ))
    }

    async fn close(&mut self) -> Result<(), CleanupError> {
        self.client
            .close()
            .await
            .map_err(|e| CleanupError::new(e.to_string()))
    }
}

fn tool_definition(tool: &McpToolSchema) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description.clone().unwrap_or_default(),
            "parameters": tool.input_schema,
        }
    })
}

/// Wires token acquisition, tool configuration, and the model handle into a
/// fresh [`McpAgent`] each time a session becomes active.
pub struct CommunityAgentFactory {
    http: reqwest::Client,
    secrets: Secrets,
    settings: ModelSettings,
    token_source: Mutex<TokenSource>,
}

impl CommunityAgentFactory {
    /// Create the factory and eagerly acquire the first token, so a broken
    /// credential setup fails at startup rather than on the first turn.
    pub async fn new(secrets: Secrets, settings: ModelSettings) -> Result<Self, CasaError> {
        let http = crate::http::shared_client().clone();
        let mut token_source = secrets.token_source();
        token_source.token(&http).await?;
        Ok(Self {
            http,
            secrets,
            settings,
            token_source: Mutex::new(token_source),
        })
    }
}

#[async_trait]
impl AgentFactory for CommunityAgentFactory {
    async fn build(&self) -> Result<Box<dyn AgentRuntime>, CasaError> {
        let token = self
            .token_source
            .lock()
            .await
            .token(&self.http)
            .await?;
        let config = build_tool_config(&self.secrets, &token);
        let client = McpClient::new(config, self.http.clone()).map_err(AgentError::from)?;
        Ok(Box::new(McpAgent::new(
            client,
            self.settings.clone(),
            self.http.clone(),
        )))
    }
}
