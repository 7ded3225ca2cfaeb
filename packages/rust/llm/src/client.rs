//! OpenAI-compatible `/chat/completions` client (works with Ollama, vLLM,
//! OpenAI and anything else speaking the same wire format).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use scriptcrew_shared::{LlmConfig, Result, ScriptCrewError};

use crate::ChatModel;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, Role, ToolCall, Usage};

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("scriptcrew/", env!("CARGO_PKG_VERSION"));

/// How much of an error body is echoed into the error message.
const ERROR_BODY_PREVIEW: usize = 300;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// A JSON string per the OpenAI contract; some servers send an object.
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn function_type() -> String {
    "function".into()
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
            msg.tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: function_type(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: serde_json::Value::String(call.arguments.clone()),
                    },
                })
                .collect()
        });

        Self {
            role: msg.role,
            content: msg.content.clone(),
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(call: WireToolCall) -> Self {
        let arguments = match call.function.arguments {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => "{}".to_string(),
            other => other.to_string(),
        };
        Self {
            id: call.id,
            name: call.function.name,
            arguments,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Chat-completion client bound to one model and endpoint.
pub struct OpenAiCompatClient {
    client: Client,
    config: LlmConfig,
    endpoint: String,
}

impl OpenAiCompatClient {
    /// Build a client from resolved model settings.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ScriptCrewError::Llm(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn wire_request<'a>(&'a self, request: &ChatRequest) -> WireRequest<'a> {
        WireRequest {
            model: &self.config.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: self.config.temperature,
            tools: request
                .tools
                .iter()
                .map(|tool| WireTool {
                    kind: "function",
                    function: WireFunction {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect(),
            response_format: request
                .json_mode
                .then_some(WireResponseFormat { kind: "json_object" }),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    #[instrument(skip_all, fields(model = %self.config.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let start = Instant::now();
        let body = self.wire_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScriptCrewError::Llm(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let preview: String = text.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(ScriptCrewError::Llm(format!(
                "{}: HTTP {status}: {preview}",
                self.endpoint
            )));
        }

        let parsed: WireResponse = response.json().await.map_err(|e| {
            ScriptCrewError::Llm(format!("invalid chat completion response: {e}"))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ScriptCrewError::Llm("chat completion response contained no choices".into())
        })?;

        let usage = parsed
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let reply = ChatResponse {
            content: choice.message.content,
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(ToolCall::from)
                .collect(),
            usage,
        };

        debug!(
            tokens_in = usage.prompt_tokens,
            tokens_out = usage.completion_tokens,
            tool_calls = reply.tool_calls.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "chat completion received"
        );

        Ok(reply)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolDefinition;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LlmConfig {
        LlmConfig {
            model: "llama3:8b".into(),
            base_url: format!("{}/v1/", server.uri()),
            temperature: 0.7,
            api_key: "sk-test".into(),
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = OpenAiCompatClient::new(LlmConfig::default()).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn wire_request_omits_empty_tools() {
        let client = OpenAiCompatClient::new(LlmConfig::default()).unwrap();
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let json = serde_json::to_value(client.wire_request(&request)).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("response_format").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn wire_request_encodes_tool_turns() {
        let client = OpenAiCompatClient::new(LlmConfig::default()).unwrap();
        let request = ChatRequest {
            messages: vec![
                ChatMessage::assistant_tool_calls(
                    None,
                    vec![ToolCall {
                        id: "call_1".into(),
                        name: "search_tool".into(),
                        arguments: r#"{"query":"rust"}"#.into(),
                    }],
                ),
                ChatMessage::tool_result("call_1", "results"),
            ],
            tools: vec![ToolDefinition {
                name: "search_tool".into(),
                description: "search".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
            json_mode: true,
        };
        let json = serde_json::to_value(client.wire_request(&request)).unwrap();
        assert_eq!(json["messages"][0]["tool_calls"][0]["type"], "function");
        assert_eq!(
            json["messages"][0]["tool_calls"][0]["function"]["arguments"],
            r#"{"query":"rust"}"#
        );
        assert_eq!(json["messages"][1]["tool_call_id"], "call_1");
        assert_eq!(json["tools"][0]["function"]["name"], "search_tool");
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn complete_returns_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "llama3:8b"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Olá!"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3}
            })))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(config_for(&server)).unwrap();
        let reply = client
            .complete(&ChatRequest::new(vec![ChatMessage::user("oi")]))
            .await
            .expect("completion");

        assert_eq!(reply.text_or_empty(), "Olá!");
        assert!(reply.tool_calls.is_empty());
        assert_eq!(reply.usage.prompt_tokens, 12);
        assert_eq!(reply.usage.completion_tokens, 3);
    }

    #[tokio::test]
    async fn complete_parses_tool_calls_in_both_argument_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "a", "type": "function",
                         "function": {"name": "search_tool", "arguments": "{\"query\":\"ia\"}"}},
                        {"id": "b", "type": "function",
                         "function": {"name": "scrape_tool", "arguments": {"website_url": "https://x.dev"}}}
                    ]
                }}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(config_for(&server)).unwrap();
        let reply = client
            .complete(&ChatRequest::new(vec![ChatMessage::user("go")]))
            .await
            .expect("completion");

        assert!(reply.content.is_none());
        assert_eq!(reply.tool_calls.len(), 2);
        assert_eq!(reply.tool_calls[0].arguments, r#"{"query":"ia"}"#);
        let args: serde_json::Value =
            serde_json::from_str(&reply.tool_calls[1].arguments).unwrap();
        assert_eq!(args["website_url"], "https://x.dev");
        assert_eq!(reply.usage, Usage::default());
    }

    #[tokio::test]
    async fn complete_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(config_for(&server)).unwrap();
        let err = client
            .complete(&ChatRequest::new(vec![ChatMessage::user("oi")]))
            .await
            .unwrap_err();

        assert!(matches!(err, ScriptCrewError::Llm(_)));
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("model not loaded"));
    }

    #[tokio::test]
    async fn complete_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = OpenAiCompatClient::new(config_for(&server)).unwrap();
        let err = client
            .complete(&ChatRequest::new(vec![ChatMessage::user("oi")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
