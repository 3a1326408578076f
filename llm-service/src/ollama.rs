//! Thin client for an Ollama-compatible `/api/chat` endpoint.
//!
//! Implements [`LanguageModel`] for both complete and streaming generation.
//! Tool specs are forwarded in the request; tool calls proposed by the model
//! come back parsed, never as raw JSON strings.

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::provider::{BoxFuture, LanguageModel};
use crate::types::{ChatRequest, ChatRole, GenerationOutput, StreamEvent, ToolCall, ToolSpec};

/// Configuration for [`OllamaChat`].
#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// Provider base URL, e.g. `http://localhost:11434`.
    pub endpoint: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Deadline for one complete (non-streaming) generation pass.
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("LLM_URL").unwrap_or_else(|_| {
                let port = std::env::var("LLM_PORT").unwrap_or_else(|_| "11434".into());
                format!("http://localhost:{port}")
            }),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "qwen3:14b".into()),
            max_tokens: std::env::var("LLM_MAX_TOKENS").ok().and_then(|v| v.parse().ok()),
            temperature: std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()),
            timeout: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(120)),
        }
    }
}

/// Chat client for Ollama.
pub struct OllamaChat {
    client: reqwest::Client,
    cfg: LlmConfig,
    url_chat: String,
}

impl OllamaChat {
    /// # Errors
    /// [`LlmError::InvalidEndpoint`] if the endpoint is empty or not http(s);
    /// [`LlmError::Transport`] if the HTTP client cannot be built.
    pub fn new(cfg: LlmConfig) -> Result<Self, LlmError> {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(LlmError::InvalidEndpoint(cfg.endpoint));
        }

        // Deadlines are applied per call; a client-level timeout would cut
        // long-lived streaming responses short.
        let client = reqwest::Client::builder().build()?;
        let url_chat = format!("{}/api/chat", endpoint.trim_end_matches('/'));

        Ok(Self {
            client,
            cfg,
            url_chat,
        })
    }

    async fn post_chat(&self, body: &ChatApiRequest<'_>) -> Result<reqwest::Response, LlmError> {
        debug!(target: "llm_service::ollama", model = %self.cfg.model, "POST {}", self.url_chat);
        let resp = self.client.post(&self.url_chat).json(body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(240).collect::<String>();
            return Err(LlmError::HttpStatus {
                status,
                url: self.url_chat.clone(),
                snippet,
            });
        }
        Ok(resp)
    }
}

impl LanguageModel for OllamaChat {
    fn generate<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<GenerationOutput, LlmError>> {
        Box::pin(async move {
            let body = ChatApiRequest::build(&self.cfg, request, false);

            let resp = tokio::time::timeout(self.cfg.timeout, self.post_chat(&body))
                .await
                .map_err(|_| LlmError::Timeout(self.cfg.timeout))??;

            let out: ChatApiResponse = tokio::time::timeout(self.cfg.timeout, resp.json())
                .await
                .map_err(|_| LlmError::Timeout(self.cfg.timeout))?
                .map_err(|e| LlmError::Decode(format!("chat response: {e}")))?;

            Ok(GenerationOutput {
                text: out.message.content,
                tool_calls: out
                    .message
                    .tool_calls
                    .into_iter()
                    .map(ApiToolCall::into_tool_call)
                    .collect(),
                tokens: out.eval_count,
            })
        })
    }

    fn generate_stream<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<mpsc::Receiver<StreamEvent>, LlmError>> {
        Box::pin(async move {
            let body = ChatApiRequest::build(&self.cfg, request, true);
            let resp = self.post_chat(&body).await?;

            let (tx, rx) = mpsc::channel(32);
            let mut stream = resp.bytes_stream();

            tokio::spawn(async move {
                let mut buf: Vec<u8> = Vec::new();
                while let Some(chunk) = stream.next().await {
                    let bytes = match chunk {
                        Ok(b) => b,
                        Err(e) => {
                            warn!(target: "llm_service::ollama", "stream transport error: {e}");
                            break;
                        }
                    };
                    buf.extend_from_slice(&bytes);

                    // NDJSON: one complete response object per line.
                    while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = buf.drain(..=pos).collect();
                        let parsed: ChatApiResponse = match serde_json::from_slice(&line) {
                            Ok(p) => p,
                            Err(_) => continue,
                        };

                        if !parsed.message.tool_calls.is_empty() {
                            let calls = parsed
                                .message
                                .tool_calls
                                .into_iter()
                                .map(ApiToolCall::into_tool_call)
                                .collect();
                            if tx.send(StreamEvent::ToolCalls(calls)).await.is_err() {
                                return;
                            }
                        }
                        if !parsed.message.content.is_empty()
                            && tx
                                .send(StreamEvent::Delta(parsed.message.content))
                                .await
                                .is_err()
                        {
                            return;
                        }
                        if parsed.done {
                            let _ = tx
                                .send(StreamEvent::Done {
                                    tokens: parsed.eval_count,
                                })
                                .await;
                            return;
                        }
                    }
                }
                // Upstream closed without a done marker; end the stream anyway.
                let _ = tx.send(StreamEvent::Done { tokens: None }).await;
            });

            Ok(rx)
        })
    }
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ApiOptions>,
}

impl<'a> ChatApiRequest<'a> {
    fn build(cfg: &'a LlmConfig, request: &'a ChatRequest, stream: bool) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(ApiMessage {
                role: "system",
                content: system,
            });
        }
        for m in &request.messages {
            messages.push(ApiMessage {
                role: match m.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &m.content,
            });
        }

        let options = if cfg.max_tokens.is_some() || cfg.temperature.is_some() {
            Some(ApiOptions {
                num_predict: cfg.max_tokens,
                temperature: cfg.temperature,
            })
        } else {
            None
        };

        Self {
            model: &cfg.model,
            messages,
            stream,
            tools: request.tools.iter().map(ApiTool::from_spec).collect(),
            options,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    r#type: &'static str,
    function: &'a ToolSpec,
}

impl<'a> ApiTool<'a> {
    fn from_spec(spec: &'a ToolSpec) -> Self {
        Self {
            r#type: "function",
            function: spec,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    message: ApiResponseMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    function: ApiFunction,
}

impl ApiToolCall {
    fn into_tool_call(self) -> ToolCall {
        ToolCall {
            name: self.function.name,
            arguments: self.function.arguments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}
