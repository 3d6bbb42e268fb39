use std::io::BufRead;
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AssistantError;
use crate::config::Settings;

/// One chat-completion call: a system prompt plus a single user message.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

/// A hosted chat-completion service.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, AssistantError>;

    /// Stream the answer, forwarding each content delta to `token_tx` when
    /// given. Returns the full text once the stream ends.
    fn complete_streaming(
        &self,
        request: &CompletionRequest,
        token_tx: Option<Sender<String>>,
    ) -> Result<String, AssistantError> {
        let text = self.complete(request)?;
        if let Some(tx) = token_tx {
            let _ = tx.send(text.clone());
        }
        Ok(text)
    }
}

/// Blocking client for an OpenAI-compatible `/chat/completions` endpoint
/// (Groq by default).
pub struct ChatCompletionClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl ChatCompletionClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, AssistantError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AssistantError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            timeout_secs,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AssistantError> {
        Self::new(
            &settings.api_base,
            settings.api_key.clone(),
            settings.timeout_secs,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::blocking::Response, AssistantError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest::new(request, stream);

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().map_err(|e| {
            if e.is_connect() {
                AssistantError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                AssistantError::Timeout(self.timeout_secs)
            } else {
                AssistantError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AssistantError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

/// Request body for `/chat/completions`
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_completion_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(request: &'a CompletionRequest, stream: bool) -> Self {
        Self {
            model: &request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            top_p: request.top_p,
            stream,
        }
    }
}

/// Response body from `/chat/completions`
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// One `data:` chunk of a streamed response
#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

impl CompletionClient for ChatCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, AssistantError> {
        let response = self.send(request, false)?;
        let parsed: ChatResponse = response
            .json()
            .map_err(|e| AssistantError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| AssistantError::ResponseParsing("response has no choices".into()))
    }

    fn complete_streaming(
        &self,
        request: &CompletionRequest,
        token_tx: Option<Sender<String>>,
    ) -> Result<String, AssistantError> {
        let response = self.send(request, true)?;
        read_event_stream(std::io::BufReader::new(response), token_tx.as_ref())
    }
}

/// Accumulate content deltas from a server-sent-events body until `[DONE]`
/// or end of input.
pub fn read_event_stream<R: BufRead>(
    reader: R,
    token_tx: Option<&Sender<String>>,
) -> Result<String, AssistantError> {
    let mut full = String::new();

    for line in reader.lines() {
        let line = line.map_err(|e| AssistantError::HttpClient(e.to_string()))?;
        let Some(data) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            break;
        }

        let chunk: StreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable stream chunk");
                continue;
            }
        };

        for delta in chunk.choices.into_iter().filter_map(|c| c.delta.content) {
            if delta.is_empty() {
                continue;
            }
            if let Some(tx) = token_tx {
                // Receiver may have hung up; keep accumulating regardless.
                let _ = tx.send(delta.clone());
            }
            full.push_str(&delta);
        }
    }

    Ok(full)
}

/// Mock completion client for testing. Returns a fixed response and records
/// every request it receives.
pub struct MockCompletionClient {
    response: Result<String, String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletionClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails with a connection error.
    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl CompletionClient for MockCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, AssistantError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.response
            .clone()
            .map_err(AssistantError::Connection)
    }
}
