//! LLM answer formatters.
//!
//! Rewrite the raw decision summary into two or three fluent sentences in
//! the query's language, through a local Ollama (`POST {host}/api/generate`)
//! or Groq's OpenAI-compatible chat API. Any failure is reported as a
//! `FormatError` and the engine keeps the raw summary.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;
use velocity_core::formatter::AnswerFormatter;
use velocity_core::{FormatError, Locale};

use crate::config::FormatterConfig;

/// Replies shorter than this are treated as no reply
const MIN_RESPONSE_CHARS: usize = 10;

/// Raw summary text passed to the model is capped at this many characters
const MAX_SUMMARY_CHARS: usize = 500;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 500;

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

const GROQ_SYSTEM_PROMPT: &str = "You are a synthesis assistant. Transform raw facts into natural, \
fluent text. Preserve all factual content. Be concise and clear.";

static THINK_BLOCK: LazyLock<Option<regex::Regex>> =
    LazyLock::new(|| regex::Regex::new(r"(?s)<think>.*?</think>").ok());

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

fn send_error(e: reqwest::Error) -> FormatError {
    if e.is_connect() {
        FormatError::Unavailable
    } else {
        FormatError::Transport(e.to_string())
    }
}

fn status_error(status: StatusCode) -> FormatError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FormatError::Unavailable,
        _ => FormatError::Transport(format!("HTTP {}", status)),
    }
}

/// Whether the request gets a success status
async fn responds_ok(request: reqwest::RequestBuilder) -> bool {
    match request.send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            debug!("Formatter health check failed: {}", e);
            false
        }
    }
}

pub struct OllamaFormatter {
    http: reqwest::Client,
    host: String,
    model: String,
}

impl OllamaFormatter {
    pub fn new(http: reqwest::Client, config: &FormatterConfig) -> Self {
        Self {
            http,
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    /// The server is up and answers `/api/tags`
    pub async fn health_check(&self) -> bool {
        responds_ok(self.http.get(format!("{}/api/tags", self.host))).await
    }
}

pub struct GroqFormatter {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GroqFormatter {
    pub fn new(http: reqwest::Client, config: &FormatterConfig, api_key: String) -> Self {
        Self {
            http,
            base_url: GROQ_API_URL.to_string(),
            model: config.groq_model.clone(),
            api_key,
        }
    }

    /// The key is accepted by `/models`
    pub async fn health_check(&self) -> bool {
        responds_ok(
            self.http
                .get(format!("{}/models", self.base_url))
                .bearer_auth(&self.api_key),
        )
        .await
    }
}

pub fn build_prompt(summary: &str, locale: Locale) -> String {
    let facts: String = summary.chars().take(MAX_SUMMARY_CHARS).collect();
    format!(
        "You are a helpful assistant. Rewrite the following information in natural, fluent language.\n\n\
         Information:\n{}\n\n\
         Instructions:\n\
         - Write 2-3 clear sentences in {}\n\
         - Use only the facts above; do not add new ones\n\
         - Don't mention sources\n\n\
         Answer:",
        facts,
        locale.name()
    )
}

fn chat_request<'a>(model: &'a str, prompt: String) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: GROQ_SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: prompt,
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

/// First choice of a chat completion, cleaned
fn chat_answer(body: ChatResponse) -> Result<String, FormatError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| clean_response(&choice.message.content))
        .ok_or(FormatError::EmptyResponse)
}

/// Model reply without reasoning blocks, or None if too short to use
pub fn clean_response(raw: &str) -> Option<String> {
    let text = match THINK_BLOCK.as_ref() {
        Some(re) => re.replace_all(raw, "").into_owned(),
        None => raw.to_string(),
    };
    let text = text.trim();
    if text.chars().count() < MIN_RESPONSE_CHARS {
        return None;
    }
    Some(text.to_string())
}

#[async_trait]
impl AnswerFormatter for OllamaFormatter {
    async fn format(&self, summary: &str, locale: Locale) -> Result<String, FormatError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(summary, locale),
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                num_predict: MAX_TOKENS,
            },
        };
        let url = format!("{}/api/generate", self.host);
        debug!("Formatting answer with {} at {}", self.model, url);

        let response = self.http.post(&url).json(&request).send().await.map_err(send_error)?;
        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| FormatError::Transport(e.to_string()))?;

        clean_response(&body.response).ok_or(FormatError::EmptyResponse)
    }
}

#[async_trait]
impl AnswerFormatter for GroqFormatter {
    async fn format(&self, summary: &str, locale: Locale) -> Result<String, FormatError> {
        let request = chat_request(&self.model, build_prompt(summary, locale));
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Formatting answer with Groq model {}", self.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;
        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| FormatError::Transport(e.to_string()))?;

        chat_answer(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_locale_language() {
        let prompt = build_prompt("Kuantum bilgisayar kubitleri kullanır.", Locale::Turkish);
        assert!(prompt.contains("in Turkish"));
        assert!(prompt.contains("Kuantum bilgisayar"));
    }

    #[test]
    fn test_prompt_caps_summary() {
        let long = "a".repeat(2000);
        let prompt = build_prompt(&long, Locale::English);
        assert!(!prompt.contains(&"a".repeat(501)));
    }

    #[test]
    fn test_think_blocks_removed() {
        let cleaned = clean_response("<think>\nlet me see\n</think>\nRust is a safe systems language.");
        assert_eq!(cleaned.as_deref(), Some("Rust is a safe systems language."));
    }

    #[test]
    fn test_chat_request_shape() {
        let request = chat_request("llama-3.1-8b-instant", "Answer:".to_string());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Answer:");
        assert_eq!(json["max_tokens"], 500);
    }

    #[test]
    fn test_chat_answer_takes_first_choice() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"<think>hm</think> Rust is memory safe."}}]}"#,
        )
        .unwrap();
        assert_eq!(chat_answer(body).unwrap(), "Rust is memory safe.");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(chat_answer(empty), Err(FormatError::EmptyResponse));
    }

    #[test]
    fn test_rejected_key_means_unavailable() {
        assert_eq!(status_error(StatusCode::UNAUTHORIZED), FormatError::Unavailable);
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR),
            FormatError::Transport("HTTP 500 Internal Server Error".to_string())
        );
    }

    fn ollama_at(addr: std::net::SocketAddr) -> OllamaFormatter {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        let config = FormatterConfig {
            host: format!("http://{}/", addr),
            ..FormatterConfig::default()
        };
        OllamaFormatter::new(http, &config)
    }

    #[tokio::test]
    async fn test_ollama_health_check() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let n = socket.read(&mut request).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 13\r\nconnection: close\r\n\r\n{\"models\":[]}")
                .await
                .unwrap();
            String::from_utf8_lossy(&request[..n]).to_string()
        });

        assert!(ollama_at(addr).health_check().await);
        assert!(server.await.unwrap().starts_with("GET /api/tags "));
    }

    #[tokio::test]
    async fn test_closed_port_is_unhealthy() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(!ollama_at(addr).health_check().await);
    }

    #[test]
    fn test_short_reply_is_failure() {
        assert_eq!(clean_response("  ok  "), None);
        assert_eq!(clean_response("<think>long reasoning here</think>"), None);
    }
}
