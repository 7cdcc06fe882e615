//! Anthropic Messages API binding

use super::Completion;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default model used for answers
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Default response token budget
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Completion backed by the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicCompletion {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicCompletion {
    /// Create a client with the default model and token budget
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Use a different model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a different response token budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Point at a different API host (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Configured model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Completion for AnthropicCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!("Requesting completion from {}", self.model);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        if !status.is_success() {
            let detail: String = body.chars().take(200).collect();
            return Err(Error::Upstream(format!(
                "Anthropic API returned {}: {}",
                status.as_u16(),
                detail
            )));
        }

        parse_answer(&body)
    }
}

/// Extract the first text block of a Messages API response
fn parse_answer(body: &str) -> Result<String> {
    let parsed: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| Error::Upstream(format!("Malformed completion response: {}", e)))?;

    parsed
        .content
        .into_iter()
        .find(|block| block.block_type == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| Error::Upstream("Completion response contained no text".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{Html, IntoResponse};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    type Captured = Arc<Mutex<Option<(HeaderMap, Value)>>>;

    /// Serve `app` on a loopback port and return its base URL
    async fn spawn_upstream(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    async fn record(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        *captured.lock().unwrap() = Some((headers, body));
        Json(json!({
            "id": "msg_1",
            "content": [{"type": "text", "text": "Borrowing is checked at compile time."}]
        }))
    }

    fn client(base_url: &str) -> AnthropicCompletion {
        AnthropicCompletion::new("test-key")
            .unwrap()
            .with_model("claude-test")
            .with_max_tokens(64)
            .with_base_url(base_url)
    }

    #[test]
    fn test_parse_answer() {
        let body = r#"{"id":"msg_1","content":[{"type":"text","text":"Rust is fast."}]}"#;
        assert_eq!(parse_answer(body).unwrap(), "Rust is fast.");
    }

    #[test]
    fn test_parse_answer_skips_non_text_blocks() {
        let body = r#"{"content":[{"type":"thinking"},{"type":"text","text":"ok"}]}"#;
        assert_eq!(parse_answer(body).unwrap(), "ok");
    }

    #[test]
    fn test_parse_answer_without_text() {
        let err = parse_answer(r#"{"content":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[test]
    fn test_builder() {
        let completion = AnthropicCompletion::new("key")
            .unwrap()
            .with_model("claude-test")
            .with_max_tokens(10)
            .with_base_url("http://localhost:9999/");
        assert_eq!(completion.model(), "claude-test");
        assert_eq!(completion.base_url, "http://localhost:9999");
        assert_eq!(completion.max_tokens, 10);
    }

    #[tokio::test]
    async fn test_complete_sends_messages_request() {
        let captured = Captured::default();
        let app = Router::new()
            .route("/v1/messages", post(record))
            .with_state(captured.clone());
        let base_url = spawn_upstream(app).await;

        let answer = client(&format!("{}/", base_url))
            .complete("How does borrowing work?")
            .await
            .unwrap();
        assert_eq!(answer, "Borrowing is checked at compile time.");

        let (headers, body) = captured.lock().unwrap().take().unwrap();
        assert_eq!(headers["x-api-key"], "test-key");
        assert_eq!(headers["anthropic-version"], "2023-06-01");
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(
            body["messages"],
            json!([{"role": "user", "content": "How does borrowing work?"}])
        );
    }

    #[tokio::test]
    async fn test_complete_error_status_is_upstream() {
        let app = Router::new().route(
            "/v1/messages",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    r#"{"type":"error","error":{"type":"rate_limit_error"}}"#,
                )
                    .into_response()
            }),
        );
        let base_url = spawn_upstream(app).await;

        let err = client(&base_url).complete("question").await.unwrap_err();
        match err {
            Error::Upstream(detail) => {
                assert!(detail.contains("429"), "{}", detail);
                assert!(detail.contains("rate_limit_error"), "{}", detail);
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_html_body_is_upstream() {
        let app = Router::new().route(
            "/v1/messages",
            post(|| async { Html("<html><body>Gateway</body></html>") }),
        );
        let base_url = spawn_upstream(app).await;

        let err = client(&base_url).complete("question").await.unwrap_err();
        match err {
            Error::Upstream(detail) => assert!(detail.contains("Malformed"), "{}", detail),
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_unreachable_host_is_upstream() {
        let err = client("http://127.0.0.1:1")
            .complete("question")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }
}
