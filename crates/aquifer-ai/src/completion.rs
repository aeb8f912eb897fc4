//! Text-completion capability and its implementations.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("completion service disabled")]
    Disabled,
    #[error("malformed completion: {0}")]
    Malformed(String),
}

/// A prompt-in, text-out completion service.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, CompletionError>;

    /// `false` when every call would fail with [`CompletionError::Disabled`].
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Stand-in used when no service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCompletion;

#[async_trait]
impl Completion for DisabledCompletion {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Which completion service to use.
#[derive(Debug, Clone)]
pub struct AssistConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `http://localhost:11434/v1`.
    /// `None` disables assistance.
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout: Duration::from_secs(8),
        }
    }
}

impl AssistConfig {
    /// Build the configured service.
    pub fn build(&self) -> Result<Box<dyn Completion>, CompletionError> {
        match &self.base_url {
            Some(url) if !url.trim().is_empty() => Ok(Box::new(HttpCompletion::new(self)?)),
            _ => {
                debug!("completion service not configured");
                Ok(Box::new(DisabledCompletion))
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for `POST {base}/chat/completions`.
pub struct HttpCompletion {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpCompletion {
    pub fn new(config: &AssistConfig) -> Result<Self, CompletionError> {
        let base = config.base_url.as_deref().ok_or(CompletionError::Disabled)?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", base.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }

    async fn send(&self, system: &str, prompt: &str) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        let mut req = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let raw = resp.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&raw)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CompletionError::Malformed("no message content".into()))
    }
}

#[async_trait]
impl Completion for HttpCompletion {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, CompletionError> {
        info!(url = %self.url, model = %self.model, "requesting completion");
        // The client timeout covers the body read; this bounds the whole call.
        let text = tokio::time::timeout(self.timeout, self.send(system, prompt))
            .await
            .map_err(|_| CompletionError::Timeout(self.timeout))?
            .map_err(|e| match e {
                CompletionError::Http(e) if e.is_timeout() => CompletionError::Timeout(self.timeout),
                other => other,
            })?;
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port; returns the base URL.
    pub(crate) async fn serve_once(status: u16, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            read_request(&mut sock).await;
            let resp = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    async fn read_request(sock: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + length {
                    return;
                }
            }
        }
    }

    fn config(url: String, timeout: Duration) -> AssistConfig {
        AssistConfig {
            base_url: Some(url),
            timeout,
            ..AssistConfig::default()
        }
    }

    #[tokio::test]
    async fn disabled_always_errors() {
        let c = DisabledCompletion;
        assert!(!c.is_enabled());
        assert!(matches!(
            c.complete("s", "p").await,
            Err(CompletionError::Disabled)
        ));
    }

    #[test]
    fn config_without_url_is_disabled() {
        let c = AssistConfig::default().build().unwrap();
        assert!(!c.is_enabled());
        let blank = AssistConfig {
            base_url: Some("  ".into()),
            ..AssistConfig::default()
        };
        assert!(!blank.build().unwrap().is_enabled());
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let url = serve_once(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#,
        )
        .await;
        let c = HttpCompletion::new(&config(url, Duration::from_secs(5))).unwrap();
        assert_eq!(c.complete("sys", "hi").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn non_success_status_is_server_error() {
        let url = serve_once(503, "overloaded").await;
        let c = HttpCompletion::new(&config(url, Duration::from_secs(5))).unwrap();
        match c.complete("sys", "hi").await {
            Err(CompletionError::Server { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected Server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_are_malformed() {
        let url = serve_once(200, r#"{"choices":[]}"#).await;
        let c = HttpCompletion::new(&config(url, Duration::from_secs(5))).unwrap();
        assert!(matches!(
            c.complete("sys", "hi").await,
            Err(CompletionError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn bad_json_is_json_error() {
        let url = serve_once(200, "not json").await;
        let c = HttpCompletion::new(&config(url, Duration::from_secs(5))).unwrap();
        assert!(matches!(
            c.complete("sys", "hi").await,
            Err(CompletionError::Json(_))
        ));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        let c = HttpCompletion::new(&config(
            format!("http://{addr}"),
            Duration::from_millis(200),
        ))
        .unwrap();
        let err = c.complete("sys", "hi").await.unwrap_err();
        assert!(
            matches!(err, CompletionError::Timeout(_)),
            "unexpected error: {err:?}"
        );
    }
}
