//! Inference backend client.
//!
//! The pipeline only needs "prompt in, text out", expressed as the
//! [`ModelClient`] trait so the concrete backend stays swappable. The
//! shipped implementation speaks a messages-style JSON API over HTTPS.
//! Throttling responses are retried with exponential backoff and jitter;
//! every other failure propagates to the caller.

use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use crate::error::RevbotError;

const MAX_RETRIES: u32 = 3;
const API_KEY_ENV: &str = "REVBOT_API_KEY";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// One inference request.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
}

/// Seam between the pipeline and the inference service.
pub trait ModelClient {
    /// Sends one request and returns the raw response text.
    fn complete(
        &self,
        request: &ModelRequest,
    ) -> impl std::future::Future<Output = Result<String, RevbotError>> + Send;
}

/// Messages-API client (Anthropic-compatible wire shape).
pub struct MessagesApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl MessagesApiClient {
    /// Builds a client for `base_url`, reading the API key from the
    /// `REVBOT_API_KEY` environment variable.
    pub fn from_env(base_url: &str) -> Result<Self, RevbotError> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| RevbotError::Config(format!("{API_KEY_ENV} is not set")))?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        })
    }
}

impl ModelClient for MessagesApiClient {
    async fn complete(&self, request: &ModelRequest) -> Result<String, RevbotError> {
        let body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "system": request.system_prompt,
            "messages": [{ "role": "user", "content": request.user_prompt }],
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 || status.as_u16() == 529 {
            return Err(RevbotError::Throttled(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RevbotError::Backend(format!("HTTP {status}: {detail}")));
        }

        let parsed: MessagesResponse = response.json().await?;
        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if text.is_empty() {
            return Err(RevbotError::Backend("response contained no text blocks".to_owned()));
        }
        Ok(text)
    }
}

/// Calls the backend, retrying throttled attempts with backoff and jitter.
///
/// Non-throttling errors propagate immediately; the final throttled attempt
/// propagates as-is so the caller sees the real failure.
pub async fn complete_with_retry<M: ModelClient>(
    client: &M,
    request: &ModelRequest,
) -> Result<String, RevbotError> {
    let mut attempt = 1;
    loop {
        match client.complete(request).await {
            Err(RevbotError::Throttled(detail)) if attempt < MAX_RETRIES => {
                let backoff_ms = 2u64.pow(attempt) * 1000 + rand::thread_rng().gen_range(0..1000);
                tracing::warn!(
                    attempt,
                    max = MAX_RETRIES,
                    backoff_ms,
                    %detail,
                    "backend throttled, retrying"
                );
                tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
