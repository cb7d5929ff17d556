//! Gemini token counting
//!
//! Calls `POST {base}/{version}/models/{model}:countTokens` with the file
//! text as a single user part and reads back `totalTokens`.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::backends::retry::RetryPolicy;
use crate::backends::TokenCounter;
use crate::core::error::CountError;

pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct CountTokensRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> CountTokensRequest<'a> {
    fn text(text: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    // Omitted by the service when the count is zero
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Connection settings for the counting service
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub api_version: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::none(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Blocking client for the `countTokens` endpoint
#[derive(Debug)]
pub struct GeminiCounter {
    http: Client,
    api_key: String,
    base_url: String,
    api_version: String,
    retry: RetryPolicy,
}

impl GeminiCounter {
    pub fn new(config: GeminiConfig) -> Result<Self, CountError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            http,
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version,
            retry: config.retry,
        })
    }

    fn count_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!(
            "{}/{}/models/{}:countTokens",
            self.base_url, self.api_version, model
        )
    }

    fn count_once(&self, model: &str, content: &str) -> Result<u64, CountError> {
        let response = self
            .http
            .post(self.count_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&CountTokensRequest::text(content))
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().map_err(transport_error)?;

        if !status.is_success() {
            return Err(parse_api_error(status, &body));
        }

        let parsed: CountTokensResponse =
            serde_json::from_str(&body).map_err(|e| CountError::Decode(e.to_string()))?;
        Ok(parsed.total_tokens)
    }
}

impl TokenCounter for GeminiCounter {
    fn count_tokens(&self, model: &str, content: &str) -> Result<u64, CountError> {
        let tokens = self.retry.run(|| self.count_once(model, content))?;
        debug!(model, bytes = content.len(), tokens, "countTokens");
        Ok(tokens)
    }
}

fn transport_error(err: reqwest::Error) -> CountError {
    CountError::Transport {
        transient: err.is_timeout() || err.is_connect(),
        message: err.to_string(),
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> CountError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let code = status.as_u16();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CountError::Auth {
            status: code,
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => CountError::RateLimited(message),
        _ => CountError::Api {
            status: code,
            message,
        },
    }
}
