//! HTTP utilities for GCP REST API calls

use crate::error::ApiError;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::sync::Arc;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and masks potentially sensitive patterns
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    /// Create a new HTTP client
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tgcp-inventory/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request to a GCP API
    pub async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<Value, ApiError> {
        tracing::debug!("GET {}", url);

        let request = self.client.get(url).query(query).bearer_auth(token);
        self.execute(request, url).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(url).query(query).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request, url).await
    }

    async fn execute(&self, request: RequestBuilder, url: &str) -> Result<Value, ApiError> {
        let transport = |source| ApiError::Transport {
            url: url.to_string(),
            source: Arc::new(source),
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(classify_failure(status, &body, url));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source: Arc::new(source),
        })
    }
}

/// Map a non-success response to an [`ApiError`]
///
/// GCP answers 403 both for missing permissions and for some quota
/// failures; only the former is an access denial.
pub fn classify_failure(status: StatusCode, body: &str, url: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error"))
        .to_string();

    let reasons: Vec<&str> = error
        .and_then(|e| e.get("errors"))
        .and_then(|e| e.as_array())
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("reason").and_then(|r| r.as_str()))
                .collect()
        })
        .unwrap_or_default();
    let rate_limited = reasons
        .iter()
        .any(|r| matches!(*r, "rateLimitExceeded" | "userRateLimitExceeded" | "quotaExceeded"));

    if status == StatusCode::FORBIDDEN && !rate_limited {
        return ApiError::AccessDenied {
            url: url.to_string(),
            message,
        };
    }

    ApiError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        message,
    }
}

/// Short user-facing hint for an API failure
///
/// Provider messages can name projects and principals, so HTTP failures are
/// reported by status class only.
pub fn format_gcp_error(error: &ApiError) -> String {
    let hint = match error {
        ApiError::Auth(_) => {
            "Authentication failed. Run 'gcloud auth application-default login'."
        }
        ApiError::Transport { .. } => {
            "Request failed. Check your network connection and try again."
        }
        ApiError::Decode { .. } => "Unexpected response from GCP.",
        ApiError::AccessDenied { .. } => "Permission denied. Check your GCP IAM permissions.",
        ApiError::Status { status, .. } => match status {
            401 => "Authentication failed. Run 'gcloud auth application-default login'.",
            403 => "Forbidden. A quota or rate limit may have been exceeded.",
            404 => "Resource not found. Is the API enabled for this project?",
            429 => "Rate limit exceeded. Please try again later.",
            400 => "Invalid request. Check the project and region.",
            500..=599 => "GCP service temporarily unavailable. Please try again.",
            _ => "Request failed.",
        },
    };
    hint.to_string()
}
