//! Workflow engine API client.
//!
//! Every call carries a bounded timeout and a bounded retry budget with
//! exponential backoff. Retryability is decided from the structured error
//! (status code, transport failure kind), never by pattern-matching message
//! text; the engine's validation details ride along in `details` so callers
//! can react to specific field paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::models::execution::ExecutionStatus;
use crate::models::workflow::WorkflowSpec;

/// Bodies larger than this are cut before they end up in an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("engine returned {status}: {message}")]
    Http {
        status: u16,
        message: String,
        details: Option<Value>,
    },

    #[error("engine unreachable: {0}")]
    Transport(String),
}

impl EngineError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    /// Server errors, throttling, and transport failures are worth another
    /// attempt; anything else is the caller's problem.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => matches!(status, 408 | 429) || *status >= 500,
            Self::Transport(_) => true,
        }
    }

    /// Field paths named by a structured validation error, e.g.
    /// `nodes.2.config.connectionId`. Empty when the error carries none.
    pub fn validation_paths(&self) -> Vec<String> {
        let Self::Http {
            details: Some(details),
            ..
        } = self
        else {
            return Vec::new();
        };
        let entries = details
            .get("validation")
            .and_then(Value::as_array)
            .or_else(|| details.as_array());
        let Some(entries) = entries else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| {
                entry
                    .as_str()
                    .or_else(|| entry.get("path").and_then(Value::as_str))
                    .map(str::to_string)
            })
            .collect()
    }
}

/// Exponential backoff settings for engine calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let delay = (self.initial_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Recurring-trigger registration payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTriggerRequest {
    pub workflow_id: String,
    pub start_at: DateTime<Utc>,
    pub interval_seconds: u64,
    pub duration_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
}

/// Acknowledgement returned when an execution is started.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionHandle {
    pub execution_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The workflow engine as the core consumes it.
#[async_trait]
pub trait EngineApi: Send + Sync {
    async fn create_workflow(
        &self,
        user_id: &str,
        workflow: &WorkflowSpec,
    ) -> Result<String, EngineError>;

    async fn execute_workflow(
        &self,
        user_id: &str,
        workflow_id: &str,
    ) -> Result<ExecutionHandle, EngineError>;

    async fn execution_status(
        &self,
        user_id: &str,
        execution_id: &str,
    ) -> Result<ExecutionStatus, EngineError>;

    async fn list_executions(
        &self,
        user_id: &str,
        workflow_id: &str,
    ) -> Result<Vec<ExecutionStatus>, EngineError>;

    async fn create_time_trigger(
        &self,
        user_id: &str,
        request: &TimeTriggerRequest,
    ) -> Result<String, EngineError>;

    async fn cancel_time_trigger(&self, user_id: &str, trigger_id: &str)
    -> Result<(), EngineError>;
}

pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

impl EngineClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        user_id: &str,
        body: Option<&Value>,
    ) -> Result<T, EngineError> {
        let mut attempt = 0;
        loop {
            match self.send(method.clone(), path, user_id, body).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(path, attempt, error = %error, "engine call failed; retrying");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        user_id: &str,
        body: Option<&Value>,
    ) -> Result<T, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .header("X-User-Id", user_id);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|error| EngineError::Transport(truncate(&error.to_string())))?;

        let status = response.status();
        if status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|error| EngineError::Transport(truncate(&error.to_string())))?;
            // Some endpoints (trigger cancellation) answer with an empty body.
            let value: Value = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text)
                    .map_err(|error| EngineError::Transport(truncate(&error.to_string())))?
            };
            return serde_json::from_value(value)
                .map_err(|error| EngineError::Transport(truncate(&error.to_string())));
        }

        let text = response.text().await.unwrap_or_default();
        let parsed: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        Err(EngineError::Http {
            status: status.as_u16(),
            message: truncate(&parsed.message.unwrap_or(text)),
            details: parsed.details,
        })
    }
}

#[async_trait]
impl EngineApi for EngineClient {
    async fn create_workflow(
        &self,
        user_id: &str,
        workflow: &WorkflowSpec,
    ) -> Result<String, EngineError> {
        let body = serde_json::to_value(workflow)
            .map_err(|error| EngineError::Transport(error.to_string()))?;
        let response: IdResponse = self
            .request(Method::POST, "/workflows", user_id, Some(&body))
            .await?;
        Ok(response.id)
    }

    async fn execute_workflow(
        &self,
        user_id: &str,
        workflow_id: &str,
    ) -> Result<ExecutionHandle, EngineError> {
        self.request(
            Method::POST,
            &format!("/workflows/{workflow_id}/executions"),
            user_id,
            None,
        )
        .await
    }

    async fn execution_status(
        &self,
        user_id: &str,
        execution_id: &str,
    ) -> Result<ExecutionStatus, EngineError> {
        self.request(
            Method::GET,
            &format!("/executions/{execution_id}"),
            user_id,
            None,
        )
        .await
    }

    async fn list_executions(
        &self,
        user_id: &str,
        workflow_id: &str,
    ) -> Result<Vec<ExecutionStatus>, EngineError> {
        self.request(
            Method::GET,
            &format!("/workflows/{workflow_id}/executions"),
            user_id,
            None,
        )
        .await
    }

    async fn create_time_trigger(
        &self,
        user_id: &str,
        request: &TimeTriggerRequest,
    ) -> Result<String, EngineError> {
        let body = serde_json::to_value(request)
            .map_err(|error| EngineError::Transport(error.to_string()))?;
        let response: IdResponse = self
            .request(Method::POST, "/time-triggers", user_id, Some(&body))
            .await?;
        Ok(response.id)
    }

    async fn cancel_time_trigger(
        &self,
        user_id: &str,
        trigger_id: &str,
    ) -> Result<(), EngineError> {
        let _: Value = self
            .request(
                Method::DELETE,
                &format!("/time-triggers/{trigger_id}"),
                user_id,
                None,
            )
            .await?;
        Ok(())
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delay_progression() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for(2), Duration::from_millis(400));
        assert_eq!(retry.delay_for(3), Duration::from_millis(800));
        assert_eq!(retry.delay_for(6), Duration::from_millis(5000));
    }

    #[test]
    fn test_retryability_by_status() {
        let http = |status| EngineError::Http {
            status,
            message: String::new(),
            details: None,
        };
        assert!(http(500).is_retryable());
        assert!(http(503).is_retryable());
        assert!(http(429).is_retryable());
        assert!(http(408).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(!http(401).is_retryable());
        assert!(!http(404).is_retryable());
        assert!(EngineError::Transport("timed out".to_string()).is_retryable());
    }

    #[test]
    fn test_validation_paths_from_details() {
        let error = EngineError::Http {
            status: 400,
            message: "validation failed".to_string(),
            details: Some(json!({
                "validation": [
                    {"path": "nodes.2.config.connectionId", "message": "required"},
                    "nodes.3.config.connectionId"
                ]
            })),
        };
        assert_eq!(
            error.validation_paths(),
            vec![
                "nodes.2.config.connectionId".to_string(),
                "nodes.3.config.connectionId".to_string()
            ]
        );
    }

    #[test]
    fn test_validation_paths_absent() {
        let error = EngineError::Http {
            status: 400,
            message: "bad".to_string(),
            details: None,
        };
        assert!(error.validation_paths().is_empty());
        assert!(
            EngineError::Transport("x".to_string())
                .validation_paths()
                .is_empty()
        );
    }

    #[test]
    fn test_truncate_bounds_error_text() {
        let long = "e".repeat(2000);
        let truncated = truncate(&long);
        assert!(truncated.len() < 600);
        assert!(truncated.ends_with("[truncated]"));
    }
}
