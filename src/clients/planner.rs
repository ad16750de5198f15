//! Planning endpoint client.
//!
//! The planner is an external generative-model service. Requests are signed
//! (timestamp plus a keyed digest over method, path, and body) and carry a
//! correlation id. Whatever comes back is untrusted text; sanitization is
//! entirely the caller's job.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::catalog;
use crate::error::{FlowError, Result};

const PLAN_PATH: &str = "/v1/plan";

/// One structured chat-style planning request.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub system: String,
    pub user: String,
    pub request_id: String,
}

/// The planning endpoint as the core consumes it.
#[async_trait]
pub trait PlannerApi: Send + Sync {
    /// Returns the model's raw response text.
    async fn generate_plan(&self, request: &PlanRequest) -> Result<String>;
}

pub struct PlannerClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    agent_id: String,
    signing_secret: String,
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    content: String,
}

impl PlannerClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        agent_id: impl Into<String>,
        signing_secret: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            agent_id: agent_id.into(),
            signing_secret: signing_secret.into(),
        }
    }

    fn sign(&self, method: &str, path: &str, timestamp_ms: i64, body: &str) -> String {
        let canonical = format!(
            "{}:{method}:{path}:{timestamp_ms}:{body}",
            self.signing_secret
        );
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}

#[async_trait]
impl PlannerApi for PlannerClient {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<String> {
        let body = json!({
            "model": self.model,
            "requestId": request.request_id,
            "agentId": self.agent_id,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
        });
        let body_text = body.to_string();
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let signature = self.sign("POST", PLAN_PATH, timestamp_ms, &body_text);

        let response = self
            .http
            .post(format!("{}{PLAN_PATH}", self.base_url))
            .header("X-Timestamp", timestamp_ms.to_string())
            .header("X-Signature", signature)
            .header("Content-Type", "application/json")
            .body(body_text)
            .send()
            .await
            .map_err(|error| FlowError::Planner(error.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| FlowError::Planner(error.to_string()))?;
        if !status.is_success() {
            let mut end = text.len().min(200);
            while end > 0 && !text.is_char_boundary(end) {
                end -= 1;
            }
            return Err(FlowError::Planner(format!(
                "planner returned {status}: {}",
                &text[..end]
            )));
        }

        // Prefer the structured envelope; tolerate a bare-text response.
        match serde_json::from_str::<PlanResponse>(&text) {
            Ok(parsed) => Ok(parsed.content),
            Err(_) => Ok(text),
        }
    }
}

/// System prompt enumerating the blocks the planner may use.
pub fn system_prompt() -> String {
    let mut prompt = String::from(
        "You turn user requests into automation plans. Respond with a JSON \
         object containing workflowName, description, steps, missingInputs, \
         and notes. Each step has a blockId, a purpose, and configHints with \
         string values only. Available blocks:\n",
    );
    for block in catalog::all() {
        prompt.push_str(&format!("- {}: {}\n", block.id, block.description));
    }
    prompt.push_str(
        "Use the schedule block only as the first step. List anything you \
         could not resolve in missingInputs instead of guessing.",
    );
    prompt
}

/// User content with context hints folded in.
pub fn user_content(prompt: &str, hints: &std::collections::HashMap<String, String>) -> String {
    if hints.is_empty() {
        return prompt.to_string();
    }
    let mut content = String::from(prompt);
    content.push_str("\n\nKnown context:\n");
    let mut keys: Vec<_> = hints.keys().collect();
    keys.sort();
    for key in keys {
        content.push_str(&format!("- {key}: {}\n", hints[key]));
    }
    content
}
