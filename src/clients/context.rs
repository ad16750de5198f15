//! Best-effort context hints.
//!
//! The context endpoint returns a sparse, allow-listed key/value map for a
//! conversation (linked wallet, preferred chain, defaults the user has set
//! elsewhere). Absence of a configured endpoint and any request failure
//! both mean "no context"; planning never blocks on it.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Fields requested on the first planning pass.
pub const DEFAULT_FIELDS: &[&str] = &["wallet", "chain", "slippage", "chatId"];

#[async_trait]
pub trait ContextApi: Send + Sync {
    /// Never fails; an empty map is the degenerate answer.
    async fn fetch(
        &self,
        user_id: &str,
        conversation_id: &str,
        fields: &[String],
        prompt: &str,
    ) -> HashMap<String, String>;
}

pub struct ContextClient {
    http: reqwest::Client,
    base_url: Option<String>,
    agent_id: String,
}

#[derive(Debug, Deserialize)]
struct ContextResponse {
    #[serde(default)]
    context: HashMap<String, serde_json::Value>,
}

impl ContextClient {
    pub fn new(base_url: Option<String>, agent_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            agent_id: agent_id.into(),
        }
    }
}

#[async_trait]
impl ContextApi for ContextClient {
    async fn fetch(
        &self,
        user_id: &str,
        conversation_id: &str,
        fields: &[String],
        prompt: &str,
    ) -> HashMap<String, String> {
        let Some(base_url) = &self.base_url else {
            debug!("context endpoint not configured; continuing without hints");
            return HashMap::new();
        };

        let body = json!({
            "agentId": self.agent_id,
            "userId": user_id,
            "conversationId": conversation_id,
            "fields": fields,
            "prompt": prompt,
        });

        let result = self
            .http
            .post(format!("{base_url}/context"))
            .json(&body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                warn!(error = %error, "context fetch failed; continuing without hints");
                return HashMap::new();
            }
        };
        match response.error_for_status() {
            Ok(response) => match response.json::<ContextResponse>().await {
                Ok(parsed) => parsed
                    .context
                    .into_iter()
                    .filter_map(|(key, value)| {
                        value.as_str().map(|text| (key, text.to_string()))
                    })
                    .collect(),
                Err(error) => {
                    warn!(error = %error, "context response unparsable; continuing without hints");
                    HashMap::new()
                }
            },
            Err(error) => {
                warn!(error = %error, "context fetch rejected; continuing without hints");
                HashMap::new()
            }
        }
    }
}
