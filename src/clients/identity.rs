//! Identity-link lookup: which engine account does this conversation act as?
//!
//! Linking happens out of band (a /link flow in the chat transport). Here we
//! only resolve; absence means the features that act on the user's behalf
//! are unavailable.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::engine::EngineError;

/// An engine account linked to a chat conversation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAccount {
    pub user_id: String,
    /// Connection id of the notification provider bound to the account.
    #[serde(default)]
    pub connection_id: Option<String>,
}

#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn linked_account(
        &self,
        conversation_id: &str,
    ) -> Result<Option<LinkedAccount>, EngineError>;
}

pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl IdentityApi for IdentityClient {
    async fn linked_account(
        &self,
        conversation_id: &str,
    ) -> Result<Option<LinkedAccount>, EngineError> {
        let url = format!("{}/links/{conversation_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|error| EngineError::Transport(error.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Http {
                status: status.as_u16(),
                message,
                details: None,
            });
        }
        response
            .json::<LinkedAccount>()
            .await
            .map(Some)
            .map_err(|error| EngineError::Transport(error.to_string()))
    }
}
