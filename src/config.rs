//! Environment-driven settings for the pipeline's external endpoints.

use std::env;
use std::time::Duration;

const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:4000/api";
const DEFAULT_PLANNER_URL: &str = "http://127.0.0.1:8800";
const DEFAULT_PLANNER_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SIGNING_URL_BASE: &str = "https://app.chainflow.io/executions";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Settings {
    pub engine_base_url: String,
    pub engine_api_key: String,
    pub planner_base_url: String,
    pub planner_model: String,
    pub planner_agent_id: String,
    pub planner_signing_secret: String,
    /// Unset means "no context endpoint"; planning proceeds without hints.
    pub context_base_url: Option<String>,
    pub telegram_bot_token: String,
    pub signing_url_base: String,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        let timeout_secs = env::var("CHAINFLOW_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            engine_base_url: env::var("CHAINFLOW_ENGINE_URL")
                .unwrap_or_else(|_| DEFAULT_ENGINE_URL.to_string()),
            engine_api_key: env::var("CHAINFLOW_ENGINE_API_KEY").unwrap_or_default(),
            planner_base_url: env::var("CHAINFLOW_PLANNER_URL")
                .unwrap_or_else(|_| DEFAULT_PLANNER_URL.to_string()),
            planner_model: env::var("CHAINFLOW_PLANNER_MODEL")
                .unwrap_or_else(|_| DEFAULT_PLANNER_MODEL.to_string()),
            planner_agent_id: env::var("CHAINFLOW_AGENT_ID").unwrap_or_default(),
            planner_signing_secret: env::var("CHAINFLOW_PLANNER_SECRET").unwrap_or_default(),
            context_base_url: env::var("CHAINFLOW_CONTEXT_URL").ok(),
            telegram_bot_token: env::var("CHAINFLOW_TELEGRAM_TOKEN").unwrap_or_default(),
            signing_url_base: env::var("CHAINFLOW_SIGNING_URL_BASE")
                .unwrap_or_else(|_| DEFAULT_SIGNING_URL_BASE.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}
