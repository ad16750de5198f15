//! Outbound notification channel.
//!
//! The tracker and the orchestration service only ever need "send this text
//! to that conversation"; everything else about the chat transport lives
//! outside this crate. Failures are logged by callers and never treated as
//! fatal: the pipeline keeps going whether or not a message lands.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Message severity, rendered as a leading emoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl MessageLevel {
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Info => "ℹ️",
            Self::Success => "✅",
            Self::Warning => "⚠️",
            Self::Error => "❌",
        }
    }
}

pub fn format_message(level: MessageLevel, text: &str) -> String {
    format!("{} {}", level.emoji(), text)
}

/// Minimal send-text seam over the chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()>;
}

/// Telegram Bot API implementation.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_base: "https://api.telegram.org".to_string(),
            bot_token: bot_token.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()> {
        if !self.is_configured() {
            return Err(anyhow!("telegram bot token not configured"));
        }
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let response = self
            .http
            .post(&url)
            .json(&json!({"chat_id": conversation_id, "text": text}))
            .send()
            .await
            .context("telegram sendMessage request failed")?;
        response
            .error_for_status()
            .context("telegram sendMessage rejected")?;
        Ok(())
    }
}

/// Recording notifier for tests.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        fail: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// A notifier whose sends always fail, for failure-path tests.
        pub fn failing() -> Self {
            Self {
                sent: Arc::default(),
                fail: true,
            }
        }

        pub async fn sent_messages(&self) -> Vec<(String, String)> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()> {
            if self.fail {
                return Err(anyhow!("simulated send failure"));
            }
            self.sent
                .lock()
                .await
                .push((conversation_id.to_string(), text.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message_levels() {
        assert_eq!(format_message(MessageLevel::Success, "done"), "✅ done");
        assert!(format_message(MessageLevel::Warning, "careful").starts_with("⚠️"));
    }

    #[test]
    fn test_unconfigured_notifier() {
        let notifier = TelegramNotifier::new("", Duration::from_secs(5));
        assert!(!notifier.is_configured());
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = mock::RecordingNotifier::new();
        notifier.send_text("chat-1", "hello").await.unwrap();
        let sent = notifier.sent_messages().await;
        assert_eq!(sent, vec![("chat-1".to_string(), "hello".to_string())]);
    }
}
