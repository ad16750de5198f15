//! Execution tracking: poll the engine until a terminal outcome and keep
//! the user informed along the way.
//!
//! Trackers run as detached background tasks, one per execution or watched
//! workflow. Poll failures and notification failures are logged and the
//! loop keeps going; only a terminal status (or the watch window ending)
//! stops it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::chains;
use crate::channel::{MessageLevel, Notifier, format_message};
use crate::clients::engine::EngineApi;
use crate::models::execution::{ExecutionPhase, ExecutionStatus};

/// Runs where the engine reports no per-node records: anything that lasted
/// this long almost certainly made it past its first check. Generous on
/// purpose; the per-node signal is authoritative when present.
const MIN_MEANINGFUL_RUN_SECS: i64 = 2;

/// The node type whose success means the automation's goal action ran.
const ACTION_NODE_TYPE: &str = "swap";

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Single-execution polls are frequent; a signature prompt should reach
    /// the user within seconds.
    pub poll_interval: Duration,
    /// Workflow-level sweeps are coarser to keep load off the engine.
    pub schedule_poll_interval: Duration,
    /// Base URL for signing deep links.
    pub signing_url_base: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(4),
            schedule_poll_interval: Duration::from_secs(30),
            signing_url_base: "https://app.chainflow.io/executions".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ExecutionTracker {
    engine: Arc<dyn EngineApi>,
    notifier: Arc<dyn Notifier>,
    config: TrackerConfig,
}

impl ExecutionTracker {
    pub fn new(engine: Arc<dyn EngineApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(engine, notifier, TrackerConfig::default())
    }

    pub fn with_config(
        engine: Arc<dyn EngineApi>,
        notifier: Arc<dyn Notifier>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            engine,
            notifier,
            config,
        }
    }

    /// Track one execution to its terminal status.
    ///
    /// The signing prompt is sent at most once even when the engine reports
    /// `waiting_for_signature` across many polls.
    pub async fn track_execution(
        &self,
        user_id: &str,
        execution_id: &str,
        conversation_id: &str,
    ) -> ExecutionPhase {
        info!(execution_id, "tracking execution");
        let mut signature_prompted = false;

        loop {
            sleep(self.config.poll_interval).await;
            let status = match self.engine.execution_status(user_id, execution_id).await {
                Ok(status) => status,
                Err(error) => {
                    // Transient by assumption; the next tick retries.
                    warn!(execution_id, error = %error, "status poll failed");
                    continue;
                }
            };

            match status.status {
                ExecutionPhase::WaitingForSignature if !signature_prompted => {
                    signature_prompted = true;
                    let link = format!("{}/{execution_id}/sign", self.config.signing_url_base);
                    self.notify(
                        conversation_id,
                        MessageLevel::Warning,
                        &format!("Your automation needs a signature to continue: {link}"),
                    )
                    .await;
                }
                ExecutionPhase::Success => {
                    self.notify_success(conversation_id, &status).await;
                    info!(execution_id, "execution succeeded");
                    return ExecutionPhase::Success;
                }
                ExecutionPhase::Failed => {
                    self.notify_failure(conversation_id, &status).await;
                    info!(execution_id, "execution failed");
                    return ExecutionPhase::Failed;
                }
                _ => {}
            }
        }
    }

    /// Watch a scheduled workflow until its goal is reached or the window
    /// elapses. Failed runs are reported but do not stop the watch; future
    /// scheduled runs may still succeed.
    pub async fn track_scheduled(
        &self,
        user_id: &str,
        workflow_id: &str,
        time_block_id: &str,
        conversation_id: &str,
        window: Duration,
    ) {
        info!(workflow_id, time_block_id, ?window, "watching scheduled workflow");
        let deadline = Instant::now() + window;
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            if Instant::now() >= deadline {
                self.notify(
                    conversation_id,
                    MessageLevel::Warning,
                    "The watch window ended before the automation's goal was reached.",
                )
                .await;
                info!(workflow_id, "watch window elapsed");
                return;
            }

            match self.engine.list_executions(user_id, workflow_id).await {
                Err(error) => {
                    warn!(workflow_id, error = %error, "execution sweep failed");
                }
                Ok(executions) => {
                    for execution in executions {
                        if seen.contains(&execution.id) {
                            continue;
                        }
                        match execution.status {
                            ExecutionPhase::WaitingForSignature => {
                                seen.insert(execution.id.clone());
                                let outcome = self
                                    .track_execution(user_id, &execution.id, conversation_id)
                                    .await;
                                if outcome == ExecutionPhase::Success {
                                    self.cancel_trigger(user_id, time_block_id).await;
                                    return;
                                }
                            }
                            ExecutionPhase::Success => {
                                seen.insert(execution.id.clone());
                                if goal_reached(&execution) {
                                    self.notify_success(conversation_id, &execution).await;
                                    self.cancel_trigger(user_id, time_block_id).await;
                                    info!(workflow_id, execution_id = %execution.id, "goal reached; schedule cancelled");
                                    return;
                                }
                                debug!(
                                    execution_id = %execution.id,
                                    "run completed without the goal action; still watching"
                                );
                            }
                            ExecutionPhase::Failed => {
                                seen.insert(execution.id.clone());
                                self.notify_failure(conversation_id, &execution).await;
                            }
                            // Not terminal yet; revisit on the next sweep.
                            _ => {}
                        }
                    }
                }
            }

            sleep(self.config.schedule_poll_interval).await;
        }
    }

    async fn notify(&self, conversation_id: &str, level: MessageLevel, text: &str) {
        if let Err(error) = self
            .notifier
            .send_text(conversation_id, &format_message(level, text))
            .await
        {
            warn!(conversation_id, error = %error, "notification send failed");
        }
    }

    async fn notify_success(&self, conversation_id: &str, status: &ExecutionStatus) {
        let mut text = String::from("Automation run completed.");
        for reference in status.transaction_refs() {
            let url =
                chains::explorer_tx_url(reference.chain.as_deref().unwrap_or(""), &reference.hash);
            text.push_str(&format!("\nTransaction: {url}"));
        }
        self.notify(conversation_id, MessageLevel::Success, &text).await;
    }

    async fn notify_failure(&self, conversation_id: &str, status: &ExecutionStatus) {
        let text = match &status.error {
            Some(error) => format!("Automation run failed: {}", error.message),
            None => "Automation run failed.".to_string(),
        };
        self.notify(conversation_id, MessageLevel::Error, &text).await;
    }

    async fn cancel_trigger(&self, user_id: &str, trigger_id: &str) {
        if let Err(error) = self.engine.cancel_time_trigger(user_id, trigger_id).await {
            warn!(trigger_id, error = %error, "failed to cancel time trigger");
        }
    }
}

/// Did a successful run actually perform the goal action, or merely pass
/// through with its condition unmet?
fn goal_reached(status: &ExecutionStatus) -> bool {
    if let Some(records) = &status.node_executions {
        let mut actions = records
            .iter()
            .filter(|record| record.node_type == ACTION_NODE_TYPE)
            .peekable();
        if actions.peek().is_some() {
            return actions.any(|record| record.status == ExecutionPhase::Success);
        }
    }
    status
        .run_duration()
        .is_some_and(|duration| duration >= chrono::Duration::seconds(MIN_MEANINGFUL_RUN_SECS))
}
