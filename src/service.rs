//! Orchestration: the plan/execute pipeline and per-conversation sessions.
//!
//! One plan or execute call runs the pipeline exactly once, strictly in
//! order: context → planner → sanitizer → compiler → engine → tracker.
//! Monitoring is fire-and-forget; the call returns as soon as the engine
//! has accepted the work.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog;
use crate::channel::Notifier;
use crate::clients::context::{ContextApi, ContextClient, DEFAULT_FIELDS};
use crate::clients::engine::{EngineApi, EngineClient, EngineError, TimeTriggerRequest};
use crate::clients::identity::{IdentityApi, IdentityClient, LinkedAccount};
use crate::clients::planner::{PlanRequest, PlannerApi, PlannerClient, system_prompt, user_content};
use crate::compiler::{self, CompileContext, Schedule};
use crate::config::Settings;
use crate::error::{FlowError, Result};
use crate::models::plan::Plan;
use crate::models::session::Session;
use crate::models::workflow::{NodeKind, WorkflowSpec};
use crate::sanitizer;
use crate::tracker::{ExecutionTracker, TrackerConfig};

/// In-memory session store keyed by conversation id.
///
/// Writes are whole-closure updates under one key; concurrent calls for the
/// same key are last-write-wins, which is fine because a conversation
/// issues one call at a time. Entries are never evicted.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Session> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn update(&self, key: &str, apply: impl FnOnce(&mut Session)) {
        let mut sessions = self.inner.write().await;
        apply(sessions.entry(key.to_string()).or_default());
    }
}

/// What to execute; fields are consulted in priority order.
#[derive(Debug, Default)]
pub struct ExecuteArgs {
    pub prompt: Option<String>,
    pub plan: Option<Plan>,
}

#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    pub workflow_id: String,
    pub execution_id: Option<String>,
    pub time_block_id: Option<String>,
    pub schedule: Option<Schedule>,
    /// Engine account the workflow runs as.
    pub execution_user_id: String,
}

pub struct AutomationService {
    planner: Arc<dyn PlannerApi>,
    context: Arc<dyn ContextApi>,
    engine: Arc<dyn EngineApi>,
    identity: Arc<dyn IdentityApi>,
    sessions: SessionStore,
    tracker: ExecutionTracker,
    category: String,
}

impl AutomationService {
    pub fn new(
        planner: Arc<dyn PlannerApi>,
        context: Arc<dyn ContextApi>,
        engine: Arc<dyn EngineApi>,
        identity: Arc<dyn IdentityApi>,
        notifier: Arc<dyn Notifier>,
        tracker_config: TrackerConfig,
    ) -> Self {
        let tracker = ExecutionTracker::with_config(engine.clone(), notifier, tracker_config);
        Self {
            planner,
            context,
            engine,
            identity,
            sessions: SessionStore::new(),
            tracker,
            category: "automation".to_string(),
        }
    }

    /// Wire up the production clients from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let planner = Arc::new(PlannerClient::new(
            settings.planner_base_url.clone(),
            settings.planner_model.clone(),
            settings.planner_agent_id.clone(),
            settings.planner_signing_secret.clone(),
            settings.request_timeout,
        ));
        let context = Arc::new(ContextClient::new(
            settings.context_base_url.clone(),
            settings.planner_agent_id.clone(),
            settings.request_timeout,
        ));
        let engine = Arc::new(EngineClient::new(
            settings.engine_base_url.clone(),
            settings.engine_api_key.clone(),
            settings.request_timeout,
        ));
        let identity = Arc::new(IdentityClient::new(
            settings.engine_base_url.clone(),
            settings.engine_api_key.clone(),
            settings.request_timeout,
        ));
        let notifier = Arc::new(crate::channel::TelegramNotifier::new(
            settings.telegram_bot_token.clone(),
            settings.request_timeout,
        ));
        let tracker_config = TrackerConfig {
            signing_url_base: settings.signing_url_base.clone(),
            ..TrackerConfig::default()
        };
        Self::new(planner, context, engine, identity, notifier, tracker_config)
    }

    /// Turn a prompt into a plan and remember it for the conversation.
    pub async fn plan(
        &self,
        prompt: &str,
        user_id: &str,
        conversation_key: &str,
    ) -> Result<Plan> {
        let fields: Vec<String> = DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect();
        let mut hints = self
            .context
            .fetch(user_id, conversation_key, &fields, prompt)
            .await;

        let mut plan = self.request_plan(prompt, &hints).await?;

        if !plan.is_complete() {
            // One refinement pass: ask the context endpoint specifically for
            // the fields the planner could not resolve.
            let missing = plan.missing_fields();
            debug!(missing = ?missing, "plan incomplete; fetching targeted context");
            let refinement = self
                .context
                .fetch(user_id, conversation_key, &missing, prompt)
                .await;
            if !refinement.is_empty() {
                hints.extend(refinement);
                plan = self.request_plan(prompt, &hints).await?;
            }
        }

        self.sessions
            .update(conversation_key, |session| {
                session.user_id = user_id.to_string();
                session.last_plan = Some(plan.clone());
            })
            .await;

        info!(
            conversation = conversation_key,
            steps = plan.steps.len(),
            complete = plan.is_complete(),
            "plan ready"
        );
        Ok(plan)
    }

    async fn request_plan(&self, prompt: &str, hints: &HashMap<String, String>) -> Result<Plan> {
        let request = PlanRequest {
            system: system_prompt(),
            user: user_content(prompt, hints),
            request_id: Uuid::new_v4().to_string(),
        };
        let raw = self.planner.generate_plan(&request).await?;
        Ok(sanitizer::sanitize_model_output(&raw))
    }

    /// Compile and launch a plan.
    ///
    /// The plan is resolved with priority: explicit plan, then a fresh plan
    /// from the prompt, then the conversation's last plan.
    pub async fn execute(
        &self,
        args: ExecuteArgs,
        user_id: &str,
        conversation_key: &str,
    ) -> Result<ExecuteOutcome> {
        let plan = match args {
            ExecuteArgs {
                plan: Some(plan), ..
            } => plan,
            ExecuteArgs {
                prompt: Some(prompt),
                ..
            } => self.plan(&prompt, user_id, conversation_key).await?,
            _ => self
                .sessions
                .get(conversation_key)
                .await
                .and_then(|session| session.last_plan)
                .ok_or(FlowError::NoPlanToExecute)?,
        };

        if !plan.is_complete() {
            return Err(FlowError::PlanIncomplete(plan.missing_fields()));
        }

        let link = self.identity.linked_account(conversation_key).await?;
        if link.is_none() && plan_requires_link(&plan) {
            return Err(FlowError::AccountNotLinked);
        }
        let execution_user_id = link
            .as_ref()
            .map(|account| account.user_id.clone())
            .unwrap_or_else(|| user_id.to_string());

        let ctx = CompileContext {
            conversation_id: Some(conversation_key.to_string()),
            category: Some(self.category.clone()),
            tags: vec!["chat".to_string()],
            provider_connection_id: link
                .as_ref()
                .and_then(|account| account.connection_id.clone()),
        };
        let compiled = compiler::compile(&plan, &ctx)?;
        for warning in &compiled.warnings {
            debug!(warning, "compile warning");
        }

        let workflow_id = self
            .create_with_recovery(&execution_user_id, compiled.workflow, link.as_ref())
            .await?;
        info!(workflow_id, "workflow created");

        let mut outcome = ExecuteOutcome {
            workflow_id: workflow_id.clone(),
            execution_id: None,
            time_block_id: None,
            schedule: compiled.schedule.clone(),
            execution_user_id: execution_user_id.clone(),
        };

        match &compiled.schedule {
            Some(schedule) => {
                let request = TimeTriggerRequest {
                    workflow_id: workflow_id.clone(),
                    start_at: chrono::Utc::now(),
                    interval_seconds: schedule.interval_seconds,
                    duration_seconds: schedule.duration_seconds,
                    cron: schedule.cron.clone(),
                };
                let time_block_id = self
                    .engine
                    .create_time_trigger(&execution_user_id, &request)
                    .await?;
                info!(workflow_id, time_block_id, "recurring trigger registered");

                let tracker = self.tracker.clone();
                let window = Duration::from_secs(schedule.duration_seconds);
                let (user, wf, tb, conversation) = (
                    execution_user_id.clone(),
                    workflow_id.clone(),
                    time_block_id.clone(),
                    conversation_key.to_string(),
                );
                tokio::spawn(async move {
                    tracker
                        .track_scheduled(&user, &wf, &tb, &conversation, window)
                        .await;
                });
                outcome.time_block_id = Some(time_block_id);
            }
            None => {
                let handle = self
                    .engine
                    .execute_workflow(&execution_user_id, &workflow_id)
                    .await?;
                info!(workflow_id, execution_id = %handle.execution_id, "execution started");

                let tracker = self.tracker.clone();
                let (user, execution_id, conversation) = (
                    execution_user_id.clone(),
                    handle.execution_id.clone(),
                    conversation_key.to_string(),
                );
                tokio::spawn(async move {
                    tracker
                        .track_execution(&user, &execution_id, &conversation)
                        .await;
                });
                outcome.execution_id = Some(handle.execution_id);
            }
        }

        let outcome_for_session = outcome.clone();
        self.sessions
            .update(conversation_key, move |session| {
                session.user_id = user_id.to_string();
                session.last_plan = Some(plan);
                session.last_workflow_id = Some(outcome_for_session.workflow_id);
                if let Some(id) = outcome_for_session.execution_id {
                    session.last_execution_id = Some(id);
                }
                if let Some(id) = outcome_for_session.time_block_id {
                    session.last_time_block_id = Some(id);
                }
            })
            .await;

        Ok(outcome)
    }

    /// Create the workflow, with one narrow recovery: when the engine's
    /// validation error names missing `connectionId` fields on notification
    /// nodes and the linked account can supply one, patch and retry once.
    /// This is the only automatic retry outside the transport layer.
    async fn create_with_recovery(
        &self,
        user_id: &str,
        mut workflow: WorkflowSpec,
        link: Option<&LinkedAccount>,
    ) -> Result<String> {
        let error = match self.engine.create_workflow(user_id, &workflow).await {
            Ok(id) => return Ok(id),
            Err(error) => error,
        };

        let Some(connection_id) = link.and_then(|account| account.connection_id.as_deref()) else {
            return Err(error.into());
        };
        let indexes = connection_id_paths(&error);
        if indexes.is_empty() || !patch_connection_ids(&mut workflow, &indexes, connection_id) {
            return Err(error.into());
        }

        warn!(
            nodes = ?indexes,
            "workflow creation rejected for missing connectionId; patching and retrying once"
        );
        self.engine
            .create_workflow(user_id, &workflow)
            .await
            .map_err(FlowError::from)
    }

    /// Session snapshot for the transport layer's status commands.
    pub async fn session(&self, conversation_key: &str) -> Option<Session> {
        self.sessions.get(conversation_key).await
    }
}

fn plan_requires_link(plan: &Plan) -> bool {
    plan.steps
        .iter()
        .filter_map(|step| catalog::get(&step.block_id))
        .any(|block| block.requires_linked_account())
}

/// Node indexes named by validation paths like `nodes.2.config.connectionId`.
fn connection_id_paths(error: &EngineError) -> Vec<usize> {
    error
        .validation_paths()
        .iter()
        .filter_map(|path| {
            let mut parts = path.split('.');
            if parts.next() != Some("nodes") {
                return None;
            }
            let index: usize = parts.next()?.parse().ok()?;
            (parts.next() == Some("config") && parts.next() == Some("connectionId"))
                .then_some(index)
        })
        .collect()
}

fn patch_connection_ids(
    workflow: &mut WorkflowSpec,
    indexes: &[usize],
    connection_id: &str,
) -> bool {
    let mut patched = false;
    for &index in indexes {
        if let Some(node) = workflow.nodes.get_mut(index)
            && node.kind == NodeKind::Notification
        {
            node.config
                .insert("connectionId".to_string(), Value::String(connection_id.to_string()));
            patched = true;
        }
    }
    patched
}
