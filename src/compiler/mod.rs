//! Graph compiler: a sanitized plan becomes an engine-ready workflow graph.
//!
//! Every step maps to exactly one node, linked linearly from the trigger.
//! Per-kind normalization (chains, token addresses, price feeds, condition
//! strings) happens here so the engine only ever sees canonical config.
//! Normalization failures with a safe default degrade to warnings; only
//! structural failures are errors.

pub mod condition;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::catalog::{self, BlockDefinition, SCHEDULE_BLOCK_ID};
use crate::chains;
use crate::error::{FlowError, Result};
use crate::models::plan::{Plan, Step};
use crate::models::workflow::{
    NodeKind, NodeMetadata, Position, WorkflowEdge, WorkflowNode, WorkflowSpec,
};

pub const DEFAULT_INTERVAL_SECONDS: u64 = 300;
pub const DEFAULT_DURATION_SECONDS: u64 = 86_400;
const DEFAULT_STALENESS_SECONDS: u64 = 3_600;

const NODE_SPACING_X: f64 = 260.0;
const NODE_ROW_Y: f64 = 120.0;

const DEFAULT_CATEGORY: &str = "automation";

/// Caller-supplied context merged into node configs during compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    pub conversation_id: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub provider_connection_id: Option<String>,
}

/// Recurring-trigger parameters derived from a leading schedule step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub interval_seconds: u64,
    pub duration_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
}

#[derive(Debug)]
pub struct CompileOutput {
    pub workflow: WorkflowSpec,
    pub warnings: Vec<String>,
    pub schedule: Option<Schedule>,
}

pub fn compile(plan: &Plan, ctx: &CompileContext) -> Result<CompileOutput> {
    if plan.steps.is_empty() {
        return Err(FlowError::EmptyPlan);
    }

    let mut warnings = Vec::new();
    let mut steps = plan.steps.as_slice();

    let (trigger, schedule) = if steps[0].block_id == SCHEDULE_BLOCK_ID {
        if steps.len() == 1 {
            return Err(FlowError::NoActionableSteps);
        }
        let (node, schedule) = schedule_trigger(&steps[0], &mut warnings);
        steps = &steps[1..];
        (node, Some(schedule))
    } else {
        (manual_trigger(), None)
    };

    let mut nodes = vec![trigger];
    for step in steps {
        let block = catalog::get(&step.block_id)
            .ok_or_else(|| FlowError::UnknownBlock(step.block_id.clone()))?;
        if block.kind == NodeKind::ScheduleTrigger {
            // A schedule is only meaningful as the entry point.
            warnings.push("ignoring a schedule step that is not the first step".to_string());
            continue;
        }
        let node = build_node(block, step, nodes.len(), ctx, &mut warnings);
        nodes.push(node);
    }
    if nodes.len() == 1 {
        return Err(FlowError::NoActionableSteps);
    }

    link_adjacent_outputs(&mut nodes);

    let edges: Vec<WorkflowEdge> = nodes
        .windows(2)
        .map(|pair| WorkflowEdge::linear(&pair[0].id, &pair[1].id))
        .collect();

    let workflow = WorkflowSpec {
        name: plan.workflow_name.clone(),
        description: plan.description.clone(),
        trigger_node_id: nodes[0].id.clone(),
        nodes,
        edges,
        category: ctx
            .category
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        tags: ctx.tags.clone(),
        is_public: false,
    };
    validate(&workflow)?;

    Ok(CompileOutput {
        workflow,
        warnings,
        schedule,
    })
}

fn build_node(
    block: &'static BlockDefinition,
    step: &Step,
    index: usize,
    ctx: &CompileContext,
    warnings: &mut Vec<String>,
) -> WorkflowNode {
    let config = match block.kind {
        NodeKind::PriceOracle => oracle_config(block, step, warnings),
        NodeKind::Condition => condition_config(step),
        NodeKind::Swap => swap_config(block, step, warnings),
        NodeKind::Notification => notification_config(step, ctx, warnings),
        NodeKind::ManualTrigger | NodeKind::ScheduleTrigger => base_config(step),
    };
    WorkflowNode {
        id: node_id(),
        kind: block.kind,
        name: block.label.to_string(),
        description: step.purpose.clone(),
        config,
        position: position(index),
        metadata: NodeMetadata {
            block_id: block.id.to_string(),
        },
    }
}

fn manual_trigger() -> WorkflowNode {
    WorkflowNode {
        id: node_id(),
        kind: NodeKind::ManualTrigger,
        name: "Manual start".to_string(),
        description: "Start the workflow on demand".to_string(),
        config: Map::new(),
        position: position(0),
        metadata: NodeMetadata {
            block_id: "manual".to_string(),
        },
    }
}

fn schedule_trigger(step: &Step, warnings: &mut Vec<String>) -> (WorkflowNode, Schedule) {
    let interval_seconds = schedule_field(
        step,
        &["intervalSeconds", "interval"],
        DEFAULT_INTERVAL_SECONDS,
        "interval",
        warnings,
    );
    let duration_seconds = schedule_field(
        step,
        &["durationSeconds", "duration"],
        DEFAULT_DURATION_SECONDS,
        "duration",
        warnings,
    );
    let cron = hint(step, &["cron"]).map(str::to_string);

    let mut config = Map::new();
    config.insert("intervalSeconds".to_string(), json!(interval_seconds));
    config.insert("durationSeconds".to_string(), json!(duration_seconds));
    if let Some(cron) = &cron {
        config.insert("cron".to_string(), json!(cron));
    }

    let node = WorkflowNode {
        id: node_id(),
        kind: NodeKind::ScheduleTrigger,
        name: "Schedule".to_string(),
        description: step.purpose.clone(),
        config,
        position: position(0),
        metadata: NodeMetadata {
            block_id: SCHEDULE_BLOCK_ID.to_string(),
        },
    };
    let schedule = Schedule {
        interval_seconds,
        duration_seconds,
        cron,
    };
    (node, schedule)
}

/// Schedule parameters are always safe to default, so a bad hint is a
/// warning, never a failure.
fn schedule_field(
    step: &Step,
    keys: &[&str],
    default: u64,
    label: &str,
    warnings: &mut Vec<String>,
) -> u64 {
    match hint(step, keys) {
        Some(raw) => match parse_positive(raw) {
            Some(value) => value,
            None => {
                warnings.push(format!(
                    "invalid schedule {label} '{raw}'; using default {default}s"
                ));
                default
            }
        },
        None => {
            warnings.push(format!("schedule {label} not set; using default {default}s"));
            default
        }
    }
}

fn oracle_config(
    block: &'static BlockDefinition,
    step: &Step,
    warnings: &mut Vec<String>,
) -> Map<String, Value> {
    let mut config = base_config(step);

    let provider = match hint(step, &["provider"]).map(str::to_lowercase).as_deref() {
        Some("pyth") => "pyth",
        Some("chainlink") => "chainlink",
        _ if block.id == "pyth_price" => "pyth",
        _ => "chainlink",
    };
    let chain = chains::normalize(hint(step, &["chain", "network"]).unwrap_or(""));

    let explicit = hint(step, &["pair", "feed"]);
    let asset = hint(step, &["asset", "symbol"]);
    let currency = hint(step, &["currency", "quote"]);

    // Tier 1: the hint names a registered feed symbol outright.
    let exact = explicit
        .map(|pair| pair.trim().to_uppercase())
        .and_then(|pair| chains::feed(&chain, &pair).map(|address| (pair, address)));

    let (pair, feed_address) = match exact {
        Some(resolved) => resolved,
        None => {
            // Tier 2: rebuild a pair from asset/currency hints.
            let candidate = match (explicit.or(asset), currency) {
                (Some(base), Some(quote)) if !base.contains('/') => {
                    chains::normalize_pair(&format!("{base}/{quote}"))
                }
                (Some(base), _) => chains::normalize_pair(base),
                (None, _) => String::new(),
            };
            match chains::feed(&chain, &candidate) {
                Some(address) => (candidate, address),
                None => {
                    warnings.push(format!(
                        "no {chain} price feed for '{}'; defaulting to ETH/USD on Ethereum",
                        explicit.or(asset).unwrap_or("unspecified")
                    ));
                    ("ETH/USD".to_string(), chains::FALLBACK_FEED)
                }
            }
        }
    };

    let staleness = hint(step, &["stalenessSeconds", "staleness"])
        .and_then(parse_positive)
        .unwrap_or(DEFAULT_STALENESS_SECONDS);
    let output_key = hint(step, &["output", "outputKey"]).unwrap_or(condition::ORACLE_OUTPUT_KEY);

    config.insert("provider".to_string(), json!(provider));
    config.insert("chain".to_string(), json!(chain));
    config.insert("pair".to_string(), json!(pair));
    config.insert("feedAddress".to_string(), json!(feed_address));
    config.insert("stalenessSeconds".to_string(), json!(staleness));
    config.insert(
        "outputs".to_string(),
        json!({ condition::ORACLE_OUTPUT_KEY: output_key }),
    );
    config
}

fn condition_config(step: &Step) -> Map<String, Value> {
    let mut config = base_config(step);
    let parsed = hint(step, &["condition", "expression", "when"])
        .map(condition::parse)
        .unwrap_or_default();
    if let Value::Object(fields) = json!(parsed) {
        config.extend(fields);
    }
    config
}

struct ResolvedToken {
    symbol: String,
    address: String,
    decimals: u32,
}

fn swap_config(
    block: &'static BlockDefinition,
    step: &Step,
    warnings: &mut Vec<String>,
) -> Map<String, Value> {
    let mut config = base_config(step);

    let provider = if block.id == "oneinch_swap" {
        "oneinch"
    } else {
        "uniswap"
    };
    let chain = chains::normalize(hint(step, &["chain", "network"]).unwrap_or(""));
    let token_in = resolve_token(&chain, hint(step, &["from", "tokenIn", "sell"]), "input", warnings);
    let token_out = resolve_token(&chain, hint(step, &["to", "tokenOut", "buy"]), "output", warnings);

    if let Some(amount) = hint(step, &["amount", "amountIn"]) {
        match chains::to_base_units(amount, token_in.decimals) {
            Some(units) => {
                config.insert("amountIn".to_string(), json!(units));
            }
            None => warnings.push(format!("could not parse swap amount '{amount}'")),
        }
    } else {
        warnings.push("swap amount not specified".to_string());
    }

    config.insert("provider".to_string(), json!(provider));
    config.insert("chain".to_string(), json!(chain));
    config.insert(
        "tokenIn".to_string(),
        json!({"symbol": token_in.symbol, "address": token_in.address, "decimals": token_in.decimals}),
    );
    config.insert(
        "tokenOut".to_string(),
        json!({"symbol": token_out.symbol, "address": token_out.address, "decimals": token_out.decimals}),
    );
    config
}

/// Unknown symbols degrade to the zero address so compilation can finish;
/// the engine rejects the node if it is ever actually executed.
fn resolve_token(
    chain: &str,
    symbol: Option<&str>,
    side: &str,
    warnings: &mut Vec<String>,
) -> ResolvedToken {
    let symbol = symbol.unwrap_or("").trim();
    if symbol.is_empty() {
        warnings.push(format!("swap is missing its {side} token"));
        return ResolvedToken {
            symbol: String::new(),
            address: chains::ZERO_ADDRESS.to_string(),
            decimals: 18,
        };
    }
    match chains::token(chain, symbol) {
        Some(info) => ResolvedToken {
            symbol: symbol.to_uppercase(),
            address: info.address.to_string(),
            decimals: info.decimals,
        },
        None => {
            warnings.push(format!(
                "unknown token '{symbol}' on {chain}; using the zero address"
            ));
            ResolvedToken {
                symbol: symbol.to_uppercase(),
                address: chains::ZERO_ADDRESS.to_string(),
                decimals: 18,
            }
        }
    }
}

fn notification_config(
    step: &Step,
    ctx: &CompileContext,
    warnings: &mut Vec<String>,
) -> Map<String, Value> {
    let mut config = base_config(step);

    let has_message = config
        .get("message")
        .and_then(Value::as_str)
        .is_some_and(|message| !message.trim().is_empty());
    if !has_message {
        config.insert("message".to_string(), json!(step.purpose));
    }

    if !config.contains_key("chatId")
        && let Some(conversation_id) = &ctx.conversation_id
    {
        config.insert("chatId".to_string(), json!(conversation_id));
    }
    if !config.contains_key("connectionId") {
        match &ctx.provider_connection_id {
            Some(connection_id) => {
                config.insert("connectionId".to_string(), json!(connection_id));
            }
            None => warnings.push(
                "notification has no connectionId; the engine is likely to reject it".to_string(),
            ),
        }
    }
    config
}

/// A notification directly after an oracle reports the reading it is about,
/// unless the planner already templated the message itself.
fn link_adjacent_outputs(nodes: &mut [WorkflowNode]) {
    for i in 1..nodes.len() {
        if nodes[i - 1].kind != NodeKind::PriceOracle || nodes[i].kind != NodeKind::Notification {
            continue;
        }
        let oracle_id = nodes[i - 1].id.clone();
        let config = &mut nodes[i].config;
        let message = config
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if message.contains("{{") {
            continue;
        }
        let linked = format!(
            "{} {{{{{oracle_id}.{}}}}}",
            message.trim_end(),
            condition::ORACLE_OUTPUT_KEY
        );
        config.insert("message".to_string(), json!(linked.trim()));
    }
}

/// Re-check the graph invariants before handing the workflow out. A
/// violation here is a compiler bug, not bad input.
fn validate(workflow: &WorkflowSpec) -> Result<()> {
    let triggers = workflow
        .nodes
        .iter()
        .filter(|node| node.kind.is_trigger())
        .count();
    if triggers != 1 {
        return Err(FlowError::GraphInvariant(format!(
            "expected exactly one trigger node, found {triggers}"
        )));
    }
    let trigger = workflow
        .trigger_node()
        .ok_or_else(|| FlowError::GraphInvariant("trigger id points at no node".to_string()))?;
    if !trigger.kind.is_trigger() {
        return Err(FlowError::GraphInvariant(format!(
            "trigger node has non-trigger kind {:?}",
            trigger.kind
        )));
    }
    if workflow.nodes.len() < 2 {
        return Err(FlowError::GraphInvariant(
            "workflow has no action nodes".to_string(),
        ));
    }
    for node in &workflow.nodes {
        if node.kind.is_trigger() {
            continue;
        }
        let has_incoming = workflow.edges.iter().any(|edge| edge.target == node.id);
        if !has_incoming {
            return Err(FlowError::GraphInvariant(format!(
                "node {} has no incoming edge",
                node.id
            )));
        }
    }
    Ok(())
}

fn base_config(step: &Step) -> Map<String, Value> {
    step.config_hints
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect()
}

fn hint<'a>(step: &'a Step, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| step.config_hints.get(*key))
        .map(String::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|value| *value > 0)
}

fn node_id() -> String {
    format!("node_{}", Uuid::new_v4().simple())
}

fn position(index: usize) -> Position {
    Position {
        x: NODE_SPACING_X * index as f64,
        y: NODE_ROW_Y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn step(block_id: &str, hints: &[(&str, &str)]) -> Step {
        Step {
            block_id: block_id.to_string(),
            purpose: format!("{block_id} step"),
            config_hints: hints
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn plan(steps: Vec<Step>) -> Plan {
        Plan {
            workflow_name: "Test".to_string(),
            description: "Test plan".to_string(),
            steps,
            missing_inputs: Vec::new(),
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert!(matches!(
            compile(&plan(Vec::new()), &CompileContext::default()),
            Err(FlowError::EmptyPlan)
        ));
    }

    #[test]
    fn test_schedule_only_plan_rejected() {
        let result = compile(
            &plan(vec![step("schedule", &[])]),
            &CompileContext::default(),
        );
        assert!(matches!(result, Err(FlowError::NoActionableSteps)));
    }

    #[test]
    fn test_unknown_block_rejected() {
        let result = compile(
            &plan(vec![step("teleport", &[])]),
            &CompileContext::default(),
        );
        assert!(matches!(result, Err(FlowError::UnknownBlock(id)) if id == "teleport"));
    }

    #[test]
    fn test_manual_trigger_synthesized() {
        let output = compile(
            &plan(vec![
                step("chainlink_price", &[("pair", "ETH/USD")]),
                step("telegram_notification", &[]),
            ]),
            &CompileContext::default(),
        )
        .unwrap();

        assert!(output.schedule.is_none());
        assert_eq!(output.workflow.nodes.len(), 3);
        assert_eq!(output.workflow.edges.len(), 2);
        assert_eq!(
            output.workflow.trigger_node().unwrap().kind,
            NodeKind::ManualTrigger
        );
    }

    #[test]
    fn test_schedule_step_becomes_trigger() {
        let output = compile(
            &plan(vec![
                step(
                    "schedule",
                    &[("intervalSeconds", "60"), ("durationSeconds", "7200")],
                ),
                step("chainlink_price", &[("pair", "ETH/USD")]),
                step("condition", &[("condition", "ETH/USD < 1750")]),
                step("telegram_notification", &[]),
            ]),
            &CompileContext::default(),
        )
        .unwrap();

        let schedule = output.schedule.unwrap();
        assert_eq!(schedule.interval_seconds, 60);
        assert_eq!(schedule.duration_seconds, 7200);
        assert_eq!(output.workflow.nodes.len(), 4);
        assert_eq!(output.workflow.edges.len(), 3);
        assert_eq!(
            output.workflow.trigger_node().unwrap().kind,
            NodeKind::ScheduleTrigger
        );
    }

    #[test]
    fn test_schedule_defaults_and_warnings() {
        let output = compile(
            &plan(vec![
                step("schedule", &[("intervalSeconds", "-5")]),
                step("telegram_notification", &[]),
            ]),
            &CompileContext::default(),
        )
        .unwrap();

        let schedule = output.schedule.unwrap();
        assert_eq!(schedule.interval_seconds, DEFAULT_INTERVAL_SECONDS);
        assert_eq!(schedule.duration_seconds, DEFAULT_DURATION_SECONDS);
        assert!(output.warnings.iter().any(|w| w.contains("interval")));
        assert!(output.warnings.iter().any(|w| w.contains("duration")));
    }

    #[test]
    fn test_non_leading_schedule_step_ignored() {
        let output = compile(
            &plan(vec![
                step("telegram_notification", &[]),
                step("schedule", &[]),
            ]),
            &CompileContext::default(),
        )
        .unwrap();

        assert_eq!(output.workflow.nodes.len(), 2);
        assert!(output.warnings.iter().any(|w| w.contains("schedule")));
    }

    #[test]
    fn test_oracle_feed_resolution() {
        let output = compile(
            &plan(vec![step(
                "chainlink_price",
                &[("pair", "eth-usd"), ("chain", "arbitrum")],
            )]),
            &CompileContext::default(),
        )
        .unwrap();

        let oracle = &output.workflow.nodes[1];
        assert_eq!(oracle.config["chain"], "ARBITRUM");
        assert_eq!(oracle.config["pair"], "ETH/USD");
        assert_eq!(
            oracle.config["feedAddress"],
            "0x639Fe6ab55C921f74e7fac1ee960C0B6293ba612"
        );
        assert_eq!(oracle.config["stalenessSeconds"], 3600);
        assert_eq!(oracle.config["outputs"]["price"], "price");
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_oracle_falls_back_to_default_feed() {
        let output = compile(
            &plan(vec![step("chainlink_price", &[("asset", "DOGE")])]),
            &CompileContext::default(),
        )
        .unwrap();

        let oracle = &output.workflow.nodes[1];
        assert_eq!(oracle.config["feedAddress"], chains::FALLBACK_FEED);
        assert!(output.warnings.iter().any(|w| w.contains("DOGE")));
    }

    #[test]
    fn test_pyth_provider_from_block_id() {
        let output = compile(
            &plan(vec![step("pyth_price", &[("pair", "ETH/USD")])]),
            &CompileContext::default(),
        )
        .unwrap();
        assert_eq!(output.workflow.nodes[1].config["provider"], "pyth");
    }

    #[test]
    fn test_condition_config_from_string() {
        let output = compile(
            &plan(vec![step("condition", &[("condition", "ETH/USD < 1750")])]),
            &CompileContext::default(),
        )
        .unwrap();

        let node = &output.workflow.nodes[1];
        assert_eq!(node.config["leftPath"], "price");
        assert_eq!(node.config["operator"], "lt");
        assert_eq!(node.config["rightValue"], "1750");
    }

    #[test]
    fn test_condition_without_string_is_empty_triple() {
        let output = compile(
            &plan(vec![step("condition", &[])]),
            &CompileContext::default(),
        )
        .unwrap();

        let node = &output.workflow.nodes[1];
        assert_eq!(node.config["leftPath"], "");
        assert_eq!(node.config["rightValue"], "");
        assert!(node.config.get("operator").is_none());
    }

    #[test]
    fn test_swap_token_and_amount_normalization() {
        let output = compile(
            &plan(vec![step(
                "uniswap_swap",
                &[
                    ("chain", "ethereum"),
                    ("from", "usdc"),
                    ("to", "eth"),
                    ("amount", "250.5"),
                ],
            )]),
            &CompileContext::default(),
        )
        .unwrap();

        let swap = &output.workflow.nodes[1];
        assert_eq!(swap.config["provider"], "uniswap");
        assert_eq!(
            swap.config["tokenIn"]["address"],
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
        );
        assert_eq!(swap.config["tokenIn"]["decimals"], 6);
        assert_eq!(swap.config["amountIn"], "250500000");
        assert_eq!(
            swap.config["tokenOut"]["address"],
            "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
        );
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_swap_unknown_token_warns_not_fails() {
        let output = compile(
            &plan(vec![step(
                "uniswap_swap",
                &[("from", "PEPE"), ("to", "USDC"), ("amount", "10")],
            )]),
            &CompileContext::default(),
        )
        .unwrap();

        let swap = &output.workflow.nodes[1];
        assert_eq!(swap.config["tokenIn"]["address"], chains::ZERO_ADDRESS);
        assert!(output.warnings.iter().any(|w| w.contains("PEPE")));
    }

    #[test]
    fn test_notification_context_injection() {
        let ctx = CompileContext {
            conversation_id: Some("chat-77".to_string()),
            provider_connection_id: Some("conn-1".to_string()),
            ..CompileContext::default()
        };
        let output = compile(
            &plan(vec![step("telegram_notification", &[])]),
            &ctx,
        )
        .unwrap();

        let node = &output.workflow.nodes[1];
        assert_eq!(node.config["chatId"], "chat-77");
        assert_eq!(node.config["connectionId"], "conn-1");
        assert_eq!(node.config["message"], "telegram_notification step");
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_notification_without_connection_warns() {
        let output = compile(
            &plan(vec![step("telegram_notification", &[])]),
            &CompileContext::default(),
        )
        .unwrap();
        assert!(output.warnings.iter().any(|w| w.contains("connectionId")));
    }

    #[test]
    fn test_notification_after_oracle_gets_template() {
        let output = compile(
            &plan(vec![
                step("chainlink_price", &[("pair", "ETH/USD")]),
                step("telegram_notification", &[("message", "ETH price:")]),
            ]),
            &CompileContext::default(),
        )
        .unwrap();

        let oracle_id = output.workflow.nodes[1].id.clone();
        let message = output.workflow.nodes[2].config["message"].as_str().unwrap();
        assert_eq!(message, format!("ETH price: {{{{{oracle_id}.price}}}}"));
    }

    #[test]
    fn test_existing_template_left_alone() {
        let output = compile(
            &plan(vec![
                step("chainlink_price", &[("pair", "ETH/USD")]),
                step(
                    "telegram_notification",
                    &[("message", "price is {{oracle.price}}")],
                ),
            ]),
            &CompileContext::default(),
        )
        .unwrap();

        let message = output.workflow.nodes[2].config["message"].as_str().unwrap();
        assert_eq!(message, "price is {{oracle.price}}");
    }

    #[test]
    fn test_edges_are_linear_and_deterministic() {
        let output = compile(
            &plan(vec![
                step("chainlink_price", &[("pair", "ETH/USD")]),
                step("condition", &[("condition", "price < 1")]),
                step("telegram_notification", &[]),
            ]),
            &CompileContext::default(),
        )
        .unwrap();

        let nodes = &output.workflow.nodes;
        let edges = &output.workflow.edges;
        assert_eq!(edges.len(), 3);
        for (i, edge) in edges.iter().enumerate() {
            assert_eq!(edge.source, nodes[i].id);
            assert_eq!(edge.target, nodes[i + 1].id);
            assert_eq!(edge.id, format!("{}->{}", edge.source, edge.target));
            assert!(edge.source_handle.is_none());
            assert!(edge.condition.is_empty());
        }
    }

    #[test]
    fn test_price_alert_end_to_end_shape() {
        // "Alert me when ETH drops below 1750"
        let output = compile(
            &plan(vec![
                step("schedule", &[]),
                step("chainlink_price", &[("pair", "ETH/USD")]),
                step("condition", &[("condition", "ETH/USD < 1750")]),
                step("telegram_notification", &[]),
            ]),
            &CompileContext::default(),
        )
        .unwrap();

        assert_eq!(output.workflow.nodes.len(), 4);
        assert_eq!(output.workflow.edges.len(), 3);
        let schedule = output.schedule.unwrap();
        assert_eq!(schedule.interval_seconds, DEFAULT_INTERVAL_SECONDS);
        assert_eq!(schedule.duration_seconds, DEFAULT_DURATION_SECONDS);
        assert_eq!(
            output.workflow.nodes[2].config["leftPath"],
            condition::ORACLE_OUTPUT_KEY
        );
    }
}
