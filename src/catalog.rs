//! Block catalog: the fixed registry of actions the planner may propose.
//!
//! Planner-facing block ids map to engine-facing node kinds; several block
//! ids can share a kind (every swap provider compiles to the generic swap
//! node). The catalog is immutable and process-wide.

use crate::models::workflow::NodeKind;

#[derive(Debug, Clone, Copy)]
pub struct BlockDefinition {
    pub id: &'static str,
    pub kind: NodeKind,
    pub label: &'static str,
    pub description: &'static str,
}

impl BlockDefinition {
    /// Blocks that act on behalf of the user (move funds, message them)
    /// need a linked engine account before execution.
    pub fn requires_linked_account(&self) -> bool {
        matches!(self.kind, NodeKind::Swap | NodeKind::Notification)
    }
}

/// Reserved scheduling block; only meaningful as the first step of a plan.
pub const SCHEDULE_BLOCK_ID: &str = "schedule";

const BLOCKS: &[BlockDefinition] = &[
    BlockDefinition {
        id: SCHEDULE_BLOCK_ID,
        kind: NodeKind::ScheduleTrigger,
        label: "Schedule",
        description: "Re-run the workflow on an interval within a bounded window",
    },
    BlockDefinition {
        id: "chainlink_price",
        kind: NodeKind::PriceOracle,
        label: "Chainlink price",
        description: "Read an asset price from a Chainlink feed",
    },
    BlockDefinition {
        id: "pyth_price",
        kind: NodeKind::PriceOracle,
        label: "Pyth price",
        description: "Read an asset price from a Pyth feed",
    },
    BlockDefinition {
        id: "condition",
        kind: NodeKind::Condition,
        label: "Condition",
        description: "Continue only when a comparison holds",
    },
    BlockDefinition {
        id: "uniswap_swap",
        kind: NodeKind::Swap,
        label: "Uniswap swap",
        description: "Swap one token for another via Uniswap",
    },
    BlockDefinition {
        id: "oneinch_swap",
        kind: NodeKind::Swap,
        label: "1inch swap",
        description: "Swap one token for another via 1inch",
    },
    BlockDefinition {
        id: "telegram_notification",
        kind: NodeKind::Notification,
        label: "Telegram message",
        description: "Send the user a Telegram message",
    },
];

pub fn all() -> &'static [BlockDefinition] {
    BLOCKS
}

pub fn get(id: &str) -> Option<&'static BlockDefinition> {
    BLOCKS.iter().find(|block| block.id == id)
}

/// Resolve a planner-supplied identifier: exact id first, then a normalized
/// form, then the alias table. Returns None for anything unrecognizable.
pub fn resolve(raw: &str) -> Option<&'static BlockDefinition> {
    if let Some(block) = get(raw) {
        return Some(block);
    }
    let normalized = raw.trim().to_lowercase().replace([' ', '-'], "_");
    if let Some(block) = get(&normalized) {
        return Some(block);
    }
    alias(&normalized).and_then(get)
}

fn alias(normalized: &str) -> Option<&'static str> {
    match normalized {
        "swap" | "token_swap" | "dex_swap" => Some("uniswap_swap"),
        "price" | "price_feed" | "oracle" | "price_oracle" => Some("chainlink_price"),
        "notify" | "notification" | "alert" | "telegram" | "message" => {
            Some("telegram_notification")
        }
        "timer" | "cron" | "schedule_trigger" | "recurring" => Some(SCHEDULE_BLOCK_ID),
        _ => None,
    }
}
