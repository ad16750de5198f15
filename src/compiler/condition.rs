//! Parsing of human-readable comparison strings ("ETH/USD < 1750") into the
//! structured triple the condition node evaluates at runtime.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The key every price-oracle node publishes its reading under. Condition
/// left sides written as a pair symbol are rewritten to this so they can be
/// evaluated against the preceding oracle's result.
pub const ORACLE_OUTPUT_KEY: &str = "price";

/// Comparison operators, widest first so `<=` wins over `<` and `=` is
/// only ever a last resort.
const OPERATORS: &[(&str, Comparator)] = &[
    ("<=", Comparator::Lte),
    (">=", Comparator::Gte),
    ("==", Comparator::Eq),
    ("!=", Comparator::Neq),
    ("<", Comparator::Lt),
    (">", Comparator::Gt),
    ("=", Comparator::Eq),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
}

/// Structured condition. The empty triple (no operator) is valid and means
/// "nothing to evaluate"; the engine treats it as always-true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCondition {
    pub left_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Comparator>,
    pub right_value: String,
}

static PAIR_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{2,10}/[A-Za-z]{2,10}$").expect("valid regex"));

/// Parse a comparison string. Never fails: anything without a recognizable
/// operator yields the empty triple.
pub fn parse(raw: &str) -> ParsedCondition {
    for (symbol, comparator) in OPERATORS {
        if let Some(index) = raw.find(symbol) {
            let left = raw[..index].trim();
            let right = raw[index + symbol.len()..].trim();
            let left_path = if PAIR_SYMBOL.is_match(left) {
                ORACLE_OUTPUT_KEY.to_string()
            } else {
                left.to_string()
            };
            return ParsedCondition {
                left_path,
                operator: Some(*comparator),
                right_value: right.to_string(),
            };
        }
    }
    ParsedCondition::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_symbol_rewritten_to_oracle_key() {
        let condition = parse("ETH/USD < 1750");
        assert_eq!(condition.left_path, ORACLE_OUTPUT_KEY);
        assert_eq!(condition.operator, Some(Comparator::Lt));
        assert_eq!(condition.right_value, "1750");
    }

    #[test]
    fn test_plain_path_preserved() {
        let condition = parse("price >= 10");
        assert_eq!(condition.left_path, "price");
        assert_eq!(condition.operator, Some(Comparator::Gte));
        assert_eq!(condition.right_value, "10");
    }

    #[test]
    fn test_wide_operators_win_over_narrow() {
        assert_eq!(parse("a <= 1").operator, Some(Comparator::Lte));
        assert_eq!(parse("a == 1").operator, Some(Comparator::Eq));
        assert_eq!(parse("a != 1").operator, Some(Comparator::Neq));
    }

    #[test]
    fn test_single_equals_normalized() {
        let condition = parse("status = done");
        assert_eq!(condition.operator, Some(Comparator::Eq));
        assert_eq!(condition.right_value, "done");
    }

    #[test]
    fn test_unparseable_yields_empty_triple() {
        let condition = parse("when the moon is full");
        assert_eq!(condition, ParsedCondition::default());
        assert!(condition.operator.is_none());
    }
}
