// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Keyword rule evaluation.
//!
//! [`evaluate_rules`] is a pure function over input text and user-authored
//! [`Rule`]s.  It never touches the plugin registry, the cache, or the rate
//! limiter.
//!
//! ## Evaluation Order
//!
//! 1. Disabled rules and rules with an unsupported condition type are
//!    skipped.
//! 2. The remaining rules are visited by **descending** `priority`; rules
//!    with equal priority keep their list order.
//! 3. Each rule's expression is tokenised into keywords (stop words
//!    removed) and scored as `matched keywords / keywords`.
//! 4. The first rule with a non-zero overlap triggers an `EXECUTE` decision
//!    with confidence `round(overlap * 100)`.
//!
//! When nothing triggers the result is a `DELEGATE` decision with zero
//! confidence.

use hashbrown::HashSet;
use serde_json::Value;

use crate::types::{Action, ConditionType, Decision, RiskAssessment, RiskLevel, Rule};

/// Words ignored when turning a rule expression into keywords.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of",
    "on", "or", "the", "this", "that", "to", "will", "with",
];

/// Lower-cased alphanumeric tokens of `text`.
///
/// ```rust
/// use arbiter_core::rules::tokenize;
///
/// let tokens = tokenize("Fund developer-grants, NOW!");
/// assert!(tokens.contains("developer"));
/// assert!(tokens.contains("grants"));
/// assert!(tokens.contains("now"));
/// ```
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

/// Distinct keywords of a rule expression, in expression order.
pub fn keywords(expression: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    expression
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

/// Keywords of a single rule that appear in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub matched: Vec<String>,
    pub total: usize,
}

impl RuleMatch {
    /// `matched / total`, or `0` for an expression with no keywords.
    pub fn overlap_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched.len() as f64 / self.total as f64
        }
    }
}

pub fn match_rule(rule: &Rule, input_tokens: &HashSet<String>) -> RuleMatch {
    let keywords = keywords(&rule.condition.expression);
    let total = keywords.len();
    let matched = keywords
        .into_iter()
        .filter(|keyword| input_tokens.contains(keyword))
        .collect();
    RuleMatch { matched, total }
}

/// Evaluate `rules` against `text` and return the resulting decision.
///
/// # Examples
///
/// ```rust
/// use arbiter_core::rules::evaluate_rules;
/// use arbiter_core::types::{Action, Rule};
/// use serde_json::json;
///
/// let rules = vec![Rule::natural_language(
///     "r1",
///     "Builder grants",
///     "developer grants ecosystem funding",
///     json!("YES"),
/// )];
///
/// let decision = evaluate_rules(
///     "This proposal will fund developer grants for ecosystem growth",
///     &rules,
/// );
/// assert_eq!(decision.action, Action::Execute);
/// assert_eq!(decision.confidence, 75.0);
/// assert!(decision.reasoning[0].contains("Builder grants"));
/// assert_eq!(decision.metadata["vote"], json!("YES"));
/// ```
pub fn evaluate_rules(text: &str, rules: &[Rule]) -> Decision {
    let input_tokens = tokenize(text);

    let mut ordered: Vec<&Rule> = rules
        .iter()
        .filter(|rule| rule.enabled)
        .filter(|rule| rule.condition.condition_type == ConditionType::NaturalLanguage)
        .collect();
    // Stable: equal priorities keep list order.
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

    for rule in ordered {
        let rule_match = match_rule(rule, &input_tokens);
        let overlap = rule_match.overlap_ratio();
        if overlap <= 0.0 {
            continue;
        }
        return triggered_decision(rule, &rule_match, overlap);
    }

    Decision::new(Action::Delegate, 0.0, vec!["No rule matched".into()])
        .with_risk(RiskAssessment::new(RiskLevel::Medium).with_factor("no user rule applies"))
}

fn triggered_decision(rule: &Rule, rule_match: &RuleMatch, overlap: f64) -> Decision {
    let reasoning = vec![
        format!(
            "Rule \"{}\" triggered: {} of {} keywords matched ({})",
            rule.name,
            rule_match.matched.len(),
            rule_match.total,
            rule_match.matched.join(", ")
        ),
        format!("Action '{}' configured by the rule", rule.action.action_type),
    ];

    Decision::new(Action::Execute, (overlap * 100.0).round(), reasoning)
        .with_metadata("vote", rule.action.vote())
        .with_metadata("triggeredRuleId", Value::String(rule.id.clone()))
        .with_metadata("ruleAction", Value::String(rule.action.action_type.clone()))
        .with_metadata(
            "matchedKeywords",
            Value::Array(rule_match.matched.iter().cloned().map(Value::String).collect()),
        )
        .with_risk(RiskAssessment::new(RiskLevel::Low).with_factor("user-authored rule"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RuleAction, RuleCondition};
    use serde_json::json;

    fn rule(id: &str, expression: &str, priority: i32) -> Rule {
        Rule::natural_language(id, id, expression, json!(id.to_uppercase())).with_priority(priority)
    }

    #[test]
    fn test_no_rules_delegates() {
        let decision = evaluate_rules("anything", &[]);
        assert_eq!(decision.action, Action::Delegate);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.reasoning, vec!["No rule matched".to_string()]);
    }

    #[test]
    fn test_higher_priority_wins() {
        let rules = vec![rule("low", "treasury", 1), rule("high", "treasury spend", 5)];
        let decision = evaluate_rules("treasury report", &rules);
        assert_eq!(decision.metadata["triggeredRuleId"], json!("high"));
        assert_eq!(decision.confidence, 50.0);
    }

    #[test]
    fn test_equal_priority_keeps_list_order() {
        let rules = vec![rule("first", "vote", 0), rule("second", "vote", 0)];
        let decision = evaluate_rules("please vote", &rules);
        assert_eq!(decision.metadata["triggeredRuleId"], json!("first"));
    }

    #[test]
    fn test_disabled_and_unsupported_rules_are_skipped() {
        let mut unsupported = rule("regex", "vote", 10);
        unsupported.condition = RuleCondition {
            condition_type: ConditionType::Unsupported,
            expression: "vote".into(),
        };
        let rules = vec![rule("off", "vote", 9).disabled(), unsupported, rule("on", "vote", 0)];
        let decision = evaluate_rules("vote now", &rules);
        assert_eq!(decision.metadata["triggeredRuleId"], json!("on"));
    }

    #[test]
    fn test_stop_word_only_expression_never_triggers() {
        let rules = vec![rule("empty", "the and of", 0)];
        let decision = evaluate_rules("the cost of the upgrade and more", &rules);
        assert_eq!(decision.action, Action::Delegate);
    }

    #[test]
    fn test_vote_missing_is_null() {
        let rules = vec![Rule {
            id: "r".into(),
            name: "no vote".into(),
            condition: RuleCondition {
                condition_type: ConditionType::NaturalLanguage,
                expression: "upgrade".into(),
            },
            action: RuleAction { action_type: "notify".into(), parameters: Default::default() },
            enabled: true,
            priority: 0,
        }];
        let decision = evaluate_rules("protocol upgrade", &rules);
        assert_eq!(decision.metadata["vote"], Value::Null);
        assert_eq!(decision.confidence, 100.0);
    }

    #[test]
    fn test_rule_deserialises_from_json() {
        let rule: Rule = serde_json::from_value(json!({
            "id": "r1",
            "name": "Grants",
            "condition": { "type": "natural_language", "expression": "grants" },
            "action": { "type": "vote", "parameters": { "vote": "YES" } },
            "priority": 3
        }))
        .unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.priority, 3);
        assert_eq!(rule.action.vote(), json!("YES"));
    }
}
