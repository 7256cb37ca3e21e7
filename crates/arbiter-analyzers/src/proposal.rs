// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Governance proposal structure analyzer.
//!
//! Classifies a proposal into one of five [`ProposalType`]s by keyword
//! category counts, then derives risk and action from the type:
//!
//! | Type         | Base risk | Action at base risk |
//! |--------------|-----------|---------------------|
//! | `treasury`   | high      | `DELEGATE`          |
//! | `technical`  | high      | `DELEGATE`          |
//! | `governance` | medium    | `WAIT`              |
//! | `social`     | low       | `EXECUTE`           |
//! | `other`      | medium    | `WAIT`              |
//!
//! Urgency keywords raise the risk one level; `critical` risk maps to
//! `ALERT`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use arbiter_core::types::{
    Action, AnalysisRequest, AnalysisResult, Decision, RiskAssessment, RiskLevel,
};
use arbiter_core::AnalyzerPlugin;

use crate::words;

pub const NAME: &str = "proposal-structure";
pub const VERSION: &str = "1.0.0";

const TREASURY: &[&str] = &[
    "treasury", "fund", "funds", "funding", "budget", "grant", "grants", "allocate", "allocation",
    "spend", "spending", "payment", "payments", "reserves", "diversification", "usdc", "stablecoin",
    "compensation", "revenue",
];

const TECHNICAL: &[&str] = &[
    "upgrade", "contract", "contracts", "protocol", "code", "audit", "parameter", "parameters",
    "deploy", "deployment", "migration", "migrate", "bug", "patch", "security", "oracle",
    "implementation", "integration",
];

const GOVERNANCE: &[&str] = &[
    "governance", "vote", "voting", "quorum", "delegate", "delegates", "council", "election",
    "constitution", "charter", "amendment", "policy", "framework", "threshold", "veto",
];

const SOCIAL: &[&str] = &[
    "community", "event", "events", "marketing", "education", "partnership", "ambassador",
    "ambassadors", "meetup", "outreach", "hackathon", "social", "content", "awareness",
];

const URGENCY: &[&str] = &[
    "urgent", "emergency", "immediately", "immediate", "critical", "exploit", "asap", "deadline",
    "attack",
];

/// Proposal category.  Declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalType {
    Treasury,
    Technical,
    Governance,
    Social,
    Other,
}

impl ProposalType {
    /// Keyword-bearing categories, in tie-break order.
    pub const SCORED: [ProposalType; 4] = [
        ProposalType::Treasury,
        ProposalType::Technical,
        ProposalType::Governance,
        ProposalType::Social,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProposalType::Treasury   => "treasury",
            ProposalType::Technical  => "technical",
            ProposalType::Governance => "governance",
            ProposalType::Social     => "social",
            ProposalType::Other      => "other",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            ProposalType::Treasury   => TREASURY,
            ProposalType::Technical  => TECHNICAL,
            ProposalType::Governance => GOVERNANCE,
            ProposalType::Social     => SOCIAL,
            ProposalType::Other      => &[],
        }
    }

    pub fn base_risk(self) -> RiskLevel {
        match self {
            ProposalType::Treasury   => RiskLevel::High,
            ProposalType::Technical  => RiskLevel::High,
            ProposalType::Governance => RiskLevel::Medium,
            ProposalType::Social     => RiskLevel::Low,
            ProposalType::Other      => RiskLevel::Medium,
        }
    }
}

/// Per-category keyword counts plus urgency markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Counts in [`ProposalType::SCORED`] order.
    pub counts: [usize; 4],
    pub proposal_type: ProposalType,
    pub urgency_keywords: Vec<String>,
}

impl Classification {
    pub fn is_urgent(&self) -> bool {
        !self.urgency_keywords.is_empty()
    }

    pub fn risk_level(&self) -> RiskLevel {
        let base = self.proposal_type.base_risk();
        if self.is_urgent() {
            base.raised()
        } else {
            base
        }
    }

    fn top_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    fn total_count(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Classify `text` by keyword category.
///
/// The category with the most keyword occurrences wins; ties go to the
/// earlier category in [`ProposalType::SCORED`]; no matches at all yields
/// [`ProposalType::Other`].
///
/// ```rust
/// use arbiter_analyzers::proposal::{classify, ProposalType};
///
/// let grants = classify("Allocate treasury funds to developer grants");
/// assert_eq!(grants.proposal_type, ProposalType::Treasury);
///
/// // One treasury and one technical keyword: treasury wins the tie.
/// let tied = classify("budget for the upgrade");
/// assert_eq!(tied.proposal_type, ProposalType::Treasury);
/// ```
pub fn classify(text: &str) -> Classification {
    let mut counts = [0usize; 4];
    let mut urgency_keywords = Vec::new();

    for word in words(text) {
        for (slot, category) in ProposalType::SCORED.iter().enumerate() {
            if category.keywords().contains(&word.as_str()) {
                counts[slot] += 1;
            }
        }
        if URGENCY.contains(&word.as_str()) && !urgency_keywords.contains(&word) {
            urgency_keywords.push(word);
        }
    }

    let mut proposal_type = ProposalType::Other;
    let mut best = 0usize;
    for (slot, category) in ProposalType::SCORED.iter().enumerate() {
        // Strictly greater keeps the earlier category on ties.
        if counts[slot] > best {
            best = counts[slot];
            proposal_type = *category;
        }
    }

    Classification { counts, proposal_type, urgency_keywords }
}

fn action_for(risk: RiskLevel) -> Action {
    match risk {
        RiskLevel::Low      => Action::Execute,
        RiskLevel::Medium   => Action::Wait,
        RiskLevel::High     => Action::Delegate,
        RiskLevel::Critical => Action::Alert,
    }
}

/// Confidence reflects how clearly one category dominates.
fn confidence_for(classification: &Classification) -> f64 {
    let total = classification.total_count();
    if classification.proposal_type == ProposalType::Other || total == 0 {
        return 30.0;
    }
    let share = classification.top_count() as f64 / total as f64;
    (40.0 + 50.0 * share).round().min(90.0)
}

pub fn decide(classification: &Classification) -> Decision {
    let risk_level = classification.risk_level();
    let action = action_for(risk_level);

    let mut risk = RiskAssessment::new(risk_level).with_factor(format!(
        "{} proposals carry {:?} base risk",
        classification.proposal_type.as_str(),
        classification.proposal_type.base_risk()
    ));
    if classification.is_urgent() {
        risk = risk.with_factor(format!(
            "urgency markers: {}",
            classification.urgency_keywords.join(", ")
        ));
    }

    let mut reasoning = vec![format!(
        "Classified as a {} proposal ({} of {} category keywords)",
        classification.proposal_type.as_str(),
        classification.top_count(),
        classification.total_count()
    )];
    if classification.is_urgent() {
        reasoning.push("Urgency language raises the risk one level".to_owned());
    }
    reasoning.push(format!("Risk {:?} maps to {}", risk_level, action.as_str()));

    let mut category_counts = Map::new();
    for (slot, category) in ProposalType::SCORED.iter().enumerate() {
        category_counts.insert(category.as_str().to_owned(), Value::from(classification.counts[slot]));
    }

    Decision::new(action, confidence_for(classification), reasoning)
        .with_metadata("proposalType", Value::String(classification.proposal_type.as_str().to_owned()))
        .with_metadata("categoryCounts", Value::Object(category_counts))
        .with_metadata("urgent", Value::Bool(classification.is_urgent()))
        .with_risk(risk)
}

/// Proposal-structure analyzer plugin.  Reads `input.text`, or `title` and
/// `description`.
#[derive(Debug, Clone)]
pub struct ProposalAnalyzer {
    types: Vec<String>,
}

impl ProposalAnalyzer {
    pub fn new() -> Self {
        Self { types: vec!["governance_proposal".to_owned(), "proposal".to_owned()] }
    }
}

impl Default for ProposalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalyzerPlugin for ProposalAnalyzer {
    fn name(&self) -> &str { NAME }
    fn version(&self) -> &str { VERSION }
    fn supported_types(&self) -> &[String] { &self.types }

    fn validate(&self, request: &AnalysisRequest) -> bool {
        request.input.text_content().is_some()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let Some(text) = request.input.text_content() else {
            return AnalysisResult::failure("missing proposal text", NAME);
        };

        let classification = classify(&text);
        debug!(
            request_id = %request.id,
            proposal_type = classification.proposal_type.as_str(),
            urgent = classification.is_urgent(),
            "proposal classified"
        );
        AnalysisResult::success(decide(&classification), NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::types::AnalysisInput;

    #[test]
    fn test_no_keywords_is_other() {
        let classification = classify("Lorem ipsum dolor sit amet");
        assert_eq!(classification.proposal_type, ProposalType::Other);
        assert_eq!(classification.risk_level(), RiskLevel::Medium);
        assert_eq!(confidence_for(&classification), 30.0);
    }

    #[test]
    fn test_tie_break_order() {
        assert_eq!(classify("vote on the meetup").proposal_type, ProposalType::Governance);
        assert_eq!(classify("audit the council").proposal_type, ProposalType::Technical);
        assert_eq!(classify("community hackathon quorum").proposal_type, ProposalType::Social);
    }

    #[test]
    fn test_urgency_raises_risk_and_action() {
        let calm = decide(&classify("Upgrade the oracle contract"));
        assert_eq!(calm.risk_assessment.level, RiskLevel::High);
        assert_eq!(calm.action, Action::Delegate);

        let urgent = decide(&classify("Emergency upgrade of the oracle contract"));
        assert_eq!(urgent.risk_assessment.level, RiskLevel::Critical);
        assert_eq!(urgent.action, Action::Alert);
        assert_eq!(urgent.metadata["urgent"], Value::Bool(true));
    }

    #[test]
    fn test_social_proposal_executes() {
        let decision = decide(&classify("Sponsor a community meetup and education event"));
        assert_eq!(decision.metadata["proposalType"], Value::String("social".into()));
        assert_eq!(decision.action, Action::Execute);
        assert_eq!(decision.metadata["categoryCounts"]["social"], Value::from(4));
    }

    #[tokio::test]
    async fn test_reads_title_and_description() {
        let analyzer = ProposalAnalyzer::new();
        let input = AnalysisInput {
            title: Some("Treasury diversification".into()),
            description: Some("Move 20% of reserves into stablecoin".into()),
            ..AnalysisInput::default()
        };
        let request = AnalysisRequest::new("governance_proposal", input);
        assert!(analyzer.validate(&request));

        let result = analyzer.analyze(&request).await;
        assert!(result.success);
        let decision = result.decision.unwrap();
        assert_eq!(decision.metadata["proposalType"], Value::String("treasury".into()));
        assert_eq!(decision.action, Action::Delegate);
    }
}
