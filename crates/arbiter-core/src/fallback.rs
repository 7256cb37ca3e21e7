// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Built-in `basic` fallback heuristic.
//!
//! Used when every candidate analyzer failed (or none matched) and the
//! request asked for [`FallbackStrategy::Basic`](crate::types::FallbackStrategy).
//! It never attempts a real assessment: it always hands the decision on with
//! `DELEGATE` and a confidence no higher than [`MAX_FALLBACK_CONFIDENCE`].

use serde_json::Value;

use crate::types::{Action, AnalysisRequest, Decision, RiskAssessment, RiskLevel};

pub const MAX_FALLBACK_CONFIDENCE: f64 = 25.0;

/// Build the fallback decision for `request`.  `reason` is the error that
/// caused the fallback and is echoed in the reasoning.
///
/// ```rust
/// use arbiter_core::fallback::basic_decision;
/// use arbiter_core::types::{Action, AnalysisInput, AnalysisRequest};
///
/// let request = AnalysisRequest::new("sentiment", AnalysisInput::from_text("hello world"));
/// let decision = basic_decision(&request, "analysis timeout");
/// assert_eq!(decision.action, Action::Delegate);
/// assert!(decision.confidence <= 25.0);
/// ```
pub fn basic_decision(request: &AnalysisRequest, reason: &str) -> Decision {
    let text = request.input.text_content();
    let word_count = text
        .as_deref()
        .map(|text| text.split_whitespace().count())
        .unwrap_or(0);

    // A little more confidence when there was at least something to read.
    let confidence = match word_count {
        0 => 5.0,
        1..=9 => 15.0,
        _ => MAX_FALLBACK_CONFIDENCE,
    };

    let reasoning = vec![
        format!("No analyzer produced a decision for type '{}': {}", request.request_type, reason),
        format!("Basic heuristic inspected {word_count} words of input"),
        "Delegating to a human reviewer".to_string(),
    ];

    Decision::new(Action::Delegate, confidence, reasoning)
        .with_metadata("fallback", Value::Bool(true))
        .with_metadata("wordCount", Value::from(word_count))
        .with_risk(
            RiskAssessment::new(RiskLevel::Medium)
                .with_factor("decision produced without a specialised analyzer"),
        )
}
