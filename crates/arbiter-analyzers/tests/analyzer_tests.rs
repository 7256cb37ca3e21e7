// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! The bundled analyzers running behind a real `DecisionEngine`.

use arbiter_analyzers::sentiment::{self, EXECUTE_THRESHOLD};
use arbiter_analyzers::{register_defaults, ProposalAnalyzer, SentimentAnalyzer};
use arbiter_core::types::{FallbackStrategy, RequestOptions};
use arbiter_core::{Action, DecisionEngine, EngineConfig, EngineError, RiskLevel};
use serde_json::json;
use std::sync::Arc;

fn engine() -> DecisionEngine {
    let engine = DecisionEngine::new(EngineConfig::default());
    register_defaults(&engine).unwrap();
    engine
}

#[test]
fn test_sentiment_ordering() {
    let positive = sentiment::score("This upgrade is excellent, a really great and promising success!");
    let neutral = sentiment::score("The upgrade is scheduled for block 19000000");
    let negative = sentiment::score("A terrible, awful failure and a likely scam");

    assert!(positive.normalized_score > neutral.normalized_score);
    assert!(neutral.normalized_score > negative.normalized_score);
}

#[tokio::test]
async fn test_sentiment_through_engine() {
    let engine = engine();
    let result = engine
        .analyze("sentiment", json!({ "text": "Great, excellent, very promising growth!" }), None, None)
        .await;

    assert!(result.success);
    assert_eq!(result.provider, "sentiment");
    let decision = result.decision.unwrap();
    assert!(decision.confidence >= EXECUTE_THRESHOLD);
    assert!(decision.confidence <= sentiment::MAX_CONFIDENCE);
    assert_eq!(decision.action, Action::Execute);
    assert_eq!(decision.risk_assessment.level, RiskLevel::Low);
}

#[tokio::test]
async fn test_text_type_is_routed_to_sentiment() {
    let engine = engine();
    let result = engine.analyze("text", json!({ "text": "nothing to see" }), None, None).await;
    assert!(result.success);
    assert_eq!(result.decision.unwrap().action, Action::Wait);
}

#[tokio::test]
async fn test_missing_text_is_rejected_or_falls_back() {
    let engine = engine();

    let surfaced = engine.analyze("sentiment", json!({ "data": {} }), None, None).await;
    assert!(!surfaced.success);
    assert!(!surfaced.error.unwrap_or_default().is_empty());

    let fallback = engine
        .analyze(
            "sentiment",
            json!({ "data": {} }),
            None,
            Some(RequestOptions::with_fallback(FallbackStrategy::Basic)),
        )
        .await;
    assert!(fallback.success);
    assert_eq!(fallback.provider, "fallback");
    assert_eq!(fallback.decision.unwrap().action, Action::Delegate);
}

#[tokio::test]
async fn test_urgent_treasury_proposal_raises_alert() {
    let engine = engine();
    let result = engine
        .analyze(
            "governance_proposal",
            json!({
                "title": "Emergency treasury transfer",
                "description": "Move reserves immediately after the bridge exploit"
            }),
            None,
            None,
        )
        .await;

    assert!(result.success);
    assert_eq!(result.provider, "proposal-structure");
    let decision = result.decision.unwrap();
    assert_eq!(decision.action, Action::Alert);
    assert_eq!(decision.risk_assessment.level, RiskLevel::Critical);
    assert_eq!(decision.metadata["proposalType"], json!("treasury"));
    assert_eq!(decision.metadata["urgent"], json!(true));
}

#[tokio::test]
async fn test_registering_twice_fails_cleanly() {
    let engine = engine();
    assert_eq!(
        engine.load_plugin("sentiment", Arc::new(SentimentAnalyzer::new())),
        Err(EngineError::DuplicatePlugin { name: "sentiment".into() })
    );
    // A second copy under a different name is fine.
    engine.load_plugin("proposal-backup", Arc::new(ProposalAnalyzer::new())).unwrap();
    assert_eq!(engine.get_status().plugins_loaded, 3);
}
