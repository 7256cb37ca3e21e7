// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # Basic Decision Engine Example
//!
//! Loads the bundled analyzers, runs a few analyses, evaluates user rules
//! and prints the engine status.  Run with:
//!
//! ```bash
//! RUST_LOG=debug cargo run -p arbiter-analyzers --example basic
//! ```

use arbiter_analyzers::register_defaults;
use arbiter_core::{
    logging::init_logging,
    types::{ActualOutcome, FallbackStrategy, RequestContext, RequestOptions},
    AnalysisResult, DecisionEngine, EngineConfig, EngineEvent, EventKind, LearningRecord, Rule,
};
use serde_json::json;

fn print_result(label: &str, result: &AnalysisResult) {
    match &result.decision {
        Some(decision) => println!(
            "  {label}: {} @ {:.0}% via {} (risk {:?}, cached: {})",
            decision.action.as_str(),
            decision.confidence,
            result.provider,
            decision.risk_assessment.level,
            result.from_cache
        ),
        None => println!(
            "  {label}: failed via {}: {}",
            result.provider,
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

#[tokio::main]
async fn main() {
    let config = EngineConfig::default();
    if let Err(error) = init_logging(&config) {
        eprintln!("logging not initialised: {error}");
    }

    println!("Arbiter Decision Engine: Basic Example\n");

    // -----------------------------------------------------------------------
    // 1. Construct the engine and load analyzers
    // -----------------------------------------------------------------------
    let engine = DecisionEngine::new(config);
    engine.add_event_listener(EventKind::PluginLoaded, |event| {
        if let EngineEvent::PluginLoaded { name, version } = event {
            println!("  loaded {name} v{version}");
        }
    });
    if let Err(error) = register_defaults(&engine) {
        eprintln!("failed to load analyzers: {error}");
        return;
    }
    println!();

    // -----------------------------------------------------------------------
    // 2. Plugin-routed analyses
    // -----------------------------------------------------------------------
    println!("Analyses:");
    let sentiment = engine
        .analyze("sentiment", json!({ "text": "Really great upgrade, very promising results!" }), None, None)
        .await;
    print_result("sentiment", &sentiment);

    let repeat = engine
        .analyze("sentiment", json!({ "text": "Really great upgrade, very promising results!" }), None, None)
        .await;
    print_result("sentiment (repeat)", &repeat);

    let proposal = engine
        .analyze(
            "governance_proposal",
            json!({
                "title": "Emergency oracle upgrade",
                "description": "Patch the price oracle contract immediately after the exploit"
            }),
            Some(RequestContext::for_blockchain("ethereum")),
            None,
        )
        .await;
    print_result("proposal", &proposal);

    let unknown = engine
        .analyze(
            "liquidity_check",
            json!({ "text": "pool depth" }),
            None,
            Some(RequestOptions::with_fallback(FallbackStrategy::Basic)),
        )
        .await;
    print_result("unknown type", &unknown);
    println!();

    // -----------------------------------------------------------------------
    // 3. User-authored rules
    // -----------------------------------------------------------------------
    let rules = vec![
        Rule::natural_language("r-1", "Back builder grants", "developer grants ecosystem funding", json!("YES"))
            .with_priority(10),
        Rule::natural_language("r-2", "Reject treasury drains", "treasury withdrawal", json!("NO")),
    ];
    let ruled = engine.analyze_with_rules(
        json!({ "text": "This proposal will fund developer grants for ecosystem growth" }),
        &rules,
        None,
    );
    println!("Rules:");
    print_result("rules", &ruled);
    if let Some(decision) = &ruled.decision {
        println!("    reasoning: {}", decision.reasoning.join(" / "));
    }
    println!();

    // -----------------------------------------------------------------------
    // 4. Feed an outcome back and print status
    // -----------------------------------------------------------------------
    if let Some(decision) = proposal.decision.clone() {
        let record = LearningRecord {
            user_id: "user-1".into(),
            session_id: "session-1".into(),
            request_id: "proposal-1".into(),
            decision,
            actual_outcome: ActualOutcome { success: true, errors: Vec::new(), timestamp_ms: 0 },
            user_feedback: None,
            timestamp_ms: 0,
            context: RequestContext::default(),
        };
        if let Err(error) = engine.record_learning(record) {
            eprintln!("learning record rejected: {error}");
        }
    }

    let status = engine.get_status();
    println!("Status:");
    println!("  plugins loaded:  {}", status.plugins_loaded);
    println!(
        "  cache:           {} keys, {} hits, {} misses",
        status.cache_size.keys, status.cache_size.hits, status.cache_size.misses
    );
    if let Some(rate) = status.rate_limit_status {
        println!("  minute quota:    {}/{} remaining", rate.minute.remaining, rate.minute.limit);
    }
    println!("  learning points: {}", status.learning_data_points);
    println!(
        "  analyses:        {} ({:.0}% success)",
        status.performance.total_analyses,
        status.performance.success_rate * 100.0
    );

    engine.shutdown();
}
