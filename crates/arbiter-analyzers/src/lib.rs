// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # arbiter-analyzers
//!
//! Reference heuristic analyzers for the Arbiter decision engine.
//!
//! Both analyzers are deterministic keyword heuristics built only on the
//! public [`AnalyzerPlugin`] contract of `arbiter-core`, exactly as a third
//! party would write them.  A statistical model can replace either one by
//! implementing the same trait.
//!
//! | Analyzer              | Name                 | Request types                       |
//! |-----------------------|----------------------|-------------------------------------|
//! | [`SentimentAnalyzer`] | `sentiment`          | `sentiment`, `text`                 |
//! | [`ProposalAnalyzer`]  | `proposal-structure` | `governance_proposal`, `proposal`   |
//!
//! ## Quick Start
//!
//! ```rust
//! use arbiter_analyzers::register_defaults;
//! use arbiter_core::{DecisionEngine, EngineConfig};
//!
//! let engine = DecisionEngine::new(EngineConfig::default());
//! register_defaults(&engine).unwrap();
//! assert_eq!(engine.get_loaded_plugins(), vec!["sentiment", "proposal-structure"]);
//! ```

use std::sync::Arc;

use arbiter_core::{AnalyzerPlugin, DecisionEngine, EngineResult};

pub mod proposal;
pub mod sentiment;

pub use proposal::{ProposalAnalyzer, ProposalType};
pub use sentiment::{Polarity, SentimentAnalyzer, SentimentScore};

/// The bundled analyzers paired with their conventional registry names.
pub fn default_analyzers() -> Vec<(String, Arc<dyn AnalyzerPlugin>)> {
    vec![
        (sentiment::NAME.to_owned(), Arc::new(SentimentAnalyzer::new()) as Arc<dyn AnalyzerPlugin>),
        (proposal::NAME.to_owned(), Arc::new(ProposalAnalyzer::new()) as Arc<dyn AnalyzerPlugin>),
    ]
}

/// Load every bundled analyzer into `engine`.
///
/// # Errors
///
/// Propagates the first registration error, e.g. when a name is already
/// taken.
pub fn register_defaults(engine: &DecisionEngine) -> EngineResult<()> {
    for (name, plugin) in default_analyzers() {
        engine.load_plugin(&name, plugin)?;
    }
    Ok(())
}

/// Lower-cased word tokens of `text`, in order, duplicates kept.
pub(crate) fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_keep_duplicates_and_contractions() {
        let tokens: Vec<String> = words("Don't stop -- STOP 'now'!").collect();
        assert_eq!(tokens, vec!["don't", "stop", "stop", "now"]);
    }

    #[test]
    fn test_default_analyzers_have_distinct_names() {
        let names: Vec<String> = default_analyzers().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["sentiment", "proposal-structure"]);
    }
}
