// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Lexicon-based sentiment analyzer.
//!
//! Scoring:
//!
//! ```text
//! normalized = (positive - negative) / max(1, positive + negative)
//! intensity  = min(1.5, 1 + 0.1 * (intensifiers + exclamation marks))
//! confidence = clamp(round(|normalized| * 100 * intensity), 0, 95)
//! ```
//!
//! A negation word ("not", "never", ...) flips the polarity of the next
//! sentiment word.

use async_trait::async_trait;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use arbiter_core::types::{
    Action, AnalysisRequest, AnalysisResult, Decision, RiskAssessment, RiskLevel,
};
use arbiter_core::AnalyzerPlugin;

use crate::words;

pub const NAME: &str = "sentiment";
pub const VERSION: &str = "1.0.0";

/// Confidence at or above which the analyzer recommends `EXECUTE`.
pub const EXECUTE_THRESHOLD: f64 = 60.0;
/// Heuristic scores never claim more than this.
pub const MAX_CONFIDENCE: f64 = 95.0;
pub const MAX_INTENSITY: f64 = 1.5;

const INTENSITY_STEP: f64 = 0.1;

const POSITIVE: &[&str] = &[
    "good", "great", "excellent", "amazing", "fantastic", "positive", "bullish", "strong",
    "growth", "gain", "gains", "profit", "profitable", "success", "successful", "win", "benefit",
    "beneficial", "improve", "improved", "improvement", "innovative", "secure", "safe", "support",
    "love", "like", "happy", "optimistic", "promising", "valuable", "efficient", "reliable",
];

const NEGATIVE: &[&str] = &[
    "bad", "poor", "terrible", "awful", "horrible", "negative", "bearish", "weak", "loss",
    "losses", "risk", "risky", "scam", "fraud", "hack", "hacked", "exploit", "fail", "failed",
    "failure", "crash", "dump", "decline", "worse", "worst", "hate", "dislike", "angry",
    "pessimistic", "concern", "concerns", "vulnerable", "broken", "unsafe", "unreliable",
];

const INTENSIFIERS: &[&str] = &[
    "very", "extremely", "really", "highly", "incredibly", "absolutely", "strongly", "totally",
    "super",
];

const NEGATIONS: &[&str] = &["not", "never", "no", "don't", "doesn't", "isn't", "wasn't", "won't"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Neutral,
    Negative,
}

impl Polarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Neutral  => "neutral",
            Polarity::Negative => "negative",
        }
    }
}

/// Full breakdown of a sentiment score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentScore {
    pub positive: usize,
    pub negative: usize,
    pub intensifiers: usize,
    pub exclamations: usize,
    pub intensity: f64,
    /// In `[-1, 1]`.
    pub normalized_score: f64,
    /// In `[0, 95]`.
    pub confidence: f64,
    pub polarity: Polarity,
}

/// Score `text` against the built-in lexicon.
///
/// ```rust
/// use arbiter_analyzers::sentiment::score;
///
/// let upbeat = score("Great results, very promising growth!");
/// let gloomy = score("Terrible losses, the bridge was hacked");
/// assert!(upbeat.normalized_score > 0.0);
/// assert!(gloomy.normalized_score < 0.0);
/// ```
pub fn score(text: &str) -> SentimentScore {
    let positive_words: HashSet<&str> = POSITIVE.iter().copied().collect();
    let negative_words: HashSet<&str> = NEGATIVE.iter().copied().collect();

    let mut positive = 0usize;
    let mut negative = 0usize;
    let mut intensifiers = 0usize;
    let mut negate_next = false;

    for word in words(text) {
        let word = word.as_str();
        if NEGATIONS.contains(&word) {
            negate_next = true;
            continue;
        }
        if INTENSIFIERS.contains(&word) {
            intensifiers += 1;
            continue;
        }

        let polarity = if positive_words.contains(word) {
            Some(true)
        } else if negative_words.contains(word) {
            Some(false)
        } else {
            None
        };

        if let Some(is_positive) = polarity {
            if is_positive != negate_next {
                positive += 1;
            } else {
                negative += 1;
            }
            negate_next = false;
        }
    }

    let exclamations = text.chars().filter(|c| *c == '!').count();
    let intensity = (1.0 + INTENSITY_STEP * (intensifiers + exclamations) as f64).min(MAX_INTENSITY);
    let normalized_score = (positive as f64 - negative as f64) / (positive + negative).max(1) as f64;
    let confidence = (normalized_score.abs() * 100.0 * intensity).round().clamp(0.0, MAX_CONFIDENCE);

    let polarity = if normalized_score > 0.0 {
        Polarity::Positive
    } else if normalized_score < 0.0 {
        Polarity::Negative
    } else {
        Polarity::Neutral
    };

    SentimentScore {
        positive,
        negative,
        intensifiers,
        exclamations,
        intensity,
        normalized_score,
        confidence,
        polarity,
    }
}

/// Turn a score into the engine's decision shape.
pub fn decide(score: &SentimentScore) -> Decision {
    let action = if score.confidence >= EXECUTE_THRESHOLD {
        Action::Execute
    } else {
        Action::Wait
    };

    let risk = match score.polarity {
        Polarity::Positive => RiskAssessment::new(RiskLevel::Low),
        Polarity::Neutral  => RiskAssessment::new(RiskLevel::Medium).with_factor("no clear sentiment signal"),
        Polarity::Negative => RiskAssessment::new(RiskLevel::High)
            .with_factor(format!("{} negative signals detected", score.negative)),
    };

    let reasoning = vec![
        format!(
            "Detected {} positive and {} negative lexicon matches",
            score.positive, score.negative
        ),
        format!(
            "Overall sentiment is {} (normalized score {:.2}, intensity {:.1})",
            score.polarity.as_str(),
            score.normalized_score,
            score.intensity
        ),
        match action {
            Action::Execute => format!("Confidence {} meets the execution threshold", score.confidence),
            _ => format!("Confidence {} is below the execution threshold; waiting", score.confidence),
        },
    ];

    let details = serde_json::to_value(score).unwrap_or(Value::Null);
    Decision::new(action, score.confidence, reasoning)
        .with_metadata("sentiment", details)
        .with_risk(risk)
}

/// Sentiment analyzer plugin.  Requires `input.text` (or a title /
/// description).
#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    types: Vec<String>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self { types: vec!["sentiment".to_owned(), "text".to_owned()] }
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalyzerPlugin for SentimentAnalyzer {
    fn name(&self) -> &str { NAME }
    fn version(&self) -> &str { VERSION }
    fn supported_types(&self) -> &[String] { &self.types }

    fn validate(&self, request: &AnalysisRequest) -> bool {
        request.input.text_content().is_some()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let Some(text) = request.input.text_content() else {
            return AnalysisResult::failure("missing text input", NAME);
        };

        let score = score(&text);
        debug!(
            request_id = %request.id,
            polarity = score.polarity.as_str(),
            confidence = score.confidence,
            "sentiment scored"
        );
        AnalysisResult::success(decide(&score), NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::types::AnalysisInput;

    #[test]
    fn test_neutral_text_scores_zero() {
        let neutral = score("The committee meets on Tuesday afternoon");
        assert_eq!(neutral.normalized_score, 0.0);
        assert_eq!(neutral.confidence, 0.0);
        assert_eq!(neutral.polarity, Polarity::Neutral);
    }

    #[test]
    fn test_confidence_is_capped() {
        let euphoric = score("Absolutely amazing, incredibly great, extremely bullish!!!");
        assert_eq!(euphoric.normalized_score, 1.0);
        assert_eq!(euphoric.intensity, MAX_INTENSITY);
        assert_eq!(euphoric.confidence, MAX_CONFIDENCE);
    }

    #[test]
    fn test_mixed_text() {
        let mixed = score("good growth but one concern");
        assert_eq!((mixed.positive, mixed.negative), (2, 1));
        assert!((mixed.normalized_score - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(mixed.confidence, 33.0);
    }

    #[test]
    fn test_negation_flips_next_sentiment_word() {
        let negated = score("this is not good");
        assert_eq!((negated.positive, negated.negative), (0, 1));
        assert_eq!(negated.polarity, Polarity::Negative);
    }

    #[test]
    fn test_decision_thresholds_and_risk() {
        let strong = decide(&score("great excellent success"));
        assert_eq!(strong.action, Action::Execute);
        assert_eq!(strong.risk_assessment.level, RiskLevel::Low);

        let weak = decide(&score("good but bad"));
        assert_eq!(weak.action, Action::Wait);
        assert_eq!(weak.risk_assessment.level, RiskLevel::Medium);

        let negative = decide(&score("terrible scam"));
        assert_eq!(negative.risk_assessment.level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_missing_text_fails() {
        let analyzer = SentimentAnalyzer::new();
        let request = AnalysisRequest::new("sentiment", AnalysisInput::default());
        assert!(!analyzer.validate(&request));

        let result = analyzer.analyze(&request).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("missing text input"));
    }
}
