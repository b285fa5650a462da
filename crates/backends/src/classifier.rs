//! Intent classifier adapters.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use enhancer_core::{
    traits::Classifier,
    types::{Complexity, IntentClassification},
    Result,
};

use crate::http::HttpBackend;

/// Remote classifier reached over JSON/HTTP (`POST {base}/classify`).
pub struct HttpClassifier {
    backend: HttpBackend,
}

#[derive(Serialize)]
struct ClassifyBody<'a> {
    text: &'a str,
}

impl HttpClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            backend: HttpBackend::new("classifier", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<IntentClassification> {
        let mut classification: IntentClassification = self
            .backend
            .post_json("classify", &ClassifyBody { text })
            .await?;
        classification.confidence = classification.confidence.clamp(0.0, 1.0);
        Ok(classification)
    }
}

/// Keyword table: intent label, trigger phrases, suggested techniques.
const INTENT_RULES: &[(&str, &[&str], &[&str])] = &[
    (
        "debugging",
        &["fix", "debug", "error", "bug", "crash", "stack trace", "not working"],
        &["step_by_step", "chain_of_thought"],
    ),
    (
        "code_generation",
        &["write a function", "implement", "code", "script", "function", "class", "api"],
        &["chain_of_thought", "few_shot", "structured_output"],
    ),
    (
        "explanation",
        &["explain", "what is", "how does", "why", "describe", "teach"],
        &["eli5", "analogical_reasoning"],
    ),
    (
        "analysis",
        &["analyze", "analyse", "compare", "review", "evaluate", "assess"],
        &["tree_of_thoughts", "chain_of_thought"],
    ),
    (
        "summarization",
        &["summarize", "summarise", "summary", "tl;dr", "condense"],
        &["structured_output"],
    ),
    (
        "planning",
        &["plan", "design", "roadmap", "strategy", "schedule"],
        &["step_by_step", "tree_of_thoughts"],
    ),
    (
        "creative_writing",
        &["story", "poem", "creative", "lyrics", "fiction"],
        &["role_play", "few_shot"],
    ),
];

/// Phrases that indicate multi-step work.
const MULTI_STEP_MARKERS: &[&str] = &[
    " and then ",
    "step by step",
    "multiple",
    "end-to-end",
    "architecture",
    "trade-off",
    "tradeoff",
];

/// Local classifier using keyword heuristics.
///
/// Used when no remote classifier is configured. Custom rules are checked
/// before the built-in table.
pub struct KeywordClassifier {
    custom_rules: Vec<(String, Vec<String>, Vec<String>)>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self {
            custom_rules: Vec::new(),
        }
    }

    /// Add a custom intent rule.
    pub fn with_rule<K, T>(mut self, intent: impl Into<String>, keywords: K, techniques: T) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        self.custom_rules.push((
            intent.into(),
            keywords.into_iter().map(|k| k.into().to_lowercase()).collect(),
            techniques.into_iter().map(Into::into).collect(),
        ));
        self
    }

    fn estimate_complexity(lower: &str) -> Complexity {
        let words = lower.split_whitespace().count();
        let markers = MULTI_STEP_MARKERS.iter().filter(|m| lower.contains(*m)).count();
        let score = words / 15 + markers * 2;
        match score {
            0 => Complexity::Simple,
            1..=3 => Complexity::Moderate,
            _ => Complexity::Complex,
        }
    }

    fn best_rule(&self, lower: &str) -> Option<(String, usize, Vec<String>)> {
        let custom = self.custom_rules.iter().map(|(intent, keywords, techniques)| {
            let hits = keywords.iter().filter(|k| lower.contains(k.as_str())).count();
            (intent.clone(), hits, techniques.clone())
        });
        let builtin = INTENT_RULES.iter().map(|(intent, keywords, techniques)| {
            let hits = keywords.iter().filter(|k| lower.contains(*k)).count();
            (
                intent.to_string(),
                hits,
                techniques.iter().map(|t| t.to_string()).collect(),
            )
        });

        // Strictly-greater keeps the earliest rule on ties, so custom rules win.
        let mut best: Option<(String, usize, Vec<String>)> = None;
        for candidate in custom.chain(builtin) {
            if candidate.1 == 0 {
                continue;
            }
            if best.as_ref().map(|b| candidate.1 > b.1).unwrap_or(true) {
                best = Some(candidate);
            }
        }
        best
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<IntentClassification> {
        let lower = text.to_lowercase();
        let complexity = Self::estimate_complexity(&lower);

        let classification = match self.best_rule(&lower) {
            Some((intent, hits, techniques)) => {
                let confidence = (0.5 + 0.15 * hits as f64).min(0.95);
                IntentClassification::new(intent, complexity, confidence).with_suggestions(techniques)
            }
            None => IntentClassification::new("general", complexity, 0.4)
                .with_suggestions(["chain_of_thought"]),
        };

        tracing::debug!(
            intent = %classification.intent,
            complexity = %classification.complexity,
            confidence = classification.confidence,
            "Keyword classification"
        );
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_explanation_classification() {
        let classifier = KeywordClassifier::new();
        let c = classifier.classify("Explain recursion").await.unwrap();
        assert_eq!(c.intent, "explanation");
        assert_eq!(c.complexity, Complexity::Simple);
        assert_eq!(c.suggested_techniques[0], "eli5");
        assert!(c.confidence > 0.5);
    }

    #[tokio::test]
    async fn test_debugging_beats_code_on_more_hits() {
        let classifier = KeywordClassifier::new();
        let c = classifier
            .classify("Fix this bug: my script throws an error")
            .await
            .unwrap();
        assert_eq!(c.intent, "debugging");
    }

    #[tokio::test]
    async fn test_long_multi_step_prompt_is_complex() {
        let classifier = KeywordClassifier::new();
        let text = format!(
            "Design the architecture step by step and then compare trade-off options {}",
            "with many details ".repeat(10)
        );
        let c = classifier.classify(&text).await.unwrap();
        assert_eq!(c.complexity, Complexity::Complex);
    }

    #[tokio::test]
    async fn test_unmatched_falls_back_to_general() {
        let classifier = KeywordClassifier::new();
        let c = classifier.classify("hello there").await.unwrap();
        assert_eq!(c.intent, "general");
        assert_eq!(c.suggested_techniques, vec!["chain_of_thought".to_string()]);
    }

    #[tokio::test]
    async fn test_custom_rule_wins_ties() {
        let classifier = KeywordClassifier::new().with_rule("sql", ["query"], ["few_shot"]);
        let c = classifier.classify("review this query").await.unwrap();
        assert_eq!(c.intent, "sql");
    }
}
