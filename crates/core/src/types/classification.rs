use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// =============================================================================
// Classification Types
// =============================================================================

/// Coarse estimate of how much elaboration a prompt needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "moderate" => Ok(Self::Moderate),
            "complex" => Ok(Self::Complex),
            other => Err(Error::invalid_request(format!(
                "unknown complexity '{}', expected simple, moderate or complex",
                other
            ))),
        }
    }
}

/// Output of the intent classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassification {
    /// Categorical intent label, e.g. "code_generation".
    pub intent: String,
    /// Estimated complexity.
    pub complexity: Complexity,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    /// Techniques the classifier itself recommends, best first.
    #[serde(default)]
    pub suggested_techniques: Vec<String>,
    /// Opaque scores and metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl IntentClassification {
    pub fn new(intent: impl Into<String>, complexity: Complexity, confidence: f64) -> Self {
        Self {
            intent: intent.into(),
            complexity,
            confidence: confidence.clamp(0.0, 1.0),
            suggested_techniques: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_suggestions<I, S>(mut self, techniques: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggested_techniques = techniques.into_iter().map(Into::into).collect();
        self
    }
}

/// A technique chosen by the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedTechnique {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
}

impl SelectedTechnique {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            score: None,
            parameters: HashMap::new(),
        }
    }
}

/// Input to the technique selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub text: String,
    pub intent: String,
    pub complexity: Complexity,
    pub preferred: Vec<String>,
    pub excluded: Vec<String>,
    pub user_id: Option<String>,
}
