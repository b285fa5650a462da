use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::classification::Complexity;
use crate::error::{Error, Result};

/// Default upper bound on the number of characters in a prompt.
pub const MAX_TEXT_CHARS: usize = 5000;

// =============================================================================
// Request Types
// =============================================================================

/// Raw enhancement request as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhanceRequest {
    /// Prompt text to enhance.
    pub text: String,

    /// Opaque caller-supplied context forwarded to the generator.
    #[serde(default)]
    pub context: BTreeMap<String, Value>,

    /// Techniques the caller would like applied.
    #[serde(default)]
    pub preferred_techniques: BTreeSet<String>,

    /// Techniques the caller does not want applied.
    #[serde(default)]
    pub excluded_techniques: BTreeSet<String>,

    /// Optional complexity override ("simple", "moderate", "complex").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_complexity: Option<String>,
}

impl EnhanceRequest {
    /// Create a request carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Add a preferred technique.
    pub fn with_preferred(mut self, technique: impl Into<String>) -> Self {
        self.preferred_techniques.insert(technique.into());
        self
    }

    /// Add an excluded technique.
    pub fn with_excluded(mut self, technique: impl Into<String>) -> Self {
        self.excluded_techniques.insert(technique.into());
        self
    }

    /// Add a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Set the complexity override.
    pub fn with_target_complexity(mut self, complexity: impl Into<String>) -> Self {
        self.target_complexity = Some(complexity.into());
        self
    }

    /// Validate the request against the given text bound.
    pub fn validate(&self, max_chars: usize) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::invalid_request("text must not be empty"));
        }
        let chars = self.text.chars().count();
        if chars > max_chars {
            return Err(Error::invalid_request(format!(
                "text exceeds {} characters ({})",
                max_chars, chars
            )));
        }
        self.target_complexity()?;
        Ok(())
    }

    /// Parsed complexity override, if any.
    pub fn target_complexity(&self) -> Result<Option<Complexity>> {
        match self.target_complexity.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

/// Batch request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchEnhanceRequest {
    /// Prompts to enhance independently.
    pub prompts: Vec<EnhanceRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bounds() {
        assert!(EnhanceRequest::text("Explain recursion").validate(MAX_TEXT_CHARS).is_ok());
        assert!(EnhanceRequest::text("   ").validate(MAX_TEXT_CHARS).is_err());

        let long = "a".repeat(MAX_TEXT_CHARS + 1);
        assert!(EnhanceRequest::text(long).validate(MAX_TEXT_CHARS).is_err());

        // Bound counts characters, not bytes.
        let wide = "é".repeat(MAX_TEXT_CHARS);
        assert!(EnhanceRequest::text(wide).validate(MAX_TEXT_CHARS).is_ok());
    }

    #[test]
    fn test_target_complexity_parsing() {
        let req = EnhanceRequest::text("x").with_target_complexity("Complex");
        assert_eq!(req.target_complexity().unwrap(), Some(Complexity::Complex));

        let bad = EnhanceRequest::text("x").with_target_complexity("extreme");
        assert!(matches!(bad.validate(MAX_TEXT_CHARS), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_deserialize_defaults() {
        let req: EnhanceRequest =
            serde_json::from_str(r#"{"text":"hi","preferred_techniques":["b","a","a"]}"#).unwrap();
        assert!(req.context.is_empty());
        assert_eq!(
            req.preferred_techniques.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
