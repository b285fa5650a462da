use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::classification::{Complexity, IntentClassification};
use super::identity::{Caller, Identity};

/// Default page size for history listings.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
/// Largest page size a caller may request.
pub const MAX_HISTORY_LIMIT: usize = 100;

// =============================================================================
// History Types
// =============================================================================

/// Persisted record of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Assigned by the history store on save.
    #[serde(default)]
    pub id: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub original_input: String,
    pub enhanced_output: String,
    #[serde(default)]
    pub intent: String,
    pub complexity: Complexity,
    #[serde(default)]
    pub techniques_used: Vec<String>,
    pub intent_confidence: Option<f64>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Whether the stored classification can be reused as-is.
    pub fn has_complete_classification(&self) -> bool {
        !self.intent.trim().is_empty() && self.intent_confidence.is_some()
    }

    /// Rebuild the classification stored on this record.
    ///
    /// The classifier's own suggestions are not persisted, so the
    /// techniques used last time stand in for them.
    pub fn stored_classification(&self) -> Option<IntentClassification> {
        if !self.has_complete_classification() {
            return None;
        }
        Some(IntentClassification {
            intent: self.intent.clone(),
            complexity: self.complexity,
            confidence: self.intent_confidence.unwrap_or_default(),
            suggested_techniques: self.techniques_used.clone(),
            metadata: HashMap::new(),
        })
    }

    /// Ownership check.
    ///
    /// Records of authenticated users belong to that user only. Anonymous
    /// records belong to the session that created them; an anonymous record
    /// without a session belongs to nobody.
    pub fn is_owned_by(&self, caller: &Caller) -> bool {
        match (&self.user_id, &caller.identity) {
            (Some(owner), Identity::User(id)) => owner == id.as_str(),
            (Some(_), Identity::Anonymous) => false,
            (None, Identity::User(_)) => false,
            (None, Identity::Anonymous) => match (&self.session_id, &caller.session_id) {
                (Some(recorded), Some(current)) => recorded == current,
                _ => false,
            },
        }
    }
}

/// Listing filter for a caller's history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl HistoryQuery {
    /// Query for everything the caller owns.
    pub fn for_caller(caller: &Caller) -> Self {
        Self {
            user_id: caller.user_id().map(str::to_string),
            session_id: if caller.identity.is_anonymous() {
                caller.session_id.clone()
            } else {
                None
            },
            limit: DEFAULT_HISTORY_LIMIT,
            offset: 0,
        }
    }

    pub fn page(mut self, limit: Option<usize>, offset: Option<usize>) -> Self {
        self.limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
        self.offset = offset.unwrap_or(0);
        self
    }

    /// Whether the query can match anything at all.
    pub fn is_scoped(&self) -> bool {
        self.user_id.is_some() || self.session_id.is_some()
    }

    pub fn matches(&self, record: &HistoryRecord) -> bool {
        match (&self.user_id, &self.session_id) {
            (Some(user), _) => record.user_id.as_deref() == Some(user.as_str()),
            (None, Some(session)) => {
                record.user_id.is_none() && record.session_id.as_deref() == Some(session.as_str())
            }
            (None, None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: Option<&str>, session: Option<&str>) -> HistoryRecord {
        HistoryRecord {
            id: "rec-1".into(),
            user_id: user.map(Into::into),
            session_id: session.map(Into::into),
            original_input: "Explain recursion".into(),
            enhanced_output: "Explain recursion step by step".into(),
            intent: "explanation".into(),
            complexity: Complexity::Moderate,
            techniques_used: vec!["eli5".into()],
            intent_confidence: Some(0.9),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_ownership() {
        let owned = record(Some("alice"), None);
        assert!(owned.is_owned_by(&Caller::user("alice")));
        assert!(!owned.is_owned_by(&Caller::user("bob")));
        assert!(!owned.is_owned_by(&Caller::anonymous()));

        let anon = record(None, Some("s-1"));
        assert!(anon.is_owned_by(&Caller::anonymous().with_session("s-1")));
        assert!(!anon.is_owned_by(&Caller::anonymous().with_session("s-2")));
        assert!(!anon.is_owned_by(&Caller::anonymous()));
        assert!(!anon.is_owned_by(&Caller::user("alice")));
    }

    #[test]
    fn test_stored_classification() {
        let rec = record(Some("alice"), None);
        let c = rec.stored_classification().unwrap();
        assert_eq!(c.intent, "explanation");
        assert_eq!(c.suggested_techniques, vec!["eli5".to_string()]);

        let mut partial = rec.clone();
        partial.intent_confidence = None;
        assert!(partial.stored_classification().is_none());
    }

    #[test]
    fn test_query_paging_clamped() {
        let q = HistoryQuery::for_caller(&Caller::user("alice")).page(Some(500), None);
        assert_eq!(q.limit, MAX_HISTORY_LIMIT);
        assert!(q.matches(&record(Some("alice"), None)));
        assert!(!q.matches(&record(Some("bob"), None)));

        let unscoped = HistoryQuery::for_caller(&Caller::anonymous());
        assert!(!unscoped.is_scoped());
    }
}
