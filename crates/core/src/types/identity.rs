use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Caller Identity
// =============================================================================

/// Opaque identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is making a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    User(UserId),
}

impl Identity {
    /// Identity from an optional raw user id; blank ids are anonymous.
    pub fn from_optional(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Self::User(UserId::new(id)),
            None => Self::Anonymous,
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::User(UserId::new(id))
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id.as_str()),
            Self::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

/// Identity plus session, threaded through every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub identity: Identity,
    pub session_id: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self {
            identity: Identity::user(id),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.user_id()
    }
}
