//! Collaborator contracts consumed by the orchestration core.
//!
//! Traits are organized by role:
//! - `backends`: remote capabilities (Classifier, TechniqueSelector, Generator)
//! - `store`: shared stateful services (CacheStore, HistoryStore)

pub mod backends;
pub mod store;

pub use backends::*;
pub use store::*;
