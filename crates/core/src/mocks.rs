//! Mock implementations of the collaborator traits for testing.
//!
//! Every mock counts its calls and can be switched into a failing mode so
//! tests can exercise the engine's fallback and soft-failure policies.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    traits::{CacheStore, Classifier, Generator, HistoryStore, TechniqueSelector},
    types::{
        EnhancedPrompt, GenerationRequest, HistoryQuery, HistoryRecord, IntentClassification,
        SelectedTechnique, SelectionRequest,
    },
    Error, Result,
};

// =============================================================================
// Mock Classifier
// =============================================================================

/// Classifier returning a fixed classification, or failing.
pub struct MockClassifier {
    result: Option<IntentClassification>,
    calls: AtomicUsize,
}

impl MockClassifier {
    pub fn returning(classification: IntentClassification) -> Self {
        Self {
            result: Some(classification),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, _text: &str) -> Result<IntentClassification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .ok_or_else(|| Error::backend("mock classifier unavailable"))
    }
}

// =============================================================================
// Mock Technique Selector
// =============================================================================

/// Selector returning a fixed technique list, or failing.
pub struct MockSelector {
    techniques: Option<Vec<String>>,
    requests: Mutex<Vec<SelectionRequest>>,
}

impl MockSelector {
    pub fn returning<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            techniques: Some(ids.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            techniques: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<SelectionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TechniqueSelector for MockSelector {
    async fn select(&self, request: &SelectionRequest) -> Result<Vec<SelectedTechnique>> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.techniques {
            Some(ids) => Ok(ids
                .iter()
                .filter(|id| !request.excluded.contains(id))
                .map(SelectedTechnique::new)
                .collect()),
            None => Err(Error::backend("mock selector unavailable")),
        }
    }
}

// =============================================================================
// Mock Generator
// =============================================================================

/// Generator that prefixes the prompt with its technique list.
///
/// Fails for every request when built with [`MockGenerator::failing`], or
/// only for prompts containing a marker when built with
/// [`MockGenerator::failing_on`].
pub struct MockGenerator {
    fail_all: bool,
    fail_marker: Option<String>,
    requests: Mutex<Vec<GenerationRequest>>,
    warm_ups: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            fail_all: false,
            fail_marker: None,
            requests: Mutex::new(Vec::new()),
            warm_ups: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    pub fn failing_on(marker: impl Into<String>) -> Self {
        Self {
            fail_marker: Some(marker.into()),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn warm_up_count(&self) -> usize {
        self.warm_ups.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Text the mock produces for a prompt and technique list.
    pub fn render(text: &str, techniques: &[String]) -> String {
        format!("[{}] {}", techniques.join(","), text)
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<EnhancedPrompt> {
        self.requests.lock().unwrap().push(request.clone());
        let marked = self
            .fail_marker
            .as_deref()
            .map(|m| request.text.contains(m))
            .unwrap_or(false);
        if self.fail_all || marked {
            return Err(Error::backend("mock generator unavailable"));
        }
        Ok(EnhancedPrompt {
            text: Self::render(&request.text, &request.techniques),
            tokens_used: 42,
            model_version: "mock-1".to_string(),
            metadata: HashMap::new(),
        })
    }

    async fn warm_up(&self) -> Result<()> {
        self.warm_ups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Mock Cache
// =============================================================================

/// In-memory cache ignoring TTLs, with switchable failures.
#[derive(Default)]
pub struct MockCache {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose reads and writes all error.
    pub fn broken() -> Self {
        let cache = Self::new();
        cache.fail_reads.store(true, Ordering::SeqCst);
        cache.fail_writes.store(true, Ordering::SeqCst);
        cache
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MockCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::cache("mock cache read failure"));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::cache("mock cache write failure"));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// Mock History Store
// =============================================================================

/// In-memory history store with a switchable save failure.
#[derive(Default)]
pub struct MockHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
    fail_saves: AtomicBool,
    save_attempts: AtomicUsize,
}

impl MockHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose saves all error.
    pub fn failing() -> Self {
        let store = Self::new();
        store.fail_saves.store(true, Ordering::SeqCst);
        store
    }

    /// Seed the store with existing records.
    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        let store = Self::new();
        *store.records.lock().unwrap() = records;
        store
    }

    pub fn save_attempts(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryStore for MockHistoryStore {
    async fn save(&self, record: &HistoryRecord) -> Result<String> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::storage("mock history save failure"));
        }
        let mut stored = record.clone();
        if stored.id.is_empty() {
            stored.id = Uuid::new_v4().to_string();
        }
        let id = stored.id.clone();
        self.records.lock().unwrap().push(stored);
        Ok(id)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<HistoryRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>> {
        let records = self.records.lock().unwrap();
        let mut matched: Vec<_> = records.iter().filter(|r| query.matches(r)).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}
