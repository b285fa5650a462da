//! Builder for EnhancementEngine.

use enhancer_core::config::EngineConfig;
use enhancer_core::traits::{CacheStore, Classifier, Generator, HistoryStore, TechniqueSelector};
use enhancer_core::{Error, Result};
use std::sync::Arc;

use crate::assembler::ResponseAssembler;
use crate::background::BackgroundPool;
use crate::engine::{EngineInner, EnhancementEngine};
use crate::limiter::TaskLimiter;
use crate::side_effects::SideEffects;
use crate::stages::{ClassificationStage, GenerationStage, TechniqueSelectionStage};

/// Collects the collaborators an engine is built from.
pub struct EngineBuilder {
    config: EngineConfig,
    classifier: Option<Arc<dyn Classifier>>,
    selector: Option<Arc<dyn TechniqueSelector>>,
    generator: Option<Arc<dyn Generator>>,
    cache: Option<Arc<dyn CacheStore>>,
    history: Option<Arc<dyn HistoryStore>>,
    background: Option<Arc<BackgroundPool>>,
}

impl EngineBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            classifier: None,
            selector: None,
            generator: None,
            cache: None,
            history: None,
            background: None,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the intent classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Set the technique selector.
    pub fn with_selector(mut self, selector: Arc<dyn TechniqueSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Set the prompt generator.
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the cache used for classifications and responses.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the history store.
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Share an existing background pool instead of starting one.
    pub fn with_background_pool(mut self, pool: Arc<BackgroundPool>) -> Self {
        self.background = Some(pool);
        self
    }

    /// Build the engine. Starts the background pool unless one was
    /// supplied, so this must run inside a tokio runtime.
    pub fn build(self) -> Result<EnhancementEngine> {
        let classifier = required(self.classifier, "classifier")?;
        let selector = required(self.selector, "technique selector")?;
        let generator = required(self.generator, "generator")?;
        let cache = required(self.cache, "cache")?;
        let history = required(self.history, "history store")?;
        if self.config.batch_max_items == 0 {
            return Err(Error::Config("batch_max_items must be at least 1".to_string()));
        }

        let config = self.config;
        let background = self.background.unwrap_or_else(|| {
            Arc::new(BackgroundPool::new(
                config.background_workers,
                config.background_queue_capacity,
                config.background_task_timeout(),
            ))
        });

        let inner = EngineInner {
            classification: ClassificationStage::new(
                classifier,
                cache.clone(),
                background.clone(),
                config.classification_ttl(),
            ),
            selection: TechniqueSelectionStage::new(selector),
            generation: GenerationStage::new(generator),
            assembler: ResponseAssembler,
            side_effects: SideEffects::new(
                history.clone(),
                cache.clone(),
                background.clone(),
                config.response_ttl(),
            ),
            batch_limiter: TaskLimiter::new(config.batch_concurrency),
            cache,
            history,
            background,
            config,
        };
        Ok(EnhancementEngine::from_inner(inner))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn required<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| Error::Config(format!("{} not configured", what)))
}
