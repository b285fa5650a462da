#![deny(unused)]
//! Enhancement orchestration engine.
//!
//! Sequences the classifier, technique selector and generator for a single
//! request, applies cache-aside on classifications and full responses,
//! fans batches out under a concurrency cap and re-executes past
//! enhancements. Persistence, cache writes and metrics run on a bounded
//! background pool so they never delay a response.

pub mod assembler;
pub mod background;
pub mod batch;
pub mod builder;
pub mod context;
pub mod engine;
pub mod fingerprint;
pub mod limiter;
pub mod rerun;
pub mod side_effects;
pub mod stages;

pub use assembler::ResponseAssembler;
pub use background::BackgroundPool;
pub use batch::BatchCoordinator;
pub use builder::EngineBuilder;
pub use context::RequestContext;
pub use engine::EnhancementEngine;
pub use fingerprint::Fingerprint;
pub use limiter::TaskLimiter;
pub use rerun::RerunCoordinator;
pub use side_effects::SideEffects;
pub use stages::{
    ClassificationOutcome, ClassificationStage, GenerationStage, TechniqueChoice,
    TechniqueSelectionStage,
};
