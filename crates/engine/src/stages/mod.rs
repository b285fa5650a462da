//! Pipeline stages: classify, select techniques, generate.

mod classification;
mod generation;
mod selection;

pub use classification::{ClassificationOutcome, ClassificationStage};
pub use generation::GenerationStage;
pub use selection::{TechniqueChoice, TechniqueSelectionStage};
