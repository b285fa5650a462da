//! Core type definitions for the enhancement service.
//!
//! Broken down into submodules by pipeline stage.

pub mod classification;
pub mod generation;
pub mod history;
pub mod identity;
pub mod request;
pub mod response;

pub use classification::*;
pub use generation::*;
pub use history::*;
pub use identity::*;
pub use request::*;
pub use response::*;
