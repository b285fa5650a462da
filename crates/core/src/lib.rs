#![deny(unused)]
//! Core types, traits, and error definitions for the prompt enhancement service.
//!
//! This crate provides the building blocks shared by the engine, the stores,
//! the backend adapters and the HTTP gateway.

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use traits::*;
pub use types::*;
