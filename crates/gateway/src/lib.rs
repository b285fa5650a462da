#![deny(unused)]
//! HTTP gateway for the prompt enhancement service.
//!
//! Exposes the enhancement engine over JSON endpoints, derives the caller
//! identity from request headers and maps service errors onto status codes.

pub mod error;
pub mod extract;
pub mod server;

pub use error::{ApiError, ErrorResponse};
pub use extract::RequestMeta;
pub use server::{GatewayConfig, GatewayServer};
