//! Domain layer for the watchpost engine
//!
//! This module contains the session model, the event log and the port
//! traits that adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult};
