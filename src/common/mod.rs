//! Common utilities and types used throughout the memory simulator.
//!
//! This module provides the request classification and the error type
//! shared by the device model, the memory system and the batch driver.

/// Memory request type definitions.
pub mod data;

/// Error types for configuration, translation and trace loading.
pub mod error;

pub use data::RequestType;
pub use error::{SimError, SimResult};
