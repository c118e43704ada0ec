//! Simulator Error Types.
//!
//! Everything that can go wrong while configuring the simulator, translating
//! transactions or loading traces is reported through [`SimError`]. Admission
//! backpressure is flow control, not an error, and never shows up here.

use std::path::PathBuf;

/// Result alias used across the crate.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised by the simulator.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The transaction does not fit the declared address space, either at its
    /// base address or while rippling through the fields of a later burst.
    #[error("address space exhausted by transaction {txn_id} at {addr:#x}")]
    AddressSpaceExhausted { txn_id: u64, addr: u64 },

    /// The address field layout is malformed.
    #[error("invalid address mapping: {0}")]
    InvalidMapping(String),

    /// No memory standard is registered under this name.
    #[error("unknown memory standard '{0}'")]
    UnknownStandard(String),

    /// The standard exists but has no speed bin with this name.
    #[error("unknown speed '{speed}' for standard {standard}")]
    UnknownSpeed { standard: String, speed: String },

    /// Two transactions in the same batch carry the same id.
    #[error("transaction id {0} appears more than once in the batch")]
    DuplicateTransaction(u64),

    /// A batch was submitted to a driver that finished its previous batch
    /// and has not been reset.
    #[error("batch driver must be reset before starting another batch")]
    DriverNotReset,

    /// File access failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Malformed trace line.
    #[error("trace line {line}: {detail}")]
    TraceParse { line: usize, detail: String },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
