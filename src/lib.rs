//! DRAM Memory Simulator Library.
//!
//! This crate implements a cycle-accurate simulator of DRAM-family memory
//! devices and the traffic driven into them. Memory standards describe their
//! protocol as command rules over a device hierarchy; a batch driver splits
//! caller transactions into device-sized requests, feeds them through the
//! controllers under backpressure and reports per-transaction response
//! windows.
//!
//! # Architecture
//!
//! * **Device**: hierarchy of channels, ranks, bank groups and banks whose
//!   legality, timing and state transitions come from a `CommandRules` table.
//! * **Memory system**: per-channel controllers with read/write queues,
//!   write draining and refresh.
//! * **Harness**: address translation, batch driving and completion tracking.
//!
//! # Modules
//!
//! * `common`: Shared request types and error handling.
//! * `config`: Configuration loading and parsing.
//! * `dram`: Device hierarchy, command rules and memory standards.
//! * `memsys`: Controllers and the memory-system interface.
//! * `sim`: Transactions, address translation, batch driver and trace loader.
//! * `stats`: Statistics collection and reporting.

/// Shared request types and error handling.
///
/// Provides the read/write classification used from transactions down to
/// the device, and the crate-wide error type.
pub mod common;

/// Configuration system for the memory standard, controllers and address layout.
///
/// Loads and parses TOML configuration files; every field has a default.
pub mod config;

/// Device hierarchy and command rules.
///
/// Declares levels, commands and states, the `CommandRules` capability each
/// memory standard implements, and the per-node state machine.
pub mod dram;

/// Memory system implementation.
///
/// Per-channel controllers scheduling device commands, behind the
/// `MemorySystem` trait the batch driver consumes.
pub mod memsys;

/// Simulation harness.
///
/// Splits transactions into atomic requests, drives batches through a
/// memory system and folds completions back into transaction latencies.
pub mod sim;

/// Statistics collection and reporting.
///
/// Tracks command counts, row-buffer outcomes and request latencies.
pub mod stats;
