//! Memory Request Types.
//!
//! This module defines the classification of requests flowing from the
//! caller's transactions down to the device. The controller uses it to pick
//! the queue a request lands in and the access command it finally resolves to.

use serde::{Deserialize, Serialize};

/// Type of memory request.
///
/// Every transaction, and every atomic request derived from it, is either
/// a read or a write. Refresh and power management are generated inside
/// the controller and never travel as requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    /// Data read.
    ///
    /// Completes once the read burst has left the device.
    Read,

    /// Data write.
    ///
    /// Buffered in the controller's write queue and drained according to
    /// the write watermarks.
    Write,
}

impl RequestType {
    /// Returns `true` for reads.
    pub fn is_read(self) -> bool {
        matches!(self, RequestType::Read)
    }

    /// Single-letter tag used by trace files and reports.
    pub fn tag(self) -> char {
        match self {
            RequestType::Read => 'R',
            RequestType::Write => 'W',
        }
    }
}
