//! Transactions and Requests.
//!
//! A [`Transaction`] is what a caller submits: a byte range to read or write.
//! The address translator splits it into granule-sized [`AtomicRequest`]s,
//! and the batch driver hands each one to the memory system as a [`Request`]
//! carrying the completion callback.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::common::RequestType;

/// Completion callback invoked by the memory system once per request.
pub type Callback = Rc<dyn Fn(&Request)>;

/// Caller-visible unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Cycle at which the caller issues the transaction.
    pub start: u64,
    pub kind: RequestType,
    /// Base byte address.
    pub addr: u64,
    /// Length in bytes.
    pub len: u64,
    pub id: u64,
    /// Earliest arrival of any of its requests, set when its batch finishes.
    pub respond_begin: Option<u64>,
    /// Latest departure of any of its requests, set when its batch finishes.
    pub respond_end: Option<u64>,
}

impl Transaction {
    pub fn new(start: u64, kind: RequestType, addr: u64, len: u64, id: u64) -> Self {
        Self {
            start,
            kind,
            addr,
            len,
            id,
            respond_begin: None,
            respond_end: None,
        }
    }

    /// `respond_end - respond_begin`, once both are known.
    pub fn latency(&self) -> Option<u64> {
        match (self.respond_begin, self.respond_end) {
            (Some(begin), Some(end)) => Some(end.saturating_sub(begin)),
            _ => None,
        }
    }
}

/// Monotonic transaction id allocator.
#[derive(Debug, Default, Clone)]
pub struct TransactionIds {
    next: u64,
}

impl TransactionIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Returns a fresh id.
    pub fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Allocates an id and builds the transaction around it.
    pub fn transaction(&mut self, start: u64, kind: RequestType, addr: u64, len: u64) -> Transaction {
        Transaction::new(start, kind, addr, len, self.allocate())
    }
}

/// One granule-sized device access derived from a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicRequest {
    /// Device address recomposed from `fields`.
    pub addr: u64,
    pub kind: RequestType,
    pub start: u64,
    pub txn_id: u64,
    /// Zero-based position within its transaction.
    pub seq_id: u64,
    /// Decoded field values, in mapping order (lowest-order first).
    pub fields: Vec<u64>,
}

impl AtomicRequest {
    /// Wraps the atomic request for submission within a batch.
    pub fn to_request(&self, base_id: u64, callback: Callback) -> Request {
        Request {
            addr: self.addr,
            kind: self.kind,
            txn_id: self.txn_id,
            seq_id: self.seq_id,
            base_id,
            arrive: None,
            depart: None,
            callback: Some(callback),
        }
    }
}

/// Device-facing request, as admitted to the memory system.
#[derive(Clone)]
pub struct Request {
    pub addr: u64,
    pub kind: RequestType,
    pub txn_id: u64,
    pub seq_id: u64,
    /// Smallest transaction id of the batch this request belongs to.
    ///
    /// Being the minimum, `txn_id - base_id` never underflows for a member
    /// of the batch; completion tracking keys on that offset.
    pub base_id: u64,
    /// Cycle of admission, filled in by the memory system.
    pub arrive: Option<u64>,
    /// Cycle of completion, filled in by the memory system.
    pub depart: Option<u64>,
    pub callback: Option<Callback>,
}

impl Request {
    /// A bare request with no owning transaction and no callback.
    pub fn new(addr: u64, kind: RequestType) -> Self {
        Self {
            addr,
            kind,
            txn_id: 0,
            seq_id: 0,
            base_id: 0,
            arrive: None,
            depart: None,
            callback: None,
        }
    }

    /// Invokes the completion callback, if any.
    pub fn complete(&self) {
        if let Some(callback) = &self.callback {
            callback(self);
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("kind", &self.kind)
            .field("txn_id", &self.txn_id)
            .field("seq_id", &self.seq_id)
            .field("base_id", &self.base_id)
            .field("arrive", &self.arrive)
            .field("depart", &self.depart)
            .finish()
    }
}
