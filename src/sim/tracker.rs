//! Transaction Completion Tracking.
//!
//! The memory system reports completions per atomic request. The tracker
//! stores each arrival/departure pair under `(txn_id - base_id, seq_id)` and,
//! once the batch is finished, folds them into one response window per
//! transaction.

use std::collections::HashMap;

use crate::sim::request::{Request, Transaction};

/// Arrival and departure cycle of one atomic request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub arrive: u64,
    pub depart: u64,
}

/// Per-batch table of atomic-request completions.
///
/// Slots are keyed by `txn_id - base_id`, where `base_id` is the smallest id
/// of the batch, so every offset of a batch member is non-negative. Ids may
/// be sparse; only the transactions of the batch occupy slots.
#[derive(Debug, Default)]
pub struct TransactionTracker {
    base_id: u64,
    records: HashMap<u64, Vec<Option<Completion>>>,
}

impl TransactionTracker {
    /// Creates the lookup for a batch.
    ///
    /// Transactions with an id below `base_id` cannot be keyed and are left
    /// out; their completions are reported as unknown.
    ///
    /// # Arguments
    ///
    /// * `base_id` - Smallest transaction id in the batch.
    /// * `shape` - `(txn_id, request count)` for every transaction.
    pub fn new(base_id: u64, shape: impl IntoIterator<Item = (u64, usize)>) -> Self {
        let mut records = HashMap::new();
        for (txn_id, count) in shape {
            match txn_id.checked_sub(base_id) {
                Some(slot) => {
                    records.insert(slot, vec![None; count]);
                }
                None => log::warn!("txn {} lies below base id {}", txn_id, base_id),
            }
        }
        Self { base_id, records }
    }

    pub fn base_id(&self) -> u64 {
        self.base_id
    }

    /// Records the completion of one atomic request.
    ///
    /// Called from the memory system's completion callback.
    pub fn record(&mut self, req: &Request) {
        let (Some(arrive), Some(depart)) = (req.arrive, req.depart) else {
            log::warn!(
                "completion of txn {} seq {} without timestamps",
                req.txn_id,
                req.seq_id
            );
            return;
        };

        let slot = req
            .txn_id
            .checked_sub(req.base_id)
            .and_then(|i| self.records.get_mut(&i))
            .and_then(|reqs| reqs.get_mut(req.seq_id as usize));

        match slot {
            Some(entry) => *entry = Some(Completion { arrive, depart }),
            None => log::warn!(
                "completion for unknown txn {} seq {} (base {})",
                req.txn_id,
                req.seq_id,
                req.base_id
            ),
        }
    }

    /// Completion of one atomic request, if recorded.
    pub fn completion(&self, txn_id: u64, seq_id: u64) -> Option<Completion> {
        self.requests(txn_id)?.get(seq_id as usize).copied().flatten()
    }

    fn requests(&self, txn_id: u64) -> Option<&Vec<Option<Completion>>> {
        let slot = txn_id.checked_sub(self.base_id)?;
        self.records.get(&slot)
    }

    /// `(min arrival, max departure)` over the recorded requests of a transaction.
    pub fn window(&self, txn_id: u64) -> Option<(u64, u64)> {
        self.requests(txn_id)?
            .iter()
            .flatten()
            .fold(None, |acc, c| match acc {
                None => Some((c.arrive, c.depart)),
                Some((begin, end)) => Some((begin.min(c.arrive), end.max(c.depart))),
            })
    }

    /// Whether every request of every transaction has completed.
    pub fn is_complete(&self) -> bool {
        self.records
            .values()
            .all(|reqs| reqs.iter().all(Option::is_some))
    }

    /// Writes each transaction's response window back onto the caller's records.
    pub fn apply(&self, transactions: &mut [Transaction]) {
        for txn in transactions {
            let window = self.window(txn.id);
            txn.respond_begin = window.map(|(begin, _)| begin);
            txn.respond_end = window.map(|(_, end)| end);
        }
    }
}
