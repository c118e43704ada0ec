//! Batch Simulation Driver.
//!
//! The driver turns a batch of transactions into a flat stream of atomic
//! requests and feeds it to a [`MemorySystem`] one admission attempt per
//! tick. A rejected request is retried unchanged on the next tick. Once the
//! stream is exhausted the driver forces the write queue to drain and keeps
//! ticking until the memory system reports no pending work.
//!
//! # Tick contract
//!
//! Every tick makes at most one admission attempt, advances the memory
//! system's clock by exactly one cycle, and increments [`SimContext::clk`]
//! once.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde::Serialize;

use crate::common::{RequestType, SimError, SimResult};
use crate::memsys::MemorySystem;
use crate::sim::request::{AtomicRequest, Callback, Request, Transaction};
use crate::sim::tracker::TransactionTracker;
use crate::sim::translate::AddressMapping;

/// Simulation time shared with every component that timestamps events.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimContext {
    /// Current memory cycle.
    pub clk: u64,
}

/// Control state of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Advancing,
    Issuing,
    Stalled,
    Draining,
    Finished,
}

/// Counters accumulated across batches.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DriverStats {
    pub ticks: u64,
    pub reads: u64,
    pub writes: u64,
    pub stall_ticks: u64,
    pub batches: u64,
}

/// Atomic requests of one batch, grouped by transaction in input order.
#[derive(Debug)]
pub struct Batch {
    base_id: u64,
    requests: Vec<(u64, Vec<AtomicRequest>)>,
}

impl Batch {
    /// Translates every transaction of the batch up front.
    ///
    /// Any translation failure aborts the whole batch before a single
    /// request is issued.
    pub fn translate(mapping: &AddressMapping, transactions: &[Transaction]) -> SimResult<Self> {
        let mut seen = HashSet::with_capacity(transactions.len());
        for txn in transactions {
            if !seen.insert(txn.id) {
                return Err(SimError::DuplicateTransaction(txn.id));
            }
        }

        // The minimum keeps every `txn_id - base_id` offset non-negative.
        let base_id = transactions.iter().map(|t| t.id).min().unwrap_or(0);
        let requests = transactions
            .iter()
            .map(|txn| Ok((txn.id, mapping.translate(txn)?)))
            .collect::<SimResult<Vec<_>>>()?;

        Ok(Self { base_id, requests })
    }

    pub fn base_id(&self) -> u64 {
        self.base_id
    }

    /// Total number of atomic requests.
    pub fn len(&self) -> usize {
        self.requests.iter().map(|(_, reqs)| reqs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Requests of the `index`-th transaction.
    pub fn requests_of(&self, index: usize) -> &[AtomicRequest] {
        self.requests
            .get(index)
            .map(|(_, reqs)| reqs.as_slice())
            .unwrap_or(&[])
    }

    /// Flattened stream of `(transaction index, request)`, transactions in
    /// input order and requests in sequence order.
    pub fn stream(&self) -> impl Iterator<Item = (usize, &AtomicRequest)> + '_ {
        self.requests
            .iter()
            .enumerate()
            .flat_map(|(i, (_, reqs))| reqs.iter().map(move |r| (i, r)))
    }

    /// Empty completion table shaped after this batch.
    pub fn tracker(&self) -> TransactionTracker {
        TransactionTracker::new(
            self.base_id,
            self.requests.iter().map(|(id, reqs)| (*id, reqs.len())),
        )
    }
}

/// Drives batches of transactions through a memory system.
#[derive(Debug)]
pub struct BatchDriver {
    ctx: SimContext,
    stats: DriverStats,
    state: DriverState,
    stall: bool,
    end: bool,
}

impl Default for BatchDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchDriver {
    pub fn new() -> Self {
        Self {
            ctx: SimContext::default(),
            stats: DriverStats::default(),
            state: DriverState::Idle,
            stall: false,
            end: false,
        }
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_stalled(&self) -> bool {
        self.stall
    }

    pub fn is_ended(&self) -> bool {
        self.end
    }

    /// Prepares the driver for another batch.
    ///
    /// Clears the stall and end-of-stream flags only; the clock and the
    /// issued-request counters keep accumulating.
    pub fn reset(&mut self) {
        self.stall = false;
        self.end = false;
        self.state = DriverState::Idle;
    }

    /// Runs one batch to completion.
    ///
    /// On success every transaction carries its response window
    /// (`respond_begin`, `respond_end`); a transaction that produced no
    /// atomic requests keeps `None` in both.
    ///
    /// # Arguments
    ///
    /// * `memory` - Memory system receiving the requests.
    /// * `mapping` - Address layout used to split transactions.
    /// * `transactions` - The batch, processed strictly in order.
    pub fn run_batch<M: MemorySystem + ?Sized>(
        &mut self,
        memory: &mut M,
        mapping: &AddressMapping,
        transactions: &mut [Transaction],
    ) -> SimResult<()> {
        if self.state != DriverState::Idle {
            return Err(SimError::DriverNotReset);
        }

        let batch = Batch::translate(mapping, transactions)?;
        log::debug!(
            "batch of {} transactions -> {} requests (base id {}) at clk {}",
            transactions.len(),
            batch.len(),
            batch.base_id(),
            self.ctx.clk
        );

        let tracker = Rc::new(RefCell::new(batch.tracker()));
        let callback: Callback = {
            let tracker = Rc::clone(&tracker);
            Rc::new(move |req: &Request| tracker.borrow_mut().record(req))
        };

        let mut stream = batch.stream();
        let mut current: Option<Request> = None;
        self.state = DriverState::Advancing;

        while !self.end || memory.has_pending_work() {
            if !self.end && !self.stall {
                match stream.next() {
                    Some((_, atomic)) => {
                        current = Some(atomic.to_request(batch.base_id(), Rc::clone(&callback)));
                        self.state = DriverState::Issuing;
                    }
                    None => {
                        current = None;
                        self.end = true;
                        self.state = DriverState::Draining;
                    }
                }
            }

            match current.as_ref() {
                Some(req) if !self.end => self.issue(memory, req),
                _ => memory.set_write_drain_threshold(0.0),
            }

            memory.advance_clock(&self.ctx);
            self.ctx.clk += 1;
            self.stats.ticks += 1;
        }

        memory.shutdown();
        self.state = DriverState::Finished;
        self.stats.batches += 1;

        let tracker = tracker.borrow();
        if !tracker.is_complete() {
            log::warn!("batch finished with unreported completions");
        }
        tracker.apply(transactions);
        log::debug!("batch finished at clk {}", self.ctx.clk);
        Ok(())
    }

    fn issue<M: MemorySystem + ?Sized>(&mut self, memory: &mut M, req: &Request) {
        self.stall = !memory.admit(req, &self.ctx);
        if self.stall {
            self.stats.stall_ticks += 1;
            self.state = DriverState::Stalled;
            return;
        }
        match req.kind {
            RequestType::Read => self.stats.reads += 1,
            RequestType::Write => self.stats.writes += 1,
        }
        self.state = DriverState::Advancing;
    }
}
