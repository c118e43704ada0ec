//! Memory System Interface.
//!
//! The batch driver talks to the memory system only through
//! [`MemorySystem`]. Anything that queues requests, schedules device
//! commands and reports completions can sit behind it.

use crate::sim::{Request, SimContext};

/// A memory subsystem driven one cycle at a time.
pub trait MemorySystem {
    /// Offers a request for admission at `ctx.clk`.
    ///
    /// # Returns
    ///
    /// `false` if the request was rejected for lack of capacity. The callee
    /// never retries a rejected request; the caller does.
    fn admit(&mut self, req: &Request, ctx: &SimContext) -> bool;

    /// Advances controller and device state by one cycle.
    ///
    /// Completion callbacks of requests finishing at `ctx.clk` run
    /// synchronously inside this call.
    fn advance_clock(&mut self, ctx: &SimContext);

    /// `true` while any admitted request has not completed.
    fn has_pending_work(&self) -> bool;

    /// Sets the write-queue fill fraction above which writes are drained.
    ///
    /// `0.0` drains buffered writes unconditionally.
    fn set_write_drain_threshold(&mut self, threshold: f32);

    /// Final flush hook, called once after a batch's last tick.
    fn shutdown(&mut self) {}
}
