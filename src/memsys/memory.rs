//! Multi-channel Memory.
//!
//! [`Memory`] routes each admitted request to the controller of the channel
//! its address decodes to and ticks all controllers in lockstep. It is the
//! reference [`MemorySystem`] the batch driver runs against.

use std::rc::Rc;

use crate::config::ControllerConfig;
use crate::dram::{AddrVec, CommandRules, Level};
use crate::memsys::controller::Controller;
use crate::memsys::traits::MemorySystem;
use crate::sim::{AddressMapping, Request, SimContext};
use crate::stats::MemoryStats;

/// All channels of one memory device.
pub struct Memory {
    rules: Rc<dyn CommandRules>,
    mapping: AddressMapping,
    controllers: Vec<Controller>,
    stats: MemoryStats,
}

impl Memory {
    /// Creates one controller per channel the mapping addresses.
    pub fn new(
        rules: Rc<dyn CommandRules>,
        mapping: AddressMapping,
        config: &ControllerConfig,
        trace: bool,
    ) -> Self {
        let fanout = mapping.fanout();
        let controllers = (0..mapping.channels())
            .map(|id| Controller::new(id, Rc::clone(&rules), &fanout, config, trace))
            .collect();

        Self {
            rules,
            mapping,
            controllers,
            stats: MemoryStats::default(),
        }
    }

    pub fn rules(&self) -> &dyn CommandRules {
        self.rules.as_ref()
    }

    pub fn mapping(&self) -> &AddressMapping {
        &self.mapping
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    /// Device coordinates of `addr`; bits above the mapped width are ignored.
    pub fn decode(&self, addr: u64) -> AddrVec {
        let values = self.mapping.decompose_truncated(addr);
        self.mapping.addr_vec(&values)
    }
}

impl MemorySystem for Memory {
    fn admit(&mut self, req: &Request, ctx: &SimContext) -> bool {
        let addr_vec = self.decode(req.addr);
        let channel = addr_vec[Level::Channel.index()];
        let admitted = match self.controllers.get_mut(channel) {
            Some(ctrl) => ctrl.enqueue(req, addr_vec, ctx.clk),
            None => false,
        };
        self.stats.record_admission(req.kind, admitted);
        admitted
    }

    fn advance_clock(&mut self, ctx: &SimContext) {
        for ctrl in &mut self.controllers {
            ctrl.tick(ctx.clk, &mut self.stats);
        }
    }

    fn has_pending_work(&self) -> bool {
        self.controllers.iter().any(Controller::has_pending)
    }

    fn set_write_drain_threshold(&mut self, threshold: f32) {
        for ctrl in &mut self.controllers {
            ctrl.set_write_high_watermark(threshold);
        }
    }

    fn shutdown(&mut self) {
        for ctrl in &mut self.controllers {
            ctrl.restore_write_high_watermark();
        }
        log::info!(
            "memory idle: {} reads, {} writes completed, avg read latency {:.2} cycles",
            self.stats.reads_completed,
            self.stats.writes_completed,
            self.stats.avg_read_latency()
        );
    }
}
