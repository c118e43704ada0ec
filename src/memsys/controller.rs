//! Channel Memory Controller.
//!
//! One [`Controller`] owns one channel's node tree together with its read
//! and write queues. Each cycle it retires finished requests, keeps the
//! rank refresh timers, picks a request with a first-ready/first-come
//! policy and issues the command the standard's prerequisite rules resolve
//! that request to.
//!
//! * **Row hit:** the first command issued for the request is the access itself.
//! * **Row miss:** the bank was closed and needed an ACT first.
//! * **Row conflict:** another row was open and needed a PRE first.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::config::ControllerConfig;
use crate::dram::{AddrVec, Command, CommandRules, DramNode, Level};
use crate::sim::Request;
use crate::stats::MemoryStats;

/// A queued request and its decoded coordinates.
#[derive(Debug)]
struct Queued {
    req: Request,
    addr_vec: AddrVec,
    /// Set once the first command for this request has issued.
    classified: bool,
}

/// Per-channel controller.
pub struct Controller {
    id: usize,
    rules: Rc<dyn CommandRules>,
    channel: DramNode,

    readq: VecDeque<Queued>,
    writeq: VecDeque<Queued>,
    /// Requests whose access command has issued, waiting for their data burst.
    pending: Vec<Request>,

    read_capacity: usize,
    write_capacity: usize,
    write_high: f32,
    write_low: f32,
    configured_high: f32,
    write_mode: bool,

    refresh_interval: Option<u64>,
    trace: bool,
}

impl Controller {
    /// Creates the controller of channel `id`.
    ///
    /// # Arguments
    ///
    /// * `id` - Channel index.
    /// * `rules` - Protocol rules of the memory standard.
    /// * `fanout` - Children per node at each level.
    /// * `config` - Queue sizes, watermarks and refresh switch.
    /// * `trace` - Print every issued command.
    pub fn new(
        id: usize,
        rules: Rc<dyn CommandRules>,
        fanout: &[usize; Level::COUNT],
        config: &ControllerConfig,
        trace: bool,
    ) -> Self {
        let channel = DramNode::new(rules.as_ref(), Level::Channel, id, fanout);
        let refresh_interval = if config.refresh {
            rules.refresh_interval()
        } else {
            None
        };

        Self {
            id,
            rules,
            channel,
            readq: VecDeque::with_capacity(config.read_queue_size),
            writeq: VecDeque::with_capacity(config.write_queue_size),
            pending: Vec::new(),
            read_capacity: config.read_queue_size,
            write_capacity: config.write_queue_size,
            write_high: config.write_high_watermark,
            write_low: config.write_low_watermark,
            configured_high: config.write_high_watermark,
            write_mode: false,
            refresh_interval,
            trace: trace || cfg!(feature = "always-trace"),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Root node of this channel's hierarchy.
    pub fn channel(&self) -> &DramNode {
        &self.channel
    }

    pub fn is_write_mode(&self) -> bool {
        self.write_mode
    }

    pub fn queued_reads(&self) -> usize {
        self.readq.len()
    }

    pub fn queued_writes(&self) -> usize {
        self.writeq.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.readq.is_empty() || !self.writeq.is_empty() || !self.pending.is_empty()
    }

    pub fn set_write_high_watermark(&mut self, threshold: f32) {
        self.write_high = threshold;
    }

    pub fn restore_write_high_watermark(&mut self) {
        self.write_high = self.configured_high;
    }

    /// Queues a request, stamping its arrival cycle.
    ///
    /// # Returns
    ///
    /// `false` if the target queue is full.
    pub fn enqueue(&mut self, req: &Request, addr_vec: AddrVec, clk: u64) -> bool {
        let (queue, capacity) = if req.kind.is_read() {
            (&mut self.readq, self.read_capacity)
        } else {
            (&mut self.writeq, self.write_capacity)
        };
        if queue.len() >= capacity {
            return false;
        }

        let mut req = req.clone();
        req.arrive = Some(clk);
        queue.push_back(Queued {
            req,
            addr_vec,
            classified: false,
        });
        true
    }

    /// Advances the controller by one cycle at `clk`.
    pub fn tick(&mut self, clk: u64, stats: &mut MemoryStats) {
        self.retire(clk, stats);

        if let Some(interval) = self.refresh_interval {
            if clk > 0 && clk % interval == 0 {
                for rank in &mut self.channel.children {
                    rank.refresh_due = true;
                }
            }
        }

        self.update_write_mode();

        if !self.issue_refresh(clk, stats) {
            self.schedule(clk, stats);
        }
    }

    fn retire(&mut self, clk: u64, stats: &mut MemoryStats) {
        if self.pending.is_empty() {
            return;
        }
        let (done, waiting): (Vec<Request>, Vec<Request>) = self
            .pending
            .drain(..)
            .partition(|r| r.depart.map_or(false, |d| d <= clk));
        self.pending = waiting;

        for req in done {
            let latency = match (req.arrive, req.depart) {
                (Some(arrive), Some(depart)) => depart - arrive,
                _ => 0,
            };
            stats.record_completion(req.kind, latency);
            req.complete();
        }
    }

    fn update_write_mode(&mut self) {
        let queued = self.writeq.len() as f32;
        let capacity = self.write_capacity as f32;

        if !self.write_mode {
            if queued > self.write_high * capacity
                || (self.readq.is_empty() && !self.writeq.is_empty())
            {
                self.write_mode = true;
            }
        } else if self.writeq.is_empty()
            || (queued < self.write_low * capacity && !self.readq.is_empty())
        {
            self.write_mode = false;
        }
    }

    /// Issues the next refresh-related command of a due rank, if one is ready.
    fn issue_refresh(&mut self, clk: u64, stats: &mut MemoryStats) -> bool {
        let rules: &dyn CommandRules = self.rules.as_ref();
        let due: Vec<usize> = self
            .channel
            .children
            .iter()
            .filter(|rank| rank.refresh_due)
            .map(|rank| rank.id)
            .collect();

        for rank in due {
            let mut addr = [0usize; Level::COUNT];
            addr[Level::Channel.index()] = self.id;
            addr[Level::Rank.index()] = rank;

            let cmd = self.channel.decode(rules, Command::Ref, &addr);
            if self.channel.check(rules, cmd, &addr, clk) {
                self.channel.update(rules, cmd, &addr, clk);
                stats.record_command(cmd);
                if self.trace {
                    println!("[{:>8}] {:<5} ch{} rank{}", clk, cmd, self.id, rank);
                }
                return true;
            }
        }
        false
    }

    /// First-ready/first-come: the oldest ready row hit, else the oldest ready request.
    fn schedule(&mut self, clk: u64, stats: &mut MemoryStats) {
        let rules: &dyn CommandRules = self.rules.as_ref();
        let held: Vec<bool> = self.channel.children.iter().map(|r| r.refresh_due).collect();
        let queue = if self.write_mode {
            &mut self.writeq
        } else {
            &mut self.readq
        };

        let mut pick: Option<(usize, Command)> = None;
        for (i, q) in queue.iter().enumerate() {
            if held.get(q.addr_vec[Level::Rank.index()]).copied().unwrap_or(false) {
                continue;
            }
            let access = rules.translate(q.req.kind);
            let cmd = self.channel.decode(rules, access, &q.addr_vec);
            if !self.channel.check(rules, cmd, &q.addr_vec, clk) {
                continue;
            }
            if cmd == access && self.channel.row_hit(rules, access, &q.addr_vec) {
                pick = Some((i, cmd));
                break;
            }
            if pick.is_none() {
                pick = Some((i, cmd));
            }
        }

        let Some((i, cmd)) = pick else {
            return;
        };

        let access = rules.translate(queue[i].req.kind);
        let addr = queue[i].addr_vec;
        if !queue[i].classified {
            queue[i].classified = true;
            match cmd {
                c if c == access => stats.row_hits += 1,
                Command::Act => stats.row_misses += 1,
                _ => stats.row_conflicts += 1,
            }
        }

        self.channel.update(rules, cmd, &addr, clk);
        stats.record_command(cmd);
        if self.trace {
            println!(
                "[{:>8}] {:<5} ch{} rank{} bg{} bank{} row{} col{}",
                clk,
                cmd,
                addr[Level::Channel.index()],
                addr[Level::Rank.index()],
                addr[Level::BankGroup.index()],
                addr[Level::Bank.index()],
                addr[Level::Row.index()],
                addr[Level::Column.index()]
            );
        }

        if cmd != access {
            return;
        }
        if let Some(mut done) = queue.remove(i) {
            let latency = if done.req.kind.is_read() {
                rules.read_latency()
            } else {
                rules.write_latency()
            };
            done.req.depart = Some(clk + latency);
            log::debug!(
                "ch{} {} txn {} seq {} departs at {}",
                self.id,
                cmd,
                done.req.txn_id,
                done.req.seq_id,
                clk + latency
            );
            self.pending.push(done.req);
        }
    }
}
