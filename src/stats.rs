//! Simulation statistics collection and reporting.
//!
//! Tracks per-command counts, row-buffer outcomes and request latencies in
//! the memory system, and prints them next to the batch driver's counters.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::common::RequestType;
use crate::dram::{Command, CommandRules};
use crate::sim::DriverStats;

/// Memory-system statistics, summed over all channels.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MemoryStats {
    pub commands: BTreeMap<&'static str, u64>,

    pub admitted_reads: u64,
    pub admitted_writes: u64,
    pub rejected: u64,

    pub reads_completed: u64,
    pub writes_completed: u64,
    pub read_latency_total: u64,
    pub read_latency_max: u64,
    /// Completed reads per latency (departure minus arrival, in cycles).
    pub read_latency_histogram: BTreeMap<u64, u64>,

    pub row_hits: u64,
    pub row_misses: u64,
    pub row_conflicts: u64,

    pub refreshes: u64,
}

impl MemoryStats {
    pub fn record_command(&mut self, cmd: Command) {
        *self.commands.entry(cmd.name()).or_insert(0) += 1;
        if cmd == Command::Ref {
            self.refreshes += 1;
        }
    }

    pub fn command_count(&self, cmd: Command) -> u64 {
        self.commands.get(cmd.name()).copied().unwrap_or(0)
    }

    pub fn record_admission(&mut self, kind: RequestType, admitted: bool) {
        match (admitted, kind) {
            (false, _) => self.rejected += 1,
            (true, RequestType::Read) => self.admitted_reads += 1,
            (true, RequestType::Write) => self.admitted_writes += 1,
        }
    }

    pub fn record_completion(&mut self, kind: RequestType, latency: u64) {
        match kind {
            RequestType::Read => {
                self.reads_completed += 1;
                self.read_latency_total += latency;
                self.read_latency_max = self.read_latency_max.max(latency);
                *self.read_latency_histogram.entry(latency).or_insert(0) += 1;
            }
            RequestType::Write => self.writes_completed += 1,
        }
    }

    pub fn avg_read_latency(&self) -> f64 {
        if self.reads_completed == 0 {
            0.0
        } else {
            self.read_latency_total as f64 / self.reads_completed as f64
        }
    }
}

/// Prints a formatted summary of the run.
pub fn print_report(driver: &DriverStats, memory: &MemoryStats, rules: &dyn CommandRules) {
    let t_ck = rules.clock_period_ns();
    let cyc = driver.ticks.max(1);

    println!("\n==========================================================");
    println!("MEMORY SIMULATION STATISTICS");
    println!("==========================================================");
    println!("standard                 {} ({})", rules.name(), rules.speed_name());
    println!("sim_cycles               {}", driver.ticks);
    println!("sim_time                 {:.1} ns", driver.ticks as f64 * t_ck);
    println!("batches                  {}", driver.batches);
    println!("----------------------------------------------------------");
    println!("DRIVER");
    println!("  issued.reads           {}", driver.reads);
    println!("  issued.writes          {}", driver.writes);
    println!(
        "  stalls                 {} ({:.2}%)",
        driver.stall_ticks,
        (driver.stall_ticks as f64 / cyc as f64) * 100.0
    );
    println!("----------------------------------------------------------");
    println!("REQUESTS");
    println!("  admitted.reads         {}", memory.admitted_reads);
    println!("  admitted.writes        {}", memory.admitted_writes);
    println!("  rejected               {}", memory.rejected);
    println!("  completed.reads        {}", memory.reads_completed);
    println!("  completed.writes       {}", memory.writes_completed);
    println!(
        "  read_latency.avg       {:.2} cycles ({:.1} ns)",
        memory.avg_read_latency(),
        memory.avg_read_latency() * t_ck
    );
    println!("  read_latency.max       {} cycles", memory.read_latency_max);
    for (latency, count) in &memory.read_latency_histogram {
        println!("  read_latency[{:>5}]    {}", latency, count);
    }
    println!("----------------------------------------------------------");
    println!("ROW BUFFER");
    let accesses = memory.row_hits + memory.row_misses + memory.row_conflicts;
    let pct = |n: u64| {
        if accesses > 0 {
            (n as f64 / accesses as f64) * 100.0
        } else {
            0.0
        }
    };
    println!("  row.hits               {} ({:.2}%)", memory.row_hits, pct(memory.row_hits));
    println!("  row.misses             {} ({:.2}%)", memory.row_misses, pct(memory.row_misses));
    println!(
        "  row.conflicts          {} ({:.2}%)",
        memory.row_conflicts,
        pct(memory.row_conflicts)
    );
    println!("----------------------------------------------------------");
    println!("COMMANDS");
    for cmd in Command::ALL {
        let n = memory.command_count(cmd);
        if n > 0 {
            println!("  cmd.{:<18} {}", cmd.name(), n);
        }
    }
    println!("  refreshes              {}", memory.refreshes);
    println!("==========================================================");
}
