//! DRAM Simulator CLI.
//!
//! The main executable for the simulator. It handles command-line argument
//! parsing, memory construction, the batch loop and reporting.
//!
//! # Usage
//!
//! * With `--trace`, transactions are read from a trace file.
//! * Without it, a two-transaction demo batch is simulated.
//!
//! `--batch-size` splits the transactions into consecutive batches that run
//! on one driver, reset in between.

use clap::Parser;
use std::path::PathBuf;
use std::{fs, process};

use dram_sim::common::{RequestType, SimError, SimResult};
use dram_sim::config::Config;
use dram_sim::memsys::Memory;
use dram_sim::sim::{loader, BatchDriver, Transaction, TransactionIds};
use dram_sim::stats;

/// Command-line arguments for the memory simulator.
#[derive(Parser, Debug)]
#[command(author, version, about = "Cycle-Accurate DRAM Simulator")]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    trace: Option<PathBuf>,

    #[arg(short, long)]
    batch_size: Option<usize>,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Main entry point for the memory simulator.
///
/// # Behavior
///
/// 1. **Configuration**: Parses arguments and loads the TOML configuration
///    (defaults when none is given).
/// 2. **Initialization**: Builds the memory from the configured standard and mapping.
/// 3. **Simulation**: Runs the transactions batch by batch.
/// 4. **Teardown**: Prints the per-transaction windows and statistics, and
///    optionally writes them as JSON.
fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("\n[!] FATAL: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> SimResult<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let mut memory = Memory::from_config(&config)?;
    let mapping = memory.mapping().clone();

    println!("Global Configuration");
    println!("--------------------");
    println!("Memory:");
    println!("  Standard:           {}", config.memory.standard);
    println!("  Speed:              {}", config.memory.speed);
    println!("  Channels:           {}", mapping.channels());
    println!("  Granule:            {} bytes", mapping.granule());
    println!("  Address Bits:       {}", mapping.total_bits());
    println!("Controller:");
    println!("  Read Queue:         {}", config.controller.read_queue_size);
    println!("  Write Queue:        {}", config.controller.write_queue_size);
    println!(
        "  Write Watermarks:   {:.2} / {:.2}",
        config.controller.write_low_watermark, config.controller.write_high_watermark
    );
    println!(
        "  Refresh:            {}",
        if config.controller.refresh {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    println!("--------------------");

    let mut ids = TransactionIds::new();
    let mut transactions = match &args.trace {
        Some(path) => {
            println!("[*] Trace Mode: {}", path.display());
            loader::load_trace(path, mapping.granule(), &mut ids)?
        }
        None => {
            println!("[*] Demo Mode");
            demo_batch(&mut ids)
        }
    };

    let batch_size = args.batch_size.unwrap_or(transactions.len()).max(1);
    let mut driver = BatchDriver::new();
    for batch in transactions.chunks_mut(batch_size) {
        driver.run_batch(&mut memory, &mapping, batch)?;
        driver.reset();
    }

    println!("\n{:>6} {:>2} {:>12} {:>8} {:>8} {:>10} {:>10}", "id", "rw", "addr", "len", "start", "begin", "end");
    for txn in &transactions {
        println!(
            "{:>6} {:>2} {:>#12x} {:>8} {:>8} {:>10} {:>10}",
            txn.id,
            txn.kind.tag(),
            txn.addr,
            txn.len,
            txn.start,
            fmt_cycle(txn.respond_begin),
            fmt_cycle(txn.respond_end)
        );
    }

    stats::print_report(driver.stats(), memory.stats(), memory.rules());

    if let Some(path) = &args.output {
        let report = serde_json::json!({
            "transactions": transactions,
            "driver": driver.stats(),
            "memory": memory.stats(),
        });
        let text = serde_json::to_string_pretty(&report)?;
        fs::write(path, text).map_err(|source| SimError::Io {
            path: path.clone(),
            source,
        })?;
        println!("[*] Results written to {}", path.display());
    }

    Ok(())
}

/// Demo batch: a two-burst read followed by a two-burst write.
fn demo_batch(ids: &mut TransactionIds) -> Vec<Transaction> {
    vec![
        ids.transaction(0, RequestType::Read, 305_419_904, 64),
        ids.transaction(1, RequestType::Write, 1_287_476_928, 64),
    ]
}

fn fmt_cycle(cycle: Option<u64>) -> String {
    cycle.map_or_else(|| "-".to_string(), |c| c.to_string())
}
