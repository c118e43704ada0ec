//! Integration tests for the batch simulation driver.

use dram_sim::common::{RequestType, SimError};
use dram_sim::config::MappingConfig;
use dram_sim::memsys::MemorySystem;
use dram_sim::sim::{AddressMapping, Batch, BatchDriver, DriverState, Request, SimContext, Transaction, TransactionIds};

/// Scripted memory system: fixed latency, optional rejections, full call log.
#[derive(Default)]
struct MockMemory {
    latency: u64,
    reject_next: usize,
    in_flight: Vec<Request>,
    /// `(txn_id, seq_id, clk)` of every admitted request.
    admitted: Vec<(u64, u64, u64)>,
    /// Cycle of every admission attempt.
    attempts: Vec<u64>,
    drain_thresholds: Vec<f32>,
    ticks: Vec<u64>,
    shutdowns: usize,
}

impl MockMemory {
    fn with_latency(latency: u64) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }
}

impl MemorySystem for MockMemory {
    fn admit(&mut self, req: &Request, ctx: &SimContext) -> bool {
        self.attempts.push(ctx.clk);
        if self.reject_next > 0 {
            self.reject_next -= 1;
            return false;
        }
        let mut req = req.clone();
        req.arrive = Some(ctx.clk);
        self.admitted.push((req.txn_id, req.seq_id, ctx.clk));
        self.in_flight.push(req);
        true
    }

    fn advance_clock(&mut self, ctx: &SimContext) {
        self.ticks.push(ctx.clk);
        let latency = self.latency;
        let (done, waiting): (Vec<Request>, Vec<Request>) = self
            .in_flight
            .drain(..)
            .partition(|r| r.arrive.map_or(false, |a| a + latency <= ctx.clk));
        self.in_flight = waiting;
        for mut req in done {
            req.depart = Some(ctx.clk);
            req.complete();
        }
    }

    fn has_pending_work(&self) -> bool {
        !self.in_flight.is_empty()
    }

    fn set_write_drain_threshold(&mut self, threshold: f32) {
        self.drain_thresholds.push(threshold);
    }

    fn shutdown(&mut self) {
        self.shutdowns += 1;
    }
}

fn mapping() -> AddressMapping {
    AddressMapping::new(&MappingConfig::default()).unwrap()
}

/// Creates a read of two bursts followed by a single-burst write.
fn small_batch(ids: &mut TransactionIds) -> Vec<Transaction> {
    vec![
        ids.transaction(0, RequestType::Read, 0x0, 64),
        ids.transaction(0, RequestType::Write, 0x1000, 32),
    ]
}

/// Tests that a batch runs to Finished and every window is filled in.
#[test]
fn test_run_batch_finishes() {
    let mut ids = TransactionIds::new();
    let mut txns = small_batch(&mut ids);
    let mut memory = MockMemory::with_latency(3);
    let mut driver = BatchDriver::new();

    driver.run_batch(&mut memory, &mapping(), &mut txns).unwrap();

    assert_eq!(driver.state(), DriverState::Finished);
    assert_eq!((txns[0].respond_begin, txns[0].respond_end), (Some(0), Some(4)));
    assert_eq!((txns[1].respond_begin, txns[1].respond_end), (Some(2), Some(5)));
    for txn in &txns {
        assert!(txn.respond_begin <= txn.respond_end);
    }

    let stats = driver.stats();
    assert_eq!(stats.reads, 2);
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.stall_ticks, 0);
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.ticks, 6);
    assert_eq!(driver.context().clk, 6);
}

/// Tests that each tick advances the memory once and attempts at most one admission.
#[test]
fn test_one_admission_per_tick() {
    let mut ids = TransactionIds::new();
    let mut txns = vec![ids.transaction(0, RequestType::Read, 0x2000, 256)];
    let mut memory = MockMemory::with_latency(1);
    memory.reject_next = 3;
    let mut driver = BatchDriver::new();

    driver.run_batch(&mut memory, &mapping(), &mut txns).unwrap();

    assert!(memory.attempts.windows(2).all(|w| w[0] < w[1]));
    let expected_ticks: Vec<u64> = (0..driver.stats().ticks).collect();
    assert_eq!(memory.ticks, expected_ticks);
    assert_eq!(memory.attempts.len(), 8 + 3);
}

/// Tests that a rejected request is retried unchanged until admitted.
#[test]
fn test_stall_retries_same_request() {
    let mut ids = TransactionIds::new();
    let mut txns = small_batch(&mut ids);
    let mut memory = MockMemory::with_latency(2);
    memory.reject_next = 2;
    let mut driver = BatchDriver::new();

    driver.run_batch(&mut memory, &mapping(), &mut txns).unwrap();

    assert_eq!(memory.attempts, vec![0, 1, 2, 3, 4]);
    let order: Vec<(u64, u64)> = memory.admitted.iter().map(|&(t, s, _)| (t, s)).collect();
    assert_eq!(order, vec![(0, 0), (0, 1), (1, 0)]);
    assert_eq!(memory.admitted[0].2, 2);
    assert_eq!(driver.stats().stall_ticks, 2);
    assert_eq!(driver.stats().reads, 2);
    assert_eq!(txns[0].respond_begin, Some(2));
}

/// Tests that draining forces the write threshold to zero and shutdown runs once.
#[test]
fn test_drain_and_shutdown() {
    let mut ids = TransactionIds::new();
    let mut txns = small_batch(&mut ids);
    let mut memory = MockMemory::with_latency(5);
    let mut driver = BatchDriver::new();

    driver.run_batch(&mut memory, &mapping(), &mut txns).unwrap();

    assert!(!memory.drain_thresholds.is_empty());
    assert!(memory.drain_thresholds.iter().all(|&t| t == 0.0));
    assert_eq!(memory.shutdowns, 1);
    assert!(driver.is_ended());
    assert!(!memory.has_pending_work());
}

/// Tests that a stall in one batch is not carried into the next.
#[test]
fn test_reset_between_batches() {
    let mapping = mapping();
    let mut ids = TransactionIds::new();
    let mut memory = MockMemory::with_latency(2);
    let mut driver = BatchDriver::new();

    let mut first = small_batch(&mut ids);
    memory.reject_next = 1;
    driver.run_batch(&mut memory, &mapping, &mut first).unwrap();
    let after_first = driver.stats().clone();
    let clk = driver.context().clk;
    assert_eq!(after_first.reads + after_first.writes, 3);
    assert_eq!(after_first.stall_ticks, 1);

    driver.reset();
    assert_eq!(driver.state(), DriverState::Idle);
    assert!(!driver.is_stalled());
    assert!(!driver.is_ended());
    assert_eq!(driver.context().clk, clk);
    assert_eq!(driver.stats().ticks, after_first.ticks);

    let mut second = vec![ids.transaction(clk, RequestType::Read, 0x8000, 32)];
    driver.run_batch(&mut memory, &mapping, &mut second).unwrap();

    let stats = driver.stats();
    assert_eq!(stats.reads, after_first.reads + 1);
    assert_eq!(stats.writes, after_first.writes);
    assert_eq!(stats.stall_ticks, 1);
    assert_eq!(stats.batches, 2);
    assert!(stats.ticks > after_first.ticks);

    let second_batch: Vec<u64> = memory
        .admitted
        .iter()
        .filter(|&&(_, _, at)| at >= clk)
        .map(|&(t, _, _)| t)
        .collect();
    assert_eq!(second_batch, vec![2]);
    assert_eq!(memory.shutdowns, 2);
    assert!(second[0].respond_begin.unwrap() >= clk);
}

/// Tests that a finished driver refuses a new batch until reset.
#[test]
fn test_run_batch_requires_reset() {
    let mut ids = TransactionIds::new();
    let mut memory = MockMemory::with_latency(1);
    let mut driver = BatchDriver::new();

    driver.run_batch(&mut memory, &mapping(), &mut small_batch(&mut ids)).unwrap();
    let result = driver.run_batch(&mut memory, &mapping(), &mut small_batch(&mut ids));

    assert!(matches!(result, Err(SimError::DriverNotReset)));
    assert_eq!(driver.stats().batches, 1);
}

/// Tests that duplicate transaction ids are rejected before anything issues.
#[test]
fn test_duplicate_transaction_ids() {
    let mut txns = vec![
        Transaction::new(0, RequestType::Read, 0x0, 32, 4),
        Transaction::new(0, RequestType::Read, 0x40, 32, 4),
    ];
    let mut memory = MockMemory::with_latency(1);
    let mut driver = BatchDriver::new();

    let result = driver.run_batch(&mut memory, &mapping(), &mut txns);

    assert!(matches!(result, Err(SimError::DuplicateTransaction(4))));
    assert!(memory.attempts.is_empty());
    assert_eq!(driver.state(), DriverState::Idle);
}

/// Tests that one untranslatable transaction aborts the whole batch.
#[test]
fn test_translation_failure_aborts_batch() {
    let mapping = mapping();
    let mut ids = TransactionIds::new();
    let mut txns = vec![
        ids.transaction(0, RequestType::Read, 0x0, 32),
        ids.transaction(0, RequestType::Read, mapping.capacity() - 32, 64),
    ];
    let mut memory = MockMemory::with_latency(1);
    let mut driver = BatchDriver::new();

    let result = driver.run_batch(&mut memory, &mapping, &mut txns);

    assert!(matches!(result, Err(SimError::AddressSpaceExhausted { txn_id: 1, .. })));
    assert!(memory.attempts.is_empty());
    assert_eq!(txns[0].respond_begin, None);
}

/// Tests a batch whose transaction ids are far apart.
#[test]
fn test_sparse_id_batch() {
    let far = 1u64 << 60;
    let mut txns = vec![
        Transaction::new(0, RequestType::Read, 0x0, 32, far),
        Transaction::new(0, RequestType::Write, 0x40, 32, 0),
    ];
    let mut memory = MockMemory::with_latency(2);
    let mut driver = BatchDriver::new();

    driver.run_batch(&mut memory, &mapping(), &mut txns).unwrap();

    assert_eq!((txns[0].respond_begin, txns[0].respond_end), (Some(0), Some(2)));
    assert_eq!((txns[1].respond_begin, txns[1].respond_end), (Some(1), Some(3)));
}

/// Tests a batch whose only transaction has zero length.
#[test]
fn test_empty_batch() {
    let mut txns = vec![Transaction::new(0, RequestType::Write, 0x100, 0, 0)];
    let mut memory = MockMemory::with_latency(1);
    let mut driver = BatchDriver::new();

    driver.run_batch(&mut memory, &mapping(), &mut txns).unwrap();

    assert_eq!(driver.state(), DriverState::Finished);
    assert_eq!(driver.stats().ticks, 1);
    assert_eq!(txns[0].respond_begin, None);
    assert_eq!(txns[0].respond_end, None);
}

/// Tests the flattened request stream order and the batch's base id.
#[test]
fn test_batch_stream_order() {
    let txns = vec![
        Transaction::new(0, RequestType::Read, 0x0, 96, 12),
        Transaction::new(0, RequestType::Write, 0x400, 32, 10),
    ];

    let batch = Batch::translate(&mapping(), &txns).unwrap();
    let stream: Vec<(usize, u64, u64)> = batch.stream().map(|(i, r)| (i, r.txn_id, r.seq_id)).collect();

    assert_eq!(batch.base_id(), 10);
    assert_eq!(batch.len(), 4);
    assert_eq!(batch.requests_of(1).len(), 1);
    assert!(batch.requests_of(5).is_empty());
    assert_eq!(stream, vec![(0, 12, 0), (0, 12, 1), (0, 12, 2), (1, 10, 0)]);
}
