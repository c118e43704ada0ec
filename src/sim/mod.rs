//! Simulation harness: transactions, address translation, completion
//! tracking, the batch driver and trace loading.

/// Batch driver and simulation context.
pub mod driver;

/// Transaction trace loading.
pub mod loader;

/// Transactions, atomic requests and device requests.
pub mod request;

/// Per-batch completion tracking.
pub mod tracker;

/// Address field layout and transaction splitting.
pub mod translate;

pub use driver::{Batch, BatchDriver, DriverState, DriverStats, SimContext};
pub use request::{AtomicRequest, Callback, Request, Transaction, TransactionIds};
pub use tracker::{Completion, TransactionTracker};
pub use translate::AddressMapping;
