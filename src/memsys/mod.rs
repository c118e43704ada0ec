//! Memory system: per-channel controllers behind the [`MemorySystem`] interface.

/// Configuration-driven construction.
pub mod builder;

/// Per-channel command scheduling and request queues.
pub mod controller;

/// Multi-channel memory routing requests to controllers.
pub mod memory;

/// The interface the batch driver consumes.
pub mod traits;

pub use controller::Controller;
pub use memory::Memory;
pub use traits::MemorySystem;
