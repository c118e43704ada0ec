//! Device model: hierarchy, command rules and memory standards.
//!
//! [`rules`] defines the generic vocabulary (levels, commands, states,
//! timing entries) and the [`CommandRules`] capability each standard
//! implements. [`node`] holds the per-node state machine that evaluates
//! those rules. Concrete standards are selected by name through [`standard`].

/// High Bandwidth Memory rules and speed bins.
pub mod hbm;

/// Hierarchy nodes and the generic legality/timing walk.
pub mod node;

/// Non-volatile memory rules and speed bins.
pub mod nvm;

/// Levels, commands, states and the `CommandRules` trait.
pub mod rules;

use std::rc::Rc;

use crate::common::{SimError, SimResult};

pub use hbm::Hbm;
pub use node::DramNode;
pub use nvm::Nvm;
pub use rules::{AddrVec, Command, CommandClass, CommandRules, Level, Rule, State, TimingEntry};

/// Names of the registered standards.
pub const STANDARDS: &[&str] = &["HBM", "NVM"];

/// Builds the rules of the standard registered under `name` for a speed bin.
///
/// # Arguments
///
/// * `name` - Standard name, case-insensitive (`"HBM"`, `"NVM"`).
/// * `speed` - Speed bin name, e.g. `"HBM_1Gbps"`.
pub fn standard(name: &str, speed: &str) -> SimResult<Rc<dyn CommandRules>> {
    match name.to_ascii_uppercase().as_str() {
        "HBM" => Ok(Rc::new(Hbm::new(speed)?)),
        "NVM" => Ok(Rc::new(Nvm::new(speed)?)),
        _ => Err(SimError::UnknownStandard(name.to_string())),
    }
}
