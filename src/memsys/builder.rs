//! Memory Builder.
//!
//! Wires a [`Memory`] together from the configuration: looks up the
//! memory standard, validates the address mapping and creates one
//! controller per channel.

use crate::common::SimResult;
use crate::config::Config;
use crate::dram;
use crate::memsys::memory::Memory;
use crate::sim::AddressMapping;

impl Memory {
    /// Builds the memory described by `config`.
    ///
    /// # Returns
    ///
    /// The memory, or an error if the standard, speed bin or address
    /// mapping is invalid.
    pub fn from_config(config: &Config) -> SimResult<Self> {
        let rules = dram::standard(&config.memory.standard, &config.memory.speed)?;
        let mapping = AddressMapping::new(&config.mapping)?;

        log::info!(
            "building {} ({}) with {} channels, {}-byte granule, {} address bits",
            rules.name(),
            rules.speed_name(),
            mapping.channels(),
            mapping.granule(),
            mapping.total_bits()
        );

        Ok(Memory::new(
            rules,
            mapping,
            &config.controller,
            config.general.trace_commands,
        ))
    }
}
