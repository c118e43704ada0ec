//! Address Translation.
//!
//! An [`AddressMapping`] describes how a device address splits into fields,
//! lowest-order first: the byte offset inside a granule, then the fields that
//! change fastest between successive bursts, up to the row. The same mapping
//! decomposes transactions into atomic requests and routes requests inside
//! the memory system.

use std::collections::HashSet;

use crate::common::{SimError, SimResult};
use crate::config::{Field, FieldConfig, MappingConfig};
use crate::dram::rules::{AddrVec, Level};
use crate::sim::request::{AtomicRequest, Transaction};

const MAX_ADDRESS_BITS: u32 = 63;

impl Field {
    /// Hierarchy level selected by the field, `None` for the byte offset.
    pub fn level(self) -> Option<Level> {
        match self {
            Field::Offset => None,
            Field::Channel => Some(Level::Channel),
            Field::Rank => Some(Level::Rank),
            Field::BankGroup => Some(Level::BankGroup),
            Field::Bank => Some(Level::Bank),
            Field::Row => Some(Level::Row),
            Field::Column => Some(Level::Column),
        }
    }
}

/// Validated address field layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMapping {
    granule: u64,
    fields: Vec<FieldConfig>,
    total_bits: u32,
}

impl AddressMapping {
    /// Validates a mapping configuration.
    ///
    /// The granule must be a power of two, the first field must be the byte
    /// offset with exactly `log2(granule)` bits, no field may repeat, the row
    /// field must be present, every other field must be at least one bit wide,
    /// and the total width must not exceed 63 bits.
    pub fn new(config: &MappingConfig) -> SimResult<Self> {
        let granule = config.granule;
        if granule == 0 || !granule.is_power_of_two() {
            return Err(SimError::InvalidMapping(format!(
                "granule {} is not a power of two",
                granule
            )));
        }

        let offset_bits = granule.trailing_zeros();
        match config.fields.first() {
            Some(first) if first.field == Field::Offset && first.bits == offset_bits => {}
            _ => {
                return Err(SimError::InvalidMapping(format!(
                    "first field must be offset with {} bits for a {}-byte granule",
                    offset_bits, granule
                )))
            }
        }

        let mut seen = HashSet::new();
        for f in &config.fields {
            if !seen.insert(f.field) {
                return Err(SimError::InvalidMapping(format!(
                    "field {:?} declared twice",
                    f.field
                )));
            }
            if f.field != Field::Offset && f.bits == 0 {
                return Err(SimError::InvalidMapping(format!(
                    "field {:?} has zero width",
                    f.field
                )));
            }
        }
        if !seen.contains(&Field::Row) {
            return Err(SimError::InvalidMapping("row field missing".to_string()));
        }

        let total_bits: u32 = config.fields.iter().map(|f| f.bits).sum();
        if total_bits > MAX_ADDRESS_BITS {
            return Err(SimError::InvalidMapping(format!(
                "{} address bits exceed the {}-bit limit",
                total_bits, MAX_ADDRESS_BITS
            )));
        }

        Ok(Self {
            granule,
            fields: config.fields.clone(),
            total_bits,
        })
    }

    pub fn granule(&self) -> u64 {
        self.granule
    }

    pub fn fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    pub fn total_bits(&self) -> u32 {
        self.total_bits
    }

    /// Size of the addressable space in bytes.
    pub fn capacity(&self) -> u64 {
        1u64 << self.total_bits
    }

    /// Width of a field, if the mapping declares it.
    pub fn width(&self, field: Field) -> Option<u32> {
        self.fields.iter().find(|f| f.field == field).map(|f| f.bits)
    }

    /// Number of nodes per parent at each level (1 for undeclared levels).
    pub fn fanout(&self) -> [usize; Level::COUNT] {
        let mut fanout = [1usize; Level::COUNT];
        for f in &self.fields {
            if let Some(level) = f.field.level() {
                fanout[level.index()] = 1usize << f.bits;
            }
        }
        fanout
    }

    /// Number of channels the mapping addresses.
    pub fn channels(&self) -> usize {
        self.fanout()[Level::Channel.index()]
    }

    /// Splits `addr` into field values.
    ///
    /// Returns `None` if bits remain above the declared width.
    pub fn decompose(&self, addr: u64) -> Option<Vec<u64>> {
        let (values, rest) = self.split(addr);
        (rest == 0).then_some(values)
    }

    /// Splits `addr` into field values, ignoring bits above the declared width.
    pub fn decompose_truncated(&self, addr: u64) -> Vec<u64> {
        self.split(addr).0
    }

    fn split(&self, addr: u64) -> (Vec<u64>, u64) {
        let mut rest = addr;
        let values = self
            .fields
            .iter()
            .map(|f| {
                let radix = 1u64 << f.bits;
                let value = rest % radix;
                rest /= radix;
                value
            })
            .collect();
        (values, rest)
    }

    /// Rebuilds an address from field values, highest-order field first.
    pub fn compose(&self, values: &[u64]) -> u64 {
        self.fields
            .iter()
            .zip(values)
            .rev()
            .fold(0u64, |addr, (f, &v)| (addr << f.bits) | v)
    }

    /// Advances `values` by one granule with ripple carry.
    ///
    /// The byte offset is left alone; the lowest non-offset field steps by
    /// one and each field that reaches its limit wraps and carries into the
    /// next. Returns `false` if the carry runs off the highest-order field,
    /// in which case `values` must be discarded.
    pub fn increment(&self, values: &mut [u64]) -> bool {
        for (f, v) in self.fields.iter().zip(values.iter_mut()).skip(1) {
            *v += 1;
            if *v < 1u64 << f.bits {
                return true;
            }
            *v = 0;
        }
        false
    }

    /// Maps field values onto hierarchy coordinates.
    pub fn addr_vec(&self, values: &[u64]) -> AddrVec {
        let mut vec = [0usize; Level::COUNT];
        for (f, &v) in self.fields.iter().zip(values) {
            if let Some(level) = f.field.level() {
                vec[level.index()] = v as usize;
            }
        }
        vec
    }

    /// Number of atomic requests a transaction splits into.
    pub fn request_count(&self, addr: u64, len: u64) -> u64 {
        let span = u128::from(len) + u128::from(addr % self.granule);
        // Fits in u64: with a granule of 1 the offset is always 0.
        span.div_ceil(u128::from(self.granule)) as u64
    }

    /// Granules from the one holding `addr` to the end of the address space.
    fn granules_left(&self, addr: u64) -> u64 {
        let aligned = addr - addr % self.granule;
        (self.capacity() - aligned) / self.granule
    }

    /// Splits a transaction into atomic requests, in sequence order.
    ///
    /// Fails with `AddressSpaceExhausted` if the base address does not fit
    /// the mapping or the range runs past the end of the address space, in
    /// which case a later request would carry past the highest field.
    /// Nothing is returned in either case.
    pub fn translate(&self, txn: &Transaction) -> SimResult<Vec<AtomicRequest>> {
        let exhausted = || SimError::AddressSpaceExhausted {
            txn_id: txn.id,
            addr: txn.addr,
        };

        let mut values = self.decompose(txn.addr).ok_or_else(exhausted)?;
        let count = self.request_count(txn.addr, txn.len);
        if count > self.granules_left(txn.addr) {
            return Err(exhausted());
        }
        let mut requests = Vec::new();

        for seq_id in 0..count {
            if seq_id > 0 && !self.increment(&mut values) {
                return Err(exhausted());
            }
            requests.push(AtomicRequest {
                addr: self.compose(&values),
                kind: txn.kind,
                start: txn.start,
                txn_id: txn.id,
                seq_id,
                fields: values.clone(),
            });
        }

        Ok(requests)
    }
}
