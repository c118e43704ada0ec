use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::common::{SimError, SimResult};

const DEFAULT_STANDARD: &str = "HBM";
const DEFAULT_SPEED: &str = "HBM_1Gbps";

const QUEUE_SIZE: usize = 32;
const WRITE_HIGH_WATERMARK: f32 = 0.8;
const WRITE_LOW_WATERMARK: f32 = 0.2;

const GRANULE: u64 = 32;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
}

impl Config {
    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> SimResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML configuration from a string.
    pub fn parse(content: &str) -> SimResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub trace_commands: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryConfig {
    #[serde(default = "default_standard")]
    pub standard: String,

    #[serde(default = "default_speed")]
    pub speed: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            standard: default_standard(),
            speed: default_speed(),
        }
    }
}

fn default_standard() -> String {
    DEFAULT_STANDARD.to_string()
}

fn default_speed() -> String {
    DEFAULT_SPEED.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    #[serde(default = "default_queue_size")]
    pub read_queue_size: usize,

    #[serde(default = "default_queue_size")]
    pub write_queue_size: usize,

    #[serde(default = "default_high_watermark")]
    pub write_high_watermark: f32,

    #[serde(default = "default_low_watermark")]
    pub write_low_watermark: f32,

    #[serde(default = "default_refresh")]
    pub refresh: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            read_queue_size: QUEUE_SIZE,
            write_queue_size: QUEUE_SIZE,
            write_high_watermark: WRITE_HIGH_WATERMARK,
            write_low_watermark: WRITE_LOW_WATERMARK,
            refresh: true,
        }
    }
}

fn default_queue_size() -> usize {
    QUEUE_SIZE
}

fn default_high_watermark() -> f32 {
    WRITE_HIGH_WATERMARK
}

fn default_low_watermark() -> f32 {
    WRITE_LOW_WATERMARK
}

fn default_refresh() -> bool {
    true
}

/// Name of one address field.
///
/// `Offset` is the byte offset inside a granule; every other field selects
/// one level of the device hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Offset,
    Channel,
    Rank,
    BankGroup,
    Bank,
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldConfig {
    pub field: Field,
    pub bits: u32,
}

impl FieldConfig {
    pub fn new(field: Field, bits: u32) -> Self {
        Self { field, bits }
    }
}

/// Address layout, lowest-order field first.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    #[serde(default = "default_granule")]
    pub granule: u64,

    #[serde(default = "default_fields")]
    pub fields: Vec<FieldConfig>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            granule: GRANULE,
            fields: default_fields(),
        }
    }
}

fn default_granule() -> u64 {
    GRANULE
}

// 32-bit HBM layout: tx(5) ch(3) col(5) pc(1) bg(2) ba(2) row(14).
fn default_fields() -> Vec<FieldConfig> {
    vec![
        FieldConfig::new(Field::Offset, 5),
        FieldConfig::new(Field::Channel, 3),
        FieldConfig::new(Field::Column, 5),
        FieldConfig::new(Field::Rank, 1),
        FieldConfig::new(Field::BankGroup, 2),
        FieldConfig::new(Field::Bank, 2),
        FieldConfig::new(Field::Row, 14),
    ]
}
