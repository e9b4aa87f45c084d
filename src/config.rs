//! Simulator configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an
//! empty file (or none at all) yields a working machine. Structural
//! invariants (powers of two, divisibility, minimum latencies) are
//! checked when the processor and memories are constructed.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::SimError;
use crate::memory::{ReplacementPolicy, WriteScheme};

const DEFAULT_ADDRESS_BITS: usize = 12;
const DEFAULT_MEM_LATENCY: usize = 1;
const DEFAULT_WORDS_PER_BLOCK: usize = 4;
const DEFAULT_WAYS: usize = 1;
const DEFAULT_BLOCKS: usize = 8;
const DEFAULT_CACHE_LATENCY: usize = 1;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub memory: MemoryConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Address-space size in bits; capacity is 2^address_bits bytes.
    pub address_bits: usize,
    /// Cycles per main-memory operation.
    pub latency: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            address_bits: DEFAULT_ADDRESS_BITS,
            latency: DEFAULT_MEM_LATENCY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the data memory sits behind a cache at all.
    pub enabled: bool,
    /// Words per cache line (power of two).
    pub words_per_block: usize,
    /// Blocks per set, the associativity (power of two).
    pub ways: usize,
    /// Total blocks in the cache (power-of-two multiple of `ways`).
    pub blocks: usize,
    pub scheme: WriteScheme,
    pub policy: ReplacementPolicy,
    /// Cycles per cache operation on a hit.
    pub latency: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            words_per_block: DEFAULT_WORDS_PER_BLOCK,
            ways: DEFAULT_WAYS,
            blocks: DEFAULT_BLOCKS,
            scheme: WriteScheme::WriteThrough,
            policy: ReplacementPolicy::PreciseLru,
            latency: DEFAULT_CACHE_LATENCY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Operand forwarding; when off, every RAW dependence stalls.
    pub forwarding: bool,
    /// Per-cycle pipeline occupancy trace on stderr.
    pub trace: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            forwarding: true,
            trace: false,
        }
    }
}

impl SimConfig {
    /// Loads a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let content = fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| SimError::Config(format!("cannot parse {}: {e}", path.display())))
    }
}
