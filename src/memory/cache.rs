//! A timed cache fronting a lower memory level.
//!
//! Set-associative, with configurable write scheme and replacement policy.
//! Reads and writes are explicit state machines stepped once per cycle,
//! reproducing the miss handling of the hardware: warm-up latency, victim
//! write-back for dirty lines under write-back, line refill from the lower
//! level, then sub-block extraction.
//!
//! Address fields, given a byte address:
//! `| tag | index (log2 B/S) | block (log2 W) | byte (2) |`

use crate::common::bits::{is_aligned, nbytes};
use crate::common::{Block, SimError};

use super::{MemoryState, ReplacementPolicy, TimedMemory, WriteScheme};

/// One cache line and its bookkeeping.
///
/// `tag` and the block contents are meaningful only while `valid` is set;
/// `dirty` implies `valid`; `last_accessed` is maintained only under
/// precise-LRU replacement.
pub struct CacheEntry {
    pub valid: bool,
    pub dirty: bool,
    pub tag: u32,
    pub block: Block,
    pub last_accessed: u64,
}

impl CacheEntry {
    fn new(block_size: usize) -> Self {
        Self {
            valid: false,
            dirty: false,
            tag: 0,
            block: Block::new(block_size),
            last_accessed: 0,
        }
    }
}

enum ReadPhase {
    Warmup { left: usize },
    Evict { victim: usize },
    Refill { victim: usize },
    Install { victim: usize, line: Block },
}

struct ReadOp {
    addr: u32,
    nwords: usize,
    phase: ReadPhase,
}

impl ReadOp {
    fn new(addr: u32, nwords: usize, latency: usize) -> Self {
        Self {
            addr,
            nwords,
            phase: ReadPhase::Warmup { left: latency - 1 },
        }
    }
}

enum WritePhase {
    Warmup { left: usize },
    Fill(Box<ReadOp>),
    Update,
    Through,
}

struct WriteOp {
    addr: u32,
    data: Block,
    phase: WritePhase,
}

enum Inflight {
    Idle,
    Read(ReadOp),
    Write(WriteOp),
}

/// A timed memory that caches a lower [`TimedMemory`].
pub struct TimedCache {
    /// Words per block (line), a power of two.
    pub block_size: usize,
    /// Blocks per set (the associativity), a power of two.
    pub set_size: usize,
    /// Total blocks in the cache, a power-of-two multiple of `set_size`.
    pub cache_size: usize,
    pub scheme: WriteScheme,
    pub policy: ReplacementPolicy,
    /// Cycles per operation on a hit, at least 1.
    pub latency: usize,
    pub entries: Vec<CacheEntry>,
    pub lower: Box<dyn TimedMemory>,

    /// Per-set pseudo-LRU tree bits, S-1 per set. Approximate LRU only.
    lru_bits: Vec<Vec<bool>>,
    /// Monotonic access stamp. Precise LRU only.
    access_count: u64,
    /// xorshift state for the random policy.
    lfsr: u64,
    inflight: Inflight,
}

impl TimedCache {
    pub fn new(
        block_size: usize,
        set_size: usize,
        cache_size: usize,
        scheme: WriteScheme,
        policy: ReplacementPolicy,
        lower: Box<dyn TimedMemory>,
        latency: usize,
    ) -> Result<Self, SimError> {
        if !block_size.is_power_of_two() {
            return Err(SimError::Config(format!(
                "block size {block_size} is not a power of two"
            )));
        }
        if !set_size.is_power_of_two() {
            return Err(SimError::Config(format!(
                "set size {set_size} is not a power of two"
            )));
        }
        if !cache_size.is_power_of_two() {
            return Err(SimError::Config(format!(
                "cache size {cache_size} is not a power of two"
            )));
        }
        if cache_size % set_size != 0 {
            return Err(SimError::Config(format!(
                "cache size {cache_size} is not a multiple of set size {set_size}"
            )));
        }
        if latency == 0 {
            return Err(SimError::Config(
                "cache latency must be at least 1 cycle".into(),
            ));
        }
        let set_count = cache_size / set_size;
        Ok(Self {
            block_size,
            set_size,
            cache_size,
            scheme,
            policy,
            latency,
            entries: (0..cache_size).map(|_| CacheEntry::new(block_size)).collect(),
            lower,
            lru_bits: vec![vec![false; set_size - 1]; set_count],
            access_count: 0,
            lfsr: 123_456_789,
            inflight: Inflight::Idle,
        })
    }

    fn block_bit_count(&self) -> u32 {
        self.block_size.trailing_zeros()
    }

    fn set_bit_count(&self) -> u32 {
        self.set_size.trailing_zeros()
    }

    fn index_bit_count(&self) -> u32 {
        self.cache_size.trailing_zeros() - self.set_bit_count()
    }

    fn tag_bits(&self, addr: u32) -> u32 {
        addr >> (self.index_bit_count() + self.block_bit_count() + 2)
    }

    fn index_bits(&self, addr: u32) -> u32 {
        (addr >> (self.block_bit_count() + 2)) & ((1 << self.index_bit_count()) - 1)
    }

    /// Index of the valid entry holding `addr`, if present.
    pub fn find_entry(&self, addr: u32) -> Option<usize> {
        let tag = self.tag_bits(addr);
        let set_start = self.index_bits(addr) as usize * self.set_size;
        (set_start..set_start + self.set_size)
            .find(|&idx| self.entries[idx].valid && self.entries[idx].tag == tag)
    }

    /// Picks the slot a missing line lands in: any invalid slot in the set,
    /// otherwise the replacement policy's victim.
    fn choose_victim(&mut self, addr: u32) -> usize {
        let set_idx = self.index_bits(addr) as usize;
        let set_start = set_idx * self.set_size;
        if let Some(free) =
            (set_start..set_start + self.set_size).find(|&idx| !self.entries[idx].valid)
        {
            return free;
        }
        match self.policy {
            ReplacementPolicy::PreciseLru => (set_start..set_start + self.set_size)
                .min_by_key(|&idx| self.entries[idx].last_accessed)
                .unwrap_or(set_start),
            ReplacementPolicy::ApproximateLru => {
                let mut entry = 0usize;
                let mut lru_bit = 0usize;
                for _ in 0..self.set_bit_count() {
                    let choice = !self.lru_bits[set_idx][lru_bit];
                    entry = (entry << 1) | choice as usize;
                    lru_bit = 2 * lru_bit + 1 + choice as usize;
                }
                set_start + entry
            }
            ReplacementPolicy::Random => {
                let mut x = self.lfsr;
                x ^= x << 13;
                x ^= x >> 7;
                x ^= x << 17;
                self.lfsr = x;
                set_start + (x as usize % self.set_size)
            }
        }
    }

    /// Records an access so the accessed entry becomes most-recently-used.
    fn update_lru(&mut self, entry_idx: usize, addr: u32) {
        match self.policy {
            ReplacementPolicy::PreciseLru => {
                self.entries[entry_idx].last_accessed = self.access_count;
                self.access_count += 1;
            }
            ReplacementPolicy::ApproximateLru => {
                let set_idx = self.index_bits(addr) as usize;
                let local = entry_idx % self.set_size;
                let mut lru_bit = 0usize;
                for bit in (0..self.set_bit_count()).rev() {
                    let b = (local >> bit) & 1;
                    self.lru_bits[set_idx][lru_bit] = b == 1;
                    lru_bit = 2 * lru_bit + 1 + b;
                }
            }
            ReplacementPolicy::Random => {}
        }
    }

    /// Byte address of the line held by `entry_idx`.
    fn entry_base_addr(&self, entry_idx: usize) -> u32 {
        let index_offset = self.block_bit_count() + 2;
        let tag_offset = index_offset + self.index_bit_count();
        let set_idx = (entry_idx / self.set_size) as u32;
        (self.entries[entry_idx].tag << tag_offset) | (set_idx << index_offset)
    }

    fn line_base_addr(&self, addr: u32) -> u32 {
        let line_bytes = nbytes(self.block_size) as u32;
        (addr / line_bytes) * line_bytes
    }

    /// Extracts the requested sub-block out of a hit entry and stamps the
    /// LRU metadata.
    fn extract(&mut self, entry_idx: usize, addr: u32, nwords: usize) -> Block {
        let offset_words = (addr as usize % nbytes(self.block_size)) >> 2;
        let sub = self.entries[entry_idx].block.subblock(offset_words, nwords);
        self.update_lru(entry_idx, addr);
        sub
    }

    /// Advances a read by one cycle. Phase transitions that the hardware
    /// performs within a single cycle fall through without yielding.
    fn step_read(&mut self, op: &mut ReadOp) -> Result<Option<Block>, SimError> {
        loop {
            match &mut op.phase {
                ReadPhase::Warmup { left } => {
                    if *left > 0 {
                        *left -= 1;
                        return Ok(None);
                    }
                    if let Some(entry_idx) = self.find_entry(op.addr) {
                        return Ok(Some(self.extract(entry_idx, op.addr, op.nwords)));
                    }
                    let victim = self.choose_victim(op.addr);
                    if self.scheme == WriteScheme::WriteBack && self.entries[victim].dirty {
                        op.phase = ReadPhase::Evict { victim };
                    } else {
                        op.phase = ReadPhase::Refill { victim };
                    }
                }
                ReadPhase::Evict { victim } => {
                    let victim = *victim;
                    let evicted_addr = self.entry_base_addr(victim);
                    let block = self.entries[victim].block.clone();
                    if !self.lower.write_block(evicted_addr, &block)? {
                        return Ok(None);
                    }
                    op.phase = ReadPhase::Refill { victim };
                }
                ReadPhase::Refill { victim } => {
                    let victim = *victim;
                    let line_addr = self.line_base_addr(op.addr);
                    match self.lower.read_block(line_addr, self.block_size)? {
                        None => return Ok(None),
                        Some(line) => {
                            // The refill data is latched this cycle and
                            // served on the next.
                            op.phase = ReadPhase::Install { victim, line };
                            return Ok(None);
                        }
                    }
                }
                ReadPhase::Install { victim, line } => {
                    let victim = *victim;
                    let line = line.clone();
                    let tag = self.tag_bits(op.addr);
                    let entry = &mut self.entries[victim];
                    entry.valid = true;
                    entry.dirty = false;
                    entry.tag = tag;
                    entry.block = line;
                    return Ok(Some(self.extract(victim, op.addr, op.nwords)));
                }
            }
        }
    }

    /// Advances a write by one cycle.
    fn step_write(&mut self, op: &mut WriteOp) -> Result<bool, SimError> {
        loop {
            match &mut op.phase {
                WritePhase::Warmup { left } => {
                    if *left > 0 {
                        *left -= 1;
                        return Ok(false);
                    }
                    if self.scheme == WriteScheme::WriteBack && self.find_entry(op.addr).is_none()
                    {
                        // Write-allocate: pull the whole line in first,
                        // evicting whatever stands in the way.
                        let line_addr = self.line_base_addr(op.addr);
                        op.phase = WritePhase::Fill(Box::new(ReadOp::new(
                            line_addr,
                            self.block_size,
                            self.latency,
                        )));
                    } else {
                        op.phase = WritePhase::Update;
                    }
                }
                WritePhase::Fill(_) => {
                    let WritePhase::Fill(mut read_op) =
                        std::mem::replace(&mut op.phase, WritePhase::Update)
                    else {
                        unreachable!()
                    };
                    if self.step_read(&mut read_op)?.is_none() {
                        op.phase = WritePhase::Fill(read_op);
                        return Ok(false);
                    }
                }
                WritePhase::Update => {
                    if let Some(entry_idx) = self.find_entry(op.addr) {
                        let offset_words = (op.addr as usize % nbytes(self.block_size)) >> 2;
                        self.entries[entry_idx]
                            .block
                            .set_subblock(offset_words, &op.data);
                        self.entries[entry_idx].dirty = true;
                        self.update_lru(entry_idx, op.addr);
                    }
                    if self.scheme == WriteScheme::WriteThrough {
                        op.phase = WritePhase::Through;
                    } else {
                        return Ok(true);
                    }
                }
                WritePhase::Through => {
                    if !self.lower.write_block(op.addr, &op.data)? {
                        return Ok(false);
                    }
                    return Ok(true);
                }
            }
        }
    }

    fn check_span(&self, addr: u32, nwords: usize) -> Result<(), SimError> {
        if self.block_size % nwords != 0 {
            return Err(SimError::SubblockMismatch {
                nwords,
                line: self.block_size,
            });
        }
        if !is_aligned(addr, nwords) {
            return Err(SimError::Misaligned { addr, nwords });
        }
        Ok(())
    }
}

impl TimedMemory for TimedCache {
    fn read_block(&mut self, addr: u32, nwords: usize) -> Result<Option<Block>, SimError> {
        debug_assert!(
            !matches!(self.inflight, Inflight::Write(_)),
            "read started while a write is in flight"
        );
        if matches!(self.inflight, Inflight::Idle) {
            self.check_span(addr, nwords)?;
            self.inflight = Inflight::Read(ReadOp::new(addr, nwords, self.latency));
        }
        match std::mem::replace(&mut self.inflight, Inflight::Idle) {
            Inflight::Read(mut op) => {
                debug_assert!(
                    op.addr == addr && op.nwords == nwords,
                    "in-flight read re-entered with different parameters"
                );
                let result = self.step_read(&mut op)?;
                if result.is_none() {
                    self.inflight = Inflight::Read(op);
                }
                Ok(result)
            }
            other => {
                self.inflight = other;
                Ok(None)
            }
        }
    }

    fn write_block(&mut self, addr: u32, block: &Block) -> Result<bool, SimError> {
        debug_assert!(
            !matches!(self.inflight, Inflight::Read(_)),
            "write started while a read is in flight"
        );
        if matches!(self.inflight, Inflight::Idle) {
            self.check_span(addr, block.len())?;
            self.inflight = Inflight::Write(WriteOp {
                addr,
                data: block.clone(),
                phase: WritePhase::Warmup {
                    left: self.latency - 1,
                },
            });
        }
        match std::mem::replace(&mut self.inflight, Inflight::Idle) {
            Inflight::Write(mut op) => {
                debug_assert!(
                    op.addr == addr && op.data.len() == block.len(),
                    "in-flight write re-entered with different parameters"
                );
                let result = self.step_write(&mut op)?;
                if !result {
                    self.inflight = Inflight::Write(op);
                }
                Ok(result)
            }
            other => {
                self.inflight = other;
                Ok(false)
            }
        }
    }

    fn state(&self) -> MemoryState {
        match self.inflight {
            Inflight::Idle => MemoryState::Ready,
            Inflight::Read(_) => MemoryState::Reading,
            Inflight::Write(_) => MemoryState::Writing,
        }
    }
}
