//! Main memory: the leaf of the hierarchy.
//!
//! A flat 2^N-byte store whose reads and writes each take a fixed number of
//! cycles. A read yields `None` for L-1 calls and the requested sub-block
//! on the L-th; a write yields `false` for L-1 calls, then stores the block
//! and yields `true`.

use crate::common::bits::{is_aligned, nbytes};
use crate::common::{Block, SimError};

use super::{MemoryState, TimedMemory};

struct ReadOp {
    addr: u32,
    nwords: usize,
    waited: usize,
}

struct WriteOp {
    addr: u32,
    data: Block,
    waited: usize,
}

enum Inflight {
    Idle,
    Read(ReadOp),
    Write(WriteOp),
}

/// Word-addressable storage with a fixed per-operation latency.
pub struct TimedMainMemory {
    /// Size of the address space in bits; capacity is 2^address_bits bytes.
    pub address_bits: usize,
    /// Cycles per operation, at least 1.
    pub latency: usize,
    pub storage: Block,
    inflight: Inflight,
}

impl TimedMainMemory {
    pub fn new(address_bits: usize, latency: usize) -> Result<Self, SimError> {
        if latency == 0 {
            return Err(SimError::Config(
                "main memory latency must be at least 1 cycle".into(),
            ));
        }
        if !(2..=30).contains(&address_bits) {
            return Err(SimError::Config(format!(
                "address space of {address_bits} bits is not supported"
            )));
        }
        Ok(Self {
            address_bits,
            latency,
            storage: Block::new(1 << (address_bits - 2)),
            inflight: Inflight::Idle,
        })
    }

    fn check_range(&self, addr: u32, nwords: usize) -> Result<(), SimError> {
        if !is_aligned(addr, nwords) {
            return Err(SimError::Misaligned { addr, nwords });
        }
        if addr as usize + nbytes(nwords) > (1 << self.address_bits) {
            return Err(SimError::OutOfBounds {
                addr,
                space: 1 << self.address_bits,
            });
        }
        Ok(())
    }
}

impl TimedMemory for TimedMainMemory {
    fn read_block(&mut self, addr: u32, nwords: usize) -> Result<Option<Block>, SimError> {
        debug_assert!(
            !matches!(self.inflight, Inflight::Write(_)),
            "read started while a write is in flight"
        );
        if matches!(self.inflight, Inflight::Idle) {
            self.check_range(addr, nwords)?;
            self.inflight = Inflight::Read(ReadOp {
                addr,
                nwords,
                waited: 0,
            });
        }
        if let Inflight::Read(op) = &mut self.inflight {
            debug_assert!(
                op.addr == addr && op.nwords == nwords,
                "in-flight read re-entered with different parameters"
            );
            if op.waited + 1 < self.latency {
                op.waited += 1;
                return Ok(None);
            }
            let block = self.storage.subblock((addr >> 2) as usize, nwords);
            self.inflight = Inflight::Idle;
            return Ok(Some(block));
        }
        Ok(None)
    }

    fn write_block(&mut self, addr: u32, block: &Block) -> Result<bool, SimError> {
        debug_assert!(
            !matches!(self.inflight, Inflight::Read(_)),
            "write started while a read is in flight"
        );
        if matches!(self.inflight, Inflight::Idle) {
            self.check_range(addr, block.len())?;
            self.inflight = Inflight::Write(WriteOp {
                addr,
                data: block.clone(),
                waited: 0,
            });
        }
        if let Inflight::Write(op) = &mut self.inflight {
            debug_assert!(
                op.addr == addr && op.data.len() == block.len(),
                "in-flight write re-entered with different parameters"
            );
            if op.waited + 1 < self.latency {
                op.waited += 1;
                return Ok(false);
            }
            let data = op.data.clone();
            self.storage.set_subblock((addr >> 2) as usize, &data);
            self.inflight = Inflight::Idle;
            return Ok(true);
        }
        Ok(false)
    }

    fn state(&self) -> MemoryState {
        match self.inflight {
            Inflight::Idle => MemoryState::Ready,
            Inflight::Read(_) => MemoryState::Reading,
            Inflight::Write(_) => MemoryState::Writing,
        }
    }
}
