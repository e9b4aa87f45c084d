//! The memory-facing units of the fetch and memory stages.

use crate::common::{Block, SimError, Word};
use crate::memory::{TimedMainMemory, TimedMemory};

use super::super::signal::{InPin, OutPin, SignalBank};
use super::super::UnitId;

/// Instruction memory. Fetches combinationally whenever the PC changes,
/// which requires its backing store to complete reads in a single cycle.
pub struct InstructionMemoryUnit {
    pub address: InPin,
    pub instruction: OutPin,
    pub memory: TimedMainMemory,
}

impl InstructionMemoryUnit {
    pub fn new(bank: &mut SignalBank, memory: TimedMainMemory) -> Result<Self, SimError> {
        if memory.latency != 1 {
            return Err(SimError::Config(
                "instruction memory must have single-cycle latency".into(),
            ));
        }
        Ok(Self {
            address: bank.input(UnitId::InstructionMemory),
            instruction: bank.output(),
            memory,
        })
    }

    pub fn operate(&mut self, bank: &mut SignalBank) -> Result<(), SimError> {
        let addr = bank.get(self.address).to_u32();
        let block = self.memory.read_block(addr, 1)?;
        debug_assert!(block.is_some(), "single-cycle fetch did not complete");
        if let Some(block) = block {
            bank.drive(self.instruction, block[0]);
        }
        Ok(())
    }
}

/// Data memory. Clocked: the processor steps it once per cycle, and it
/// advances whatever read or write the memory stage is asking for by one
/// step. `is_ready` goes low while an operation is in flight, which is
/// what the memory hazard unit watches.
pub struct DataMemoryUnit {
    pub address: InPin,
    pub write_data: InPin,
    pub ctrl_mem_read: InPin,
    pub ctrl_mem_write: InPin,
    pub read_data: OutPin,
    pub is_ready: OutPin,
    pub memory: Box<dyn TimedMemory>,
}

impl DataMemoryUnit {
    pub fn new(bank: &mut SignalBank, memory: Box<dyn TimedMemory>) -> Self {
        Self {
            address: bank.input(UnitId::DataMemory),
            write_data: bank.input(UnitId::DataMemory),
            ctrl_mem_read: bank.input(UnitId::DataMemory),
            ctrl_mem_write: bank.input(UnitId::DataMemory),
            read_data: bank.output(),
            is_ready: bank.output(),
            memory,
        }
    }

    pub fn operate(&mut self, bank: &mut SignalBank) -> Result<(), SimError> {
        let reading = bank.get(self.ctrl_mem_read).to_u32() != 0;
        let writing = bank.get(self.ctrl_mem_write).to_u32() != 0;
        let addr = bank.get(self.address).to_u32();

        let ready = if reading {
            match self.memory.read_block(addr, 1)? {
                None => false,
                Some(block) => {
                    bank.drive(self.read_data, block[0]);
                    true
                }
            }
        } else if writing {
            let block = Block::from(vec![bank.get(self.write_data)]);
            self.memory.write_block(addr, &block)?
        } else {
            true
        };
        bank.drive(self.is_ready, Word::from_u32(ready as u32));
        Ok(())
    }
}
