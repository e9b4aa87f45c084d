//! The instruction issue unit: the program counter latch.

use crate::common::Word;

use super::super::signal::{InPin, OutPin, SignalBank};
use super::super::UnitId;

/// Holds the PC. Buffered like the pipeline registers and freezable: while
/// frozen the PC does not advance, so the fetch stage re-fetches the same
/// instruction.
pub struct InstructionIssueUnit {
    pub next_pc: InPin,
    pub should_freeze: InPin,
    pub pc: OutPin,
    buffer: Word,
    freeze: bool,
}

impl InstructionIssueUnit {
    pub fn new(bank: &mut SignalBank) -> Self {
        Self {
            next_pc: bank.input(UnitId::IssueUnit),
            should_freeze: bank.input(UnitId::IssueUnit),
            pc: bank.output(),
            buffer: Word::ZERO,
            freeze: false,
        }
    }

    pub fn buffer_inputs(&mut self, bank: &SignalBank) {
        self.buffer = bank.get(self.next_pc);
        self.freeze = bank.get(self.should_freeze).to_u32() != 0;
    }

    pub fn operate(&mut self, bank: &mut SignalBank) {
        if self.freeze {
            return;
        }
        bank.drive(self.pc, self.buffer);
    }
}
