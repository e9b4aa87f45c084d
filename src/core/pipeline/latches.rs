//! The four inter-stage pipeline registers.
//!
//! Each register is a buffered clocked unit: `buffer_inputs` latches every
//! input (and the freeze/flush controls) into an internal buffer during
//! the processor's buffer phase, and `operate` drives the buffered values
//! out during the clocked phase. The two-phase split means declaration
//! order cannot leak mid-cycle values from one stage into the next.
//!
//! Freezing leaves the outputs untouched for another cycle. Flushing
//! zeroes the outputs that would otherwise cause a destructive action
//! downstream, producing a NOP-equivalent.

use crate::common::Word;

use super::super::signal::{InPin, OutPin, SignalBank};
use super::super::UnitId;

/// One latched value: an input, its buffered copy and the driven output.
pub struct StageLine {
    pub input: InPin,
    pub output: OutPin,
    buffer: Word,
    /// Whether a flush forces this line's output to zero.
    flushes_to_zero: bool,
}

impl StageLine {
    fn new(bank: &mut SignalBank, owner: UnitId, flushes_to_zero: bool) -> Self {
        Self {
            input: bank.input(owner),
            output: bank.output(),
            buffer: Word::ZERO,
            flushes_to_zero,
        }
    }

    fn buffer_input(&mut self, bank: &SignalBank) {
        self.buffer = bank.get(self.input);
    }

    fn drive(&self, bank: &mut SignalBank, flushing: bool) {
        let value = if flushing && self.flushes_to_zero {
            Word::ZERO
        } else {
            self.buffer
        };
        bank.drive(self.output, value);
    }
}

/// IF/ID: carries the fetched instruction and its PC into decode.
/// Freezable and flushable; a flush turns the instruction into a NOP.
pub struct IfIdRegister {
    pub pc: StageLine,
    pub instruction: StageLine,
    pub should_freeze: InPin,
    pub should_flush: InPin,
    freeze: bool,
    flush: bool,
}

impl IfIdRegister {
    pub fn new(bank: &mut SignalBank) -> Self {
        Self {
            pc: StageLine::new(bank, UnitId::IfId, false),
            instruction: StageLine::new(bank, UnitId::IfId, true),
            should_freeze: bank.input(UnitId::IfId),
            should_flush: bank.input(UnitId::IfId),
            freeze: false,
            flush: false,
        }
    }

    pub fn buffer_inputs(&mut self, bank: &SignalBank) {
        self.pc.buffer_input(bank);
        self.instruction.buffer_input(bank);
        self.freeze = bank.get(self.should_freeze).to_u32() != 0;
        self.flush = bank.get(self.should_flush).to_u32() != 0;
    }

    pub fn operate(&mut self, bank: &mut SignalBank) {
        if self.freeze {
            return;
        }
        // Instruction before pc: the control unit's link write is a side
        // effect keyed on the instruction, so the instruction must settle
        // first.
        self.instruction.drive(bank, self.flush);
        self.pc.drive(bank, self.flush);
    }
}

/// ID/EX: everything the execute stage consumes. Freezable.
pub struct IdExRegister {
    pub pc: StageLine,
    pub instruction: StageLine,
    pub read_data_1: StageLine,
    pub read_data_2: StageLine,
    pub immediate: StageLine,
    pub rs1: StageLine,
    pub rs2: StageLine,
    pub write_register: StageLine,
    pub ctrl_reg_write: StageLine,
    pub ctrl_alu_src: StageLine,
    pub ctrl_alu_op: StageLine,
    pub ctrl_mem_write: StageLine,
    pub ctrl_mem_read: StageLine,
    pub ctrl_mem_to_reg: StageLine,
    pub should_freeze: InPin,
    freeze: bool,
}

impl IdExRegister {
    pub fn new(bank: &mut SignalBank) -> Self {
        let owner = UnitId::IdEx;
        Self {
            pc: StageLine::new(bank, owner, false),
            instruction: StageLine::new(bank, owner, false),
            read_data_1: StageLine::new(bank, owner, false),
            read_data_2: StageLine::new(bank, owner, false),
            immediate: StageLine::new(bank, owner, false),
            rs1: StageLine::new(bank, owner, false),
            rs2: StageLine::new(bank, owner, false),
            write_register: StageLine::new(bank, owner, false),
            ctrl_reg_write: StageLine::new(bank, owner, false),
            ctrl_alu_src: StageLine::new(bank, owner, false),
            ctrl_alu_op: StageLine::new(bank, owner, false),
            ctrl_mem_write: StageLine::new(bank, owner, false),
            ctrl_mem_read: StageLine::new(bank, owner, false),
            ctrl_mem_to_reg: StageLine::new(bank, owner, false),
            should_freeze: bank.input(owner),
            freeze: false,
        }
    }

    fn lines(&mut self) -> [&mut StageLine; 14] {
        [
            &mut self.pc,
            &mut self.instruction,
            &mut self.read_data_1,
            &mut self.read_data_2,
            &mut self.immediate,
            &mut self.rs1,
            &mut self.rs2,
            &mut self.write_register,
            &mut self.ctrl_reg_write,
            &mut self.ctrl_alu_src,
            &mut self.ctrl_alu_op,
            &mut self.ctrl_mem_write,
            &mut self.ctrl_mem_read,
            &mut self.ctrl_mem_to_reg,
        ]
    }

    pub fn buffer_inputs(&mut self, bank: &SignalBank) {
        for line in self.lines() {
            line.buffer_input(bank);
        }
        self.freeze = bank.get(self.should_freeze).to_u32() != 0;
    }

    pub fn operate(&mut self, bank: &mut SignalBank) {
        if self.freeze {
            return;
        }
        for line in self.lines() {
            line.drive(bank, false);
        }
    }
}

/// EX/MEM: the ALU result, the store data and the memory-stage controls.
/// Freezable.
pub struct ExMemRegister {
    pub alu_output: StageLine,
    pub write_data: StageLine,
    pub write_register: StageLine,
    pub ctrl_reg_write: StageLine,
    pub ctrl_mem_write: StageLine,
    pub ctrl_mem_read: StageLine,
    pub ctrl_mem_to_reg: StageLine,
    pub should_freeze: InPin,
    freeze: bool,
}

impl ExMemRegister {
    pub fn new(bank: &mut SignalBank) -> Self {
        let owner = UnitId::ExMem;
        Self {
            alu_output: StageLine::new(bank, owner, false),
            write_data: StageLine::new(bank, owner, false),
            write_register: StageLine::new(bank, owner, false),
            ctrl_reg_write: StageLine::new(bank, owner, false),
            ctrl_mem_write: StageLine::new(bank, owner, false),
            ctrl_mem_read: StageLine::new(bank, owner, false),
            ctrl_mem_to_reg: StageLine::new(bank, owner, false),
            should_freeze: bank.input(owner),
            freeze: false,
        }
    }

    fn lines(&mut self) -> [&mut StageLine; 7] {
        [
            &mut self.alu_output,
            &mut self.write_data,
            &mut self.write_register,
            &mut self.ctrl_reg_write,
            &mut self.ctrl_mem_write,
            &mut self.ctrl_mem_read,
            &mut self.ctrl_mem_to_reg,
        ]
    }

    pub fn buffer_inputs(&mut self, bank: &SignalBank) {
        for line in self.lines() {
            line.buffer_input(bank);
        }
        self.freeze = bank.get(self.should_freeze).to_u32() != 0;
    }

    pub fn operate(&mut self, bank: &mut SignalBank) {
        if self.freeze {
            return;
        }
        for line in self.lines() {
            line.drive(bank, false);
        }
    }
}

/// MEM/WB: the loaded word, the ALU result and the write-back controls.
///
/// Only flushable; no later stage can stall before it. The buffer stage is
/// what the forwarding unit reads, because write-back drives the register
/// file in the same cycle the memory read lands.
pub struct MemWbRegister {
    pub read_memory_data: StageLine,
    pub alu_output: StageLine,
    pub write_register: StageLine,
    pub ctrl_reg_write: StageLine,
    pub ctrl_mem_to_reg: StageLine,
    pub should_flush: InPin,
    flush: bool,
}

impl MemWbRegister {
    pub fn new(bank: &mut SignalBank) -> Self {
        let owner = UnitId::MemWb;
        Self {
            read_memory_data: StageLine::new(bank, owner, false),
            alu_output: StageLine::new(bank, owner, false),
            write_register: StageLine::new(bank, owner, false),
            ctrl_reg_write: StageLine::new(bank, owner, true),
            ctrl_mem_to_reg: StageLine::new(bank, owner, false),
            should_flush: bank.input(owner),
            flush: false,
        }
    }

    /// Drive order matters here: the register-file write is a side effect
    /// of the cascade, so the destination register must settle before any
    /// data line and RegWrite must come last.
    fn lines(&mut self) -> [&mut StageLine; 5] {
        [
            &mut self.write_register,
            &mut self.read_memory_data,
            &mut self.alu_output,
            &mut self.ctrl_mem_to_reg,
            &mut self.ctrl_reg_write,
        ]
    }

    pub fn buffer_inputs(&mut self, bank: &SignalBank) {
        for line in self.lines() {
            line.buffer_input(bank);
        }
        self.flush = bank.get(self.should_flush).to_u32() != 0;
    }

    pub fn operate(&mut self, bank: &mut SignalBank) {
        let flush = self.flush;
        for line in self.lines() {
            line.drive(bank, flush);
        }
    }
}
