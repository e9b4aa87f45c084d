//! The main control unit of the decode stage.
//!
//! Emits the control bits that steer the rest of the pipeline. On `jal`
//! and `jalr` with a non-zero rd it writes the link address (pc + 4)
//! straight into the integer register file instead of carrying a link
//! value down the pipeline.

use crate::common::bits::extract_bits;
use crate::common::{RegisterFile, Word};
use crate::isa::{opcodes, NOP};

use super::super::signal::{InPin, OutPin, SignalBank};
use super::super::UnitId;

/// Control bit outputs, driven for every recognised opcode.
///
/// Unknown opcodes produce no signal writes at all, so an undefined
/// instruction behaves like a NOP with whatever control bits were last
/// driven.
pub struct ControlUnit {
    pub instruction: InPin,
    pub pc: InPin,

    pub reg_write: OutPin,
    /// 0 selects rs2, 1 selects the immediate.
    pub alu_src: OutPin,
    /// Two bits: 00 loads/stores, 01 conditional branch, 10 R/I compute.
    pub alu_op: OutPin,
    pub mem_write: OutPin,
    pub mem_read: OutPin,
    pub mem_to_reg: OutPin,
    pub branch: OutPin,
    /// 1 for `jalr`: the jump target is rs1-relative.
    pub use_reg_base: OutPin,
    pub is_jump: OutPin,
}

struct ControlBits {
    reg_write: u32,
    alu_src: u32,
    alu_op: u32,
    mem_write: u32,
    mem_read: u32,
    mem_to_reg: u32,
    branch: u32,
    use_reg_base: u32,
    is_jump: u32,
}

const NOP_BITS: ControlBits = ControlBits {
    reg_write: 0,
    alu_src: 0,
    alu_op: 0,
    mem_write: 0,
    mem_read: 0,
    mem_to_reg: 0,
    branch: 0,
    use_reg_base: 0,
    is_jump: 0,
};

impl ControlUnit {
    pub fn new(bank: &mut SignalBank) -> Self {
        Self {
            instruction: bank.input(UnitId::Control),
            pc: bank.input(UnitId::Control),
            reg_write: bank.output(),
            alu_src: bank.output(),
            alu_op: bank.output(),
            mem_write: bank.output(),
            mem_read: bank.output(),
            mem_to_reg: bank.output(),
            branch: bank.output(),
            use_reg_base: bank.output(),
            is_jump: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank, int_regs: &mut RegisterFile) {
        let inst = bank.get(self.instruction).to_u32();
        if inst == NOP {
            self.drive(bank, NOP_BITS);
            return;
        }
        let bits = match extract_bits(inst, 0, 6) {
            opcodes::OP => ControlBits {
                reg_write: 1,
                alu_op: 0b10,
                ..NOP_BITS
            },
            opcodes::OP_IMM => ControlBits {
                reg_write: 1,
                alu_src: 1,
                alu_op: 0b10,
                ..NOP_BITS
            },
            opcodes::LOAD => ControlBits {
                reg_write: 1,
                alu_src: 1,
                mem_read: 1,
                mem_to_reg: 1,
                ..NOP_BITS
            },
            opcodes::STORE => ControlBits {
                alu_src: 1,
                mem_write: 1,
                ..NOP_BITS
            },
            opcodes::BRANCH => ControlBits {
                alu_op: 0b01,
                branch: 1,
                ..NOP_BITS
            },
            opcodes::JAL => {
                self.write_link(bank, int_regs, inst);
                ControlBits {
                    is_jump: 1,
                    ..NOP_BITS
                }
            }
            opcodes::JALR => {
                self.write_link(bank, int_regs, inst);
                ControlBits {
                    is_jump: 1,
                    use_reg_base: 1,
                    ..NOP_BITS
                }
            }
            // LUI and anything unrecognised: no control signal writes.
            _ => return,
        };
        self.drive(bank, bits);
    }

    /// The eager link write: pc + 4 lands in rd the cycle the jump is
    /// decoded.
    fn write_link(&self, bank: &SignalBank, int_regs: &mut RegisterFile, inst: u32) {
        let rd = extract_bits(inst, 7, 11) as usize;
        if rd != 0 {
            let pc = bank.get(self.pc).to_u32();
            int_regs.write(rd, Word::from_u32(pc.wrapping_add(4)));
        }
    }

    fn drive(&self, bank: &mut SignalBank, bits: ControlBits) {
        bank.drive(self.reg_write, Word::from_u32(bits.reg_write));
        bank.drive(self.alu_src, Word::from_u32(bits.alu_src));
        bank.drive(self.alu_op, Word::from_u32(bits.alu_op));
        bank.drive(self.mem_write, Word::from_u32(bits.mem_write));
        bank.drive(self.mem_read, Word::from_u32(bits.mem_read));
        bank.drive(self.mem_to_reg, Word::from_u32(bits.mem_to_reg));
        bank.drive(self.branch, Word::from_u32(bits.branch));
        bank.drive(self.use_reg_base, Word::from_u32(bits.use_reg_base));
        bank.drive(self.is_jump, Word::from_u32(bits.is_jump));
    }
}
