//! Instruction field extraction and immediate generation.

use crate::common::bits::{extract_bits, sign_extend};
use crate::common::Word;
use crate::isa::{opcodes, NOP};

use super::super::signal::{InPin, OutPin, SignalBank};
use super::super::UnitId;

/// Extracts the register-number and funct fields of the instruction word.
/// Runs on every instruction, meaningful or not.
pub struct DecodeUnit {
    pub instruction: InPin,
    pub read_register_1: OutPin,
    pub read_register_2: OutPin,
    pub write_register: OutPin,
    pub funct3: OutPin,
    pub funct7: OutPin,
}

impl DecodeUnit {
    pub fn new(bank: &mut SignalBank) -> Self {
        Self {
            instruction: bank.input(UnitId::Decode),
            read_register_1: bank.output(),
            read_register_2: bank.output(),
            write_register: bank.output(),
            funct3: bank.output(),
            funct7: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let inst = bank.get(self.instruction).to_u32();
        bank.drive(
            self.read_register_1,
            Word::from_u32(extract_bits(inst, 15, 19)),
        );
        bank.drive(
            self.read_register_2,
            Word::from_u32(extract_bits(inst, 20, 24)),
        );
        bank.drive(
            self.write_register,
            Word::from_u32(extract_bits(inst, 7, 11)),
        );
        bank.drive(self.funct3, Word::from_u32(extract_bits(inst, 12, 14)));
        bank.drive(self.funct7, Word::from_u32(extract_bits(inst, 25, 31)));
    }
}

/// Produces the sign-extended 32-bit immediate for the instruction's
/// format.
///
/// SB immediates share the S layout and UJ immediates sit verbatim in
/// bits 12..=31; both are byte offsets. A NOP leaves the output
/// untouched.
pub struct ImmediateGenerator {
    pub instruction: InPin,
    pub immediate: OutPin,
}

impl ImmediateGenerator {
    pub fn new(bank: &mut SignalBank) -> Self {
        Self {
            instruction: bank.input(UnitId::ImmediateGenerator),
            immediate: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let inst = bank.get(self.instruction).to_u32();
        if inst == NOP {
            return;
        }
        let imm = match extract_bits(inst, 0, 6) {
            opcodes::OP_IMM | opcodes::LOAD | opcodes::JALR => {
                sign_extend(extract_bits(inst, 20, 31), 12)
            }
            opcodes::STORE | opcodes::BRANCH => {
                let upper = extract_bits(inst, 25, 31);
                let lower = extract_bits(inst, 7, 11);
                sign_extend((upper << 5) | lower, 12)
            }
            opcodes::LUI => extract_bits(inst, 12, 31) << 12,
            opcodes::JAL => sign_extend(extract_bits(inst, 12, 31), 20),
            _ => return,
        };
        bank.drive(self.immediate, Word::from_u32(imm));
    }
}
