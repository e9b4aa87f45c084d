//! The arithmetic units of the execute and decode stages.
//!
//! [`AluUnit`] performs the integer operation selected by [`AluControl`];
//! [`BranchAlu`] decides conditional branches in the decode stage. All
//! arithmetic is signed 32-bit; both shifts preserve the sign (the right
//! shift is arithmetic, kept for bit-level compatibility with the
//! hardware this models).

use crate::common::bits::extract_bits;
use crate::common::Word;
use crate::isa::{funct3, funct7};

use super::super::signal::{InPin, OutPin, SignalBank};
use super::super::UnitId;

/// Operation selector driven by [`AluControl`] into [`AluUnit`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AluOp {
    #[default]
    Add,
    Sub,
    And,
    Or,
    Sll,
    Srl,
}

impl AluOp {
    pub fn encode(self) -> u32 {
        self as u32
    }

    pub fn decode(value: u32) -> AluOp {
        match value {
            1 => AluOp::Sub,
            2 => AluOp::And,
            3 => AluOp::Or,
            4 => AluOp::Sll,
            5 => AluOp::Srl,
            _ => AluOp::Add,
        }
    }
}

/// The main ALU. Emits the operation result and a `zero` flag.
pub struct AluUnit {
    pub input0: InPin,
    pub input1: InPin,
    pub alu_op: InPin,
    pub output: OutPin,
    pub zero: OutPin,
}

impl AluUnit {
    pub fn new(bank: &mut SignalBank) -> Self {
        Self {
            input0: bank.input(UnitId::Alu),
            input1: bank.input(UnitId::Alu),
            alu_op: bank.input(UnitId::Alu),
            output: bank.output(),
            zero: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let a = bank.get(self.input0).to_i32();
        let b = bank.get(self.input1).to_i32();
        let result = match AluOp::decode(bank.get(self.alu_op).to_u32()) {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::And => a & b,
            AluOp::Or => a | b,
            AluOp::Sll => a.wrapping_shl(b as u32 & 0x1f),
            AluOp::Srl => a.wrapping_shr(b as u32 & 0x1f),
        };
        bank.drive(self.output, Word::from_i32(result));
        bank.drive(self.zero, Word::from_u32((result == 0) as u32));
    }
}

/// Translates the two-bit `ctrlAluOp` plus the instruction's funct fields
/// into a concrete [`AluOp`].
///
/// `00` (loads/stores) always adds, `01` (conditional branch) always
/// subtracts, `10` (R/I compute) dispatches on funct3/funct7.
pub struct AluControl {
    pub instruction: InPin,
    pub ctrl_alu_op: InPin,
    pub alu_op: OutPin,
}

impl AluControl {
    pub fn new(bank: &mut SignalBank) -> Self {
        Self {
            instruction: bank.input(UnitId::AluControl),
            ctrl_alu_op: bank.input(UnitId::AluControl),
            alu_op: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let inst = bank.get(self.instruction).to_u32();
        let f3 = extract_bits(inst, 12, 14);
        let f7 = extract_bits(inst, 25, 31);
        let op = match bank.get(self.ctrl_alu_op).to_u32() {
            0b00 => AluOp::Add,
            0b01 => AluOp::Sub,
            _ => match f3 {
                funct3::ADD_SUB if f7 == funct7::SUB => AluOp::Sub,
                funct3::ADD_SUB => AluOp::Add,
                funct3::SLL => AluOp::Sll,
                funct3::SRL => AluOp::Srl,
                funct3::OR => AluOp::Or,
                funct3::AND => AluOp::And,
                _ => AluOp::Add,
            },
        };
        bank.drive(self.alu_op, Word::from_u32(op.encode()));
    }
}

/// Decides conditional branches in the decode stage.
///
/// Emits 1 iff the branch should be taken: beq, bne, blt, bge on signed
/// operands. The unsigned comparisons (`bltu`, `bgeu`) are not supported.
pub struct BranchAlu {
    pub funct3: InPin,
    pub input0: InPin,
    pub input1: InPin,
    pub taken: OutPin,
}

impl BranchAlu {
    pub fn new(bank: &mut SignalBank) -> Self {
        Self {
            funct3: bank.input(UnitId::BranchAlu),
            input0: bank.input(UnitId::BranchAlu),
            input1: bank.input(UnitId::BranchAlu),
            taken: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let a = bank.get(self.input0).to_i32();
        let b = bank.get(self.input1).to_i32();
        let taken = match bank.get(self.funct3).to_u32() {
            funct3::BEQ => a == b,
            funct3::BNE => a != b,
            funct3::BLT => a < b,
            funct3::BGE => a >= b,
            _ => false,
        };
        bank.drive(self.taken, Word::from_u32(taken as u32));
    }
}
