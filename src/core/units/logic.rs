//! Small combinational glue: multiplexers, gates and adders.

use crate::common::Word;

use super::super::signal::{InPin, OutPin, SignalBank};
use super::super::UnitId;

/// Two-way multiplexer: selects `input0` when `control` is 0, else
/// `input1`.
pub struct Multiplexer {
    pub input0: InPin,
    pub input1: InPin,
    pub control: InPin,
    pub output: OutPin,
}

impl Multiplexer {
    pub fn new(bank: &mut SignalBank, owner: UnitId) -> Self {
        Self {
            input0: bank.input(owner),
            input1: bank.input(owner),
            control: bank.input(owner),
            output: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let selected = if bank.get(self.control).to_u32() == 0 {
            bank.get(self.input0)
        } else {
            bank.get(self.input1)
        };
        bank.drive(self.output, selected);
    }
}

/// Logical AND of two single-bit inputs.
pub struct AndGate {
    pub input0: InPin,
    pub input1: InPin,
    pub output: OutPin,
}

impl AndGate {
    pub fn new(bank: &mut SignalBank, owner: UnitId) -> Self {
        Self {
            input0: bank.input(owner),
            input1: bank.input(owner),
            output: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let result = bank.get(self.input0).to_u32() != 0 && bank.get(self.input1).to_u32() != 0;
        bank.drive(self.output, Word::from_u32(result as u32));
    }
}

/// Logical OR of two single-bit inputs.
pub struct OrGate {
    pub input0: InPin,
    pub input1: InPin,
    pub output: OutPin,
}

impl OrGate {
    pub fn new(bank: &mut SignalBank, owner: UnitId) -> Self {
        Self {
            input0: bank.input(owner),
            input1: bank.input(owner),
            output: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let result = bank.get(self.input0).to_u32() != 0 || bank.get(self.input1).to_u32() != 0;
        bank.drive(self.output, Word::from_u32(result as u32));
    }
}

/// Wrapping 32-bit adder. PC increment and branch-target arithmetic both
/// run through one of these.
pub struct Adder {
    pub input0: InPin,
    pub input1: InPin,
    pub output: OutPin,
}

impl Adder {
    pub fn new(bank: &mut SignalBank, owner: UnitId) -> Self {
        Self {
            input0: bank.input(owner),
            input1: bank.input(owner),
            output: bank.output(),
        }
    }

    /// Adder whose second operand is a constant that is never driven.
    pub fn with_constant(bank: &mut SignalBank, owner: UnitId, constant: u32) -> Self {
        Self {
            input0: bank.input(owner),
            input1: bank.input_with(owner, Word::from_u32(constant)),
            output: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let sum = bank
            .get(self.input0)
            .to_u32()
            .wrapping_add(bank.get(self.input1).to_u32());
        bank.drive(self.output, Word::from_u32(sum));
    }
}
