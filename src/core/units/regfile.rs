//! The register-file unit of the decode stage.

use crate::common::{RegisterFile, RegisterKind};

use super::super::signal::{InPin, OutPin, SignalBank};
use super::super::UnitId;

/// Wraps the integer register file behind read and write ports.
///
/// Reads recompute whenever any input changes, so a write-back landing in
/// the same cycle as a decode-stage read is observed by that read.
pub struct RegisterFileUnit {
    pub read_register_1: InPin,
    pub read_register_2: InPin,
    pub write_register: InPin,
    pub write_data: InPin,
    pub ctrl_reg_write: InPin,
    pub read_data_1: OutPin,
    pub read_data_2: OutPin,

    pub int_regs: RegisterFile,
}

impl RegisterFileUnit {
    pub fn new(bank: &mut SignalBank) -> Self {
        Self {
            read_register_1: bank.input(UnitId::RegisterFile),
            read_register_2: bank.input(UnitId::RegisterFile),
            write_register: bank.input(UnitId::RegisterFile),
            write_data: bank.input(UnitId::RegisterFile),
            ctrl_reg_write: bank.input(UnitId::RegisterFile),
            read_data_1: bank.output(),
            read_data_2: bank.output(),
            int_regs: RegisterFile::new(RegisterKind::Integer),
        }
    }

    pub fn operate(&mut self, bank: &mut SignalBank) {
        if bank.get(self.ctrl_reg_write).to_u32() != 0 {
            let rd = bank.get(self.write_register).to_u32() as usize;
            self.int_regs.write(rd, bank.get(self.write_data));
        }
        let r1 = bank.get(self.read_register_1).to_u32() as usize;
        let r2 = bank.get(self.read_register_2).to_u32() as usize;
        bank.drive(self.read_data_1, self.int_regs.read(r1));
        bank.drive(self.read_data_2, self.int_regs.read(r2));
    }
}
