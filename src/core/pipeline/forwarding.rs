//! Operand forwarding.

use crate::common::Word;

use super::super::signal::{InPin, SignalBank};

/// Pins of one forwarding source, read on the pre-latch (input) side.
#[derive(Clone, Copy)]
pub struct ForwardSource {
    pub reg_write: InPin,
    pub rd: InPin,
    pub value: InPin,
}

/// Rewrites the operand inputs of ID/EX before the execute stage reads
/// them.
///
/// Runs in the priority phase. For each operand it prefers the result
/// finishing execute (EX/MEM inputs), then the value finishing memory
/// (the MEM/WB buffer inputs, where a load's data is the payload when
/// MemToReg is set). A source only matches when its RegWrite is set and
/// its rd is the non-zero operand register; otherwise the register-file
/// read value stands.
pub struct ForwardingUnit {
    pub enabled: bool,

    id_ex_rs1: InPin,
    id_ex_rs2: InPin,
    id_ex_read_data_1: InPin,
    id_ex_read_data_2: InPin,

    ex_mem: ForwardSource,

    mem_wb_reg_write: InPin,
    mem_wb_rd: InPin,
    mem_wb_mem_to_reg: InPin,
    mem_wb_read_memory_data: InPin,
    mem_wb_alu_output: InPin,
}

impl ForwardingUnit {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        enabled: bool,
        id_ex_rs1: InPin,
        id_ex_rs2: InPin,
        id_ex_read_data_1: InPin,
        id_ex_read_data_2: InPin,
        ex_mem: ForwardSource,
        mem_wb_reg_write: InPin,
        mem_wb_rd: InPin,
        mem_wb_mem_to_reg: InPin,
        mem_wb_read_memory_data: InPin,
        mem_wb_alu_output: InPin,
    ) -> Self {
        Self {
            enabled,
            id_ex_rs1,
            id_ex_rs2,
            id_ex_read_data_1,
            id_ex_read_data_2,
            ex_mem,
            mem_wb_reg_write,
            mem_wb_rd,
            mem_wb_mem_to_reg,
            mem_wb_read_memory_data,
            mem_wb_alu_output,
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        if !self.enabled {
            return;
        }
        let operands = [
            (self.id_ex_rs1, self.id_ex_read_data_1),
            (self.id_ex_rs2, self.id_ex_read_data_2),
        ];
        for (rs_pin, data_pin) in operands {
            let rs = bank.get(rs_pin).to_u32();
            if let Some(value) = self.source_for(bank, rs) {
                bank.poke(data_pin, value);
            }
        }
    }

    fn source_for(&self, bank: &SignalBank, rs: u32) -> Option<Word> {
        let matches = |reg_write: InPin, rd: InPin| {
            let rd = bank.get(rd).to_u32();
            bank.get(reg_write).to_u32() != 0 && rd != 0 && rd == rs
        };
        if matches(self.ex_mem.reg_write, self.ex_mem.rd) {
            return Some(bank.get(self.ex_mem.value));
        }
        if matches(self.mem_wb_reg_write, self.mem_wb_rd) {
            let value = if bank.get(self.mem_wb_mem_to_reg).to_u32() != 0 {
                bank.get(self.mem_wb_read_memory_data)
            } else {
                bank.get(self.mem_wb_alu_output)
            };
            return Some(value);
        }
        None
    }
}
