//! Hazard detection.
//!
//! Two clocked units run in the processor's priority phase, before any
//! latch buffers its inputs, so both observe the pre-cycle state. They
//! read the *input* side of the pipeline registers (the values about to be
//! latched) through copied pins and drive the freeze/flush wires consumed
//! by the issue unit and the latches.

use crate::common::bits::extract_bits;
use crate::common::Word;
use crate::isa::opcodes;

use super::super::signal::{InPin, OutPin, SignalBank};

/// Detects data hazards against the instruction about to enter decode.
///
/// With forwarding enabled the load-use case stalls: a load in ID/EX
/// whose rd matches rs1 or rs2 of the IF/ID instruction. Branches and
/// `jalr` additionally stall on any pending register write in ID/EX or
/// EX/MEM that matches, because they consume their sources in the decode
/// stage, where the forwarding unit cannot reach: a one-ahead producer's
/// result does not exist yet when the comparison would run. Without
/// forwarding, every instruction stalls on any such pending write until
/// write-back.
///
/// The `stall` output freezes the issue PC and flushes IF/ID, so decode
/// sees a NOP next cycle while the same instruction is fetched again.
/// A pending branch or jump redirect suppresses the stall: the IF/ID
/// instruction is wrong-path and about to be flushed, and freezing the PC
/// would lose the redirect.
pub struct DataHazardUnit {
    pub forwarding: bool,

    if_id_instruction: InPin,
    id_ex_mem_read: InPin,
    id_ex_reg_write: InPin,
    id_ex_rd: InPin,
    ex_mem_reg_write: InPin,
    ex_mem_rd: InPin,
    redirecting: InPin,

    pub stall: OutPin,
}

impl DataHazardUnit {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bank: &mut SignalBank,
        forwarding: bool,
        if_id_instruction: InPin,
        id_ex_mem_read: InPin,
        id_ex_reg_write: InPin,
        id_ex_rd: InPin,
        ex_mem_reg_write: InPin,
        ex_mem_rd: InPin,
        redirecting: InPin,
    ) -> Self {
        Self {
            forwarding,
            if_id_instruction,
            id_ex_mem_read,
            id_ex_reg_write,
            id_ex_rd,
            ex_mem_reg_write,
            ex_mem_rd,
            redirecting,
            stall: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let inst = bank.get(self.if_id_instruction).to_u32();
        let rs1 = extract_bits(inst, 15, 19);
        let rs2 = extract_bits(inst, 20, 24);

        let raw_hazard = |reg_write: InPin, rd: InPin| {
            let rd = bank.get(rd).to_u32();
            bank.get(reg_write).to_u32() != 0 && rd != 0 && (rd == rs1 || rd == rs2)
        };
        let pending_write = raw_hazard(self.id_ex_reg_write, self.id_ex_rd)
            || raw_hazard(self.ex_mem_reg_write, self.ex_mem_rd);

        let mut stall = if self.forwarding {
            let rd = bank.get(self.id_ex_rd).to_u32();
            let load_use =
                bank.get(self.id_ex_mem_read).to_u32() != 0 && rd != 0 && (rd == rs1 || rd == rs2);
            // Branches and jalr read their sources in decode, out of the
            // forwarding unit's reach.
            let opcode = extract_bits(inst, 0, 6);
            let reads_in_decode = opcode == opcodes::BRANCH || opcode == opcodes::JALR;
            load_use || (reads_in_decode && pending_write)
        } else {
            pending_write
        };
        if bank.get(self.redirecting).to_u32() != 0 {
            stall = false;
        }
        bank.drive(self.stall, Word::from_u32(stall as u32));
    }
}

/// Freezes the pipeline while the data memory is busy.
///
/// Watches the data memory's `is_ready` line; while it is low, the issue
/// PC and the IF/ID, ID/EX and EX/MEM latches freeze and MEM/WB is
/// flushed so write-back has no effect.
pub struct MemoryHazardUnit {
    pub is_memory_ready: InPin,
    pub busy: OutPin,
}

impl MemoryHazardUnit {
    pub fn new(bank: &mut SignalBank, is_memory_ready: InPin) -> Self {
        Self {
            is_memory_ready,
            busy: bank.output(),
        }
    }

    pub fn operate(&self, bank: &mut SignalBank) {
        let busy = bank.get(self.is_memory_ready).to_u32() == 0;
        bank.drive(self.busy, Word::from_u32(busy as u32));
    }
}
