//! The processor: every unit of the datapath, wired once at construction
//! and advanced one clock cycle at a time.

pub mod pipeline;
pub mod signal;
pub mod units;

use std::fmt;

use crate::common::{Block, SimError, Word};
use crate::config::SimConfig;
use crate::memory::{TimedCache, TimedMainMemory, TimedMemory};
use crate::stats::SimStats;

use pipeline::{
    DataHazardUnit, ExMemRegister, ForwardSource, ForwardingUnit, IdExRegister, IfIdRegister,
    InstructionIssueUnit, MemWbRegister, MemoryHazardUnit,
};
use signal::SignalBank;
use units::{
    Adder, AluControl, AluUnit, AndGate, BranchAlu, ControlUnit, DataMemoryUnit, DecodeUnit,
    ImmediateGenerator, InstructionMemoryUnit, Multiplexer, OrGate, RegisterFileUnit,
};

/// Names every unit instance in the datapath. Input signals carry their
/// owner's id so a drive can notify the owner; the processor's dispatch
/// runs combinational owners and ignores clocked ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitId {
    // Combinational units.
    InstructionMemory,
    Decode,
    RegisterFile,
    ImmediateGenerator,
    Control,
    AluControl,
    Alu,
    BranchAlu,
    PcAdder,
    TargetAdder,
    BaseMux,
    NextPcMux,
    AluSrcMux,
    MemToRegMux,
    BranchAnd,
    PcSrcOr,
    FlushOr,
    FreezeOr,
    // Clocked units; notification is a no-op for these.
    IssueUnit,
    IfId,
    IdEx,
    ExMem,
    MemWb,
    DataMemory,
    DataHazard,
    MemoryHazard,
    Forwarding,
}

/// The five-stage pipelined processor.
///
/// Owns the signal bank and every unit. `execute_one_cycle` advances the
/// machine by one clock: priority units first (hazards, then forwarding),
/// then the buffer phase of the clocked latches, then their drive phase in
/// declaration order, settling the combinational cone after each step.
pub struct Processor {
    pub bank: SignalBank,
    pub clock: u64,
    pub stats: SimStats,
    pub trace: bool,

    // Priority units.
    pub data_hazard: DataHazardUnit,
    pub mem_hazard: MemoryHazardUnit,
    pub forwarding: ForwardingUnit,

    // Clocked units, in tick order.
    pub issue: InstructionIssueUnit,
    pub if_id: IfIdRegister,
    pub id_ex: IdExRegister,
    pub ex_mem: ExMemRegister,
    pub mem_wb: MemWbRegister,
    pub data_memory: DataMemoryUnit,

    // Combinational units.
    pub instruction_memory: InstructionMemoryUnit,
    pub decode: DecodeUnit,
    pub registers: RegisterFileUnit,
    pub imm_gen: ImmediateGenerator,
    pub control: ControlUnit,
    pub alu_control: AluControl,
    pub alu: AluUnit,
    pub branch_alu: BranchAlu,
    pub pc_adder: Adder,
    pub target_adder: Adder,
    pub base_mux: Multiplexer,
    pub next_pc_mux: Multiplexer,
    pub alu_src_mux: Multiplexer,
    pub mem_to_reg_mux: Multiplexer,
    pub branch_and: AndGate,
    pub pc_src_or: OrGate,
    pub flush_or: OrGate,
    pub freeze_or: OrGate,
}

impl Processor {
    pub fn new(config: &SimConfig) -> Result<Self, SimError> {
        let mut bank = SignalBank::new();

        let instruction_store = TimedMainMemory::new(config.memory.address_bits, 1)?;
        let main_memory =
            TimedMainMemory::new(config.memory.address_bits, config.memory.latency)?;
        let data_store: Box<dyn TimedMemory> = if config.cache.enabled {
            Box::new(TimedCache::new(
                config.cache.words_per_block,
                config.cache.ways,
                config.cache.blocks,
                config.cache.scheme,
                config.cache.policy,
                Box::new(main_memory),
                config.cache.latency,
            )?)
        } else {
            Box::new(main_memory)
        };

        let issue = InstructionIssueUnit::new(&mut bank);
        let if_id = IfIdRegister::new(&mut bank);
        let id_ex = IdExRegister::new(&mut bank);
        let ex_mem = ExMemRegister::new(&mut bank);
        let mem_wb = MemWbRegister::new(&mut bank);

        let instruction_memory = InstructionMemoryUnit::new(&mut bank, instruction_store)?;
        let data_memory = DataMemoryUnit::new(&mut bank, data_store);
        let decode = DecodeUnit::new(&mut bank);
        let registers = RegisterFileUnit::new(&mut bank);
        let imm_gen = ImmediateGenerator::new(&mut bank);
        let control = ControlUnit::new(&mut bank);
        let alu_control = AluControl::new(&mut bank);
        let alu = AluUnit::new(&mut bank);
        let branch_alu = BranchAlu::new(&mut bank);
        let pc_adder = Adder::with_constant(&mut bank, UnitId::PcAdder, 4);
        let target_adder = Adder::new(&mut bank, UnitId::TargetAdder);
        let base_mux = Multiplexer::new(&mut bank, UnitId::BaseMux);
        let next_pc_mux = Multiplexer::new(&mut bank, UnitId::NextPcMux);
        let alu_src_mux = Multiplexer::new(&mut bank, UnitId::AluSrcMux);
        let mem_to_reg_mux = Multiplexer::new(&mut bank, UnitId::MemToRegMux);
        let branch_and = AndGate::new(&mut bank, UnitId::BranchAnd);
        let pc_src_or = OrGate::new(&mut bank, UnitId::PcSrcOr);
        let flush_or = OrGate::new(&mut bank, UnitId::FlushOr);
        let freeze_or = OrGate::new(&mut bank, UnitId::FreezeOr);

        // The hazard and forwarding units observe the latch inputs through
        // copied pins; they own no wiring of their own besides their
        // stall/busy outputs.
        let redirect_pin = bank.input(UnitId::DataHazard);
        bank.connect(pc_src_or.output, redirect_pin);
        let data_hazard = DataHazardUnit::new(
            &mut bank,
            config.pipeline.forwarding,
            if_id.instruction.input,
            id_ex.ctrl_mem_read.input,
            id_ex.ctrl_reg_write.input,
            id_ex.write_register.input,
            ex_mem.ctrl_reg_write.input,
            ex_mem.write_register.input,
            redirect_pin,
        );

        let ready_pin = bank.input_with(UnitId::MemoryHazard, Word::from_u32(1));
        bank.connect(data_memory.is_ready, ready_pin);
        let mem_hazard = MemoryHazardUnit::new(&mut bank, ready_pin);

        let forwarding = ForwardingUnit::new(
            config.pipeline.forwarding,
            id_ex.rs1.input,
            id_ex.rs2.input,
            id_ex.read_data_1.input,
            id_ex.read_data_2.input,
            ForwardSource {
                reg_write: ex_mem.ctrl_reg_write.input,
                rd: ex_mem.write_register.input,
                value: ex_mem.alu_output.input,
            },
            mem_wb.ctrl_reg_write.input,
            mem_wb.write_register.input,
            mem_wb.ctrl_mem_to_reg.input,
            mem_wb.read_memory_data.input,
            mem_wb.alu_output.input,
        );

        let mut processor = Self {
            bank,
            clock: 0,
            stats: SimStats::default(),
            trace: config.pipeline.trace,
            data_hazard,
            mem_hazard,
            forwarding,
            issue,
            if_id,
            id_ex,
            ex_mem,
            mem_wb,
            data_memory,
            instruction_memory,
            decode,
            registers,
            imm_gen,
            control,
            alu_control,
            alu,
            branch_alu,
            pc_adder,
            target_adder,
            base_mux,
            next_pc_mux,
            alu_src_mux,
            mem_to_reg_mux,
            branch_and,
            pc_src_or,
            flush_or,
            freeze_or,
        };
        processor.wire();
        Ok(processor)
    }

    /// Connects the whole datapath. Done once; connections never change.
    fn wire(&mut self) {
        let bank = &mut self.bank;

        // Fetch stage.
        bank.connect(self.issue.pc, self.instruction_memory.address);
        bank.connect(self.issue.pc, self.pc_adder.input0);
        bank.connect(self.pc_adder.output, self.next_pc_mux.input0);
        bank.connect(self.target_adder.output, self.next_pc_mux.input1);
        bank.connect(self.pc_src_or.output, self.next_pc_mux.control);
        bank.connect(self.next_pc_mux.output, self.issue.next_pc);
        bank.connect(self.freeze_or.output, self.issue.should_freeze);

        bank.connect(self.issue.pc, self.if_id.pc.input);
        bank.connect(
            self.instruction_memory.instruction,
            self.if_id.instruction.input,
        );
        bank.connect(self.mem_hazard.busy, self.if_id.should_freeze);
        bank.connect(self.flush_or.output, self.if_id.should_flush);

        // Decode stage.
        let if_id_inst = self.if_id.instruction.output;
        let if_id_pc = self.if_id.pc.output;
        bank.connect(if_id_inst, self.decode.instruction);
        bank.connect(if_id_inst, self.imm_gen.instruction);
        bank.connect(if_id_inst, self.control.instruction);
        bank.connect(if_id_pc, self.control.pc);
        bank.connect(if_id_pc, self.base_mux.input0);

        bank.connect(self.decode.read_register_1, self.registers.read_register_1);
        bank.connect(self.decode.read_register_2, self.registers.read_register_2);
        bank.connect(self.registers.read_data_1, self.branch_alu.input0);
        bank.connect(self.registers.read_data_2, self.branch_alu.input1);
        bank.connect(self.registers.read_data_1, self.base_mux.input1);
        bank.connect(self.decode.funct3, self.branch_alu.funct3);

        bank.connect(self.control.use_reg_base, self.base_mux.control);
        bank.connect(self.base_mux.output, self.target_adder.input0);
        bank.connect(self.imm_gen.immediate, self.target_adder.input1);

        bank.connect(self.control.branch, self.branch_and.input0);
        bank.connect(self.branch_alu.taken, self.branch_and.input1);
        bank.connect(self.branch_and.output, self.pc_src_or.input0);
        bank.connect(self.control.is_jump, self.pc_src_or.input1);

        bank.connect(self.pc_src_or.output, self.flush_or.input0);
        bank.connect(self.data_hazard.stall, self.flush_or.input1);
        bank.connect(self.data_hazard.stall, self.freeze_or.input0);
        bank.connect(self.mem_hazard.busy, self.freeze_or.input1);

        // Into ID/EX.
        bank.connect(if_id_pc, self.id_ex.pc.input);
        bank.connect(if_id_inst, self.id_ex.instruction.input);
        bank.connect(self.registers.read_data_1, self.id_ex.read_data_1.input);
        bank.connect(self.registers.read_data_2, self.id_ex.read_data_2.input);
        bank.connect(self.imm_gen.immediate, self.id_ex.immediate.input);
        bank.connect(self.decode.read_register_1, self.id_ex.rs1.input);
        bank.connect(self.decode.read_register_2, self.id_ex.rs2.input);
        bank.connect(self.decode.write_register, self.id_ex.write_register.input);
        bank.connect(self.control.reg_write, self.id_ex.ctrl_reg_write.input);
        bank.connect(self.control.alu_src, self.id_ex.ctrl_alu_src.input);
        bank.connect(self.control.alu_op, self.id_ex.ctrl_alu_op.input);
        bank.connect(self.control.mem_write, self.id_ex.ctrl_mem_write.input);
        bank.connect(self.control.mem_read, self.id_ex.ctrl_mem_read.input);
        bank.connect(self.control.mem_to_reg, self.id_ex.ctrl_mem_to_reg.input);
        bank.connect(self.mem_hazard.busy, self.id_ex.should_freeze);

        // Execute stage.
        bank.connect(self.id_ex.read_data_1.output, self.alu.input0);
        bank.connect(self.id_ex.read_data_2.output, self.alu_src_mux.input0);
        bank.connect(self.id_ex.immediate.output, self.alu_src_mux.input1);
        bank.connect(self.id_ex.ctrl_alu_src.output, self.alu_src_mux.control);
        bank.connect(self.alu_src_mux.output, self.alu.input1);
        bank.connect(self.id_ex.instruction.output, self.alu_control.instruction);
        bank.connect(self.id_ex.ctrl_alu_op.output, self.alu_control.ctrl_alu_op);
        bank.connect(self.alu_control.alu_op, self.alu.alu_op);

        // Into EX/MEM.
        bank.connect(self.alu.output, self.ex_mem.alu_output.input);
        bank.connect(self.id_ex.read_data_2.output, self.ex_mem.write_data.input);
        bank.connect(
            self.id_ex.write_register.output,
            self.ex_mem.write_register.input,
        );
        bank.connect(
            self.id_ex.ctrl_reg_write.output,
            self.ex_mem.ctrl_reg_write.input,
        );
        bank.connect(
            self.id_ex.ctrl_mem_write.output,
            self.ex_mem.ctrl_mem_write.input,
        );
        bank.connect(
            self.id_ex.ctrl_mem_read.output,
            self.ex_mem.ctrl_mem_read.input,
        );
        bank.connect(
            self.id_ex.ctrl_mem_to_reg.output,
            self.ex_mem.ctrl_mem_to_reg.input,
        );
        bank.connect(self.mem_hazard.busy, self.ex_mem.should_freeze);

        // Memory stage.
        bank.connect(self.ex_mem.alu_output.output, self.data_memory.address);
        bank.connect(self.ex_mem.write_data.output, self.data_memory.write_data);
        bank.connect(
            self.ex_mem.ctrl_mem_read.output,
            self.data_memory.ctrl_mem_read,
        );
        bank.connect(
            self.ex_mem.ctrl_mem_write.output,
            self.data_memory.ctrl_mem_write,
        );

        // Into MEM/WB.
        bank.connect(
            self.data_memory.read_data,
            self.mem_wb.read_memory_data.input,
        );
        bank.connect(self.ex_mem.alu_output.output, self.mem_wb.alu_output.input);
        bank.connect(
            self.ex_mem.write_register.output,
            self.mem_wb.write_register.input,
        );
        bank.connect(
            self.ex_mem.ctrl_reg_write.output,
            self.mem_wb.ctrl_reg_write.input,
        );
        bank.connect(
            self.ex_mem.ctrl_mem_to_reg.output,
            self.mem_wb.ctrl_mem_to_reg.input,
        );
        bank.connect(self.mem_hazard.busy, self.mem_wb.should_flush);

        // Write-back stage.
        bank.connect(self.mem_wb.alu_output.output, self.mem_to_reg_mux.input0);
        bank.connect(
            self.mem_wb.read_memory_data.output,
            self.mem_to_reg_mux.input1,
        );
        bank.connect(
            self.mem_wb.ctrl_mem_to_reg.output,
            self.mem_to_reg_mux.control,
        );
        bank.connect(self.mem_to_reg_mux.output, self.registers.write_data);
        bank.connect(
            self.mem_wb.write_register.output,
            self.registers.write_register,
        );
        bank.connect(
            self.mem_wb.ctrl_reg_write.output,
            self.registers.ctrl_reg_write,
        );
    }

    /// Runs a combinational unit in response to a notification. Clocked
    /// units ignore notifications; the processor ticks them explicitly.
    fn dispatch(&mut self, id: UnitId) -> Result<(), SimError> {
        match id {
            UnitId::InstructionMemory => self.instruction_memory.operate(&mut self.bank)?,
            UnitId::Decode => self.decode.operate(&mut self.bank),
            UnitId::RegisterFile => self.registers.operate(&mut self.bank),
            UnitId::ImmediateGenerator => self.imm_gen.operate(&mut self.bank),
            UnitId::Control => self
                .control
                .operate(&mut self.bank, &mut self.registers.int_regs),
            UnitId::AluControl => self.alu_control.operate(&mut self.bank),
            UnitId::Alu => self.alu.operate(&mut self.bank),
            UnitId::BranchAlu => self.branch_alu.operate(&mut self.bank),
            UnitId::PcAdder => self.pc_adder.operate(&mut self.bank),
            UnitId::TargetAdder => self.target_adder.operate(&mut self.bank),
            UnitId::BaseMux => self.base_mux.operate(&mut self.bank),
            UnitId::NextPcMux => self.next_pc_mux.operate(&mut self.bank),
            UnitId::AluSrcMux => self.alu_src_mux.operate(&mut self.bank),
            UnitId::MemToRegMux => self.mem_to_reg_mux.operate(&mut self.bank),
            UnitId::BranchAnd => self.branch_and.operate(&mut self.bank),
            UnitId::PcSrcOr => self.pc_src_or.operate(&mut self.bank),
            UnitId::FlushOr => self.flush_or.operate(&mut self.bank),
            UnitId::FreezeOr => self.freeze_or.operate(&mut self.bank),
            UnitId::IssueUnit
            | UnitId::IfId
            | UnitId::IdEx
            | UnitId::ExMem
            | UnitId::MemWb
            | UnitId::DataMemory
            | UnitId::DataHazard
            | UnitId::MemoryHazard
            | UnitId::Forwarding => {}
        }
        Ok(())
    }

    /// Drains the pending-notification stack until the combinational cone
    /// is quiet. Terminates because every cycle in the signal graph passes
    /// through a clocked unit.
    fn settle(&mut self) -> Result<(), SimError> {
        while let Some(id) = self.bank.take_pending() {
            self.dispatch(id)?;
        }
        Ok(())
    }

    /// Advances the machine by one clock cycle.
    pub fn execute_one_cycle(&mut self) -> Result<(), SimError> {
        self.clock += 1;
        self.stats.cycles += 1;

        // Priority phase: hazard detection, then forwarding. All of them
        // observe the pre-cycle latched state.
        self.data_hazard.operate(&mut self.bank);
        self.settle()?;
        self.mem_hazard.operate(&mut self.bank);
        self.settle()?;
        self.forwarding.operate(&mut self.bank);
        self.settle()?;

        let memory_busy = self.bank.get_out(self.mem_hazard.busy).to_u32() != 0;
        if memory_busy {
            self.stats.stalls_mem += 1;
        } else if self.bank.get_out(self.data_hazard.stall).to_u32() != 0 {
            self.stats.stalls_data += 1;
        }

        // Buffer phase: latch every clocked input before any output moves.
        self.issue.buffer_inputs(&self.bank);
        self.if_id.buffer_inputs(&self.bank);
        self.id_ex.buffer_inputs(&self.bank);
        self.ex_mem.buffer_inputs(&self.bank);
        self.mem_wb.buffer_inputs(&self.bank);

        // Clocked phase: drive each latch and let its cone settle.
        self.issue.operate(&mut self.bank);
        self.settle()?;
        self.if_id.operate(&mut self.bank);
        self.settle()?;
        self.id_ex.operate(&mut self.bank);
        self.settle()?;
        self.ex_mem.operate(&mut self.bank);
        self.settle()?;
        self.mem_wb.operate(&mut self.bank);
        self.settle()?;
        self.data_memory.operate(&mut self.bank)?;
        self.settle()?;

        if !memory_busy && self.bank.get_out(self.pc_src_or.output).to_u32() != 0 {
            self.stats.branch_flushes += 1;
        }

        if self.trace {
            eprintln!("{self}");
        }
        Ok(())
    }

    /// Loads an assembled program into instruction memory at address 0.
    pub fn load_program(&mut self, program: &[Word]) -> Result<(), SimError> {
        if program.is_empty() {
            return Ok(());
        }
        self.instruction_memory
            .memory
            .write_block_now(0, &Block::from(program.to_vec()))
    }

    /// Convenience read of an integer register.
    pub fn int_reg(&self, idx: usize) -> u32 {
        self.registers.int_regs.read(idx).to_u32()
    }

    /// Convenience write of an integer register; used to seed test state.
    pub fn set_int_reg(&mut self, idx: usize, value: u32) {
        self.registers.int_regs.write(idx, Word::from_u32(value));
    }

    /// Instantaneous data-memory read, bypassing the pipeline. Testing and
    /// inspection only.
    pub fn read_data_memory(&mut self, addr: u32) -> Result<u32, SimError> {
        Ok(self.data_memory.memory.read_block_now(addr, 1)?[0].to_u32())
    }

    /// Instantaneous data-memory write, bypassing the pipeline. Testing
    /// and inspection only.
    pub fn write_data_memory(&mut self, addr: u32, value: u32) -> Result<(), SimError> {
        self.data_memory
            .memory
            .write_block_now(addr, &Block::from([value]))
    }

    /// Dumps the integer register file to stdout.
    pub fn dump_state(&self) {
        println!(
            "cycle {} | pc={:#010x}",
            self.clock,
            self.bank.get_out(self.issue.pc).to_u32()
        );
        self.registers.int_regs.dump();
    }
}

impl fmt::Display for Processor {
    /// One-line pipeline occupancy summary.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_stage = |inst: u32| -> String {
            if inst == 0 {
                format!("[{:^10}]", "nop")
            } else {
                format!("[{inst:#010x}]")
            }
        };
        write!(
            f,
            "cycle {:>4} | pc={:#06x} | id:{} ex:{}",
            self.clock,
            self.bank.get_out(self.issue.pc).to_u32(),
            fmt_stage(self.bank.get_out(self.if_id.instruction.output).to_u32()),
            fmt_stage(self.bank.get_out(self.id_ex.instruction.output).to_u32()),
        )
    }
}
