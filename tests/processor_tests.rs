//! Unit-level and single-instruction tests for the datapath.

use rv32_pipeline_sim::asm::Assembler;
use rv32_pipeline_sim::common::{RegisterFile, RegisterKind, Word};
use rv32_pipeline_sim::config::SimConfig;
use rv32_pipeline_sim::core::pipeline::MemWbRegister;
use rv32_pipeline_sim::core::signal::SignalBank;
use rv32_pipeline_sim::core::units::{
    AluControl, AluOp, AluUnit, AndGate, BranchAlu, ControlUnit, DecodeUnit, ImmediateGenerator,
    Multiplexer,
};
use rv32_pipeline_sim::core::{Processor, UnitId};

const ADD_X1_X2_X3: u32 = 0b0000000_00011_00010_000_00001_0110011;
const SUB_X1_X2_X3: u32 = 0b0100000_00011_00010_000_00001_0110011;
const ADDI_X1_X2_1000: u32 = 0b001111101000_00010_000_00001_0010011;
const LW_X1_1000_X2: u32 = 0b001111101000_00010_010_00001_0000011;
const SW_X1_1000_X2: u32 = 0b0011111_00001_00010_010_01000_0100011;
const BEQ_X2_X1: u32 = 0b0000000_00001_00010_000_00000_1100011;

fn processor(forwarding: bool) -> Processor {
    let mut config = SimConfig::default();
    config.pipeline.forwarding = forwarding;
    Processor::new(&config).unwrap()
}

fn load(processor: &mut Processor, source: &str) {
    let program = Assembler::new().assemble(source).unwrap();
    processor.load_program(&program).unwrap();
}

fn run(processor: &mut Processor, cycles: usize) {
    for _ in 0..cycles {
        processor.execute_one_cycle().unwrap();
    }
}

#[test]
fn decode_extracts_r_type_fields() {
    let mut bank = SignalBank::new();
    let decoder = DecodeUnit::new(&mut bank);

    bank.poke(decoder.instruction, Word::from_u32(ADD_X1_X2_X3));
    decoder.operate(&mut bank);

    assert_eq!(bank.get_out(decoder.read_register_1).to_u32(), 2);
    assert_eq!(bank.get_out(decoder.read_register_2).to_u32(), 3);
    assert_eq!(bank.get_out(decoder.write_register).to_u32(), 1);
    assert_eq!(bank.get_out(decoder.funct3).to_u32(), 0);
    assert_eq!(bank.get_out(decoder.funct7).to_u32(), 0);
}

#[test]
fn immediate_generator_formats() {
    let mut bank = SignalBank::new();
    let imm_gen = ImmediateGenerator::new(&mut bank);

    bank.poke(imm_gen.instruction, Word::from_u32(ADDI_X1_X2_1000));
    imm_gen.operate(&mut bank);
    assert_eq!(bank.get_out(imm_gen.immediate).to_u32(), 1000);

    bank.poke(imm_gen.instruction, Word::from_u32(LW_X1_1000_X2));
    imm_gen.operate(&mut bank);
    assert_eq!(bank.get_out(imm_gen.immediate).to_u32(), 1000);

    bank.poke(imm_gen.instruction, Word::from_u32(SW_X1_1000_X2));
    imm_gen.operate(&mut bank);
    assert_eq!(bank.get_out(imm_gen.immediate).to_u32(), 1000);
}

#[test]
fn immediate_generator_ignores_nop() {
    let mut bank = SignalBank::new();
    let imm_gen = ImmediateGenerator::new(&mut bank);

    bank.poke(imm_gen.instruction, Word::from_u32(ADDI_X1_X2_1000));
    imm_gen.operate(&mut bank);
    bank.poke(imm_gen.instruction, Word::ZERO);
    imm_gen.operate(&mut bank);
    assert_eq!(bank.get_out(imm_gen.immediate).to_u32(), 1000);
}

#[test]
fn multiplexer_selects_by_control() {
    let mut bank = SignalBank::new();
    let mux = Multiplexer::new(&mut bank, UnitId::AluSrcMux);

    bank.poke(mux.input0, Word::from_u32(0xDEAD_BEEF));
    bank.poke(mux.input1, Word::from_u32(0xFACADE));
    mux.operate(&mut bank);
    assert_eq!(bank.get_out(mux.output).to_u32(), 0xDEAD_BEEF);

    bank.poke(mux.control, Word::from_u32(1));
    mux.operate(&mut bank);
    assert_eq!(bank.get_out(mux.output).to_u32(), 0xFACADE);
}

#[test]
fn and_gate() {
    let mut bank = SignalBank::new();
    let gate = AndGate::new(&mut bank, UnitId::BranchAnd);

    bank.poke(gate.input0, Word::from_u32(1));
    bank.poke(gate.input1, Word::from_u32(1));
    gate.operate(&mut bank);
    assert_eq!(bank.get_out(gate.output).to_u32(), 1);

    bank.poke(gate.input0, Word::ZERO);
    gate.operate(&mut bank);
    assert_eq!(bank.get_out(gate.output).to_u32(), 0);
}

#[test]
fn alu_arithmetic_and_zero_flag() {
    let mut bank = SignalBank::new();
    let alu = AluUnit::new(&mut bank);

    bank.poke(alu.input0, Word::from_i32(14));
    bank.poke(alu.input1, Word::from_i32(8));
    bank.poke(alu.alu_op, Word::from_u32(AluOp::Add.encode()));
    alu.operate(&mut bank);
    assert_eq!(bank.get_out(alu.output).to_i32(), 22);
    assert_eq!(bank.get_out(alu.zero).to_u32(), 0);

    bank.poke(alu.alu_op, Word::from_u32(AluOp::Sub.encode()));
    alu.operate(&mut bank);
    assert_eq!(bank.get_out(alu.output).to_i32(), 6);

    bank.poke(alu.input0, Word::from_i32(8));
    bank.poke(alu.input1, Word::from_i32(14));
    alu.operate(&mut bank);
    assert_eq!(bank.get_out(alu.output).to_i32(), -6);

    bank.poke(alu.input0, Word::from_i32(8));
    bank.poke(alu.input1, Word::from_i32(8));
    alu.operate(&mut bank);
    assert_eq!(bank.get_out(alu.output).to_i32(), 0);
    assert_eq!(bank.get_out(alu.zero).to_u32(), 1);
}

#[test]
fn alu_control_dispatch() {
    let mut bank = SignalBank::new();
    let alu_control = AluControl::new(&mut bank);

    // R-type add and sub under compute.
    bank.poke(alu_control.instruction, Word::from_u32(ADD_X1_X2_X3));
    bank.poke(alu_control.ctrl_alu_op, Word::from_u32(0b10));
    alu_control.operate(&mut bank);
    assert_eq!(bank.get_out(alu_control.alu_op).to_u32(), AluOp::Add.encode());

    bank.poke(alu_control.instruction, Word::from_u32(SUB_X1_X2_X3));
    alu_control.operate(&mut bank);
    assert_eq!(bank.get_out(alu_control.alu_op).to_u32(), AluOp::Sub.encode());

    // Loads always add.
    bank.poke(alu_control.instruction, Word::from_u32(LW_X1_1000_X2));
    bank.poke(alu_control.ctrl_alu_op, Word::from_u32(0b00));
    alu_control.operate(&mut bank);
    assert_eq!(bank.get_out(alu_control.alu_op).to_u32(), AluOp::Add.encode());

    // Branches always subtract.
    bank.poke(alu_control.instruction, Word::from_u32(BEQ_X2_X1));
    bank.poke(alu_control.ctrl_alu_op, Word::from_u32(0b01));
    alu_control.operate(&mut bank);
    assert_eq!(bank.get_out(alu_control.alu_op).to_u32(), AluOp::Sub.encode());
}

#[test]
fn branch_alu_comparisons() {
    let mut bank = SignalBank::new();
    let branch_alu = BranchAlu::new(&mut bank);

    // beq: equal operands taken.
    bank.poke(branch_alu.funct3, Word::from_u32(0));
    bank.poke(branch_alu.input0, Word::from_i32(5));
    bank.poke(branch_alu.input1, Word::from_i32(5));
    branch_alu.operate(&mut bank);
    assert_eq!(bank.get_out(branch_alu.taken).to_u32(), 1);

    // bne.
    bank.poke(branch_alu.funct3, Word::from_u32(1));
    branch_alu.operate(&mut bank);
    assert_eq!(bank.get_out(branch_alu.taken).to_u32(), 0);

    // blt is signed.
    bank.poke(branch_alu.funct3, Word::from_u32(4));
    bank.poke(branch_alu.input0, Word::from_i32(-3));
    bank.poke(branch_alu.input1, Word::from_i32(2));
    branch_alu.operate(&mut bank);
    assert_eq!(bank.get_out(branch_alu.taken).to_u32(), 1);

    // bge.
    bank.poke(branch_alu.funct3, Word::from_u32(5));
    branch_alu.operate(&mut bank);
    assert_eq!(bank.get_out(branch_alu.taken).to_u32(), 0);
}

#[test]
fn control_drives_zeros_for_nop() {
    let mut bank = SignalBank::new();
    let control = ControlUnit::new(&mut bank);
    let mut regs = RegisterFile::new(RegisterKind::Integer);

    bank.poke(control.instruction, Word::from_u32(ADD_X1_X2_X3));
    control.operate(&mut bank, &mut regs);
    assert_eq!(bank.get_out(control.reg_write).to_u32(), 1);
    assert_eq!(bank.get_out(control.alu_op).to_u32(), 0b10);

    bank.poke(control.instruction, Word::ZERO);
    control.operate(&mut bank, &mut regs);
    for pin in [
        control.reg_write,
        control.alu_src,
        control.alu_op,
        control.mem_write,
        control.mem_read,
        control.mem_to_reg,
        control.branch,
        control.use_reg_base,
        control.is_jump,
    ] {
        assert_eq!(bank.get_out(pin).to_u32(), 0);
    }
}

#[test]
fn control_writes_link_register_eagerly() {
    let mut bank = SignalBank::new();
    let control = ControlUnit::new(&mut bank);
    let mut regs = RegisterFile::new(RegisterKind::Integer);

    let jal_x1 = (16 << 12) | (1 << 7) | 0b1101111;
    bank.poke(control.pc, Word::from_u32(0x20));
    bank.poke(control.instruction, Word::from_u32(jal_x1));
    control.operate(&mut bank, &mut regs);

    assert_eq!(regs.read(1).to_u32(), 0x24);
    assert_eq!(bank.get_out(control.is_jump).to_u32(), 1);
}

#[test]
fn pipeline_register_propagates_only_on_clock() {
    let mut bank = SignalBank::new();
    let mut mem_wb = MemWbRegister::new(&mut bank);

    bank.poke(mem_wb.read_memory_data.input, Word::from_u32(0xDEAD));
    bank.poke(mem_wb.alu_output.input, Word::from_u32(0xFACADE));
    assert_eq!(bank.get_out(mem_wb.read_memory_data.output).to_u32(), 0);
    assert_eq!(bank.get_out(mem_wb.alu_output.output).to_u32(), 0);

    mem_wb.buffer_inputs(&bank);
    mem_wb.operate(&mut bank);
    assert_eq!(bank.get_out(mem_wb.read_memory_data.output).to_u32(), 0xDEAD);
    assert_eq!(bank.get_out(mem_wb.alu_output.output).to_u32(), 0xFACADE);
}

/// An add completes write-back on the fifth cycle.
#[test]
fn add_instruction() {
    let mut processor = processor(false);
    load(&mut processor, "add x1, x2, x3");
    processor.set_int_reg(2, 6);
    processor.set_int_reg(3, 7);

    run(&mut processor, 5);
    assert_eq!(processor.int_reg(1), 13);
}

#[test]
fn sub_instruction() {
    let mut processor = processor(false);
    load(&mut processor, "sub x1, x2, x3");
    processor.set_int_reg(2, 6);
    processor.set_int_reg(3, 7);

    run(&mut processor, 5);
    assert_eq!(processor.int_reg(1) as i32, -1);
}

#[test]
fn addi_instruction() {
    let mut processor = processor(false);
    load(&mut processor, "addi x1, x2, 1000");
    processor.set_int_reg(2, 24);

    run(&mut processor, 5);
    assert_eq!(processor.int_reg(1), 1024);
}

#[test]
fn load_instruction() {
    let mut processor = processor(false);
    load(&mut processor, "lw x1, 4(x2)");
    processor.set_int_reg(2, 0x10);
    processor.write_data_memory(0x14, 0xBEEF).unwrap();

    run(&mut processor, 5);
    assert_eq!(processor.int_reg(1), 0xBEEF);
}

/// A store needs only the memory stage to complete.
#[test]
fn store_instruction() {
    let mut processor = processor(false);
    load(&mut processor, "sw x1, 4(x2)");
    processor.set_int_reg(1, 0xFACADE);
    processor.set_int_reg(2, 0x10);

    run(&mut processor, 4);
    assert_eq!(processor.read_data_memory(0x14).unwrap(), 0xFACADE);
}

#[test]
fn multiple_add_instructions() {
    let mut processor = processor(false);
    load(
        &mut processor,
        "add x1, x2, x3\n\
         add x11, x12, x13\n\
         add x0, x0, x0\n\
         add x0, x0, x0\n\
         add x21, x1, x11",
    );
    processor.set_int_reg(2, 2);
    processor.set_int_reg(3, 3);
    processor.set_int_reg(12, 12);
    processor.set_int_reg(13, 13);

    run(&mut processor, 9);
    assert_eq!(processor.int_reg(1), 5);
    assert_eq!(processor.int_reg(11), 25);
    assert_eq!(processor.int_reg(21), 30);
    assert_eq!(processor.stats.stalls_data, 0);
}

#[test]
fn load_add_sequence() {
    let mut processor = processor(false);
    load(
        &mut processor,
        "lw x1, 0(x0)\n\
         lw x2, 4(x0)\n\
         add x0, x0, x0\n\
         add x0, x0, x0\n\
         add x3, x1, x2",
    );
    processor.write_data_memory(0x0, 1).unwrap();
    processor.write_data_memory(0x4, 2).unwrap();

    run(&mut processor, 9);
    assert_eq!(processor.int_reg(1), 1);
    assert_eq!(processor.int_reg(2), 2);
    assert_eq!(processor.int_reg(3), 3);
}

/// A store followed by a load from the same address observes the stored
/// value.
#[test]
fn store_load_sequence() {
    let mut processor = processor(false);
    load(
        &mut processor,
        "addi x1, x0, 80\n\
         add x0, x0, x0\n\
         add x0, x0, x0\n\
         sw x1, 0(x0)\n\
         lw x2, 0(x0)",
    );

    run(&mut processor, 9);
    assert_eq!(processor.int_reg(1), 80);
    assert_eq!(processor.int_reg(2), 80);
}

/// Writes to x0 are discarded through the whole pipeline.
#[test]
fn x0_stays_zero() {
    let mut processor = processor(false);
    load(
        &mut processor,
        "addi x0, x0, 5\n\
         add x1, x0, x0",
    );

    run(&mut processor, 10);
    assert_eq!(processor.int_reg(0), 0);
    assert_eq!(processor.int_reg(1), 0);
}

/// An all-NOP program changes no register and no memory location.
#[test]
fn nop_safety() {
    let mut processor = processor(true);

    run(&mut processor, 10);
    for idx in 0..32 {
        assert_eq!(processor.int_reg(idx), 0);
    }
    for addr in (0x0..0x40).step_by(4) {
        assert_eq!(processor.read_data_memory(addr).unwrap(), 0);
    }
}
