//! End-to-end programs: control flow, the loop accumulator, slow memory
//! and the cache in the pipeline.

use rv32_pipeline_sim::asm::Assembler;
use rv32_pipeline_sim::config::SimConfig;
use rv32_pipeline_sim::core::Processor;
use rv32_pipeline_sim::memory::{ReplacementPolicy, WriteScheme};

fn processor_with(config: &SimConfig) -> Processor {
    Processor::new(config).unwrap()
}

fn config(forwarding: bool) -> SimConfig {
    let mut config = SimConfig::default();
    config.pipeline.forwarding = forwarding;
    config
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

/// A taken branch flushes exactly the one wrong-path instruction.
#[test]
fn taken_branch_flushes_one_instruction() {
    let cfg = config(true);
    let mut processor = processor_with(&cfg);
    load(
        &mut processor,
        "beq x0, x0, 12\n\
         addi x1, x0, 1\n\
         addi x2, x0, 2\n\
         addi x3, x0, 3",
    );

    run(&mut processor, 8);
    assert_eq!(processor.int_reg(1), 0);
    assert_eq!(processor.int_reg(2), 0);
    assert_eq!(processor.int_reg(3), 3);
    assert_eq!(processor.stats.branch_flushes, 1);
}

/// A branch that falls through costs nothing.
#[test]
fn untaken_branch_does_not_flush() {
    let cfg = config(true);
    let mut processor = processor_with(&cfg);
    load(
        &mut processor,
        "bne x0, x0, 12\n\
         addi x1, x0, 9",
    );

    run(&mut processor, 7);
    assert_eq!(processor.int_reg(1), 9);
    assert_eq!(processor.stats.branch_flushes, 0);
}

/// blt compares as signed.
#[test]
fn blt_is_signed() {
    let cfg = config(true);
    let mut processor = processor_with(&cfg);
    load(
        &mut processor,
        "blt x1, x0, 12\n\
         addi x2, x0, 1\n\
         addi x3, x0, 2\n\
         addi x4, x0, 3",
    );
    processor.set_int_reg(1, (-5i32) as u32);

    run(&mut processor, 8);
    assert_eq!(processor.int_reg(2), 0);
    assert_eq!(processor.int_reg(3), 0);
    assert_eq!(processor.int_reg(4), 3);
}

/// `jal` writes the link register the cycle it is decoded and redirects
/// fetch by a byte offset.
#[test]
fn jal_links_and_redirects() {
    let cfg = config(true);
    let mut processor = processor_with(&cfg);
    load(
        &mut processor,
        "jal x1, 8\n\
         addi x2, x0, 5\n\
         addi x3, x0, 7",
    );

    run(&mut processor, 8);
    assert_eq!(processor.int_reg(1), 4);
    assert_eq!(processor.int_reg(2), 0);
    assert_eq!(processor.int_reg(3), 7);
}

/// `jalr` computes its target from rs1.
#[test]
fn jalr_uses_register_base() {
    let cfg = config(true);
    let mut processor = processor_with(&cfg);
    load(
        &mut processor,
        "jalr x1, 4(x5)\n\
         addi x2, x0, 5\n\
         addi x3, x0, 7",
    );
    processor.set_int_reg(5, 4);

    run(&mut processor, 8);
    assert_eq!(processor.int_reg(1), 4);
    assert_eq!(processor.int_reg(2), 0);
    assert_eq!(processor.int_reg(3), 7);
}

/// The loop accumulator: sums memory[0..12) into memory[12] within 40
/// cycles, stalls included.
#[test]
fn loop_accumulator() {
    let cfg = config(false);
    let mut processor = processor_with(&cfg);
    load(
        &mut processor,
        "addi x5, x0, 0\n\
         addi x6, x0, 0\n\
         addi x7, x0, 12\n\
         lw x8, 0(x5)\n\
         addi x5, x5, 4\n\
         add x6, x6, x8\n\
         bne x5, x7, -12\n\
         sw x6, 12(x0)",
    );
    processor.write_data_memory(0x0, 1).unwrap();
    processor.write_data_memory(0x4, 2).unwrap();
    processor.write_data_memory(0x8, 3).unwrap();

    run(&mut processor, 40);
    assert_eq!(processor.read_data_memory(12).unwrap(), 6);
    assert_eq!(processor.int_reg(6), 6);
    assert_eq!(processor.int_reg(5), 12);
    assert_eq!(processor.stats.branch_flushes, 2);
}

/// Latency-2 main memory: the load pair plus a dependent add takes ten
/// cycles with forwarding, freezing the front of the pipeline twice.
#[test]
fn latency_two_memory() {
    let mut cfg = config(true);
    cfg.memory.latency = 2;
    let mut processor = processor_with(&cfg);
    load(
        &mut processor,
        "lw x1, 0(x0)\n\
         lw x2, 4(x0)\n\
         add x3, x1, x2",
    );
    processor.write_data_memory(0x0, 1).unwrap();
    processor.write_data_memory(0x4, 2).unwrap();

    run(&mut processor, 10);
    assert_eq!(processor.int_reg(1), 1);
    assert_eq!(processor.int_reg(2), 2);
    assert_eq!(processor.int_reg(3), 3);
    assert_eq!(processor.stats.stalls_mem, 2);
    assert_eq!(processor.stats.stalls_data, 1);
}

/// A cold cache costs one memory stall on the first load; the second
/// load hits at full speed.
#[test]
fn cached_loads() {
    let mut cfg = config(true);
    cfg.cache.enabled = true;
    cfg.cache.words_per_block = 1;
    cfg.cache.ways = 1;
    cfg.cache.blocks = 4;
    cfg.cache.scheme = WriteScheme::WriteThrough;
    cfg.cache.policy = ReplacementPolicy::Random;
    let mut processor = processor_with(&cfg);
    load(
        &mut processor,
        "lw x1, 0(x0)\n\
         add x0, x0, x0\n\
         add x0, x0, x0\n\
         lw x2, 0(x0)",
    );
    processor.write_data_memory(0x0, 7).unwrap();

    run(&mut processor, 10);
    assert_eq!(processor.int_reg(1), 7);
    assert_eq!(processor.int_reg(2), 7);
    assert_eq!(processor.stats.stalls_mem, 1);
}

/// A write-back cache absorbs the store and serves the reload without
/// touching memory again.
#[test]
fn write_back_cache_in_pipeline() {
    let mut cfg = config(true);
    cfg.cache.enabled = true;
    cfg.cache.words_per_block = 1;
    cfg.cache.ways = 1;
    cfg.cache.blocks = 4;
    cfg.cache.scheme = WriteScheme::WriteBack;
    cfg.cache.policy = ReplacementPolicy::PreciseLru;
    let mut processor = processor_with(&cfg);
    load(
        &mut processor,
        "addi x1, x0, 80\n\
         add x0, x0, x0\n\
         add x0, x0, x0\n\
         sw x1, 0(x0)\n\
         add x0, x0, x0\n\
         add x0, x0, x0\n\
         lw x2, 0(x0)",
    );

    run(&mut processor, 13);
    assert_eq!(processor.int_reg(2), 80);
    assert_eq!(processor.stats.stalls_mem, 1);
}
