//! Interactive pipeline simulator CLI.
//!
//! Assembles a program, loads it at address 0 and steps the datapath one
//! clock cycle per Enter keypress. `r` resets the machine to its initial
//! state, `q` quits.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::{fs, process};

use clap::Parser;

use rv32_pipeline_sim::asm::Assembler;
use rv32_pipeline_sim::common::Word;
use rv32_pipeline_sim::config::SimConfig;
use rv32_pipeline_sim::core::Processor;

#[derive(Parser, Debug)]
#[command(author, version, about = "RV32I five-stage pipeline simulator")]
struct Args {
    /// Path to the assembly program.
    program: Option<String>,

    /// Operand forwarding: 1 on, 0 off. Overrides the config file.
    forwarding: Option<u8>,

    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<String>,
}

fn build_processor(config: &SimConfig, program: &[Word]) -> Processor {
    let mut processor = Processor::new(config).unwrap_or_else(|e| {
        eprintln!("[!] {e}");
        process::exit(1);
    });
    if let Err(e) = processor.load_program(program) {
        eprintln!("[!] {e}");
        process::exit(1);
    }
    processor
}

fn main() {
    let args = Args::parse();

    let Some(program_path) = args.program else {
        eprintln!("Error: no program specified.");
        eprintln!("Usage: pipeline-sim <program.asm> [forwarding:0|1]");
        process::exit(1);
    };

    let mut config = match args.config {
        Some(ref path) => SimConfig::load(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("[!] {e}");
            process::exit(1);
        }),
        None => SimConfig::default(),
    };
    if let Some(forwarding) = args.forwarding {
        config.pipeline.forwarding = forwarding != 0;
    }

    let source = fs::read_to_string(&program_path).unwrap_or_else(|e| {
        eprintln!("[!] cannot read {program_path}: {e}");
        process::exit(1);
    });
    let program = Assembler::new().assemble(&source).unwrap_or_else(|e| {
        eprintln!("[!] {e}");
        process::exit(1);
    });

    println!("Configuration");
    println!("-------------");
    println!("  Program:       {program_path} ({} instructions)", program.len());
    println!(
        "  Forwarding:    {}",
        if config.pipeline.forwarding { "on" } else { "off" }
    );
    println!("  Memory:        2^{} bytes, latency {}", config.memory.address_bits, config.memory.latency);
    if config.cache.enabled {
        println!(
            "  Cache:         {} blocks x {} words, {}-way, {:?}/{:?}, latency {}",
            config.cache.blocks,
            config.cache.words_per_block,
            config.cache.ways,
            config.cache.scheme,
            config.cache.policy,
            config.cache.latency
        );
    } else {
        println!("  Cache:         disabled");
    }
    println!("-------------");
    println!("Enter = one cycle, r = reset, q = quit");

    let mut processor = build_processor(&config, &program);

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        match line.trim() {
            "" => {
                if let Err(e) = processor.execute_one_cycle() {
                    eprintln!("[!] {e}");
                    continue;
                }
                println!("{processor}");
            }
            "r" => {
                processor = build_processor(&config, &program);
                println!("[*] reset");
            }
            "q" => break,
            other => println!("unrecognised command: {other}"),
        }
    }

    processor.stats.print();
    processor.dump_state();
}
