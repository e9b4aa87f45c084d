//! A regex-driven, one-instruction-per-line assembler.
//!
//! Four line shapes are recognised: `op rD, rS1, rS2`, `op rA, rB, imm`
//! (register-immediate and branches), `op rD, imm(rS1)` (loads, stores,
//! `jalr`) and `op rD, imm` (`jal`, `lui`). Registers are written
//! `x0`..`x31`; immediates are decimal with an optional leading minus.
//! Labels, comments and other immediate bases are not supported.
//!
//! Branch and jump immediates are byte offsets, stored verbatim in the S
//! and U field layouts.

use regex::Regex;

use crate::common::bits::place_bits;
use crate::common::{SimError, Word};
use crate::isa::{funct3, funct7, opcodes};

/// Compiled line patterns plus the encoding tables.
pub struct Assembler {
    r_format: Regex,
    i_format: Regex,
    offset_format: Regex,
    u_format: Regex,
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            r_format: Regex::new(r"^([a-z]+) x(\d{1,2}), x(\d{1,2}), x(\d{1,2})$").unwrap(),
            i_format: Regex::new(r"^([a-z]+) x(\d{1,2}), x(\d{1,2}), (-?\d+)$").unwrap(),
            offset_format: Regex::new(r"^([a-z]+) x(\d{1,2}), (-?\d+)\(x(\d{1,2})\)$").unwrap(),
            u_format: Regex::new(r"^([a-z]+) x(\d{1,2}), (-?\d+)$").unwrap(),
        }
    }

    /// Encodes a whole program, one instruction per line. Blank lines are
    /// skipped.
    pub fn assemble(&self, source: &str) -> Result<Vec<Word>, SimError> {
        source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| self.assemble_line(line))
            .collect()
    }

    /// Encodes a single instruction line.
    pub fn assemble_line(&self, line: &str) -> Result<Word, SimError> {
        let line = line.trim();
        if let Some(caps) = self.r_format.captures(line) {
            let name = &caps[1];
            let rd = parse_register(&caps[2])?;
            let rs1 = parse_register(&caps[3])?;
            let rs2 = parse_register(&caps[4])?;
            let (f3, f7) = r_fields(name)
                .ok_or_else(|| SimError::Parse(format!("unsupported R-type instruction: {line}")))?;
            return Ok(encode_r(rd, f3, rs1, rs2, f7));
        }
        if let Some(caps) = self.i_format.captures(line) {
            let name = &caps[1];
            let ra = parse_register(&caps[2])?;
            let rb = parse_register(&caps[3])?;
            let imm = parse_immediate(&caps[4], 12)?;
            if let Some((opcode, f3)) = i_fields(name) {
                // op rD, rS1, imm
                return Ok(encode_i(opcode, ra, f3, rb, imm));
            }
            if let Some(f3) = branch_fields(name) {
                // op rS1, rS2, offset
                return Ok(encode_s(opcodes::BRANCH, f3, ra, rb, imm));
            }
            return Err(SimError::Parse(format!(
                "unsupported instruction: {line}"
            )));
        }
        if let Some(caps) = self.offset_format.captures(line) {
            let name = &caps[1];
            let ra = parse_register(&caps[2])?;
            let imm = parse_immediate(&caps[3], 12)?;
            let rb = parse_register(&caps[4])?;
            return match name {
                "lw" => Ok(encode_i(opcodes::LOAD, ra, funct3::LW, rb, imm)),
                "jalr" => Ok(encode_i(opcodes::JALR, ra, funct3::JALR, rb, imm)),
                "sw" => Ok(encode_s(opcodes::STORE, funct3::SW, rb, ra, imm)),
                _ => Err(SimError::Parse(format!(
                    "unsupported load/store instruction: {line}"
                ))),
            };
        }
        if let Some(caps) = self.u_format.captures(line) {
            let name = &caps[1];
            let rd = parse_register(&caps[2])?;
            return match name {
                "jal" => {
                    let imm = parse_immediate(&caps[3], 20)?;
                    Ok(encode_u(opcodes::JAL, rd, imm))
                }
                "lui" => {
                    let imm = parse_immediate(&caps[3], 20)?;
                    Ok(encode_u(opcodes::LUI, rd, imm))
                }
                _ => Err(SimError::Parse(format!(
                    "unsupported instruction: {line}"
                ))),
            };
        }
        Err(SimError::Parse(line.to_string()))
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_register(text: &str) -> Result<u32, SimError> {
    let num: u32 = text
        .parse()
        .map_err(|_| SimError::Parse(format!("invalid register number: {text}")))?;
    if num >= 32 {
        return Err(SimError::Parse(format!("invalid register number: {num}")));
    }
    Ok(num)
}

/// Parses a decimal immediate and checks it fits in `bits` as a signed
/// two's-complement value.
fn parse_immediate(text: &str, bits: u32) -> Result<u32, SimError> {
    let value: i64 = text
        .parse()
        .map_err(|_| SimError::Parse(format!("invalid immediate: {text}")))?;
    let limit = 1i64 << (bits - 1);
    if value < -limit || value >= limit {
        return Err(SimError::Parse(format!(
            "immediate {value} does not fit in {bits} bits"
        )));
    }
    Ok((value as u32) & ((1u32 << bits) - 1))
}

fn r_fields(name: &str) -> Option<(u32, u32)> {
    match name {
        "add" => Some((funct3::ADD_SUB, funct7::BASE)),
        "sub" => Some((funct3::ADD_SUB, funct7::SUB)),
        "sll" => Some((funct3::SLL, funct7::BASE)),
        "srl" => Some((funct3::SRL, funct7::BASE)),
        "or" => Some((funct3::OR, funct7::BASE)),
        "and" => Some((funct3::AND, funct7::BASE)),
        _ => None,
    }
}

fn i_fields(name: &str) -> Option<(u32, u32)> {
    match name {
        "addi" => Some((opcodes::OP_IMM, funct3::ADD_SUB)),
        "andi" => Some((opcodes::OP_IMM, funct3::AND)),
        "ori" => Some((opcodes::OP_IMM, funct3::OR)),
        "slli" => Some((opcodes::OP_IMM, funct3::SLL)),
        "srli" => Some((opcodes::OP_IMM, funct3::SRL)),
        "lw" => Some((opcodes::LOAD, funct3::LW)),
        "jalr" => Some((opcodes::JALR, funct3::JALR)),
        _ => None,
    }
}

fn branch_fields(name: &str) -> Option<u32> {
    match name {
        "beq" => Some(funct3::BEQ),
        "bne" => Some(funct3::BNE),
        "blt" => Some(funct3::BLT),
        "bge" => Some(funct3::BGE),
        _ => None,
    }
}

fn encode_r(rd: u32, f3: u32, rs1: u32, rs2: u32, f7: u32) -> Word {
    let mut inst = opcodes::OP;
    inst = place_bits(inst, 7, 11, rd);
    inst = place_bits(inst, 12, 14, f3);
    inst = place_bits(inst, 15, 19, rs1);
    inst = place_bits(inst, 20, 24, rs2);
    inst = place_bits(inst, 25, 31, f7);
    Word::from_u32(inst)
}

fn encode_i(opcode: u32, rd: u32, f3: u32, rs1: u32, imm12: u32) -> Word {
    let mut inst = opcode;
    inst = place_bits(inst, 7, 11, rd);
    inst = place_bits(inst, 12, 14, f3);
    inst = place_bits(inst, 15, 19, rs1);
    inst = place_bits(inst, 20, 31, imm12);
    Word::from_u32(inst)
}

fn encode_s(opcode: u32, f3: u32, rs1: u32, rs2: u32, imm12: u32) -> Word {
    let mut inst = opcode;
    inst = place_bits(inst, 7, 11, imm12 & 0x1f);
    inst = place_bits(inst, 12, 14, f3);
    inst = place_bits(inst, 15, 19, rs1);
    inst = place_bits(inst, 20, 24, rs2);
    inst = place_bits(inst, 25, 31, imm12 >> 5);
    Word::from_u32(inst)
}

fn encode_u(opcode: u32, rd: u32, imm20: u32) -> Word {
    let mut inst = opcode;
    inst = place_bits(inst, 7, 11, rd);
    inst = place_bits(inst, 12, 31, imm20);
    Word::from_u32(inst)
}
