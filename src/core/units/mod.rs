//! The functional units of the datapath.
//!
//! Everything here except the data memory is combinational: a unit
//! recomputes its outputs from its current inputs whenever any input
//! changes. The data memory is clocked and stepped by the processor.

pub mod alu;
pub mod control;
pub mod decode;
pub mod logic;
pub mod memory;
pub mod regfile;

pub use alu::{AluControl, AluOp, AluUnit, BranchAlu};
pub use control::ControlUnit;
pub use decode::{DecodeUnit, ImmediateGenerator};
pub use logic::{Adder, AndGate, Multiplexer, OrGate};
pub use memory::{DataMemoryUnit, InstructionMemoryUnit};
pub use regfile::RegisterFileUnit;
