//! Error types for construction, memory access and assembly.

use thiserror::Error;

/// Errors surfaced by the simulator.
///
/// Configuration errors are fatal and raised at construction. Alignment and
/// bounds errors are raised at the offending call and reported upward by the
/// interactive wrapper. Parse errors carry the offending source line.
/// Timed-memory state-machine violations are `debug_assert!`s rather than
/// values of this type.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("misaligned address {addr:#x} for a {nwords}-word access")]
    Misaligned { addr: u32, nwords: usize },

    #[error("address {addr:#x} is outside the {space}-byte address space")]
    OutOfBounds { addr: u32, space: usize },

    #[error("a {nwords}-word access does not divide the {line}-word cache line")]
    SubblockMismatch { nwords: usize, line: usize },

    #[error("unable to parse: {0}")]
    Parse(String),
}
