//! Register files.
//!
//! Indexed arrays of 32 words, parameterised by kind. The integer file
//! enforces the architectural invariant that x0 is hardwired to zero:
//! writes to index 0 are discarded and reads always return 0. The
//! floating-point file exists only as a container; no execution unit
//! targets it.

use super::data::Word;

/// Number of architectural registers per file.
pub const REGISTER_COUNT: usize = 32;

/// Which architectural register file a [`RegisterFile`] models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterKind {
    Integer,
    FloatingPoint,
}

/// A file of 32 word-sized registers.
pub struct RegisterFile {
    kind: RegisterKind,
    regs: [Word; REGISTER_COUNT],
}

impl RegisterFile {
    /// Creates a zero-initialised register file of the given kind.
    pub fn new(kind: RegisterKind) -> Self {
        Self {
            kind,
            regs: [Word::ZERO; REGISTER_COUNT],
        }
    }

    /// Reads a register. Integer x0 always reads as zero.
    pub fn read(&self, idx: usize) -> Word {
        assert!(idx < REGISTER_COUNT, "register index {idx} out of range");
        if self.kind == RegisterKind::Integer && idx == 0 {
            Word::ZERO
        } else {
            self.regs[idx]
        }
    }

    /// Writes a register. Writes to integer x0 are silently discarded.
    pub fn write(&mut self, idx: usize, val: Word) {
        assert!(idx < REGISTER_COUNT, "register index {idx} out of range");
        if self.kind == RegisterKind::Integer && idx == 0 {
            return;
        }
        self.regs[idx] = val;
    }

    /// Dumps the register contents to stdout, two per line.
    pub fn dump(&self) {
        let prefix = match self.kind {
            RegisterKind::Integer => 'x',
            RegisterKind::FloatingPoint => 'f',
        };
        for i in (0..REGISTER_COUNT).step_by(2) {
            println!(
                "{prefix}{:<2}={:#010x} {prefix}{:<2}={:#010x}",
                i,
                self.read(i).to_u32(),
                i + 1,
                self.read(i + 1).to_u32()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_start_at_zero() {
        let regs = RegisterFile::new(RegisterKind::Integer);
        for i in 0..REGISTER_COUNT {
            assert_eq!(regs.read(i).to_u32(), 0);
        }
    }

    #[test]
    fn write_then_read() {
        let mut regs = RegisterFile::new(RegisterKind::Integer);
        regs.write(10, Word::from_u32(0xFACADE));
        assert_eq!(regs.read(10).to_u32(), 0xFACADE);
    }

    #[test]
    fn x0_discards_writes() {
        let mut regs = RegisterFile::new(RegisterKind::Integer);
        regs.write(0, Word::from_u32(0xFACADE));
        assert_eq!(regs.read(0).to_u32(), 0);
    }

    #[test]
    fn float_file_keeps_index_zero() {
        let mut regs = RegisterFile::new(RegisterKind::FloatingPoint);
        regs.write(0, Word::from_f32(3.2));
        assert_eq!(regs.read(0).to_f32(), 3.2);
    }

    #[test]
    #[should_panic]
    fn out_of_range_index_panics() {
        let regs = RegisterFile::new(RegisterKind::Integer);
        let _ = regs.read(32);
    }
}
