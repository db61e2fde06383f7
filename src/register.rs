//! Integer and floating-point register files.
//!
//! A register is one 32-bit slot with three views of the same bits: signed,
//! unsigned, and float. `f32::from_bits`/`to_bits` plus an `as` cast gets the
//! same one-slot-three-views representation a `union { i: i32, u: u32, f:
//! f32 }` would, without `unsafe`.

use crate::constants::REGISTER_COUNT;

/// One 32-bit register slot, viewable as signed, unsigned or float bits.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Register(u32);

impl Register {
    pub fn from_u32(bits: u32) -> Self {
        Register(bits)
    }

    pub fn from_i32(value: i32) -> Self {
        Register(value as u32)
    }

    pub fn from_f32(value: f32) -> Self {
        Register(value.to_bits())
    }

    pub fn u(self) -> u32 {
        self.0
    }

    pub fn i(self) -> i32 {
        self.0 as i32
    }

    pub fn f(self) -> f32 {
        f32::from_bits(self.0)
    }
}

/// The 32-slot integer register file. `x0` is hardwired to zero: writes are
/// silently discarded, reads always observe 0.
#[derive(Clone, Debug)]
pub struct IntRegisters {
    slots: [Register; REGISTER_COUNT],
}

impl Default for IntRegisters {
    fn default() -> Self {
        IntRegisters {
            slots: [Register::default(); REGISTER_COUNT],
        }
    }
}

impl IntRegisters {
    pub fn read(&self, index: usize) -> Register {
        if index == 0 {
            Register::default()
        } else {
            self.slots[index]
        }
    }

    /// Writes `value` to `index`, returning the prior value for history
    /// capture, or `None` if the write to `x0` was discarded (no change).
    pub fn write(&mut self, index: usize, value: Register) -> Option<Register> {
        if index == 0 {
            return None;
        }
        let prior = self.slots[index];
        self.slots[index] = value;
        if prior == value {
            None
        } else {
            Some(prior)
        }
    }

    /// Writes `value` unconditionally, bypassing change tracking. Used by
    /// history restore and by `reset`.
    pub fn restore(&mut self, index: usize, value: Register) {
        if index != 0 {
            self.slots[index] = value;
        }
    }

    /// A full copy of the register slots, for before/after diffing across a
    /// step (`Register` is `Copy`, so this is just an array copy).
    pub fn snapshot(&self) -> [Register; REGISTER_COUNT] {
        self.slots
    }
}

/// The 32-slot floating-point register file. Unlike the integer file, `f0`
/// is an ordinary register.
#[derive(Clone, Debug, Default)]
pub struct FloatRegisters {
    slots: [Register; REGISTER_COUNT],
}

impl FloatRegisters {
    pub fn read(&self, index: usize) -> Register {
        self.slots[index]
    }

    pub fn write(&mut self, index: usize, value: Register) -> Option<Register> {
        let prior = self.slots[index];
        self.slots[index] = value;
        if prior == value {
            None
        } else {
            Some(prior)
        }
    }

    pub fn restore(&mut self, index: usize, value: Register) {
        self.slots[index] = value;
    }

    pub fn snapshot(&self) -> [Register; REGISTER_COUNT] {
        self.slots
    }
}

/// Identifies which register file a history entry's change belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterFile {
    Integer,
    Float,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn x0_is_hardwired() {
        let mut regs = IntRegisters::default();
        assert_eq!(regs.write(0, Register::from_i32(42)), None);
        assert_eq!(regs.read(0).i(), 0);
    }

    #[test]
    fn write_reports_prior_value() {
        let mut regs = IntRegisters::default();
        regs.write(1, Register::from_i32(5));
        let prior = regs.write(1, Register::from_i32(9));
        assert_eq!(prior, Some(Register::from_i32(5)));
        assert_eq!(regs.read(1).i(), 9);
    }

    #[test]
    fn float_bit_pattern_round_trips() {
        let mut regs = FloatRegisters::default();
        regs.write(3, Register::from_f32(1.5));
        assert_eq!(regs.read(3).f(), 1.5);
    }
}
