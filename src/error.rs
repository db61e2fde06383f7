//! Faults raised during simulation. Distinguished from assembler/linker
//! diagnostics (see `jupiter-asm`/`jupiter-link`) because a fault is
//! expected, recoverable control flow handed back to the host — never
//! unwound as a Rust `Result` out of the driver's `step`/`run` loop.

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SimulationFault {
    #[error("breakpoint hit at {0:#010x}")]
    Breakpoint(u32),

    #[error("program exited with code {0}")]
    Halt(i32),

    #[error("invalid read access to {addr:#010x}")]
    InvalidRead { addr: u32 },

    #[error("invalid write access to {addr:#010x}")]
    InvalidWrite { addr: u32 },

    #[error("misaligned access to {addr:#010x} (requires {alignment}-byte alignment)")]
    Misaligned { addr: u32, alignment: u32 },

    #[error("illegal instruction {0:#010x}")]
    IllegalInstruction(u32),
}

impl SimulationFault {
    pub fn invalid_address(addr: u32, read: bool) -> Self {
        if read {
            SimulationFault::InvalidRead { addr }
        } else {
            SimulationFault::InvalidWrite { addr }
        }
    }
}
