//! Core RV32IMF assembler/linker target: register files, memory, cache,
//! instruction registry, reversible history and the simulation driver.
//!
//! This is the part of the toolchain that executes a linked program. It
//! knows nothing about source text — `jupiter-asm` and `jupiter-link`
//! produce the [`memory::Memory`] image and initial register values this
//! crate drives.

pub mod bits;
pub mod cache;
pub mod constants;
pub mod driver;
pub mod error;
pub mod history;
pub mod isa;
pub mod memory;
pub mod register;
pub mod sink;
pub mod syscall;

pub use driver::{Driver, StepOutcome};
pub use error::SimulationFault;
