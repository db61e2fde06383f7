//! The instruction set registry: a table of `(mnemonic -> {format, opcode,
//! funct3, funct7, encode, execute})` entries. A tabular registry is
//! cleaner and equally expressive as one subclass per instruction.

use std::collections::HashMap;

use crate::bits::{extract, place};
use crate::constants::*;
use crate::error::SimulationFault;

pub mod exec;
mod table;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    R,
    I,
    S,
    B,
    U,
    J,
    R4,
    /// `ecall`/`ebreak`: an I-type encoding whose only operand is the full
    /// 12-bit immediate, used directly (unshifted) as the dispatch key
    /// since both share opcode, funct3 and the top 7 immediate bits.
    Sys,
}

/// `SYSTEM` major opcode (`ecall`/`ebreak`) — needs special dispatch
/// handling since its two instructions are otherwise indistinguishable by
/// the generic funct7/rs2 scheme below.
const SYSTEM_OPCODE: u32 = 0b111_0011;

/// Register and immediate operands of one instruction, in the same shape
/// regardless of format — unused fields are simply ignored by a given
/// format's encoder/decoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Operands {
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub rs3: u8,
    pub imm: i32,
}

/// Execution context an executor function operates against: the two
/// register files, memory (with its embedded cache), and the current PC.
/// Mutation goes through the register files' own `write`, which already
/// knows how to report the prior value for history, and through `Memory`'s
/// checked accessors.
pub struct ExecContext<'a> {
    pub pc: u32,
    pub next_pc: u32,
    pub int_regs: &'a mut crate::register::IntRegisters,
    pub float_regs: &'a mut crate::register::FloatRegisters,
    pub memory: &'a mut crate::memory::Memory,
    pub heap_ptr: &'a mut u32,
    pub syscalls: &'a mut dyn crate::syscall::SyscallHandler,
}

pub type ExecuteFn = fn(&mut ExecContext, Operands) -> Result<(), SimulationFault>;

#[derive(Clone, Copy)]
pub struct InstructionDef {
    pub mnemonic: &'static str,
    pub format: Format,
    pub opcode: u32,
    pub funct3: Option<u32>,
    pub funct7: Option<u32>,
    /// Some OP-FP mnemonics (the `fcvt`/`fmv`/`fclass`/`fsqrt` family) use
    /// the `rs2` field as a fixed selector rather than a register operand.
    /// When set, the dispatch key folds it together with `funct7` instead
    /// of using `funct7` alone.
    pub rs2_fixed: Option<u32>,
    pub execute: ExecuteFn,
}

impl std::fmt::Debug for InstructionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("InstructionDef")
            .field("mnemonic", &self.mnemonic)
            .field("format", &self.format)
            .field("opcode", &self.opcode)
            .finish()
    }
}

impl InstructionDef {
    /// Encodes `operands` into a 32-bit machine word per this instruction's
    /// format. Immediates are expected to already be fully resolved (any
    /// relocation has been applied by the linker before this is called).
    pub fn encode(&self, operands: Operands) -> u32 {
        let mut word = place(self.opcode, OPCODE_OFFSET, OPCODE_WIDTH);
        match self.format {
            Format::R => {
                word |= place(operands.rd as u32, RD_OFFSET, REG_FIELD_WIDTH);
                word |= place(self.funct3.unwrap_or(0), FUNCT3_OFFSET, FUNCT3_WIDTH);
                word |= place(operands.rs1 as u32, RS1_OFFSET, REG_FIELD_WIDTH);
                word |= place(operands.rs2 as u32, RS2_OFFSET, REG_FIELD_WIDTH);
                word |= place(self.funct7.unwrap_or(0), FUNCT7_OFFSET, FUNCT7_WIDTH);
            }
            Format::R4 => {
                word |= place(operands.rd as u32, RD_OFFSET, REG_FIELD_WIDTH);
                word |= place(self.funct3.unwrap_or(0), FUNCT3_OFFSET, FUNCT3_WIDTH);
                word |= place(operands.rs1 as u32, RS1_OFFSET, REG_FIELD_WIDTH);
                word |= place(operands.rs2 as u32, RS2_OFFSET, REG_FIELD_WIDTH);
                word |= place(0, 25, 2); // fmt = single precision
                word |= place(operands.rs3 as u32, RS3_OFFSET, REG_FIELD_WIDTH);
            }
            Format::I => {
                word |= place(operands.rd as u32, RD_OFFSET, REG_FIELD_WIDTH);
                word |= place(self.funct3.unwrap_or(0), FUNCT3_OFFSET, FUNCT3_WIDTH);
                word |= place(operands.rs1 as u32, RS1_OFFSET, REG_FIELD_WIDTH);
                word |= place(operands.imm as u32, 20, 12);
            }
            Format::S => {
                let imm = operands.imm as u32;
                word |= place(extract(imm, 0, 5), 7, 5);
                word |= place(self.funct3.unwrap_or(0), FUNCT3_OFFSET, FUNCT3_WIDTH);
                word |= place(operands.rs1 as u32, RS1_OFFSET, REG_FIELD_WIDTH);
                word |= place(operands.rs2 as u32, RS2_OFFSET, REG_FIELD_WIDTH);
                word |= place(extract(imm, 5, 7), 25, 7);
            }
            Format::B => {
                let imm = operands.imm as u32;
                word |= place(extract(imm, 11, 1), 7, 1);
                word |= place(extract(imm, 1, 4), 8, 4);
                word |= place(self.funct3.unwrap_or(0), FUNCT3_OFFSET, FUNCT3_WIDTH);
                word |= place(operands.rs1 as u32, RS1_OFFSET, REG_FIELD_WIDTH);
                word |= place(operands.rs2 as u32, RS2_OFFSET, REG_FIELD_WIDTH);
                word |= place(extract(imm, 5, 6), 25, 6);
                word |= place(extract(imm, 12, 1), 31, 1);
            }
            Format::U => {
                word |= place(operands.rd as u32, RD_OFFSET, REG_FIELD_WIDTH);
                word |= place(operands.imm as u32, 12, 20);
            }
            Format::Sys => {
                word |= place(self.funct3.unwrap_or(0), FUNCT3_OFFSET, FUNCT3_WIDTH);
                word |= place(operands.imm as u32, 20, 12);
            }
            Format::J => {
                word |= place(operands.rd as u32, RD_OFFSET, REG_FIELD_WIDTH);
                let imm = operands.imm as u32;
                word |= place(extract(imm, 12, 8), 12, 8);
                word |= place(extract(imm, 11, 1), 20, 1);
                word |= place(extract(imm, 1, 10), 21, 10);
                word |= place(extract(imm, 20, 1), 31, 1);
            }
        }
        word
    }

    /// Decodes the operand fields of `word` according to this instruction's
    /// format (the caller has already identified the instruction via
    /// [`Registry::decode`]).
    pub fn decode_operands(&self, word: u32) -> Operands {
        match self.format {
            Format::R => Operands {
                rd: extract(word, RD_OFFSET, REG_FIELD_WIDTH) as u8,
                rs1: extract(word, RS1_OFFSET, REG_FIELD_WIDTH) as u8,
                rs2: extract(word, RS2_OFFSET, REG_FIELD_WIDTH) as u8,
                ..Default::default()
            },
            Format::R4 => Operands {
                rd: extract(word, RD_OFFSET, REG_FIELD_WIDTH) as u8,
                rs1: extract(word, RS1_OFFSET, REG_FIELD_WIDTH) as u8,
                rs2: extract(word, RS2_OFFSET, REG_FIELD_WIDTH) as u8,
                rs3: extract(word, RS3_OFFSET, REG_FIELD_WIDTH) as u8,
                ..Default::default()
            },
            Format::I => Operands {
                rd: extract(word, RD_OFFSET, REG_FIELD_WIDTH) as u8,
                rs1: extract(word, RS1_OFFSET, REG_FIELD_WIDTH) as u8,
                imm: crate::bits::sign_extend(extract(word, 20, 12), 12),
                ..Default::default()
            },
            Format::S => {
                let imm = extract(word, 7, 5) | (extract(word, 25, 7) << 5);
                Operands {
                    rs1: extract(word, RS1_OFFSET, REG_FIELD_WIDTH) as u8,
                    rs2: extract(word, RS2_OFFSET, REG_FIELD_WIDTH) as u8,
                    imm: crate::bits::sign_extend(imm, 12),
                    ..Default::default()
                }
            }
            Format::B => {
                let imm = (extract(word, 8, 4) << 1)
                    | (extract(word, 25, 6) << 5)
                    | (extract(word, 7, 1) << 11)
                    | (extract(word, 31, 1) << 12);
                Operands {
                    rs1: extract(word, RS1_OFFSET, REG_FIELD_WIDTH) as u8,
                    rs2: extract(word, RS2_OFFSET, REG_FIELD_WIDTH) as u8,
                    imm: crate::bits::sign_extend(imm, 13),
                    ..Default::default()
                }
            }
            Format::U => Operands {
                rd: extract(word, RD_OFFSET, REG_FIELD_WIDTH) as u8,
                imm: (extract(word, 12, 20) << 12) as i32,
                ..Default::default()
            },
            Format::Sys => Operands {
                imm: extract(word, 20, 12) as i32,
                ..Default::default()
            },
            Format::J => {
                let imm = (extract(word, 21, 10) << 1)
                    | (extract(word, 20, 1) << 11)
                    | (extract(word, 12, 8) << 12)
                    | (extract(word, 31, 1) << 20);
                Operands {
                    rd: extract(word, RD_OFFSET, REG_FIELD_WIDTH) as u8,
                    imm: crate::bits::sign_extend(imm, 21),
                    ..Default::default()
                }
            }
        }
    }
}

/// A dispatch key used to find an instruction from a raw word: opcode is
/// always present; `funct3`/`disambiguator` are populated only when the
/// format actually carries a stable field there (see module docs in
/// `table.rs` for which formats register which key shape).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct DispatchKey {
    opcode: u32,
    funct3: Option<u32>,
    disambiguator: Option<u32>,
}

pub struct Registry {
    by_mnemonic: HashMap<&'static str, InstructionDef>,
    by_encoding: HashMap<DispatchKey, &'static str>,
}

impl Registry {
    fn new() -> Self {
        Registry {
            by_mnemonic: HashMap::new(),
            by_encoding: HashMap::new(),
        }
    }

    fn register(&mut self, def: InstructionDef) {
        let disambiguator = if def.opcode == SYSTEM_OPCODE {
            // `funct7` is repurposed to carry the full 12-bit immediate
            // (0 for ecall, 1 for ebreak) — see `decode`.
            def.funct7
        } else if let Some(rs2) = def.rs2_fixed {
            Some((def.funct7.unwrap_or(0) << 5) | rs2)
        } else {
            match def.format {
                Format::R | Format::R4 => def.funct7,
                Format::I if def.funct7.is_some() => def.funct7,
                _ => None,
            }
        };
        let key = DispatchKey {
            opcode: def.opcode,
            funct3: def.funct3,
            disambiguator,
        };
        self.by_encoding.insert(key, def.mnemonic);
        self.by_mnemonic.insert(def.mnemonic, def);
    }

    pub fn lookup(&self, mnemonic: &str) -> Option<&InstructionDef> {
        self.by_mnemonic.get(mnemonic)
    }

    /// Identifies the instruction a raw word encodes by trying every
    /// dispatch key shape a registered instruction might have used, from
    /// most to least specific. Only one shape ever actually matches a
    /// given opcode family; trying the rest costs a missed hashmap lookup
    /// each, which is cheap. See `table.rs` for why each shape exists:
    /// the `rs2`-folded-into-`funct7` ("combined") shape disambiguates the
    /// `fcvt`/`fmv`/`fclass`/`fsqrt` family that share `(opcode, funct3,
    /// funct7)`; the full-immediate shape exists only for `ecall`/`ebreak`.
    pub fn decode(&self, word: u32) -> Option<&InstructionDef> {
        let opcode = extract(word, OPCODE_OFFSET, OPCODE_WIDTH);
        let funct3 = extract(word, FUNCT3_OFFSET, FUNCT3_WIDTH);
        let funct7 = extract(word, FUNCT7_OFFSET, FUNCT7_WIDTH);
        let rs2 = extract(word, RS2_OFFSET, REG_FIELD_WIDTH);
        let combined = (funct7 << 5) | rs2;

        let mut disambiguators = vec![Some(combined), Some(funct7), None];
        if opcode == SYSTEM_OPCODE {
            let full_imm = extract(word, 20, 12);
            disambiguators.insert(0, Some(full_imm));
        }

        for funct3_candidate in [Some(funct3), None] {
            for disambiguator in disambiguators.iter().copied() {
                let key = DispatchKey {
                    opcode,
                    funct3: funct3_candidate,
                    disambiguator,
                };
                if let Some(mnemonic) = self.by_encoding.get(&key) {
                    return self.by_mnemonic.get(mnemonic);
                }
            }
        }
        None
    }

    pub fn mnemonics(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_mnemonic.keys().copied()
    }
}

pub fn new_standard_registry() -> Registry {
    let mut registry = Registry::new();
    table::populate(&mut registry);
    registry
}
