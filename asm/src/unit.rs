//! The assembler's intermediate representation: what a single source file
//! reduces to after parsing and pseudo-instruction expansion, before the
//! linker assigns addresses. Symbol bookkeeping and per-line source
//! provenance live in one unit together, since producing good diagnostics
//! later needs both at once.

use std::collections::{HashMap, HashSet};

use jupiter_core::isa::Operands;

/// Which reserved segment a statement or symbol belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    Text,
    Rodata,
    Data,
    Bss,
}

/// A symbol defined in this unit: a label (in whichever segment was active
/// when it was written) or an `.equ` constant (segment-less).
#[derive(Clone, Debug, PartialEq)]
pub enum Symbol {
    Label { segment: Segment, offset: u32 },
    Constant(i64),
}

/// Where a statement came from, for diagnostics emitted after linking (a
/// relocation that can't be resolved, say) that must still point at source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugInfo {
    pub file: String,
    pub line: usize,
}

/// How an instruction's immediate depends on a symbol's final address.
/// `PcrelLo12`'s `Relocation::symbol` names the label marking the paired
/// `PcrelHi20` site rather than the final target (the %pcrel_lo convention:
/// the low half is computed relative to whatever high-half instruction the
/// assembly references, not its own address) — real
/// RISC-V assemblers resolve this the same way, through a local label at
/// the `auipc` site, so the linker need only remember the delta it used
/// to resolve that site's `PcrelHi20` and reapply it here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelocationKind {
    Hi20,
    Lo12,
    PcrelHi20,
    PcrelLo12,
    /// `jal`/`beq`-family operand: (target - site) sign-extended into the
    /// format's immediate field.
    Pcrel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relocation {
    pub kind: RelocationKind,
    pub symbol: String,
}

/// One not-yet-addressed instruction: a mnemonic plus operands whose `imm`
/// is either already final (a literal) or a placeholder overwritten once
/// `relocation` is resolved.
#[derive(Clone, Debug)]
pub struct RawStatement {
    pub mnemonic: &'static str,
    pub operands: Operands,
    pub relocation: Option<Relocation>,
    pub debug: DebugInfo,
}

/// The result of assembling one source file: three data segments in
/// already-serialized byte form, a bss length (zero-filled, so no bytes to
/// carry), the instruction stream still in symbolic form, and this unit's
/// own symbol table.
#[derive(Clone, Debug, Default)]
pub struct TranslationUnit {
    pub file: String,
    pub statements: Vec<RawStatement>,
    pub rodata: Vec<u8>,
    pub data: Vec<u8>,
    pub bss_len: u32,
    pub local_symbols: HashMap<String, Symbol>,
    pub globals: HashSet<String>,
}

impl TranslationUnit {
    pub fn new(file: impl Into<String>) -> Self {
        TranslationUnit {
            file: file.into(),
            ..Default::default()
        }
    }

    pub fn define_label(&mut self, name: String, segment: Segment, offset: u32) {
        self.local_symbols
            .insert(name, Symbol::Label { segment, offset });
    }

    pub fn define_constant(&mut self, name: String, value: i64) {
        self.local_symbols.insert(name, Symbol::Constant(value));
    }

    pub fn mark_global(&mut self, name: String) {
        self.globals.insert(name);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn records_labels_and_constants() {
        let mut unit = TranslationUnit::new("a.s");
        unit.define_label("loop".to_string(), Segment::Text, 4);
        unit.define_constant("STACK".to_string(), 0x1000);
        unit.mark_global("loop".to_string());

        assert_eq!(
            unit.local_symbols.get("loop"),
            Some(&Symbol::Label {
                segment: Segment::Text,
                offset: 4
            })
        );
        assert_eq!(
            unit.local_symbols.get("STACK"),
            Some(&Symbol::Constant(0x1000))
        );
        assert!(unit.globals.contains("loop"));
    }
}
