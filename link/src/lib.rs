//! The linker: turns a list of [`jupiter_asm::TranslationUnit`]s into one
//! loadable [`jupiter_core::memory::Memory`] image with a resolved entry
//! point. Lays out the static segments first (rodata, then bss, then data,
//! each word-aligned between units), then text with two reserved bootstrap
//! slots, merges every unit's exported symbols into one global table, and
//! finally builds every instruction word at its real address by resolving
//! relocations against that table.
//!
//! Writes the built image into memory once, via `Memory::store_word`, at
//! link time — never touched again once the driver starts running.

pub mod error;

use std::collections::HashMap;

pub use error::LinkError;

use jupiter_asm::unit::{RelocationKind, Segment, TranslationUnit};
use jupiter_core::bits::{align_up, hi20_lo12_split, sign_extend};
use jupiter_core::cache::CacheConfig;
use jupiter_core::constants::{
    BOOTSTRAP_SLOTS, DEFAULT_ENTRY_SYMBOL, INSTRUCTION_SIZE, STATIC_BEGIN, TEXT_BEGIN, TEXT_END,
};
use jupiter_core::isa::{new_standard_registry, Format, Operands};
use jupiter_core::memory::{Memory, Segments};

#[derive(Clone, Debug)]
pub struct LinkOptions {
    pub entry_symbol: String,
    pub cache_config: CacheConfig,
}

impl Default for LinkOptions {
    fn default() -> Self {
        LinkOptions {
            entry_symbol: DEFAULT_ENTRY_SYMBOL.to_string(),
            cache_config: CacheConfig::default(),
        }
    }
}

/// A fully laid out and loaded program, ready to hand to
/// [`jupiter_core::Driver::new`].
pub struct LinkedImage {
    pub memory: Memory,
    pub entry_pc: u32,
    pub heap_base: u32,
    pub segments: Segments,
    /// Every symbol exported with `.globl`, resolved to its final absolute
    /// address — kept around for `jupiter-dump`/callers that want to label
    /// addresses in diagnostics rather than for anything the driver itself
    /// needs.
    pub globals: HashMap<String, u32>,
    /// Each input unit's text-segment base address, in the same order the
    /// units were passed to [`link`] — `jupiter-dump` uses this to carve the
    /// merged text segment back into one block per source file.
    pub text_bases: Vec<u32>,
}

#[derive(Clone, Copy, Default)]
struct UnitBases {
    rodata: u32,
    bss: u32,
    data: u32,
    text: u32,
}

fn resolve_label(unit: &TranslationUnit, bases: &UnitBases, name: &str) -> Option<u32> {
    use jupiter_asm::unit::Symbol;
    match unit.local_symbols.get(name)? {
        Symbol::Label { segment, offset } => {
            let base = match segment {
                Segment::Text => bases.text,
                Segment::Rodata => bases.rodata,
                Segment::Data => bases.data,
                Segment::Bss => bases.bss,
            };
            Some(base.wrapping_add(*offset))
        }
        Symbol::Constant(value) => Some(*value as u32),
    }
}

fn fits_signed(value: i32, bits: u32) -> bool {
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    let value = value as i64;
    value >= min && value <= max
}

/// Lays out every unit's static segments and text in the required order,
/// returning each unit's per-segment base address.
fn place_units(units: &[TranslationUnit]) -> (Vec<UnitBases>, Segments, u32) {
    let mut bases = vec![UnitBases::default(); units.len()];

    let mut cursor = STATIC_BEGIN;
    let rodata_begin = cursor;
    for (unit, base) in units.iter().zip(bases.iter_mut()) {
        base.rodata = cursor;
        cursor += unit.rodata.len() as u32;
        cursor = align_up(cursor, 4);
    }
    let rodata_end = cursor;

    for (unit, base) in units.iter().zip(bases.iter_mut()) {
        base.bss = cursor;
        cursor += unit.bss_len;
        cursor = align_up(cursor, 4);
    }

    for (unit, base) in units.iter().zip(bases.iter_mut()) {
        base.data = cursor;
        cursor += unit.data.len() as u32;
        cursor = align_up(cursor, 4);
    }
    let heap_base = cursor;

    let mut text_cursor = TEXT_BEGIN + BOOTSTRAP_SLOTS * INSTRUCTION_SIZE;
    for (unit, base) in units.iter().zip(bases.iter_mut()) {
        base.text = text_cursor;
        text_cursor += unit.statements.len() as u32 * INSTRUCTION_SIZE;
    }

    let segments = Segments {
        text_begin: TEXT_BEGIN,
        text_end: text_cursor,
        rodata_begin,
        rodata_end,
        heap_base,
    };
    (bases, segments, text_cursor)
}

/// Links `units` (already assembled, in the order they should be laid out)
/// into one loadable image. Every problem found is returned together rather
/// than stopping at the first.
pub fn link(units: &[TranslationUnit], options: &LinkOptions) -> Result<LinkedImage, Vec<LinkError>> {
    let mut errors = Vec::new();
    let (bases, segments, text_cursor) = place_units(units);

    if text_cursor > TEXT_END {
        errors.push(LinkError::ProgramTooLarge {
            needed: text_cursor - TEXT_BEGIN,
            available: TEXT_END - TEXT_BEGIN,
        });
    }

    let locals: Vec<HashMap<String, u32>> = units
        .iter()
        .zip(&bases)
        .map(|(unit, base)| {
            unit.local_symbols
                .keys()
                .filter_map(|name| resolve_label(unit, base, name).map(|addr| (name.clone(), addr)))
                .collect()
        })
        .collect();

    let mut globals: HashMap<String, u32> = HashMap::new();
    for (unit, local) in units.iter().zip(&locals) {
        for name in &unit.globals {
            match local.get(name) {
                Some(&addr) => {
                    if globals.insert(name.clone(), addr).is_some() {
                        errors.push(LinkError::DuplicateGlobal { symbol: name.clone() });
                    }
                }
                None => errors.push(LinkError::UndefinedSymbol {
                    symbol: name.clone(),
                    file: unit.file.clone(),
                    line: 0,
                }),
            }
        }
    }

    let entry_addr = globals
        .get(&options.entry_symbol)
        .copied()
        .or_else(|| locals.iter().find_map(|local| local.get(&options.entry_symbol).copied()));

    match entry_addr {
        None => errors.push(LinkError::MissingEntry {
            symbol: options.entry_symbol.clone(),
        }),
        Some(addr) if !(addr >= TEXT_BEGIN && addr < text_cursor) => {
            errors.push(LinkError::EntryNotInText {
                symbol: options.entry_symbol.clone(),
            })
        }
        Some(_) => {}
    }

    let mut memory = match Memory::new(segments, options.cache_config) {
        Ok(memory) => memory,
        Err(err) => {
            errors.push(LinkError::InvalidCacheConfig(err.to_string()));
            return Err(errors);
        }
    };

    for (unit, base) in units.iter().zip(&bases) {
        for (i, byte) in unit.rodata.iter().enumerate() {
            memory.store_byte_privileged(base.rodata.wrapping_add(i as u32), *byte);
        }
        for (i, byte) in unit.data.iter().enumerate() {
            memory.store_byte_privileged(base.data.wrapping_add(i as u32), *byte);
        }
    }

    let registry = new_standard_registry();
    let mut pcrel_deltas: HashMap<u32, i32> = HashMap::new();

    let resolve = |unit_index: usize, name: &str| -> Option<u32> {
        locals[unit_index].get(name).copied().or_else(|| globals.get(name).copied())
    };

    for (unit_index, unit) in units.iter().enumerate() {
        for (i, stmt) in unit.statements.iter().enumerate() {
            let site_addr = bases[unit_index].text.wrapping_add(i as u32 * INSTRUCTION_SIZE);
            let mut operands = stmt.operands;

            if let Some(reloc) = &stmt.relocation {
                let resolved = match reloc.kind {
                    RelocationKind::Hi20 => resolve(unit_index, &reloc.symbol).map(|target| hi20_lo12_split(target).0 as i32),
                    RelocationKind::Lo12 => resolve(unit_index, &reloc.symbol)
                        .map(|target| sign_extend(hi20_lo12_split(target).1, 12)),
                    RelocationKind::PcrelHi20 => resolve(unit_index, &reloc.symbol).map(|target| {
                        let delta = target.wrapping_sub(site_addr) as i32;
                        pcrel_deltas.insert(site_addr, delta);
                        hi20_lo12_split(delta as u32).0 as i32
                    }),
                    RelocationKind::PcrelLo12 => resolve(unit_index, &reloc.symbol).and_then(|hi_site| {
                        pcrel_deltas
                            .get(&hi_site)
                            .map(|delta| sign_extend(hi20_lo12_split(*delta as u32).1, 12))
                    }),
                    RelocationKind::Pcrel => {
                        resolve(unit_index, &reloc.symbol).map(|target| target.wrapping_sub(site_addr) as i32)
                    }
                };
                match resolved {
                    Some(imm) => operands.imm = imm,
                    None => errors.push(LinkError::UndefinedSymbol {
                        symbol: reloc.symbol.clone(),
                        file: stmt.debug.file.clone(),
                        line: stmt.debug.line,
                    }),
                }
            }

            let def = registry
                .lookup(stmt.mnemonic)
                .expect("mnemonic was validated against the registry at parse time");

            if let Some(reloc) = &stmt.relocation {
                if reloc.kind == RelocationKind::Pcrel {
                    let bits = match def.format {
                        Format::B => Some(13),
                        Format::J => Some(21),
                        _ => None,
                    };
                    if let Some(bits) = bits {
                        if !fits_signed(operands.imm, bits) {
                            errors.push(LinkError::RelocationOverflow {
                                symbol: reloc.symbol.clone(),
                                file: stmt.debug.file.clone(),
                                line: stmt.debug.line,
                            });
                        }
                    }
                }
            }

            memory.store_word_privileged(site_addr, def.encode(operands));
        }
    }

    if let Some(addr) = entry_addr {
        let delta = addr.wrapping_sub(TEXT_BEGIN) as i32;
        let (hi20, lo12) = hi20_lo12_split(delta as u32);
        let auipc = registry.lookup("auipc").expect("auipc is always registered");
        let jalr = registry.lookup("jalr").expect("jalr is always registered");
        memory.store_word_privileged(
            TEXT_BEGIN,
            auipc.encode(Operands { rd: 6, imm: hi20 as i32, ..Default::default() }),
        );
        memory.store_word_privileged(
            TEXT_BEGIN + INSTRUCTION_SIZE,
            jalr.encode(Operands {
                rd: 1,
                rs1: 6,
                imm: sign_extend(lo12, 12),
                ..Default::default()
            }),
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(LinkedImage {
        memory,
        entry_pc: TEXT_BEGIN,
        heap_base: segments.heap_base,
        segments,
        globals,
        text_bases: bases.iter().map(|b| b.text).collect(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use jupiter_asm::{assemble, AssembleOptions, SourceFile};

    fn assemble_ok(files: &[SourceFile]) -> Vec<TranslationUnit> {
        assemble(files, &AssembleOptions::default()).expect("assembly should succeed")
    }

    #[test]
    fn two_file_link_resolves_cross_unit_symbol() {
        let files = [
            SourceFile::new("a.s", ".globl foo\nfoo:\n  addi x0, x0, 0\n"),
            SourceFile::new("b.s", "__start:\n  la x5, foo\n"),
        ];
        let units = assemble_ok(&files);
        let image = link(&units, &LinkOptions::default()).expect("link should succeed");

        let foo_addr = *image.globals.get("foo").expect("foo should be exported");

        let registry = new_standard_registry();
        let text_base_b = TEXT_BEGIN + BOOTSTRAP_SLOTS * INSTRUCTION_SIZE + INSTRUCTION_SIZE;
        let auipc_word = image.memory.load_word_privileged(text_base_b);
        let addi_word = image.memory.load_word_privileged(text_base_b + INSTRUCTION_SIZE);
        let auipc_ops = registry.lookup("auipc").unwrap().decode_operands(auipc_word);
        let addi_ops = registry.lookup("addi").unwrap().decode_operands(addi_word);
        let delta = auipc_ops.imm.wrapping_add(addi_ops.imm);
        let recovered = text_base_b.wrapping_add(delta as u32);
        assert_eq!(recovered, foo_addr);
    }

    #[test]
    fn text_size_matches_bootstrap_plus_statement_identity() {
        let files = [SourceFile::new("a.s", "__start:\n  addi x1, x0, 7\n  addi x2, x0, 5\n")];
        let units = assemble_ok(&files);
        let image = link(&units, &LinkOptions::default()).unwrap();
        let expected = INSTRUCTION_SIZE * (BOOTSTRAP_SLOTS + units[0].statements.len() as u32);
        assert_eq!(image.segments.text_end - image.segments.text_begin, expected);
    }

    #[test]
    fn duplicate_global_is_an_error() {
        let files = [
            SourceFile::new("a.s", ".globl foo\nfoo:\n  addi x0, x0, 0\n"),
            SourceFile::new("b.s", "__start:\n  nop\n.globl foo\nfoo:\n  addi x0, x0, 0\n"),
        ];
        let units = assemble_ok(&files);
        let err = link(&units, &LinkOptions::default()).unwrap_err();
        assert!(err.iter().any(|e| matches!(e, LinkError::DuplicateGlobal { symbol } if symbol == "foo")));
    }

    #[test]
    fn missing_entry_is_an_error() {
        let files = [SourceFile::new("a.s", "nop\n")];
        let units = assemble_ok(&files);
        let err = link(&units, &LinkOptions::default()).unwrap_err();
        assert!(err.iter().any(|e| matches!(e, LinkError::MissingEntry { .. })));
    }

    #[test]
    fn undefined_symbol_reference_is_an_error() {
        let files = [SourceFile::new("a.s", "__start:\n  la x5, nowhere\n")];
        let units = assemble_ok(&files);
        let err = link(&units, &LinkOptions::default()).unwrap_err();
        assert!(err.iter().any(|e| matches!(e, LinkError::UndefinedSymbol { symbol, .. } if symbol == "nowhere")));
    }
}
