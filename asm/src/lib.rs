//! Two-pass assembler for Jupiter's RISC-V RV32IMF target.
//!
//! A [`TranslationUnit`] is what one source file reduces to after parsing
//! and pseudo-instruction expansion (phases 1-3): a symbolic instruction
//! stream plus its data segments and local symbol table, still unaddressed.
//! [`assemble`] runs this over every file handed to it and collects
//! diagnostics across all of them rather than stopping at the first file
//! that fails, so a caller can report everything wrong with a whole program
//! in one pass. Turning translation units into a linked, loadable image is
//! `jupiter-link`'s job, not this crate's.
//!
//! Parsing is implemented with [pest], following the same grammar-driven
//! approach as the example pack's `cicasm` assembler. The crate's own
//! [`Diagnostic`] type, rather than `pest::error::Error` directly, is what
//! callers see — `from_pest` adapts the one case where pest reports an
//! error itself (a line that doesn't parse at all).
//!
//! [pest]: https://docs.rs/pest/

pub mod error;
pub mod int_util;
pub mod parser;
pub mod pseudo;
pub mod registers;
pub mod unit;

pub use error::{Diagnostic, Severity};
pub use unit::TranslationUnit;

/// One file handed to the assembler: `name` is used only for diagnostics
/// and as the key other units use to resolve cross-file globals later.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        SourceFile {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AssembleOptions {
    /// Extrict mode: promotes every warning to an error.
    pub extrict: bool,
    /// Bare-machine mode: disables pseudo-instruction expansion, accepting
    /// only base encodings.
    pub bare_machine: bool,
}

/// Assembles every file into a [`TranslationUnit`], in the order given.
/// Diagnostics from every file are collected before deciding success or
/// failure: a later file's clean parse doesn't hide an earlier file's
/// errors, and a caller gets the full picture in one call.
pub fn assemble(
    files: &[SourceFile],
    options: &AssembleOptions,
) -> Result<Vec<TranslationUnit>, Vec<Diagnostic>> {
    let mut units = Vec::with_capacity(files.len());
    let mut diagnostics = Vec::new();

    for file in files {
        match parser::parse_unit(&file.name, &file.text, options.bare_machine) {
            Ok((unit, unit_diags)) => {
                units.push(unit);
                diagnostics.extend(unit_diags);
            }
            Err(unit_diags) => diagnostics.extend(unit_diags),
        }
    }

    let diagnostics: Vec<Diagnostic> = diagnostics
        .into_iter()
        .map(|d| d.promote_if_extrict(options.extrict))
        .collect();

    if diagnostics.iter().any(Diagnostic::is_error) {
        Err(diagnostics)
    } else {
        Ok(units)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn assembles_single_clean_file() {
        let files = [SourceFile::new("a.s", "start:\n  addi a0, zero, 1\n  ecall\n")];
        let units = assemble(&files, &AssembleOptions::default()).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].statements.len(), 2);
    }

    #[test]
    fn collects_diagnostics_across_files() {
        let files = [
            SourceFile::new("a.s", "bogus a0\n"),
            SourceFile::new("b.s", "also_bogus a0\n"),
        ];
        let err = assemble(&files, &AssembleOptions::default()).unwrap_err();
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn extrict_mode_promotes_warnings() {
        // No warnings are currently emitted by the parser itself, but the
        // promotion step must still run unconditionally without panicking
        // on a clean file.
        let files = [SourceFile::new("a.s", "nop\n")];
        let units = assemble(&files, &AssembleOptions { extrict: true, ..Default::default() }).unwrap();
        assert_eq!(units[0].statements.len(), 1);
    }
}
