//! Link-time error kinds. Unlike the assembler's
//! [`jupiter_asm::Diagnostic`], these always abort the phase:
//! the layout algorithm is accumulated in one pass, but a program with any
//! of these problems cannot be loaded at all, so linking collects every
//! instance of each kind it finds rather than stopping at the first.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("{file}: undefined symbol '{symbol}'")]
    UndefinedSymbol { symbol: String, file: String, line: usize },

    #[error("duplicate global symbol '{symbol}'")]
    DuplicateGlobal { symbol: String },

    #[error("entry symbol '{symbol}' is not defined")]
    MissingEntry { symbol: String },

    #[error("entry symbol '{symbol}' does not resolve to the text segment")]
    EntryNotInText { symbol: String },

    #[error("program too large: text segment would need {needed} bytes, have {available}")]
    ProgramTooLarge { needed: u32, available: u32 },

    #[error("{file}:{line}: relocation against '{symbol}' overflows its field")]
    RelocationOverflow { symbol: String, file: String, line: usize },

    #[error("invalid cache configuration: {0}")]
    InvalidCacheConfig(String),
}
