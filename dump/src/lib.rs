//! A human-readable code dump format: one 8-hex-digit instruction word per
//! line, multi-file runs prefixed with a `<path>:` header before each unit's
//! block. Shaped like a small `Program`-style (de)serializer —
//! `read`/`write`/`read_file`/`write_file` plus `Read`/`Write` extension
//! traits — but over text lines instead of a binary container, since this
//! crate has no ELF emission to fall back to.

pub mod error;

pub use error::DumpError;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use jupiter_asm::TranslationUnit;
use jupiter_core::constants::{BOOTSTRAP_SLOTS, INSTRUCTION_SIZE, TEXT_BEGIN};
use jupiter_link::LinkedImage;

/// One block of the dump: the words belonging to a single source file, or
/// `None` for the leading bootstrap pair the linker emits, which belongs to
/// no source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpUnit {
    pub path: Option<String>,
    pub words: Vec<u32>,
}

/// Extracts the full text segment of a linked program as dump blocks: the
/// bootstrap pair first (unlabeled), then each unit's own instructions in
/// link order.
pub fn from_linked_image(units: &[TranslationUnit], image: &LinkedImage) -> Vec<DumpUnit> {
    let mut out = Vec::with_capacity(units.len() + 1);

    let bootstrap_words = (0..BOOTSTRAP_SLOTS)
        .map(|i| image.memory.load_word_privileged(TEXT_BEGIN + i * INSTRUCTION_SIZE))
        .collect();
    out.push(DumpUnit { path: None, words: bootstrap_words });

    for (unit, &base) in units.iter().zip(&image.text_bases) {
        let words = (0..unit.statements.len() as u32)
            .map(|i| image.memory.load_word_privileged(base + i * INSTRUCTION_SIZE))
            .collect();
        out.push(DumpUnit { path: Some(unit.file.clone()), words });
    }

    out
}

/// Writes `units` in dump format. A `<path>:` header precedes a block only
/// when more than one block actually names a file — a single-file program's
/// dump is just its instruction words, with nothing to disambiguate.
pub fn write<W: Write>(writer: &mut W, units: &[DumpUnit]) -> Result<(), DumpError> {
    let multi = units.iter().filter(|u| u.path.is_some()).count() > 1;
    for unit in units {
        if multi {
            if let Some(path) = &unit.path {
                writeln!(writer, "{}:", path)?;
            }
        }
        for word in &unit.words {
            writeln!(writer, "{:08x}", word)?;
        }
    }
    Ok(())
}

/// Parses dump text back into blocks. A line ending in `:` starts a new
/// named block; any other non-blank line is an 8-hex-digit word appended to
/// the current block (an anonymous one is opened implicitly if none has
/// started yet).
pub fn read<R: BufRead>(reader: R) -> Result<Vec<DumpUnit>, DumpError> {
    let mut out: Vec<DumpUnit> = Vec::new();
    let mut current = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(path) = trimmed.strip_suffix(':') {
            out.push(DumpUnit { path: Some(path.to_string()), words: Vec::new() });
            current = Some(out.len() - 1);
            continue;
        }
        let word = u32::from_str_radix(trimmed, 16)
            .map_err(|_| DumpError::MalformedLine { line: line_no + 1, text: line.clone() })?;
        let index = *current.get_or_insert_with(|| {
            out.push(DumpUnit { path: None, words: Vec::new() });
            out.len() - 1
        });
        out[index].words.push(word);
    }
    Ok(out)
}

pub trait ReadDumpExt: BufRead + Sized {
    fn read_dump(self) -> Result<Vec<DumpUnit>, DumpError> {
        read(self)
    }
}

impl<R: BufRead> ReadDumpExt for R {}

pub trait WriteDumpExt: Write + Sized {
    fn write_dump(&mut self, units: &[DumpUnit]) -> Result<(), DumpError> {
        write(self, units)
    }
}

impl<W: Write + Sized> WriteDumpExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<DumpUnit>, DumpError> {
    read(BufReader::new(File::open(path)?))
}

pub fn write_file<P: AsRef<Path>>(path: P, units: &[DumpUnit]) -> Result<(), DumpError> {
    write(&mut BufWriter::new(File::create(path)?), units)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_file_round_trips_without_header() {
        let units = vec![DumpUnit { path: Some("a.s".to_string()), words: vec![0xDEAD_BEEF, 0x0000_0013] }];
        let mut buf = Vec::new();
        write(&mut buf, &units).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "deadbeef\n00000013\n");

        let parsed = read(text.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].path, None);
        assert_eq!(parsed[0].words, vec![0xDEAD_BEEF, 0x0000_0013]);
    }

    #[test]
    fn multi_file_emits_path_headers() {
        let units = vec![
            DumpUnit { path: None, words: vec![0x0000_0013, 0x0000_0013] },
            DumpUnit { path: Some("a.s".to_string()), words: vec![0x0000_0001] },
            DumpUnit { path: Some("b.s".to_string()), words: vec![0x0000_0002, 0x0000_0003] },
        ];
        let mut buf = Vec::new();
        write(&mut buf, &units).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "00000013\n00000013\na.s:\n00000001\nb.s:\n00000002\n00000003\n");

        let parsed = read(text.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[1].path.as_deref(), Some("a.s"));
        assert_eq!(parsed[2].words, vec![0x0000_0002, 0x0000_0003]);
    }

    #[test]
    fn malformed_line_is_reported_with_its_number() {
        let err = read("deadbeef\nnot-hex\n".as_bytes()).unwrap_err();
        match err {
            DumpError::MalformedLine { line, .. } => assert_eq!(line, 2),
            other => panic!("expected MalformedLine, got {other:?}"),
        }
    }

    #[test]
    fn file_round_trip_via_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("program.dump");
        let units = vec![DumpUnit { path: Some("a.s".to_string()), words: vec![0x1234_5678] }];
        write_file(&path, &units).unwrap();
        let parsed = read_file(&path).unwrap();
        assert_eq!(parsed[0].words, vec![0x1234_5678]);
    }
}
