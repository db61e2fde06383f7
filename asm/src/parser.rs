//! Source text to [`TranslationUnit`]: grammar-driven parse (via
//! `pest_derive`), directive handling, operand token extraction,
//! pseudo-instruction expansion, and local symbol collection.

use pest::iterators::Pair;
use pest::Parser as _;
use pest_derive::Parser;

use jupiter_core::isa::Operands;

use crate::error::Diagnostic;
use crate::int_util::{decode_char_literal, decode_string_literal, parse_signed};
use crate::pseudo;
use crate::registers::{resolve_float, resolve_int};
use crate::unit::{DebugInfo, RawStatement, Relocation, RelocationKind, Segment, TranslationUnit};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct JupiterParser;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelocFn {
    Hi,
    Lo,
    PcrelHi,
    PcrelLo,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OperandToken {
    Reg(String),
    Imm(i64),
    Symbol(String),
    Mem { offset: i64, reg: String },
    Reloc { func: RelocFn, symbol: String },
}

#[derive(Clone, Copy)]
enum Reg {
    Int,
    Float,
}

enum Shape {
    Rrr(Reg, Reg, Reg),
    Rri(Reg, Reg),
    Load(Reg),
    Store(Reg),
    Branch,
    Jal,
    Upper,
    Sys,
    R2(Reg, Reg),
    Cmp,
    R4,
}

fn shape_for(mnemonic: &str) -> Option<Shape> {
    use Reg::{Float, Int};
    Some(match mnemonic {
        "add" | "sub" | "sll" | "slt" | "sltu" | "xor" | "srl" | "sra" | "or" | "and" | "mul"
        | "mulh" | "mulhsu" | "mulhu" | "div" | "divu" | "rem" | "remu" => {
            Shape::Rrr(Int, Int, Int)
        }
        "fadd.s" | "fsub.s" | "fmul.s" | "fdiv.s" | "fsgnj.s" | "fsgnjn.s" | "fsgnjx.s"
        | "fmin.s" | "fmax.s" => Shape::Rrr(Float, Float, Float),
        "addi" | "slti" | "sltiu" | "xori" | "ori" | "andi" | "slli" | "srli" | "srai"
        | "jalr" => Shape::Rri(Int, Int),
        "lb" | "lh" | "lw" | "lbu" | "lhu" => Shape::Load(Int),
        "flw" => Shape::Load(Float),
        "sb" | "sh" | "sw" => Shape::Store(Int),
        "fsw" => Shape::Store(Float),
        "beq" | "bne" | "blt" | "bge" | "bltu" | "bgeu" => Shape::Branch,
        "jal" => Shape::Jal,
        "lui" | "auipc" => Shape::Upper,
        "ecall" | "ebreak" => Shape::Sys,
        "fsqrt.s" => Shape::R2(Float, Float),
        "fcvt.w.s" | "fcvt.wu.s" | "fmv.x.w" | "fclass.s" => Shape::R2(Int, Float),
        "fcvt.s.w" | "fcvt.s.wu" | "fmv.w.x" => Shape::R2(Float, Int),
        "feq.s" | "flt.s" | "fle.s" => Shape::Cmp,
        "fmadd.s" | "fmsub.s" | "fnmsub.s" | "fnmadd.s" => Shape::R4,
        _ => return None,
    })
}

/// Pseudo-instruction mnemonics rejected outright in bare-machine mode:
/// pseudo-instructions disabled, only base encodings accepted.
const PSEUDO_MNEMONICS: &[&str] = &[
    "li", "la", "call", "tail", "nop", "mv", "not", "neg", "seqz", "snez", "sltz", "sgtz", "jr",
    "ret", "beqz", "bnez", "blez", "bgez", "bltz", "bgtz", "bgt", "ble", "bgtu", "bleu", "j",
];

/// Parses one source file into a [`TranslationUnit`], collecting every
/// diagnostic it can rather than stopping at the first. `bare` disables
/// pseudo-instruction expansion (bare-machine mode).
pub fn parse_unit(
    file: &str,
    source: &str,
    bare: bool,
) -> Result<(TranslationUnit, Vec<Diagnostic>), Vec<Diagnostic>> {
    let mut program = JupiterParser::parse(Rule::program, source)
        .map_err(|e| vec![Diagnostic::from_pest(file, e)])?;

    let mut unit = TranslationUnit::new(file);
    let mut diags = Vec::new();
    let mut builder = UnitBuilder {
        unit: &mut unit,
        diags: &mut diags,
        file,
        segment: Segment::Text,
        text_len: 0,
        pcrel_counter: 0,
        bare,
    };

    let program_pair = program.next().expect("program rule always produces one pair");
    for pair in program_pair.into_inner() {
        match pair.as_rule() {
            Rule::line => builder.handle_line(pair),
            Rule::EOI => {}
            _ => unreachable!("unexpected top-level rule {:?}", pair.as_rule()),
        }
    }

    Ok((unit, diags))
}

struct UnitBuilder<'a> {
    unit: &'a mut TranslationUnit,
    diags: &'a mut Vec<Diagnostic>,
    file: &'a str,
    segment: Segment,
    text_len: u32,
    pcrel_counter: u32,
    bare: bool,
}

impl<'a> UnitBuilder<'a> {
    fn error(&mut self, line: usize, message: impl Into<String>) {
        self.diags.push(Diagnostic::error(self.file, line, message));
    }

    fn current_offset(&self) -> u32 {
        match self.segment {
            Segment::Text => self.text_len,
            Segment::Rodata => self.unit.rodata.len() as u32,
            Segment::Data => self.unit.data.len() as u32,
            Segment::Bss => self.unit.bss_len,
        }
    }

    fn handle_line(&mut self, pair: Pair<Rule>) {
        let line_no = pair.as_span().start_pos().line_col().0;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::label_def => {
                    let name = child.into_inner().next().unwrap().as_str().to_string();
                    if self.unit.local_symbols.contains_key(&name) {
                        self.error(line_no, format!("duplicate local label '{name}'"));
                    } else {
                        let offset = self.current_offset();
                        self.unit.define_label(name, self.segment, offset);
                    }
                }
                Rule::content => {
                    let inner = child.into_inner().next().unwrap();
                    match inner.as_rule() {
                        Rule::directive => self.handle_directive(inner, line_no),
                        Rule::instruction => self.handle_instruction(inner, line_no),
                        _ => unreachable!(),
                    }
                }
                _ => unreachable!("unexpected line child {:?}", child.as_rule()),
            }
        }
    }

    fn handle_directive(&mut self, pair: Pair<Rule>, line_no: usize) {
        let directive = pair.into_inner().next().unwrap();
        match directive.as_rule() {
            Rule::directive_section => {
                let name = directive.into_inner().next().unwrap().as_str().to_ascii_lowercase();
                self.segment = match name.trim_start_matches('.') {
                    "text" => Segment::Text,
                    "rodata" => Segment::Rodata,
                    "data" => Segment::Data,
                    "bss" => Segment::Bss,
                    other => {
                        self.error(line_no, format!("unknown section '{other}'"));
                        return;
                    }
                };
            }
            Rule::directive_globl => {
                let name = directive.into_inner().next().unwrap().as_str().to_string();
                self.unit.mark_global(name);
            }
            Rule::directive_align => {
                let exponent = self.eval_expr(directive.into_inner().next().unwrap(), line_no);
                let exponent = exponent.clamp(0, 30) as u32;
                self.align_to(1u32 << exponent);
            }
            Rule::directive_equ => {
                let mut inner = directive.into_inner();
                let name = inner.next().unwrap().as_str().to_string();
                let value = self.eval_expr(inner.next().unwrap(), line_no);
                self.unit.define_constant(name, value);
            }
            Rule::directive_byte => self.emit_data_list(directive, 1, line_no),
            Rule::directive_half => self.emit_data_list(directive, 2, line_no),
            Rule::directive_word => self.emit_data_list(directive, 4, line_no),
            Rule::directive_float => {
                let list = directive.into_inner().next().unwrap();
                for elem in list.into_inner() {
                    let text = elem.as_str();
                    match text.parse::<f32>() {
                        Ok(value) => self.push_bytes(&value.to_le_bytes(), line_no),
                        Err(_) => self.error(line_no, format!("invalid float literal '{text}'")),
                    }
                }
            }
            Rule::directive_ascii => {
                let text = directive.into_inner().next().unwrap().as_str();
                let bytes = decode_string_literal(text);
                self.push_bytes(&bytes, line_no);
            }
            Rule::directive_asciiz => {
                let text = directive.into_inner().next().unwrap().as_str();
                let mut bytes = decode_string_literal(text);
                bytes.push(0);
                self.push_bytes(&bytes, line_no);
            }
            Rule::directive_space => {
                let count = self.eval_expr(directive.into_inner().next().unwrap(), line_no);
                let bytes = vec![0u8; count.max(0) as usize];
                self.push_bytes(&bytes, line_no);
            }
            _ => unreachable!("unexpected directive {:?}", directive.as_rule()),
        }
    }

    fn align_to(&mut self, alignment: u32) {
        match self.segment {
            Segment::Text => {}
            Segment::Bss => {
                self.unit.bss_len = jupiter_core::bits::align_up(self.unit.bss_len, alignment);
            }
            Segment::Rodata | Segment::Data => {
                let current = self.current_offset();
                let target = jupiter_core::bits::align_up(current, alignment);
                let padding = vec![0u8; (target - current) as usize];
                self.push_bytes(&padding, 0);
            }
        }
    }

    fn push_bytes(&mut self, bytes: &[u8], line_no: usize) {
        match self.segment {
            Segment::Rodata => self.unit.rodata.extend_from_slice(bytes),
            Segment::Data => self.unit.data.extend_from_slice(bytes),
            Segment::Bss => self.unit.bss_len += bytes.len() as u32,
            Segment::Text => self.error(line_no, "data directive used inside .text"),
        }
    }

    fn emit_data_list(&mut self, directive: Pair<Rule>, width: usize, line_no: usize) {
        let list = directive.into_inner().next().unwrap();
        for elem in list.into_inner() {
            let inner = elem.into_inner().next().unwrap();
            let value: i64 = match inner.as_rule() {
                Rule::char_lit => {
                    decode_char_literal(inner.into_inner().next().unwrap().as_str()) as i64
                }
                Rule::expr => self.eval_expr(inner, line_no),
                _ => unreachable!(),
            };
            let bytes = (value as i32 as u32).to_le_bytes();
            self.push_bytes(&bytes[..width], line_no);
        }
    }

    fn eval_expr(&mut self, pair: Pair<Rule>, line_no: usize) -> i64 {
        match parse_signed(pair.as_str()) {
            Ok(value) => value,
            Err(message) => {
                self.error(line_no, message);
                0
            }
        }
    }

    fn handle_instruction(&mut self, pair: Pair<Rule>, line_no: usize) {
        let mut inner = pair.into_inner();
        let mnemonic = inner.next().unwrap().as_str().to_ascii_lowercase();
        let mut tokens = Vec::new();
        if let Some(operand_list) = inner.next() {
            for operand in operand_list.into_inner() {
                tokens.push(self.token_for(operand));
            }
        }

        if self.segment != Segment::Text {
            self.error(line_no, "instruction used outside .text");
            return;
        }

        self.emit(&mnemonic, tokens, line_no);
    }

    /// Dispatches a (possibly pseudo) mnemonic to one or more base
    /// statements, handling the site-aware `la`/`call`/`tail` forms here
    /// since they need the emitting offset to mint a pairing label.
    fn emit(&mut self, mnemonic: &str, tokens: Vec<OperandToken>, line_no: usize) {
        if self.bare && PSEUDO_MNEMONICS.contains(&mnemonic) {
            self.error(
                line_no,
                format!("pseudo-instruction '{mnemonic}' is not available in bare-machine mode"),
            );
            return;
        }

        match (mnemonic, tokens.as_slice()) {
            ("li", [rd, OperandToken::Imm(value)]) => {
                for (m, t) in pseudo::expand_li(rd.clone(), *value) {
                    self.build_and_push(m, &t, line_no);
                }
                return;
            }
            ("la", [rd, OperandToken::Symbol(sym)]) => {
                self.emit_pcrel_pair("auipc", "addi", rd.clone(), rd.clone(), sym.clone(), line_no);
                return;
            }
            ("call", [OperandToken::Symbol(sym)]) => {
                let ra = OperandToken::Reg("ra".to_string());
                self.emit_pcrel_pair("auipc", "jalr", ra.clone(), ra, sym.clone(), line_no);
                return;
            }
            ("tail", [OperandToken::Symbol(sym)]) => {
                let t1 = OperandToken::Reg("t1".to_string());
                let zero = OperandToken::Reg("zero".to_string());
                self.emit_pcrel_pair("auipc", "jalr", t1, zero, sym.clone(), line_no);
                return;
            }
            _ => {}
        }

        if let Some((base_mnemonic, base_tokens)) = pseudo::expand_simple(mnemonic, &tokens) {
            self.build_and_push(base_mnemonic, &base_tokens, line_no);
            return;
        }

        self.build_and_push(mnemonic, &tokens, line_no);
    }

    /// `auipc base, %pcrel_hi(sym)` followed by a second instruction that
    /// writes `link` and reads `base` against `%pcrel_lo(hi_label)` — the
    /// two-instruction pattern behind `la`/`call`/`tail`. `la`
    /// and `call` pass the same register as both `base` and `link`; `tail`
    /// passes a scratch base (`t1`) and `zero` as the link (no return
    /// address is saved).
    fn emit_pcrel_pair(
        &mut self,
        hi_mnemonic: &'static str,
        lo_mnemonic: &'static str,
        base: OperandToken,
        link: OperandToken,
        symbol: String,
        line_no: usize,
    ) {
        let site = self.text_len;
        let hi_label = format!(".Lpcrel{}", self.pcrel_counter);
        self.pcrel_counter += 1;
        self.unit.define_label(hi_label.clone(), Segment::Text, site);

        self.build_and_push(
            hi_mnemonic,
            &[
                base.clone(),
                OperandToken::Reloc {
                    func: RelocFn::PcrelHi,
                    symbol: symbol.clone(),
                },
            ],
            line_no,
        );

        self.build_and_push(
            lo_mnemonic,
            &[
                link,
                base,
                OperandToken::Reloc {
                    func: RelocFn::PcrelLo,
                    symbol: hi_label,
                },
            ],
            line_no,
        );
    }

    fn build_and_push(&mut self, mnemonic: &str, tokens: &[OperandToken], line_no: usize) {
        let Some(shape) = shape_for(mnemonic) else {
            self.error(line_no, format!("unknown mnemonic '{mnemonic}'"));
            return;
        };
        let mnemonic_static = static_mnemonic(mnemonic);
        let debug = DebugInfo {
            file: self.file.to_string(),
            line: line_no,
        };

        let (operands, relocation) = match (&shape, tokens) {
            (Shape::Rrr(rd, rs1, rs2), [a, b, c]) => (
                Operands {
                    rd: self.reg_index(*rd, a, line_no),
                    rs1: self.reg_index(*rs1, b, line_no),
                    rs2: self.reg_index(*rs2, c, line_no),
                    ..Default::default()
                },
                None,
            ),
            (Shape::Rri(rd, rs1), [a, b, c]) => {
                let (imm, reloc) = self.imm_or_reloc(c, line_no, RelocFn::Lo);
                (
                    Operands {
                        rd: self.reg_index(*rd, a, line_no),
                        rs1: self.reg_index(*rs1, b, line_no),
                        imm,
                        ..Default::default()
                    },
                    reloc,
                )
            }
            // `jalr rd, offset(rs1)` — the same addressing form loads use.
            (Shape::Rri(rd, _), [a, OperandToken::Mem { offset, reg }]) => (
                Operands {
                    rd: self.reg_index(*rd, a, line_no),
                    rs1: self.int_reg(reg, line_no),
                    imm: *offset as i32,
                    ..Default::default()
                },
                None,
            ),
            (Shape::Load(rd), [a, OperandToken::Mem { offset, reg }]) => (
                Operands {
                    rd: self.reg_index(*rd, a, line_no),
                    rs1: self.int_reg(reg, line_no),
                    imm: *offset as i32,
                    ..Default::default()
                },
                None,
            ),
            (Shape::Store(rs2), [a, OperandToken::Mem { offset, reg }]) => (
                Operands {
                    rs1: self.int_reg(reg, line_no),
                    rs2: self.reg_index(*rs2, a, line_no),
                    imm: *offset as i32,
                    ..Default::default()
                },
                None,
            ),
            (Shape::Branch, [a, b, target]) => {
                let symbol = self.symbol_name(target, line_no);
                (
                    Operands {
                        rs1: self.int_reg_token(a, line_no),
                        rs2: self.int_reg_token(b, line_no),
                        ..Default::default()
                    },
                    Some(Relocation {
                        kind: RelocationKind::Pcrel,
                        symbol,
                    }),
                )
            }
            (Shape::Jal, [a, target]) => {
                let symbol = self.symbol_name(target, line_no);
                (
                    Operands {
                        rd: self.int_reg_token(a, line_no),
                        ..Default::default()
                    },
                    Some(Relocation {
                        kind: RelocationKind::Pcrel,
                        symbol,
                    }),
                )
            }
            (Shape::Upper, [a, b]) => {
                let (imm, reloc) = self.imm_or_reloc(b, line_no, RelocFn::Hi);
                (
                    Operands {
                        rd: self.int_reg_token(a, line_no),
                        imm,
                        ..Default::default()
                    },
                    reloc,
                )
            }
            (Shape::Sys, []) => (Operands::default(), None),
            (Shape::R2(rd, rs1), [a, b]) => (
                Operands {
                    rd: self.reg_index(*rd, a, line_no),
                    rs1: self.reg_index(*rs1, b, line_no),
                    ..Default::default()
                },
                None,
            ),
            (Shape::Cmp, [a, b, c]) => (
                Operands {
                    rd: self.int_reg_token(a, line_no),
                    rs1: self.reg_index(Reg::Float, b, line_no),
                    rs2: self.reg_index(Reg::Float, c, line_no),
                    ..Default::default()
                },
                None,
            ),
            (Shape::R4, [a, b, c, d]) => (
                Operands {
                    rd: self.reg_index(Reg::Float, a, line_no),
                    rs1: self.reg_index(Reg::Float, b, line_no),
                    rs2: self.reg_index(Reg::Float, c, line_no),
                    rs3: self.reg_index(Reg::Float, d, line_no),
                    ..Default::default()
                },
                None,
            ),
            _ => {
                self.error(
                    line_no,
                    format!("wrong number of operands for '{mnemonic}'"),
                );
                return;
            }
        };

        self.unit.statements.push(RawStatement {
            mnemonic: mnemonic_static,
            operands,
            relocation,
            debug,
        });
        self.text_len += 4;
    }

    fn reg_index(&mut self, kind: Reg, token: &OperandToken, line_no: usize) -> u8 {
        match token {
            OperandToken::Reg(name) => {
                let resolved = match kind {
                    Reg::Int => resolve_int(name),
                    Reg::Float => resolve_float(name),
                };
                resolved.unwrap_or_else(|| {
                    self.error(line_no, format!("unknown register '{name}'"));
                    0
                })
            }
            _ => {
                self.error(line_no, "expected a register operand");
                0
            }
        }
    }

    fn int_reg(&mut self, name: &str, line_no: usize) -> u8 {
        resolve_int(name).unwrap_or_else(|| {
            self.error(line_no, format!("unknown register '{name}'"));
            0
        })
    }

    fn int_reg_token(&mut self, token: &OperandToken, line_no: usize) -> u8 {
        self.reg_index(Reg::Int, token, line_no)
    }

    fn symbol_name(&mut self, token: &OperandToken, line_no: usize) -> String {
        match token {
            OperandToken::Symbol(name) => name.clone(),
            _ => {
                self.error(line_no, "expected a label operand");
                String::new()
            }
        }
    }

    fn imm_or_reloc(
        &mut self,
        token: &OperandToken,
        line_no: usize,
        default_func: RelocFn,
    ) -> (i32, Option<Relocation>) {
        match token {
            OperandToken::Imm(value) => (*value as i32, None),
            OperandToken::Symbol(name) => {
                let kind = reloc_kind(default_func);
                (0, Some(Relocation { kind, symbol: name.clone() }))
            }
            OperandToken::Reloc { func, symbol } => {
                (0, Some(Relocation { kind: reloc_kind(*func), symbol: symbol.clone() }))
            }
            _ => {
                self.error(line_no, "expected an immediate or symbol operand");
                (0, None)
            }
        }
    }

    fn token_for(&mut self, pair: Pair<Rule>) -> OperandToken {
        let line_no = pair.as_span().start_pos().line_col().0;
        let inner = pair.into_inner().next().unwrap();
        match inner.as_rule() {
            Rule::register => OperandToken::Reg(inner.as_str().to_string()),
            Rule::expr => match parse_signed(inner.as_str()) {
                Ok(value) => OperandToken::Imm(value),
                Err(message) => {
                    self.error(line_no, message);
                    OperandToken::Imm(0)
                }
            },
            Rule::ident => OperandToken::Symbol(inner.as_str().to_string()),
            Rule::mem_operand => {
                let mut fields = inner.into_inner();
                let offset_pair = fields.next().unwrap();
                let reg_pair = fields.next().unwrap();
                let offset = parse_signed(offset_pair.as_str()).unwrap_or(0);
                OperandToken::Mem {
                    offset,
                    reg: reg_pair.as_str().to_string(),
                }
            }
            Rule::reloc_operand => {
                let mut fields = inner.into_inner();
                let func_pair = fields.next().unwrap();
                let ident_pair = fields.next().unwrap();
                let func = match func_pair.as_str() {
                    "%hi" => RelocFn::Hi,
                    "%lo" => RelocFn::Lo,
                    "%pcrel_hi" => RelocFn::PcrelHi,
                    "%pcrel_lo" => RelocFn::PcrelLo,
                    _ => unreachable!(),
                };
                OperandToken::Reloc {
                    func,
                    symbol: ident_pair.as_str().to_string(),
                }
            }
            other => unreachable!("unexpected operand kind {:?}", other),
        }
    }
}

fn reloc_kind(func: RelocFn) -> RelocationKind {
    match func {
        RelocFn::Hi => RelocationKind::Hi20,
        RelocFn::Lo => RelocationKind::Lo12,
        RelocFn::PcrelHi => RelocationKind::PcrelHi20,
        RelocFn::PcrelLo => RelocationKind::PcrelLo12,
    }
}

/// The registry only ever hands out `'static` mnemonics; this maps a
/// dynamically-matched lowercase mnemonic back to the one it names; only
/// called after `shape_for` has already confirmed `mnemonic` is known.
fn static_mnemonic(mnemonic: &str) -> &'static str {
    const ALL: &[&str] = &[
        "add", "sub", "sll", "slt", "sltu", "xor", "srl", "sra", "or", "and", "mul", "mulh",
        "mulhsu", "mulhu", "div", "divu", "rem", "remu", "addi", "slti", "sltiu", "xori", "ori",
        "andi", "slli", "srli", "srai", "lb", "lh", "lw", "lbu", "lhu", "sb", "sh", "sw", "beq",
        "bne", "blt", "bge", "bltu", "bgeu", "jal", "jalr", "lui", "auipc", "ecall", "ebreak",
        "flw", "fsw", "fadd.s", "fsub.s", "fmul.s", "fdiv.s", "fsqrt.s", "fsgnj.s", "fsgnjn.s",
        "fsgnjx.s", "fmin.s", "fmax.s", "feq.s", "flt.s", "fle.s", "fcvt.w.s", "fcvt.wu.s",
        "fcvt.s.w", "fcvt.s.wu", "fmv.x.w", "fclass.s", "fmv.w.x", "fmadd.s", "fmsub.s",
        "fnmsub.s", "fnmadd.s",
    ];
    ALL.iter().find(|m| **m == mnemonic).copied().unwrap_or("addi")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_labels_and_instruction() {
        let source = "start:\n    addi a0, zero, 5\n    ecall\n";
        let (unit, diags) = parse_unit("t.s", source, false).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(unit.statements.len(), 2);
        assert_eq!(unit.statements[0].mnemonic, "addi");
        assert_eq!(unit.statements[0].operands.imm, 5);
    }

    #[test]
    fn expands_li_pseudo_into_addi() {
        let (unit, diags) = parse_unit("t.s", "li a0, 7\n", false).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(unit.statements.len(), 1);
        assert_eq!(unit.statements[0].mnemonic, "addi");
    }

    #[test]
    fn expands_la_into_auipc_addi_pair() {
        let source = ".data\nmsg: .asciiz \"hi\"\n.text\nla a0, msg\n";
        let (unit, diags) = parse_unit("t.s", source, false).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(unit.statements.len(), 2);
        assert_eq!(unit.statements[0].mnemonic, "auipc");
        assert_eq!(unit.statements[1].mnemonic, "addi");
        assert!(unit.statements[1].relocation.is_some());
    }

    #[test]
    fn branch_carries_pcrel_relocation() {
        let source = "loop:\n  beq a0, a1, loop\n";
        let (unit, diags) = parse_unit("t.s", source, false).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        let reloc = unit.statements[0].relocation.as_ref().unwrap();
        assert_eq!(reloc.kind, RelocationKind::Pcrel);
        assert_eq!(reloc.symbol, "loop");
    }

    #[test]
    fn directives_populate_rodata() {
        let source = ".section .rodata\nval: .word 1, 2, 3\n";
        let (unit, diags) = parse_unit("t.s", source, false).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(unit.rodata.len(), 12);
    }

    #[test]
    fn reports_unknown_mnemonic() {
        let (_, diags) = parse_unit("t.s", "bogus a0, a1\n", false).unwrap();
        assert!(!diags.is_empty());
    }

    #[test]
    fn bare_machine_mode_rejects_pseudo_instructions() {
        let (_, diags) = parse_unit("t.s", "li a0, 7\n", true).unwrap();
        assert!(diags.iter().any(|d| d.message.contains("bare-machine")));
    }

    #[test]
    fn bare_machine_mode_still_accepts_base_instructions() {
        let (unit, diags) = parse_unit("t.s", "addi a0, zero, 7\n", true).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(unit.statements.len(), 1);
    }
}
