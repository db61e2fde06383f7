//! Pseudo-instruction expansion: mnemonics that are not in the instruction
//! registry at all, rewritten here into one or more real
//! ones before the rest of the pipeline ever sees them. Operand-reordering
//! and register-only forms are expanded in place; `la`/`call`/`tail` need
//! the emitting statement's own text offset to split a symbol reference
//! into a `%pcrel_hi`/`%pcrel_lo` pair, so those stay in `parser.rs` where
//! the text cursor is tracked.

use crate::parser::OperandToken;

/// A single base-instruction statement still in token form, ready for the
/// same operand-shape dispatch real instructions go through.
pub type Expansion = (&'static str, Vec<OperandToken>);

fn reg(name: &str) -> OperandToken {
    OperandToken::Reg(name.to_string())
}

fn zero() -> OperandToken {
    reg("zero")
}

/// Expands register-reordering and zero-comparison pseudo-ops into exactly
/// one base instruction. Returns `None` if `mnemonic` is not one of these
/// (the caller then tries the symbol-aware forms, then the base registry).
pub fn expand_simple(mnemonic: &str, tokens: &[OperandToken]) -> Option<Expansion> {
    match (mnemonic, tokens) {
        ("nop", []) => Some(("addi", vec![zero(), zero(), OperandToken::Imm(0)])),
        ("mv", [rd, rs]) => Some(("addi", vec![rd.clone(), rs.clone(), OperandToken::Imm(0)])),
        ("not", [rd, rs]) => Some(("xori", vec![rd.clone(), rs.clone(), OperandToken::Imm(-1)])),
        ("neg", [rd, rs]) => Some(("sub", vec![rd.clone(), zero(), rs.clone()])),
        ("seqz", [rd, rs]) => Some(("sltiu", vec![rd.clone(), rs.clone(), OperandToken::Imm(1)])),
        ("snez", [rd, rs]) => Some(("sltu", vec![rd.clone(), zero(), rs.clone()])),
        ("sltz", [rd, rs]) => Some(("slt", vec![rd.clone(), rs.clone(), zero()])),
        ("sgtz", [rd, rs]) => Some(("slt", vec![rd.clone(), zero(), rs.clone()])),
        ("jr", [rs]) => Some(("jalr", vec![zero(), rs.clone(), OperandToken::Imm(0)])),
        ("ret", []) => Some(("jalr", vec![zero(), reg("ra"), OperandToken::Imm(0)])),
        ("beqz", [rs, label]) => Some(("beq", vec![rs.clone(), zero(), label.clone()])),
        ("bnez", [rs, label]) => Some(("bne", vec![rs.clone(), zero(), label.clone()])),
        ("blez", [rs, label]) => Some(("bge", vec![zero(), rs.clone(), label.clone()])),
        ("bgez", [rs, label]) => Some(("bge", vec![rs.clone(), zero(), label.clone()])),
        ("bltz", [rs, label]) => Some(("blt", vec![rs.clone(), zero(), label.clone()])),
        ("bgtz", [rs, label]) => Some(("blt", vec![zero(), rs.clone(), label.clone()])),
        ("bgt", [rs1, rs2, label]) => Some(("blt", vec![rs2.clone(), rs1.clone(), label.clone()])),
        ("ble", [rs1, rs2, label]) => Some(("bge", vec![rs2.clone(), rs1.clone(), label.clone()])),
        ("bgtu", [rs1, rs2, label]) => Some(("bltu", vec![rs2.clone(), rs1.clone(), label.clone()])),
        ("bleu", [rs1, rs2, label]) => Some(("bgeu", vec![rs2.clone(), rs1.clone(), label.clone()])),
        ("j", [label]) => Some(("jal", vec![zero(), label.clone()])),
        _ => None,
    }
}

/// Expands `li rd, imm` into one `addi` when the immediate fits a signed
/// 12-bit field, or a `lui`+`addi` pair otherwise, using the canonical
/// hi20/lo12 split so the pair reconstructs the exact value.
pub fn expand_li(rd: OperandToken, imm: i64) -> Vec<Expansion> {
    if (-2048..=2047).contains(&imm) {
        return vec![("addi", vec![rd, zero(), OperandToken::Imm(imm)])];
    }
    let (hi20, lo12) = jupiter_core::bits::hi20_lo12_split(imm as u32);
    let lo12_signed = jupiter_core::bits::sign_extend(lo12, 12) as i64;
    vec![
        ("lui", vec![rd.clone(), OperandToken::Imm(hi20 as i64)]),
        ("addi", vec![rd.clone(), rd, OperandToken::Imm(lo12_signed)]),
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expands_zero_comparisons() {
        let tokens = vec![reg("a0"), reg("a1")];
        assert_eq!(
            expand_simple("neg", &tokens),
            Some(("sub", vec![reg("a0"), zero(), reg("a1")]))
        );
    }

    #[test]
    fn expands_branch_reversal() {
        let tokens = vec![reg("a0"), reg("a1"), OperandToken::Symbol("L".to_string())];
        assert_eq!(
            expand_simple("bgt", &tokens),
            Some((
                "blt",
                vec![reg("a1"), reg("a0"), OperandToken::Symbol("L".to_string())]
            ))
        );
    }

    #[test]
    fn li_small_uses_single_addi() {
        let expansion = expand_li(reg("a0"), 100);
        assert_eq!(expansion.len(), 1);
        assert_eq!(expansion[0].0, "addi");
    }

    #[test]
    fn li_large_splits_into_pair() {
        let expansion = expand_li(reg("a0"), 0x1234_5678);
        assert_eq!(expansion.len(), 2);
        assert_eq!(expansion[0].0, "lui");
        assert_eq!(expansion[1].0, "addi");
    }
}
