//! Builds the standard RV32IMF registry: one row per instruction, naming
//! its format, opcode/funct3/funct7(/rs2) fields and executor. See spec
//! §4.3 and §9 ("a tabular registry ... is cleaner").

use super::exec;
use super::{Format, InstructionDef, Registry};

const OP: u32 = 0b011_0011;
const OP_IMM: u32 = 0b001_0011;
const LOAD: u32 = 0b000_0011;
const STORE: u32 = 0b010_0011;
const BRANCH: u32 = 0b110_0011;
const JALR: u32 = 0b110_0111;
const JAL: u32 = 0b110_1111;
const LUI: u32 = 0b011_0111;
const AUIPC: u32 = 0b001_0111;
const SYSTEM: u32 = 0b111_0011;
const LOAD_FP: u32 = 0b000_0111;
const STORE_FP: u32 = 0b010_0111;
const OP_FP: u32 = 0b101_0011;
const FMADD: u32 = 0b100_0011;
const FMSUB: u32 = 0b100_0111;
const FNMSUB: u32 = 0b100_1011;
const FNMADD: u32 = 0b100_1111;

struct Row {
    mnemonic: &'static str,
    format: Format,
    opcode: u32,
    funct3: Option<u32>,
    funct7: Option<u32>,
    rs2_fixed: Option<u32>,
    execute: super::ExecuteFn,
}

pub fn populate(registry: &mut Registry) {
    let rows: &[Row] = &[
        // R-type integer ALU
        Row { mnemonic: "add", format: Format::R, opcode: OP, funct3: Some(0b000), funct7: Some(0b0000000), rs2_fixed: None, execute: exec::add },
        Row { mnemonic: "sub", format: Format::R, opcode: OP, funct3: Some(0b000), funct7: Some(0b0100000), rs2_fixed: None, execute: exec::sub },
        Row { mnemonic: "sll", format: Format::R, opcode: OP, funct3: Some(0b001), funct7: Some(0b0000000), rs2_fixed: None, execute: exec::sll },
        Row { mnemonic: "slt", format: Format::R, opcode: OP, funct3: Some(0b010), funct7: Some(0b0000000), rs2_fixed: None, execute: exec::slt },
        Row { mnemonic: "sltu", format: Format::R, opcode: OP, funct3: Some(0b011), funct7: Some(0b0000000), rs2_fixed: None, execute: exec::sltu },
        Row { mnemonic: "xor", format: Format::R, opcode: OP, funct3: Some(0b100), funct7: Some(0b0000000), rs2_fixed: None, execute: exec::xor },
        Row { mnemonic: "srl", format: Format::R, opcode: OP, funct3: Some(0b101), funct7: Some(0b0000000), rs2_fixed: None, execute: exec::srl },
        Row { mnemonic: "sra", format: Format::R, opcode: OP, funct3: Some(0b101), funct7: Some(0b0100000), rs2_fixed: None, execute: exec::sra },
        Row { mnemonic: "or", format: Format::R, opcode: OP, funct3: Some(0b110), funct7: Some(0b0000000), rs2_fixed: None, execute: exec::or },
        Row { mnemonic: "and", format: Format::R, opcode: OP, funct3: Some(0b111), funct7: Some(0b0000000), rs2_fixed: None, execute: exec::and },
        // M extension
        Row { mnemonic: "mul", format: Format::R, opcode: OP, funct3: Some(0b000), funct7: Some(0b0000001), rs2_fixed: None, execute: exec::mul },
        Row { mnemonic: "mulh", format: Format::R, opcode: OP, funct3: Some(0b001), funct7: Some(0b0000001), rs2_fixed: None, execute: exec::mulh },
        Row { mnemonic: "mulhsu", format: Format::R, opcode: OP, funct3: Some(0b010), funct7: Some(0b0000001), rs2_fixed: None, execute: exec::mulhsu },
        Row { mnemonic: "mulhu", format: Format::R, opcode: OP, funct3: Some(0b011), funct7: Some(0b0000001), rs2_fixed: None, execute: exec::mulhu },
        Row { mnemonic: "div", format: Format::R, opcode: OP, funct3: Some(0b100), funct7: Some(0b0000001), rs2_fixed: None, execute: exec::div },
        Row { mnemonic: "divu", format: Format::R, opcode: OP, funct3: Some(0b101), funct7: Some(0b0000001), rs2_fixed: None, execute: exec::divu },
        Row { mnemonic: "rem", format: Format::R, opcode: OP, funct3: Some(0b110), funct7: Some(0b0000001), rs2_fixed: None, execute: exec::rem },
        Row { mnemonic: "remu", format: Format::R, opcode: OP, funct3: Some(0b111), funct7: Some(0b0000001), rs2_fixed: None, execute: exec::remu },
        // I-type integer ALU
        Row { mnemonic: "addi", format: Format::I, opcode: OP_IMM, funct3: Some(0b000), funct7: None, rs2_fixed: None, execute: exec::addi },
        Row { mnemonic: "slti", format: Format::I, opcode: OP_IMM, funct3: Some(0b010), funct7: None, rs2_fixed: None, execute: exec::slti },
        Row { mnemonic: "sltiu", format: Format::I, opcode: OP_IMM, funct3: Some(0b011), funct7: None, rs2_fixed: None, execute: exec::sltiu },
        Row { mnemonic: "xori", format: Format::I, opcode: OP_IMM, funct3: Some(0b100), funct7: None, rs2_fixed: None, execute: exec::xori },
        Row { mnemonic: "ori", format: Format::I, opcode: OP_IMM, funct3: Some(0b110), funct7: None, rs2_fixed: None, execute: exec::ori },
        Row { mnemonic: "andi", format: Format::I, opcode: OP_IMM, funct3: Some(0b111), funct7: None, rs2_fixed: None, execute: exec::andi },
        Row { mnemonic: "slli", format: Format::I, opcode: OP_IMM, funct3: Some(0b001), funct7: Some(0b0000000), rs2_fixed: None, execute: exec::slli },
        Row { mnemonic: "srli", format: Format::I, opcode: OP_IMM, funct3: Some(0b101), funct7: Some(0b0000000), rs2_fixed: None, execute: exec::srli },
        Row { mnemonic: "srai", format: Format::I, opcode: OP_IMM, funct3: Some(0b101), funct7: Some(0b0100000), rs2_fixed: None, execute: exec::srai },
        // Loads
        Row { mnemonic: "lb", format: Format::I, opcode: LOAD, funct3: Some(0b000), funct7: None, rs2_fixed: None, execute: exec::lb },
        Row { mnemonic: "lh", format: Format::I, opcode: LOAD, funct3: Some(0b001), funct7: None, rs2_fixed: None, execute: exec::lh },
        Row { mnemonic: "lw", format: Format::I, opcode: LOAD, funct3: Some(0b010), funct7: None, rs2_fixed: None, execute: exec::lw },
        Row { mnemonic: "lbu", format: Format::I, opcode: LOAD, funct3: Some(0b100), funct7: None, rs2_fixed: None, execute: exec::lbu },
        Row { mnemonic: "lhu", format: Format::I, opcode: LOAD, funct3: Some(0b101), funct7: None, rs2_fixed: None, execute: exec::lhu },
        // Stores
        Row { mnemonic: "sb", format: Format::S, opcode: STORE, funct3: Some(0b000), funct7: None, rs2_fixed: None, execute: exec::sb },
        Row { mnemonic: "sh", format: Format::S, opcode: STORE, funct3: Some(0b001), funct7: None, rs2_fixed: None, execute: exec::sh },
        Row { mnemonic: "sw", format: Format::S, opcode: STORE, funct3: Some(0b010), funct7: None, rs2_fixed: None, execute: exec::sw },
        // Branches
        Row { mnemonic: "beq", format: Format::B, opcode: BRANCH, funct3: Some(0b000), funct7: None, rs2_fixed: None, execute: exec::beq },
        Row { mnemonic: "bne", format: Format::B, opcode: BRANCH, funct3: Some(0b001), funct7: None, rs2_fixed: None, execute: exec::bne },
        Row { mnemonic: "blt", format: Format::B, opcode: BRANCH, funct3: Some(0b100), funct7: None, rs2_fixed: None, execute: exec::blt },
        Row { mnemonic: "bge", format: Format::B, opcode: BRANCH, funct3: Some(0b101), funct7: None, rs2_fixed: None, execute: exec::bge },
        Row { mnemonic: "bltu", format: Format::B, opcode: BRANCH, funct3: Some(0b110), funct7: None, rs2_fixed: None, execute: exec::bltu },
        Row { mnemonic: "bgeu", format: Format::B, opcode: BRANCH, funct3: Some(0b111), funct7: None, rs2_fixed: None, execute: exec::bgeu },
        // Jumps / upper-immediate
        Row { mnemonic: "jal", format: Format::J, opcode: JAL, funct3: None, funct7: None, rs2_fixed: None, execute: exec::jal },
        Row { mnemonic: "jalr", format: Format::I, opcode: JALR, funct3: Some(0b000), funct7: None, rs2_fixed: None, execute: exec::jalr },
        Row { mnemonic: "lui", format: Format::U, opcode: LUI, funct3: None, funct7: None, rs2_fixed: None, execute: exec::lui },
        Row { mnemonic: "auipc", format: Format::U, opcode: AUIPC, funct3: None, funct7: None, rs2_fixed: None, execute: exec::auipc },
        // System: ecall/ebreak share opcode, funct3 and the top 7
        // immediate bits, so dispatch on the full 12-bit immediate instead
        // (see `Format::Sys` / `Registry::decode`).
        Row { mnemonic: "ecall", format: Format::Sys, opcode: SYSTEM, funct3: Some(0b000), funct7: Some(0), rs2_fixed: None, execute: exec::ecall },
        Row { mnemonic: "ebreak", format: Format::Sys, opcode: SYSTEM, funct3: Some(0b000), funct7: Some(1), rs2_fixed: None, execute: exec::ebreak },
        // F extension: loads/stores
        Row { mnemonic: "flw", format: Format::I, opcode: LOAD_FP, funct3: Some(0b010), funct7: None, rs2_fixed: None, execute: exec::flw },
        Row { mnemonic: "fsw", format: Format::S, opcode: STORE_FP, funct3: Some(0b010), funct7: None, rs2_fixed: None, execute: exec::fsw },
        // F extension: arithmetic (funct3 carries the rounding mode, not a
        // stable mnemonic identifier, so it is left out of the dispatch key)
        Row { mnemonic: "fadd.s", format: Format::R, opcode: OP_FP, funct3: None, funct7: Some(0b0000000), rs2_fixed: None, execute: exec::fadd_s },
        Row { mnemonic: "fsub.s", format: Format::R, opcode: OP_FP, funct3: None, funct7: Some(0b0000100), rs2_fixed: None, execute: exec::fsub_s },
        Row { mnemonic: "fmul.s", format: Format::R, opcode: OP_FP, funct3: None, funct7: Some(0b0001000), rs2_fixed: None, execute: exec::fmul_s },
        Row { mnemonic: "fdiv.s", format: Format::R, opcode: OP_FP, funct3: None, funct7: Some(0b0001100), rs2_fixed: None, execute: exec::fdiv_s },
        Row { mnemonic: "fsqrt.s", format: Format::R, opcode: OP_FP, funct3: None, funct7: Some(0b0101100), rs2_fixed: Some(0), execute: exec::fsqrt_s },
        // sign-inject family and min/max: funct3 *is* stable here
        Row { mnemonic: "fsgnj.s", format: Format::R, opcode: OP_FP, funct3: Some(0b000), funct7: Some(0b0010000), rs2_fixed: None, execute: exec::fsgnj_s },
        Row { mnemonic: "fsgnjn.s", format: Format::R, opcode: OP_FP, funct3: Some(0b001), funct7: Some(0b0010000), rs2_fixed: None, execute: exec::fsgnjn_s },
        Row { mnemonic: "fsgnjx.s", format: Format::R, opcode: OP_FP, funct3: Some(0b010), funct7: Some(0b0010000), rs2_fixed: None, execute: exec::fsgnjx_s },
        Row { mnemonic: "fmin.s", format: Format::R, opcode: OP_FP, funct3: Some(0b000), funct7: Some(0b0010100), rs2_fixed: None, execute: exec::fmin_s },
        Row { mnemonic: "fmax.s", format: Format::R, opcode: OP_FP, funct3: Some(0b001), funct7: Some(0b0010100), rs2_fixed: None, execute: exec::fmax_s },
        // comparisons
        Row { mnemonic: "feq.s", format: Format::R, opcode: OP_FP, funct3: Some(0b010), funct7: Some(0b1010000), rs2_fixed: None, execute: exec::feq_s },
        Row { mnemonic: "flt.s", format: Format::R, opcode: OP_FP, funct3: Some(0b001), funct7: Some(0b1010000), rs2_fixed: None, execute: exec::flt_s },
        Row { mnemonic: "fle.s", format: Format::R, opcode: OP_FP, funct3: Some(0b000), funct7: Some(0b1010000), rs2_fixed: None, execute: exec::fle_s },
        // conversions and moves: `rs2` is a fixed selector, not an operand,
        // so it folds into the dispatch key alongside `funct7`.
        Row { mnemonic: "fcvt.w.s", format: Format::R, opcode: OP_FP, funct3: None, funct7: Some(0b1100000), rs2_fixed: Some(0), execute: exec::fcvt_w_s },
        Row { mnemonic: "fcvt.wu.s", format: Format::R, opcode: OP_FP, funct3: None, funct7: Some(0b1100000), rs2_fixed: Some(1), execute: exec::fcvt_wu_s },
        Row { mnemonic: "fcvt.s.w", format: Format::R, opcode: OP_FP, funct3: None, funct7: Some(0b1101000), rs2_fixed: Some(0), execute: exec::fcvt_s_w },
        Row { mnemonic: "fcvt.s.wu", format: Format::R, opcode: OP_FP, funct3: None, funct7: Some(0b1101000), rs2_fixed: Some(1), execute: exec::fcvt_s_wu },
        Row { mnemonic: "fmv.x.w", format: Format::R, opcode: OP_FP, funct3: Some(0b000), funct7: Some(0b1110000), rs2_fixed: Some(0), execute: exec::fmv_x_w },
        Row { mnemonic: "fclass.s", format: Format::R, opcode: OP_FP, funct3: Some(0b001), funct7: Some(0b1110000), rs2_fixed: Some(0), execute: exec::fclass_s },
        Row { mnemonic: "fmv.w.x", format: Format::R, opcode: OP_FP, funct3: Some(0b000), funct7: Some(0b1111000), rs2_fixed: Some(0), execute: exec::fmv_w_x },
        // R4 fused multiply-add (single precision only, one opcode each)
        Row { mnemonic: "fmadd.s", format: Format::R4, opcode: FMADD, funct3: None, funct7: None, rs2_fixed: None, execute: exec::fmadd_s },
        Row { mnemonic: "fmsub.s", format: Format::R4, opcode: FMSUB, funct3: None, funct7: None, rs2_fixed: None, execute: exec::fmsub_s },
        Row { mnemonic: "fnmsub.s", format: Format::R4, opcode: FNMSUB, funct3: None, funct7: None, rs2_fixed: None, execute: exec::fnmsub_s },
        Row { mnemonic: "fnmadd.s", format: Format::R4, opcode: FNMADD, funct3: None, funct7: None, rs2_fixed: None, execute: exec::fnmadd_s },
    ];

    for row in rows {
        registry.register(InstructionDef {
            mnemonic: row.mnemonic,
            format: row.format,
            opcode: row.opcode,
            funct3: row.funct3,
            funct7: row.funct7,
            rs2_fixed: row.rs2_fixed,
            execute: row.execute,
        });
    }
}
