//! Decoder
//!
//! Converts a 32-bit instruction word into a structured [`Instr`],
//! the inverse of [`crate::encode::encode`] for well-formed words.
//! Dispatch is a single `match` over the primary opcode
//! (and, for opcode 0/1, the function code / REGIMM rt sub-code) — a
//! tagged-variant switch rather than a dictionary of decoder closures.

use crate::instr::Instr;
use crate::opcodes::{self, Mnemonic::*};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unmapped primary opcode 0b{0:06b}")]
    InvalidOpcode(u8),
    #[error("unmapped function code 0b{0:06b}")]
    InvalidFunct(u8),
    #[error("unmapped REGIMM rt sub-code 0b{0:05b}")]
    InvalidRegimmRt(u8),
}

fn field(word: u32, end: u32, start: u32) -> u32 {
    let mask = (1u64 << (end - start + 1)) - 1;
    ((word as u64 >> start) & mask) as u32
}

fn opcode6(word: u32) -> u8 {
    field(word, 31, 26) as u8
}
fn rs(word: u32) -> u8 {
    field(word, 25, 21) as u8
}
fn rt(word: u32) -> u8 {
    field(word, 20, 16) as u8
}
fn rd(word: u32) -> u8 {
    field(word, 15, 11) as u8
}
fn shamt(word: u32) -> u8 {
    field(word, 10, 6) as u8
}
fn funct6(word: u32) -> u8 {
    field(word, 5, 0) as u8
}
fn imm16(word: u32) -> u16 {
    field(word, 15, 0) as u16
}
fn target26(word: u32) -> u32 {
    field(word, 25, 0)
}

/// Decode a 32-bit instruction word.
pub fn decode(word: u32) -> Result<Instr, DecodeError> {
    if word == 0 {
        return Ok(Instr::c0(Noop));
    }

    let opcode = opcode6(word);

    if opcode == 0 {
        let funct = funct6(word);
        let mnemonic =
            opcodes::from_funct6(funct).ok_or(DecodeError::InvalidFunct(funct))?;
        return Ok(match mnemonic {
            Sll | Sra | Srl => Instr::c3(mnemonic, rd(word), rt(word), shamt(word)),
            Jr => Instr::c6(mnemonic, rs(word)),
            Mfhi | Mflo => Instr::c9(mnemonic, rd(word)),
            Mult | Multu | Div | Divu => Instr::c8(mnemonic, rs(word), rt(word)),
            Syscall => Instr::c0(mnemonic),
            // Add, Addu, And, Or, Slt, Sltu, Sub, Subu, Xor, Sllv, Srlv
            _ => Instr::c1(mnemonic, rd(word), rs(word), rt(word)),
        });
    }

    if opcode == 1 {
        let rt_sub = rt(word);
        let mnemonic = opcodes::from_regimm_rt5(rt_sub)
            .ok_or(DecodeError::InvalidRegimmRt(rt_sub))?;
        return Ok(Instr::c11(mnemonic, rs(word), imm16(word)));
    }

    let mnemonic = opcodes::from_opcode6(opcode).ok_or(DecodeError::InvalidOpcode(opcode))?;
    Ok(match mnemonic {
        J | Jal => Instr::c7(mnemonic, target26(word)),
        Lui => Instr::c10(mnemonic, rt(word), imm16(word)),
        Blez | Bgtz => Instr::c11(mnemonic, rs(word), imm16(word)),
        Lb | Lw | Sb | Sw => Instr::c5(mnemonic, rt(word), rs(word), imm16(word)),
        Beq | Bne => Instr::c12(mnemonic, rs(word), rt(word), imm16(word)),
        // Addi, Addiu, Andi, Ori, Slti, Sltiu, Xori
        _ => Instr::c4(mnemonic, rt(word), rs(word), imm16(word)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::instr::{parse_line, Instr};
    use crate::opcodes::{Mnemonic as M, ALL};

    #[test]
    fn decode_zero_is_noop() {
        assert_eq!(decode(0).unwrap(), Instr::c0(M::Noop));
    }

    #[test]
    fn decode_add_matches_parser() {
        let word = 0x02328020;
        let decoded = decode(word).unwrap();
        let parsed = parse_line("add $s0, $s1, $s2").unwrap();
        assert_eq!(decoded, parsed);
    }

    #[test]
    fn invalid_funct_errors() {
        // opcode 0, funct 0b111111 is unmapped
        let word = 0b111111;
        assert_eq!(decode(word), Err(DecodeError::InvalidFunct(0b111111)));
    }

    #[test]
    fn invalid_opcode_errors() {
        // opcode 0b111111 is never assigned
        let word = 0b111111u32 << 26;
        assert_eq!(decode(word), Err(DecodeError::InvalidOpcode(0b111111)));
    }

    #[test]
    fn invalid_regimm_rt_errors() {
        // opcode 1, rt sub-code 0b00010 is unmapped
        let word = (1u32 << 26) | (0b00010 << 16);
        assert_eq!(decode(word), Err(DecodeError::InvalidRegimmRt(0b00010)));
    }

    /// decode(encode(i)) == i for a representative instruction of
    /// every mnemonic.
    #[test]
    fn roundtrip_representative_instructions() {
        let lines = [
            "add $t0, $t1, $t2",
            "addu $t0, $t1, $t2",
            "and $t0, $t1, $t2",
            "or $t0, $t1, $t2",
            "slt $t0, $t1, $t2",
            "sltu $t0, $t1, $t2",
            "sub $t0, $t1, $t2",
            "subu $t0, $t1, $t2",
            "xor $t0, $t1, $t2",
            "sllv $t0, $t1, $t2",
            "srlv $t0, $t1, $t2",
            "sll $t0, $t1, 4",
            "sra $t0, $t1, 4",
            "srl $t0, $t1, 4",
            "addi $t0, $t1, 5",
            "addiu $t0, $t1, 5",
            "andi $t0, $t1, 5",
            "ori $t0, $t1, 5",
            "slti $t0, $t1, 5",
            "sltiu $t0, $t1, 5",
            "xori $t0, $t1, 5",
            "lb $t0, 4($t1)",
            "lw $t0, 4($t1)",
            "sb $t0, 4($t1)",
            "sw $t0, 4($t1)",
            "jr $t0",
            "j 100",
            "jal 100",
            "div $t0, $t1",
            "divu $t0, $t1",
            "mult $t0, $t1",
            "multu $t0, $t1",
            "mfhi $t0",
            "mflo $t0",
            "lui $t0, 5",
            "bgez $t0, 5",
            "bgezal $t0, 5",
            "bgtz $t0, 5",
            "blez $t0, 5",
            "bltz $t0, 5",
            "bltzal $t0, 5",
            "beq $t0, $t1, 5",
            "bne $t0, $t1, 5",
            "noop",
            "syscall",
        ];
        assert_eq!(lines.len(), ALL.len());
        for line in lines {
            let parsed = parse_line(line).unwrap();
            let word = encode(&parsed);
            let decoded = decode(word).unwrap();
            assert_eq!(decoded, parsed, "roundtrip failed for {line}");
            assert_eq!(encode(&decoded), word);
        }
    }
}
