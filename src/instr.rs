//! Instruction record and textual parser
//!
//! Converts a single assembly-source line into a structured
//! [`Instr`]. The record's typed fields double as the
//! canonical argument vector: each handler in the execution engine
//! reads exactly the fields its category defines, in the order the
//! category's operand list names them.

use crate::opcodes::{Category, Mnemonic};
use crate::registers;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    pub mnemonic: Mnemonic,
    pub rs: Option<u8>,
    pub rt: Option<u8>,
    pub rd: Option<u8>,
    pub shamt: Option<u8>,
    /// 16-bit raw bit pattern; signedness is imposed at the use site.
    pub imm: Option<u16>,
    /// 26-bit raw bit pattern.
    pub target: Option<u32>,
}

impl Instr {
    fn empty(mnemonic: Mnemonic) -> Self {
        Instr {
            mnemonic,
            rs: None,
            rt: None,
            rd: None,
            shamt: None,
            imm: None,
            target: None,
        }
    }

    pub fn c0(mnemonic: Mnemonic) -> Self {
        Self::empty(mnemonic)
    }

    pub fn c1(mnemonic: Mnemonic, rd: u8, rs: u8, rt: u8) -> Self {
        Instr {
            rd: Some(rd),
            rs: Some(rs),
            rt: Some(rt),
            ..Self::empty(mnemonic)
        }
    }

    pub fn c2(mnemonic: Mnemonic, rd: u8, rt: u8, rs: u8) -> Self {
        Instr {
            rd: Some(rd),
            rt: Some(rt),
            rs: Some(rs),
            ..Self::empty(mnemonic)
        }
    }

    pub fn c3(mnemonic: Mnemonic, rd: u8, rt: u8, shamt: u8) -> Self {
        Instr {
            rd: Some(rd),
            rt: Some(rt),
            shamt: Some(shamt),
            ..Self::empty(mnemonic)
        }
    }

    pub fn c4(mnemonic: Mnemonic, rt: u8, rs: u8, imm: u16) -> Self {
        Instr {
            rt: Some(rt),
            rs: Some(rs),
            imm: Some(imm),
            ..Self::empty(mnemonic)
        }
    }

    /// Same field shape as `c4`; kept as a distinct constructor because
    /// the syntax (`rt, offset(rs)`) differs.
    pub fn c5(mnemonic: Mnemonic, rt: u8, rs: u8, offset: u16) -> Self {
        Self::c4(mnemonic, rt, rs, offset)
    }

    pub fn c6(mnemonic: Mnemonic, rs: u8) -> Self {
        Instr {
            rs: Some(rs),
            ..Self::empty(mnemonic)
        }
    }

    pub fn c7(mnemonic: Mnemonic, target: u32) -> Self {
        Instr {
            target: Some(target),
            ..Self::empty(mnemonic)
        }
    }

    pub fn c8(mnemonic: Mnemonic, rs: u8, rt: u8) -> Self {
        Instr {
            rs: Some(rs),
            rt: Some(rt),
            ..Self::empty(mnemonic)
        }
    }

    pub fn c9(mnemonic: Mnemonic, rd: u8) -> Self {
        Instr {
            rd: Some(rd),
            ..Self::empty(mnemonic)
        }
    }

    pub fn c10(mnemonic: Mnemonic, rt: u8, imm: u16) -> Self {
        Instr {
            rt: Some(rt),
            imm: Some(imm),
            ..Self::empty(mnemonic)
        }
    }

    pub fn c11(mnemonic: Mnemonic, rs: u8, offset: u16) -> Self {
        Instr {
            rs: Some(rs),
            imm: Some(offset),
            ..Self::empty(mnemonic)
        }
    }

    pub fn c12(mnemonic: Mnemonic, rs: u8, rt: u8, offset: u16) -> Self {
        Instr {
            rs: Some(rs),
            rt: Some(rt),
            imm: Some(offset),
            ..Self::empty(mnemonic)
        }
    }
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let op = self.mnemonic.name();
        let r = |i: u8| format!("${}", registers::name_of(i));
        match self.mnemonic.category() {
            Category::C0 => write!(f, "{op}"),
            Category::C1 => write!(
                f,
                "{op} {}, {}, {}",
                r(self.rd.unwrap()),
                r(self.rs.unwrap()),
                r(self.rt.unwrap())
            ),
            Category::C2 => write!(
                f,
                "{op} {}, {}, {}",
                r(self.rd.unwrap()),
                r(self.rt.unwrap()),
                r(self.rs.unwrap())
            ),
            Category::C3 => write!(
                f,
                "{op} {}, {}, {}",
                r(self.rd.unwrap()),
                r(self.rt.unwrap()),
                self.shamt.unwrap()
            ),
            Category::C4 => write!(
                f,
                "{op} {}, {}, {}",
                r(self.rt.unwrap()),
                r(self.rs.unwrap()),
                self.imm.unwrap()
            ),
            Category::C5 => write!(
                f,
                "{op} {}, {}({})",
                r(self.rt.unwrap()),
                self.imm.unwrap(),
                r(self.rs.unwrap())
            ),
            Category::C6 => write!(f, "{op} {}", r(self.rs.unwrap())),
            Category::C7 => write!(f, "{op} {}", self.target.unwrap()),
            Category::C8 => write!(f, "{op} {}, {}", r(self.rs.unwrap()), r(self.rt.unwrap())),
            Category::C9 => write!(f, "{op} {}", r(self.rd.unwrap())),
            Category::C10 => write!(f, "{op} {}, {}", r(self.rt.unwrap()), self.imm.unwrap()),
            Category::C11 => write!(f, "{op} {}, {}", r(self.rs.unwrap()), self.imm.unwrap()),
            Category::C12 => write!(
                f,
                "{op} {}, {}, {}",
                r(self.rs.unwrap()),
                r(self.rt.unwrap()),
                self.imm.unwrap()
            ),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),
    #[error("'{mnemonic}' expects {expected} operands, got {got}")]
    WrongArity {
        mnemonic: String,
        expected: usize,
        got: usize,
    },
    #[error("unknown register name '{0}'")]
    UnknownRegister(String),
    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),
}

fn tokenize(line: &str) -> Vec<&str> {
    line.split(|c: char| c == ',' || c == '$' || c == '(' || c == ')' || c.is_whitespace())
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_reg(tok: &str) -> Result<u8, ParseError> {
    registers::index_of(tok).ok_or_else(|| ParseError::UnknownRegister(tok.to_string()))
}

fn parse_number(tok: &str) -> Result<i64, ParseError> {
    if let Some(hex) = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map(|v| v as i64)
            .map_err(|_| ParseError::InvalidNumber(tok.to_string()))
    } else {
        tok.parse::<i64>()
            .map_err(|_| ParseError::InvalidNumber(tok.to_string()))
    }
}

fn narrow(value: i64, bits: u32) -> u64 {
    (value as u64) & ((1u64 << bits) - 1)
}

fn parse_imm16(tok: &str) -> Result<u16, ParseError> {
    Ok(narrow(parse_number(tok)?, 16) as u16)
}

fn parse_shamt5(tok: &str) -> Result<u8, ParseError> {
    Ok(narrow(parse_number(tok)?, 5) as u8)
}

fn parse_target26(tok: &str) -> Result<u32, ParseError> {
    Ok(narrow(parse_number(tok)?, 26) as u32)
}

fn check_arity(mnemonic: Mnemonic, operands: &[&str], expected: usize) -> Result<(), ParseError> {
    if operands.len() != expected {
        Err(ParseError::WrongArity {
            mnemonic: mnemonic.name().to_string(),
            expected,
            got: operands.len(),
        })
    } else {
        Ok(())
    }
}

/// Parse one non-empty assembly source line (comments and surrounding
/// whitespace already stripped by the caller) into a structured
/// instruction record.
pub fn parse_line(line: &str) -> Result<Instr, ParseError> {
    let tokens = tokenize(line);
    let (op_tok, operands) = tokens
        .split_first()
        .ok_or_else(|| ParseError::UnknownMnemonic(line.to_string()))?;
    let mnemonic = Mnemonic::from_name(op_tok)
        .ok_or_else(|| ParseError::UnknownMnemonic(op_tok.to_string()))?;

    match mnemonic.category() {
        Category::C0 => {
            check_arity(mnemonic, operands, 0)?;
            Ok(Instr::c0(mnemonic))
        }
        Category::C1 => {
            check_arity(mnemonic, operands, 3)?;
            Ok(Instr::c1(
                mnemonic,
                parse_reg(operands[0])?,
                parse_reg(operands[1])?,
                parse_reg(operands[2])?,
            ))
        }
        Category::C2 => {
            check_arity(mnemonic, operands, 3)?;
            Ok(Instr::c2(
                mnemonic,
                parse_reg(operands[0])?,
                parse_reg(operands[1])?,
                parse_reg(operands[2])?,
            ))
        }
        Category::C3 => {
            check_arity(mnemonic, operands, 3)?;
            Ok(Instr::c3(
                mnemonic,
                parse_reg(operands[0])?,
                parse_reg(operands[1])?,
                parse_shamt5(operands[2])?,
            ))
        }
        Category::C4 => {
            check_arity(mnemonic, operands, 3)?;
            Ok(Instr::c4(
                mnemonic,
                parse_reg(operands[0])?,
                parse_reg(operands[1])?,
                parse_imm16(operands[2])?,
            ))
        }
        Category::C5 => {
            check_arity(mnemonic, operands, 3)?;
            Ok(Instr::c5(
                mnemonic,
                parse_reg(operands[0])?,
                parse_reg(operands[2])?,
                parse_imm16(operands[1])?,
            ))
        }
        Category::C6 => {
            check_arity(mnemonic, operands, 1)?;
            Ok(Instr::c6(mnemonic, parse_reg(operands[0])?))
        }
        Category::C7 => {
            check_arity(mnemonic, operands, 1)?;
            Ok(Instr::c7(mnemonic, parse_target26(operands[0])?))
        }
        Category::C8 => {
            check_arity(mnemonic, operands, 2)?;
            Ok(Instr::c8(
                mnemonic,
                parse_reg(operands[0])?,
                parse_reg(operands[1])?,
            ))
        }
        Category::C9 => {
            check_arity(mnemonic, operands, 1)?;
            Ok(Instr::c9(mnemonic, parse_reg(operands[0])?))
        }
        Category::C10 => {
            check_arity(mnemonic, operands, 2)?;
            Ok(Instr::c10(
                mnemonic,
                parse_reg(operands[0])?,
                parse_imm16(operands[1])?,
            ))
        }
        Category::C11 => {
            check_arity(mnemonic, operands, 2)?;
            Ok(Instr::c11(
                mnemonic,
                parse_reg(operands[0])?,
                parse_imm16(operands[1])?,
            ))
        }
        Category::C12 => {
            check_arity(mnemonic, operands, 3)?;
            Ok(Instr::c12(
                mnemonic,
                parse_reg(operands[0])?,
                parse_reg(operands[1])?,
                parse_imm16(operands[2])?,
            ))
        }
    }
}
