//! Opcode catalog
//!
//! Closed enumeration of the 45 supported mnemonics with their field
//! encodings (primary opcode, function code, REGIMM rt sub-code) and
//! syntactic category. Values are the standard MIPS32 field encodings;
//! self-consistency (injective function-code and REGIMM-rt tables) is
//! checked by unit tests below rather than at runtime, since the tables
//! are `const` data baked in at compile time.

/// One of the 45 supported mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Add,
    Addi,
    Addiu,
    Addu,
    And,
    Andi,
    Beq,
    Bgez,
    Bgezal,
    Bgtz,
    Blez,
    Bltz,
    Bltzal,
    Bne,
    Div,
    Divu,
    J,
    Jal,
    Jr,
    Lb,
    Lui,
    Lw,
    Mfhi,
    Mflo,
    Mult,
    Multu,
    Noop,
    Or,
    Ori,
    Sb,
    Sll,
    Sllv,
    Slt,
    Slti,
    Sltiu,
    Sltu,
    Sra,
    Srl,
    Srlv,
    Sub,
    Subu,
    Sw,
    Syscall,
    Xor,
    Xori,
}

/// The operand-shape group a mnemonic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// No operands: NOOP, SYSCALL
    C0,
    /// `op rd, rs, rt`
    C1,
    /// `op rd, rt, rs`
    C2,
    /// `op rd, rt, shamt`
    C3,
    /// `op rt, rs, imm`
    C4,
    /// `op rt, offset(rs)`
    C5,
    /// `op rs`
    C6,
    /// `op target`
    C7,
    /// `op rs, rt`
    C8,
    /// `op rd`
    C9,
    /// `op rt, imm`
    C10,
    /// `op rs, offset`
    C11,
    /// `op rs, rt, offset`
    C12,
}

use Mnemonic::*;

/// All 45 mnemonics, used for exhaustive self-consistency checks.
pub const ALL: [Mnemonic; 45] = [
    Add, Addi, Addiu, Addu, And, Andi, Beq, Bgez, Bgezal, Bgtz, Blez, Bltz, Bltzal, Bne, Div,
    Divu, J, Jal, Jr, Lb, Lui, Lw, Mfhi, Mflo, Mult, Multu, Noop, Or, Ori, Sb, Sll, Sllv, Slt,
    Slti, Sltiu, Sltu, Sra, Srl, Srlv, Sub, Subu, Sw, Syscall, Xor, Xori,
];

impl Mnemonic {
    /// The mnemonic's lowercase textual name, as it appears in source.
    pub fn name(self) -> &'static str {
        match self {
            Add => "add",
            Addi => "addi",
            Addiu => "addiu",
            Addu => "addu",
            And => "and",
            Andi => "andi",
            Beq => "beq",
            Bgez => "bgez",
            Bgezal => "bgezal",
            Bgtz => "bgtz",
            Blez => "blez",
            Bltz => "bltz",
            Bltzal => "bltzal",
            Bne => "bne",
            Div => "div",
            Divu => "divu",
            J => "j",
            Jal => "jal",
            Jr => "jr",
            Lb => "lb",
            Lui => "lui",
            Lw => "lw",
            Mfhi => "mfhi",
            Mflo => "mflo",
            Mult => "mult",
            Multu => "multu",
            Noop => "noop",
            Or => "or",
            Ori => "ori",
            Sb => "sb",
            Sll => "sll",
            Sllv => "sllv",
            Slt => "slt",
            Slti => "slti",
            Sltiu => "sltiu",
            Sltu => "sltu",
            Sra => "sra",
            Srl => "srl",
            Srlv => "srlv",
            Sub => "sub",
            Subu => "subu",
            Sw => "sw",
            Syscall => "syscall",
            Xor => "xor",
            Xori => "xori",
        }
    }

    /// Look up a mnemonic from its textual name.
    pub fn from_name(name: &str) -> Option<Mnemonic> {
        ALL.iter().find(|m| m.name() == name).copied()
    }

    pub fn category(self) -> Category {
        match self {
            Noop | Syscall => Category::C0,
            Add | Addu | And | Or | Slt | Sltu | Sub | Subu | Xor => Category::C1,
            Sllv | Srlv => Category::C2,
            Sll | Sra | Srl => Category::C3,
            Addi | Addiu | Andi | Ori | Slti | Sltiu | Xori => Category::C4,
            Lb | Lw | Sb | Sw => Category::C5,
            Jr => Category::C6,
            J | Jal => Category::C7,
            Div | Divu | Mult | Multu => Category::C8,
            Mfhi | Mflo => Category::C9,
            Lui => Category::C10,
            Bgez | Bgezal | Bgtz | Blez | Bltz | Bltzal => Category::C11,
            Beq | Bne => Category::C12,
        }
    }

    /// The 6-bit primary opcode field.
    pub fn opcode6(self) -> u8 {
        match self {
            Add | Addu | And | Div | Divu | Jr | Mfhi | Mflo | Mult | Multu | Noop | Or | Sll
            | Sllv | Slt | Sltu | Sra | Srl | Srlv | Sub | Subu | Syscall | Xor => 0b000000,
            Bgez | Bgezal | Bltz | Bltzal => 0b000001,
            J => 0b000010,
            Jal => 0b000011,
            Beq => 0b000100,
            Bne => 0b000101,
            Blez => 0b000110,
            Bgtz => 0b000111,
            Addi => 0b001000,
            Addiu => 0b001001,
            Slti => 0b001010,
            Sltiu => 0b001011,
            Andi => 0b001100,
            Ori => 0b001101,
            Xori => 0b001110,
            Lui => 0b001111,
            Lb => 0b100000,
            Lw => 0b100011,
            Sb => 0b101000,
            Sw => 0b101011,
        }
    }

    /// The 6-bit function field, for mnemonics whose primary opcode is
    /// 0 (excluding NOOP, which is decoded/encoded as the all-zero word
    /// before the function-code table is ever consulted).
    pub fn funct6(self) -> Option<u8> {
        match self {
            Sll => Some(0x00),
            Srl => Some(0x02),
            Sra => Some(0x03),
            Sllv => Some(0x04),
            Srlv => Some(0x06),
            Jr => Some(0x08),
            Syscall => Some(0x0c),
            Mfhi => Some(0x10),
            Mflo => Some(0x12),
            Mult => Some(0x18),
            Multu => Some(0x19),
            Div => Some(0x1a),
            Divu => Some(0x1b),
            Add => Some(0x20),
            Addu => Some(0x21),
            Sub => Some(0x22),
            Subu => Some(0x23),
            And => Some(0x24),
            Or => Some(0x25),
            Xor => Some(0x26),
            Slt => Some(0x2a),
            Sltu => Some(0x2b),
            _ => None,
        }
    }

    /// The 5-bit rt sub-code, for the REGIMM mnemonics (primary opcode
    /// 1).
    pub fn regimm_rt5(self) -> Option<u8> {
        match self {
            Bltz => Some(0b00000),
            Bgez => Some(0b00001),
            Bltzal => Some(0b10000),
            Bgezal => Some(0b10001),
            _ => None,
        }
    }
}

/// Inverse lookup: primary opcode -> mnemonic, valid only when the
/// opcode alone determines the mnemonic (i.e. not opcode 0 or 1, which
/// require the function code or REGIMM rt sub-code respectively).
pub fn from_opcode6(opcode: u8) -> Option<Mnemonic> {
    match opcode {
        0b000010 => Some(J),
        0b000011 => Some(Jal),
        0b000100 => Some(Beq),
        0b000101 => Some(Bne),
        0b000110 => Some(Blez),
        0b000111 => Some(Bgtz),
        0b001000 => Some(Addi),
        0b001001 => Some(Addiu),
        0b001010 => Some(Slti),
        0b001011 => Some(Sltiu),
        0b001100 => Some(Andi),
        0b001101 => Some(Ori),
        0b001110 => Some(Xori),
        0b001111 => Some(Lui),
        0b100000 => Some(Lb),
        0b100011 => Some(Lw),
        0b101000 => Some(Sb),
        0b101011 => Some(Sw),
        _ => None,
    }
}

/// Inverse lookup: function code -> mnemonic, valid when the primary
/// opcode is 0.
pub fn from_funct6(funct: u8) -> Option<Mnemonic> {
    match funct {
        0x00 => Some(Sll),
        0x02 => Some(Srl),
        0x03 => Some(Sra),
        0x04 => Some(Sllv),
        0x06 => Some(Srlv),
        0x08 => Some(Jr),
        0x0c => Some(Syscall),
        0x10 => Some(Mfhi),
        0x12 => Some(Mflo),
        0x18 => Some(Mult),
        0x19 => Some(Multu),
        0x1a => Some(Div),
        0x1b => Some(Divu),
        0x20 => Some(Add),
        0x21 => Some(Addu),
        0x22 => Some(Sub),
        0x23 => Some(Subu),
        0x24 => Some(And),
        0x25 => Some(Or),
        0x26 => Some(Xor),
        0x2a => Some(Slt),
        0x2b => Some(Sltu),
        _ => None,
    }
}

/// Inverse lookup: REGIMM rt sub-code -> mnemonic, valid when the
/// primary opcode is 1.
pub fn from_regimm_rt5(rt: u8) -> Option<Mnemonic> {
    match rt {
        0b00000 => Some(Bltz),
        0b00001 => Some(Bgez),
        0b10000 => Some(Bltzal),
        0b10001 => Some(Bgezal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_is_exhaustive_and_distinct() {
        let set: HashSet<_> = ALL.iter().collect();
        assert_eq!(set.len(), ALL.len());
        assert_eq!(ALL.len(), 45);
    }

    #[test]
    fn funct6_table_is_injective() {
        let codes: Vec<u8> = ALL.iter().filter_map(|m| m.funct6()).collect();
        let set: HashSet<_> = codes.iter().collect();
        assert_eq!(set.len(), codes.len());
    }

    #[test]
    fn regimm_rt5_table_is_injective() {
        let codes: Vec<u8> = ALL.iter().filter_map(|m| m.regimm_rt5()).collect();
        let set: HashSet<_> = codes.iter().collect();
        assert_eq!(set.len(), codes.len());
    }

    #[test]
    fn name_roundtrip() {
        for m in ALL {
            assert_eq!(Mnemonic::from_name(m.name()), Some(m));
        }
    }

    #[test]
    fn opcode_inverse_lookup_agrees() {
        for m in ALL {
            if m.opcode6() != 0 && m.opcode6() != 1 {
                assert_eq!(from_opcode6(m.opcode6()), Some(m));
            }
        }
    }

    #[test]
    fn funct_inverse_lookup_agrees() {
        for m in ALL {
            if let Some(funct) = m.funct6() {
                assert_eq!(from_funct6(funct), Some(m));
            }
        }
    }

    #[test]
    fn regimm_inverse_lookup_agrees() {
        for m in ALL {
            if let Some(rt) = m.regimm_rt5() {
                assert_eq!(from_regimm_rt5(rt), Some(m));
            }
        }
    }
}
