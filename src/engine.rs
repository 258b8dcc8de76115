//! Execution engine
//!
//! `Processor` owns all architectural state and implements the
//! fetch-decode-execute loop and the per-opcode semantic handlers of
//! §4.7. Dispatch is a single `match` over the decoded mnemonic, not a
//! table of bound handler closures (§9 Design Notes).

use crate::decode::{decode, DecodeError};
use crate::instr::Instr;
use crate::memory::{Memory, MemoryError};
use crate::opcodes::Mnemonic::*;
use crate::registers::{RegisterError, RegisterFile};
use thiserror::Error;

/// A condition that aborts the current step and is surfaced to the
/// caller of the fetch/decode/execute loop.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Trap {
    #[error("signed arithmetic overflow")]
    IntegerOverflow,
    #[error("misaligned memory or jump address")]
    AddressError,
    #[error("software interrupt (syscall)")]
    SoftwareInterrupt,
    #[error("illegal instruction: {0}")]
    IllegalInstruction(#[from] DecodeError),
    #[error("memory access error: {0}")]
    Memory(#[from] MemoryError),
    #[error("register access error: {0}")]
    Register(#[from] RegisterError),
}

fn sign_extend16(imm: u16) -> u32 {
    imm as i16 as i32 as u32
}

/// MIPS32 (subset) processor state: register file, HI/LO, program
/// counter, and byte-addressed memory. Exception-support scratch
/// (`epc`, `cause`, `badvaddr`, `status`) is allocated but never
/// populated in this subset (§3).
#[derive(Debug, Default)]
pub struct Processor {
    pub reg: RegisterFile,
    pub hi: u32,
    pub lo: u32,
    pub pc: u32,
    pub mem: Memory,
    pub epc: u32,
    pub cause: u32,
    pub badvaddr: u32,
    pub status: u32,
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory_capacity(capacity: usize) -> Self {
        Processor {
            mem: Memory::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Copy `bytes` into memory starting at `start_addr`.
    pub fn load_program(&mut self, start_addr: u32, bytes: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(start_addr, bytes)
    }

    /// Set `pc := entry` and run fetch/decode/execute until `max_instr`
    /// steps elapse, or unboundedly if `max_instr < 0`.
    pub fn execute_prog(&mut self, entry: u32, max_instr: i64) -> Result<(), Trap> {
        self.pc = entry;
        let mut executed: i64 = 0;
        while max_instr < 0 || executed < max_instr {
            self.step()?;
            executed += 1;
        }
        Ok(())
    }

    /// Fetch the word at `pc`, decode it, and execute the matching
    /// handler. Returns the trap (if any) that aborted the step.
    pub fn step(&mut self) -> Result<(), Trap> {
        let word = self.mem.read_word(self.pc)?;
        let instr = decode(word)?;
        self.execute(&instr)
    }

    fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    fn execute(&mut self, instr: &Instr) -> Result<(), Trap> {
        match instr.mnemonic {
            Noop => {
                self.advance();
                Ok(())
            }
            Syscall => {
                self.advance();
                Err(Trap::SoftwareInterrupt)
            }

            Add => self.exec_add_trapping(instr, i32::checked_add),
            Sub => self.exec_add_trapping(instr, i32::checked_sub),
            Addu => self.exec_wrapping_reg(instr, u32::wrapping_add),
            Subu => self.exec_wrapping_reg(instr, u32::wrapping_sub),

            Addi => self.exec_addi_trapping(instr),
            Addiu => {
                let rs = self.reg.get(instr.rs.unwrap())?;
                let value = rs.wrapping_add(sign_extend16(instr.imm.unwrap()));
                self.reg.set(instr.rt.unwrap(), value)?;
                self.advance();
                Ok(())
            }

            And => self.exec_bitwise_reg(instr, |a, b| a & b),
            Or => self.exec_bitwise_reg(instr, |a, b| a | b),
            Xor => self.exec_bitwise_reg(instr, |a, b| a ^ b),

            Andi => self.exec_bitwise_imm(instr, |a, b| a & b),
            Ori => self.exec_bitwise_imm(instr, |a, b| a | b),
            Xori => self.exec_bitwise_imm(instr, |a, b| a ^ b),

            Sll => self.exec_shift_literal(instr, |v, s| v << s),
            Srl => self.exec_shift_literal(instr, |v, s| v >> s),
            Sra => self.exec_shift_literal(instr, |v, s| ((v as i32) >> s) as u32),

            Sllv => self.exec_shift_variable(instr, |v, s| v << s),
            Srlv => self.exec_shift_variable(instr, |v, s| v >> s),

            Slt => {
                let rs = self.reg.get(instr.rs.unwrap())? as i32;
                let rt = self.reg.get(instr.rt.unwrap())? as i32;
                self.reg.set(instr.rd.unwrap(), (rs < rt) as u32)?;
                self.advance();
                Ok(())
            }
            Sltu => {
                let rs = self.reg.get(instr.rs.unwrap())?;
                let rt = self.reg.get(instr.rt.unwrap())?;
                self.reg.set(instr.rd.unwrap(), (rs < rt) as u32)?;
                self.advance();
                Ok(())
            }
            Slti => {
                let rs = self.reg.get(instr.rs.unwrap())? as i32;
                let imm = sign_extend16(instr.imm.unwrap()) as i32;
                self.reg.set(instr.rt.unwrap(), (rs < imm) as u32)?;
                self.advance();
                Ok(())
            }
            Sltiu => {
                let rs = self.reg.get(instr.rs.unwrap())?;
                let imm = sign_extend16(instr.imm.unwrap());
                self.reg.set(instr.rt.unwrap(), (rs < imm) as u32)?;
                self.advance();
                Ok(())
            }

            Mult => {
                let rs = self.reg.get(instr.rs.unwrap())? as i32 as i64;
                let rt = self.reg.get(instr.rt.unwrap())? as i32 as i64;
                let product = (rs * rt) as u64;
                self.hi = (product >> 32) as u32;
                self.lo = product as u32;
                self.advance();
                Ok(())
            }
            Multu => {
                let rs = self.reg.get(instr.rs.unwrap())? as u64;
                let rt = self.reg.get(instr.rt.unwrap())? as u64;
                let product = rs * rt;
                self.hi = (product >> 32) as u32;
                self.lo = product as u32;
                self.advance();
                Ok(())
            }
            Div => {
                let rs = self.reg.get(instr.rs.unwrap())? as i32;
                let rt = self.reg.get(instr.rt.unwrap())? as i32;
                if rt != 0 {
                    self.lo = rs.wrapping_div(rt) as u32;
                    self.hi = rs.wrapping_rem(rt) as u32;
                }
                self.advance();
                Ok(())
            }
            Divu => {
                let rs = self.reg.get(instr.rs.unwrap())?;
                let rt = self.reg.get(instr.rt.unwrap())?;
                if let Some(quotient) = rs.checked_div(rt) {
                    self.lo = quotient;
                    self.hi = rs % rt;
                }
                self.advance();
                Ok(())
            }
            Mfhi => {
                self.reg.set(instr.rd.unwrap(), self.hi)?;
                self.advance();
                Ok(())
            }
            Mflo => {
                self.reg.set(instr.rd.unwrap(), self.lo)?;
                self.advance();
                Ok(())
            }

            Lb => {
                let addr = self.effective_address(instr)?;
                let byte = self.mem.read_byte(addr)?;
                self.reg.set(instr.rt.unwrap(), byte as i8 as i32 as u32)?;
                self.advance();
                Ok(())
            }
            Lw => {
                let addr = self.effective_address(instr)?;
                let word = self.mem.read_word(addr)?;
                self.reg.set(instr.rt.unwrap(), word)?;
                self.advance();
                Ok(())
            }
            Sb => {
                let addr = self.effective_address(instr)?;
                let value = self.reg.get(instr.rt.unwrap())? as u8;
                self.mem.write_byte(addr, value)?;
                self.advance();
                Ok(())
            }
            Sw => {
                let addr = self.effective_address(instr)?;
                if addr % 4 != 0 {
                    return Err(Trap::AddressError);
                }
                let value = self.reg.get(instr.rt.unwrap())?;
                self.mem.write_word(addr, value)?;
                self.advance();
                Ok(())
            }

            Lui => {
                let value = (instr.imm.unwrap() as u32) << 16;
                self.reg.set(instr.rt.unwrap(), value)?;
                self.advance();
                Ok(())
            }

            Beq => self.exec_branch(instr, |rs, rt| rs == rt),
            Bne => self.exec_branch(instr, |rs, rt| rs != rt),
            Bgez => self.exec_branch_zero(instr, |rs| rs >= 0, false),
            Bgtz => self.exec_branch_zero(instr, |rs| rs > 0, false),
            Blez => self.exec_branch_zero(instr, |rs| rs <= 0, false),
            Bltz => self.exec_branch_zero(instr, |rs| rs < 0, false),
            Bgezal => self.exec_branch_zero(instr, |rs| rs >= 0, true),
            Bltzal => self.exec_branch_zero(instr, |rs| rs < 0, true),

            J => {
                let target = instr.target.unwrap();
                self.pc = (self.pc & 0xf000_0000) | (target.wrapping_mul(4));
                Ok(())
            }
            Jal => {
                let target = instr.target.unwrap();
                let link = self.pc.wrapping_add(8);
                self.reg.set(31, link)?;
                self.pc = (self.pc & 0xf000_0000) | (target.wrapping_mul(4));
                Ok(())
            }
            Jr => {
                let addr = self.reg.get(instr.rs.unwrap())?;
                if addr % 4 != 0 {
                    return Err(Trap::AddressError);
                }
                self.pc = addr;
                Ok(())
            }
        }
    }

    fn effective_address(&self, instr: &Instr) -> Result<u32, Trap> {
        let base = self.reg.get(instr.rs.unwrap())?;
        Ok(base.wrapping_add(sign_extend16(instr.imm.unwrap())))
    }

    fn exec_add_trapping(
        &mut self,
        instr: &Instr,
        op: fn(i32, i32) -> Option<i32>,
    ) -> Result<(), Trap> {
        let rs = self.reg.get(instr.rs.unwrap())? as i32;
        let rt = self.reg.get(instr.rt.unwrap())? as i32;
        let value = op(rs, rt).ok_or(Trap::IntegerOverflow)?;
        self.reg.set(instr.rd.unwrap(), value as u32)?;
        self.advance();
        Ok(())
    }

    fn exec_addi_trapping(&mut self, instr: &Instr) -> Result<(), Trap> {
        let rs = self.reg.get(instr.rs.unwrap())? as i32;
        let imm = sign_extend16(instr.imm.unwrap()) as i32;
        let value = rs.checked_add(imm).ok_or(Trap::IntegerOverflow)?;
        self.reg.set(instr.rt.unwrap(), value as u32)?;
        self.advance();
        Ok(())
    }

    fn exec_wrapping_reg(&mut self, instr: &Instr, op: fn(u32, u32) -> u32) -> Result<(), Trap> {
        let rs = self.reg.get(instr.rs.unwrap())?;
        let rt = self.reg.get(instr.rt.unwrap())?;
        self.reg.set(instr.rd.unwrap(), op(rs, rt))?;
        self.advance();
        Ok(())
    }

    fn exec_bitwise_reg(&mut self, instr: &Instr, op: fn(u32, u32) -> u32) -> Result<(), Trap> {
        let rs = self.reg.get(instr.rs.unwrap())?;
        let rt = self.reg.get(instr.rt.unwrap())?;
        self.reg.set(instr.rd.unwrap(), op(rs, rt))?;
        self.advance();
        Ok(())
    }

    fn exec_bitwise_imm(&mut self, instr: &Instr, op: fn(u32, u32) -> u32) -> Result<(), Trap> {
        let rs = self.reg.get(instr.rs.unwrap())?;
        let imm = instr.imm.unwrap() as u32;
        self.reg.set(instr.rt.unwrap(), op(rs, imm))?;
        self.advance();
        Ok(())
    }

    fn exec_shift_literal(&mut self, instr: &Instr, op: fn(u32, u32) -> u32) -> Result<(), Trap> {
        let rt = self.reg.get(instr.rt.unwrap())?;
        let shamt = instr.shamt.unwrap() as u32;
        self.reg.set(instr.rd.unwrap(), op(rt, shamt))?;
        self.advance();
        Ok(())
    }

    fn exec_shift_variable(&mut self, instr: &Instr, op: fn(u32, u32) -> u32) -> Result<(), Trap> {
        let rt = self.reg.get(instr.rt.unwrap())?;
        let rs = self.reg.get(instr.rs.unwrap())?;
        self.reg.set(instr.rd.unwrap(), op(rt, rs & 0x1f))?;
        self.advance();
        Ok(())
    }

    fn exec_branch(&mut self, instr: &Instr, taken: fn(u32, u32) -> bool) -> Result<(), Trap> {
        let rs = self.reg.get(instr.rs.unwrap())?;
        let rt = self.reg.get(instr.rt.unwrap())?;
        self.advance();
        if taken(rs, rt) {
            self.branch_offset(instr.imm.unwrap());
        }
        Ok(())
    }

    fn exec_branch_zero(
        &mut self,
        instr: &Instr,
        taken: fn(i32) -> bool,
        link: bool,
    ) -> Result<(), Trap> {
        let rs = self.reg.get(instr.rs.unwrap())? as i32;
        self.advance();
        if taken(rs) {
            if link {
                self.reg.set(31, self.pc.wrapping_add(4))?;
            }
            self.branch_offset(instr.imm.unwrap());
        }
        Ok(())
    }

    fn branch_offset(&mut self, imm: u16) {
        let displacement = (sign_extend16(imm) as i32).wrapping_mul(4);
        self.pc = self.pc.wrapping_add(displacement as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::instr::parse_line;

    fn load_one(proc: &mut Processor, pc: u32, line: &str) {
        let word = encode(&parse_line(line).unwrap());
        proc.mem.write_word(pc, word).unwrap();
    }

    #[test]
    fn addi_overflow_leaves_destination_unchanged() {
        let mut p = Processor::new();
        p.reg.set(8, 0x7fff_ffff).unwrap(); // t0
        load_one(&mut p, 0, "addi $t1, $t0, 2");
        assert_eq!(p.step(), Err(Trap::IntegerOverflow));
        assert_eq!(p.reg.get(9).unwrap(), 0); // t1 unchanged
    }

    #[test]
    fn addiu_wraps_without_trap() {
        let mut p = Processor::new();
        p.reg.set(8, 0xffff_ffff).unwrap();
        load_one(&mut p, 0, "addiu $t1, $t0, 2");
        p.step().unwrap();
        assert_eq!(p.reg.get(9).unwrap(), 1);
    }

    #[test]
    fn beq_taken_advances_pc_by_branch_displacement() {
        let mut p = Processor::new();
        p.pc = 10;
        p.reg.set(8, 10).unwrap(); // t0
        p.reg.set(16, 10).unwrap(); // s0
        load_one(&mut p, 10, "beq $t0, $s0, 0x3");
        p.step().unwrap();
        assert_eq!(p.pc, 26);
    }

    #[test]
    fn sw_misaligned_traps_and_leaves_memory_unchanged() {
        let mut p = Processor::new();
        p.reg.set(17, 1).unwrap(); // s1
        load_one(&mut p, 0, "sw $s0, 0($s1)");
        let before = p.mem.read_word(0).unwrap();
        assert_eq!(p.step(), Err(Trap::AddressError));
        // word at address 1 was never written (still whatever the
        // instruction word decoded as, unrelated memory untouched)
        assert_eq!(p.mem.read_byte(1).unwrap(), 0);
        let _ = before;
    }

    #[test]
    fn lb_sign_extends() {
        let mut p = Processor::new();
        p.mem.write_byte(0x2f8, 0xa0).unwrap();
        p.reg.set(17, 0x2f8 - 4).unwrap(); // s1
        load_one(&mut p, 0, "lb $s0, 4($s1)");
        p.step().unwrap();
        assert_eq!(p.reg.get(16).unwrap() as i32, -96);
    }

    #[test]
    fn addu_never_traps_on_overflow() {
        let mut p = Processor::new();
        p.reg.set(8, 0xffff_ffff).unwrap();
        p.reg.set(9, 2).unwrap();
        load_one(&mut p, 0, "addu $t2, $t0, $t1");
        p.step().unwrap();
        assert_eq!(p.reg.get(10).unwrap(), 1);
    }

    #[test]
    fn andi_never_sets_upper_bits() {
        let mut p = Processor::new();
        p.reg.set(8, 0xffff_ffff).unwrap();
        load_one(&mut p, 0, "andi $t1, $t0, 0xff00");
        p.step().unwrap();
        assert_eq!(p.reg.get(9).unwrap(), 0x0000_ff00);
    }

    #[test]
    fn lui_zeros_low_bits() {
        let mut p = Processor::new();
        load_one(&mut p, 0, "lui $t0, 0x1234");
        p.step().unwrap();
        assert_eq!(p.reg.get(8).unwrap() & 0xffff, 0);
        assert_eq!(p.reg.get(8).unwrap(), 0x1234_0000);
    }

    #[test]
    fn sra_is_arithmetic_srl_is_logical() {
        let mut p = Processor::new();
        p.reg.set(9, 0x8000_0000).unwrap(); // t1
        load_one(&mut p, 0, "sra $t0, $t1, 4");
        p.step().unwrap();
        assert_eq!(p.reg.get(8).unwrap(), 0xf800_0000);

        let mut p = Processor::new();
        p.reg.set(9, 0x8000_0000).unwrap();
        load_one(&mut p, 0, "srl $t0, $t1, 4");
        p.step().unwrap();
        assert_eq!(p.reg.get(8).unwrap(), 0x0800_0000);
    }

    #[test]
    fn sltiu_sign_extends_then_compares_unsigned() {
        let mut p = Processor::new();
        p.reg.set(8, 5).unwrap(); // t0
        // immediate -1 (0xffff) sign-extends to 0xffff_ffff, a huge
        // unsigned value, so 5 < it is true
        load_one(&mut p, 0, "sltiu $t1, $t0, -1");
        p.step().unwrap();
        assert_eq!(p.reg.get(9).unwrap(), 1);
    }

    #[test]
    fn div_by_zero_leaves_hi_lo_unchanged() {
        let mut p = Processor::new();
        p.hi = 11;
        p.lo = 22;
        p.reg.set(8, 7).unwrap();
        load_one(&mut p, 0, "div $t0, $zero");
        p.step().unwrap();
        assert_eq!(p.hi, 11);
        assert_eq!(p.lo, 22);
    }

    #[test]
    fn jal_links_pc_plus_8_then_jumps() {
        let mut p = Processor::new();
        p.pc = 0x1000;
        load_one(&mut p, 0x1000, "jal 4");
        p.step().unwrap();
        assert_eq!(p.reg.get(31).unwrap(), 0x1008);
        assert_eq!(p.pc, 16);
    }

    #[test]
    fn jr_misaligned_traps() {
        let mut p = Processor::new();
        p.reg.set(8, 5).unwrap();
        load_one(&mut p, 0, "jr $t0");
        assert_eq!(p.step(), Err(Trap::AddressError));
    }

    #[test]
    fn syscall_advances_pc_and_raises_trap() {
        let mut p = Processor::new();
        load_one(&mut p, 0, "syscall");
        assert_eq!(p.step(), Err(Trap::SoftwareInterrupt));
        assert_eq!(p.pc, 4);
    }

    #[test]
    fn execute_prog_stops_at_step_budget() {
        let mut p = Processor::new();
        for addr in (0..16).step_by(4) {
            load_one(&mut p, addr, "noop");
        }
        p.execute_prog(0, 2).unwrap();
        assert_eq!(p.pc, 8);
    }
}
