//! End-to-end scenarios spanning the assembler and the execution
//! engine together.

use mips32sim::assembler::assemble;
use mips32sim::engine::Processor;
use mips32sim::registers;

fn lines(src: &str) -> Vec<String> {
    src.lines().map(|l| l.to_string()).collect()
}

fn word_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn assembled_label_jump_resolves_to_its_own_line() {
    let (words, _) = assemble(&lines("start:\n addi $t0, $zero, 5\n j start")).unwrap();
    assert_eq!(words.len(), 2);

    let mut proc = Processor::new();
    proc.load_program(0, &word_bytes(&words)).unwrap();
    proc.pc = 0;

    // addi $t0, $zero, 5
    proc.step().unwrap();
    let t0 = registers::index_of("t0").unwrap();
    assert_eq!(proc.reg.get(t0).unwrap(), 5);

    // j start jumps back to word index 0 (byte address 0)
    proc.step().unwrap();
    assert_eq!(proc.pc, 0);
}

#[test]
fn assembled_program_runs_under_the_simulator_boot_protocol() {
    let (words, _) = assemble(&lines(
        "addi $t0, $zero, 2\n addi $t1, $zero, 3\n add $t2, $t0, $t1",
    ))
    .unwrap();

    let mut proc = Processor::new();
    proc.load_program(12, &word_bytes(&words)).unwrap();
    proc.execute_prog(12, 3).unwrap();

    let t2 = registers::index_of("t2").unwrap();
    assert_eq!(proc.reg.get(t2).unwrap(), 5);
}

#[test]
fn loop_with_branch_and_syscall_terminates_via_trap() {
    // start: addi $t0, $t0, 1
    //        addi $t1, $t1, -1
    //        bne $t1, $zero, start
    //        syscall
    let (words, _) = assemble(&lines(
        "start:\n\
         addi $t0, $t0, 1\n\
         addi $t1, $t1, -1\n\
         bne $t1, $zero, start\n\
         syscall",
    ))
    .unwrap();

    let mut proc = Processor::new();
    let t1 = registers::index_of("t1").unwrap();
    proc.reg.set(t1, 4).unwrap();
    proc.load_program(0, &word_bytes(&words)).unwrap();
    proc.pc = 0;

    let trap = loop {
        if let Err(trap) = proc.step() {
            break trap;
        }
    };
    assert_eq!(trap, mips32sim::engine::Trap::SoftwareInterrupt);

    let t0 = registers::index_of("t0").unwrap();
    assert_eq!(proc.reg.get(t0).unwrap(), 4);
}
