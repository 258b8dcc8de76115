use clap::Parser;
use mips32sim::decode::decode;
use mips32sim::engine::Processor;
use mips32sim::registers;
use std::fs;
use std::process::ExitCode;

const BOOT_ADDRESS: u32 = 12;
const MAX_INSTR: i64 = 1000;

/// Interpreting simulator for the MIPS32 (subset) instruction set
///
/// Loads a raw word stream produced by `assemble` into memory at a
/// fixed boot address, runs the fetch/decode/execute loop for up to
/// 1000 instructions, and prints the contents of t0..t3 afterwards.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the assembled binary file
    input: String,

    /// Single-step through execution, printing the decoded instruction
    /// and register state before and after each step
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let bytes = match fs::read(&args.input) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{}: {e}", args.input);
            return ExitCode::FAILURE;
        }
    };

    let mut proc = Processor::new();
    if let Err(e) = proc.load_program(BOOT_ADDRESS, &bytes) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    if args.debug {
        proc.pc = BOOT_ADDRESS;
        let mut executed = 0;
        while executed < MAX_INSTR {
            let pc = proc.pc;
            match proc.mem.read_word(pc).map_err(mips32sim::engine::Trap::from).and_then(|word| {
                decode(word)
                    .map(|instr| (word, instr))
                    .map_err(mips32sim::engine::Trap::from)
            }) {
                Ok((word, instr)) => println!("pc=0x{pc:08x}  word=0x{word:08x}  {instr}"),
                Err(e) => {
                    println!("trap: {e}");
                    break;
                }
            }
            println!("before: {}", proc.reg);
            if let Err(e) = proc.step() {
                println!("trap: {e}");
                break;
            }
            println!("after:  {}", proc.reg);
            executed += 1;
        }
    } else if let Err(e) = proc.execute_prog(BOOT_ADDRESS, MAX_INSTR) {
        println!("trap: {e}");
    }

    for name in ["t0", "t1", "t2", "t3"] {
        let index = registers::index_of(name).expect("t0..t3 are always valid register names");
        println!("{name} = 0x{:08x}", proc.reg.get(index).unwrap());
    }

    ExitCode::SUCCESS
}
