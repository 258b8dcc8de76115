use clap::Parser;
use mips32sim::assembler::assemble;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

/// Two-pass assembler for the MIPS32 (subset) instruction set
///
/// Strips comments, resolves labels to PC-relative word
/// displacements, and emits a raw concatenation of encoded 32-bit
/// words to `<input>.bin`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the assembly source file
    input: Vec<String>,

    /// Single step through each pass and print intermediate state
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.input.len() > 1 {
        eprintln!("currently more than one assembly file is unsupported");
        return ExitCode::FAILURE;
    }
    let Some(input) = args.input.first() else {
        eprintln!("no assembly file given");
        return ExitCode::FAILURE;
    };

    let source = match fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{input}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let lines: Vec<String> = source.lines().map(|l| l.to_string()).collect();
    if args.debug {
        println!("read {} source lines", lines.len());
    }

    let (words, labels) = match assemble(&lines) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if args.debug {
        let mut names: Vec<&String> = labels.keys().collect();
        names.sort_by_key(|name| labels[*name]);
        for name in names {
            eprintln!("Found label: {name}");
        }
        println!("assembled {} words", words.len());
    }

    let output_path = Path::new(input).with_extension("bin");
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_ne_bytes()).collect();
    if let Err(e) = fs::write(&output_path, bytes) {
        eprintln!("{}: {e}", output_path.display());
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
