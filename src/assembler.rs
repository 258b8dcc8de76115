//! Two-pass assembler driver
//!
//! Turns an ordered sequence of raw source lines into a sequence of
//! encoded 32-bit words. Operates over in-memory lines; file I/O is
//! the CLI binary's job.

use crate::encode::encode;
use crate::instr::{parse_line, ParseError};
use crate::opcodes::{Category, Mnemonic};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssembleError {
    #[error("line {line}: {source}")]
    Parse { line: usize, source: ParseError },
}

fn strip_comments(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|l| match l.find(';') {
            Some(i) => l[..i].trim().to_string(),
            None => l.trim().to_string(),
        })
        .filter(|l| !l.is_empty())
        .collect()
}

fn collect_labels(lines: Vec<String>) -> (HashMap<String, usize>, Vec<String>) {
    let mut labels = HashMap::new();
    let mut label_free = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(name) = line.strip_suffix(':') {
            labels.insert(name.to_string(), label_free.len());
        } else {
            label_free.push(line);
        }
    }
    (labels, label_free)
}

/// J/JAL take an absolute word-indexed target rather than a
/// PC-relative displacement, so a label used as their operand
/// substitutes to the label's raw word index; every other
/// label-referencing mnemonic gets the PC-relative displacement
/// `labels[k] - i - 1` that branches expect.
fn is_absolute_jump(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .and_then(Mnemonic::from_name)
        .is_some_and(|m| m.category() == Category::C7)
}

fn substitute_displacements(labels: &HashMap<String, usize>, lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let absolute = is_absolute_jump(&line);
            let mut substituted = line.clone();
            for token in line.split_whitespace() {
                let token = token.trim_matches(',');
                if let Some(&target) = labels.get(token) {
                    let value = if absolute {
                        target as i64
                    } else {
                        target as i64 - i as i64 - 1
                    };
                    substituted = substituted.replace(token, &value.to_string());
                }
            }
            substituted
        })
        .collect()
}

/// Assemble an ordered sequence of raw source lines into a sequence of
/// 32-bit words, in the order they will be emitted, plus the resolved
/// `{label -> word index}` map (callers that want to trace label
/// resolution, e.g. `bin/assemble.rs`'s `--debug` mode, read it from
/// here instead of re-deriving it).
pub fn assemble(lines: &[String]) -> Result<(Vec<u32>, HashMap<String, usize>), AssembleError> {
    let stripped = strip_comments(lines);
    let (labels, label_free) = collect_labels(stripped);
    let substituted = substitute_displacements(&labels, label_free);

    let words = substituted
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let instr = parse_line(line).map_err(|source| AssembleError::Parse {
                line: i,
                source,
            })?;
            Ok(encode(&instr))
        })
        .collect::<Result<Vec<u32>, AssembleError>>()?;

    Ok((words, labels))
}
