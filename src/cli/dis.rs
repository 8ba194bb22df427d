//! Plain-text disassembly rendering.

use crate::analysis::{Analysis, Instruction};
use crate::arch::{hardware_register, Op};
use std::io::{self, Write};

/// Write the whole disassembly: one block per subroutine in address order,
/// then the list of subroutines whose return state stayed unresolved.
pub fn write_disassembly<W: Write>(analysis: &Analysis, out: &mut W) -> io::Result<()> {
    for subroutine in analysis.subroutines().values() {
        let header = analysis
            .get_label(subroutine.pc(), None)
            .unwrap_or_else(|| subroutine.label().to_string());
        writeln!(out, "{}:", header)?;
        for instruction in subroutine.instructions().values() {
            if let Some(label) = instruction.label() {
                writeln!(out, ".{}:", label)?;
            }

            let text = display_instruction(analysis, instruction);
            match line_comment(analysis, instruction) {
                Some(comment) => {
                    writeln!(out, "{:<30}; ${:06X} | {}", text, instruction.pc(), comment)?
                }
                None => writeln!(out, "{:<30}; ${:06X}", text, instruction.pc())?,
            }
        }
        writeln!(out)?;
    }

    let unresolved = analysis.unresolved_subroutines();
    if !unresolved.is_empty() {
        writeln!(out, "; unresolved subroutines:")?;
        for pc in unresolved {
            let label = analysis
                .get_label(pc, None)
                .unwrap_or_else(|| format!("sub_{:06X}", pc));
            writeln!(out, ";   {} ${:06X}", label, pc)?;
        }
    }

    Ok(())
}

/// The display form of an instruction, with labels and hardware-register
/// aliases substituted where they resolve.
fn display_instruction(analysis: &Analysis, instruction: &Instruction) -> String {
    if let Some(target) = instruction.absolute_argument() {
        if instruction.is_control() {
            if let Some(label) = analysis.get_label(target, Some(instruction.subroutine_pc())) {
                return format!("{} {}", instruction.name(), label);
            }
        }
        if let Some(register) = hardware_register(target) {
            return format!("{} !{}", instruction.name(), register);
        }
    }
    instruction.to_string()
}

/// User comment for the line, or a derived one for SEP/REP.
fn line_comment(analysis: &Analysis, instruction: &Instruction) -> Option<String> {
    if let Some(comment) = analysis.comment(instruction.pc()) {
        return Some(comment.to_string());
    }
    if instruction.is_sep_rep() {
        return sep_rep_comment(instruction);
    }
    None
}

fn sep_rep_comment(instruction: &Instruction) -> Option<String> {
    let bits = if instruction.operation() == Op::SEP { 8 } else { 16 };
    let mask = instruction.argument()?;

    if mask & 0x30 == 0x30 {
        Some(format!("A: {}-bits, X: {}-bits", bits, bits))
    } else if mask & 0x20 == 0x20 {
        Some(format!("A: {}-bits", bits))
    } else if mask & 0x10 == 0x10 {
        Some(format!("X: {}-bits", bits))
    } else {
        None
    }
}
