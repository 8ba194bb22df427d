//! Static analyzer and disassembler for 65816 (SNES) ROM images.
//!
//! 65816 code cannot be disassembled byte-by-byte: the width of immediate
//! operands depends on the `m`/`x` processor flags, which are set by code
//! executed arbitrarily earlier. This crate walks the ROM symbolically from
//! its entry points, tracking those flags along every control-flow path, and
//! reconstructs the subroutine call graph together with the state delta each
//! subroutine applies on return. Sites the walker cannot analyze soundly are
//! surfaced as typed unknowns that the user resolves with assertions and
//! jump-table definitions, then re-runs.

pub mod analysis;
pub mod arch;
pub mod cli;
pub mod project;
pub mod rom;

/// Address of a specific instruction: a 24-bit value, bank in the high byte.
pub type InstructionPc = u32;

/// Entry address of a subroutine.
pub type SubroutinePc = u32;

/// The identity user metadata is keyed under: the same byte address visited
/// from two different subroutines is two sites.
pub type PcPair = (InstructionPc, SubroutinePc);
