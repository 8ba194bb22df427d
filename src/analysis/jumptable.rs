//! Jump tables.

use crate::InstructionPc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpTableStatus {
    /// Seen at an indirect transfer, bounds not yet supplied by the user.
    Unknown,
    Partial,
    Complete,
}

/// Targets of an indirect control-flow instruction, keyed by the caller PC.
///
/// Targets map a table index (the offset supplied to `define_jump_table`)
/// to the address read from ROM at that slot.
#[derive(Clone, Debug, PartialEq)]
pub struct JumpTable {
    pub status: JumpTableStatus,
    pub targets: BTreeMap<Option<u16>, InstructionPc>,
}

impl JumpTable {
    /// Placeholder recorded when an indirect transfer is first seen.
    pub fn unknown() -> Self {
        JumpTable {
            status: JumpTableStatus::Unknown,
            targets: BTreeMap::new(),
        }
    }
}
