//! Code reference edges.

use crate::{InstructionPc, SubroutinePc};
use serde::{Deserialize, Serialize};

/// A control transfer from one instruction to another.
///
/// Stored keyed by the source PC; the edge remembers which subroutine the
/// source was reached through, since that decides where a local label for
/// the target lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub target: InstructionPc,
    pub subroutine_pc: SubroutinePc,
}
