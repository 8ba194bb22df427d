//! Analysis entry points.

use crate::analysis::state::State;
use crate::SubroutinePc;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A PC the analysis starts walking from, with its initial state.
///
/// Identity is the PC alone: adding a second entry point at the same
/// address is a no-op.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntryPoint {
    pub label: String,
    pub pc: SubroutinePc,
    pub state: State,
}

impl PartialEq for EntryPoint {
    fn eq(&self, other: &Self) -> bool {
        self.pc == other.pc
    }
}

impl Eq for EntryPoint {}

impl Hash for EntryPoint {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.pc.hash(hasher);
    }
}
