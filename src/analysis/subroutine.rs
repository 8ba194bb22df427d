//! Discovered subroutines.

use crate::analysis::instruction::Instruction;
use crate::analysis::state::{State, StateChange, UnknownReason};
use crate::arch::Op;
use crate::{InstructionPc, SubroutinePc};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A maximal code region entered from a single PC and bounded by returns.
///
/// A state change recorded at `pc` means "the instruction at `pc` exits the
/// subroutine with this delta". Known and unknown changes are routed into
/// separate maps so callers can tell at a glance whether propagation is
/// possible.
#[derive(Clone, Debug)]
pub struct Subroutine {
    pc: SubroutinePc,
    label: String,
    instructions: BTreeMap<InstructionPc, Instruction>,
    known_state_changes: HashMap<InstructionPc, StateChange>,
    unknown_state_changes: HashMap<InstructionPc, StateChange>,
    is_entry_point: bool,
}

impl Subroutine {
    pub fn new(pc: SubroutinePc, label: String) -> Self {
        Subroutine {
            pc,
            label,
            instructions: BTreeMap::new(),
            known_state_changes: HashMap::new(),
            unknown_state_changes: HashMap::new(),
            is_entry_point: false,
        }
    }

    pub fn pc(&self) -> SubroutinePc {
        self.pc
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_entry_point(&self) -> bool {
        self.is_entry_point
    }

    pub fn set_entry_point(&mut self, is_entry_point: bool) {
        self.is_entry_point = is_entry_point;
    }

    pub fn instructions(&self) -> &BTreeMap<InstructionPc, Instruction> {
        &self.instructions
    }

    pub fn instruction_mut(&mut self, pc: InstructionPc) -> Option<&mut Instruction> {
        self.instructions.get_mut(&pc)
    }

    pub fn add_instruction(&mut self, instruction: Instruction) {
        self.instructions.insert(instruction.pc(), instruction);
    }

    /// Record a return-point state change, routed by knowability.
    pub fn add_state_change(&mut self, pc: InstructionPc, change: StateChange) {
        if change.is_unknown() {
            self.unknown_state_changes.insert(pc, change);
        } else {
            self.known_state_changes.insert(pc, change);
        }
    }

    pub fn known_state_changes(&self) -> &HashMap<InstructionPc, StateChange> {
        &self.known_state_changes
    }

    pub fn unknown_state_changes(&self) -> &HashMap<InstructionPc, StateChange> {
        &self.unknown_state_changes
    }

    pub fn state_change_for_pc(&self, pc: InstructionPc) -> Option<StateChange> {
        self.known_state_changes
            .get(&pc)
            .or_else(|| self.unknown_state_changes.get(&pc))
            .copied()
    }

    pub fn has_unknown_state_change(&self) -> bool {
        !self.unknown_state_changes.is_empty()
    }

    pub fn has_state_change(&self) -> bool {
        !self.known_state_changes.is_empty() || !self.unknown_state_changes.is_empty()
    }

    /// Whether the subroutine opens by saving the caller's state.
    ///
    /// Scans from the entry until the first SEP/REP or control-flow
    /// instruction; a PHP seen before that counts.
    pub fn saves_state_in_incipit(&self) -> bool {
        for instruction in self.instructions.values() {
            if instruction.operation() == Op::PHP {
                return true;
            }
            if instruction.is_sep_rep() || instruction.is_control() {
                return false;
            }
        }
        false
    }

    /// Whether any decoded instruction is a BRK.
    pub fn has_suspect_instructions(&self) -> bool {
        self.instructions
            .values()
            .any(|i| i.operation() == Op::BRK)
    }

    /// The known state changes, simplified against a caller state and
    /// deduplicated.
    pub fn simplified_state_changes(&self, state: State) -> HashSet<StateChange> {
        self.known_state_changes
            .values()
            .map(|change| change.simplify(state))
            .collect()
    }

    /// Whether any unknown state change carries the given reason.
    pub fn is_unknown_because_of(&self, reason: UnknownReason) -> bool {
        self.unknown_state_changes
            .values()
            .any(|change| change.reason() == reason)
    }

    /// Whether an unknown state originated here rather than being
    /// propagated up from a callee.
    pub fn is_responsible_for_unknown(&self) -> bool {
        self.unknown_state_changes
            .values()
            .any(|change| change.reason() != UnknownReason::Unknown)
    }
}
