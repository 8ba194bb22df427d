//! The symbolic CPU walker.
//!
//! A `Cpu` explores exactly one control-flow path. Whenever a path splits
//! (branch not taken, subroutine call, dispatch through a jump table), the
//! walker forks a copy of its path state and runs the copy to completion
//! before continuing. Termination comes from `Analysis::add_instruction`:
//! the first revisit of a `(pc, subroutine, state)` site stops the path, so
//! loops in the ROM never loop the walker.

use crate::analysis::engine::Analysis;
use crate::analysis::instruction::{Instruction, InstructionType};
use crate::analysis::stack::{Stack, StackData, StackEntry};
use crate::analysis::state::{State, StateChange, UnknownReason};
use crate::analysis::{AssertionType, JumpTableStatus};
use crate::arch::{AddressMode, Op};
use crate::rom::Rom;
use crate::{InstructionPc, SubroutinePc};
use log::debug;
use std::collections::HashSet;

pub struct Cpu<'a> {
    analysis: &'a mut Analysis,

    /// Program counter.
    pub pc: InstructionPc,
    /// Subroutine currently being executed.
    pub subroutine_pc: SubroutinePc,
    /// Processor state.
    pub state: State,
    /// State change accumulated by the current subroutine along this path.
    pub state_change: StateChange,
    /// What the instructions executed so far imply about the entry state.
    state_inference: StateChange,
    /// Symbolic stack.
    stack: Stack,
    /// Whether to stop after the current instruction.
    pub stop: bool,
}

impl<'a> Cpu<'a> {
    pub fn new(
        analysis: &'a mut Analysis,
        pc: InstructionPc,
        subroutine_pc: SubroutinePc,
        state: State,
    ) -> Self {
        Cpu {
            analysis,
            pc,
            subroutine_pc,
            state,
            state_change: StateChange::default(),
            state_inference: StateChange::default(),
            stack: Stack::new(),
            stop: false,
        }
    }

    /// A copy of this walker's path state, reborrowing the analysis. The
    /// copy runs to completion before the parent can continue.
    fn fork(&mut self) -> Cpu<'_> {
        Cpu {
            analysis: &mut *self.analysis,
            pc: self.pc,
            subroutine_pc: self.subroutine_pc,
            state: self.state,
            state_change: self.state_change,
            state_inference: self.state_inference,
            stack: self.stack.clone(),
            stop: self.stop,
        }
    }

    /// Walk until the path merges, returns, or becomes unsound.
    pub fn run(&mut self) {
        while !self.stop {
            self.step();
        }
    }

    /// Fetch, commit and execute the next instruction.
    pub fn step(&mut self) {
        if Rom::is_ram(self.pc) {
            return self.unknown_state_change(self.pc, UnknownReason::MutableCode);
        }

        let opcode = self.analysis.rom().read_byte(self.pc);
        let argument = self.analysis.rom().read_address(self.pc + 1);
        let instruction =
            Instruction::new(self.pc, self.subroutine_pc, opcode, argument, self.state);

        if self.analysis.add_instruction(instruction.clone()) {
            self.execute(&instruction);
        } else {
            // This path has merged with one explored earlier.
            self.stop = true;
        }
    }

    pub(crate) fn execute(&mut self, instruction: &Instruction) {
        self.pc = (self.pc + instruction.size() as u32) & 0xFF_FFFF;

        self.derive_state_inference(instruction);

        match instruction.instruction_type() {
            InstructionType::Branch => self.branch(instruction),
            InstructionType::Call => self.call(instruction),
            InstructionType::Interrupt => self.interrupt(instruction),
            InstructionType::Jump => self.jump(instruction),
            InstructionType::Return => self.ret(instruction),
            InstructionType::SepRep => self.sep_rep(instruction),
            InstructionType::Pop => self.pop(instruction),
            InstructionType::Push => self.push(instruction),
            InstructionType::Other => {}
        }
    }

    /// Explore the not-taken path first, then take the branch.
    fn branch(&mut self, instruction: &Instruction) {
        let mut fall_through = self.fork();
        fall_through.run();

        if let Some(target) = instruction.absolute_argument() {
            self.analysis
                .add_reference(instruction.pc(), target, self.subroutine_pc);
            self.pc = target;
        }
    }

    /// Walk each callee in a fresh subroutine context, then propagate its
    /// return state into this path.
    fn call(&mut self, instruction: &Instruction) {
        let targets = match self.call_targets(instruction) {
            Some(targets) => targets,
            None => {
                return self.unknown_state_change(instruction.pc(), UnknownReason::IndirectJump)
            }
        };

        let return_size = if instruction.operation() == Op::JSL { 3 } else { 2 };
        for &target in &targets {
            self.analysis.add_subroutine(target, None, false);
            self.analysis
                .add_reference(instruction.pc(), target, self.subroutine_pc);

            let mut callee = self.fork();
            callee.pc = target;
            callee.subroutine_pc = target;
            callee.state_change = StateChange::default();
            callee
                .stack
                .push(Some(instruction.clone()), Some(instruction.pc()), return_size);
            callee.run();
        }

        self.propagate_subroutine_state(instruction.pc(), &targets);
    }

    fn interrupt(&mut self, instruction: &Instruction) {
        self.unknown_state_change(instruction.pc(), UnknownReason::SuspectInstruction);
    }

    fn jump(&mut self, instruction: &Instruction) {
        // A statically-addressed jump continues the current subroutine at
        // the target.
        if let Some(target) = instruction.absolute_argument() {
            self.analysis
                .add_reference(instruction.pc(), target, self.subroutine_pc);
            self.pc = target;
            return;
        }

        // Dispatch through a jump table: each target is a tail-called
        // subroutine, and this path leaves the current subroutine here.
        match self.jump_table_targets(instruction) {
            Some(targets) => {
                for &target in &targets {
                    self.analysis.add_subroutine(target, None, false);
                    self.analysis
                        .add_reference(instruction.pc(), target, self.subroutine_pc);

                    let mut callee = self.fork();
                    callee.pc = target;
                    callee.subroutine_pc = target;
                    callee.state_change = StateChange::default();
                    callee.run();
                }
                self.standard_ret(instruction);
            }
            None => self.unknown_state_change(instruction.pc(), UnknownReason::IndirectJump),
        }
    }

    fn ret(&mut self, instruction: &Instruction) {
        let operation = instruction.operation();
        if operation == Op::RTI {
            return self.standard_ret(instruction);
        }

        let return_size = if operation == Op::RTS { 2 } else { 3 };
        let entries = self.stack.pop(return_size);
        if Self::return_is_manipulated(operation, &entries) {
            self.unknown_state_change(instruction.pc(), UnknownReason::StackManipulation);
        } else {
            self.standard_ret(instruction);
        }
    }

    /// Commit the accumulated state change as a return point and stop.
    fn standard_ret(&mut self, instruction: &Instruction) {
        self.analysis
            .add_state_change(self.subroutine_pc, instruction.pc(), self.state_change);
        self.stop = true;
    }

    /// A return popping bytes that were not pushed by the matching call
    /// kind is running on a manipulated stack.
    fn return_is_manipulated(return_op: Op, entries: &[StackEntry]) -> bool {
        let call_op = if return_op == Op::RTS { Op::JSR } else { Op::JSL };
        entries.iter().any(|entry| match &entry.instruction {
            None => true,
            Some(producer) => producer.operation() != call_op,
        })
    }

    fn sep_rep(&mut self, instruction: &Instruction) {
        let mask = match instruction.absolute_argument() {
            Some(argument) => argument as u8,
            None => return,
        };

        if instruction.operation() == Op::SEP {
            self.state.set(mask);
            self.state_change.set(mask);
        } else {
            self.state.reset(mask);
            self.state_change.reset(mask);
        }

        // A SEP/REP that re-establishes a width the subroutine must have
        // been entered with is not a real state change.
        self.state_change.apply_inference(self.state_inference);
    }

    fn push(&mut self, instruction: &Instruction) {
        match instruction.operation() {
            Op::PHP => {
                self.stack
                    .push_state(instruction.clone(), self.state, self.state_change)
            }
            Op::PHA => self
                .stack
                .push(Some(instruction.clone()), None, self.state.size_a()),
            Op::PHX | Op::PHY => {
                self.stack
                    .push(Some(instruction.clone()), None, self.state.size_x())
            }
            Op::PHB | Op::PHK => self.stack.push_one(Some(instruction.clone()), None),
            Op::PHD | Op::PEA | Op::PER | Op::PEI => {
                self.stack.push(Some(instruction.clone()), None, 2)
            }
            _ => {}
        }
    }

    fn pop(&mut self, instruction: &Instruction) {
        match instruction.operation() {
            Op::PLP => {
                let entry = self.stack.pop_one();
                let restored = match (&entry.instruction, &entry.data) {
                    (Some(producer), StackData::SavedState(state, change))
                        if producer.operation() == Op::PHP =>
                    {
                        Some((*state, *change))
                    }
                    _ => None,
                };
                match restored {
                    Some((state, change)) => {
                        self.state = state;
                        self.state_change = change;
                    }
                    None => self
                        .unknown_state_change(instruction.pc(), UnknownReason::StackManipulation),
                }
            }
            Op::PLA => {
                self.stack.pop(self.state.size_a());
            }
            Op::PLX | Op::PLY => {
                self.stack.pop(self.state.size_x());
            }
            Op::PLB => {
                self.stack.pop_one();
            }
            Op::PLD => {
                self.stack.pop(2);
            }
            _ => {}
        }
    }

    /// Targets of a call: the static operand, or the jump table at the
    /// call site.
    fn call_targets(&mut self, instruction: &Instruction) -> Option<HashSet<InstructionPc>> {
        if let Some(target) = instruction.absolute_argument() {
            let mut targets = HashSet::new();
            targets.insert(target);
            return Some(targets);
        }
        self.jump_table_targets(instruction)
    }

    /// Targets stored in the jump table at this site, if the user has
    /// defined one. Records a placeholder otherwise, so the site shows up
    /// as needing help.
    fn jump_table_targets(&mut self, instruction: &Instruction) -> Option<HashSet<InstructionPc>> {
        let targets = match self.analysis.jump_table(instruction.pc()) {
            Some(table) if table.status != JumpTableStatus::Unknown => {
                Some(table.targets.values().copied().collect::<HashSet<_>>())
            }
            _ => None,
        };

        if targets.is_none() {
            self.analysis.note_unknown_jump_table(instruction.pc());
        }
        targets
    }

    /// The fact that a width-dependent immediate decoded successfully pins
    /// the flag's value at subroutine entry, as long as the subroutine has
    /// not changed that flag itself.
    fn derive_state_inference(&mut self, instruction: &Instruction) {
        if instruction.address_mode() == AddressMode::ImmediateM && self.state_change.m.is_none() {
            self.state_inference.m = Some(self.state.m());
        }
        if instruction.address_mode() == AddressMode::ImmediateX && self.state_change.x.is_none() {
            self.state_inference.x = Some(self.state.x());
        }
    }

    /// Fold the return states of the called subroutines into this path.
    fn propagate_subroutine_state(
        &mut self,
        call_pc: InstructionPc,
        targets: &HashSet<InstructionPc>,
    ) {
        let mut changes: HashSet<StateChange> = HashSet::new();

        for target in targets {
            let simplified = {
                let subroutine = match self.analysis.subroutines().get(target) {
                    Some(subroutine) => subroutine,
                    None => continue,
                };
                if subroutine.has_unknown_state_change() {
                    None
                } else {
                    Some(subroutine.simplified_state_changes(self.state))
                }
            };

            match simplified {
                Some(set) => changes.extend(set),
                None => return self.unknown_state_change(call_pc, UnknownReason::Unknown),
            }
        }

        if changes.len() != 1 {
            return self.unknown_state_change(call_pc, UnknownReason::MultipleReturnStates);
        }
        if let Some(&change) = changes.iter().next() {
            self.apply_state_change(change);
        }
    }

    fn apply_state_change(&mut self, change: StateChange) {
        if let Some(m) = change.m {
            self.state.set_m(m);
            self.state_change.m = Some(m);
        }
        if let Some(x) = change.x {
            self.state.set_x(x);
            self.state_change.x = Some(x);
        }
    }

    /// The walker cannot continue soundly. User assertions get the first
    /// say; otherwise the reason is recorded and the path ends.
    fn unknown_state_change(&mut self, pc: InstructionPc, reason: UnknownReason) {
        match self.analysis.assertion(pc, self.subroutine_pc) {
            Some(assertion) if assertion.assertion_type == AssertionType::Instruction => {
                self.apply_state_change(assertion.state_change);
            }
            Some(assertion) => {
                self.analysis
                    .add_state_change(self.subroutine_pc, pc, assertion.state_change);
                self.stop = true;
            }
            None => {
                debug!(
                    "unknown state change at ${:06X} in sub ${:06X}: {}",
                    pc,
                    self.subroutine_pc,
                    reason.description()
                );
                self.analysis
                    .add_state_change(self.subroutine_pc, pc, StateChange::unknown(reason));
                self.stop = true;
            }
        }
    }
}
