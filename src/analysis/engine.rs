//! The analysis driver and canonical storage.

use crate::analysis::cpu::Cpu;
use crate::analysis::{
    Assertion, EntryPoint, Instruction, JumpTable, JumpTableStatus, Reference, State, StateChange,
    Subroutine,
};
use crate::rom::{self, Rom};
use crate::{InstructionPc, PcPair, SubroutinePc};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::Path;

/// Everything known about a ROM: the derived call graph and the
/// user-authored metadata that steers its discovery.
///
/// Instructions, subroutines, references and generated labels are derived
/// data, cleared and recomputed by every `run`. Entry points, assertions,
/// jump-table definitions, custom labels and comments are user data,
/// preserved across runs and by save/load.
pub struct Analysis {
    rom: Rom,

    // Derived data.
    instructions: HashMap<InstructionPc, HashSet<Instruction>>,
    subroutines: BTreeMap<SubroutinePc, Subroutine>,
    references: HashMap<InstructionPc, HashSet<Reference>>,

    // User data.
    entry_points: HashSet<EntryPoint>,
    comments: HashMap<InstructionPc, String>,
    custom_labels: HashMap<PcPair, String>,
    assertions: HashMap<PcPair, Assertion>,
    jump_tables: HashMap<InstructionPc, JumpTable>,
}

impl Analysis {
    /// Build an analysis seeded with the ROM's reset and NMI vectors.
    pub fn new(rom: Rom) -> Self {
        let reset_vector = rom.reset_vector();
        let nmi_vector = rom.nmi_vector();

        let mut analysis = Analysis {
            rom,
            instructions: HashMap::new(),
            subroutines: BTreeMap::new(),
            references: HashMap::new(),
            entry_points: HashSet::new(),
            comments: HashMap::new(),
            custom_labels: HashMap::new(),
            assertions: HashMap::new(),
            jump_tables: HashMap::new(),
        };
        analysis.add_entry_point("reset", reset_vector, State::default());
        analysis.add_entry_point("nmi", nmi_vector, State::default());
        analysis
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> rom::Result<Self> {
        Ok(Analysis::new(Rom::open(path)?))
    }

    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    /// Analyze the ROM: clear derived data and walk every entry point.
    pub fn run(&mut self) {
        self.clear();

        let entry_points: Vec<EntryPoint> = self.entry_points.iter().cloned().collect();
        info!("analysis run over {} entry points", entry_points.len());

        for entry in entry_points {
            debug!("walking entry point {} at ${:06X}", entry.label, entry.pc);
            self.add_subroutine(entry.pc, Some(entry.label.clone()), true);
            let mut cpu = Cpu::new(self, entry.pc, entry.pc, entry.state);
            cpu.run();
        }

        self.generate_local_labels();
        info!(
            "discovered {} subroutines, {} instruction sites",
            self.subroutines.len(),
            self.instructions.len()
        );
    }

    fn clear(&mut self) {
        self.instructions.clear();
        self.subroutines.clear();
        self.references.clear();
    }

    /// Register an entry point. Hashing is by PC, so a second registration
    /// at the same address is a no-op.
    pub fn add_entry_point(&mut self, label: &str, pc: SubroutinePc, state: State) {
        self.entry_points.insert(EntryPoint {
            label: label.to_string(),
            pc,
            state,
        });
    }

    pub fn entry_points(&self) -> &HashSet<EntryPoint> {
        &self.entry_points
    }

    /// Commit a decoded instruction.
    ///
    /// Returns false when the identical site (same PC, subroutine and entry
    /// state) was already present; a false return is what terminates the
    /// walker that tried the insert, and with it every control-flow cycle.
    pub fn add_instruction(&mut self, instruction: Instruction) -> bool {
        let site = self.instructions.entry(instruction.pc()).or_default();
        if !site.insert(instruction.clone()) {
            return false;
        }

        if let Some(subroutine) = self.subroutines.get_mut(&instruction.subroutine_pc()) {
            subroutine.add_instruction(instruction);
        }
        true
    }

    /// Record that `source` transfers control to `target`.
    pub fn add_reference(
        &mut self,
        source: InstructionPc,
        target: InstructionPc,
        subroutine_pc: SubroutinePc,
    ) {
        self.references.entry(source).or_default().insert(Reference {
            target,
            subroutine_pc,
        });
    }

    pub fn references(&self) -> &HashMap<InstructionPc, HashSet<Reference>> {
        &self.references
    }

    /// Reverse reference lookup: who reaches `pc`?
    pub fn references_to(&self, pc: InstructionPc) -> Vec<(InstructionPc, SubroutinePc)> {
        let mut sources = Vec::new();
        for (source, edges) in &self.references {
            for edge in edges {
                if edge.target == pc {
                    sources.push((*source, edge.subroutine_pc));
                }
            }
        }
        sources.sort_unstable();
        sources
    }

    /// Idempotent subroutine registration.
    pub fn add_subroutine(&mut self, pc: SubroutinePc, label: Option<String>, is_entry: bool) {
        let label = label.unwrap_or_else(|| format!("sub_{:06X}", pc));
        let subroutine = self
            .subroutines
            .entry(pc)
            .or_insert_with(|| Subroutine::new(pc, label));
        if is_entry {
            subroutine.set_entry_point(true);
        }
    }

    pub fn is_subroutine(&self, pc: SubroutinePc) -> bool {
        self.subroutines.contains_key(&pc)
    }

    pub fn subroutines(&self) -> &BTreeMap<SubroutinePc, Subroutine> {
        &self.subroutines
    }

    /// Record a return-point state change for a subroutine.
    pub fn add_state_change(
        &mut self,
        subroutine_pc: SubroutinePc,
        pc: InstructionPc,
        change: StateChange,
    ) {
        if let Some(subroutine) = self.subroutines.get_mut(&subroutine_pc) {
            subroutine.add_state_change(pc, change);
        }
    }

    /// Any representative of the instruction instances at `pc`.
    pub fn any_instruction(&self, pc: InstructionPc) -> Option<&Instruction> {
        self.instructions.get(&pc).and_then(|site| site.iter().next())
    }

    pub fn instructions_at(&self, pc: InstructionPc) -> Option<&HashSet<Instruction>> {
        self.instructions.get(&pc)
    }

    pub fn instructions(&self) -> &HashMap<InstructionPc, HashSet<Instruction>> {
        &self.instructions
    }

    /// Subroutines whose return state could not be fully resolved.
    pub fn unresolved_subroutines(&self) -> Vec<SubroutinePc> {
        self.subroutines
            .values()
            .filter(|s| s.has_unknown_state_change())
            .map(|s| s.pc())
            .collect()
    }

    pub fn jump_table(&self, pc: InstructionPc) -> Option<&JumpTable> {
        self.jump_tables.get(&pc)
    }

    pub fn jump_tables(&self) -> &HashMap<InstructionPc, JumpTable> {
        &self.jump_tables
    }

    /// Remember that an indirect transfer at `pc` needs a table definition.
    pub(crate) fn note_unknown_jump_table(&mut self, pc: InstructionPc) {
        self.jump_tables.entry(pc).or_insert_with(JumpTable::unknown);
    }

    /// Define a jump table: the caller at `caller_pc` dispatches through
    /// pointers at offsets `range.0 ..= range.1` (stepping by words) from
    /// its own operand.
    ///
    /// Takes effect on derived data at the next `run`.
    pub fn define_jump_table(
        &mut self,
        caller_pc: InstructionPc,
        range: (u16, u16),
        status: JumpTableStatus,
    ) {
        let caller = match self.any_instruction(caller_pc) {
            Some(instruction) => instruction.clone(),
            None => return,
        };
        let operand = match caller.argument() {
            Some(operand) => operand,
            None => return,
        };
        let bank = caller.pc() & 0xFF_0000;

        let table = self
            .jump_tables
            .entry(caller_pc)
            .or_insert_with(JumpTable::unknown);
        let mut offset = range.0;
        while offset <= range.1 {
            let pointer = bank | (operand + offset as u32);
            let target = bank | self.rom.read_word(pointer) as u32;
            table.targets.insert(Some(offset), target);
            match offset.checked_add(2) {
                Some(next) => offset = next,
                None => break,
            }
        }
        table.status = status;
    }

    pub fn undefine_jump_table(&mut self, caller_pc: InstructionPc) {
        self.jump_tables.remove(&caller_pc);
    }

    /// Restore a previously saved jump table verbatim.
    pub fn set_jump_table(&mut self, caller_pc: InstructionPc, table: JumpTable) {
        self.jump_tables.insert(caller_pc, table);
    }

    pub fn add_assertion(
        &mut self,
        assertion: Assertion,
        pc: InstructionPc,
        subroutine_pc: SubroutinePc,
    ) {
        self.assertions.insert((pc, subroutine_pc), assertion);
    }

    pub fn remove_assertion(&mut self, pc: InstructionPc, subroutine_pc: SubroutinePc) {
        self.assertions.remove(&(pc, subroutine_pc));
    }

    pub fn assertion(&self, pc: InstructionPc, subroutine_pc: SubroutinePc) -> Option<Assertion> {
        self.assertions.get(&(pc, subroutine_pc)).copied()
    }

    pub fn assertions(&self) -> &HashMap<PcPair, Assertion> {
        &self.assertions
    }

    pub fn comment(&self, pc: InstructionPc) -> Option<&str> {
        self.comments.get(&pc).map(String::as_str)
    }

    /// Attach a comment to a PC; an empty comment removes the entry.
    pub fn set_comment(&mut self, pc: InstructionPc, comment: &str) {
        if comment.is_empty() {
            self.comments.remove(&pc);
        } else {
            self.comments.insert(pc, comment.to_string());
        }
    }

    pub fn comments(&self) -> &HashMap<InstructionPc, String> {
        &self.comments
    }

    /// Register a custom label for a site.
    ///
    /// With no subroutine the rename applies to the subroutine entry at
    /// `pc` itself.
    pub fn rename_label(
        &mut self,
        new_label: &str,
        pc: InstructionPc,
        subroutine_pc: Option<SubroutinePc>,
    ) {
        let key = (pc, subroutine_pc.unwrap_or(pc));
        self.custom_labels.insert(key, new_label.to_string());
    }

    pub fn custom_labels(&self) -> &HashMap<PcPair, String> {
        &self.custom_labels
    }

    /// The label for an address: custom labels win over subroutine entry
    /// labels, which win over generated local labels.
    pub fn get_label(
        &self,
        pc: InstructionPc,
        subroutine_pc: Option<SubroutinePc>,
    ) -> Option<String> {
        let key = (pc, subroutine_pc.unwrap_or(pc));
        if let Some(custom) = self.custom_labels.get(&key) {
            return Some(custom.clone());
        }

        if let Some(subroutine) = self.subroutines.get(&pc) {
            return Some(subroutine.label().to_string());
        }

        let subroutine = self.subroutines.get(&subroutine_pc?)?;
        let instruction = subroutine.instructions().get(&pc)?;
        instruction.label().map(|label| format!(".{}", label))
    }

    /// Label every referenced instruction that is not a subroutine entry.
    fn generate_local_labels(&mut self) {
        let mut pending: Vec<(SubroutinePc, InstructionPc)> = Vec::new();
        for edges in self.references.values() {
            for edge in edges {
                if !self.subroutines.contains_key(&edge.target) {
                    pending.push((edge.subroutine_pc, edge.target));
                }
            }
        }

        for (subroutine_pc, target) in pending {
            if let Some(subroutine) = self.subroutines.get_mut(&subroutine_pc) {
                if let Some(instruction) = subroutine.instruction_mut(target) {
                    instruction.set_label(Some(format!("loc_{:06X}", target)));
                }
            }
        }
    }

    /// Persist the user-authored subset to a project file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        crate::project::Project::from_analysis(self).write(path)
    }

    /// Restore user metadata from a project file and re-run the analysis.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
        crate::project::Project::read(path)?.apply(self);
        self.run();
        Ok(())
    }
}
