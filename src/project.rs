//! Project file structures
//!
//! A project file captures the user-authored subset of an analysis: entry
//! points, comments, custom labels, assertions and jump-table definitions.
//! Derived data is never persisted; a load is always followed by a re-run.
//!
//! The on-disk format is JSON. JSON objects cannot key on integers or
//! pairs, so every map is stored as a vector of key/value entries and the
//! in-memory indexes are rebuilt when the project is applied.

use crate::analysis::{Analysis, Assertion, EntryPoint, JumpTable, JumpTableStatus};
use crate::{InstructionPc, PcPair};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct JumpTableRecord {
    status: JumpTableStatus,
    targets: Vec<(Option<u16>, InstructionPc)>,
}

impl JumpTableRecord {
    fn from_table(table: &JumpTable) -> Self {
        JumpTableRecord {
            status: table.status,
            targets: table.targets.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }

    fn into_table(self) -> JumpTable {
        JumpTable {
            status: self.status,
            targets: self.targets.into_iter().collect::<BTreeMap<_, _>>(),
        }
    }
}

/// The serializable user-data snapshot.
#[derive(Serialize, Deserialize, Default)]
pub struct Project {
    entry_points: Vec<EntryPoint>,
    comments: Vec<(InstructionPc, String)>,
    labels: Vec<(PcPair, String)>,
    assertions: Vec<(PcPair, Assertion)>,
    jump_tables: Vec<(InstructionPc, JumpTableRecord)>,
}

impl Project {
    /// Snapshot the user data of an analysis.
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let mut project = Project {
            entry_points: analysis.entry_points().iter().cloned().collect(),
            comments: analysis
                .comments()
                .iter()
                .map(|(pc, text)| (*pc, text.clone()))
                .collect(),
            labels: analysis
                .custom_labels()
                .iter()
                .map(|(key, label)| (*key, label.clone()))
                .collect(),
            assertions: analysis
                .assertions()
                .iter()
                .map(|(key, assertion)| (*key, *assertion))
                .collect(),
            jump_tables: analysis
                .jump_tables()
                .iter()
                .map(|(pc, table)| (*pc, JumpTableRecord::from_table(table)))
                .collect(),
        };

        // Deterministic files diff better.
        project.entry_points.sort_by_key(|e| e.pc);
        project.comments.sort_by_key(|(pc, _)| *pc);
        project.labels.sort_by_key(|(key, _)| *key);
        project.assertions.sort_by_key(|(key, _)| *key);
        project.jump_tables.sort_by_key(|(pc, _)| *pc);
        project
    }

    /// Restore this snapshot into an analysis. The caller re-runs the
    /// analysis afterwards to rebuild derived data.
    pub fn apply(self, analysis: &mut Analysis) {
        for entry in self.entry_points {
            analysis.add_entry_point(&entry.label, entry.pc, entry.state);
        }
        for (pc, text) in self.comments {
            analysis.set_comment(pc, &text);
        }
        for ((pc, subroutine_pc), label) in self.labels {
            analysis.rename_label(&label, pc, Some(subroutine_pc));
        }
        for ((pc, subroutine_pc), assertion) in self.assertions {
            analysis.add_assertion(assertion, pc, subroutine_pc);
        }
        for (pc, record) in self.jump_tables {
            analysis.set_jump_table(pc, record.into_table());
        }
    }

    pub fn read<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = fs::File::open(path)?;
        let project = serde_json::from_reader(io::BufReader::new(file))?;
        Ok(project)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(io::BufWriter::new(file), self).map_err(|e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("encoding project failed: {}", e),
            )
        })
    }
}
