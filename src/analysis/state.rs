//! Processor state and the state-change lattice.
//!
//! Only two bits of the 65816 status register change how code decodes: `m`
//! (accumulator width) and `x` (index width). `State` carries the full
//! register byte but interprets nothing else; `StateChange` is the delta a
//! stretch of code applies to those two bits, or a tagged "unknown" when the
//! walker cannot keep tracking them soundly.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

const M_MASK: u8 = 0x20;
const X_MASK: u8 = 0x10;

/// The status register (P).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    p: u8,
}

impl State {
    pub fn new(p: u8) -> Self {
        State { p }
    }

    pub fn from_flags(m: bool, x: bool) -> Self {
        let mut state = State { p: 0 };
        state.set_m(m);
        state.set_x(x);
        state
    }

    pub fn p(self) -> u8 {
        self.p
    }

    /// Accumulator size flag: true means 8-bit.
    pub fn m(self) -> bool {
        self.p & M_MASK != 0
    }

    /// Index size flag: true means 8-bit.
    pub fn x(self) -> bool {
        self.p & X_MASK != 0
    }

    pub fn set_m(&mut self, m: bool) {
        if m {
            self.p |= M_MASK;
        } else {
            self.p &= !M_MASK;
        }
    }

    pub fn set_x(&mut self, x: bool) {
        if x {
            self.p |= X_MASK;
        } else {
            self.p &= !X_MASK;
        }
    }

    /// Size of the accumulator in bytes.
    pub fn size_a(self) -> usize {
        if self.m() {
            1
        } else {
            2
        }
    }

    /// Size of the index registers in bytes.
    pub fn size_x(self) -> usize {
        if self.x() {
            1
        } else {
            2
        }
    }

    /// Set bits in P (SEP).
    pub fn set(&mut self, mask: u8) {
        self.p |= mask;
    }

    /// Reset bits in P (REP).
    pub fn reset(&mut self, mask: u8) {
        self.p &= !mask;
    }
}

impl Default for State {
    /// Power-on decoding state: 8-bit accumulator and indexes.
    fn default() -> Self {
        State::from_flags(true, true)
    }
}

/// Why a state change could not be determined.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnknownReason {
    Known,
    Unknown,
    SuspectInstruction,
    MultipleReturnStates,
    IndirectJump,
    StackManipulation,
    Recursion,
    MutableCode,
}

impl UnknownReason {
    pub fn description(self) -> &'static str {
        match self {
            UnknownReason::Known => "known",
            UnknownReason::Unknown => "propagated from a callee",
            UnknownReason::SuspectInstruction => "suspect instruction",
            UnknownReason::MultipleReturnStates => "multiple return states",
            UnknownReason::IndirectJump => "indirect jump",
            UnknownReason::StackManipulation => "stack manipulation",
            UnknownReason::Recursion => "recursion",
            UnknownReason::MutableCode => "mutable code",
        }
    }
}

/// The delta a subroutine applies to the `m`/`x` flags.
///
/// Each flag is either untouched (`None`) or forced to a value. A change
/// with a non-`Known` reason is *unknown*: its flag fields carry no meaning,
/// and equality and hashing collapse onto the reason alone.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct StateChange {
    pub m: Option<bool>,
    pub x: Option<bool>,
    reason: UnknownReason,
}

impl Default for StateChange {
    fn default() -> Self {
        StateChange {
            m: None,
            x: None,
            reason: UnknownReason::Known,
        }
    }
}

impl StateChange {
    pub fn new(m: Option<bool>, x: Option<bool>) -> Self {
        StateChange {
            m,
            x,
            reason: UnknownReason::Known,
        }
    }

    pub fn unknown(reason: UnknownReason) -> Self {
        StateChange {
            m: None,
            x: None,
            reason,
        }
    }

    pub fn reason(self) -> UnknownReason {
        self.reason
    }

    pub fn is_unknown(self) -> bool {
        self.reason != UnknownReason::Known
    }

    pub fn is_empty(self) -> bool {
        !self.is_unknown() && self.m.is_none() && self.x.is_none()
    }

    /// Record the flags a SEP sets.
    pub fn set(&mut self, mask: u8) {
        let bits = State::new(mask);
        if bits.m() {
            self.m = Some(true);
        }
        if bits.x() {
            self.x = Some(true);
        }
    }

    /// Record the flags a REP clears.
    pub fn reset(&mut self, mask: u8) {
        let bits = State::new(mask);
        if bits.m() {
            self.m = Some(false);
        }
        if bits.x() {
            self.x = Some(false);
        }
    }

    /// Drop deltas that merely restore a flag value the subroutine is known
    /// to have entered with.
    pub fn apply_inference(&mut self, inference: StateChange) {
        if self.m.is_some() && self.m == inference.m {
            self.m = None;
        }
        if self.x.is_some() && self.x == inference.x {
            self.x = None;
        }
    }

    /// Drop deltas that match the given state, i.e. change nothing for a
    /// caller already in that state.
    pub fn simplify(self, state: State) -> StateChange {
        let mut change = self;
        if change.m == Some(state.m()) {
            change.m = None;
        }
        if change.x == Some(state.x()) {
            change.x = None;
        }
        change
    }
}

impl PartialEq for StateChange {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_unknown(), other.is_unknown()) {
            (true, true) => self.reason == other.reason,
            (false, false) => self.m == other.m && self.x == other.x,
            _ => false,
        }
    }
}

impl Eq for StateChange {}

impl Hash for StateChange {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        if self.is_unknown() {
            true.hash(hasher);
            self.reason.hash(hasher);
        } else {
            false.hash(hasher);
            self.m.hash(hasher);
            self.x.hash(hasher);
        }
    }
}
