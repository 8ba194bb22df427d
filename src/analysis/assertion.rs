//! User-authored state assertions.

use crate::analysis::state::StateChange;
use serde::{Deserialize, Serialize};

/// What an assertion overrides.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssertionType {
    /// The asserted change applies to the local state after the site
    /// executes; the walk continues.
    Instruction,
    /// The walk stops at the site and the asserted change becomes the
    /// enclosing subroutine's state change.
    Subroutine,
}

/// A user-supplied answer for a site the walker cannot analyze soundly.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub assertion_type: AssertionType,
    pub state_change: StateChange,
}
