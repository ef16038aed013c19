//! Command classifier.
//!
//! Decides before the first command runs whether a plan needs an undo group.

use serde::{Deserialize, Serialize};

use crate::Plan;

/// Verdict attached to a plan before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// At least one command mutates the remote session
    pub mutating: bool,
    /// Index of the first mutating command
    pub first_mutating: Option<usize>,
}

/// Classify a plan from the static kind of each command.
pub fn classify(plan: &Plan) -> Classification {
    let first_mutating = plan.commands.iter().position(|c| c.is_mutating());
    Classification {
        mutating: first_mutating.is_some(),
        first_mutating,
    }
}
