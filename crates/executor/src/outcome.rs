//! Aggregated result of one plan.

use bridge_core::ResultSet;
use serde::{Deserialize, Serialize};

use crate::{Error, Output};

/// Overall status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Every command succeeded (and the undo group, if any, was committed)
    Success,
    /// A command failed
    Failed,
}

/// What happened to the undo group after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStatus {
    /// The group was cancelled; no change of the plan remains
    RolledBack,
    /// The plan was read-only; there was nothing to roll back
    NotRequired,
}

/// Result of one executed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Position in the plan
    pub index: usize,
    /// Command name
    pub command: String,
    /// Output or error
    pub result: std::result::Result<Output, Error>,
}

impl StepReport {
    /// Whether the command succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// The failure that decided a plan's status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFailure {
    /// Position of the failing command; equal to the plan length when the
    /// commit itself failed
    pub index: usize,
    /// Command name
    pub command: String,
    /// The error
    pub error: Error,
    /// Rollback confirmation
    pub rollback: RollbackStatus,
}

/// Aggregated outcome of one plan.
///
/// A mutating plan is never reported as half-applied: either `status` is
/// `Success` and every step is `Ok`, or `failure.rollback` is `RolledBack`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    /// Overall status
    pub status: PlanStatus,
    /// Whether an undo group wrapped the plan
    pub transactional: bool,
    /// One report per executed command, in order. A failed transactional
    /// plan stops after the failing command.
    pub steps: Vec<StepReport>,
    /// Set when `status` is `Failed`
    pub failure: Option<PlanFailure>,
    /// Objects produced by this plan's last producing command
    pub result_set: Option<ResultSet>,
}

impl PlanOutcome {
    /// Whether the plan succeeded.
    pub fn is_success(&self) -> bool {
        self.status == PlanStatus::Success
    }

    /// Output of step `index`, if it ran and succeeded.
    pub fn output(&self, index: usize) -> Option<&Output> {
        self.steps
            .get(index)
            .and_then(|step| step.result.as_ref().ok())
    }

    /// Errors of every failed step, in order.
    pub fn errors(&self) -> Vec<(usize, &Error)> {
        self.steps
            .iter()
            .filter_map(|step| step.result.as_ref().err().map(|e| (step.index, e)))
            .collect()
    }
}
