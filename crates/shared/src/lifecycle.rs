use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{domain::PortalStatus, protocol::EmployeeDraft};

pub const PIPELINE: [PortalStatus; 5] = [
    PortalStatus::Entry,
    PortalStatus::Pending,
    PortalStatus::Reviewing,
    PortalStatus::Reported,
    PortalStatus::Verified,
];

pub fn index_of(status: PortalStatus) -> usize {
    match status {
        PortalStatus::Entry => 0,
        PortalStatus::Pending => 1,
        PortalStatus::Reviewing => 2,
        PortalStatus::Reported => 3,
        PortalStatus::Verified => 4,
    }
}

pub fn is_passed(current: PortalStatus, step: PortalStatus) -> bool {
    index_of(current) >= index_of(step)
}

impl PortalStatus {
    /// One step forward, or `None` at the end of the pipeline.
    pub fn next(self) -> Option<PortalStatus> {
        PIPELINE.get(index_of(self) + 1).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Passed,
    Current,
    Upcoming,
}

/// Each pipeline step paired with how it relates to `current`.
pub fn steps(current: PortalStatus) -> impl Iterator<Item = (PortalStatus, StepState)> {
    PIPELINE.into_iter().map(move |step| {
        let state = if step == current {
            StepState::Current
        } else if is_passed(current, step) {
            StepState::Passed
        } else {
            StepState::Upcoming
        };
        (step, state)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Operator override: any step may be set, including regressions.
    #[default]
    Unrestricted,
    /// Reject moving to an earlier step. Re-setting the current step is allowed.
    ForwardOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("status cannot move back from {from} to {to}")]
pub struct TransitionError {
    pub from: PortalStatus,
    pub to: PortalStatus,
}

impl TransitionPolicy {
    pub fn check(self, from: PortalStatus, to: PortalStatus) -> Result<(), TransitionError> {
        match self {
            Self::Unrestricted => Ok(()),
            Self::ForwardOnly if index_of(to) < index_of(from) => Err(TransitionError { from, to }),
            Self::ForwardOnly => Ok(()),
        }
    }
}

/// Overwrites the record's status and returns the previous one.
pub fn set_status(record: &mut EmployeeDraft, status: PortalStatus) -> PortalStatus {
    std::mem::replace(&mut record.status, status)
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
