// ABOUTME: Error types for deployment orchestration.
// ABOUTME: Stage failures end up on the record; these are the errors deploy() itself returns.

use crate::config::TargetKey;
use crate::types::RecordId;

use super::DeploymentState;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Another deployment for the same target has not finished.
    #[error("deployment {active} is still in progress for {target}")]
    Conflict { target: TargetKey, active: RecordId },

    /// A record was asked to move along an edge the state machine forbids.
    #[error("deployment {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: RecordId,
        from: String,
        to: String,
    },

    #[error("no deployment record with id {0}")]
    UnknownRecord(RecordId),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Conflict,
    InvalidTransition,
    UnknownRecord,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Conflict { .. } => DeployErrorKind::Conflict,
            DeployError::InvalidTransition { .. } => DeployErrorKind::InvalidTransition,
            DeployError::UnknownRecord(_) => DeployErrorKind::UnknownRecord,
        }
    }

    pub(crate) fn invalid_transition(
        id: &RecordId,
        from: &DeploymentState,
        to: &DeploymentState,
    ) -> Self {
        DeployError::InvalidTransition {
            id: id.clone(),
            from: from.name().to_string(),
            to: to.name().to_string(),
        }
    }
}
