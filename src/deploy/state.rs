// ABOUTME: Deployment lifecycle states and the legal edges between them.
// ABOUTME: Succeeded and Failed are terminal; Failed is reachable from any other state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The orchestrator stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Build,
    Publish,
    Deploy,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Build => "build",
            FailureStage::Publish => "publish",
            FailureStage::Deploy => "deploy",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DeploymentState {
    Pending,
    Building,
    Publishing,
    Deploying,
    Succeeded,
    Failed { stage: FailureStage, reason: String },
}

impl DeploymentState {
    pub fn failed(stage: FailureStage, reason: impl Into<String>) -> Self {
        DeploymentState::Failed {
            stage,
            reason: reason.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentState::Succeeded | DeploymentState::Failed { .. }
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: &DeploymentState) -> bool {
        use DeploymentState::*;
        match (self, next) {
            (Succeeded | Failed { .. }, _) => false,
            (_, Failed { .. }) => true,
            (Pending, Building)
            | (Building, Publishing)
            | (Publishing, Deploying)
            | (Deploying, Succeeded) => true,
            _ => false,
        }
    }

    /// Stage a failure from this state is attributed to.
    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            DeploymentState::Pending | DeploymentState::Building => Some(FailureStage::Build),
            DeploymentState::Publishing => Some(FailureStage::Publish),
            DeploymentState::Deploying => Some(FailureStage::Deploy),
            DeploymentState::Succeeded => None,
            DeploymentState::Failed { stage, .. } => Some(*stage),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeploymentState::Pending => "pending",
            DeploymentState::Building => "building",
            DeploymentState::Publishing => "publishing",
            DeploymentState::Deploying => "deploying",
            DeploymentState::Succeeded => "succeeded",
            DeploymentState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentState::Failed { stage, reason } => {
                write!(f, "failed ({}): {}", stage, reason)
            }
            other => f.write_str(other.name()),
        }
    }
}
