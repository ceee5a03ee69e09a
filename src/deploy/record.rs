// ABOUTME: The per-attempt deployment record and its transition history.
// ABOUTME: Records hold credential handles only, never resolved secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DeploymentTarget, TargetKey};
use crate::types::{ImageReference, RecordId};

use super::DeploymentState;

/// One timestamped entry in a record's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEntry {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: DeploymentState,
}

/// Result of restoring the previous image after a failed deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RollbackOutcome {
    Restored { image: ImageReference },
    Failed { reason: String },
}

impl std::fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackOutcome::Restored { image } => write!(f, "rolled back to {}", image),
            RollbackOutcome::Failed { reason } => write!(f, "rollback failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: RecordId,
    pub image: ImageReference,
    pub target: DeploymentTarget,
    #[serde(flatten)]
    pub state: DeploymentState,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_detail: Option<String>,
    /// Registry upload attempts, including the successful one.
    #[serde(default)]
    pub publish_attempts: u32,
    #[serde(default)]
    pub rollback: Option<RollbackOutcome>,
    #[serde(default)]
    pub transitions: Vec<TransitionEntry>,
    /// Host that ran the deployment.
    pub initiated_by: String,
}

impl DeploymentRecord {
    pub(crate) fn new(image: ImageReference, target: DeploymentTarget) -> Self {
        let now = Utc::now();
        DeploymentRecord {
            id: RecordId::generate(),
            image,
            target,
            state: DeploymentState::Pending,
            started_at: now,
            finished_at: None,
            error_detail: None,
            publish_attempts: 0,
            rollback: None,
            transitions: vec![TransitionEntry {
                at: now,
                state: DeploymentState::Pending,
            }],
            initiated_by: gethostname::gethostname().to_string_lossy().into_owned(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn target_key(&self) -> TargetKey {
        self.target.key()
    }

    /// Live for longer than `threshold`; its deployer is assumed gone.
    pub fn is_stale(&self, threshold: std::time::Duration) -> bool {
        let Ok(threshold) = chrono::Duration::from_std(threshold) else {
            return false;
        };
        !self.is_terminal() && Utc::now() - self.started_at >= threshold
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// Field changes applied together with a state transition.
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    pub image: Option<ImageReference>,
    pub publish_attempts: Option<u32>,
    pub rollback: Option<RollbackOutcome>,
    pub error_detail: Option<String>,
}

impl RecordUpdate {
    pub fn image(image: ImageReference) -> Self {
        RecordUpdate {
            image: Some(image),
            ..Self::default()
        }
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.publish_attempts = Some(attempts);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    pub fn rollback(mut self, outcome: Option<RollbackOutcome>) -> Self {
        self.rollback = outcome;
        self
    }

    pub(crate) fn apply(self, record: &mut DeploymentRecord) {
        if let Some(image) = self.image {
            record.image = image;
        }
        if let Some(attempts) = self.publish_attempts {
            record.publish_attempts = attempts;
        }
        if self.rollback.is_some() {
            record.rollback = self.rollback;
        }
        if self.error_detail.is_some() {
            record.error_detail = self.error_detail;
        }
    }
}
