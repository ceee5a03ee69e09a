// ABOUTME: Best-effort restore of the target's last successful image after a failed deploy.
// ABOUTME: The outcome is noted on the record; it never changes the Failed classification.

use crate::build::ImageBuilder;
use crate::config::DeploymentTarget;
use crate::registry::RegistryClient;
use crate::remote::{CancelFlag, ExecutionError, RemoteExecutor, canonical_sequence};
use crate::types::RecordId;

use super::{Orchestrator, RollbackOutcome};

impl<B, R, E> Orchestrator<B, R, E>
where
    B: ImageBuilder,
    R: RegistryClient,
    E: RemoteExecutor,
{
    /// Reissue the canonical sequence with the image of the target's last
    /// `Succeeded` record, pinned to the digest that record published.
    ///
    /// Returns `None` when no rollback was attempted: rollback is disabled,
    /// the failure never touched the running container, or the target has
    /// no earlier successful deployment.
    pub(super) async fn rollback(
        &self,
        id: &RecordId,
        target: &DeploymentTarget,
        failure: &ExecutionError,
    ) -> Option<RollbackOutcome> {
        if !self.rollback_on_failure {
            return None;
        }
        if !failure.host_changed() {
            tracing::info!(id = %id, "previous container untouched, skipping rollback");
            return None;
        }

        let Some(previous) = self.store.last_succeeded(&target.key()) else {
            tracing::warn!(
                id = %id,
                target = %target.key(),
                "no earlier successful deployment to roll back to"
            );
            return None;
        };
        let image = previous.image;

        tracing::warn!(
            id = %id,
            image = %image,
            digest = image.digest().unwrap_or("none"),
            from = %previous.id,
            "rolling back"
        );

        // The deployment's own flag may be set; rollback runs to completion.
        let commands = canonical_sequence(&image, target, self.healthcheck.as_ref());
        match self
            .executor
            .execute(target, &commands, &CancelFlag::new())
            .await
        {
            Ok(_) => {
                tracing::info!(id = %id, image = %image, "rollback restored previous image");
                Some(RollbackOutcome::Restored { image })
            }
            Err(e) => {
                tracing::error!(id = %id, image = %image, error = %e, "rollback failed");
                Some(RollbackOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        }
    }
}
