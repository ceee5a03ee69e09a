// ABOUTME: The stage-by-stage drive of one deployment record.
// ABOUTME: Each stage either advances the record or moves it to Failed with its stage.

use crate::build::{BuildSpec, ImageBuilder};
use crate::config::DeploymentTarget;
use crate::registry::RegistryClient;
use crate::remote::{CancelFlag, RemoteExecutor, canonical_sequence};
use crate::types::RecordId;

use super::{
    DeployError, DeploymentRecord, DeploymentState, FailureStage, Orchestrator, RecordUpdate,
};

impl<B, R, E> Orchestrator<B, R, E>
where
    B: ImageBuilder,
    R: RegistryClient,
    E: RemoteExecutor,
{
    pub(super) async fn run(
        &self,
        id: &RecordId,
        spec: &BuildSpec,
        target: &DeploymentTarget,
        cancel: &CancelFlag,
    ) -> Result<DeploymentRecord, DeployError> {
        // =====================================================================
        // Pending -> Building
        // =====================================================================

        if cancel.is_cancelled() {
            return self.fail(
                id,
                FailureStage::Build,
                "cancelled before build",
                RecordUpdate::default(),
            );
        }
        self.store
            .transition(id, DeploymentState::Building, RecordUpdate::default())?;

        let built = match self.builder.build(spec).await {
            Ok(image) => image,
            Err(e) => {
                let detail = match e.output() {
                    Some(output) => format!("{}\n{}", e, output),
                    None => e.to_string(),
                };
                return self.fail(
                    id,
                    FailureStage::Build,
                    format!("{} stage: {}", e.stage(), e),
                    RecordUpdate::default().detail(detail),
                );
            }
        };

        // =====================================================================
        // Building -> Publishing
        // =====================================================================

        if cancel.is_cancelled() {
            return self.fail(
                id,
                FailureStage::Publish,
                "cancelled before publish",
                RecordUpdate::default(),
            );
        }
        self.store.transition(
            id,
            DeploymentState::Publishing,
            RecordUpdate::image(built.clone()),
        )?;

        let published = match self.publisher.publish(&built).await {
            Ok(published) => published,
            Err(failure) => {
                return self.fail(
                    id,
                    FailureStage::Publish,
                    failure.to_string(),
                    RecordUpdate::default().attempts(failure.attempts),
                );
            }
        };

        // =====================================================================
        // Publishing -> Deploying
        // =====================================================================

        if cancel.is_cancelled() {
            return self.fail(
                id,
                FailureStage::Deploy,
                "cancelled before deploy",
                RecordUpdate::default().attempts(published.attempts),
            );
        }
        self.store.transition(
            id,
            DeploymentState::Deploying,
            RecordUpdate::image(published.image.clone()).attempts(published.attempts),
        )?;

        let commands = canonical_sequence(&published.image, target, self.healthcheck.as_ref());

        // =====================================================================
        // Deploying -> Succeeded
        // =====================================================================

        match self.executor.execute(target, &commands, cancel).await {
            Ok(result) => {
                for step in result.tolerated() {
                    tracing::debug!(id = %id, stage = %step.stage, "remote step was a no-op");
                }
                self.store
                    .transition(id, DeploymentState::Succeeded, RecordUpdate::default())
            }
            Err(e) => {
                let rollback = self.rollback(id, target, &e).await;
                self.fail(
                    id,
                    FailureStage::Deploy,
                    e.to_string(),
                    RecordUpdate::default().rollback(rollback),
                )
            }
        }
    }

    /// Move `id` to `Failed(stage, reason)`. A rollback outcome in `update`
    /// is appended to the error detail.
    fn fail(
        &self,
        id: &RecordId,
        stage: FailureStage,
        reason: impl Into<String>,
        update: RecordUpdate,
    ) -> Result<DeploymentRecord, DeployError> {
        let reason = reason.into();
        let detail = update.error_detail.clone().unwrap_or_else(|| reason.clone());
        let detail = match &update.rollback {
            Some(outcome) => format!("{}; {}", detail, outcome),
            None => detail,
        };
        self.store.transition(
            id,
            DeploymentState::failed(stage, reason),
            update.detail(detail),
        )
    }
}
