// ABOUTME: Deployment orchestrator: owns the collaborators, the record store, and cancellation.
// ABOUTME: deploy() drives one record from Pending to a terminal state; status() reads it back.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::build::{BuildSpec, ImageBuilder};
use crate::config::{DeploymentTarget, HealthcheckConfig};
use crate::registry::{Publisher, RegistryClient};
use crate::remote::{CancelFlag, RemoteExecutor};
use crate::types::RecordId;

use super::{DeployError, DeploymentRecord, RecordStore};

/// Sequences build, publish, and remote execution for one target at a time.
pub struct Orchestrator<B, R, E> {
    pub(super) builder: B,
    pub(super) publisher: Publisher<R>,
    pub(super) executor: E,
    pub(super) store: Arc<RecordStore>,
    pub(super) healthcheck: Option<HealthcheckConfig>,
    pub(super) rollback_on_failure: bool,
    cancels: Mutex<HashMap<RecordId, CancelFlag>>,
}

impl<B, R, E> std::fmt::Debug for Orchestrator<B, R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store)
            .field("rollback_on_failure", &self.rollback_on_failure)
            .finish_non_exhaustive()
    }
}

impl<B, R, E> Orchestrator<B, R, E>
where
    B: ImageBuilder,
    R: RegistryClient,
    E: RemoteExecutor,
{
    pub fn new(builder: B, publisher: Publisher<R>, executor: E, store: Arc<RecordStore>) -> Self {
        Self {
            builder,
            publisher,
            executor,
            store,
            healthcheck: None,
            rollback_on_failure: true,
            cancels: Mutex::new(HashMap::new()),
        }
    }

    /// Verify the new container after start.
    pub fn healthcheck(mut self, healthcheck: Option<HealthcheckConfig>) -> Self {
        self.healthcheck = healthcheck;
        self
    }

    pub fn rollback_on_failure(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn publisher(&self) -> &Publisher<R> {
        &self.publisher
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Build, publish, and deploy `spec` to `target`.
    ///
    /// Stage failures are reported through the returned record's `Failed`
    /// state, not as `Err`. `Err` means no deployment ran: the target was
    /// busy ([`DeployError::Conflict`]) or the record was closed underneath
    /// this call.
    pub async fn deploy(
        &self,
        spec: &BuildSpec,
        target: &DeploymentTarget,
    ) -> Result<DeploymentRecord, DeployError> {
        self.start(spec, target, false).await
    }

    /// Like [`deploy`](Self::deploy), but first fails any live record for
    /// the target as superseded.
    pub async fn deploy_superseding(
        &self,
        spec: &BuildSpec,
        target: &DeploymentTarget,
    ) -> Result<DeploymentRecord, DeployError> {
        self.start(spec, target, true).await
    }

    async fn start(
        &self,
        spec: &BuildSpec,
        target: &DeploymentTarget,
        force: bool,
    ) -> Result<DeploymentRecord, DeployError> {
        let record = self.store.begin(spec.image().clone(), target.clone(), force)?;
        let cancel = CancelFlag::new();
        self.cancels.lock().insert(record.id.clone(), cancel.clone());

        let _in_flight = InFlight {
            store: &self.store,
            cancels: &self.cancels,
            id: record.id.clone(),
        };

        self.run(&record.id, spec, target, &cancel).await
    }

    /// Current snapshot of a record, including in-progress ones.
    pub fn status(&self, id: &RecordId) -> Option<DeploymentRecord> {
        self.store.get(id)
    }

    /// Ask a running deployment to stop at its next checkpoint.
    ///
    /// Returns `false` if `id` is not running in this orchestrator.
    pub fn cancel(&self, id: &RecordId) -> bool {
        match self.cancels.lock().get(id) {
            Some(flag) => {
                tracing::info!(id = %id, "cancellation requested");
                flag.cancel();
                true
            }
            None => false,
        }
    }

    pub fn history(&self) -> Vec<DeploymentRecord> {
        self.store.history()
    }
}

/// Fails the record if `deploy` is dropped or unwinds before it finishes.
struct InFlight<'a> {
    store: &'a RecordStore,
    cancels: &'a Mutex<HashMap<RecordId, CancelFlag>>,
    id: RecordId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.cancels.lock().remove(&self.id);
        if let Some(record) = self.store.abandon(&self.id, "interrupted") {
            tracing::warn!(id = %record.id, state = %record.state, "deployment interrupted");
        }
    }
}
