// ABOUTME: Deploy command implementation.
// ABOUTME: Wires the docker CLI builder, registry publisher, and SSH executor into the orchestrator.

use std::sync::Arc;

use hoist::build::{ArtifactBuilder, BuildSpec, DockerCli};
use hoist::config::{Config, EnvSecretProvider, SecretProvider};
use hoist::deploy::{DeploymentState, Orchestrator, RollbackOutcome};
use hoist::diagnostics::{Diagnostics, Warning};
use hoist::error::{Error, Result};
use hoist::output::Output;
use hoist::registry::{DockerCliRegistry, Publisher};
use hoist::remote::SshExecutor;

use super::open_store;

pub async fn deploy(
    config: &Config,
    spec: BuildSpec,
    force: bool,
    output: &mut Output,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();

    let store = Arc::new(open_store(config, &mut diag));
    let secrets: Arc<dyn SecretProvider> = Arc::new(EnvSecretProvider);
    let runtime = config.target.runtime;

    let builder = ArtifactBuilder::new(DockerCli::new(runtime), &config.build);
    let publisher = Publisher::new(
        DockerCliRegistry::new(runtime, Arc::clone(&secrets)),
        config.registry.clone(),
    )
    .retry_policy(config.deploy.retry_policy())
    .timeout(config.deploy.publish_timeout);
    let executor = SshExecutor::new(secrets, config.deploy.remote_command_timeout());

    let orchestrator = Orchestrator::new(builder, publisher, executor, Arc::clone(&store))
        .healthcheck(config.healthcheck.clone())
        .rollback_on_failure(config.deploy.rollback_on_failure);

    output.progress(&format!(
        "Deploying {} to {}",
        spec.image(),
        config.target.key()
    ));

    let record = if force {
        orchestrator.deploy_superseding(&spec, &config.target).await?
    } else {
        orchestrator.deploy(&spec, &config.target).await?
    };

    for warning in store.take_warnings() {
        diag.warn(Warning::journal(warning));
    }
    if let Some(RollbackOutcome::Failed { ref reason }) = record.rollback {
        diag.warn(Warning::rollback(format!(
            "{} may have no running container: {}",
            config.target.key(),
            reason
        )));
    }

    output.record(&record);
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    match record.state {
        DeploymentState::Succeeded => {
            output.success(&format!("Deployed {} ({})", record.image, record.id.short()));
            Ok(())
        }
        DeploymentState::Failed { ref reason, .. } => Err(Error::DeploymentFailed {
            id: record.id.to_string(),
            reason: reason.clone(),
        }),
        ref other => Err(Error::DeploymentFailed {
            id: record.id.to_string(),
            reason: format!("ended in non-terminal state {}", other),
        }),
    }
}
