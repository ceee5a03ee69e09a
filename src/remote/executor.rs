// ABOUTME: Runs a command sequence in order over one session, honouring tolerances.
// ABOUTME: SshExecutor opens a russh session per execution and always disconnects.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nonempty::NonEmpty;

use crate::config::{DeploymentTarget, SecretProvider};
use crate::ssh::{self, Session, SessionConfig};

use super::{CancelFlag, CommandStage, CommandTransport, ExecutionError, RemoteCommand, Tolerated};

/// What happened for one command of a successful sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub stage: CommandStage,
    pub exit_code: u32,
    /// Set when a non-zero exit was accepted as a no-op.
    pub tolerated: Option<Tolerated>,
    /// Runs needed; above 1 only for polled commands.
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub steps: Vec<StepOutcome>,
}

impl ExecutionResult {
    pub fn tolerated(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.tolerated.is_some())
    }
}

/// Executes command sequences against a deployment target.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(
        &self,
        target: &DeploymentTarget,
        commands: &NonEmpty<RemoteCommand>,
        cancel: &CancelFlag,
    ) -> Result<ExecutionResult, ExecutionError>;
}

/// Run `commands` in order over `transport`, stopping at the first
/// failure that is not in the command's tolerance table.
pub async fn run_sequence<T>(
    transport: &T,
    commands: &NonEmpty<RemoteCommand>,
    timeout: Duration,
    cancel: &CancelFlag,
) -> Result<ExecutionResult, ExecutionError>
where
    T: CommandTransport + ?Sized,
{
    let mut result = ExecutionResult::default();

    for command in commands.iter() {
        if cancel.is_cancelled() {
            tracing::warn!(stage = %command.stage, "cancellation requested, stopping sequence");
            return Err(ExecutionError::Cancelled {
                stage: command.stage,
            });
        }
        let step = run_command(transport, command, timeout).await?;
        result.steps.push(step);
    }

    Ok(result)
}

async fn run_command<T>(
    transport: &T,
    command: &RemoteCommand,
    timeout: Duration,
) -> Result<StepOutcome, ExecutionError>
where
    T: CommandTransport + ?Sized,
{
    let (attempts, interval) = match command.poll {
        Some(poll) => {
            if !poll.delay.is_zero() {
                tokio::time::sleep(poll.delay).await;
            }
            (poll.attempts.max(1), poll.interval)
        }
        None => (1, Duration::ZERO),
    };

    let mut attempt = 0;
    loop {
        attempt += 1;
        tracing::debug!(
            stage = %command.stage,
            line = %command.line,
            attempt,
            "running remote command"
        );

        let output = match transport.exec(&command.line, timeout).await {
            Ok(output) => output,
            Err(ssh::Error::CommandTimeout(timeout)) => {
                return Err(ExecutionError::Timeout {
                    stage: command.stage,
                    timeout,
                });
            }
            Err(source) => {
                return Err(ExecutionError::Transport {
                    stage: command.stage,
                    source,
                });
            }
        };

        if output.success() {
            return Ok(StepOutcome {
                stage: command.stage,
                exit_code: 0,
                tolerated: None,
                attempts: attempt,
            });
        }

        if let Some(tolerated) = command.tolerated(&output) {
            tracing::info!(
                stage = %command.stage,
                exit_code = output.exit_code,
                ?tolerated,
                "treating command failure as no-op"
            );
            return Ok(StepOutcome {
                stage: command.stage,
                exit_code: output.exit_code,
                tolerated: Some(tolerated),
                attempts: attempt,
            });
        }

        if attempt < attempts {
            tracing::debug!(stage = %command.stage, attempt, ?interval, "not ready, polling again");
            tokio::time::sleep(interval).await;
            continue;
        }

        return Err(ExecutionError::Command {
            stage: command.stage,
            exit_code: output.exit_code,
            output: output.combined(),
        });
    }
}

/// Reaches targets over SSH.
pub struct SshExecutor {
    secrets: Arc<dyn SecretProvider>,
    command_timeout: Duration,
}

impl SshExecutor {
    pub fn new(secrets: Arc<dyn SecretProvider>, command_timeout: Duration) -> Self {
        Self {
            secrets,
            command_timeout,
        }
    }
}

impl std::fmt::Debug for SshExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshExecutor")
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(
        &self,
        target: &DeploymentTarget,
        commands: &NonEmpty<RemoteCommand>,
        cancel: &CancelFlag,
    ) -> Result<ExecutionResult, ExecutionError> {
        let connect = async {
            let config = SessionConfig::for_target(target, self.secrets.as_ref())?
                .command_timeout(self.command_timeout);
            Session::connect(config).await
        };
        let session = connect.await.map_err(|source| ExecutionError::Connect {
            host: target.host.clone(),
            source,
        })?;

        tracing::debug!(host = %session.host(), commands = commands.len(), "session established");

        let result = run_sequence(&session, commands, self.command_timeout, cancel).await;

        if let Err(e) = session.disconnect().await {
            tracing::warn!(host = %target.host, error = %e, "failed to close SSH session");
        }

        result
    }
}
