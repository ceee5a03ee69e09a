// ABOUTME: Remote command model and the canonical replace-container sequence.
// ABOUTME: Each command carries its own tolerance table for benign non-zero exits.

use std::fmt;
use std::time::Duration;

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::config::{DeploymentTarget, HealthcheckConfig};
use crate::ssh::CommandOutput;
use crate::types::ImageReference;

/// Which step of the remote sequence a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStage {
    Pull,
    Stop,
    Remove,
    Start,
    Verify,
}

impl CommandStage {
    /// Whether the step changes what runs on the host.
    pub fn is_destructive(&self) -> bool {
        matches!(self, CommandStage::Stop | CommandStage::Remove | CommandStage::Start)
    }
}

impl fmt::Display for CommandStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandStage::Pull => "pull",
            CommandStage::Stop => "stop",
            CommandStage::Remove => "remove",
            CommandStage::Start => "start",
            CommandStage::Verify => "verify",
        };
        f.write_str(s)
    }
}

/// A non-zero exit that counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tolerated {
    /// The container exists but is already stopped.
    NotRunning,
    /// No container by that name exists.
    NotFound,
}

impl Tolerated {
    fn matches(&self, output: &str) -> bool {
        let output = output.to_lowercase();
        match self {
            Tolerated::NotRunning => output.contains("is not running"),
            Tolerated::NotFound => {
                output.contains("no such container")
                    || output.contains("no container with name or id")
            }
        }
    }
}

/// Retry a command until it succeeds, for readiness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poll {
    pub attempts: u32,
    pub interval: Duration,
    /// Wait before the first attempt.
    pub delay: Duration,
}

impl From<&HealthcheckConfig> for Poll {
    fn from(config: &HealthcheckConfig) -> Self {
        Poll {
            attempts: config.retries.max(1),
            interval: config.interval,
            delay: config.start_period,
        }
    }
}

/// One shell line to run on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub stage: CommandStage,
    pub line: String,
    pub tolerate: &'static [Tolerated],
    pub poll: Option<Poll>,
}

impl RemoteCommand {
    /// Build from argv, quoting each word for the remote shell.
    pub fn argv<I, S>(stage: CommandStage, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::shell(stage, shell_words::join(args))
    }

    /// Use `line` as-is.
    pub fn shell(stage: CommandStage, line: impl Into<String>) -> Self {
        RemoteCommand {
            stage,
            line: line.into(),
            tolerate: &[],
            poll: None,
        }
    }

    pub fn tolerate(mut self, tolerated: &'static [Tolerated]) -> Self {
        self.tolerate = tolerated;
        self
    }

    pub fn poll(mut self, poll: Poll) -> Self {
        self.poll = Some(poll);
        self
    }

    /// The tolerated outcome a failed command matched, if any.
    pub fn tolerated(&self, output: &CommandOutput) -> Option<Tolerated> {
        if output.success() {
            return None;
        }
        let text = output.combined();
        self.tolerate.iter().copied().find(|t| t.matches(&text))
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.line)
    }
}

const STOP_TOLERATES: &[Tolerated] = &[Tolerated::NotRunning, Tolerated::NotFound];
const REMOVE_TOLERATES: &[Tolerated] = &[Tolerated::NotFound];

/// Pull `image`, replace the target's container with it, and optionally
/// wait for it to become healthy.
///
/// An image carrying a registry digest is pulled and run by that digest, so
/// a tag pushed over since cannot swap in a different artifact.
pub fn canonical_sequence(
    image: &ImageReference,
    target: &DeploymentTarget,
    healthcheck: Option<&HealthcheckConfig>,
) -> NonEmpty<RemoteCommand> {
    let runtime = target.runtime.program();
    let container = target.container.as_str();
    let reference = image.pinned();

    let mut commands = NonEmpty::new(RemoteCommand::argv(
        CommandStage::Pull,
        [runtime, "pull", reference.as_str()],
    ));

    commands.push(
        RemoteCommand::argv(CommandStage::Stop, [runtime, "stop", container])
            .tolerate(STOP_TOLERATES),
    );
    commands.push(
        RemoteCommand::argv(CommandStage::Remove, [runtime, "rm", container])
            .tolerate(REMOVE_TOLERATES),
    );

    let mut run = vec![
        runtime.to_string(),
        "run".to_string(),
        "-d".to_string(),
        "--name".to_string(),
        container.to_string(),
        "--restart".to_string(),
        "unless-stopped".to_string(),
    ];
    for mapping in &target.ports {
        run.push("-p".to_string());
        run.push(mapping.to_string());
    }
    run.push(reference);
    commands.push(RemoteCommand::argv(CommandStage::Start, run));

    if let Some(health) = healthcheck {
        commands.push(running_check(runtime, container).poll(Poll::from(health)));
        if let Some(ref cmd) = health.cmd {
            let poll = Poll {
                delay: Duration::ZERO,
                ..Poll::from(health)
            };
            commands.push(RemoteCommand::shell(CommandStage::Verify, cmd.as_str()).poll(poll));
        }
    }

    commands
}

fn running_check(runtime: &str, container: &str) -> RemoteCommand {
    let inspect = shell_words::join([runtime, "inspect", "-f", "{{.State.Running}}", container]);
    RemoteCommand::shell(
        CommandStage::Verify,
        format!("test \"$({})\" = true", inspect),
    )
}
