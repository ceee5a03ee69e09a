// ABOUTME: Remote execution error types with SNAFU pattern.
// ABOUTME: Every failure names the command stage it happened in, where there is one.

use std::time::Duration;

use snafu::Snafu;

use super::CommandStage;
use crate::ssh;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ExecutionError {
    #[snafu(display("could not open session to {host}: {source}"))]
    Connect { host: String, source: ssh::Error },

    #[snafu(display("{stage} exited with code {exit_code}: {output}"))]
    Command {
        stage: CommandStage,
        exit_code: u32,
        output: String,
    },

    #[snafu(display("{stage} timed out after {timeout:?}"))]
    Timeout {
        stage: CommandStage,
        timeout: Duration,
    },

    #[snafu(display("{stage} lost the session: {source}"))]
    Transport {
        stage: CommandStage,
        source: ssh::Error,
    },

    #[snafu(display("cancelled before {stage}"))]
    Cancelled { stage: CommandStage },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    /// The session could not be established; nothing ran.
    Connection,
    /// A command exited non-zero outside its tolerance table.
    CommandFailed,
    /// A command exceeded its timeout.
    Timeout,
    /// The session broke while a command was running.
    Transport,
    /// Cancellation was requested before a command started.
    Cancelled,
}

impl ExecutionError {
    pub fn kind(&self) -> ExecutionErrorKind {
        match self {
            ExecutionError::Connect { .. } => ExecutionErrorKind::Connection,
            ExecutionError::Command { .. } => ExecutionErrorKind::CommandFailed,
            ExecutionError::Timeout { .. } => ExecutionErrorKind::Timeout,
            ExecutionError::Transport { .. } => ExecutionErrorKind::Transport,
            ExecutionError::Cancelled { .. } => ExecutionErrorKind::Cancelled,
        }
    }

    /// The stage that failed, or `None` if no command was reached.
    pub fn stage(&self) -> Option<CommandStage> {
        match self {
            ExecutionError::Connect { .. } => None,
            ExecutionError::Command { stage, .. }
            | ExecutionError::Timeout { stage, .. }
            | ExecutionError::Transport { stage, .. }
            | ExecutionError::Cancelled { stage } => Some(*stage),
        }
    }

    pub fn exit_code(&self) -> Option<u32> {
        match self {
            ExecutionError::Command { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Whether the host's container may differ from before the sequence ran.
    ///
    /// Nothing changes until `stop` has run, so failures at `pull` and
    /// cancellation before `stop` leave the old container untouched.
    pub fn host_changed(&self) -> bool {
        match self {
            ExecutionError::Connect { .. } => false,
            ExecutionError::Cancelled { stage } => {
                !matches!(stage, CommandStage::Pull | CommandStage::Stop)
            }
            ExecutionError::Command { stage, .. }
            | ExecutionError::Timeout { stage, .. }
            | ExecutionError::Transport { stage, .. } => *stage != CommandStage::Pull,
        }
    }

    /// Captured command output, for failed commands.
    pub fn output(&self) -> Option<&str> {
        match self {
            ExecutionError::Command { output, .. } => Some(output),
            _ => None,
        }
    }
}
