// ABOUTME: Error types for image builds.
// ABOUTME: Distinguishes an unusable context from a failing build tool.

use std::fmt;
use std::path::PathBuf;

/// Which part of the build failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// Context missing, unreadable, or incomplete. The tool never ran.
    Context,
    /// The build tool ran and failed, or timed out.
    Compile,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStage::Context => write!(f, "context"),
            BuildStage::Compile => write!(f, "compile"),
        }
    }
}

/// Errors from the artifact builder. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("build context {path} is unusable: {reason}")]
    Context { path: PathBuf, reason: String },

    #[error("image build failed{}: {stderr}", exit_suffix(.exit_code))]
    Compile {
        exit_code: Option<i32>,
        stderr: String,
    },
}

impl BuildError {
    pub fn stage(&self) -> BuildStage {
        match self {
            BuildError::Context { .. } => BuildStage::Context,
            BuildError::Compile { .. } => BuildStage::Compile,
        }
    }

    pub(crate) fn context(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BuildError::Context {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn compile(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        BuildError::Compile {
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Captured tool output, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            BuildError::Compile { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}
