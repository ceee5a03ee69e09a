// ABOUTME: Remote execution of the container replacement sequence on a target host.
// ABOUTME: Commands, tolerances, cancellation, and the SSH-backed executor.

mod cancel;
mod command;
mod error;
mod executor;
mod transport;

pub use cancel::CancelFlag;
pub use command::{CommandStage, Poll, RemoteCommand, Tolerated, canonical_sequence};
pub use error::{ExecutionError, ExecutionErrorKind};
pub use executor::{ExecutionResult, RemoteExecutor, SshExecutor, StepOutcome, run_sequence};
pub use transport::CommandTransport;
