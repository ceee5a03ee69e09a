// ABOUTME: Deployment orchestration: state machine, record history, and failure policy.
// ABOUTME: Exports the orchestrator, its records, and the store that enforces one live deploy per target.

mod error;
mod orchestrator;
mod record;
mod rollback;
mod state;
mod store;
mod transitions;

pub use error::{DeployError, DeployErrorKind};
pub use orchestrator::Orchestrator;
pub use record::{DeploymentRecord, RecordUpdate, RollbackOutcome, TransitionEntry};
pub use state::{DeploymentState, FailureStage};
pub use store::RecordStore;
