// ABOUTME: Test support utilities.
// ABOUTME: Fixtures plus in-memory stand-ins for the builder, registry, and target host.

use std::sync::{Arc, Once};
use std::time::Duration;

use hoist::build::BuildSpec;
use hoist::config::{CredentialsHandle, DeploymentTarget, RegistryCredentials};
use hoist::deploy::{Orchestrator, RecordStore};
use hoist::registry::{Publisher, RetryPolicy};
use hoist::types::{ContainerName, PortMapping};

use fake_host::{FakeExecutor, FakeHost};
use flaky_registry::FlakyRegistry;
use stub_builder::StubBuilder;

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod fake_host;
#[allow(dead_code)]
pub mod flaky_registry;
#[allow(dead_code)]
pub mod stub_builder;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("hoist=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[allow(dead_code)]
pub fn target() -> DeploymentTarget {
    DeploymentTarget::new("web1.example.com", ContainerName::new("flask-app").unwrap())
        .user("ubuntu")
        .publish(PortMapping::parse("5000:5000").unwrap())
}

#[allow(dead_code)]
pub fn spec(tag: &str) -> BuildSpec {
    BuildSpec::new("./app", "app", tag).unwrap()
}

/// What the fake registry's digest for the first push of `tag` pins to.
#[allow(dead_code)]
pub fn pinned(tag: &str) -> String {
    format!("app@sha256:registry-{}", tag)
}

/// Three attempts with millisecond backoff.
#[allow(dead_code)]
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3)
        .base_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(5))
}

#[allow(dead_code)]
pub fn credentials() -> RegistryCredentials {
    RegistryCredentials {
        server: None,
        username: "deployer".to_string(),
        password: CredentialsHandle::Env("HOIST_TEST_TOKEN".to_string()),
    }
}

#[allow(dead_code)]
pub type TestOrchestrator = Orchestrator<StubBuilder, FlakyRegistry, FakeExecutor>;

/// Orchestrator over stubs with an in-memory store and fast retries.
#[allow(dead_code)]
pub fn orchestrator(
    builder: StubBuilder,
    registry: FlakyRegistry,
    host: Arc<FakeHost>,
) -> TestOrchestrator {
    orchestrator_with_store(builder, registry, host, Arc::new(RecordStore::in_memory()))
}

#[allow(dead_code)]
pub fn orchestrator_with_store(
    builder: StubBuilder,
    registry: FlakyRegistry,
    host: Arc<FakeHost>,
    store: Arc<RecordStore>,
) -> TestOrchestrator {
    let publisher = Publisher::new(registry, Some(credentials())).retry_policy(fast_retry());
    Orchestrator::new(builder, publisher, FakeExecutor::new(host), store)
}
