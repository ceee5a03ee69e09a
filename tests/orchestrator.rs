// ABOUTME: Integration tests for the deployment orchestrator.
// ABOUTME: Drives full deployments against stub collaborators and an in-memory host.

mod support;

use std::sync::Arc;

use futures::FutureExt;

use hoist::deploy::{DeployErrorKind, DeploymentState, FailureStage};
use hoist::types::RecordId;

use support::fake_host::FakeHost;
use support::flaky_registry::FlakyRegistry;
use support::stub_builder::StubBuilder;

fn state_names(states: impl IntoIterator<Item = DeploymentState>) -> Vec<&'static str> {
    states.into_iter().map(|s| s.name()).collect()
}

/// Test: all collaborators succeed, record walks every state and finishes.
#[tokio::test]
async fn end_to_end_deploy_succeeds() {
    support::init_tracing();
    let host = Arc::new(FakeHost::new());
    let orch = support::orchestrator(
        StubBuilder::new(),
        FlakyRegistry::healthy(),
        Arc::clone(&host),
    );

    let record = orch
        .deploy(&support::spec("v1"), &support::target())
        .await
        .expect("deploy should run");

    assert_eq!(record.state, DeploymentState::Succeeded);
    assert!(record.finished_at.is_some());
    assert!(record.error_detail.is_none());
    assert_eq!(
        state_names(record.transitions.iter().map(|t| t.state.clone())),
        vec!["pending", "building", "publishing", "deploying", "succeeded"]
    );
    assert_eq!(record.image.reference(), "app:v1");
    assert_eq!(record.image.digest(), Some("sha256:registry-v1"));
    assert_eq!(record.publish_attempts, 1);

    let running = host.running_containers();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].0, "flask-app");
    assert_eq!(running[0].1.image, support::pinned("v1"));
}

/// Test: status returns the same snapshot deploy returned.
#[tokio::test]
async fn status_reads_back_record() {
    let host = Arc::new(FakeHost::new());
    let orch = support::orchestrator(StubBuilder::new(), FlakyRegistry::healthy(), host);

    let record = orch
        .deploy(&support::spec("v1"), &support::target())
        .await
        .unwrap();

    assert_eq!(orch.status(&record.id), Some(record.clone()));
    assert!(orch.status(&RecordId::generate()).is_none());
    assert_eq!(orch.history().len(), 1);
}

/// Test: a second deploy for a busy target is rejected, and the first is
/// visible as in progress while it runs.
#[tokio::test]
async fn concurrent_deploy_to_same_target_conflicts() {
    let (builder, gate) = StubBuilder::gated();
    let host = Arc::new(FakeHost::new());
    let orch = support::orchestrator(builder, FlakyRegistry::healthy(), host);
    let target = support::target();

    let spec_v1 = support::spec("v1");
    let spec_v2 = support::spec("v2");
    let first = orch.deploy(&spec_v1, &target);
    let second = async {
        let active = orch
            .store()
            .active(&target.key())
            .expect("first deploy should hold the target");
        assert_eq!(active.state, DeploymentState::Building);
        assert_eq!(orch.status(&active.id).unwrap().state, DeploymentState::Building);

        let result = orch.deploy(&spec_v2, &target).await;
        gate.notify_one();
        (active.id, result)
    };

    let (first, (active_id, second)) = tokio::join!(first, second);

    let err = second.expect_err("second deploy should conflict");
    assert_eq!(err.kind(), DeployErrorKind::Conflict);

    let first = first.unwrap();
    assert_eq!(first.id, active_id);
    assert_eq!(first.state, DeploymentState::Succeeded);
    assert_eq!(orch.builder().calls(), 1);
    assert_eq!(orch.history().len(), 1);
}

/// Test: distinct targets do not block each other.
#[tokio::test]
async fn deploys_to_distinct_targets_proceed() {
    let (builder, gate) = StubBuilder::gated();
    let host = Arc::new(FakeHost::new());
    let orch = support::orchestrator(builder, FlakyRegistry::healthy(), host);

    let mut other = support::target();
    other.host = "web2.example.com".to_string();

    let spec = support::spec("v1");
    let first = support::target();
    let a = orch.deploy(&spec, &first);
    let b = orch.deploy(&spec, &other);
    let release = async {
        gate.notify_waiters();
    };
    let (a, b, ()) = tokio::join!(a, b, release);

    assert_eq!(a.unwrap().state, DeploymentState::Succeeded);
    assert_eq!(b.unwrap().state, DeploymentState::Succeeded);
}

/// Test: the target is released after a terminal state.
#[tokio::test]
async fn target_reusable_after_completion() {
    let host = Arc::new(FakeHost::new());
    let orch = support::orchestrator(
        StubBuilder::new(),
        FlakyRegistry::healthy(),
        Arc::clone(&host),
    );
    let target = support::target();

    orch.deploy(&support::spec("v1"), &target).await.unwrap();
    let second = orch.deploy(&support::spec("v2"), &target).await.unwrap();

    assert_eq!(second.state, DeploymentState::Succeeded);
    assert_eq!(host.running_containers()[0].1.image, support::pinned("v2"));
    assert_eq!(orch.history().len(), 2);
}

/// Test: a build failure fails at the build stage and touches nothing else.
#[tokio::test]
async fn build_failure_stops_before_publish() {
    let host = Arc::new(FakeHost::running("flask-app", "app:v0"));
    let orch = support::orchestrator(
        StubBuilder::failing("requirements.txt: No such file"),
        FlakyRegistry::healthy(),
        Arc::clone(&host),
    );

    let record = orch
        .deploy(&support::spec("v1"), &support::target())
        .await
        .unwrap();

    match &record.state {
        DeploymentState::Failed { stage, reason } => {
            assert_eq!(*stage, FailureStage::Build);
            assert!(reason.contains("compile"), "reason: {reason}");
        }
        other => panic!("expected build failure, got {other}"),
    }
    assert!(record.error_detail.unwrap().contains("requirements.txt"));
    assert_eq!(orch.publisher().client().uploads(), 0);
    assert!(host.log().is_empty());
    assert!(orch.store().active(&support::target().key()).is_none());
}

/// Test: rejected credentials fail the publish stage without any upload.
#[tokio::test]
async fn auth_failure_fails_publish_without_retry() {
    let host = Arc::new(FakeHost::new());
    let orch = support::orchestrator(
        StubBuilder::new(),
        FlakyRegistry::rejecting_login(),
        Arc::clone(&host),
    );

    let record = orch
        .deploy(&support::spec("v1"), &support::target())
        .await
        .unwrap();

    assert!(matches!(
        record.state,
        DeploymentState::Failed {
            stage: FailureStage::Publish,
            ..
        }
    ));
    assert_eq!(orch.publisher().client().logins(), 1);
    assert_eq!(orch.publisher().client().uploads(), 0);
    assert_eq!(record.publish_attempts, 0);
    assert!(host.log().is_empty());
}

/// Test: transfer fails twice then succeeds; exactly three attempts recorded.
#[tokio::test]
async fn records_exactly_three_publish_attempts() {
    let host = Arc::new(FakeHost::new());
    let orch = support::orchestrator(StubBuilder::new(), FlakyRegistry::failing_uploads(2), host);

    let record = orch
        .deploy(&support::spec("v1"), &support::target())
        .await
        .unwrap();

    assert_eq!(record.state, DeploymentState::Succeeded);
    assert_eq!(record.publish_attempts, 3);
    assert_eq!(orch.publisher().client().uploads(), 3);
}

/// Test: exhausted transfer retries fail the publish stage.
#[tokio::test]
async fn exhausted_retries_fail_publish() {
    let host = Arc::new(FakeHost::new());
    let orch = support::orchestrator(
        StubBuilder::new(),
        FlakyRegistry::failing_uploads(10),
        Arc::clone(&host),
    );

    let record = orch
        .deploy(&support::spec("v1"), &support::target())
        .await
        .unwrap();

    assert!(matches!(
        record.state,
        DeploymentState::Failed {
            stage: FailureStage::Publish,
            ..
        }
    ));
    assert_eq!(record.publish_attempts, 3);
    assert_eq!(orch.publisher().client().uploads(), 3);
    assert!(host.log().is_empty());
}

/// Test: cancelling during the build aborts before publishing.
#[tokio::test]
async fn cancel_between_stages_aborts_before_next_stage() {
    let (builder, gate) = StubBuilder::gated();
    let host = Arc::new(FakeHost::new());
    let orch = support::orchestrator(builder, FlakyRegistry::healthy(), Arc::clone(&host));
    let target = support::target();
    let spec = support::spec("v1");

    let deploy = orch.deploy(&spec, &target);
    let cancel = async {
        let active = orch.store().active(&target.key()).unwrap();
        assert!(orch.cancel(&active.id));
        gate.notify_one();
    };
    let (record, ()) = tokio::join!(deploy, cancel);
    let record = record.unwrap();

    assert_eq!(
        record.state,
        DeploymentState::failed(FailureStage::Publish, "cancelled before publish")
    );
    assert_eq!(orch.publisher().client().uploads(), 0);
    assert!(host.log().is_empty());
    assert!(!orch.cancel(&record.id), "finished deploys cannot be cancelled");
}

/// Test: dropping an in-flight deploy fails its record and frees the target.
#[tokio::test]
async fn dropped_deploy_releases_target() {
    let (builder, _gate) = StubBuilder::gated();
    let host = Arc::new(FakeHost::new());
    let orch = support::orchestrator(builder, FlakyRegistry::healthy(), host);
    let target = support::target();
    let spec = support::spec("v1");

    {
        let deploy = orch.deploy(&spec, &target);
        tokio::pin!(deploy);
        let polled = deploy.as_mut().now_or_never();
        assert!(polled.is_none(), "deploy should be parked in the build");
    }

    let history = orch.history();
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].state,
        DeploymentState::failed(FailureStage::Build, "interrupted")
    );
    assert!(orch.store().active(&target.key()).is_none());
}
