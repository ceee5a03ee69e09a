// ABOUTME: Integration tests for the remote command sequence runner.
// ABOUTME: Runs the canonical sequence against an in-memory container host.

mod support;

use std::time::Duration;

use hoist::config::HealthcheckConfig;
use hoist::remote::{
    CancelFlag, CommandStage, ExecutionError, ExecutionErrorKind, Tolerated, canonical_sequence,
    run_sequence,
};
use hoist::types::ImageReference;

use support::fake_host::FakeHost;

const TIMEOUT: Duration = Duration::from_secs(5);

fn image(tag: &str) -> ImageReference {
    ImageReference::new("app", tag).unwrap()
}

fn quick_health(cmd: Option<&str>) -> HealthcheckConfig {
    HealthcheckConfig {
        cmd: cmd.map(str::to_string),
        interval: Duration::from_millis(1),
        retries: 5,
        start_period: Duration::ZERO,
    }
}

/// Test: fresh host, stop and remove are no-ops, one container ends up running.
#[tokio::test]
async fn canonical_sequence_on_empty_host_is_idempotent() {
    support::init_tracing();
    let host = FakeHost::new();
    let commands = canonical_sequence(&image("v1"), &support::target(), None);

    let result = run_sequence(&host, &commands, TIMEOUT, &CancelFlag::new())
        .await
        .expect("sequence should succeed on an empty host");

    let tolerated: Vec<_> = result
        .tolerated()
        .map(|s| (s.stage, s.tolerated))
        .collect();
    assert_eq!(
        tolerated,
        vec![
            (CommandStage::Stop, Some(Tolerated::NotFound)),
            (CommandStage::Remove, Some(Tolerated::NotFound)),
        ]
    );

    let running = host.running_containers();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].0, "flask-app");
    assert_eq!(running[0].1.image, "app:v1");
}

/// Test: running the same sequence twice leaves exactly one container.
#[tokio::test]
async fn repeated_sequence_leaves_single_container() {
    let host = FakeHost::new();
    let commands = canonical_sequence(&image("v1"), &support::target(), None);

    for _ in 0..2 {
        run_sequence(&host, &commands, TIMEOUT, &CancelFlag::new())
            .await
            .unwrap();
    }

    assert_eq!(host.containers().len(), 1);
    assert_eq!(host.running_containers().len(), 1);
}

/// Test: an existing container is replaced by the new image.
#[tokio::test]
async fn replaces_running_container() {
    let host = FakeHost::running("flask-app", "app:v1");
    let commands = canonical_sequence(&image("v2"), &support::target(), None);

    let result = run_sequence(&host, &commands, TIMEOUT, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(result.tolerated().count(), 0);
    assert_eq!(host.running_containers()[0].1.image, "app:v2");

    let verbs: Vec<String> = host
        .log()
        .iter()
        .map(|line| shell_words::split(line).unwrap()[1].clone())
        .collect();
    assert_eq!(verbs, vec!["pull", "stop", "rm", "run"]);
}

/// Test: first untolerated failure stops the sequence with its stage and exit code.
#[tokio::test]
async fn start_failure_reports_stage_and_exit_code() {
    let host = FakeHost::running("flask-app", "app:v1").broken_image("app:v2");
    let commands = canonical_sequence(&image("v2"), &support::target(), None);

    let err = run_sequence(&host, &commands, TIMEOUT, &CancelFlag::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ExecutionErrorKind::CommandFailed);
    assert_eq!(err.stage(), Some(CommandStage::Start));
    assert_eq!(err.exit_code(), Some(125));
    assert!(err.output().unwrap().contains("port is already allocated"));
    assert!(err.host_changed());
    assert!(host.running_containers().is_empty());
}

/// Test: a failed pull stops before anything destructive runs.
#[tokio::test]
async fn pull_failure_leaves_old_container_running() {
    let host = FakeHost::running("flask-app", "app:v1").missing_image("app:v2");
    let commands = canonical_sequence(&image("v2"), &support::target(), None);

    let err = run_sequence(&host, &commands, TIMEOUT, &CancelFlag::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(CommandStage::Pull));
    assert!(!err.host_changed());
    assert_eq!(host.log().len(), 1);
    assert_eq!(host.running_containers()[0].1.image, "app:v1");
}

/// Test: a command exceeding its timeout fails that stage without an exit code.
#[tokio::test]
async fn timeout_fails_stage() {
    let host = FakeHost::new().hang_on("pull");
    let commands = canonical_sequence(&image("v1"), &support::target(), None);

    let err = run_sequence(&host, &commands, Duration::from_millis(50), &CancelFlag::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExecutionError::Timeout {
            stage: CommandStage::Pull,
            timeout,
        } if timeout == Duration::from_millis(50)
    ));
    assert_eq!(err.exit_code(), None);
}

/// Test: a cancelled flag stops the sequence before its first command.
#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let host = FakeHost::running("flask-app", "app:v1");
    let commands = canonical_sequence(&image("v2"), &support::target(), None);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = run_sequence(&host, &commands, TIMEOUT, &cancel).await.unwrap_err();

    assert_eq!(err.kind(), ExecutionErrorKind::Cancelled);
    assert_eq!(err.stage(), Some(CommandStage::Pull));
    assert!(host.log().is_empty());
}

/// Test: cancellation arriving mid-sequence lets the running command finish
/// and stops before the next one.
#[tokio::test]
async fn cancellation_honoured_before_next_command() {
    let cancel = CancelFlag::new();
    let host = FakeHost::running("flask-app", "app:v1").cancel_after("stop", cancel.clone());
    let commands = canonical_sequence(&image("v2"), &support::target(), None);

    let err = run_sequence(&host, &commands, TIMEOUT, &cancel).await.unwrap_err();

    assert!(matches!(
        err,
        ExecutionError::Cancelled {
            stage: CommandStage::Remove
        }
    ));
    assert!(err.host_changed());
    assert_eq!(host.log().len(), 2);
    let containers = host.containers();
    assert!(!containers["flask-app"].running, "stop should have completed");
}

/// Test: health verification polls until the host check passes.
#[tokio::test]
async fn verify_polls_until_healthy() {
    let host = FakeHost::new().failing_checks(2);
    let health = quick_health(Some("curl -fsS http://localhost:5000/"));
    let commands = canonical_sequence(&image("v1"), &support::target(), Some(&health));

    let result = run_sequence(&host, &commands, TIMEOUT, &CancelFlag::new())
        .await
        .unwrap();

    let verify: Vec<_> = result
        .steps
        .iter()
        .filter(|s| s.stage == CommandStage::Verify)
        .map(|s| s.attempts)
        .collect();
    assert_eq!(verify, vec![1, 3]);
}

/// Test: health verification gives up after its retries.
#[tokio::test]
async fn verify_fails_after_retries() {
    let host = FakeHost::new().failing_checks(10);
    let health = quick_health(Some("curl -fsS http://localhost:5000/"));
    let commands = canonical_sequence(&image("v1"), &support::target(), Some(&health));

    let err = run_sequence(&host, &commands, TIMEOUT, &CancelFlag::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(CommandStage::Verify));
    assert_eq!(err.exit_code(), Some(7));
    let checks = host.log().iter().filter(|l| l.starts_with("curl")).count();
    assert_eq!(checks, 5);
}
