/*!
 * Real child process tests
 */

#![cfg(unix)]

use crate::fakes::GRACE;
use pretty_assertions::assert_eq;
use resource_governor::{
    ExitStatus, ProcessError, ProcessRegistry, ProcessState, RegistryConfig, TerminationOutcome,
};
use std::time::Duration;

fn registry() -> ProcessRegistry {
    ProcessRegistry::new(
        RegistryConfig::default()
            .with_wait_timeout(Duration::from_secs(2))
            .with_poll_interval(Duration::from_millis(5)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_terminate_real_sleep_child() {
    let registry = registry();
    let child = tokio::process::Command::new("sleep")
        .arg("30")
        .spawn()
        .unwrap();

    let handle = registry.register(child).unwrap();
    let pid = handle.pid();

    let outcome = registry.terminate(pid, GRACE).await.unwrap();

    assert_eq!(outcome, TerminationOutcome::Terminated);
    assert_eq!(handle.state(), ProcessState::Terminated);
    assert!(!registry.contains(pid));
}

#[tokio::test]
async fn test_wait_for_real_child_exit_code() {
    let registry = registry();
    let child = std::process::Command::new("sh")
        .args(["-c", "exit 3"])
        .spawn()
        .unwrap();
    let pid = child.id();
    registry.register(child).unwrap();

    let status = registry.wait(pid, Duration::from_secs(5)).await.unwrap();

    assert_eq!(status, ExitStatus::Code(3));
    assert!(!registry.contains(pid));
}

#[tokio::test]
async fn test_supervised_child_killed_when_guard_dropped() {
    let registry = registry();
    let child = tokio::process::Command::new("sleep")
        .arg("30")
        .spawn()
        .unwrap();
    let guard = registry.supervise(child).unwrap();
    let handle = std::sync::Arc::clone(guard.handle());

    drop(guard);

    for _ in 0..200 {
        if handle.state() == ProcessState::Terminated {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(handle.state(), ProcessState::Terminated);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_reaped_tokio_child_is_refused() {
    let registry = registry();
    let mut child = tokio::process::Command::new("true").spawn().unwrap();
    child.wait().await.unwrap();

    assert_eq!(
        registry.register(child).unwrap_err(),
        ProcessError::InvalidPid(0)
    );
    assert!(registry.is_empty());
}
