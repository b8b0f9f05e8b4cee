/*!
 * Registry membership tests
 */

use crate::fakes::{fast_registry, Behavior, Scripted};
use pretty_assertions::assert_eq;
use resource_governor::{Pid, ProcessError, ProcessState};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_register_and_unregister() {
    let registry = fast_registry();
    let (process, _probe) = Scripted::new(100, Behavior::Cooperative);

    let handle = registry.register(process).unwrap();
    assert_eq!(handle.pid(), 100);
    assert_eq!(handle.state(), ProcessState::Running);
    assert!(registry.contains(100));

    assert!(registry.unregister(100));
    assert!(!registry.contains(100));
    assert!(!registry.unregister(100), "unregister is idempotent");
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let registry = fast_registry();
    let (first, _) = Scripted::new(7, Behavior::Cooperative);
    let (second, _) = Scripted::new(7, Behavior::Cooperative);

    let original = registry.register(first).unwrap();
    let err = registry.register(second).unwrap_err();

    assert_eq!(err, ProcessError::DuplicateProcess(7));
    assert_eq!(registry.len(), 1);
    assert!(Arc::ptr_eq(&registry.get(7).unwrap(), &original));
}

#[tokio::test]
async fn test_wait_timeout_keeps_process_tracked() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(9, Behavior::Cooperative);
    registry.register(process).unwrap();

    let err = registry.wait(9, Duration::from_millis(20)).await.unwrap_err();
    assert!(matches!(err, ProcessError::Timeout { pid: 9, .. }));
    assert_eq!(registry.state(9), Some(ProcessState::Running));

    probe.exit();
    registry.wait(9, Duration::from_secs(1)).await.unwrap();
    assert!(!registry.contains(9));
    assert_eq!(registry.stats().exited, 1);
}

#[tokio::test]
async fn test_wait_unknown_pid() {
    let registry = fast_registry();
    assert_eq!(
        registry.wait(404, Duration::from_millis(5)).await.unwrap_err(),
        ProcessError::NotFound(404)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_operations_on_disjoint_pids() {
    const TASKS: Pid = 20;
    const PER_TASK: Pid = 10;

    let registry = fast_registry();
    let mut handles = Vec::new();

    // Task t owns pids t*100 .. t*100+PER_TASK.
    // Even offsets are unregistered, offsets divisible by 3 are terminated,
    // everything else stays tracked.
    for task in 0..TASKS {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            for offset in 0..PER_TASK {
                let pid = task * 100 + offset + 1;
                let (process, _) = Scripted::new(pid, Behavior::Cooperative);
                registry.register(process).unwrap();
            }
            for offset in 0..PER_TASK {
                let pid = task * 100 + offset + 1;
                if offset % 2 == 0 {
                    assert!(registry.unregister(pid));
                } else if offset % 3 == 0 {
                    registry
                        .terminate(pid, Duration::from_millis(30))
                        .await
                        .unwrap();
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let expected: BTreeSet<Pid> = (0..TASKS)
        .flat_map(|task| {
            (0..PER_TASK)
                .filter(|offset| offset % 2 != 0 && offset % 3 != 0)
                .map(move |offset| task * 100 + offset + 1)
        })
        .collect();
    let actual: BTreeSet<Pid> = registry.pids().into_iter().collect();

    assert_eq!(actual, expected);
    assert!(registry
        .snapshot()
        .iter()
        .all(|info| info.state == ProcessState::Running));

    let stats = registry.stats();
    assert_eq!(stats.registered, u64::from(TASKS * PER_TASK));
    assert_eq!(stats.active, expected.len());
}

#[tokio::test]
async fn test_pid_zero_rejected() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(0, Behavior::Cooperative);

    assert_eq!(registry.register(process).unwrap_err(), ProcessError::InvalidPid(0));
    assert_eq!(registry.register_pid(0).unwrap_err(), ProcessError::InvalidPid(0));
    assert!(registry.is_empty());
    assert_eq!(probe.graceful(), 0);
    assert_eq!(registry.stats().registered, 0);
}

#[tokio::test]
async fn test_wait_without_deadline() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(19, Behavior::Cooperative);
    registry.register(process).unwrap();

    let exiter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        probe.exit();
    });

    registry.wait(19, Duration::MAX).await.unwrap();
    exiter.await.unwrap();
    assert!(!registry.contains(19));
}

#[tokio::test]
async fn test_guard_wait_ignores_reused_pid() {
    let registry = fast_registry();
    let (first, first_probe) = Scripted::new(30, Behavior::Cooperative);
    let mut guard = registry.supervise(first).unwrap();

    assert!(registry.unregister(30));
    let (second, _second_probe) = Scripted::new(30, Behavior::Unkillable);
    let reused = registry.register(second).unwrap();
    first_probe.exit();

    assert_eq!(
        guard.wait(Duration::from_millis(20)).await.unwrap_err(),
        ProcessError::NotFound(30)
    );
    assert_eq!(reused.state(), ProcessState::Running);
    assert!(Arc::ptr_eq(&registry.get(30).unwrap(), &reused));

    drop(guard);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        reused.state(),
        ProcessState::Running,
        "dropped guard leaves the new registration alone"
    );
}
