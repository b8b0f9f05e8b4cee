/*!
 * Termination escalation tests
 */

use crate::fakes::{fast_registry, Behavior, Scripted, GRACE};
use pretty_assertions::assert_eq;
use resource_governor::{ProcessError, ProcessState, TerminationOutcome};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_cooperative_process_exits_on_term() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(10, Behavior::Cooperative);
    let handle = registry.register(process).unwrap();

    let outcome = registry.terminate(10, GRACE).await.unwrap();

    assert_eq!(outcome, TerminationOutcome::Terminated);
    assert_eq!(probe.graceful(), 1);
    assert_eq!(probe.forceful(), 0, "no escalation for a prompt exit");
    assert_eq!(handle.state(), ProcessState::Terminated);
    assert!(!registry.contains(10));
}

#[tokio::test]
async fn test_ignoring_term_escalates_to_kill() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(11, Behavior::IgnoresTerm);
    registry.register(process).unwrap();

    let started = Instant::now();
    let outcome = registry.terminate(11, GRACE).await.unwrap();

    assert_eq!(outcome, TerminationOutcome::Terminated);
    assert!(started.elapsed() >= GRACE, "kill only after the grace period");
    assert_eq!(probe.graceful(), 1);
    assert_eq!(probe.forceful(), 1);
    assert!(!registry.contains(11));
}

#[tokio::test]
async fn test_unkillable_process_is_dropped_with_reap_failure() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(12, Behavior::Unkillable);
    let handle = registry.register(process).unwrap();

    let err = registry.terminate(12, GRACE).await.unwrap_err();

    assert_eq!(err, ProcessError::ReapFailed { pid: 12 });
    assert_eq!(probe.forceful(), 1);
    assert_eq!(handle.state(), ProcessState::ReapFailed);
    assert!(!registry.contains(12), "failed handles do not leak");
    assert_eq!(registry.stats().reap_failed, 1);
}

#[tokio::test]
async fn test_terminate_untracked_pid() {
    let registry = fast_registry();
    assert_eq!(
        registry.terminate(999, GRACE).await.unwrap(),
        TerminationOutcome::NotTracked
    );
}

#[tokio::test]
async fn test_already_exited_process_is_not_signalled() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(13, Behavior::Cooperative);
    registry.register(process).unwrap();
    probe.exit();

    let outcome = registry.terminate(13, GRACE).await.unwrap();

    assert_eq!(outcome, TerminationOutcome::Terminated);
    assert_eq!(probe.graceful(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_terminate_signals_once() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(14, Behavior::IgnoresTerm);
    registry.register(process).unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move { registry.terminate(14, GRACE).await }));
    }

    let mut terminated = 0;
    for task in tasks {
        match task.await.unwrap().unwrap() {
            TerminationOutcome::Terminated => terminated += 1,
            TerminationOutcome::AlreadyTerminating | TerminationOutcome::NotTracked => {}
        }
    }

    assert_eq!(terminated, 1);
    assert_eq!(probe.graceful(), 1);
    assert_eq!(probe.forceful(), 1);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_abandoned_terminate_still_completes() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(15, Behavior::IgnoresTerm);
    let handle = registry.register(process).unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(5), registry.terminate(15, GRACE)).await;
    assert!(abandoned.is_err(), "caller gave up before escalation");

    for _ in 0..100 {
        if handle.state() == ProcessState::Terminated {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(handle.state(), ProcessState::Terminated);
    assert_eq!(probe.forceful(), 1);
    assert!(!registry.contains(15));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_terminate_all_isolates_stuck_processes() {
    let registry = fast_registry();
    let mut probes = Vec::new();
    for pid in 1..=10 {
        let behavior = if pid == 4 || pid == 8 {
            Behavior::Unkillable
        } else if pid % 3 == 0 {
            Behavior::IgnoresTerm
        } else {
            Behavior::Cooperative
        };
        let (process, probe) = Scripted::new(pid, behavior);
        registry.register(process).unwrap();
        probes.push(probe);
    }

    let summary = registry.terminate_all(GRACE).await;

    assert_eq!(summary.terminated, 8);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed_pids, vec![4, 8]);
    assert!(!summary.is_clean());
    assert!(registry.is_empty());
    assert!(probes.iter().all(|probe| probe.graceful() == 1));
}

#[tokio::test]
async fn test_terminate_all_on_empty_registry() {
    let registry = fast_registry();
    let summary = registry.terminate_all(GRACE).await;
    assert!(summary.is_clean());
    assert_eq!(summary.terminated + summary.failed + summary.skipped, 0);
}

#[tokio::test]
async fn test_shutdown_uses_configured_grace() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(16, Behavior::IgnoresTerm);
    registry.register(process).unwrap();

    let summary = registry.shutdown().await;

    assert_eq!(summary.terminated, 1);
    assert_eq!(probe.forceful(), 1);
}

#[tokio::test]
async fn test_unbounded_grace_waits_without_overflow() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(17, Behavior::IgnoresTerm);
    let handle = registry.register(process).unwrap();

    let sequence = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.terminate(17, Duration::MAX).await })
    };

    for _ in 0..100 {
        if probe.graceful() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(handle.state(), ProcessState::SignalSent);
    assert_eq!(probe.forceful(), 0, "still inside the grace period");

    probe.exit();
    let outcome = tokio::time::timeout(Duration::from_secs(2), sequence)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(outcome, TerminationOutcome::Terminated);
    assert!(!registry.contains(17));
}

#[tokio::test]
async fn test_unbounded_grace_on_prompt_process() {
    let registry = fast_registry();
    let (process, _probe) = Scripted::new(18, Behavior::Cooperative);
    registry.register(process).unwrap();

    assert_eq!(
        registry.terminate(18, Duration::MAX).await.unwrap(),
        TerminationOutcome::Terminated
    );
    assert!(registry.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_terminate_all_awaits_in_flight_termination() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(50, Behavior::IgnoresTerm);
    registry.register(process).unwrap();

    let in_flight = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.terminate(50, Duration::from_millis(500)).await })
    };
    for _ in 0..100 {
        if probe.graceful() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let summary = registry.terminate_all(Duration::from_millis(10)).await;

    assert_eq!(summary.terminated, 1);
    assert_eq!(summary.skipped, 0);
    assert!(summary.is_clean());
    assert!(registry.is_empty(), "sweep returns only after the process is gone");
    assert_eq!(probe.graceful(), 1);
    assert_eq!(probe.forceful(), 1);
    assert_eq!(
        in_flight.await.unwrap().unwrap(),
        TerminationOutcome::Terminated
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_terminate_all_reports_in_flight_reap_failure() {
    let registry = fast_registry();
    let (process, _probe) = Scripted::new(51, Behavior::Unkillable);
    registry.register(process).unwrap();

    let in_flight = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.terminate(51, GRACE).await })
    };
    while registry.state(51) == Some(ProcessState::Running) {
        tokio::task::yield_now().await;
    }

    let summary = registry.terminate_all(GRACE).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_pids, vec![51]);
    assert!(registry.is_empty());
    assert_eq!(
        in_flight.await.unwrap().unwrap_err(),
        ProcessError::ReapFailed { pid: 51 }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_terminate_all_after_guard_drop() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(52, Behavior::IgnoresTerm);
    let guard = registry.supervise(process).unwrap();

    drop(guard);
    let summary = registry.terminate_all(GRACE).await;

    assert_eq!(summary.terminated, 1);
    assert!(summary.is_clean());
    assert!(registry.is_empty());
    assert_eq!(probe.graceful(), 1, "guard task and sweep never both signal");
}

#[tokio::test]
async fn test_terminate_default_uses_configured_grace() {
    let registry = fast_registry();
    let (process, probe) = Scripted::new(53, Behavior::IgnoresTerm);
    registry.register(process).unwrap();

    let started = Instant::now();
    let outcome = registry.terminate_default(53).await.unwrap();

    assert_eq!(outcome, TerminationOutcome::Terminated);
    assert!(started.elapsed() >= GRACE);
    assert_eq!(probe.forceful(), 1);
}
