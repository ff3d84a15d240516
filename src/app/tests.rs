use super::*;
use crate::component::{
    BoxError, Component, Healthchecker, Initializer, PhaseResult, Runner, Shutdowner,
};
use crate::config::OrchestratorConfig;
use crate::context::PhaseContext;
use crate::error::OrchestratorError;
use crate::phase_register::{Phase, PhaseState};
use crate::registry::PRIVILEGED_GROUP;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn create_test_config() -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_name("test-app")
        .with_signals(vec![])
        .with_shutdown_timeout(Duration::from_millis(500))
}

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    fn contains(&self, entry: &str) -> bool {
        self.0.lock().iter().any(|e| e == entry)
    }
}

/// Records every phase call as `name:phase`, optionally after a delay or failing
struct Scripted {
    name: &'static str,
    journal: Journal,
    delay: Duration,
    failing: Option<Phase>,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            delay: Duration::ZERO,
            failing: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn failing(mut self, phase: Phase) -> Self {
        self.failing = Some(phase);
        self
    }

    async fn step(&self, phase: Phase) -> PhaseResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.journal.push(format!("{}:{}", self.name, phase));
        if self.failing == Some(phase) {
            return Err(format!("{} failed", phase).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Healthchecker for Scripted {
    async fn healthcheck(&self, _ctx: PhaseContext) -> PhaseResult {
        self.step(Phase::Healthcheck).await
    }
}

#[async_trait]
impl Initializer for Scripted {
    async fn init(&self, _ctx: PhaseContext) -> PhaseResult {
        self.step(Phase::Init).await
    }
}

#[async_trait]
impl Runner for Scripted {
    async fn run(&self, _ctx: PhaseContext) -> PhaseResult {
        self.step(Phase::Run).await
    }
}

#[async_trait]
impl Shutdowner for Scripted {
    async fn shutdown(&self, _ctx: PhaseContext) -> PhaseResult {
        self.step(Phase::Shutdown).await
    }
}

fn init_run(scripted: Scripted) -> Component {
    let scripted = Arc::new(scripted);
    Component::builder(scripted.name)
        .with_initializer(scripted.clone())
        .with_runner(scripted)
        .build()
}

fn run_until_cancelled(name: &str) -> Component {
    Component::builder(name)
        .run_fn(|ctx| async move {
            ctx.cancelled().await;
            Ok(())
        })
        .build()
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();

    assert_eq!(orchestrator.name(), "test-app");
    assert_eq!(orchestrator.coordinator_state(), CoordinatorState::Idle);
    assert!(orchestrator.outcome().is_none());
    assert!(orchestrator.registry().contains_group(PRIVILEGED_GROUP));
    assert!(orchestrator.component_states().is_empty());
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let config = create_test_config().with_shutdown_timeout(Duration::ZERO);
    assert!(matches!(
        Orchestrator::new(config),
        Err(OrchestratorError::Config(_))
    ));
}

#[tokio::test]
async fn test_empty_application_finishes_on_its_own() {
    let orchestrator = Orchestrator::new(create_test_config().with_exit_code(4)).unwrap();

    let outcome = orchestrator.start(CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.exit_code, 4);
    assert_eq!(outcome.reason, ShutdownReason::ExecutionFinished);
    assert!(outcome.is_clean());
    assert_eq!(orchestrator.coordinator_state(), CoordinatorState::Finished);
    assert_eq!(orchestrator.outcome(), Some(outcome));
}

#[tokio::test]
async fn test_start_only_once() {
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();
    orchestrator.start(CancellationToken::new()).await.unwrap();

    assert!(matches!(
        orchestrator.start(CancellationToken::new()).await,
        Err(OrchestratorError::System { .. })
    ));
}

#[tokio::test]
async fn test_init_failure_skips_run_of_failed_component() {
    let journal = Journal::default();
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();
    let mut failures = orchestrator.subscribe_failures();

    orchestrator
        .add_module_to_group("workers", init_run(Scripted::new("x", &journal)))
        .unwrap();
    orchestrator
        .add_module_to_group(
            "workers",
            init_run(Scripted::new("y", &journal).failing(Phase::Init)),
        )
        .unwrap();

    let outcome = orchestrator.start(CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.exit_code, 0);

    assert!(journal.contains("x:run"));
    assert!(!journal.contains("y:run"));

    let failure = failures.try_recv().unwrap();
    assert_eq!(failure.component, "y");
    assert_eq!(failure.group, "workers");
    assert_eq!(failure.phase, Phase::Init);
    assert_eq!(failure.cause.to_string(), "init failed");
    assert!(matches!(failures.try_recv(), Err(TryRecvError::Empty)));

    let y = orchestrator.component_state("y").unwrap();
    assert_eq!(y.states.init, Some(PhaseState::Failed));
    assert_eq!(y.states.run, Some(PhaseState::Ready));
}

#[tokio::test]
async fn test_init_failure_aborts_rest_of_group_init() {
    let journal = Journal::default();
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();

    orchestrator
        .add_module_to_group(
            "workers",
            init_run(Scripted::new("first", &journal).failing(Phase::Init)),
        )
        .unwrap();
    orchestrator
        .add_module_to_group("workers", init_run(Scripted::new("second", &journal)))
        .unwrap();
    orchestrator
        .add_module_to_group("others", init_run(Scripted::new("third", &journal)))
        .unwrap();

    orchestrator.start(CancellationToken::new()).await.unwrap();

    // The failing group stops, its sibling group does not
    assert!(!journal.contains("second:init"));
    assert!(!journal.contains("second:run"));
    assert!(journal.contains("third:run"));
    assert_eq!(
        orchestrator.component_state("second").unwrap().states.init,
        Some(PhaseState::Ready)
    );
}

#[tokio::test]
async fn test_components_initialize_in_registration_order() {
    let journal = Journal::default();
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();
    for name in ["a", "b", "c"] {
        let scripted = Arc::new(Scripted::new(name, &journal).delayed(Duration::from_millis(5)));
        orchestrator
            .add_module_to_group("ordered", Component::builder(name).with_initializer(scripted).build())
            .unwrap();
    }

    orchestrator.start(CancellationToken::new()).await.unwrap();
    assert_eq!(journal.entries(), vec!["a:init", "b:init", "c:init"]);
}

#[tokio::test]
async fn test_privileged_group_runs_first() {
    let journal = Journal::default();
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();

    let db = Arc::new(Scripted::new("db", &journal).delayed(Duration::from_millis(20)));
    orchestrator
        .add_module_to_group(
            PRIVILEGED_GROUP,
            Component::builder("db")
                .with_initializer(db.clone())
                .with_shutdowner(db)
                .build(),
        )
        .unwrap();

    let api = Arc::new(Scripted::new("api", &journal));
    orchestrator
        .add_module_to_group(
            "api",
            Component::builder("api")
                .with_initializer(api.clone())
                .with_runner(api.clone())
                .with_shutdowner(api)
                .build(),
        )
        .unwrap();

    let outcome = orchestrator.start(CancellationToken::new()).await.unwrap();
    assert!(outcome.is_clean());

    // db has no run phase, so the final sweep shuts it down
    assert_eq!(
        journal.entries(),
        vec!["db:init", "api:init", "api:run", "api:shutdown", "db:shutdown"]
    );
}

#[tokio::test]
async fn test_privileged_group_completes_before_other_groups() {
    let journal = Journal::default();
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();

    let db = Arc::new(Scripted::new("db", &journal).delayed(Duration::from_millis(20)));
    orchestrator
        .add_module_to_group(
            PRIVILEGED_GROUP,
            Component::builder("db")
                .with_initializer(db.clone())
                .with_runner(db.clone())
                .with_shutdowner(db)
                .build(),
        )
        .unwrap();

    let api = Arc::new(Scripted::new("api", &journal));
    orchestrator
        .add_module_to_group(
            "api",
            Component::builder("api")
                .with_initializer(api.clone())
                .with_runner(api.clone())
                .with_shutdowner(api)
                .build(),
        )
        .unwrap();

    let outcome = orchestrator.start(CancellationToken::new()).await.unwrap();
    assert!(outcome.is_clean());
    assert_eq!(outcome.reason, ShutdownReason::ExecutionFinished);

    assert_eq!(
        journal.entries(),
        vec![
            "db:init",
            "db:run",
            "db:shutdown",
            "api:init",
            "api:run",
            "api:shutdown"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_phase_starts_after_shutdown_trigger() {
    let journal = Journal::default();
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();
    orchestrator
        .add_module_to_group(PRIVILEGED_GROUP, run_until_cancelled("infra"))
        .unwrap();

    let late = Arc::new(Scripted::new("b", &journal));
    orchestrator
        .add_module_to_group(
            "late",
            Component::builder("b")
                .with_initializer(late.clone())
                .with_runner(late.clone())
                .with_shutdowner(late)
                .build(),
        )
        .unwrap();

    let running = orchestrator.clone();
    let handle = tokio::spawn(async move { running.start(CancellationToken::new()).await });

    // Trigger while the privileged group still holds the other groups back
    tokio::time::sleep(Duration::from_millis(10)).await;
    let outcome = orchestrator.stop_trigger().trigger(0).await.unwrap();
    assert_eq!(handle.await.unwrap().unwrap(), outcome);
    assert!(outcome.is_clean());

    assert_eq!(journal.entries(), vec!["b:shutdown"]);
    let states = orchestrator.component_state("b").unwrap().states;
    assert_eq!(states.init, Some(PhaseState::Ready));
    assert_eq!(states.run, Some(PhaseState::Ready));
    assert_eq!(states.shutdown, Some(PhaseState::Done));
}

#[tokio::test(start_paused = true)]
async fn test_start_waits_for_runs_winding_down() {
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();
    orchestrator
        .add_module_to_group(
            "service",
            Component::builder("draining")
                .run_fn(|ctx| async move {
                    ctx.cancelled().await;
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(())
                })
                .build(),
        )
        .unwrap();

    let running = orchestrator.clone();
    let handle = tokio::spawn(async move { running.start(CancellationToken::new()).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let stopped = Instant::now();
    orchestrator.stop_trigger().fire(0);
    let outcome = handle.await.unwrap().unwrap();

    assert!(outcome.is_clean());
    assert!(stopped.elapsed() >= Duration::from_millis(50));
    assert_eq!(
        orchestrator.component_state("draining").unwrap().states.run,
        Some(PhaseState::Done)
    );
}

#[tokio::test(start_paused = true)]
async fn test_stuck_run_bounded_by_shutdown_deadline() {
    let journal = Journal::default();
    let config = create_test_config().with_shutdown_timeout(Duration::from_millis(100));
    let orchestrator = Orchestrator::new(config).unwrap();
    orchestrator
        .add_module_to_group(
            "stuck",
            Component::builder("stuck")
                .run_fn(|_ctx| async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(())
                })
                .build(),
        )
        .unwrap();

    let cache = Arc::new(Scripted::new("cache", &journal));
    orchestrator
        .add_module_to_group(
            "cache",
            Component::builder("cache").with_shutdowner(cache).build(),
        )
        .unwrap();

    let running = orchestrator.clone();
    let handle = tokio::spawn(async move { running.start(CancellationToken::new()).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let stopped = Instant::now();
    orchestrator.stop_trigger().fire(0);
    let outcome = handle.await.unwrap().unwrap();
    let elapsed = stopped.elapsed();

    assert!(outcome.is_clean());
    assert_eq!(journal.entries(), vec!["cache:shutdown"]);
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(10));
    assert_eq!(
        orchestrator.component_state("stuck").unwrap().states.run,
        Some(PhaseState::InProcess)
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_signal_registered_before_listener_task_runs() {
    let (triggers, mut reasons) = tokio::sync::mpsc::channel(1);
    let listeners =
        super::runtime::spawn_signal_listeners("test-app", &[ShutdownSignal::User1], triggers);
    assert_eq!(listeners.len(), 1);

    // Delivered before the listener task is first polled
    let status = std::process::Command::new("kill")
        .args(["-USR1", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let reason = tokio::time::timeout(Duration::from_secs(5), reasons.recv())
        .await
        .unwrap();
    assert_eq!(reason, Some(ShutdownReason::Signal(ShutdownSignal::User1)));
}

#[tokio::test(start_paused = true)]
async fn test_groups_run_concurrently() {
    let journal = Journal::default();
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();

    let a = Arc::new(Scripted::new("a", &journal).delayed(Duration::from_secs(2)));
    let b = Arc::new(Scripted::new("b", &journal).delayed(Duration::from_millis(10)));
    orchestrator
        .add_module_to_group("g1", Component::builder("a").with_runner(a).build())
        .unwrap();
    orchestrator
        .add_module_to_group("g2", Component::builder("b").with_runner(b).build())
        .unwrap();

    let running = orchestrator.clone();
    let handle = tokio::spawn(async move { running.start(CancellationToken::new()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        orchestrator.component_state("b").unwrap().states.run,
        Some(PhaseState::Done)
    );
    assert_eq!(
        orchestrator.component_state("a").unwrap().states.run,
        Some(PhaseState::InProcess)
    );

    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome.reason, ShutdownReason::ExecutionFinished);
    assert_eq!(journal.entries(), vec!["b:run", "a:run"]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_timeout_reports_unfinished() {
    let config = create_test_config()
        .with_shutdown_timeout(Duration::from_millis(100))
        .with_exit_code(3);
    let orchestrator = Orchestrator::new(config).unwrap();
    orchestrator
        .add_module_to_group(
            "slow",
            Component::builder("slow")
                .shutdown_fn(|_ctx| async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(())
                })
                .build(),
        )
        .unwrap();

    let started = Instant::now();
    let outcome = orchestrator.start(CancellationToken::new()).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.exit_code, 3);
    assert_eq!(outcome.unfinished, vec!["slow".to_string()]);
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_context_carries_deadline() {
    let config = create_test_config().with_shutdown_timeout(Duration::from_millis(100));
    let orchestrator = Orchestrator::new(config).unwrap();
    orchestrator
        .add_module_to_group(
            "bounded",
            Component::builder("bounded")
                .shutdown_fn(|ctx| async move {
                    match ctx.remaining() {
                        Some(remaining) if remaining <= Duration::from_millis(100) => Ok(()),
                        _ => Err(BoxError::from("shutdown context without deadline")),
                    }
                })
                .build(),
        )
        .unwrap();
    orchestrator
        .add_module_to_group(
            "refusing",
            Component::builder("refusing")
                .shutdown_fn(|_ctx| async { Err(BoxError::from("still busy")) })
                .build(),
        )
        .unwrap();
    let mut failures = orchestrator.subscribe_failures();

    let outcome = orchestrator.start(CancellationToken::new()).await.unwrap();

    // Failed counts as finished
    assert!(outcome.is_clean());
    let failure = failures.try_recv().unwrap();
    assert_eq!(failure.component, "refusing");
    assert_eq!(failure.phase, Phase::Shutdown);
    assert!(matches!(failures.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(
        orchestrator.component_state("bounded").unwrap().states.shutdown,
        Some(PhaseState::Done)
    );
}

#[tokio::test]
async fn test_stop_trigger_sets_exit_code() {
    let journal = Journal::default();
    let orchestrator = Orchestrator::new(create_test_config().with_exit_code(1)).unwrap();
    let mut failures = orchestrator.subscribe_failures();

    orchestrator
        .add_module_to_group("service", run_until_cancelled("worker"))
        .unwrap();
    orchestrator
        .add_module_to_group(
            "broken",
            init_run(Scripted::new("broken", &journal).failing(Phase::Run)),
        )
        .unwrap();

    let running = orchestrator.clone();
    let handle = tokio::spawn(async move { running.start(CancellationToken::new()).await });

    // Wait until the broken component has failed
    let failure = failures.recv().await.unwrap();
    assert_eq!(failure.component, "broken");

    let outcome = orchestrator.stop_trigger().trigger(7).await.unwrap();
    assert_eq!(outcome.exit_code, 7);
    assert_eq!(outcome.reason, ShutdownReason::Triggered { exit_code: 7 });
    assert_eq!(handle.await.unwrap().unwrap(), outcome);

    assert_eq!(
        orchestrator.component_state("worker").unwrap().states.run,
        Some(PhaseState::Done)
    );
}

#[tokio::test]
async fn test_first_trigger_wins() {
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();
    orchestrator
        .add_module_to_group("service", run_until_cancelled("worker"))
        .unwrap();

    let first = orchestrator.stop_trigger();
    let second = orchestrator.stop_trigger();
    first.fire(2);

    let outcome = orchestrator.start(CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.exit_code, 2);

    let late = second.trigger(9).await.unwrap();
    assert_eq!(late.exit_code, 2);
}

#[tokio::test]
async fn test_parent_cancellation_ends_execution() {
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();
    orchestrator
        .add_module_to_group("service", run_until_cancelled("worker"))
        .unwrap();

    let parent = CancellationToken::new();
    let running = orchestrator.clone();
    let token = parent.clone();
    let handle = tokio::spawn(async move { running.start(token).await });

    parent.cancel();
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome.reason, ShutdownReason::ExecutionFinished);
}

#[tokio::test(start_paused = true)]
async fn test_init_timeout_cancels_initializers() {
    let config = create_test_config().with_init_timeout(Duration::from_millis(50));
    let orchestrator = Orchestrator::new(config).unwrap();
    orchestrator
        .add_module_to_group(
            "slow",
            Component::builder("slow")
                .init_fn(|ctx| async move {
                    ctx.cancelled().await;
                    Err(BoxError::from("init deadline exceeded"))
                })
                .run_fn(|_ctx| async { Ok(()) })
                .build(),
        )
        .unwrap();

    let started = Instant::now();
    orchestrator.start(CancellationToken::new()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(50));
    let states = orchestrator.component_state("slow").unwrap().states;
    assert_eq!(states.init, Some(PhaseState::Failed));
    assert_eq!(states.run, Some(PhaseState::Ready));
}

#[tokio::test]
async fn test_shutdown_runs_at_most_once() {
    let journal = Journal::default();
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();

    let clean = Arc::new(Scripted::new("clean", &journal));
    orchestrator
        .add_module_to_group(
            "clean",
            Component::builder("clean")
                .with_runner(clean.clone())
                .with_shutdowner(clean.clone())
                .build(),
        )
        .unwrap();

    // A failed run is skipped by its group but still reached by the sweep
    let failed = Arc::new(Scripted::new("failed", &journal).failing(Phase::Run));
    orchestrator
        .add_module_to_group(
            "failed",
            Component::builder("failed")
                .with_runner(failed.clone())
                .with_shutdowner(failed.clone())
                .build(),
        )
        .unwrap();

    let outcome = orchestrator.start(CancellationToken::new()).await.unwrap();
    assert!(outcome.is_clean());

    // One run plus one shutdown each
    assert_eq!(clean.calls.load(Ordering::SeqCst), 2);
    assert_eq!(failed.calls.load(Ordering::SeqCst), 2);
    for name in ["clean", "failed"] {
        assert_eq!(
            orchestrator.component_state(name).unwrap().states.shutdown,
            Some(PhaseState::Done)
        );
    }
}

#[tokio::test]
async fn test_auto_group_registration() {
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();
    orchestrator.add_group("group-1").unwrap();

    let first = orchestrator
        .add_component_auto_group(run_until_cancelled("a"))
        .unwrap();
    let second = orchestrator
        .add_component_auto_group(run_until_cancelled("b"))
        .unwrap();

    assert_eq!(first, "group-2");
    assert_eq!(second, "group-3");

    let snapshots = orchestrator.component_states();
    let groups: Vec<&str> = snapshots.iter().map(|s| s.group.as_str()).collect();
    assert_eq!(groups, vec!["group-2", "group-3"]);
}

#[tokio::test]
async fn test_rejected_module_addition() {
    let orchestrator = Orchestrator::new(create_test_config()).unwrap();
    let worker = run_until_cancelled("worker");
    orchestrator
        .add_module_to_group("a", worker.clone())
        .unwrap();

    assert!(matches!(
        orchestrator.add_module_to_group("b", worker),
        Err(OrchestratorError::DuplicateComponent { .. })
    ));
    assert!(matches!(
        orchestrator.add_module_to_group("b", Component::builder("empty").build()),
        Err(OrchestratorError::InvalidComponent { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_healthcheck_report() {
    let journal = Journal::default();
    let config = create_test_config().with_healthcheck_timeout(Duration::from_millis(100));
    let orchestrator = Orchestrator::new(config).unwrap();

    let register = |group: &str, scripted: Scripted| {
        let name = scripted.name;
        orchestrator
            .add_module_to_group(
                group,
                Component::builder(name)
                    .with_healthchecker(Arc::new(scripted))
                    .build(),
            )
            .unwrap();
    };
    register(PRIVILEGED_GROUP, Scripted::new("db", &journal));
    register("api", Scripted::new("api", &journal).failing(Phase::Healthcheck));
    register("api", Scripted::new("slow", &journal).delayed(Duration::from_secs(1)));

    let report = orchestrator.run_healthchecks().await;
    assert_eq!(report.application, "test-app");
    assert!(!report.is_healthy());

    let summary: Vec<(&str, Option<PhaseState>, Option<&str>)> = report
        .entries
        .iter()
        .map(|e| (e.component.as_str(), e.state, e.error.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("db", Some(PhaseState::Done), None),
            ("api", Some(PhaseState::Failed), Some("healthcheck failed")),
            ("slow", Some(PhaseState::InProcess), None),
        ]
    );

    // Healthchecks run at most once
    let again = orchestrator.run_healthchecks().await;
    assert_eq!(again.entries[1].state, Some(PhaseState::Failed));
    assert!(again.entries[1].error.is_none());
    assert_eq!(journal.entries().iter().filter(|e| *e == "db:healthcheck").count(), 1);
}
