use crate::{
    Action, AggregateController, CoreError, EntityController, EntityHandle, EntityId, EntityKind,
    EntityView, Phase, PresentationSink, PresentationUpdate, Status,
    tests::support::{FakeEngine, RecordingSink, WAIT, context, wait_for_view, wait_until},
};

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

const FAST_POLL: Duration = Duration::from_millis(20);
const SLOW_POLL: Duration = Duration::from_secs(3600);

fn vm() -> EntityView {
    EntityView::initial(EntityId(0), EntityKind::Vm, "colima", None)
}

fn container(name: &str) -> EntityView {
    EntityView::initial(EntityId(1), EntityKind::Container, name, Some("shop"))
}

fn build(
    engine: &Arc<FakeEngine>,
    sink: &Arc<RecordingSink>,
    initial: EntityView,
    parent: Option<Arc<AggregateController>>,
    poll: Duration,
) -> (EntityController, EntityHandle, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (controller, handle) =
        EntityController::new(initial, context(engine, sink, poll), parent, shutdown_rx);
    (controller, handle, shutdown_tx)
}

/// WHAT: The first successful poll moves the controller to Observing
/// WHY: Initializing only lasts until something has been observed
#[tokio::test]
async fn given_running_vm_when_controller_starts_then_running_and_observing() {
    // Given: A running VM
    let engine = FakeEngine::new();
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, vm(), None, SLOW_POLL);

    // When: The controller runs its first tick
    tokio::spawn(controller.run());

    // Then: The parsed status is published
    let view = wait_for_view(&handle, |v| v.phase == Phase::Observing).await;
    assert_eq!(view.status, Status::Running);
    assert_eq!(view.last_observed_raw, "colima is running");
    assert!(sink.entity_publishes("colima") >= 1);
}

/// WHAT: Failed status queries before any success leave the entity Unknown
/// WHY: No prior state means nothing better to show
#[tokio::test]
async fn given_failing_status_query_when_nothing_observed_then_unknown_and_initializing() {
    // Given: A VM whose status query always fails
    let engine = FakeEngine::new();
    *engine.vm_status_fails.lock().unwrap_or_else(|e| e.into_inner()) = true;
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, vm(), None, FAST_POLL);

    // When: Several ticks elapse
    tokio::spawn(controller.run());
    wait_until(|| sink.entity_publishes("colima") >= 3).await;

    // Then: Still Unknown and still Initializing, republished every tick
    let view = handle.snapshot();
    assert_eq!(view.status, Status::Unknown);
    assert_eq!(view.phase, Phase::Initializing);
}

/// WHAT: An action on a never-observed entity leaves it Initializing
/// WHY: Only a parsed status may promote the entity to Observing
#[tokio::test]
async fn given_unreachable_vm_when_action_runs_then_phase_stays_initializing() {
    // Given: A VM whose status query always fails
    let engine = FakeEngine::new();
    *engine.vm_status_fails.lock().unwrap_or_else(|e| e.into_inner()) = true;
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, vm(), None, SLOW_POLL);
    tokio::spawn(controller.run());

    // When: Start is requested and completes
    let _ = handle.request(Action::Start);
    wait_until(|| engine.position("colima start").is_some()).await;
    let view = wait_for_view(&handle, |v| v.pending.is_none()).await;

    // Then: Nothing was parsed, so the entity is still Initializing and Unknown
    assert_eq!(view.phase, Phase::Initializing);
    assert_eq!(view.status, Status::Unknown);
    assert!(view.last_observed_raw.is_empty());
}

/// WHAT: A zero poll interval still polls instead of panicking
/// WHY: Library callers can build the context with any duration
#[tokio::test]
async fn given_zero_poll_interval_when_controller_runs_then_status_observed() {
    // Given: A running VM and a controller with a zero poll interval
    let engine = FakeEngine::new();
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, vm(), None, Duration::ZERO);

    // When: The controller runs
    let task = tokio::spawn(controller.run());

    // Then: Statuses keep arriving and the task is alive
    wait_until(|| sink.entity_publishes("colima") >= 3).await;
    assert_eq!(handle.snapshot().status, Status::Running);
    assert!(!task.is_finished());
}

/// WHAT: A failed poll after a success keeps the last known status
/// WHY: Transient engine hiccups should not flicker the menu
#[tokio::test]
async fn given_observed_status_when_later_query_fails_then_last_known_retained() {
    // Given: A VM observed as running
    let engine = FakeEngine::new();
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, vm(), None, FAST_POLL);
    tokio::spawn(controller.run());
    wait_for_view(&handle, |v| v.status == Status::Running).await;

    // When: Subsequent queries fail for a few ticks
    *engine.vm_status_fails.lock().unwrap_or_else(|e| e.into_inner()) = true;
    let seen = sink.entity_publishes("colima");
    wait_until(|| sink.entity_publishes("colima") >= seen + 3).await;

    // Then: Running is retained
    let view = handle.snapshot();
    assert_eq!(view.status, Status::Running);
    assert_eq!(view.phase, Phase::Observing);
}

/// WHAT: Two rapid actions on one entity run one after the other
/// WHY: The second action's observation must be the one that sticks
#[tokio::test]
async fn given_two_rapid_actions_when_dispatched_then_serialized_and_last_wins() {
    // Given: A running container whose commands take a while
    let engine = FakeEngine::new().with_container("web", "running");
    engine.set_delay(Duration::from_millis(30));
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, container("web"), None, SLOW_POLL);

    // When: Stop and Start are queued back to back
    let first = handle.request(Action::Stop);
    let second = handle.request(Action::Start);
    tokio::spawn(controller.run());

    // Then: Both were accepted with distinct ids
    assert!(first.is_ok() && second.is_ok());
    assert_ne!(first.ok(), second.ok());

    // And: Stop ran, was observed, then Start ran and was observed
    wait_until(|| engine.position("docker start web").is_some()).await;
    let view = wait_for_view(&handle, |v| {
        v.pending.is_none() && v.phase == Phase::Observing && v.status == Status::Running
    })
    .await;
    assert_eq!(view.status, Status::Running);

    let calls = engine.calls();
    let stop = engine.position("docker stop web").unwrap_or(usize::MAX);
    let start = engine.position("docker start web").unwrap_or(usize::MAX);
    assert!(stop < start);
    assert!(
        calls[stop..start]
            .iter()
            .any(|c| c.starts_with("docker inspect")),
        "no observation between the two actions: {calls:?}"
    );
    assert_eq!(*engine.max_in_flight.lock().unwrap_or_else(|e| e.into_inner()), 1);
}

/// WHAT: The entity shows Mutating with the pending action while a command runs
/// WHY: The menu disables controls and shows progress from this
#[tokio::test]
async fn given_slow_action_when_in_flight_then_mutating_published() {
    // Given: A stopped container with a slow start
    let engine = FakeEngine::new().with_container("web", "exited");
    engine.set_delay(Duration::from_millis(100));
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, container("web"), None, SLOW_POLL);
    tokio::spawn(controller.run());
    wait_for_view(&handle, |v| v.status == Status::Stopped).await;

    // When: Start is requested
    let _ = handle.request(Action::Start);

    // Then: A Mutating snapshot is published before the result
    let busy = wait_for_view(&handle, |v| v.phase == Phase::Mutating).await;
    assert_eq!(busy.pending, Some(Action::Start));
    assert_eq!(busy.status, Status::Stopped);

    let done = wait_for_view(&handle, |v| v.status == Status::Running).await;
    assert_eq!(done.pending, None);
}

/// WHAT: A failing action is swallowed and recorded, status comes from the next poll
/// WHY: Action failures never crash the loop or invent a status
#[tokio::test]
async fn given_failing_action_when_completed_then_failure_recorded_and_status_observed() {
    // Given: A running container whose stop command fails
    let engine = FakeEngine::new().with_container("web", "running");
    engine.fail_verb("stop");
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, container("web"), None, SLOW_POLL);
    tokio::spawn(controller.run());
    wait_for_view(&handle, |v| v.phase == Phase::Observing).await;

    // When: Stop is requested
    let _ = handle.request(Action::Stop);

    // Then: The failure is noted and the re-observation still says Running
    let view = wait_for_view(&handle, |v| v.last_failure.is_some() && v.pending.is_none()).await;
    assert_eq!(view.status, Status::Running);
    assert_eq!(view.phase, Phase::Observing);

    let notices = sink
        .updates()
        .into_iter()
        .filter(|u| matches!(u, PresentationUpdate::ActionFailed(n) if n.action == Action::Stop))
        .count();
    assert_eq!(notices, 1);
}

/// WHAT: A successful delete terminates the controller and detaches it
/// WHY: Deleted containers must disappear from the project and the menu
#[tokio::test]
async fn given_successful_delete_when_completed_then_terminated_and_removed() {
    // Given: A container attached to its project
    let engine = FakeEngine::new().with_container("web", "exited");
    let sink = RecordingSink::new();
    let aggregate = Arc::new(AggregateController::new(
        "shop",
        Arc::clone(&sink) as Arc<dyn PresentationSink>,
    ));
    let (controller, handle, _shutdown) = build(
        &engine,
        &sink,
        container("web"),
        Some(Arc::clone(&aggregate)),
        SLOW_POLL,
    );
    aggregate.attach(handle.clone()).await;
    let task = tokio::spawn(controller.run());

    // When: Delete is requested
    let _ = handle.request(Action::Delete);

    // Then: The loop ends, the entity is Terminated, and removal is published
    assert!(tokio::time::timeout(WAIT, task).await.is_ok());
    assert!(handle.is_terminated());
    assert_eq!(engine.container_state("web"), None);
    assert!(aggregate.is_empty().await);
    assert!(sink.updates().iter().any(|u| matches!(
        u,
        PresentationUpdate::Removed { id, project }
            if *id == EntityId(1) && project.as_deref() == Some("shop")
    )));

    // And: Further requests are rejected
    assert!(matches!(
        handle.request(Action::Start),
        Err(CoreError::ActionRejected { .. })
    ));
}

/// WHAT: Logs open a terminal without touching status
/// WHY: Interactive sessions are fire-and-forget
#[tokio::test]
async fn given_logs_request_when_handled_then_terminal_spawned_and_status_untouched() {
    // Given: A running container
    let engine = FakeEngine::new().with_container("web", "running");
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, container("web"), None, SLOW_POLL);
    tokio::spawn(controller.run());
    wait_for_view(&handle, |v| v.status == Status::Running).await;
    let publishes = sink.entity_publishes("web");

    // When: Logs are requested
    let _ = handle.request(Action::Logs);
    wait_until(|| !engine.spawned.lock().unwrap_or_else(|e| e.into_inner()).is_empty()).await;

    // Then: The terminal command wraps `docker logs -f web` and nothing was run
    let spawned = engine.spawned.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert!(spawned[0].args.iter().any(|a| a.contains("docker logs -f web")));
    assert!(!engine.calls().iter().any(|c| c.contains("logs")));
    assert_eq!(handle.snapshot().phase, Phase::Observing);
    assert_eq!(sink.entity_publishes("web"), publishes);
}

/// WHAT: Unsupported actions are ignored
/// WHY: The VM cannot be deleted from the tray
#[tokio::test]
async fn given_vm_delete_when_handled_then_ignored() {
    // Given: A running VM
    let engine = FakeEngine::new();
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, vm(), None, SLOW_POLL);
    tokio::spawn(controller.run());
    wait_for_view(&handle, |v| v.status == Status::Running).await;

    // When: Delete and then Stop are requested
    let _ = handle.request(Action::Delete);
    let _ = handle.request(Action::Stop);

    // Then: Only Stop ran
    let view = wait_for_view(&handle, |v| v.status == Status::Stopped).await;
    assert_ne!(view.phase, Phase::Terminated);
    assert!(engine.calls().iter().all(|c| c != "colima delete"));
}

/// WHAT: The shutdown signal ends an idle controller loop
/// WHY: Application exit must not leak entity tasks
#[tokio::test]
async fn given_idle_controller_when_shutdown_signalled_then_loop_exits() {
    // Given: A running controller
    let engine = FakeEngine::new();
    let sink = RecordingSink::new();
    let (controller, handle, shutdown) = build(&engine, &sink, vm(), None, SLOW_POLL);
    let task = tokio::spawn(controller.run());
    wait_for_view(&handle, |v| v.phase == Phase::Observing).await;

    // When: Shutdown is signalled
    let _ = shutdown.send(true);

    // Then: The task finishes and the entity is not marked deleted
    assert!(tokio::time::timeout(WAIT, task).await.is_ok());
    assert!(!handle.is_terminated());
}

/// WHAT: A retire request terminates the controller
/// WHY: Containers that vanish from the listing must stop polling
#[tokio::test]
async fn given_retire_request_when_handled_then_terminated() {
    // Given: A running container controller
    let engine = FakeEngine::new().with_container("web", "running");
    let sink = RecordingSink::new();
    let (controller, handle, _shutdown) = build(&engine, &sink, container("web"), None, SLOW_POLL);
    let task = tokio::spawn(controller.run());
    wait_for_view(&handle, |v| v.phase == Phase::Observing).await;

    // When: The controller is retired
    handle.retire();

    // Then: It terminates without running any command
    assert!(tokio::time::timeout(WAIT, task).await.is_ok());
    assert!(handle.is_terminated());
    assert!(engine.calls().iter().all(|c| !c.starts_with("docker rm")));
}
