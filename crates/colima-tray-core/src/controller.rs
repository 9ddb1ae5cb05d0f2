//! Per-entity poll and action loop.
//!
//! Each [`EntityController`] runs as its own task and is the only writer of
//! its entity's state. Polls and action requests are handled by the same
//! `select!` loop, so for one entity every mutation and observation is
//! totally ordered. Other tasks talk to it through an [`EntityHandle`].

use crate::{
    Action, AggregateController, CoreError, CoreResult, EntityId, EntityKind, EntityView,
    FailureNotice, Phase, PresentationSink, PresentationUpdate, ProcessInvoker, Status, Toolchain,
    status::{parse_entity_status, parse_runtime_status},
};

use std::{panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tokio::{
    sync::{mpsc, watch},
    time::MissedTickBehavior,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Shortest poll period; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Shared dependencies handed to every controller.
#[derive(Clone)]
pub struct ControllerContext {
    /// Runs external commands.
    pub invoker: Arc<dyn ProcessInvoker>,
    /// Builds the command lines.
    pub toolchain: Arc<Toolchain>,
    /// Receives every published snapshot.
    pub sink: Arc<dyn PresentationSink>,
    /// Time between status polls.
    pub poll_interval: Duration,
    /// Pending requests an entity accepts before rejecting more.
    pub queue_depth: usize,
}

/// One queued action, tagged for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRequest {
    /// Correlation id.
    pub request_id: Uuid,
    /// Requested action.
    pub action: Action,
}

#[derive(Debug)]
pub(crate) enum Request {
    Act(ActionRequest),
    Retire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Cloneable handle to a running [`EntityController`].
#[derive(Debug, Clone)]
pub struct EntityHandle {
    id: EntityId,
    kind: EntityKind,
    name: String,
    requests: mpsc::Sender<Request>,
    snapshot: watch::Receiver<EntityView>,
}

impl EntityHandle {
    /// Arena id of the entity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// VM or container.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Stable entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue `action` for the entity without waiting for it to run.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ActionRejected`] when the entity's queue is full
    /// or its controller has stopped.
    #[track_caller]
    pub fn request(&self, action: Action) -> CoreResult<Uuid> {
        let request_id = Uuid::new_v4();
        let request = Request::Act(ActionRequest { request_id, action });

        self.requests.try_send(request).map_err(|e| {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "too many pending requests",
                mpsc::error::TrySendError::Closed(_) => "controller has stopped",
            };
            CoreError::ActionRejected {
                entity: self.name.clone(),
                action,
                reason: reason.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        debug!(entity = %self.name, action = %action, request_id = %request_id, "Action queued");
        Ok(request_id)
    }

    /// Ask the controller to terminate after any queued work.
    pub(crate) fn retire(&self) {
        match self.requests.try_send(Request::Retire) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(request)) => {
                let requests = self.requests.clone();
                tokio::spawn(async move {
                    let _ = requests.send(request).await;
                });
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> EntityView {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<EntityView> {
        self.snapshot.clone()
    }

    /// Whether the controller has reached [`Phase::Terminated`].
    pub fn is_terminated(&self) -> bool {
        self.snapshot.borrow().phase == Phase::Terminated
    }
}

/// Poll and action loop for a single entity.
pub struct EntityController {
    view: EntityView,
    ctx: ControllerContext,
    parent: Option<Arc<AggregateController>>,
    requests: mpsc::Receiver<Request>,
    snapshot_tx: watch::Sender<EntityView>,
    shutdown_rx: watch::Receiver<bool>,
}

impl EntityController {
    /// Create a controller seeded with `initial` and the handle that
    /// drives it. Nothing runs until [`EntityController::run`] is awaited.
    pub fn new(
        initial: EntityView,
        ctx: ControllerContext,
        parent: Option<Arc<AggregateController>>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> (Self, EntityHandle) {
        let (requests_tx, requests_rx) = mpsc::channel(ctx.queue_depth.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(initial.clone());

        let handle = EntityHandle {
            id: initial.id,
            kind: initial.kind,
            name: initial.name.clone(),
            requests: requests_tx,
            snapshot: snapshot_rx,
        };

        let controller = Self {
            view: initial,
            ctx,
            parent,
            requests: requests_rx,
            snapshot_tx,
            shutdown_rx,
        };

        (controller, handle)
    }

    /// Run until shutdown, deletion, or retirement.
    #[instrument(skip(self), fields(entity = %self.view.name, id = %self.view.id))]
    pub async fn run(mut self) {
        if *self.shutdown_rx.borrow_and_update() {
            return;
        }

        info!("Controller started");

        let mut ticker = tokio::time::interval(self.ctx.poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    debug!("Controller shutting down");
                    break;
                }

                request = self.requests.recv() => match request {
                    Some(Request::Act(request)) => {
                        if self.handle_action(request).await == Flow::Stop {
                            break;
                        }
                    }
                    Some(Request::Retire) => {
                        info!("Entity no longer listed, retiring");
                        self.terminate().await;
                        break;
                    }
                    None => {
                        debug!("All handles dropped");
                        break;
                    }
                },

                _ = ticker.tick() => self.observe().await,
            }
        }
    }

    async fn observe(&mut self) {
        match self.query_status().await {
            Ok((raw, status)) => {
                if self.view.phase == Phase::Initializing {
                    debug!(status = %status, "First status observed");
                    self.view.phase = Phase::Observing;
                }
                self.view.status = status;
                self.view.last_observed_raw = raw;
            }
            Err(e) => {
                debug!(error = %e, status = %self.view.status, "Keeping last known status");
            }
        }

        self.publish().await;
    }

    async fn query_status(&self) -> CoreResult<(String, Status)> {
        let command = self
            .ctx
            .toolchain
            .status_query(self.view.kind, &self.view.name);
        let invocation = self.ctx.invoker.run(&command).await;
        let raw = invocation.text();

        if !invocation.ok {
            return Err(CoreError::ObservationFailure {
                entity: self.view.name.clone(),
                output: raw.trim().to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let status = match self.view.kind {
            EntityKind::Vm => parse_runtime_status(&raw),
            EntityKind::Container => parse_entity_status(&raw),
        };
        Ok((raw.trim().to_string(), status))
    }

    #[instrument(skip(self), fields(action = %request.action, request_id = %request.request_id))]
    async fn handle_action(&mut self, request: ActionRequest) -> Flow {
        let action = request.action;

        if !action.mutates_status() {
            self.open_interactive(action);
            return Flow::Continue;
        }

        let Some(command) = self
            .ctx
            .toolchain
            .mutation(self.view.kind, &self.view.name, action)
        else {
            warn!("Action not supported for this entity");
            return Flow::Continue;
        };

        let resume = self.view.phase;
        self.view.phase = Phase::Mutating;
        self.view.pending = Some(action);
        self.publish().await;

        let invocation = self.ctx.invoker.run(&command).await;
        self.view.pending = None;

        if invocation.ok {
            info!("Action completed");
            self.view.last_failure = None;

            if action == Action::Delete {
                self.terminate().await;
                return Flow::Stop;
            }
        } else {
            let output = invocation.text().trim().to_string();
            let error = CoreError::ActionFailure {
                entity: self.view.name.clone(),
                action,
                output: output.clone(),
                location: ErrorLocation::from(Location::caller()),
            };
            warn!(error = %error, "Action failed");

            self.view.last_failure = Some(format!("{action} failed: {output}"));
            self.ctx
                .sink
                .publish(PresentationUpdate::ActionFailed(FailureNotice {
                    id: self.view.id,
                    name: self.view.name.clone(),
                    action,
                    output,
                }));
        }

        // Only a parsed status promotes Initializing.
        self.view.phase = resume;
        self.observe().await;

        Flow::Continue
    }

    fn open_interactive(&self, action: Action) {
        match self
            .ctx
            .toolchain
            .interactive(self.view.kind, &self.view.name, action)
        {
            Some(command) => {
                if self.ctx.invoker.spawn_detached(&command) {
                    info!(command = %command, "Interactive session opened");
                }
            }
            None => warn!("Action not supported for this entity"),
        }
    }

    async fn terminate(&mut self) {
        self.view.phase = Phase::Terminated;
        self.view.pending = None;
        self.publish().await;

        if let Some(parent) = &self.parent {
            parent.detach(self.view.id).await;
        }

        self.ctx.sink.publish(PresentationUpdate::Removed {
            id: self.view.id,
            project: self.view.project.clone(),
        });
        info!("Controller terminated");
    }

    async fn publish(&self) {
        self.snapshot_tx.send_replace(self.view.clone());
        self.ctx
            .sink
            .publish(PresentationUpdate::Entity(self.view.clone()));

        if let Some(parent) = &self.parent {
            parent.child_changed(&self.view).await;
        }
    }
}
