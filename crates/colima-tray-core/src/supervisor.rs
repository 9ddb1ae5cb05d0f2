//! Owner of every entity controller task.

use crate::{
    Action, AggregateController, ControllerContext, CoreError, CoreResult, EntityController,
    EntityHandle, EntityId, EntityKind, EntityView, Inventory, Phase, PresentationSink,
    PresentationUpdate, ProcessInvoker, ProjectLayout, Toolchain, inventory,
    status::parse_entity_status,
};

use std::{
    collections::{BTreeMap, HashMap},
    panic::Location,
    sync::Arc,
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::{sync::watch, task::JoinSet};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Time granted to controllers to finish after shutdown is signalled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Tunables for spawned controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Time between status polls.
    pub poll_interval: Duration,
    /// Pending requests an entity accepts before rejecting more.
    pub queue_depth: usize,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            queue_depth: 16,
        }
    }
}

/// What a reconcile pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Controllers spawned for newly listed containers.
    pub added: usize,
    /// Controllers retired because their container disappeared or moved project.
    pub retired: usize,
}

/// Spawns, tracks, and shuts down one controller task per entity.
///
/// Entities live in an arena keyed by [`EntityId`]; containers are also
/// indexed by name so re-enumeration can match them up.
pub struct Supervisor {
    ctx: ControllerContext,
    shutdown_tx: watch::Sender<bool>,
    next_id: u64,
    vm_id: Option<EntityId>,
    entities: BTreeMap<EntityId, EntityHandle>,
    by_name: HashMap<String, EntityId>,
    projects: BTreeMap<String, Arc<AggregateController>>,
    tasks: JoinSet<EntityId>,
    layout_published: bool,
}

impl Supervisor {
    /// Create a supervisor with no entities.
    pub fn new(
        invoker: Arc<dyn ProcessInvoker>,
        toolchain: Arc<Toolchain>,
        sink: Arc<dyn PresentationSink>,
        settings: SupervisorSettings,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            ctx: ControllerContext {
                invoker,
                toolchain,
                sink,
                poll_interval: settings.poll_interval,
                queue_depth: settings.queue_depth,
            },
            shutdown_tx,
            next_id: 0,
            vm_id: None,
            entities: BTreeMap::new(),
            by_name: HashMap::new(),
            projects: BTreeMap::new(),
            tasks: JoinSet::new(),
            layout_published: false,
        }
    }

    /// Spawn the VM controller. Calling it again returns the existing id.
    pub fn spawn_vm(&mut self) -> EntityId {
        if let Some(id) = self.vm_id {
            return id;
        }

        let id = self.allocate_id();
        let name = self.ctx.toolchain.runtime.clone();
        let initial = EntityView::initial(id, EntityKind::Vm, &name, None);
        let (controller, handle) = EntityController::new(
            initial,
            self.ctx.clone(),
            None,
            self.shutdown_tx.subscribe(),
        );

        self.tasks.spawn(async move {
            controller.run().await;
            id
        });
        self.entities.insert(id, handle);
        self.vm_id = Some(id);

        info!(id = %id, vm = %name, "VM controller spawned");
        id
    }

    /// Enumerate containers and reconcile the controller set against them.
    ///
    /// On failure nothing changes; at startup that leaves the tree empty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EnumerationFailure`] if the list command fails.
    #[instrument(skip(self))]
    pub async fn enumerate(&mut self) -> CoreResult<ReconcileSummary> {
        let listed = inventory::enumerate(self.ctx.invoker.as_ref(), &self.ctx.toolchain).await?;
        Ok(self.reconcile(&listed).await)
    }

    /// Spawn controllers for new containers and retire vanished ones.
    ///
    /// A container listed under a different project than before is retired
    /// and re-created, so project membership never changes in place.
    pub async fn reconcile(&mut self, listed: &Inventory) -> ReconcileSummary {
        self.reap();

        let observed: HashMap<&str, &str> = listed
            .values()
            .flatten()
            .map(|record| (record.name.as_str(), record.project.as_str()))
            .collect();

        let mut summary = ReconcileSummary::default();

        let stale: Vec<(String, EntityId)> = self
            .by_name
            .iter()
            .filter(|(name, id)| {
                let current = self
                    .entities
                    .get(id)
                    .and_then(|handle| handle.snapshot().project);
                observed.get(name.as_str()).copied() != current.as_deref()
            })
            .map(|(name, id)| (name.clone(), *id))
            .collect();

        for (name, id) in stale {
            self.by_name.remove(&name);
            if let Some(handle) = self.entities.remove(&id) {
                let project = handle.snapshot().project;
                if let Some(aggregate) = project.and_then(|p| self.projects.get(&p)) {
                    aggregate.detach(id).await;
                }
                handle.retire();
                summary.retired += 1;
                debug!(entity = %name, id = %id, "Container retired");
            }
        }

        for (project, records) in listed {
            for record in records {
                if self.by_name.contains_key(&record.name) {
                    continue;
                }

                let aggregate = Arc::clone(
                    self.projects
                        .entry(project.clone())
                        .or_insert_with(|| {
                            Arc::new(AggregateController::new(
                                project.clone(),
                                Arc::clone(&self.ctx.sink),
                            ))
                        }),
                );

                let id = self.allocate_id();
                let mut initial = EntityView::initial(
                    id,
                    EntityKind::Container,
                    &record.name,
                    Some(project.as_str()),
                );
                initial.status = parse_entity_status(&record.status_text);
                initial.last_observed_raw = record.status_text.clone();
                initial.phase = Phase::Observing;

                let (controller, handle) = EntityController::new(
                    initial,
                    self.ctx.clone(),
                    Some(Arc::clone(&aggregate)),
                    self.shutdown_tx.subscribe(),
                );
                aggregate.attach(handle.clone()).await;

                self.tasks.spawn(async move {
                    controller.run().await;
                    id
                });
                self.entities.insert(id, handle);
                self.by_name.insert(record.name.clone(), id);
                summary.added += 1;
                debug!(
                    entity = %record.name,
                    project = %project,
                    id = %id,
                    "Container controller spawned"
                );
            }
        }

        let mut empty = Vec::new();
        for (name, aggregate) in &self.projects {
            if aggregate.is_empty().await {
                empty.push(name.clone());
            }
        }
        for name in empty {
            self.projects.remove(&name);
        }

        if summary != ReconcileSummary::default() || !self.layout_published {
            let layout = self.layout().await;
            self.ctx.sink.publish(PresentationUpdate::Layout(layout));
            self.layout_published = true;
            info!(
                added = summary.added,
                retired = summary.retired,
                projects = self.projects.len(),
                "Project tree reconciled"
            );
        }

        summary
    }

    /// Queue `action` on the entity with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownEntity`] if no live controller has that
    /// id, or [`CoreError::ActionRejected`] if its queue refuses the request.
    #[track_caller]
    pub fn dispatch(&self, id: EntityId, action: Action) -> CoreResult<Uuid> {
        let handle = self.entities.get(&id).ok_or_else(|| CoreError::UnknownEntity {
            id: id.0,
            location: ErrorLocation::from(Location::caller()),
        })?;
        handle.request(action)
    }

    /// Queue `action` on the VM.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownEntity`] before [`Supervisor::spawn_vm`],
    /// or [`CoreError::ActionRejected`] if the VM queue refuses the request.
    #[track_caller]
    pub fn dispatch_vm(&self, action: Action) -> CoreResult<Uuid> {
        let id = self.vm_id.ok_or_else(|| CoreError::UnknownEntity {
            id: u64::MAX,
            location: ErrorLocation::from(Location::caller()),
        })?;
        self.dispatch(id, action)
    }

    /// Fan `action` out to every member of `project`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownProject`] for an unknown name, or
    /// [`CoreError::ActionRejected`] for non-bulk actions.
    pub async fn dispatch_project(&self, project: &str, action: Action) -> CoreResult<usize> {
        let aggregate = self
            .projects
            .get(project)
            .ok_or_else(|| CoreError::UnknownProject {
                name: project.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;
        aggregate.dispatch_all(action).await
    }

    /// Handle of a live entity.
    pub fn handle(&self, id: EntityId) -> Option<&EntityHandle> {
        self.entities.get(&id)
    }

    /// Handle of the VM, once spawned.
    pub fn vm(&self) -> Option<&EntityHandle> {
        self.vm_id.and_then(|id| self.entities.get(&id))
    }

    /// Handle of a container by name.
    pub fn container(&self, name: &str) -> Option<&EntityHandle> {
        self.by_name.get(name).and_then(|id| self.entities.get(id))
    }

    /// Aggregate for a project.
    pub fn project(&self, name: &str) -> Option<&Arc<AggregateController>> {
        self.projects.get(name)
    }

    /// Project names in display order.
    pub fn project_names(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    /// Current project tree in display order.
    pub async fn layout(&self) -> Vec<ProjectLayout> {
        let mut layout = Vec::with_capacity(self.projects.len());
        for aggregate in self.projects.values() {
            layout.push(aggregate.layout().await);
        }
        layout
    }

    /// Signal every controller to stop and wait briefly for them.
    ///
    /// Controllers blocked on an external command are abandoned after the
    /// grace period; their child processes are left to finish on their own.
    #[instrument(skip(self))]
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);

        let tasks = &mut self.tasks;
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    warn!(error = ?e, "Controller task panicked");
                }
            }
        })
        .await;

        match drained {
            Ok(()) => info!("All controllers stopped"),
            Err(_) => {
                info!(
                    remaining = self.tasks.len(),
                    "Controllers still busy after grace period, abandoning"
                );
                self.tasks.abort_all();
            }
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    // Forget controllers that terminated on their own (deleted containers).
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            match joined {
                Ok(id) => debug!(id = %id, "Controller task finished"),
                Err(e) => warn!(error = ?e, "Controller task panicked"),
            }
        }

        let terminated: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, handle)| handle.is_terminated())
            .map(|(id, _)| *id)
            .collect();

        for id in terminated {
            if let Some(handle) = self.entities.remove(&id) {
                self.by_name.remove(handle.name());
            }
            if self.vm_id == Some(id) {
                self.vm_id = None;
            }
        }
    }
}
