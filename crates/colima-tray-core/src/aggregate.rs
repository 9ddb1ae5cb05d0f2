//! Per-project aggregate of member states and bulk-action fan-out.

use crate::{
    Action, CoreError, CoreResult, EntityHandle, EntityId, EntityView, MemberLayout,
    PresentationSink, PresentationUpdate, ProjectLayout, ProjectView, Status,
};

use std::{panic::Location, sync::Arc};

use error_location::ErrorLocation;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

struct Member {
    handle: EntityHandle,
    status: Status,
}

/// Tracks the members of one project and derives its bulk-action state.
///
/// Members report through [`AggregateController::child_changed`]; the view
/// is recomputed and republished synchronously on every report.
pub struct AggregateController {
    name: String,
    sink: Arc<dyn PresentationSink>,
    members: Mutex<Vec<Member>>,
}

impl AggregateController {
    /// Create an empty project.
    pub fn new(name: impl Into<String>, sink: Arc<dyn PresentationSink>) -> Self {
        Self {
            name: name.into(),
            sink,
            members: Mutex::new(Vec::new()),
        }
    }

    /// Project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a member in display order.
    pub async fn attach(&self, handle: EntityHandle) {
        let status = handle.snapshot().status;
        let mut members = self.members.lock().await;
        if members.iter().any(|m| m.handle.id() == handle.id()) {
            return;
        }
        debug!(project = %self.name, entity = %handle.name(), "Member attached");
        members.push(Member { handle, status });
    }

    /// Remove a member. Returns whether it was present.
    pub async fn detach(&self, id: EntityId) -> bool {
        let mut members = self.members.lock().await;
        let before = members.len();
        members.retain(|m| m.handle.id() != id);
        let removed = members.len() != before;

        if removed {
            debug!(project = %self.name, id = %id, "Member detached");
            self.publish(&members);
        }
        removed
    }

    /// Record a member's new snapshot and republish the project view.
    pub(crate) async fn child_changed(&self, view: &EntityView) {
        let mut members = self.members.lock().await;
        if let Some(member) = members.iter_mut().find(|m| m.handle.id() == view.id) {
            member.status = view.status.clone();
        }
        self.publish(&members);
    }

    /// Current aggregate view.
    pub async fn view(&self) -> ProjectView {
        let members = self.members.lock().await;
        self.derive(&members)
    }

    /// Current shape of the project for menu building.
    pub async fn layout(&self) -> ProjectLayout {
        let members = self.members.lock().await;
        ProjectLayout {
            name: self.name.clone(),
            members: members
                .iter()
                .map(|m| MemberLayout {
                    id: m.handle.id(),
                    name: m.handle.name().to_string(),
                })
                .collect(),
        }
    }

    /// Number of members.
    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    /// Whether the project has no members left.
    pub async fn is_empty(&self) -> bool {
        self.members.lock().await.is_empty()
    }

    /// Queue `action` on every member. Members run it concurrently on their
    /// own tasks; this returns as soon as the requests are queued.
    ///
    /// Returns the number of members that accepted the request.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ActionRejected`] for actions that cannot be
    /// applied to a whole project (delete, logs, exec).
    #[instrument(skip(self), fields(project = %self.name))]
    pub async fn dispatch_all(&self, action: Action) -> CoreResult<usize> {
        if !action.is_bulk() {
            return Err(CoreError::ActionRejected {
                entity: self.name.clone(),
                action,
                reason: "not available as a project action".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let handles: Vec<EntityHandle> = {
            let members = self.members.lock().await;
            members.iter().map(|m| m.handle.clone()).collect()
        };

        let mut accepted = 0;
        for handle in &handles {
            match handle.request(action) {
                Ok(_) => accepted += 1,
                Err(e) => warn!(error = %e, "Member rejected bulk action"),
            }
        }
        info!(accepted, total = handles.len(), "Bulk action dispatched");

        let members = self.members.lock().await;
        self.publish(&members);

        Ok(accepted)
    }

    fn derive(&self, members: &[Member]) -> ProjectView {
        let running = members.iter().filter(|m| m.status.is_running()).count();
        ProjectView {
            name: self.name.clone(),
            any_running: running > 0,
            any_stopped: members.iter().any(|m| m.status.is_stopped()),
            running,
            total: members.len(),
        }
    }

    // Called with the member lock held so views reach the sink in the order
    // they were computed.
    fn publish(&self, members: &[Member]) {
        self.sink
            .publish(PresentationUpdate::Project(self.derive(members)));
    }
}
