//! Container enumeration grouped by compose project.

use crate::{CoreError, CoreResult, ProcessInvoker, Toolchain};

use std::{collections::BTreeMap, panic::Location};

use error_location::ErrorLocation;
use tracing::{info, instrument};

/// Project assigned to containers without a compose project label.
pub const DEFAULT_PROJECT: &str = "default";

/// One container as reported by the list command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Container name.
    pub name: String,
    /// Project label, or [`DEFAULT_PROJECT`].
    pub project: String,
    /// Unparsed status text ("Up 2 minutes", "Exited (0) ...").
    pub status_text: String,
}

/// Containers grouped by project, projects ordered by name, members in
/// discovery order.
pub type Inventory = BTreeMap<String, Vec<ContainerRecord>>;

/// Group `name|project|status` records by project.
///
/// Blank lines and records without a name are skipped. The status field may
/// itself contain `|`; only the first two pipes split.
pub fn build_inventory(raw: &str) -> Inventory {
    let mut inventory = Inventory::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.splitn(3, '|');
        let name = match fields.next() {
            Some(name) if !name.is_empty() => name,
            _ => continue,
        };
        let project = match fields.next() {
            Some(project) if !project.is_empty() => project,
            _ => DEFAULT_PROJECT,
        };
        let status_text = fields.next().unwrap_or_default();

        inventory
            .entry(project.to_string())
            .or_default()
            .push(ContainerRecord {
                name: name.to_string(),
                project: project.to_string(),
                status_text: status_text.to_string(),
            });
    }

    inventory
}

/// Run the list command and group its output.
///
/// # Errors
///
/// Returns [`CoreError::EnumerationFailure`] if the list command fails.
#[instrument(skip(invoker, toolchain))]
pub async fn enumerate(
    invoker: &dyn ProcessInvoker,
    toolchain: &Toolchain,
) -> CoreResult<Inventory> {
    let invocation = invoker.run(&toolchain.list_containers()).await;
    if !invocation.ok {
        return Err(CoreError::EnumerationFailure {
            output: invocation.text().trim().to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let inventory = build_inventory(&invocation.text());
    info!(
        projects = inventory.len(),
        containers = inventory.values().map(Vec::len).sum::<usize>(),
        "Containers enumerated"
    );

    Ok(inventory)
}
