//! System tray icon and the menu tree mirroring the VM and its containers.
//!
//! Lives on the main thread only. Controller output arrives as
//! [`PresentationUpdate`]s and is applied here; clicks are resolved to
//! [`MenuAction`]s through the id table kept alongside the menu.

use crate::{
    AppError, AppResult, MenuAction, TrayIconState,
    menu_slots::{MenuParent, MenuSlots, SlotItem},
};

use colima_tray_core::{
    Action, EntityId, EntityKind, EntityView, ProjectLayout, ProjectView, PresentationUpdate,
};

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, instrument};
use tray_icon::{
    Icon, TrayIcon, TrayIconBuilder,
    menu::{Menu, MenuId, MenuItem, PredefinedMenuItem, Submenu},
};

type ActionTable = HashMap<MenuId, MenuAction>;

fn action_item(actions: &mut ActionTable, label: &str, action: MenuAction) -> MenuItem {
    let item = MenuItem::new(label, true, None);
    actions.insert(item.id().clone(), action);
    item
}

fn status_label(text: &str) -> String {
    format!("Status: {text}")
}

/// Top-level VM entries.
struct VmMenu {
    status: MenuItem,
    start: (usize, MenuItem),
    stop: (usize, MenuItem),
    restart: MenuItem,
    shell: MenuItem,
}

/// Submenu for one container.
struct ContainerMenu {
    project: String,
    submenu: Submenu,
    slots: MenuSlots,
    status: MenuItem,
    start: usize,
    stop: usize,
    controls: Vec<MenuItem>,
    ids: Vec<MenuId>,
}

impl ContainerMenu {
    fn build(
        actions: &mut ActionTable,
        project: &str,
        id: EntityId,
        name: &str,
    ) -> AppResult<Self> {
        let submenu = Submenu::new(name, true);
        let mut slots = MenuSlots::new(MenuParent::Sub(submenu.clone()));

        let status = MenuItem::new(status_label("Unknown"), false, None);
        slots.push(SlotItem::Item(status.clone()), true)?;
        slots.push(SlotItem::Separator(PredefinedMenuItem::separator()), true)?;

        let mut controls = Vec::new();
        let mut start = 0;
        let mut stop = 0;
        for (label, action) in [
            ("Start", Action::Start),
            ("Stop", Action::Stop),
            ("Restart", Action::Restart),
            ("Logs", Action::Logs),
            ("Shell", Action::Exec),
        ] {
            let item = action_item(actions, label, MenuAction::Entity { id, action });
            let index = slots.push(SlotItem::Item(item.clone()), true)?;
            match action {
                Action::Start => start = index,
                Action::Stop => stop = index,
                _ => {}
            }
            controls.push(item);
        }

        slots.push(SlotItem::Separator(PredefinedMenuItem::separator()), true)?;
        let delete = action_item(
            actions,
            "Delete",
            MenuAction::Entity {
                id,
                action: Action::Delete,
            },
        );
        slots.push(SlotItem::Item(delete.clone()), true)?;
        controls.push(delete);

        let ids = controls.iter().map(|item| item.id().clone()).collect();

        Ok(Self {
            project: project.to_string(),
            submenu,
            slots,
            status,
            start,
            stop,
            controls,
            ids,
        })
    }

    fn apply(&mut self, view: &EntityView) -> AppResult<()> {
        let controls = view.controls();

        let mut status = status_label(&controls.status_text);
        if view.last_failure.is_some() {
            status.push_str(" (last action failed)");
        }
        self.status.set_text(status);
        self.submenu
            .set_text(format!("{} ({})", view.name, controls.status_text));

        self.slots.set_visible(self.start, controls.start_visible)?;
        self.slots.set_visible(self.stop, controls.stop_visible)?;
        for item in &self.controls {
            item.set_enabled(controls.enabled);
        }
        Ok(())
    }
}

/// Submenu for one project: bulk actions followed by its containers.
struct ProjectMenu {
    submenu: Submenu,
    slots: MenuSlots,
    start_all: usize,
    stop_all: usize,
    first_member: usize,
    members: Vec<EntityId>,
    ids: Vec<MenuId>,
}

impl ProjectMenu {
    fn build(actions: &mut ActionTable, name: &str) -> AppResult<Self> {
        let submenu = Submenu::new(name, true);
        let mut slots = MenuSlots::new(MenuParent::Sub(submenu.clone()));
        let mut ids = Vec::new();

        let mut bulk = |label: &str, action: Action| {
            let item = action_item(
                actions,
                label,
                MenuAction::Project {
                    name: name.to_string(),
                    action,
                },
            );
            ids.push(item.id().clone());
            item
        };
        let start_all = bulk("Start All", Action::Start);
        let stop_all = bulk("Stop All", Action::Stop);
        let restart_all = bulk("Restart All", Action::Restart);

        let start_all = slots.push(SlotItem::Item(start_all), true)?;
        let stop_all = slots.push(SlotItem::Item(stop_all), true)?;
        slots.push(SlotItem::Item(restart_all), true)?;
        slots.push(SlotItem::Separator(PredefinedMenuItem::separator()), true)?;

        Ok(Self {
            submenu,
            first_member: slots.slot_count(),
            slots,
            start_all,
            stop_all,
            members: Vec::new(),
            ids,
        })
    }

    fn add_member(&mut self, id: EntityId, container: &ContainerMenu) -> AppResult<()> {
        self.slots
            .push(SlotItem::Sub(container.submenu.clone()), true)?;
        self.members.push(id);
        Ok(())
    }

    fn remove_member(&mut self, id: EntityId) -> AppResult<()> {
        if let Some(position) = self.members.iter().position(|member| *member == id) {
            self.slots.remove(self.first_member + position)?;
            self.members.remove(position);
        }
        Ok(())
    }

    fn apply(&mut self, view: &ProjectView) -> AppResult<()> {
        self.submenu
            .set_text(format!("{} ({}/{})", view.name, view.running, view.total));
        self.slots
            .set_visible(self.start_all, view.start_all_visible())?;
        self.slots
            .set_visible(self.stop_all, view.stop_all_visible())?;
        Ok(())
    }
}

/// System tray icon manager.
pub struct TrayManager {
    tray_icon: TrayIcon,
    root: MenuSlots,
    vm: VmMenu,
    projects_menu: MenuSlots,
    projects: BTreeMap<String, ProjectMenu>,
    containers: HashMap<EntityId, ContainerMenu>,
    actions: ActionTable,
    views: HashMap<EntityId, EntityView>,
    project_views: HashMap<String, ProjectView>,
    icon_state: TrayIconState,
}

impl TrayManager {
    /// Create the tray icon with the static part of the menu.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let menu = Menu::new();
        let mut root = MenuSlots::new(MenuParent::Root(menu.clone()));
        let mut actions = ActionTable::new();

        let status = MenuItem::new(status_label("Unknown"), false, None);
        root.push(SlotItem::Item(status.clone()), true)?;
        root.push(SlotItem::Separator(PredefinedMenuItem::separator()), true)?;

        let start = action_item(&mut actions, "Start Colima", MenuAction::Vm(Action::Start));
        let stop = action_item(&mut actions, "Stop Colima", MenuAction::Vm(Action::Stop));
        let restart = action_item(&mut actions, "Restart Colima", MenuAction::Vm(Action::Restart));
        let shell = action_item(&mut actions, "Open Shell", MenuAction::Vm(Action::Exec));
        let start_index = root.push(SlotItem::Item(start.clone()), true)?;
        let stop_index = root.push(SlotItem::Item(stop.clone()), true)?;
        root.push(SlotItem::Item(restart.clone()), true)?;
        root.push(SlotItem::Item(shell.clone()), true)?;
        root.push(SlotItem::Separator(PredefinedMenuItem::separator()), true)?;

        let projects_submenu = Submenu::new("Projects", true);
        let mut projects_menu = MenuSlots::new(MenuParent::Sub(projects_submenu.clone()));
        projects_menu.push(SlotItem::Item(MenuItem::new("No containers", false, None)), true)?;
        root.push(SlotItem::Sub(projects_submenu), true)?;

        let refresh = action_item(&mut actions, "Refresh Containers", MenuAction::Refresh);
        root.push(SlotItem::Item(refresh), true)?;
        root.push(SlotItem::Separator(PredefinedMenuItem::separator()), true)?;
        let settings = action_item(&mut actions, "Settings", MenuAction::Settings);
        root.push(SlotItem::Item(settings), true)?;
        let quit = action_item(&mut actions, "Quit", MenuAction::Quit);
        root.push(SlotItem::Item(quit), true)?;

        let icon_state = TrayIconState::Unknown;
        let tray_icon = TrayIconBuilder::new()
            .with_tooltip(icon_state.tooltip("Unknown"))
            .with_menu(Box::new(menu))
            .with_icon(Self::render_icon(icon_state)?)
            .build()
            .map_err(|e| AppError::tray("Failed to create tray icon", e))?;

        info!("System tray icon initialized");

        Ok(Self {
            tray_icon,
            root,
            vm: VmMenu {
                status,
                start: (start_index, start),
                stop: (stop_index, stop),
                restart,
                shell,
            },
            projects_menu,
            projects: BTreeMap::new(),
            containers: HashMap::new(),
            actions,
            views: HashMap::new(),
            project_views: HashMap::new(),
            icon_state,
        })
    }

    /// What the clicked item with `id` does, if it is one of ours.
    pub fn action_for(&self, id: &MenuId) -> Option<&MenuAction> {
        self.actions.get(id)
    }

    /// Apply one controller update.
    ///
    /// `ActionFailed` is left to the caller, which decides on notifications.
    pub fn apply(&mut self, update: PresentationUpdate) -> AppResult<()> {
        match update {
            PresentationUpdate::Entity(view) => {
                match view.kind {
                    EntityKind::Vm => self.apply_vm(&view)?,
                    EntityKind::Container => {
                        if let Some(menu) = self.containers.get_mut(&view.id) {
                            menu.apply(&view)?;
                        }
                    }
                }
                self.views.insert(view.id, view);
            }
            PresentationUpdate::Project(view) => {
                if let Some(menu) = self.projects.get_mut(&view.name) {
                    menu.apply(&view)?;
                }
                self.project_views.insert(view.name.clone(), view);
            }
            PresentationUpdate::Layout(layout) => self.rebuild(&layout)?,
            PresentationUpdate::Removed { id, .. } => self.remove_container(id)?,
            PresentationUpdate::ActionFailed(_) => {}
        }
        Ok(())
    }

    fn apply_vm(&mut self, view: &EntityView) -> AppResult<()> {
        let controls = view.controls();

        self.vm.status.set_text(status_label(&controls.status_text));
        self.vm.start.1.set_enabled(controls.enabled);
        self.vm.stop.1.set_enabled(controls.enabled);
        self.vm.restart.set_enabled(controls.enabled);
        self.vm.shell.set_enabled(controls.shell_enabled);

        let state = TrayIconState::from_view(view);
        if state != self.icon_state {
            self.tray_icon
                .set_icon(Some(Self::render_icon(state)?))
                .map_err(|e| AppError::tray("Failed to update icon", e))?;
            self.icon_state = state;
        }
        self.tray_icon
            .set_tooltip(Some(state.tooltip(&controls.status_text)))
            .map_err(|e| AppError::tray("Failed to update tooltip", e))?;

        self.root.set_visible(self.vm.start.0, controls.start_visible)?;
        self.root.set_visible(self.vm.stop.0, controls.stop_visible)
    }

    #[instrument(skip_all, fields(projects = layout.len()))]
    fn rebuild(&mut self, layout: &[ProjectLayout]) -> AppResult<()> {
        self.projects_menu.clear()?;
        self.projects.clear();
        self.containers.clear();
        self.actions.retain(|_, action| {
            !matches!(action, MenuAction::Entity { .. } | MenuAction::Project { .. })
        });

        let live: HashSet<EntityId> = layout
            .iter()
            .flat_map(|project| project.members.iter().map(|member| member.id))
            .collect();
        self.views
            .retain(|id, view| view.kind == EntityKind::Vm || live.contains(id));
        self.project_views
            .retain(|name, _| layout.iter().any(|project| &project.name == name));

        if layout.is_empty() {
            self.projects_menu
                .push(SlotItem::Item(MenuItem::new("No containers", false, None)), true)?;
        }

        for project in layout {
            let mut project_menu = ProjectMenu::build(&mut self.actions, &project.name)?;

            for member in &project.members {
                let mut container = ContainerMenu::build(
                    &mut self.actions,
                    &project.name,
                    member.id,
                    &member.name,
                )?;
                if let Some(view) = self.views.get(&member.id) {
                    container.apply(view)?;
                }
                project_menu.add_member(member.id, &container)?;
                self.containers.insert(member.id, container);
            }

            if let Some(view) = self.project_views.get(&project.name) {
                project_menu.apply(view)?;
            }
            self.projects_menu
                .push(SlotItem::Sub(project_menu.submenu.clone()), true)?;
            self.projects.insert(project.name.clone(), project_menu);
        }

        debug!(containers = self.containers.len(), "Project menu rebuilt");
        Ok(())
    }

    fn remove_container(&mut self, id: EntityId) -> AppResult<()> {
        self.views.remove(&id);
        let Some(container) = self.containers.remove(&id) else {
            return Ok(());
        };
        for menu_id in &container.ids {
            self.actions.remove(menu_id);
        }

        let emptied = match self.projects.get_mut(&container.project) {
            Some(project) => {
                project.remove_member(id)?;
                project.members.is_empty()
            }
            None => false,
        };

        if emptied {
            if let Some(index) = self.projects.keys().position(|name| *name == container.project) {
                self.projects_menu.remove(index)?;
            }
            if let Some(project) = self.projects.remove(&container.project) {
                for menu_id in &project.ids {
                    self.actions.remove(menu_id);
                }
            }
            self.project_views.remove(&container.project);
            if self.projects.is_empty() {
                self.projects_menu
                    .push(SlotItem::Item(MenuItem::new("No containers", false, None)), true)?;
            }
        }

        debug!(id = %id, "Container removed from menu");
        Ok(())
    }

    #[track_caller]
    fn render_icon(state: TrayIconState) -> AppResult<Icon> {
        let rgba = state.render();
        let (width, height) = (rgba.width(), rgba.height());

        Icon::from_rgba(rgba.into_raw(), width, height)
            .map_err(|e| AppError::tray("Failed to create icon from RGBA", e))
    }
}
