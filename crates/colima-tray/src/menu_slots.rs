//! Show/hide for menu entries.
//!
//! The menu toolkit has no per-item visibility, so hidden entries are
//! removed from their parent and re-inserted at the position they would
//! occupy among the currently visible entries.

use crate::{AppError, AppResult};

use tray_icon::menu::{IsMenuItem, Menu, MenuItem, PredefinedMenuItem, Submenu};

/// Menu or submenu that owns a list of slots.
pub enum MenuParent {
    /// The tray's top-level menu.
    Root(Menu),
    /// A nested submenu.
    Sub(Submenu),
}

impl MenuParent {
    fn insert(&self, item: &dyn IsMenuItem, position: usize) -> AppResult<()> {
        match self {
            Self::Root(menu) => menu.insert(item, position),
            Self::Sub(submenu) => submenu.insert(item, position),
        }
        .map_err(|e| AppError::tray("Failed to insert menu item", e))
    }

    fn remove(&self, item: &dyn IsMenuItem) -> AppResult<()> {
        match self {
            Self::Root(menu) => menu.remove(item),
            Self::Sub(submenu) => submenu.remove(item),
        }
        .map_err(|e| AppError::tray("Failed to remove menu item", e))
    }
}

/// A single entry owned by [`MenuSlots`].
pub enum SlotItem {
    /// Clickable or disabled text item.
    Item(MenuItem),
    /// Nested submenu.
    Sub(Submenu),
    /// Separator line.
    Separator(PredefinedMenuItem),
}

impl SlotItem {
    fn as_menu_item(&self) -> &dyn IsMenuItem {
        match self {
            Self::Item(item) => item,
            Self::Sub(submenu) => submenu,
            Self::Separator(separator) => separator,
        }
    }
}

struct Slot {
    item: SlotItem,
    visible: bool,
}

/// Ordered entries of one menu with per-entry visibility.
pub struct MenuSlots {
    parent: MenuParent,
    slots: Vec<Slot>,
}

impl MenuSlots {
    /// Wrap an empty menu or submenu.
    pub fn new(parent: MenuParent) -> Self {
        Self {
            parent,
            slots: Vec::new(),
        }
    }

    /// Append an entry and return its slot index.
    pub fn push(&mut self, item: SlotItem, visible: bool) -> AppResult<usize> {
        if visible {
            let position = self.visible_before(self.slots.len());
            self.parent.insert(item.as_menu_item(), position)?;
        }
        self.slots.push(Slot { item, visible });
        Ok(self.slots.len() - 1)
    }

    /// Show or hide the entry at `index`. Unknown indices are ignored.
    pub fn set_visible(&mut self, index: usize, visible: bool) -> AppResult<()> {
        let position = self.visible_before(index);
        let Some(slot) = self.slots.get_mut(index) else {
            return Ok(());
        };
        if slot.visible == visible {
            return Ok(());
        }

        if visible {
            self.parent.insert(slot.item.as_menu_item(), position)?;
        } else {
            self.parent.remove(slot.item.as_menu_item())?;
        }
        slot.visible = visible;
        Ok(())
    }

    /// Detach the entry at `index` from the menu and forget it.
    pub fn remove(&mut self, index: usize) -> AppResult<()> {
        if index >= self.slots.len() {
            return Ok(());
        }
        let slot = self.slots.remove(index);
        if slot.visible {
            self.parent.remove(slot.item.as_menu_item())?;
        }
        Ok(())
    }

    /// Remove every entry.
    pub fn clear(&mut self) -> AppResult<()> {
        for slot in self.slots.drain(..) {
            if slot.visible {
                self.parent.remove(slot.item.as_menu_item())?;
            }
        }
        Ok(())
    }

    /// Number of entries, hidden ones included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn visible_before(&self, index: usize) -> usize {
        self.slots
            .iter()
            .take(index)
            .filter(|slot| slot.visible)
            .count()
    }
}
