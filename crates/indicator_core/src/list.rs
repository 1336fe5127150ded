//! Per-area registry of every icon that currently wants to be shown, ordered by priority.

use crate::{
    arena::{IconArena, IconHandle},
    icon::{Area, IconDescriptor},
};

/// Ordered collection of the icons that could be shown in one area.
///
/// Entries are kept in ascending priority order, entries of equal priority in insertion order.
/// In the notification area, the reserved "more notifications" icon is always kept at the head.
#[derive(Debug, Clone)]
pub struct Registry {
    area: Area,
    entries: Vec<IconHandle>,
}

impl Registry {
    pub fn new(area: Area) -> Self {
        Registry { area, entries: Vec::new() }
    }

    pub fn area(&self) -> Area {
        self.area
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: IconHandle) -> bool {
        self.entries.contains(&handle)
    }

    pub fn position(&self, handle: IconHandle) -> Option<usize> {
        self.entries.iter().position(|h| *h == handle)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = IconHandle> + '_ {
        self.entries.iter().copied()
    }

    /// Insert an icon, keeping the registry sorted.
    /// Returns false without changing anything if an icon with the same name is already registered.
    pub fn insert(&mut self, icons: &IconArena, handle: IconHandle) -> bool {
        let Some(icon) = icons.get(handle) else {
            log::warn!("Tried to insert {} into the {} registry, but it is not registered", handle, self.area);
            return false;
        };
        let duplicate = self.entries.iter().any(|h| icons.get(*h).map_or(false, |other| other.name == icon.name));
        if duplicate {
            log::debug!("Icon {} is already in the {} registry", icon.name, self.area);
            return false;
        }

        let index = if icon.is_reserved_head() {
            0
        } else {
            let head = self.reserved_head_len(icons);
            self.entries[head..]
                .iter()
                .position(|h| icons.get(*h).map_or(false, |other| other.priority > icon.priority))
                .map_or(self.entries.len(), |offset| head + offset)
        };
        self.entries.insert(index, handle);
        true
    }

    /// Remove an icon. Removing an icon that isn't in the registry does nothing.
    pub fn remove(&mut self, handle: IconHandle) -> bool {
        let len_before = self.entries.len();
        self.entries.retain(|h| *h != handle);
        self.entries.len() != len_before
    }

    /// Re-insert an icon after its priority changed.
    pub fn reorder(&mut self, icons: &IconArena, handle: IconHandle) {
        if self.remove(handle) {
            self.insert(icons, handle);
        } else {
            log::debug!("Not reordering {}, it is not in the {} registry", handle, self.area);
        }
    }

    /// The most important icon that wants to be shown but has no slot yet.
    pub fn find_show_candidate(&self, icons: &IconArena) -> Option<IconHandle> {
        self.entries.iter().copied().find(|h| icons.get(*h).map_or(false, |icon| icon.is_pending()))
    }

    /// The least important visible icon, which is the first to go when room must be made.
    ///
    /// With a `priority_floor`, only icons whose priority is at least that value are considered.
    /// Pinned icons are skipped unless `include_always_top` is set.
    pub fn find_evict_candidate(
        &self,
        icons: &IconArena,
        priority_floor: Option<i32>,
        include_always_top: bool,
    ) -> Option<IconHandle> {
        self.find_evict_candidate_by(icons, |icon| {
            priority_floor.map_or(true, |floor| icon.priority >= floor) && (include_always_top || !icon.always_top)
        })
    }

    /// The least important visible icon that `evictable` accepts.
    pub fn find_evict_candidate_by(
        &self,
        icons: &IconArena,
        evictable: impl Fn(&IconDescriptor) -> bool,
    ) -> Option<IconHandle> {
        self.entries.iter().rev().copied().find(|h| icons.get(*h).map_or(false, |icon| icon.is_visible() && evictable(icon)))
    }

    /// Number of icons in the registry that want to be shown, not counting `except`.
    pub fn wish_count(&self, icons: &IconArena, except: Option<IconHandle>) -> usize {
        self.entries
            .iter()
            .filter(|h| Some(**h) != except)
            .filter(|h| icons.get(**h).map_or(false, |icon| icon.wish_to_show))
            .count()
    }

    fn reserved_head_len(&self, icons: &IconArena) -> usize {
        match self.entries.first() {
            Some(first) if icons.get(*first).map_or(false, |icon| icon.is_reserved_head()) => 1,
            _ => 0,
        }
    }
}
