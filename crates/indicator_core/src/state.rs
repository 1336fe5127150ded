use std::fmt::Write;

use itertools::Itertools;

use crate::{
    arena::{IconArena, IconHandle},
    error::{Error, Result},
    icon::{AnimationKind, Area, IconDescriptor, IconPayload, PerArea},
    list::Registry,
    toolkit::{ContainerHandle, Toolkit},
};

/// Everything the indicator knows about its icons.
///
/// Owns the icon descriptors, one registry and one view list per area, the containers the view
/// lists are rendered into, and the toolkit doing the rendering. Feature modules address icons
/// through [`IconHandle`]s only.
///
/// Invariants:
/// - an icon with `exist_in_view` set is a member of exactly one view list, the one of its area.
/// - every view list entry is also in the registry of the same area.
/// - an icon with an on-screen object owns that object exclusively.
#[derive(Debug)]
pub struct IndicatorState<T: Toolkit> {
    pub(crate) icons: IconArena,
    pub(crate) registries: PerArea<Registry>,
    pub(crate) views: PerArea<Vec<IconHandle>>,
    pub(crate) containers: PerArea<ContainerHandle>,
    pub(crate) toolkit: T,
}

impl<T: Toolkit> IndicatorState<T> {
    pub fn new(mut toolkit: T) -> Self {
        let root = toolkit.create_container(None, "indicator");
        let containers = PerArea::from_fn(|area| toolkit.create_container(Some(root), &area.to_string()));
        IndicatorState {
            icons: IconArena::new(),
            registries: PerArea::from_fn(Registry::new),
            views: PerArea::default(),
            containers,
            toolkit,
        }
    }

    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    pub fn toolkit_mut(&mut self) -> &mut T {
        &mut self.toolkit
    }

    /// Add an icon to the state. The icon starts out hidden.
    pub fn register_icon(&mut self, mut descriptor: IconDescriptor) -> Result<IconHandle> {
        if self.icons.find_by_name(descriptor.name.as_str()).is_some() {
            return Err(Error::DuplicateIcon(descriptor.name));
        }
        if !descriptor.area.accepts_priority(descriptor.priority) {
            return Err(Error::InvalidPriority { area: descriptor.area, priority: descriptor.priority });
        }
        descriptor.wish_to_show = false;
        descriptor.exist_in_view = false;
        descriptor.object = None;
        descriptor.animation = Default::default();
        let name = descriptor.name.clone();
        let handle = self.icons.insert(descriptor);
        log::debug!("Registered icon {} as {:?}", name, handle);
        Ok(handle)
    }

    /// Hide an icon and free it. The handle is stale afterwards.
    pub fn unregister_icon(&mut self, handle: IconHandle) -> bool {
        let Some(icon) = self.icons.get(handle) else {
            log::warn!("Tried to unregister {}, which is not registered", handle);
            return false;
        };
        if icon.wish_to_show || icon.exist_in_view || icon.animation.is_active() {
            self.icon_hide(handle);
        }
        self.dispose(handle);
        self.icons.remove(handle).is_some()
    }

    pub fn handle_by_name(&self, name: &str) -> Option<IconHandle> {
        self.icons.find_by_name(name)
    }

    pub fn icon(&self, handle: IconHandle) -> Option<&IconDescriptor> {
        self.icons.get(handle)
    }

    /// Like [`Self::icon`], for call sites that treat a stale handle as an error.
    pub fn try_icon(&self, handle: IconHandle) -> Result<&IconDescriptor> {
        self.icons.get(handle).ok_or(Error::InvalidHandle(handle))
    }

    pub fn icons(&self) -> impl Iterator<Item = (IconHandle, &IconDescriptor)> {
        self.icons.iter()
    }

    pub fn icon_arena(&self) -> &IconArena {
        &self.icons
    }

    pub fn registry(&self, area: Area) -> &Registry {
        &self.registries[area]
    }

    /// The icons currently holding a slot in an area, in display order.
    pub fn view(&self, area: Area) -> &[IconHandle] {
        &self.views[area]
    }

    pub fn container(&self, area: Area) -> ContainerHandle {
        self.containers[area]
    }

    /// Ask for an icon to be shown. Returns whether the icon holds a slot afterwards;
    /// an icon that didn't get one stays pending and is shown once room frees up.
    pub fn icon_show(&mut self, handle: IconHandle) -> bool {
        let Some(icon) = self.icons.get_mut(handle) else {
            log::warn!("Tried to show {}, which is not registered", handle);
            return false;
        };
        icon.wish_to_show = true;
        let (area, in_view) = (icon.area, icon.exist_in_view);
        self.registries[area].insert(&self.icons, handle);
        if !in_view && !self.admit_and_evict(handle) {
            log::debug!("{} is waiting for a free slot in the {} area", self.icon_name(handle), area);
        }
        self.update_display();
        self.icons.get(handle).map_or(false, |icon| icon.exist_in_view)
    }

    /// Hide an icon, stopping its animation and giving up its slot.
    pub fn icon_hide(&mut self, handle: IconHandle) {
        let Some(icon) = self.icons.get_mut(handle) else {
            log::warn!("Tried to hide {}, which is not registered", handle);
            return;
        };
        icon.wish_to_show = false;
        let area = icon.area;
        self.stop_animation(handle);
        self.remove_from_view(handle);
        self.registries[area].remove(handle);
        self.update_display();
    }

    pub fn icon_set_animation(&mut self, handle: IconHandle, kind: AnimationKind) {
        self.set_animation(handle, kind);
    }

    /// Replace the image and text of an icon, updating its on-screen object in place.
    pub fn icon_update(&mut self, handle: IconHandle, payload: IconPayload) {
        let Some(icon) = self.icons.get_mut(handle) else {
            log::warn!("Tried to update {}, which is not registered", handle);
            return;
        };
        icon.payload = payload;
        if let Some(object) = icon.object {
            if let Some(image) = &icon.payload.image {
                self.toolkit.set_image(object, image);
            }
            if let Some(text) = &icon.payload.text {
                self.toolkit.set_text(object, text);
            }
        }
    }

    /// Change the priority of an icon and re-run slot allocation for it.
    pub fn icon_set_priority(&mut self, handle: IconHandle, priority: i32) -> bool {
        let Some(icon) = self.icons.get_mut(handle) else {
            log::warn!("Tried to change the priority of {}, which is not registered", handle);
            return false;
        };
        if !icon.area.accepts_priority(priority) {
            log::warn!("Priority {} is out of range for the {} area, ignoring it for {}", priority, icon.area, icon.name);
            return false;
        }
        if icon.priority == priority {
            return true;
        }
        icon.priority = priority;
        let (area, wish_to_show) = (icon.area, icon.wish_to_show);
        self.registries[area].reorder(&self.icons, handle);
        self.remove_from_view(handle);
        if wish_to_show {
            self.admit_and_evict(handle);
        }
        self.update_display();
        true
    }

    /// Human readable dump of every area: capacity, visible icons and pending icons.
    pub fn describe(&self) -> String {
        let mut output = String::new();
        for area in Area::ALL {
            let visible = self.views[area].iter().map(|h| self.describe_icon(*h)).join(" ");
            let pending = self.registries[area]
                .iter()
                .filter(|h| self.icons.get(*h).map_or(false, |icon| icon.is_pending()))
                .map(|h| self.describe_icon(h))
                .join(" ");
            let _ = write!(output, "{} [{}/{}]: {}", area, self.views[area].len(), self.capacity(area), visible);
            if !pending.is_empty() {
                let _ = write!(output, " (pending: {})", pending);
            }
            output.push('\n');
        }
        output.pop();
        output
    }

    fn describe_icon(&self, handle: IconHandle) -> String {
        match self.icons.get(handle) {
            Some(icon) if icon.always_top => format!("{}({}, pinned)", icon.name, icon.priority),
            Some(icon) => format!("{}({})", icon.name, icon.priority),
            None => format!("{:?}", handle),
        }
    }

    pub(crate) fn icon_name(&self, handle: IconHandle) -> String {
        self.icons.get(handle).map_or_else(|| handle.to_string(), |icon| icon.name.to_string())
    }
}
