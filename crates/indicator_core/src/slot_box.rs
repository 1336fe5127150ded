//! Slot allocation: deciding which icons get one of the limited places in the strip.

use crate::{
    arena::IconHandle,
    capacity::{self, Occupancy},
    icon::Area,
    state::IndicatorState,
    toolkit::Toolkit,
};

/// Upper bound for the rounds the balancing pass spends on the areas sharing the strip.
const MAX_BALANCE_ROUNDS: usize = 8;

const SHARED_AREAS: [Area; 3] = [Area::System, Area::MiniControl, Area::Notification];
const SINGLE_SLOT_AREAS: [Area; 3] = [Area::ConnectionSystem, Area::Alarm, Area::MoreNotification];

/// Whether an icon can get a slot in its area, and what has to make room for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitDecision {
    Cannot,
    AdmitWithEvictSystem,
    AdmitWithEvictMiniControl,
    AdmitWithEvictNotification,
    /// The occupant of the fixed slot at the icon's priority is replaced.
    AdmitWithEvictFixed,
    /// One of the single slot areas is full, its occupant goes.
    AdmitWithEvictOther(Area),
    AdmitWithoutEvict,
}

impl AdmitDecision {
    fn evicting_in(area: Area) -> Self {
        match area {
            Area::System => AdmitDecision::AdmitWithEvictSystem,
            Area::MiniControl => AdmitDecision::AdmitWithEvictMiniControl,
            Area::Notification => AdmitDecision::AdmitWithEvictNotification,
            Area::Fixed => AdmitDecision::AdmitWithEvictFixed,
            other => AdmitDecision::AdmitWithEvictOther(other),
        }
    }

    /// The area an icon has to be evicted from, if any.
    pub fn evict_area(self) -> Option<Area> {
        match self {
            AdmitDecision::AdmitWithEvictSystem => Some(Area::System),
            AdmitDecision::AdmitWithEvictMiniControl => Some(Area::MiniControl),
            AdmitDecision::AdmitWithEvictNotification => Some(Area::Notification),
            AdmitDecision::AdmitWithEvictFixed => Some(Area::Fixed),
            AdmitDecision::AdmitWithEvictOther(area) => Some(area),
            AdmitDecision::Cannot | AdmitDecision::AdmitWithoutEvict => None,
        }
    }

    pub fn admits(self) -> bool {
        self != AdmitDecision::Cannot
    }
}

impl<T: Toolkit> IndicatorState<T> {
    pub fn occupancy(&self) -> Occupancy {
        Occupancy {
            system: self.views[Area::System].len(),
            minictrl: self.views[Area::MiniControl].len(),
            notification: self.views[Area::Notification].len(),
        }
    }

    /// The number of slots an area has right now, given what the other areas show.
    pub fn capacity(&self, area: Area) -> usize {
        capacity::capacity(area, self.occupancy())
    }

    pub fn find_show_candidate(&self, area: Area) -> Option<IconHandle> {
        self.registries[area].find_show_candidate(&self.icons)
    }

    pub fn find_evict_candidate(&self, area: Area, priority_floor: Option<i32>) -> Option<IconHandle> {
        self.registries[area].find_evict_candidate(&self.icons, priority_floor, false)
    }

    pub fn can_admit(&self, handle: IconHandle) -> AdmitDecision {
        let Some(icon) = self.icons.get(handle) else {
            log::warn!("Tried to check admission of {}, which is not registered", handle);
            return AdmitDecision::Cannot;
        };
        if icon.exist_in_view {
            return AdmitDecision::AdmitWithoutEvict;
        }

        match icon.area {
            Area::Fixed => {
                let occupant = self.fixed_occupant(icon.priority, Some(handle));
                match occupant.and_then(|h| self.icons.get(h)) {
                    None => AdmitDecision::AdmitWithoutEvict,
                    Some(occupant) if occupant.always_top => AdmitDecision::Cannot,
                    Some(_) => AdmitDecision::AdmitWithEvictFixed,
                }
            }
            Area::Notification => {
                let count = self.registries[Area::Notification].wish_count(&self.icons, Some(handle));
                if count > capacity::MAX_NOTI_ICONS {
                    AdmitDecision::AdmitWithEvictNotification
                } else {
                    AdmitDecision::AdmitWithoutEvict
                }
            }
            area => {
                let (mut higher, mut higher_top, mut same, mut same_top, mut lower) = (0, 0, 0, 0, 0);
                for other in self.views[area].iter().filter_map(|h| self.icons.get(*h)) {
                    match other.priority.cmp(&icon.priority) {
                        std::cmp::Ordering::Less => {
                            higher += 1;
                            if other.always_top {
                                higher_top += 1;
                            }
                        }
                        std::cmp::Ordering::Equal => {
                            same += 1;
                            if other.always_top {
                                same_top += 1;
                            }
                        }
                        std::cmp::Ordering::Greater => lower += 1,
                    }
                }
                let capacity = self.capacity(area);
                if higher + same + lower < capacity {
                    AdmitDecision::AdmitWithoutEvict
                } else if icon.always_top {
                    if same_top >= capacity || higher_top >= capacity {
                        AdmitDecision::Cannot
                    } else {
                        AdmitDecision::evicting_in(area)
                    }
                } else if higher >= capacity {
                    AdmitDecision::Cannot
                } else {
                    AdmitDecision::evicting_in(area)
                }
            }
        }
    }

    /// Give an icon a slot if [`Self::can_admit`] allows it, evicting whatever has to make room.
    /// Returns whether the icon got a slot.
    pub fn admit_and_evict(&mut self, handle: IconHandle) -> bool {
        let decision = self.can_admit(handle);
        let Some(icon) = self.icons.get(handle) else {
            return false;
        };
        if icon.exist_in_view {
            return true;
        }
        let (priority, always_top) = (icon.priority, icon.always_top);

        let victim = match decision {
            AdmitDecision::Cannot => {
                log::debug!("No slot for {} in the {} area", icon.name, icon.area);
                return false;
            }
            AdmitDecision::AdmitWithoutEvict => None,
            AdmitDecision::AdmitWithEvictFixed => self.fixed_occupant(priority, Some(handle)),
            _ => {
                let area = icon.area;
                let registry = &self.registries[area];
                let victim = if always_top {
                    // pinned icons only give way to pinned icons of equal or higher precedence
                    registry.find_evict_candidate_by(&self.icons, |other| !other.always_top || other.priority >= priority)
                } else if area == Area::Notification {
                    registry.find_evict_candidate(&self.icons, None, false)
                } else {
                    registry.find_evict_candidate(&self.icons, Some(priority), false)
                };
                let victim = victim.filter(|victim| *victim != handle);
                if victim.is_none() {
                    log::debug!("Nothing in the {} area can make room for {}", area, icon.name);
                    return false;
                }
                victim
            }
        };

        if let Some(victim) = victim {
            log::debug!("Evicting {} to make room for {}", self.icon_name(victim), self.icon_name(handle));
            self.remove_from_view(victim);
        }
        self.view_insert(handle);
        self.materialize(handle);
        true
    }

    /// Take an icon out of its view list and dispose of its on-screen object.
    pub fn remove_from_view(&mut self, handle: IconHandle) {
        let Some(icon) = self.icons.get_mut(handle) else {
            log::warn!("Tried to remove {} from view, but it is not registered", handle);
            return;
        };
        icon.exist_in_view = false;
        let area = icon.area;
        self.views[area].retain(|h| *h != handle);
        self.dispose(handle);
    }

    /// Bring the view lists up to date with what wants to be shown, then re-render every area.
    ///
    /// Calling this twice without a change in between leaves the same view lists and packs the
    /// same objects in the same order.
    pub fn update_display(&mut self) {
        self.balance();
        self.render();
    }

    fn balance(&mut self) {
        let mut converged = false;
        for _ in 0..MAX_BALANCE_ROUNDS {
            let mut changed = false;
            for area in SHARED_AREAS {
                changed |= self.balance_area(area);
            }
            if !changed {
                converged = true;
                break;
            }
        }
        if !converged {
            log::warn!("Slot allocation did not settle within {} rounds: {:?}", MAX_BALANCE_ROUNDS, self.occupancy());
        }
        self.balance_fixed();
        for area in SINGLE_SLOT_AREAS {
            self.balance_area(area);
        }
    }

    /// Evict what exceeds the capacity, admit pending icons while there is room,
    /// and swap pending icons with visible ones of lower precedence.
    fn balance_area(&mut self, area: Area) -> bool {
        let mut changed = false;

        while self.views[area].len() > self.capacity(area) {
            let registry = &self.registries[area];
            let victim = registry
                .find_evict_candidate(&self.icons, None, false)
                .or_else(|| registry.find_evict_candidate(&self.icons, None, true));
            let Some(victim) = victim else { break };
            self.remove_from_view(victim);
            changed = true;
        }

        while self.views[area].len() < self.capacity(area) {
            let Some(candidate) = self.registries[area].find_show_candidate(&self.icons) else { break };
            self.view_insert(candidate);
            changed = true;
        }

        while let Some(candidate) = self.registries[area].find_show_candidate(&self.icons) {
            let Some(icon) = self.icons.get(candidate) else { break };
            let floor = Some(icon.priority.saturating_add(1));
            let victim = self.registries[area].find_evict_candidate(&self.icons, floor, icon.always_top);
            let Some(victim) = victim else { break };
            self.remove_from_view(victim);
            self.view_insert(candidate);
            changed = true;
        }

        changed
    }

    fn balance_fixed(&mut self) {
        let pending: Vec<IconHandle> = self.registries[Area::Fixed]
            .iter()
            .filter(|h| self.icons.get(*h).map_or(false, |icon| icon.is_pending()))
            .collect();
        for handle in pending {
            let Some(priority) = self.icons.get(handle).map(|icon| icon.priority) else { continue };
            if self.fixed_occupant(priority, None).is_none() {
                self.view_insert(handle);
            }
        }
    }

    fn render(&mut self) {
        for area in Area::ALL {
            let container = self.containers[area];
            self.toolkit.unpack_all(container);
            let mut position = 0;
            for handle in self.views[area].clone() {
                if !self.materialize(handle) {
                    continue;
                }
                if let Some(object) = self.icons.get(handle).and_then(|icon| icon.object) {
                    self.toolkit.pack_into(container, object, position);
                    position += 1;
                }
            }
        }
    }

    fn fixed_occupant(&self, priority: i32, except: Option<IconHandle>) -> Option<IconHandle> {
        self.views[Area::Fixed]
            .iter()
            .copied()
            .filter(|h| Some(*h) != except)
            .find(|h| self.icons.get(*h).map_or(false, |icon| icon.priority == priority))
    }

    /// Put an icon into its area's view list, keeping the list in registry order.
    fn view_insert(&mut self, handle: IconHandle) {
        let Some(icon) = self.icons.get_mut(handle) else { return };
        icon.exist_in_view = true;
        let area = icon.area;
        let view = &mut self.views[area];
        if !view.contains(&handle) {
            view.push(handle);
        }
        let registry = &self.registries[area];
        view.sort_by_cached_key(|h| registry.position(*h).unwrap_or(usize::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        icon::{IconDescriptor, IconKind},
        toolkit::RecordingToolkit,
    };
    use pretty_assertions::assert_eq;

    fn state() -> IndicatorState<RecordingToolkit> {
        IndicatorState::new(RecordingToolkit::new())
    }

    fn add(state: &mut IndicatorState<RecordingToolkit>, name: &str, area: Area, priority: i32) -> IconHandle {
        state.register_icon(IconDescriptor::new(name, area, priority).with_image(format!("{}.png", name))).unwrap()
    }

    fn view_names(state: &IndicatorState<RecordingToolkit>, area: Area) -> Vec<String> {
        state.view(area).iter().map(|h| state.icon(*h).unwrap().name.to_string()).collect()
    }

    #[test]
    fn test_admit_into_empty_area() {
        let mut state = state();
        let wifi = add(&mut state, "wifi", Area::System, 2);
        assert_eq!(state.can_admit(wifi), AdmitDecision::AdmitWithoutEvict);
        assert!(state.icon_show(wifi));
        assert!(state.icon(wifi).unwrap().obj_exists());
    }

    #[test]
    fn test_lower_precedence_icon_cannot_push_out_full_area() {
        let mut state = state();
        for p in 0..5 {
            let h = add(&mut state, &format!("sys_{}", p), Area::System, p);
            state.icon_show(h);
        }
        let late = add(&mut state, "late", Area::System, 9);
        assert_eq!(state.can_admit(late), AdmitDecision::Cannot);
        assert!(!state.icon_show(late));
        assert_eq!(view_names(&state, Area::System), vec!["sys_0", "sys_1", "sys_2", "sys_3", "sys_4"]);
        assert!(state.icon(late).unwrap().wish_to_show());
    }

    #[test]
    fn test_cannot_when_higher_fill_capacity() {
        let mut state = state();
        for p in 0..5 {
            let h = add(&mut state, &format!("sys_{}", p), Area::System, p);
            state.icon_show(h);
        }
        let hidden = state.handle_by_name("sys_4").unwrap();
        state.icon_hide(hidden);
        let competitor = add(&mut state, "competitor", Area::System, 3);
        state.icon_show(competitor);
        // now sys_0..sys_3 and competitor are shown, all with precedence over priority 7
        let latecomer = add(&mut state, "latecomer", Area::System, 7);
        assert_eq!(state.can_admit(latecomer), AdmitDecision::Cannot);
    }

    #[test]
    fn test_pending_icon_takes_freed_slot() {
        let mut state = state();
        let handles: Vec<_> = (0..6).map(|p| add(&mut state, &format!("sys_{}", p), Area::System, p)).collect();
        for h in &handles {
            state.icon_show(*h);
        }
        assert!(!state.icon(handles[5]).unwrap().exist_in_view());
        state.icon_hide(handles[1]);
        assert!(state.icon(handles[5]).unwrap().exist_in_view());
        assert_eq!(view_names(&state, Area::System), vec!["sys_0", "sys_2", "sys_3", "sys_4", "sys_5"]);
    }

    #[test]
    fn test_single_slot_area_replacement() {
        let mut state = state();
        let alarm = add(&mut state, "alarm", Area::Alarm, 1);
        let timer = add(&mut state, "timer", Area::Alarm, 0);
        state.icon_show(alarm);
        assert_eq!(state.can_admit(timer), AdmitDecision::AdmitWithEvictOther(Area::Alarm));
        assert!(state.icon_show(timer));
        assert_eq!(view_names(&state, Area::Alarm), vec!["timer"]);
        state.icon_hide(timer);
        assert_eq!(view_names(&state, Area::Alarm), vec!["alarm"]);
    }

    #[test]
    fn test_fixed_slot_replacement_and_restore() {
        let mut state = state();
        let battery = add(&mut state, "battery", Area::Fixed, 4);
        let charging = add(&mut state, "charging", Area::Fixed, 4);
        state.icon_show(battery);
        assert_eq!(state.can_admit(charging), AdmitDecision::AdmitWithEvictFixed);
        assert!(state.icon_show(charging));
        assert_eq!(view_names(&state, Area::Fixed), vec!["charging"]);
        assert!(!state.icon(battery).unwrap().obj_exists());

        state.icon_hide(charging);
        assert_eq!(view_names(&state, Area::Fixed), vec!["battery"]);
    }

    #[test]
    fn test_fixed_slots_are_independent() {
        let mut state = state();
        let rssi = add(&mut state, "rssi", Area::Fixed, 1);
        let battery = add(&mut state, "battery", Area::Fixed, 4);
        state.icon_show(battery);
        state.icon_show(rssi);
        assert_eq!(view_names(&state, Area::Fixed), vec!["rssi", "battery"]);
    }

    #[test]
    fn test_shared_areas_stay_within_capacity() {
        let mut state = state();
        for p in 0..6 {
            let h = add(&mut state, &format!("sys_{}", p), Area::System, p);
            state.icon_show(h);
        }
        for p in 0..4 {
            let h = add(&mut state, &format!("mini_{}", p), Area::MiniControl, p);
            state.icon_show(h);
        }
        for p in 0..9 {
            let h = add(&mut state, &format!("noti_{}", p), Area::Notification, p);
            state.icon_show(h);
        }
        let occupancy = state.occupancy();
        assert!(occupancy.system <= capacity::enabled_system_count(occupancy));
        assert!(occupancy.minictrl <= capacity::enabled_minictrl_count(occupancy));
        assert!(occupancy.notification <= capacity::enabled_notification_count(occupancy));
        assert_eq!(occupancy, Occupancy { system: 3, minictrl: 1, notification: 3 });
    }

    #[test]
    fn test_materialization_failure_is_skipped() {
        let mut state = state();
        state.toolkit_mut().fail_materialization_of("broken.png");
        let broken = state.register_icon(IconDescriptor::new("broken", Area::System, 0).with_image("broken.png")).unwrap();
        let wifi = add(&mut state, "wifi", Area::System, 1);
        state.icon_show(broken);
        state.icon_show(wifi);

        let container = state.container(Area::System);
        let packed = state.toolkit().packed(container).to_vec();
        assert_eq!(packed, vec![state.icon(wifi).unwrap().object().unwrap()]);
        assert!(state.icon(broken).unwrap().exist_in_view());
        assert!(!state.icon(broken).unwrap().obj_exists());

        state.toolkit_mut().allow_materialization_of("broken.png");
        state.update_display();
        assert_eq!(state.toolkit().packed(container).len(), 2);
    }

    #[test]
    fn test_text_icon_without_text_is_not_materialized() {
        let mut state = state();
        let clock = state.register_icon(IconDescriptor::new("clock", Area::System, 0).with_kind(IconKind::Text)).unwrap();
        state.icon_show(clock);
        assert!(!state.icon(clock).unwrap().obj_exists());
    }
}
