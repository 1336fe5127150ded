use indicator_core::{
    capacity, AdmitDecision, AnimationKind, Area, IconDescriptor, IconHandle, IndicatorState, RecordingToolkit, ToolkitCall,
};
use pretty_assertions::assert_eq;

type State = IndicatorState<RecordingToolkit>;

fn show(state: &mut State, descriptor: IconDescriptor) -> IconHandle {
    let handle = state.register_icon(descriptor).unwrap();
    state.icon_show(handle);
    handle
}

fn image_icon(name: &str, area: Area, priority: i32) -> IconDescriptor {
    IconDescriptor::new(name, area, priority).with_image(format!("{}.png", name))
}

fn view_names(state: &State, area: Area) -> Vec<String> {
    state.view(area).iter().map(|h| state.icon(*h).unwrap().name.to_string()).collect()
}

fn assert_within_capacity(state: &State) {
    for area in [Area::System, Area::MiniControl, Area::Notification] {
        assert!(
            state.view(area).len() <= state.capacity(area),
            "{} area over capacity:\n{}",
            area,
            state.describe()
        );
    }
}

#[test]
fn test_full_system_area_evicts_least_important() {
    let mut state = State::new(RecordingToolkit::new());
    for priority in 0..5 {
        show(&mut state, image_icon(&format!("sys_{}", priority), Area::System, priority));
    }
    state.update_display();
    assert_eq!(view_names(&state, Area::System), vec!["sys_0", "sys_1", "sys_2", "sys_3", "sys_4"]);

    let newcomer = state.register_icon(image_icon("newcomer", Area::System, 2)).unwrap();
    assert_eq!(state.can_admit(newcomer), AdmitDecision::AdmitWithEvictSystem);
    let victim = state.find_evict_candidate(Area::System, Some(2)).unwrap();
    assert_eq!(state.icon(victim).unwrap().name.as_str(), "sys_4");

    assert!(state.icon_show(newcomer));
    assert_eq!(view_names(&state, Area::System), vec!["sys_0", "sys_1", "sys_2", "newcomer", "sys_3"]);
    assert!(state.icon(victim).unwrap().wish_to_show());
    assert!(!state.icon(victim).unwrap().obj_exists());
}

#[test]
fn test_pinned_fixed_slot_is_not_replaced() {
    let mut state = State::new(RecordingToolkit::new());
    let occupant = show(&mut state, image_icon("battery", Area::Fixed, 3).pinned());
    let challenger = show(&mut state, image_icon("charger", Area::Fixed, 3));

    assert_eq!(state.can_admit(challenger), AdmitDecision::Cannot);
    assert!(state.icon(occupant).unwrap().exist_in_view());
    assert!(state.icon(occupant).unwrap().obj_exists());
    assert!(!state.icon(challenger).unwrap().exist_in_view());
    assert!(!state.icon(challenger).unwrap().obj_exists());
    assert_eq!(view_names(&state, Area::Fixed), vec!["battery"]);
}

#[test]
fn test_notification_overflow_evicts_from_the_back() {
    let mut state = State::new(RecordingToolkit::new());
    for priority in 1..=8 {
        show(&mut state, image_icon(&format!("noti_{}", priority), Area::Notification, priority));
    }
    assert_eq!(state.view(Area::Notification).len(), capacity::MAX_NOTI_ICONS);

    let urgent = state.register_icon(image_icon("urgent", Area::Notification, 0)).unwrap();
    assert_eq!(state.can_admit(urgent), AdmitDecision::AdmitWithEvictNotification);
    assert!(state.icon_show(urgent));
    assert_eq!(
        view_names(&state, Area::Notification),
        vec!["urgent", "noti_1", "noti_2", "noti_3", "noti_4", "noti_5", "noti_6"]
    );
}

#[test]
fn test_notification_overflow_with_least_important_newcomer() {
    let mut state = State::new(RecordingToolkit::new());
    for priority in 1..=8 {
        show(&mut state, image_icon(&format!("noti_{}", priority), Area::Notification, priority));
    }
    let back = state.find_evict_candidate(Area::Notification, None).unwrap();
    assert_eq!(state.icon(back).unwrap().name.as_str(), "noti_7");

    let newcomer = state.register_icon(image_icon("newcomer", Area::Notification, 9)).unwrap();
    assert_eq!(state.can_admit(newcomer), AdmitDecision::AdmitWithEvictNotification);
    assert!(state.admit_and_evict(newcomer));
    assert_eq!(
        view_names(&state, Area::Notification),
        vec!["noti_1", "noti_2", "noti_3", "noti_4", "noti_5", "noti_6", "newcomer"]
    );
    assert!(!state.icon(back).unwrap().exist_in_view());
    assert!(!state.icon(back).unwrap().obj_exists());
    assert!(state.icon(newcomer).unwrap().obj_exists());
}

#[test]
fn test_restarting_same_download_animation_keeps_timer() {
    let mut state = State::new(RecordingToolkit::new());
    let handle = show(&mut state, image_icon("wifi", Area::ConnectionSystem, 0));
    state.icon_set_animation(handle, AnimationKind::Downloading);
    let before = state.icon(handle).unwrap().animation().clone();

    state.icon_set_animation(handle, AnimationKind::Downloading);
    assert_eq!(state.icon(handle).unwrap().animation(), &before);
    assert_eq!(state.toolkit().active_timers(), vec![before.timer.unwrap()]);
}

#[test]
fn test_registry_scan_is_ordered_by_priority() {
    let mut state = State::new(RecordingToolkit::without_journal());
    let mut seed: u32 = 17;
    for i in 0..40 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let priority = (seed >> 16) as i32 % 10;
        show(&mut state, image_icon(&format!("icon_{}", i), Area::Notification, priority));
    }
    let priorities: Vec<i32> = state.registry(Area::Notification).iter().map(|h| state.icon(h).unwrap().priority).collect();
    assert_eq!(priorities.len(), 40);
    assert!(priorities.windows(2).all(|w| w[0] <= w[1]), "{:?}", priorities);
}

#[test]
fn test_rendering_twice_is_idempotent() {
    let mut state = State::new(RecordingToolkit::new());
    show(&mut state, image_icon("clock", Area::Fixed, 0));
    show(&mut state, image_icon("bt", Area::System, 1));
    show(&mut state, image_icon("gps", Area::System, 0));
    show(&mut state, image_icon("music", Area::MiniControl, 0));
    show(&mut state, image_icon("mail", Area::Notification, 2));
    show(&mut state, image_icon("alarm", Area::Alarm, 0));
    state.toolkit_mut().take_journal();

    state.update_display();
    let views_before: Vec<Vec<String>> = Area::ALL.iter().map(|a| view_names(&state, *a)).collect();
    let first = state.toolkit_mut().take_journal();
    state.update_display();
    let views_after: Vec<Vec<String>> = Area::ALL.iter().map(|a| view_names(&state, *a)).collect();
    let second = state.toolkit_mut().take_journal();

    assert_eq!(views_before, views_after);
    assert_eq!(first, second);
    assert!(!first.iter().any(|call| matches!(call, ToolkitCall::Destroy(_))));
    assert_eq!(first.iter().filter(|call| matches!(call, ToolkitCall::Pack { .. })).count(), 6);
}

#[test]
fn test_shared_areas_never_exceed_capacity() {
    let mut state = State::new(RecordingToolkit::without_journal());
    let mut handles = Vec::new();
    let areas = [Area::System, Area::MiniControl, Area::Notification];
    for i in 0..18 {
        let area = areas[i % 3];
        handles.push(show(&mut state, image_icon(&format!("icon_{}", i), area, (i % 5) as i32)));
        assert_within_capacity(&state);
    }
    for handle in handles.iter().step_by(2) {
        state.icon_hide(*handle);
        assert_within_capacity(&state);
    }
    for handle in handles.iter().step_by(3) {
        state.icon_set_priority(*handle, 4);
        assert_within_capacity(&state);
    }
    for handle in handles.iter().step_by(2) {
        state.icon_show(*handle);
        assert_within_capacity(&state);
    }
}

#[test]
fn test_pinned_icon_survives_equal_priority_challenger() {
    let mut state = State::new(RecordingToolkit::new());
    for i in 0..4 {
        show(&mut state, image_icon(&format!("plain_{}", i), Area::System, 2));
    }
    let pinned = show(&mut state, image_icon("pinned", Area::System, 2).pinned());
    assert!(state.icon(pinned).unwrap().exist_in_view());

    let challenger = show(&mut state, image_icon("challenger", Area::System, 2));
    assert!(state.icon(pinned).unwrap().exist_in_view());
    assert!(state.icon(challenger).unwrap().exist_in_view());
    assert_eq!(view_names(&state, Area::System), vec!["plain_0", "plain_1", "plain_2", "pinned", "challenger"]);
}

#[test]
fn test_less_important_pinned_icon_leaves_pinned_area_alone() {
    let mut state = State::new(RecordingToolkit::new());
    for priority in 0..5 {
        show(&mut state, image_icon(&format!("pinned_{}", priority), Area::System, priority).pinned());
    }
    state.toolkit_mut().take_journal();

    let late = state.register_icon(image_icon("late", Area::System, 9).pinned()).unwrap();
    assert_eq!(state.can_admit(late), AdmitDecision::Cannot);
    assert!(!state.icon_show(late));
    assert_eq!(view_names(&state, Area::System), vec!["pinned_0", "pinned_1", "pinned_2", "pinned_3", "pinned_4"]);
    assert!(!state.toolkit().journal().iter().any(|call| matches!(call, ToolkitCall::Destroy(_))));
}

#[test]
fn test_pinned_icon_pushes_out_unpinned_icon() {
    let mut state = State::new(RecordingToolkit::new());
    for priority in 0..4 {
        show(&mut state, image_icon(&format!("pinned_{}", priority), Area::System, priority).pinned());
    }
    show(&mut state, image_icon("plain", Area::System, 0));

    let late = show(&mut state, image_icon("late", Area::System, 9).pinned());
    assert!(state.icon(late).unwrap().exist_in_view());
    assert_eq!(view_names(&state, Area::System), vec!["pinned_0", "pinned_1", "pinned_2", "pinned_3", "late"]);
}

#[test]
fn test_all_pinned_area_rejects_challenger() {
    let mut state = State::new(RecordingToolkit::new());
    for i in 0..5 {
        show(&mut state, image_icon(&format!("pinned_{}", i), Area::System, 2).pinned());
    }
    let challenger = show(&mut state, image_icon("challenger", Area::System, 2));
    assert!(!state.icon(challenger).unwrap().exist_in_view());
    assert_eq!(state.view(Area::System).len(), 5);
}

#[test]
fn test_hiding_animated_icon_cancels_timer() {
    let mut state = State::new(RecordingToolkit::new());
    let handle = show(&mut state, image_icon("sync", Area::System, 0));
    state.icon_set_animation(handle, AnimationKind::Uploading);
    let timer = state.icon(handle).unwrap().animation().timer.unwrap();

    state.icon_hide(handle);
    assert!(!state.toolkit().is_timer_active(timer));
    assert_eq!(state.icon(handle).unwrap().animation().timer, None);
    // a tick that was already queued finds no owner
    assert!(!state.animation_tick(timer, std::time::Instant::now()));
}

#[test]
fn test_unregistering_animated_icon_cancels_timer() {
    let mut state = State::new(RecordingToolkit::new());
    let handle = show(&mut state, image_icon("sync", Area::System, 0));
    state.icon_set_animation(handle, AnimationKind::Downloading);
    let timer = state.icon(handle).unwrap().animation().timer.unwrap();

    assert!(state.unregister_icon(handle));
    assert!(state.toolkit().active_timers().is_empty());
    assert!(!state.toolkit().is_timer_active(timer));
    assert_eq!(state.toolkit().live_objects(), 0);
    assert!(state.icon(handle).is_none());
}

#[test]
fn test_describe_lists_pending_icons() {
    let mut state = State::new(RecordingToolkit::new());
    show(&mut state, image_icon("wifi", Area::ConnectionSystem, 0));
    show(&mut state, image_icon("ethernet", Area::ConnectionSystem, 1));
    let line = state.describe().lines().find(|l| l.starts_with("connection_system")).unwrap().to_string();
    assert_eq!(line, "connection_system [1/1]: wifi(0) (pending: ethernet(1))");
}
