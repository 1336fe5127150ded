//! On-screen objects of icons, and their animations.

use std::time::Instant;

use crate::{
    arena::IconHandle,
    error::{Error, Result},
    icon::{AnimationKind, IconDescriptor, IconKind, LifecycleState, ANIMATION_FRAME_COUNT, ANIMATION_FRAME_INTERVAL},
    state::IndicatorState,
    toolkit::{ContainerHandle, ObjectHandle, TimerId, Toolkit},
};

const SIGNAL_SOURCE: &str = "indicator";

fn animation_signal(kind: AnimationKind) -> String {
    match kind {
        AnimationKind::None => "indicator.ani.stop".to_string(),
        kind => format!("indicator.ani.{}", kind),
    }
}

fn frame_signal(kind: AnimationKind, frame: u32) -> String {
    format!("indicator.ani.{}.{}", kind, frame)
}

fn create_object<T: Toolkit>(toolkit: &mut T, parent: ContainerHandle, icon: &IconDescriptor) -> Result<ObjectHandle> {
    let missing = |what| Error::MissingPayload { name: icon.name.clone(), kind: icon.kind, missing: what };
    let image = icon.payload.image.as_deref();
    let text = icon.payload.text.as_deref();
    match icon.kind {
        IconKind::Image => toolkit.materialize_image(parent, image.ok_or_else(|| missing("image"))?),
        IconKind::Text => toolkit.materialize_text(parent, text.ok_or_else(|| missing("text"))?),
        IconKind::TextWithImage => {
            let text = text.ok_or_else(|| missing("text"))?;
            let object = toolkit.materialize_image(parent, image.ok_or_else(|| missing("image"))?)?;
            toolkit.set_text(object, text);
            Ok(object)
        }
        IconKind::Digit => {
            let digits = text.filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()));
            let object = toolkit.materialize_text(parent, digits.ok_or_else(|| missing("digit"))?)?;
            toolkit.emit_signal(object, "indicator.digit.show", SIGNAL_SOURCE);
            Ok(object)
        }
    }
}

impl<T: Toolkit> IndicatorState<T> {
    /// Create the on-screen object of an icon, if it doesn't have one yet.
    /// Failure is logged and leaves the icon without an object; returns whether an object exists afterwards.
    pub fn materialize(&mut self, handle: IconHandle) -> bool {
        let Some(icon) = self.icons.get_mut(handle) else {
            log::warn!("Tried to materialize {}, which is not registered", handle);
            return false;
        };
        if icon.object.is_some() {
            return true;
        }
        icon.lifecycle = LifecycleState::Materializing;
        let parent = self.containers[icon.area];

        match create_object(&mut self.toolkit, parent, icon) {
            Ok(object) => {
                if let Some(size) = icon.size_hint {
                    self.toolkit.set_size_hint(object, size.width, size.height);
                }
                // signal driven animations have to be restarted on the new object
                let animation = &icon.animation;
                if animation.is_active() {
                    let signal = if animation.kind.is_frame_based() {
                        frame_signal(animation.kind, animation.frame)
                    } else {
                        animation_signal(animation.kind)
                    };
                    self.toolkit.emit_signal(object, &signal, SIGNAL_SOURCE);
                }
                icon.object = Some(object);
                icon.lifecycle = LifecycleState::Shown;
                true
            }
            Err(err) => {
                log::error!("Failed to materialize icon {}: {}", icon.name, err);
                icon.lifecycle = LifecycleState::Hidden;
                false
            }
        }
    }

    /// Release the on-screen object of an icon. Does nothing if there is none.
    pub fn dispose(&mut self, handle: IconHandle) {
        let Some(icon) = self.icons.get_mut(handle) else {
            log::warn!("Tried to dispose {}, which is not registered", handle);
            return;
        };
        let Some(object) = icon.object.take() else { return };
        icon.lifecycle = LifecycleState::Disposing;
        self.toolkit.destroy(object);
        icon.lifecycle = LifecycleState::Hidden;
    }

    /// Start, switch or stop the animation of an icon.
    ///
    /// Starting a downloading or uploading animation while the same one is already running does
    /// nothing, so the frame sequence isn't restarted.
    pub fn set_animation(&mut self, handle: IconHandle, kind: AnimationKind) {
        let Some(icon) = self.icons.get(handle) else {
            log::warn!("Tried to animate {}, which is not registered", handle);
            return;
        };
        if kind == AnimationKind::None {
            self.stop_animation(handle);
            return;
        }
        if kind.is_frame_based() && icon.animation.kind == kind && icon.animation.timer.is_some() {
            log::debug!("{} is already {}, keeping its animation running", icon.name, kind);
            return;
        }

        self.cancel_animation_timer(handle);
        let timer = kind.is_frame_based().then(|| self.toolkit.start_timer(ANIMATION_FRAME_INTERVAL));
        let Some(icon) = self.icons.get_mut(handle) else { return };
        icon.animation.kind = kind;
        icon.animation.frame = 0;
        icon.animation.last_frame = Some(Instant::now());
        icon.animation.timer = timer;
        log::debug!("Started {} animation of {}", kind, icon.name);

        if let Some(object) = icon.object {
            let signal = if kind.is_frame_based() { frame_signal(kind, 0) } else { animation_signal(kind) };
            self.toolkit.emit_signal(object, &signal, SIGNAL_SOURCE);
        }
    }

    /// Stop the animation of an icon, cancelling its frame timer and resetting the frame state.
    pub fn stop_animation(&mut self, handle: IconHandle) {
        let Some(icon) = self.icons.get(handle) else { return };
        if !icon.animation.is_active() {
            return;
        }
        self.cancel_animation_timer(handle);
        let Some(icon) = self.icons.get_mut(handle) else { return };
        log::debug!("Stopped {} animation of {}", icon.animation.kind, icon.name);
        icon.animation = Default::default();
        if let Some(object) = icon.object {
            self.toolkit.emit_signal(object, &animation_signal(AnimationKind::None), SIGNAL_SOURCE);
        }
    }

    /// Advance the animation owning `timer`, if at least one frame interval has passed since its last frame.
    ///
    /// Returns false if no icon owns the timer anymore; the host should cancel such a timer.
    pub fn animation_tick(&mut self, timer: TimerId, now: Instant) -> bool {
        let owner = self.icons.iter().find(|(_, icon)| icon.animation.timer == Some(timer)).map(|(handle, _)| handle);
        let Some(icon) = owner.and_then(|handle| self.icons.get_mut(handle)) else {
            log::debug!("Got a tick for {:?}, which no icon owns", timer);
            return false;
        };

        let animation = &mut icon.animation;
        let elapsed = animation.last_frame.map_or(ANIMATION_FRAME_INTERVAL, |last| now.saturating_duration_since(last));
        if elapsed < ANIMATION_FRAME_INTERVAL {
            return true;
        }
        animation.frame = (animation.frame + 1) % ANIMATION_FRAME_COUNT;
        animation.last_frame = Some(now);

        // evicted icons keep counting frames, but there is nothing to draw them on
        if let Some(object) = icon.object {
            let signal = frame_signal(animation.kind, animation.frame);
            self.toolkit.emit_signal(object, &signal, SIGNAL_SOURCE);
        }
        true
    }

    fn cancel_animation_timer(&mut self, handle: IconHandle) {
        let Some(icon) = self.icons.get_mut(handle) else { return };
        if let Some(timer) = icon.animation.timer.take() {
            self.toolkit.cancel_timer(timer);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{icon::Area, toolkit::RecordingToolkit, IconDescriptor};
    use pretty_assertions::assert_eq;

    fn shown_icon(state: &mut IndicatorState<RecordingToolkit>) -> IconHandle {
        let handle = state.register_icon(IconDescriptor::new("data", Area::System, 1).with_image("data.png")).unwrap();
        state.icon_show(handle);
        handle
    }

    fn signals(state: &IndicatorState<RecordingToolkit>, handle: IconHandle) -> Vec<String> {
        let object = state.icon(handle).unwrap().object().unwrap();
        state.toolkit().object(object).unwrap().signals.clone()
    }

    #[test]
    fn test_materialize_applies_payload_and_size() {
        let mut state = IndicatorState::new(RecordingToolkit::new());
        let handle = state
            .register_icon(
                IconDescriptor::new("volume", Area::System, 0)
                    .with_kind(IconKind::TextWithImage)
                    .with_image("volume.png")
                    .with_text("40")
                    .with_size(24, 24),
            )
            .unwrap();
        assert!(state.materialize(handle));
        let object = state.toolkit().object(state.icon(handle).unwrap().object().unwrap()).unwrap();
        assert_eq!(object.image.as_deref(), Some("volume.png"));
        assert_eq!(object.text.as_deref(), Some("40"));
        assert_eq!(object.size, Some((24, 24)));
        assert_eq!(state.icon(handle).unwrap().lifecycle(), LifecycleState::Shown);
    }

    #[test]
    fn test_digit_requires_digits() {
        let mut state = IndicatorState::new(RecordingToolkit::new());
        let bad = state
            .register_icon(IconDescriptor::new("count", Area::Notification, 0).with_kind(IconKind::Digit).with_text("x1"))
            .unwrap();
        let good = state
            .register_icon(IconDescriptor::new("count_2", Area::Notification, 0).with_kind(IconKind::Digit).with_text("12"))
            .unwrap();
        assert!(!state.materialize(bad));
        assert_eq!(state.icon(bad).unwrap().lifecycle(), LifecycleState::Hidden);
        assert!(state.materialize(good));
        assert_eq!(signals(&state, good), vec!["indicator.digit.show"]);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut state = IndicatorState::new(RecordingToolkit::new());
        let handle = shown_icon(&mut state);
        state.dispose(handle);
        state.dispose(handle);
        assert!(!state.icon(handle).unwrap().obj_exists());
        assert_eq!(state.toolkit().live_objects(), 0);
    }

    #[test]
    fn test_frames_advance_and_wrap() {
        let mut state = IndicatorState::new(RecordingToolkit::new());
        let handle = shown_icon(&mut state);
        state.set_animation(handle, AnimationKind::Uploading);
        let timer = state.icon(handle).unwrap().animation().timer.unwrap();
        let start = state.icon(handle).unwrap().animation().last_frame.unwrap();

        let mut now = start;
        for _ in 0..ANIMATION_FRAME_COUNT {
            now += ANIMATION_FRAME_INTERVAL;
            assert!(state.animation_tick(timer, now));
        }
        assert_eq!(state.icon(handle).unwrap().animation().frame, 0);
        assert_eq!(signals(&state, handle).last().map(String::as_str), Some("indicator.ani.uploading.0"));
    }

    #[test]
    fn test_early_tick_does_not_advance() {
        let mut state = IndicatorState::new(RecordingToolkit::new());
        let handle = shown_icon(&mut state);
        state.set_animation(handle, AnimationKind::Downloading);
        let animation = state.icon(handle).unwrap().animation().clone();
        let timer = animation.timer.unwrap();

        state.animation_tick(timer, animation.last_frame.unwrap() + Duration::from_millis(100));
        assert_eq!(state.icon(handle).unwrap().animation().frame, 0);
        // a late tick still only moves one frame ahead
        state.animation_tick(timer, animation.last_frame.unwrap() + Duration::from_secs(2));
        assert_eq!(state.icon(handle).unwrap().animation().frame, 1);
    }

    #[test]
    fn test_switching_family_restarts_timer() {
        let mut state = IndicatorState::new(RecordingToolkit::new());
        let handle = shown_icon(&mut state);
        state.set_animation(handle, AnimationKind::Downloading);
        let first = state.icon(handle).unwrap().animation().timer.unwrap();
        state.set_animation(handle, AnimationKind::Uploading);
        let second = state.icon(handle).unwrap().animation().timer.unwrap();
        assert_ne!(first, second);
        assert!(!state.toolkit().is_timer_active(first));
        assert!(state.toolkit().is_timer_active(second));
    }

    #[test]
    fn test_signal_animation_has_no_timer() {
        let mut state = IndicatorState::new(RecordingToolkit::new());
        let handle = shown_icon(&mut state);
        state.set_animation(handle, AnimationKind::Blink);
        assert_eq!(state.icon(handle).unwrap().animation().timer, None);
        state.set_animation(handle, AnimationKind::None);
        assert_eq!(signals(&state, handle), vec!["indicator.ani.blink", "indicator.ani.stop"]);
        assert!(!state.icon(handle).unwrap().animation().is_active());
    }

    #[test]
    fn test_tick_for_unknown_timer() {
        let mut state = IndicatorState::new(RecordingToolkit::new());
        assert!(!state.animation_tick(TimerId(4242), Instant::now()));
    }
}
