//! The windowing toolkit, as far as the allocator is concerned.

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use itertools::Itertools;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TimerId(pub u64);

/// Widget operations the allocator needs from its host toolkit.
///
/// Timers are cooperative: the host calls [`crate::IndicatorState::animation_tick`] on its own
/// loop whenever a timer started here fires, until the timer is cancelled.
pub trait Toolkit {
    fn create_container(&mut self, parent: Option<ContainerHandle>, name: &str) -> ContainerHandle;
    fn pack_into(&mut self, container: ContainerHandle, object: ObjectHandle, position: usize);
    fn unpack_all(&mut self, container: ContainerHandle);
    fn materialize_image(&mut self, parent: ContainerHandle, path: &str) -> Result<ObjectHandle>;
    fn materialize_text(&mut self, parent: ContainerHandle, text: &str) -> Result<ObjectHandle>;
    fn set_image(&mut self, object: ObjectHandle, path: &str);
    fn set_text(&mut self, object: ObjectHandle, text: &str);
    fn destroy(&mut self, object: ObjectHandle);
    fn emit_signal(&mut self, target: ObjectHandle, signal: &str, source: &str);
    fn set_size_hint(&mut self, object: ObjectHandle, width: u32, height: u32);
    fn start_timer(&mut self, interval: Duration) -> TimerId;
    fn cancel_timer(&mut self, timer: TimerId);
}

/// Calls made against a [`RecordingToolkit`] that change what is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolkitCall {
    Pack { container: ContainerHandle, object: ObjectHandle, position: usize },
    UnpackAll(ContainerHandle),
    Destroy(ObjectHandle),
    Signal { target: ObjectHandle, signal: String, source: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedContainer {
    pub name: String,
    pub parent: Option<ContainerHandle>,
    pub children: Vec<ObjectHandle>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedObject {
    pub parent: Option<ContainerHandle>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub size: Option<(u32, u32)>,
    pub signals: Vec<String>,
}

/// A toolkit that keeps its widget tree in memory and journals every call that changes it.
#[derive(Debug)]
pub struct RecordingToolkit {
    next_id: u64,
    containers: HashMap<ContainerHandle, RecordedContainer>,
    objects: HashMap<ObjectHandle, RecordedObject>,
    active_timers: HashSet<TimerId>,
    failing_paths: HashSet<String>,
    record_journal: bool,
    journal: Vec<ToolkitCall>,
}

impl Default for RecordingToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingToolkit {
    pub fn new() -> Self {
        RecordingToolkit {
            next_id: 0,
            containers: HashMap::new(),
            objects: HashMap::new(),
            active_timers: HashSet::new(),
            failing_paths: HashSet::new(),
            record_journal: true,
            journal: Vec::new(),
        }
    }

    /// A toolkit that keeps the widget tree, but doesn't grow a journal.
    pub fn without_journal() -> Self {
        RecordingToolkit { record_journal: false, ..Self::new() }
    }

    /// Make every later attempt to materialize an image from `path` fail.
    pub fn fail_materialization_of(&mut self, path: impl Into<String>) {
        self.failing_paths.insert(path.into());
    }

    pub fn allow_materialization_of(&mut self, path: &str) {
        self.failing_paths.remove(path);
    }

    pub fn journal(&self) -> &[ToolkitCall] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<ToolkitCall> {
        std::mem::take(&mut self.journal)
    }

    pub fn container(&self, handle: ContainerHandle) -> Option<&RecordedContainer> {
        self.containers.get(&handle)
    }

    pub fn container_by_name(&self, name: &str) -> Option<ContainerHandle> {
        self.containers.iter().find(|(_, c)| c.name == name).map(|(handle, _)| *handle)
    }

    /// Objects packed into a container, in packing order.
    pub fn packed(&self, handle: ContainerHandle) -> &[ObjectHandle] {
        self.containers.get(&handle).map(|c| c.children.as_slice()).unwrap_or_default()
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&RecordedObject> {
        self.objects.get(&handle)
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn is_timer_active(&self, timer: TimerId) -> bool {
        self.active_timers.contains(&timer)
    }

    pub fn active_timers(&self) -> Vec<TimerId> {
        self.active_timers.iter().copied().sorted().collect()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, call: ToolkitCall) {
        if self.record_journal {
            self.journal.push(call);
        }
    }

    fn new_object(&mut self, parent: ContainerHandle, object: RecordedObject) -> Result<ObjectHandle> {
        if !self.containers.contains_key(&parent) {
            return Err(Error::WidgetCreation(format!("unknown parent container {:?}", parent)));
        }
        let handle = ObjectHandle(self.next_id());
        self.objects.insert(handle, RecordedObject { parent: Some(parent), ..object });
        Ok(handle)
    }
}

impl Toolkit for RecordingToolkit {
    fn create_container(&mut self, parent: Option<ContainerHandle>, name: &str) -> ContainerHandle {
        let handle = ContainerHandle(self.next_id());
        self.containers.insert(handle, RecordedContainer { name: name.to_string(), parent, children: Vec::new() });
        handle
    }

    fn pack_into(&mut self, container: ContainerHandle, object: ObjectHandle, position: usize) {
        match self.containers.get_mut(&container) {
            Some(c) => {
                let position = position.min(c.children.len());
                c.children.insert(position, object);
            }
            None => {
                log::warn!("Tried to pack {:?} into unknown container {:?}", object, container);
                return;
            }
        }
        self.record(ToolkitCall::Pack { container, object, position });
    }

    fn unpack_all(&mut self, container: ContainerHandle) {
        if let Some(c) = self.containers.get_mut(&container) {
            c.children.clear();
        }
        self.record(ToolkitCall::UnpackAll(container));
    }

    fn materialize_image(&mut self, parent: ContainerHandle, path: &str) -> Result<ObjectHandle> {
        if path.is_empty() || self.failing_paths.contains(path) {
            return Err(Error::WidgetCreation(format!("could not load image {:?}", path)));
        }
        self.new_object(parent, RecordedObject { image: Some(path.to_string()), ..Default::default() })
    }

    fn materialize_text(&mut self, parent: ContainerHandle, text: &str) -> Result<ObjectHandle> {
        self.new_object(parent, RecordedObject { text: Some(text.to_string()), ..Default::default() })
    }

    fn set_image(&mut self, object: ObjectHandle, path: &str) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.image = Some(path.to_string());
        }
    }

    fn set_text(&mut self, object: ObjectHandle, text: &str) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.text = Some(text.to_string());
        }
    }

    fn destroy(&mut self, object: ObjectHandle) {
        if self.objects.remove(&object).is_none() {
            log::warn!("Tried to destroy unknown object {:?}", object);
            return;
        }
        for c in self.containers.values_mut() {
            c.children.retain(|child| *child != object);
        }
        self.record(ToolkitCall::Destroy(object));
    }

    fn emit_signal(&mut self, target: ObjectHandle, signal: &str, source: &str) {
        match self.objects.get_mut(&target) {
            Some(o) => o.signals.push(signal.to_string()),
            None => {
                log::warn!("Tried to emit {} on unknown object {:?}", signal, target);
                return;
            }
        }
        self.record(ToolkitCall::Signal { target, signal: signal.to_string(), source: source.to_string() });
    }

    fn set_size_hint(&mut self, object: ObjectHandle, width: u32, height: u32) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.size = Some((width, height));
        }
    }

    fn start_timer(&mut self, _interval: Duration) -> TimerId {
        let timer = TimerId(self.next_id());
        self.active_timers.insert(timer);
        timer
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        self.active_timers.remove(&timer);
    }
}
