//! The toolkit the daemon renders into.
//!
//! There is no real display server behind it: the widget tree is kept in memory, and animation
//! timers are tokio tasks that feed ticks back into the app's event loop.

use std::{collections::HashMap, time::Duration};

use indicator_core::{ContainerHandle, ObjectHandle, RecordingToolkit, TimerId, Toolkit};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::app::DaemonCommand;

#[derive(Debug)]
pub struct HeadlessToolkit {
    tree: RecordingToolkit,
    evt_send: UnboundedSender<DaemonCommand>,
    timers: HashMap<TimerId, CancellationToken>,
}

impl HeadlessToolkit {
    pub fn new(evt_send: UnboundedSender<DaemonCommand>) -> Self {
        HeadlessToolkit { tree: RecordingToolkit::without_journal(), evt_send, timers: HashMap::new() }
    }

    pub fn running_timers(&self) -> usize {
        self.timers.len()
    }

    fn spawn_timer(&self, timer: TimerId, interval: Duration, cancellation_token: CancellationToken) {
        let evt_send = self.evt_send.clone();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::error!("Can't start {:?} outside of the tokio runtime", timer);
            return;
        };
        runtime.spawn(async move {
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            crate::loop_select_exiting! {
                _ = cancellation_token.cancelled() => break,
                _ = ticks.tick() => {
                    if evt_send.send(DaemonCommand::AnimationTick(timer)).is_err() {
                        break;
                    }
                }
            }
        });
    }
}

impl Toolkit for HeadlessToolkit {
    fn create_container(&mut self, parent: Option<ContainerHandle>, name: &str) -> ContainerHandle {
        self.tree.create_container(parent, name)
    }

    fn pack_into(&mut self, container: ContainerHandle, object: ObjectHandle, position: usize) {
        self.tree.pack_into(container, object, position)
    }

    fn unpack_all(&mut self, container: ContainerHandle) {
        self.tree.unpack_all(container)
    }

    fn materialize_image(&mut self, parent: ContainerHandle, path: &str) -> indicator_core::Result<ObjectHandle> {
        if !std::path::Path::new(path).exists() {
            log::warn!("Image {} does not exist, the icon will show up empty", path);
        }
        self.tree.materialize_image(parent, path)
    }

    fn materialize_text(&mut self, parent: ContainerHandle, text: &str) -> indicator_core::Result<ObjectHandle> {
        self.tree.materialize_text(parent, text)
    }

    fn set_image(&mut self, object: ObjectHandle, path: &str) {
        self.tree.set_image(object, path)
    }

    fn set_text(&mut self, object: ObjectHandle, text: &str) {
        self.tree.set_text(object, text)
    }

    fn destroy(&mut self, object: ObjectHandle) {
        self.tree.destroy(object)
    }

    fn emit_signal(&mut self, target: ObjectHandle, signal: &str, source: &str) {
        log::debug!("{:?} <- {} ({})", target, signal, source);
        self.tree.emit_signal(target, signal, source)
    }

    fn set_size_hint(&mut self, object: ObjectHandle, width: u32, height: u32) {
        self.tree.set_size_hint(object, width, height)
    }

    fn start_timer(&mut self, interval: Duration) -> TimerId {
        let timer = self.tree.start_timer(interval);
        let cancellation_token = CancellationToken::new();
        self.spawn_timer(timer, interval, cancellation_token.clone());
        self.timers.insert(timer, cancellation_token);
        timer
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        self.tree.cancel_timer(timer);
        if let Some(token) = self.timers.remove(&timer) {
            token.cancel();
        }
    }
}

impl Drop for HeadlessToolkit {
    fn drop(&mut self) {
        self.timers.drain().for_each(|(_, token)| token.cancel());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next_tick(recv: &mut tokio::sync::mpsc::UnboundedReceiver<DaemonCommand>) -> Option<TimerId> {
        match tokio::time::timeout(Duration::from_secs(2), recv.recv()).await {
            Ok(Some(DaemonCommand::AnimationTick(timer))) => Some(timer),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_timer_ticks_until_cancelled() {
        let (evt_send, mut evt_recv) = tokio::sync::mpsc::unbounded_channel();
        let mut toolkit = HeadlessToolkit::new(evt_send);
        let timer = toolkit.start_timer(Duration::from_millis(10));

        assert_eq!(next_tick(&mut evt_recv).await, Some(timer));
        assert_eq!(next_tick(&mut evt_recv).await, Some(timer));

        toolkit.cancel_timer(timer);
        assert_eq!(toolkit.running_timers(), 0);
        // ticks that were already queued may still arrive, but no new ones after that
        tokio::time::sleep(Duration::from_millis(50)).await;
        while evt_recv.try_recv().is_ok() {}
        let late = tokio::time::timeout(Duration::from_millis(100), evt_recv.recv()).await;
        assert!(late.is_err());
    }

    #[tokio::test]
    async fn test_dropping_toolkit_stops_timers() {
        let (evt_send, mut evt_recv) = tokio::sync::mpsc::unbounded_channel();
        let mut toolkit = HeadlessToolkit::new(evt_send);
        toolkit.start_timer(Duration::from_millis(10));
        toolkit.start_timer(Duration::from_millis(15));
        drop(toolkit);

        tokio::time::sleep(Duration::from_millis(50)).await;
        while evt_recv.try_recv().is_ok() {}
        // the timer tasks held the last senders, so the channel closes once they are gone
        let after = tokio::time::timeout(Duration::from_secs(2), evt_recv.recv()).await;
        assert!(matches!(after, Ok(None)));
    }
}
