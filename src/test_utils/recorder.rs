use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::event_bus::{Event, EventBus, EventName, Handler};

/// Records every event emitted under the given names.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<Event>>>,
    notify: Arc<Notify>,
}

impl EventRecorder {
    /// Register a recording handler for each of `names` on `bus`.
    #[must_use]
    pub fn attach(bus: &EventBus, names: impl IntoIterator<Item = EventName>) -> Self {
        let recorder = Self::default();
        for name in names {
            let events = recorder.events.clone();
            let notify = recorder.notify.clone();
            bus.on(
                name,
                Handler::new(move |event| {
                    let events = events.clone();
                    let notify = notify.clone();
                    async move {
                        events.lock().push(event);
                        notify.notify_waiters();
                        Ok(())
                    }
                }),
            );
        }
        recorder
    }

    /// Everything recorded so far, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn count(&self, name: EventName) -> usize {
        self.events.lock().iter().filter(|event| event.name() == name).count()
    }

    /// Wait until `expected` has been recorded.
    ///
    /// Returns `false` if it did not arrive within `timeout`.
    pub async fn wait_for(&self, expected: &Event, timeout: Duration) -> bool {
        let arrived = async {
            loop {
                let notified = self.notify.notified();
                if self.events.lock().contains(expected) {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, arrived).await.is_ok()
    }

    /// Give already spawned handlers the chance to run.
    pub async fn settle(&self) {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }
}
