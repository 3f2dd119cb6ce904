use std::{any::Any, collections::HashMap, fmt, panic::AssertUnwindSafe, sync::Arc};

use futures::{
    FutureExt,
    future::{BoxFuture, join_all},
};
use parking_lot::RwLock;

use crate::{
    SyncError,
    event_bus::{EmitHandle, Event, EventName},
};

/// Outcome of one handler invocation.
pub type HandlerResult = Result<(), SyncError>;

type HandlerFn = dyn Fn(Event) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// A registered reaction to an event.
///
/// Handlers are compared by identity: [`EventBus::off`] removes the registration made with this
/// value or one of its clones, never an equivalent closure created separately.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self { inner: Arc::new(move |event| f(event).boxed()) }
    }

    /// Run the handler's synchronous part for `event` and return the rest as a future.
    pub fn call(&self, event: Event) -> BoxFuture<'static, HandlerResult> {
        (self.inner)(event)
    }

    #[must_use]
    pub fn same_as(&self, other: &Handler) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("ptr", &Arc::as_ptr(&self.inner).cast::<()>()).finish()
    }
}

#[derive(Debug, Clone)]
struct Registration {
    handler: Handler,
    once: bool,
}

/// Process-wide publish/subscribe register.
///
/// Construct one at startup and hand clones to whatever needs to emit or register; clones share the
/// same registry.
///
/// # Dispatch
///
/// [`emit`](Self::emit) snapshots the handlers registered for the event's name and drives them on a
/// single spawned task. They are started in registration order, each running until its first
/// suspension point before the next one starts, and afterwards interleave freely. A handler that
/// fails or panics does not stop the others. The bus neither logs nor retries on a handler's
/// behalf.
///
/// There is no queue and no ordering across different events emitted concurrently.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    registry: Arc<RwLock<HashMap<EventName, Vec<Registration>>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `name`. Registering the same handler twice makes it run twice.
    pub fn on(&self, name: EventName, handler: Handler) {
        self.register(name, handler, false);
    }

    /// Register `handler` for the next emit of `name` only.
    pub fn once(&self, name: EventName, handler: Handler) {
        self.register(name, handler, true);
    }

    /// Remove the first registration of `handler` for `name`; returns whether one was found.
    pub fn off(&self, name: EventName, handler: &Handler) -> bool {
        let mut registry = self.registry.write();
        let Some(registrations) = registry.get_mut(&name) else {
            return false;
        };
        let Some(index) = registrations.iter().position(|r| r.handler.same_as(handler)) else {
            return false;
        };
        registrations.remove(index);
        if registrations.is_empty() {
            registry.remove(&name);
        }
        true
    }

    #[must_use]
    pub fn listener_count(&self, name: EventName) -> usize {
        self.registry.read().get(&name).map_or(0, Vec::len)
    }

    /// Invoke every handler registered for the event's name with a clone of `event`.
    ///
    /// Returns immediately. Drop the returned handle for fire-and-forget, or await
    /// [`EmitHandle::wait`] to sequence on the handlers' completion. Must be called from within a
    /// Tokio runtime unless no handler is registered.
    pub fn emit(&self, event: Event) -> EmitHandle {
        let name = event.name();
        let handlers = self.take_snapshot(name);
        if handlers.is_empty() {
            return EmitHandle::completed();
        }

        let invocations: Vec<_> = handlers
            .iter()
            .map(|handler| {
                let (handler, event) = (handler.clone(), event.clone());
                AssertUnwindSafe(async move { handler.call(event).await }).catch_unwind().map(
                    |outcome| {
                        outcome
                            .unwrap_or_else(|panic| Err(SyncError::Handler(panic_message(&*panic))))
                    },
                )
            })
            .collect();

        EmitHandle::spawned(tokio::spawn(join_all(invocations)))
    }

    fn register(&self, name: EventName, handler: Handler, once: bool) {
        self.registry.write().entry(name).or_default().push(Registration { handler, once });
    }

    fn take_snapshot(&self, name: EventName) -> Vec<Handler> {
        let mut registry = self.registry.write();
        let Some(registrations) = registry.get_mut(&name) else {
            return Vec::new();
        };
        let handlers = registrations.iter().map(|r| r.handler.clone()).collect();
        registrations.retain(|r| !r.once);
        if registrations.is_empty() {
            registry.remove(&name);
        }
        handlers
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tokio::time::sleep;

    fn counting_handler(counter: Arc<AtomicUsize>) -> Handler {
        Handler::new(move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn emit_without_handlers_is_a_no_op() {
        let bus = EventBus::new();
        let results = bus.emit(Event::WalletsSyncRequested).wait().await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn handlers_start_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for id in 0..5 {
            let order = order.clone();
            bus.on(
                EventName::WalletsSyncRequested,
                Handler::new(move |_| {
                    let order = order.clone();
                    async move {
                        order.lock().push(id);
                        Ok(())
                    }
                }),
            );
        }

        bus.emit(Event::WalletsSyncRequested).wait().await;
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn every_handler_receives_the_same_payload() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let seen = seen.clone();
            bus.on(
                EventName::AvailabilityCheckRequested,
                Handler::new(move |event| {
                    let seen = seen.clone();
                    async move {
                        seen.lock().push(event);
                        Ok(())
                    }
                }),
            );
        }

        let event = Event::AvailabilityCheckRequested { provider_id: "haqq".into() };
        bus.emit(event.clone()).wait().await;
        assert_eq!(*seen.lock(), vec![event.clone(), event]);
    }

    #[tokio::test]
    async fn removed_handler_is_not_invoked_again() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(counter.clone());

        bus.on(EventName::WalletsSyncRequested, handler.clone());
        bus.emit(Event::WalletsSyncRequested).wait().await;
        assert!(bus.off(EventName::WalletsSyncRequested, &handler));
        bus.emit(Event::WalletsSyncRequested).wait().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(EventName::WalletsSyncRequested), 0);
    }

    #[tokio::test]
    async fn off_only_removes_the_given_handler() {
        let bus = EventBus::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let first_handler = counting_handler(first.clone());

        bus.on(EventName::WalletsSyncRequested, first_handler.clone());
        bus.on(EventName::WalletsSyncRequested, counting_handler(second.clone()));
        // a look-alike closure is a different handler
        assert!(!bus.off(EventName::WalletsSyncRequested, &counting_handler(first.clone())));
        assert!(bus.off(EventName::WalletsSyncRequested, &first_handler));

        bus.emit(Event::WalletsSyncRequested).wait().await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_registration_runs_twice() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(counter.clone());

        bus.on(EventName::WalletsSyncRequested, handler.clone());
        bus.on(EventName::WalletsSyncRequested, handler);
        bus.emit(Event::WalletsSyncRequested).wait().await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn once_handler_runs_a_single_time() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.once(EventName::WalletsSyncRequested, counting_handler(counter.clone()));

        bus.emit(Event::WalletsSyncRequested).wait().await;
        bus.emit(Event::WalletsSyncRequested).wait().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_and_panicking_handlers_do_not_stop_siblings() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.on(
            EventName::AppBackupCheckRequested,
            Handler::new(|_| async { Err::<(), _>(SyncError::Precondition("cloud unavailable".into())) }),
        );
        bus.on(
            EventName::AppBackupCheckRequested,
            Handler::new(|event| async move {
                assert!(event != Event::AppBackupCheckRequested, "boom");
                Ok(())
            }),
        );
        bus.on(EventName::AppBackupCheckRequested, counting_handler(counter.clone()));

        let results = bus.emit(Event::AppBackupCheckRequested).wait().await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Err(SyncError::Precondition(String::new())));
        assert!(matches!(&results[1], Err(SyncError::Handler(msg)) if msg == "boom"));
        assert_eq!(results[2], Ok(()));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_panicking_before_its_future_does_not_stop_siblings() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.on(
            EventName::WalletsSyncRequested,
            Handler::new(|event| {
                assert!(event != Event::WalletsSyncRequested, "sync boom");
                async { Ok(()) }
            }),
        );
        bus.on(EventName::WalletsSyncRequested, counting_handler(counter.clone()));

        let results = bus.emit(Event::WalletsSyncRequested).wait().await;

        assert_eq!(results.len(), 2);
        assert!(matches!(&results[0], Err(SyncError::Handler(msg)) if msg == "sync boom"));
        assert_eq!(results[1], Ok(()));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn emit_does_not_wait_for_handlers() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let slow_counter = counter.clone();

        bus.on(
            EventName::WalletsSyncRequested,
            Handler::new(move |_| {
                let counter = slow_counter.clone();
                async move {
                    sleep(Duration::from_secs(10)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );

        drop(bus.emit(Event::WalletsSyncRequested));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        // detached task still completes
        sleep(Duration::from_secs(11)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_registered_during_emit_is_not_part_of_it() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let late = counting_handler(counter.clone());

        let registering_bus = bus.clone();
        bus.on(
            EventName::WalletsSyncRequested,
            Handler::new(move |_| {
                let bus = registering_bus.clone();
                let late = late.clone();
                async move {
                    bus.on(EventName::WalletsSyncRequested, late);
                    Ok(())
                }
            }),
        );

        bus.emit(Event::WalletsSyncRequested).wait().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count(EventName::WalletsSyncRequested), 2);
    }
}
