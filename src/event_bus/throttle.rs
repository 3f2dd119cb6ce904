use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::time::sleep;

use crate::event_bus::{Event, Handler};

#[derive(Debug, Default)]
struct ThrottleState {
    cooling_down: bool,
    pending: Option<Event>,
}

/// Wrap `handler` so it runs at most once per `window`.
///
/// The first event runs immediately. Events arriving during the window are collapsed into a single
/// trailing run with the latest payload once the window ends, which opens a new window.
///
/// Trailing runs happen on a background task; their errors are logged, not returned.
pub fn throttle(handler: Handler, window: Duration) -> Handler {
    let state = Arc::new(Mutex::new(ThrottleState::default()));

    Handler::new(move |event| {
        let state = state.clone();
        let handler = handler.clone();
        async move {
            {
                let mut state = state.lock();
                if state.cooling_down {
                    trace!("Throttled event deferred to trailing run");
                    state.pending = Some(event);
                    return Ok(());
                }
                state.cooling_down = true;
            }

            tokio::spawn(drain_window(state, handler.clone(), window));
            handler.call(event).await
        }
    })
}

async fn drain_window(state: Arc<Mutex<ThrottleState>>, handler: Handler, window: Duration) {
    loop {
        sleep(window).await;

        let next = {
            let mut state = state.lock();
            match state.pending.take() {
                Some(event) => event,
                None => {
                    state.cooling_down = false;
                    return;
                }
            }
        };

        if let Err(e) = handler.call(next).await {
            warn!(error = %e, "Trailing throttled run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::{EventBus, EventName};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording_handler(seen: Arc<Mutex<Vec<Event>>>, runs: Arc<AtomicUsize>) -> Handler {
        Handler::new(move |event| {
            let seen = seen.clone();
            let runs = runs.clone();
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                seen.lock().push(event);
                Ok(())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_collapse_into_leading_and_trailing_run() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let runs = Arc::new(AtomicUsize::new(0));
        bus.on(
            EventName::AvailabilityCheckRequested,
            throttle(recording_handler(seen.clone(), runs.clone()), Duration::from_secs(1)),
        );

        for provider in ["a", "b", "c"] {
            bus.emit(Event::AvailabilityCheckRequested { provider_id: provider.into() })
                .wait()
                .await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        sleep(Duration::from_millis(1_100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(
            *seen.lock(),
            vec![
                Event::AvailabilityCheckRequested { provider_id: "a".into() },
                Event::AvailabilityCheckRequested { provider_id: "c".into() },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_window_reopens() {
        let bus = EventBus::new();
        let runs = Arc::new(AtomicUsize::new(0));
        bus.on(
            EventName::WalletsSyncRequested,
            throttle(recording_handler(Arc::default(), runs.clone()), Duration::from_secs(1)),
        );

        bus.emit(Event::WalletsSyncRequested).wait().await;
        sleep(Duration::from_millis(1_100)).await;
        bus.emit(Event::WalletsSyncRequested).wait().await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
