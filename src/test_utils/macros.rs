/// Asserts that an [`EventRecorder`](crate::test_utils::EventRecorder) receives `event`.
///
/// Waits up to `timeout` seconds (default 5) for a handler invocation carrying an event equal to
/// `event`. Other events may be recorded before or after it.
///
/// # Examples
///
/// ```no_run
/// # use wallet_sync::{assert_emitted, Event, EventBus, EventName};
/// # use wallet_sync::test_utils::EventRecorder;
/// # async fn example() {
/// let bus = EventBus::new();
/// let recorder = EventRecorder::attach(&bus, [EventName::WalletsSyncRequested]);
///
/// bus.emit(Event::WalletsSyncRequested);
///
/// assert_emitted!(recorder, Event::WalletsSyncRequested);
/// # }
/// ```
///
/// # Panics
///
/// If the event is not recorded within the timeout. The message lists what was recorded instead.
#[macro_export]
macro_rules! assert_emitted {
    ($recorder: expr, $event: expr) => {
        $crate::assert_emitted!($recorder, $event, timeout = 5)
    };
    ($recorder: expr, $event: expr, timeout = $secs: expr) => {
        let expected = $event;
        let arrived =
            $recorder.wait_for(&expected, std::time::Duration::from_secs($secs)).await;
        assert!(
            arrived,
            "Expected {:?} to be emitted, recorded: {:#?}",
            expected,
            $recorder.events()
        );
    };
}

/// Asserts that an [`EventRecorder`](crate::test_utils::EventRecorder) has not received any event
/// named `name`, after giving already spawned handlers a chance to run.
///
/// # Panics
///
/// If an event with that name was recorded.
#[macro_export]
macro_rules! assert_not_emitted {
    ($recorder: expr, $name: expr) => {
        $recorder.settle().await;
        let name = $name;
        assert_eq!(
            $recorder.count(name),
            0,
            "Expected no {:?} event, recorded: {:#?}",
            name,
            $recorder.events()
        );
    };
}
