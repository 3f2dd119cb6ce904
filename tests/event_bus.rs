use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::sync::oneshot;
use wallet_sync::{
    Event, EventBus, EventName, Handler, SyncError, assert_emitted, assert_not_emitted,
    test_utils::EventRecorder,
};

fn counter(count: Arc<AtomicUsize>) -> Handler {
    Handler::new(move |_| {
        let count = count.clone();
        async move {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

#[tokio::test]
async fn emit_reaches_every_registered_handler() -> anyhow::Result<()> {
    let bus = EventBus::new();
    let recorder = EventRecorder::attach(&bus, [EventName::TransactionCreated]);
    let count = Arc::new(AtomicUsize::new(0));
    bus.on(EventName::TransactionCreated, counter(count.clone()));

    let event = Event::TransactionCreated { hash: Default::default() };
    bus.emit(event.clone()).wait_ok().await?;

    assert_emitted!(recorder, event);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn off_detaches_only_that_handler() -> anyhow::Result<()> {
    let bus = EventBus::new();
    let count = Arc::new(AtomicUsize::new(0));
    let handler = counter(count.clone());
    let recorder = EventRecorder::attach(&bus, [EventName::WalletsSyncRequested]);
    bus.on(EventName::WalletsSyncRequested, handler.clone());

    assert!(bus.off(EventName::WalletsSyncRequested, &handler));
    assert!(!bus.off(EventName::WalletsSyncRequested, &handler));
    bus.emit(Event::WalletsSyncRequested).wait_ok().await?;

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.count(EventName::WalletsSyncRequested), 1);
    Ok(())
}

#[tokio::test]
async fn handler_failure_is_reported_but_isolated() {
    let bus = EventBus::new();
    let recorder = EventRecorder::attach(&bus, [EventName::AppBackupCheckRequested]);
    bus.on(
        EventName::AppBackupCheckRequested,
        Handler::new(|_| async {
            Err::<(), _>(SyncError::Precondition("cloud storage unavailable".into()))
        }),
    );
    let trailing = EventRecorder::attach(&bus, [EventName::AppBackupCheckRequested]);

    let results = bus.emit(Event::AppBackupCheckRequested).wait().await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(SyncError::Precondition(_))));
    assert!(results[2].is_ok());
    assert_eq!(recorder.count(EventName::AppBackupCheckRequested), 1);
    assert_eq!(trailing.count(EventName::AppBackupCheckRequested), 1);
}

#[tokio::test]
async fn emit_returns_before_slow_handlers_finish() -> anyhow::Result<()> {
    let bus = EventBus::new();
    let (release, released) = oneshot::channel::<()>();
    let released = Arc::new(tokio::sync::Mutex::new(Some(released)));
    bus.on(
        EventName::WalletsSyncRequested,
        Handler::new(move |_| {
            let released = released.clone();
            async move {
                if let Some(rx) = released.lock().await.take() {
                    let _ = rx.await;
                }
                Ok(())
            }
        }),
    );

    let handle = bus.emit(Event::WalletsSyncRequested);
    tokio::task::yield_now().await;
    assert!(!handle.is_finished());

    let _ = release.send(());
    tokio::time::timeout(Duration::from_secs(5), handle.wait_ok()).await??;
    Ok(())
}

#[tokio::test]
async fn chained_emission_from_a_handler() {
    let bus = EventBus::new();
    let recorder = EventRecorder::attach(&bus, [EventName::MnemonicBackupNeeded]);
    let chained = bus.clone();
    bus.on(
        EventName::AppBackupCheckRequested,
        Handler::new(move |_| {
            let bus = chained.clone();
            async move {
                drop(bus.emit(Event::BackupNeeded {
                    kind: wallet_sync::BackupKind::SeedPhrase,
                    account_id: "acc".into(),
                }));
                Ok(())
            }
        }),
    );

    drop(bus.emit(Event::AppBackupCheckRequested));

    assert_emitted!(
        recorder,
        Event::BackupNeeded { kind: wallet_sync::BackupKind::SeedPhrase, account_id: "acc".into() }
    );
    assert_not_emitted!(recorder, EventName::SocialRecoveryBackupNeeded);
}
