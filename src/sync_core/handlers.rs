use crate::{
    SyncError,
    coalesce::Coalescer,
    event_bus::{Event, EventName, Handler, PushKind, PushNotification, throttle},
    rpc::RpcClient,
    sync_core::SyncCore,
    types::Transaction,
};

/// Register every reaction of the core on its bus. Called once, from the builder.
pub(crate) fn register<C: RpcClient>(core: &SyncCore<C>) {
    let bus = &core.bus;

    bus.on(EventName::AvailabilityCheckRequested, availability(core));

    let check = transaction_check(core);
    bus.on(EventName::TransactionCreated, check.clone());
    bus.on(EventName::TransactionCheckRequested, check);

    bus.on(
        EventName::WalletsSyncRequested,
        throttle(wallets_sync(core), core.config.balance_check_throttle),
    );

    bus.on(EventName::AppBackupCheckRequested, backup_check(core));
    bus.on(EventName::BackupSaved, backup_saved(core));
    bus.on(EventName::BackupSnoozed, backup_snoozed(core));
    bus.on(EventName::PushNotification, push_notification(core));
}

fn availability<C: RpcClient>(core: &SyncCore<C>) -> Handler {
    let selector = core.selector.clone();
    Handler::new(move |event| {
        let selector = selector.clone();
        async move {
            if let Event::AvailabilityCheckRequested { provider_id } = event {
                selector.check_availability(&provider_id).await;
            }
            Ok(())
        }
    })
}

fn transaction_check<C: RpcClient>(core: &SyncCore<C>) -> Handler {
    let poller = core.poller.clone();
    Handler::new(move |event| {
        let poller = poller.clone();
        async move {
            if let Event::TransactionCreated { hash } | Event::TransactionCheckRequested { hash } =
                event
            {
                poller.check(hash).await;
            }
            Ok(())
        }
    })
}

/// Re-check every pending transaction; overlapping runs share one pass.
fn wallets_sync<C: RpcClient>(core: &SyncCore<C>) -> Handler {
    let poller = core.poller.clone();
    let in_flight = Coalescer::<(), usize>::new();
    Handler::new(move |_| {
        let poller = poller.clone();
        let in_flight = in_flight.clone();
        async move {
            let checked = in_flight
                .run((), move || async move { poller.check_pending().await.len() })
                .await;
            trace!(checked = checked, "Wallets sync finished");
            Ok(())
        }
    })
}

fn backup_check<C>(core: &SyncCore<C>) -> Handler {
    let reminder = core.reminder.clone();
    Handler::new(move |_| {
        let reminder = reminder.clone();
        async move {
            let mut first_error: Option<SyncError> = None;
            for (_, outcome) in reminder.check_all().await {
                if let Err(e) = outcome {
                    first_error.get_or_insert(e);
                }
            }
            first_error.map_or(Ok(()), Err)
        }
    })
}

fn backup_saved<C>(core: &SyncCore<C>) -> Handler {
    let reminder = core.reminder.clone();
    Handler::new(move |event| {
        let reminder = reminder.clone();
        async move {
            if let Event::BackupSaved { kind, account_id } = event {
                reminder.mark_saved(kind, &account_id);
            }
            Ok(())
        }
    })
}

fn backup_snoozed<C>(core: &SyncCore<C>) -> Handler {
    let reminder = core.reminder.clone();
    Handler::new(move |event| {
        let reminder = reminder.clone();
        async move {
            if let Event::BackupSnoozed { until } = event {
                reminder.snooze(until);
            }
            Ok(())
        }
    })
}

/// Transaction pushes start tracking the transaction if needed and chain into a confirmation
/// check; other kinds are not the sync core's business.
fn push_notification<C>(core: &SyncCore<C>) -> Handler {
    let store = core.store.clone();
    let bus = core.bus.clone();
    Handler::new(move |event| {
        let store = store.clone();
        let bus = bus.clone();
        async move {
            let Event::PushNotification(push) = event else {
                return Ok(());
            };
            let PushNotification { kind, id, hash, provider_id } = push;

            let (Some(kind), Some(id)) = (kind, id) else {
                warn!("Push notification without type or id");
                return Ok(());
            };
            if kind != PushKind::Transaction {
                debug!(kind = ?kind, id = %id, "Ignoring push notification");
                return Ok(());
            }
            let Some(hash) = hash else {
                warn!(id = %id, "Transaction push without hash");
                return Ok(());
            };

            if store.transaction(&hash).is_none() {
                match provider_id.filter(|provider_id| store.provider(provider_id).is_some()) {
                    Some(provider_id) => {
                        let transaction = Transaction::pending(hash, provider_id);
                        store.write(|txn| txn.insert_transaction(transaction));
                    }
                    None => {
                        warn!(hash = %hash, "Transaction push for unknown provider");
                        return Ok(());
                    }
                }
            }

            bus.emit(Event::TransactionCheckRequested { hash }).wait_ok().await
        }
    })
}
