//! The assembled synchronization core.
//!
//! [`SyncCore`] owns the store, the event bus and the components reacting to bus events. Building it
//! registers each component's handlers exactly once; afterwards the host drives everything by
//! emitting [`Event`]s.

use std::{fmt, sync::Arc};

use alloy::primitives::TxHash;

use crate::{
    backup::BackupReminder,
    event_bus::{EmitHandle, Event, EventBus},
    poller::ConfirmationPoller,
    selector::EndpointSelector,
    store::Store,
    types::{ProviderId, Transaction},
};

mod builder;
mod handlers;

pub use builder::{DEFAULT_BALANCE_CHECK_THROTTLE, SyncConfig, SyncCoreBuilder};

/// Store, bus and the components wired to it.
///
/// | Event | Reaction |
/// |-------|----------|
/// | `AvailabilityCheckRequested` | [`EndpointSelector::check_availability`] |
/// | `TransactionCreated`, `TransactionCheckRequested` | [`ConfirmationPoller::check`] |
/// | `WalletsSyncRequested` | [`ConfirmationPoller::check_pending`], throttled and coalesced |
/// | `AppBackupCheckRequested` | [`BackupReminder::check_all`] |
/// | `BackupSaved` | [`BackupReminder::mark_saved`] |
/// | `BackupSnoozed` | [`BackupReminder::snooze`] |
/// | `PushNotification` | transaction pushes are tracked and checked |
pub struct SyncCore<C> {
    store: Arc<Store>,
    bus: EventBus,
    selector: EndpointSelector<C>,
    poller: ConfirmationPoller<C>,
    reminder: BackupReminder,
    config: SyncConfig,
}

impl<C> SyncCore<C> {
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn selector(&self) -> &EndpointSelector<C> {
        &self.selector
    }

    #[must_use]
    pub fn poller(&self) -> &ConfirmationPoller<C> {
        &self.poller
    }

    #[must_use]
    pub fn reminder(&self) -> &BackupReminder {
        &self.reminder
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Shorthand for `self.bus().emit(event)`.
    pub fn emit(&self, event: Event) -> EmitHandle {
        self.bus.emit(event)
    }

    /// Store a freshly submitted transaction as pending and announce it.
    ///
    /// A hash that is already tracked is left untouched and announced again.
    pub fn track_transaction(&self, hash: TxHash, provider_id: impl Into<ProviderId>) -> EmitHandle {
        let transaction = Transaction::pending(hash, provider_id);
        if !self.store.write(|txn| txn.insert_transaction(transaction)) {
            debug!(hash = %hash, "Transaction already tracked");
        }
        self.bus.emit(Event::TransactionCreated { hash })
    }
}

impl<C> fmt::Debug for SyncCore<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCore")
            .field("config", &self.config)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}
