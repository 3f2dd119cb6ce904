//! Wallet-Sync is the background synchronization core of an EVM wallet.
//!
//! It keeps locally stored providers, wallets and transactions consistent with a pool of
//! independently failing JSON-RPC endpoints, and decides when the user has to be reminded to back
//! up key material.
//!
//! The entry point is [`SyncCore`], built via [`SyncCoreBuilder`]. Building it creates (or adopts)
//! a [`Store`] and an [`EventBus`] and registers the reactions of every component on the bus:
//!
//! - the [`EndpointSelector`] probes a provider's endpoints and selects one of the most synced;
//! - the [`ConfirmationPoller`] moves pending transactions to confirmed;
//! - the [`BackupReminder`] prompts for unsaved key material, honoring a shared snooze.
//!
//! Triggers from the host (app foregrounded, transaction submitted, push received, user pressed a
//! button) are [`Event`]s emitted on the bus.
//!
//! # Failure model
//!
//! Every network call is raced against a deadline (see [`timeout`]). The selector and the poller
//! never fail: a timed out or broken endpoint is logged and treated as "no data", leaving state
//! unchanged. Only the backup reminder surfaces errors, when a custody probe's precondition is not
//! met.
//!
//! # Concurrency
//!
//! [`EventBus::emit`] is fire-and-forget unless the caller awaits the returned [`EmitHandle`].
//! Overlapping availability checks for the same provider share one probe round; overlapping wallet
//! re-syncs share one pass and are throttled.

#[macro_use]
mod logging;

pub mod backup;
pub mod event_bus;
pub mod rpc;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod timeout;

mod coalesce;
mod error;
mod poller;
mod selector;
mod store;
mod sync_core;
mod types;

pub use backup::{BackupCheck, BackupKind, BackupReminder, KeyMaterialProbe, SnoozePolicy};
pub use coalesce::Coalescer;
pub use error::SyncError;
pub use event_bus::{EmitHandle, Event, EventBus, EventName, Handler, HandlerResult};
pub use poller::{ConfirmationPoller, PollOutcome};
pub use selector::{EndpointSelector, Probe, Selection, choose_best};
pub use store::{DEFAULT_CHANGE_BUFFER_CAPACITY, Store, StoreChange, WriteTxn};
pub use sync_core::{DEFAULT_BALANCE_CHECK_THROTTLE, SyncConfig, SyncCore, SyncCoreBuilder};
pub use timeout::DEFAULT_CALL_TIMEOUT;
pub use types::{AccountId, CustodyType, Provider, ProviderId, SnoozeMarker, Transaction, Wallet};
