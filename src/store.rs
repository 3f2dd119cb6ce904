//! In-memory reactive record store.
//!
//! Holds [`Provider`], [`Wallet`], [`Transaction`] and [`SnoozeMarker`] records. Reads return owned
//! snapshots. Writes go through [`Store::write`], which applies a mutator to a private copy of the
//! state and swaps it in as a whole, so readers never observe a half-applied write. Every record a
//! write touched is announced afterwards as a [`StoreChange`] on a broadcast channel.

use std::collections::HashMap;

use alloy::primitives::{Address, TxHash};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use url::Url;

use crate::types::{Provider, ProviderId, SnoozeMarker, Transaction, Wallet};

/// Capacity of the change channel; slow subscribers observe `Lagged` past this.
pub const DEFAULT_CHANGE_BUFFER_CAPACITY: usize = 256;

/// Record touched by a committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Provider(ProviderId),
    Wallet(Address),
    Transaction(TxHash),
    SnoozeMarker(String),
}

#[derive(Debug, Default, Clone)]
struct State {
    providers: Vec<Provider>,
    wallets: Vec<Wallet>,
    transactions: Vec<Transaction>,
    snooze_markers: HashMap<String, SnoozeMarker>,
}

/// Reactive object store shared by every component.
#[derive(Debug)]
pub struct Store {
    state: RwLock<State>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(DEFAULT_CHANGE_BUFFER_CAPACITY);
        Self { state: RwLock::new(State::default()), changes }
    }

    #[must_use]
    pub fn provider(&self, id: &str) -> Option<Provider> {
        self.state.read().providers.iter().find(|p| p.id == id).cloned()
    }

    #[must_use]
    pub fn providers(&self) -> Vec<Provider> {
        self.state.read().providers.clone()
    }

    #[must_use]
    pub fn wallet(&self, address: &Address) -> Option<Wallet> {
        self.state.read().wallets.iter().find(|w| &w.address == address).cloned()
    }

    /// Wallets matching `filter`, in insertion order.
    #[must_use]
    pub fn wallets_where(&self, filter: impl Fn(&Wallet) -> bool) -> Vec<Wallet> {
        self.state.read().wallets.iter().filter(|w| filter(w)).cloned().collect()
    }

    /// Non-hidden wallets, in insertion order.
    #[must_use]
    pub fn visible_wallets(&self) -> Vec<Wallet> {
        self.wallets_where(|w| !w.hidden)
    }

    #[must_use]
    pub fn transaction(&self, hash: &TxHash) -> Option<Transaction> {
        self.state.read().transactions.iter().find(|t| &t.hash == hash).cloned()
    }

    /// Transactions matching `filter`, in insertion order.
    #[must_use]
    pub fn transactions_where(&self, filter: impl Fn(&Transaction) -> bool) -> Vec<Transaction> {
        self.state.read().transactions.iter().filter(|t| filter(t)).cloned().collect()
    }

    #[must_use]
    pub fn snooze_marker(&self, key: &str) -> Option<SnoozeMarker> {
        self.state.read().snooze_markers.get(key).cloned()
    }

    /// Apply `mutator` atomically and announce the touched records.
    pub fn write<R>(&self, mutator: impl FnOnce(&mut WriteTxn<'_>) -> R) -> R {
        let (result, changes) = {
            let mut guard = self.state.write();
            let mut draft = guard.clone();
            let mut txn = WriteTxn { state: &mut draft, changes: Vec::new() };
            let result = mutator(&mut txn);
            let changes = txn.changes;
            *guard = draft;
            (result, changes)
        };

        for change in changes {
            // no subscribers is fine
            let _ = self.changes.send(change);
        }
        result
    }

    /// Subscribe to committed changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Committed changes as a stream.
    #[must_use]
    pub fn changes(&self) -> BroadcastStream<StoreChange> {
        BroadcastStream::new(self.subscribe())
    }
}

/// Mutable view handed to [`Store::write`] mutators.
pub struct WriteTxn<'a> {
    state: &'a mut State,
    changes: Vec<StoreChange>,
}

impl WriteTxn<'_> {
    /// Insert or replace a provider (remote configuration sync).
    pub fn upsert_provider(&mut self, provider: Provider) {
        self.changes.push(StoreChange::Provider(provider.id.clone()));
        match self.state.providers.iter_mut().find(|p| p.id == provider.id) {
            Some(existing) => *existing = provider,
            None => self.state.providers.push(provider),
        }
    }

    /// Record `endpoint` as the provider's selected endpoint.
    ///
    /// Returns `false` and writes nothing if the provider is gone or `endpoint` is no longer one
    /// of its candidates.
    pub fn set_selected_endpoint(&mut self, provider_id: &str, endpoint: &Url) -> bool {
        let Some(provider) = self.state.providers.iter_mut().find(|p| p.id == provider_id) else {
            return false;
        };
        if !provider.is_candidate(endpoint) {
            return false;
        }
        if provider.selected_endpoint.as_ref() != Some(endpoint) {
            provider.selected_endpoint = Some(endpoint.clone());
            self.changes.push(StoreChange::Provider(provider.id.clone()));
        }
        true
    }

    /// Insert or replace a wallet, keyed by address.
    pub fn upsert_wallet(&mut self, wallet: Wallet) {
        self.changes.push(StoreChange::Wallet(wallet.address));
        match self.state.wallets.iter_mut().find(|w| w.address == wallet.address) {
            Some(existing) => *existing = wallet,
            None => self.state.wallets.push(wallet),
        }
    }

    /// Mutate every wallet matching `filter`; returns how many changed.
    pub fn update_wallets(
        &mut self,
        filter: impl Fn(&Wallet) -> bool,
        mut update: impl FnMut(&mut Wallet),
    ) -> usize {
        let mut updated = 0;
        for wallet in self.state.wallets.iter_mut().filter(|w| filter(w)) {
            let before = wallet.clone();
            update(wallet);
            if *wallet != before {
                self.changes.push(StoreChange::Wallet(wallet.address));
                updated += 1;
            }
        }
        updated
    }

    /// Insert a transaction unless one with the same hash exists; returns whether it was inserted.
    pub fn insert_transaction(&mut self, transaction: Transaction) -> bool {
        if self.state.transactions.iter().any(|t| t.hash == transaction.hash) {
            return false;
        }
        self.changes.push(StoreChange::Transaction(transaction.hash));
        self.state.transactions.push(transaction);
        true
    }

    /// Mark a transaction confirmed; returns `true` only on the `pending -> confirmed` transition.
    pub fn set_transaction_confirmed(&mut self, hash: &TxHash) -> bool {
        match self.state.transactions.iter_mut().find(|t| &t.hash == hash) {
            Some(transaction) if !transaction.confirmed => {
                transaction.confirmed = true;
                self.changes.push(StoreChange::Transaction(*hash));
                true
            }
            _ => false,
        }
    }

    pub fn set_snooze_marker(&mut self, marker: SnoozeMarker) {
        self.changes.push(StoreChange::SnoozeMarker(marker.key.clone()));
        self.state.snooze_markers.insert(marker.key.clone(), marker);
    }

    #[must_use]
    pub fn snooze_marker(&self, key: &str) -> Option<&SnoozeMarker> {
        self.state.snooze_markers.get(key)
    }
}
