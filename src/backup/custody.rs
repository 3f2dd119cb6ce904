use std::{fmt, sync::Arc};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::{
    SyncError,
    event_bus::EventName,
    store::Store,
    types::{AccountId, CustodyType},
};

/// Custody types the backup reminder watches. Hardware wallets need no backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    SeedPhrase,
    SocialRecovery,
    MultiParty,
}

impl BackupKind {
    /// Every kind, in the order a reminder pass checks them.
    pub const ALL: [BackupKind; 3] =
        [BackupKind::SeedPhrase, BackupKind::SocialRecovery, BackupKind::MultiParty];

    #[must_use]
    pub fn custody_type(self) -> CustodyType {
        match self {
            BackupKind::SeedPhrase => CustodyType::SeedPhrase,
            BackupKind::SocialRecovery => CustodyType::SocialRecoveryShare,
            BackupKind::MultiParty => CustodyType::MultiPartyShare,
        }
    }

    /// Name of the "needs backup prompt" event for this kind.
    #[must_use]
    pub fn event_name(self) -> EventName {
        match self {
            BackupKind::SeedPhrase => EventName::MnemonicBackupNeeded,
            BackupKind::SocialRecovery => EventName::SocialRecoveryBackupNeeded,
            BackupKind::MultiParty => EventName::MultiPartyBackupNeeded,
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackupKind::SeedPhrase => "seed_phrase",
            BackupKind::SocialRecovery => "social_recovery",
            BackupKind::MultiParty => "multi_party",
        };
        f.write_str(name)
    }
}

/// Answers "is this account group's key material verifiably backed up?".
///
/// Implementations talk to the custody provider (keychain, cloud storage, share servers) and may
/// fail with [`SyncError::Precondition`] when a platform capability is missing.
pub trait KeyMaterialProbe: Send + Sync {
    fn is_saved<'a>(&'a self, account_id: &'a str) -> BoxFuture<'a, Result<bool, SyncError>>;
}

/// Probe backed by the wallets' `backup_saved` flag.
///
/// An account group counts as saved once every wallet of the given custody type in it carries the
/// flag. Used as the default for every kind until a custody provider installs its own probe.
#[derive(Debug, Clone)]
pub struct WalletFlagProbe {
    store: Arc<Store>,
    custody: CustodyType,
}

impl WalletFlagProbe {
    #[must_use]
    pub fn new(store: Arc<Store>, custody: CustodyType) -> Self {
        Self { store, custody }
    }
}

impl KeyMaterialProbe for WalletFlagProbe {
    fn is_saved<'a>(&'a self, account_id: &'a str) -> BoxFuture<'a, Result<bool, SyncError>> {
        Box::pin(async move {
            let wallets = self.store.wallets_where(|w| {
                w.custody == self.custody && w.account_id.as_deref() == Some(account_id)
            });
            // a group deleted since enumeration has nothing left to back up
            Ok(wallets.iter().all(|w| w.backup_saved))
        })
    }
}

/// One row of the reminder's table: which probe decides a kind, and which snooze gates it.
#[derive(Clone)]
pub struct CustodyCheck {
    pub kind: BackupKind,
    pub probe: Arc<dyn KeyMaterialProbe>,
    pub marker_key: String,
}

impl CustodyCheck {
    #[must_use]
    pub fn new(
        kind: BackupKind,
        probe: Arc<dyn KeyMaterialProbe>,
        marker_key: impl Into<String>,
    ) -> Self {
        Self { kind, probe, marker_key: marker_key.into() }
    }

    /// Distinct account-group ids of visible wallets of this kind, in store order.
    #[must_use]
    pub fn account_groups(&self, store: &Store) -> Vec<AccountId> {
        let custody = self.kind.custody_type();
        let mut groups: Vec<AccountId> = Vec::new();
        for wallet in store.wallets_where(|w| !w.hidden && w.custody == custody) {
            if let Some(account_id) = wallet.account_id {
                if !groups.contains(&account_id) {
                    groups.push(account_id);
                }
            }
        }
        groups
    }
}

impl fmt::Debug for CustodyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustodyCheck")
            .field("kind", &self.kind)
            .field("marker_key", &self.marker_key)
            .finish_non_exhaustive()
    }
}
