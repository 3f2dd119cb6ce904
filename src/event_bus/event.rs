use alloy::primitives::TxHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    backup::BackupKind,
    types::{AccountId, ProviderId},
};

/// Names handlers register under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    AvailabilityCheckRequested,
    WalletsSyncRequested,
    TransactionCreated,
    TransactionCheckRequested,
    AppBackupCheckRequested,
    MnemonicBackupNeeded,
    SocialRecoveryBackupNeeded,
    MultiPartyBackupNeeded,
    BackupSaved,
    BackupSnoozed,
    PushNotification,
}

/// Something that happened, with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Probe the provider's endpoints and select the best-synced one.
    AvailabilityCheckRequested { provider_id: ProviderId },
    /// Wallet balance/staking sync; re-checks every pending transaction.
    WalletsSyncRequested,
    /// A transaction was just submitted and stored as pending.
    TransactionCreated { hash: TxHash },
    TransactionCheckRequested { hash: TxHash },
    /// Run the backup reminder over every custody type.
    AppBackupCheckRequested,
    /// The account group's key material is not backed up; the UI should prompt.
    BackupNeeded { kind: BackupKind, account_id: AccountId },
    /// The user completed a backup.
    BackupSaved { kind: BackupKind, account_id: AccountId },
    /// The user dismissed a backup prompt. `until: None` snoozes exponentially.
    BackupSnoozed { until: Option<DateTime<Utc>> },
    PushNotification(PushNotification),
}

impl Event {
    #[must_use]
    pub fn name(&self) -> EventName {
        match self {
            Event::AvailabilityCheckRequested { .. } => EventName::AvailabilityCheckRequested,
            Event::WalletsSyncRequested => EventName::WalletsSyncRequested,
            Event::TransactionCreated { .. } => EventName::TransactionCreated,
            Event::TransactionCheckRequested { .. } => EventName::TransactionCheckRequested,
            Event::AppBackupCheckRequested => EventName::AppBackupCheckRequested,
            Event::BackupNeeded { kind, .. } => kind.event_name(),
            Event::BackupSaved { .. } => EventName::BackupSaved,
            Event::BackupSnoozed { .. } => EventName::BackupSnoozed,
            Event::PushNotification(_) => EventName::PushNotification,
        }
    }
}

/// Push notification kinds the sync core reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushKind {
    #[serde(rename = "tx")]
    Transaction,
    News,
    Raffle,
    #[serde(other)]
    Unknown,
}

/// Data payload of a remote push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    #[serde(rename = "type")]
    pub kind: Option<PushKind>,
    pub id: Option<String>,
    #[serde(default)]
    pub hash: Option<TxHash>,
    #[serde(default)]
    pub provider_id: Option<ProviderId>,
}
