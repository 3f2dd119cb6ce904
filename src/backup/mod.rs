//! Backup reminders for locally custodied key material.
//!
//! For every [`BackupKind`] the [`BackupReminder`] runs the same cycle: skip while the shared
//! snooze is active, probe the kind's account groups in order, and emit a
//! [`BackupNeeded`](crate::Event::BackupNeeded) event for the first unsaved one. Completing a backup
//! or dismissing the prompt moves the snooze marker forward, see [`SnoozePolicy`].

mod custody;
mod reminder;
mod snooze;

pub use custody::{BackupKind, CustodyCheck, KeyMaterialProbe, WalletFlagProbe};
pub use reminder::{BackupCheck, BackupReminder};
pub use snooze::{
    APP_BACKUP_SNOOZE, DEFAULT_MAX_SNOOZE, DEFAULT_SNOOZE, SnoozePolicy, notifications_topic_key,
};
